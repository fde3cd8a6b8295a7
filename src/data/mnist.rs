use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::info;

use crate::data::idx::parse_idx_pair;
use crate::data::split::Split;
use crate::error::{Error, Result};

/// CVDF mirror of the original MNIST distribution.
pub const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com/cvdf-datasets/mnist/";

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
pub const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
pub const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

/// Loads MNIST, downloading and caching the raw IDX files on first use.
///
/// Files live under `<cache_dir>/mnist/`. A file that is already present is
/// never downloaded again, so loading is idempotent once the cache is warm.
#[derive(Debug, Clone)]
pub struct MnistProvider {
    cache_dir: PathBuf,
    base_url: String,
}

impl MnistProvider {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        MnistProvider { cache_dir: cache_dir.into(), base_url: DEFAULT_BASE_URL.to_owned() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    pub fn dataset_dir(&self) -> PathBuf {
        self.cache_dir.join("mnist")
    }

    /// Returns `(train, test)`.
    ///
    /// Blocking: may perform network I/O. Call it from the training thread,
    /// never from the async runtime.
    pub fn load(&self) -> Result<(Split, Split)> {
        let dir = self.dataset_dir();
        fs::create_dir_all(&dir)?;

        let train = self.load_split(&dir, TRAIN_IMAGES, TRAIN_LABELS)?;
        let test = self.load_split(&dir, TEST_IMAGES, TEST_LABELS)?;
        info!("Loaded MNIST: {} train / {} test samples", train.len(), test.len());
        Ok((train, test))
    }

    fn load_split(&self, dir: &Path, images: &str, labels: &str) -> Result<Split> {
        let image_bytes = fs::read(self.ensure_file(dir, images)?)?;
        let label_bytes = fs::read(self.ensure_file(dir, labels)?)?;
        Ok(Split::new(parse_idx_pair(&image_bytes, &label_bytes)?))
    }

    /// Downloads `<base_url><name>.gz` into `dir/name` unless it already exists.
    fn ensure_file(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        let path = dir.join(name);
        if path.exists() {
            return Ok(path);
        }

        let url = format!("{}{}.gz", self.base_url, name);
        info!("Downloading {url}");
        let compressed = download(&url)?;

        let mut raw = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut raw)
            .map_err(|e| Error::Download { url: url.clone(), reason: format!("bad gzip data: {e}") })?;

        // Write-then-rename so an interrupted download never leaves a
        // truncated file that would be picked up as cached.
        let partial = dir.join(format!("{name}.part"));
        fs::write(&partial, &raw)?;
        fs::rename(&partial, &path)?;
        Ok(path)
    }
}

fn download(url: &str) -> Result<Vec<u8>> {
    let download_err = |reason: String| Error::Download { url: url.to_owned(), reason };

    let response = reqwest::blocking::get(url).map_err(|e| download_err(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(download_err(format!("HTTP {status}")));
    }
    let bytes = response.bytes().map_err(|e| download_err(e.to_string()))?;
    Ok(bytes.to_vec())
}
