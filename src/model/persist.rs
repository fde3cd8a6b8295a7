use std::fs;
use std::path::Path;

use log::info;
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;

use crate::data::{IMAGE_PIXELS, NUM_CLASSES};
use crate::error::{Error, Result};
use crate::layers::dense::Dense;
use crate::layers::dropout::Dropout;
use crate::math::matrix::Matrix;
use crate::network::metadata::ModelMetadata;
use crate::network::network::Mlp;

const TENSOR_NAMES: [&str; 4] = ["fc1.weight", "fc1.bias", "fc2.weight", "fc2.bias"];

fn to_le_bytes(m: &Matrix) -> Vec<u8> {
    m.data.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Writes the parameter blob and the metadata sidecar.
///
/// Both files are written to temporary names first and renamed only once
/// both are complete, so neither file is ever truncated. The two renames are
/// separate steps. A pair is only saved where none existed, so a crash
/// between them leaves a lone sidecar, which the next startup reports as
/// corrupt state.
pub fn save_pair(network: &Mlp, metadata: &ModelMetadata, params_path: &Path, meta_path: &Path) -> Result<()> {
    let tensors = [
        &network.fc1.weights,
        &network.fc1.biases,
        &network.fc2.weights,
        &network.fc2.biases,
    ];
    let buffers: Vec<Vec<u8>> = tensors.iter().map(|m| to_le_bytes(m)).collect();

    let mut views = Vec::with_capacity(tensors.len());
    for ((name, m), bytes) in TENSOR_NAMES.iter().zip(tensors).zip(&buffers) {
        let view = TensorView::new(Dtype::F64, vec![m.rows, m.cols], bytes)
            .map_err(|e| Error::Serialization(format!("tensor {name}: {e}")))?;
        views.push((name.to_string(), view));
    }
    let blob = safetensors::serialize(views, None)
        .map_err(|e| Error::Serialization(format!("parameter blob: {e}")))?;
    let sidecar = serde_json::to_vec_pretty(metadata)?;

    for path in [params_path, meta_path] {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
    }
    let params_tmp = params_path.with_extension("safetensors.tmp");
    let meta_tmp = meta_path.with_extension("json.tmp");
    fs::write(&params_tmp, blob)?;
    fs::write(&meta_tmp, sidecar)?;
    fs::rename(&meta_tmp, meta_path)?;
    fs::rename(&params_tmp, params_path)?;

    info!("Model saved to {}", params_path.display());
    info!("Model info saved to {}", meta_path.display());
    Ok(())
}

/// Rejects sidecars this binary cannot serve or whose history disagrees
/// with its epoch counter.
fn check_metadata(metadata: &ModelMetadata) -> std::result::Result<(), String> {
    let arch = &metadata.architecture;
    if arch.input_size != IMAGE_PIXELS {
        return Err(format!("input_size is {}, expected {IMAGE_PIXELS}", arch.input_size));
    }
    if arch.output_size != NUM_CLASSES {
        return Err(format!("output_size is {}, expected {NUM_CLASSES}", arch.output_size));
    }
    if arch.hidden_size == 0 {
        return Err("hidden_size is 0".into());
    }
    if !(0.0..1.0).contains(&arch.dropout) {
        return Err("dropout out of range".into());
    }
    if metadata.train_loss.len() != metadata.current_epoch || metadata.val_loss.len() != metadata.current_epoch {
        return Err(format!(
            "current_epoch is {} but there are {} train and {} validation losses",
            metadata.current_epoch,
            metadata.train_loss.len(),
            metadata.val_loss.len()
        ));
    }
    if metadata.current_epoch > metadata.total_epochs {
        return Err(format!(
            "current_epoch {} exceeds total_epochs {}",
            metadata.current_epoch, metadata.total_epochs
        ));
    }
    Ok(())
}

/// Reads the pair back. Any missing file or malformed content is reported as
/// `PersistedStateCorrupt`.
pub fn load_pair(params_path: &Path, meta_path: &Path) -> Result<(Mlp, ModelMetadata)> {
    let corrupt = |what: String| Error::PersistedStateCorrupt(what);

    let blob = fs::read(params_path)
        .map_err(|e| corrupt(format!("cannot read {}: {e}", params_path.display())))?;
    let sidecar = fs::read(meta_path)
        .map_err(|e| corrupt(format!("cannot read {}: {e}", meta_path.display())))?;

    let metadata: ModelMetadata = serde_json::from_slice(&sidecar)
        .map_err(|e| corrupt(format!("{}: {e}", meta_path.display())))?;
    check_metadata(&metadata).map_err(|what| corrupt(format!("{}: {what}", meta_path.display())))?;

    let tensors = SafeTensors::deserialize(&blob)
        .map_err(|e| corrupt(format!("{}: {e}", params_path.display())))?;

    let arch = &metadata.architecture;
    let expected = [
        (arch.input_size, arch.hidden_size),
        (1, arch.hidden_size),
        (arch.hidden_size, arch.output_size),
        (1, arch.output_size),
    ];

    let mut matrices = Vec::with_capacity(TENSOR_NAMES.len());
    for (name, (rows, cols)) in TENSOR_NAMES.iter().zip(expected) {
        let view = tensors
            .tensor(name)
            .map_err(|e| corrupt(format!("tensor {name}: {e}")))?;
        if view.dtype() != Dtype::F64 {
            return Err(corrupt(format!("tensor {name}: expected F64, got {:?}", view.dtype())));
        }
        if view.shape() != [rows, cols] {
            return Err(corrupt(format!(
                "tensor {name}: expected shape [{rows}, {cols}], got {:?}",
                view.shape()
            )));
        }
        let data: Vec<f64> = view
            .data()
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect();
        matrices.push(Matrix::from_vec(rows, cols, data));
    }

    let mut it = matrices.into_iter();
    let (w1, b1, w2, b2) = match (it.next(), it.next(), it.next(), it.next()) {
        (Some(w1), Some(b1), Some(w2), Some(b2)) => (w1, b1, w2, b2),
        _ => return Err(corrupt("parameter blob is missing tensors".into())),
    };

    let network = Mlp {
        fc1: Dense::from_parts(w1, b1),
        fc2: Dense::from_parts(w2, b2),
        activation: arch.activation,
        dropout: Dropout::new(arch.dropout),
    };

    info!("Model loaded from {}", params_path.display());
    info!("Model info loaded from {}", meta_path.display());
    Ok((network, metadata))
}
