use std::io::Write;

use env_logger::{Builder, Env};

/// Installs the process-wide logger: `info` by default, `RUST_LOG` wins.
///
/// Lines look like `2026-10-19T09:41:07Z [INFO] message`. Safe to call more
/// than once; later calls are ignored.
pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(buf, "{} [{}] {}", buf.timestamp_seconds(), record.level(), record.args())
        })
        .try_init();
}
