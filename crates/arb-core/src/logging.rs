use std::{fs::OpenOptions, path::Path, sync::Arc};

use tracing_subscriber::{fmt, EnvFilter};

use crate::Result;

/// Initialize tracing for the bot.
///
/// Records are written as JSON lines to `log_path`. `level` is an `EnvFilter`
/// directive and can be overridden with `RUST_LOG`. If the file cannot be
/// opened, logs go to stderr instead.
pub fn init(service_name: &str, level: &str, log_path: &Path) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file = OpenOptions::new().create(true).append(true).open(log_path);

    match file {
        Ok(file) => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .init();
        }
        Err(e) => {
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            tracing::warn!(path = %log_path.display(), error = %e, "could not open log file, logging to stderr");
        }
    }

    tracing::info!(service = service_name, "logging initialized");
    Ok(())
}
