use std::sync::Arc;

use arb_core::{admins::AdminRegistry, config::Config};

#[tokio::main]
async fn main() -> Result<(), arb_core::Error> {
    let cfg = Arc::new(Config::load()?);
    let dir_failures = cfg.ensure_dirs();
    arb_core::logging::init("arb", &cfg.log_level, &cfg.log_path)?;
    for (dir, e) in &dir_failures {
        tracing::warn!(path = %dir.display(), error = %e, "could not create directory");
    }

    let admins = Arc::new(AdminRegistry::load(
        cfg.admin_file.clone(),
        &cfg.seed_admins,
    ));

    tracing::info!(data_dir = %cfg.data_dir.display(), "app started");

    arb_telegram::router::run_polling(cfg, admins)
        .await
        .map_err(|e| arb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
