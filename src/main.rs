//! catalog-harvest entry point
//!
//! Usage: `catalog-harvest [CONFIG_FILE]`. The config file may also be given
//! through `CATALOG_HARVEST_CONFIG`; individual settings can be overridden
//! with `CATALOG_HARVEST_<SECTION>__<KEY>` variables.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use catalog_harvest::application::HarvestService;
use catalog_harvest::infrastructure::{config::AppConfig, init_logging, log_system_info};

fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("CATALOG_HARVEST_CONFIG"))
        .map(PathBuf::from)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path();
    let config = AppConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    let _log_guard = init_logging(&config.logging).context("Failed to initialize logging")?;
    log_system_info();
    if let Some(path) = &config_path {
        info!("📁 Configuration file: {:?}", path);
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Interrupt received, finishing with the records collected so far");
            on_signal.cancel();
        }
    });

    let service = HarvestService::from_config(config, cancel).context("Failed to set up harvest")?;
    match service.run().await {
        Ok(summary) => {
            info!("📄 Records: {:?}", summary.records_path);
            info!("📊 Ranking report: {:?}", summary.report_path);
            if summary.deadline_hit {
                warn!("Harvest deadline reached before every pair finished");
            }
            if summary.pairs_failed > 0 {
                warn!("{} of {} pairs ended early", summary.pairs_failed, summary.pairs_attempted);
            }
            Ok(())
        }
        Err(e) => {
            error!("❌ Harvest failed: {}", e);
            Err(e).context("Harvest failed")
        }
    }
}
