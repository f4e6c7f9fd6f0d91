// src/main.rs
use anyhow::Result;
use std::sync::Arc;
use tokio::time::{self, Duration};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hotel_core::config::Cli;
use hotel_core::{Core, logging, scenario};

#[tokio::main]
async fn main() -> Result<()> {
    // -------- logging ----------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("hotel_core=info".parse().unwrap())
                .add_directive("hotel_protocol=info".parse().unwrap())
                .add_directive("tokio=warn".parse().unwrap()),
        )
        .compact()
        .init();

    // -------- config + core ----------
    let cli = Cli::parse_cli();
    let cfg = cli.build_config();
    info!(?cfg, "hotel AC core starting");
    let core = Arc::new(Core::new(cfg));

    if cli.scenario {
        scenario::run(&core).await?;
        return Ok(());
    }

    // -------- periodic thermal tick + settlement flush ----------
    {
        let core = core.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(Duration::from_millis(500));
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                core.advance_all();
                for d in core.drain_settlement_log() {
                    logging::csv::log_settlement(&d).await;
                }
            }
        });
    }

    info!("core running; press Ctrl+C to stop");

    // -------- graceful shutdown ----------
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(?e, "failed to install Ctrl+C handler");
    }
    let details = core.bill_details();
    if let Err(e) = logging::csv::export_bill_details("logs/bill_details.csv", &details).await {
        warn!(?e, "ledger export failed");
    }
    info!("shutdown signal received; exiting.");
    Ok(())
}
