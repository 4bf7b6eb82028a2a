//! PROPEDGE: player-prop matching and parlay synthesis engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the sportsbook client and the artifact uploader, then runs one
//! cycle (or loops on `engine.interval_secs`) with graceful shutdown.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use propedge::config::AppConfig;
use propedge::engine::{log_cycle_report, Engine};
use propedge::providers::draftkings::DraftKingsClient;
use propedge::providers::LineProvider;
use propedge::sync::github::GitHubSync;
use propedge::sync::{ArtifactSync, SyncTargets};

const DEFAULT_CONFIG: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::var("PROPEDGE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    info!(
        config = %config_path,
        sports = ?cfg.engine.sports,
        scrape = cfg.scrape.enabled,
        sync = cfg.sync.enabled,
        "PROPEDGE starting up"
    );

    let engine = build_engine(cfg)?;

    let Some(interval_secs) = engine.config().engine.interval_secs else {
        let report = engine.run_cycle().await?;
        log_cycle_report(&report);
        return Ok(());
    };

    // -- Main loop -------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(interval_secs, "Entering main loop. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match engine.run_cycle().await {
                    Ok(report) => log_cycle_report(&report),
                    Err(e) => error!(error = %e, "Cycle failed, continuing to next"),
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!("PROPEDGE shut down cleanly.");
    Ok(())
}

/// Attach the sportsbook client and uploader the config enables.
/// A misconfigured uploader disables sync rather than aborting.
fn build_engine(cfg: AppConfig) -> Result<Engine> {
    let provider: Option<Arc<dyn LineProvider>> = if cfg.scrape.enabled {
        let client = DraftKingsClient::new(&cfg.scrape, cfg.draftkings_urls()?)?;
        info!(provider = client.name(), "Sportsbook scraping enabled");
        Some(Arc::new(client))
    } else {
        None
    };

    let sync = if cfg.sync.enabled {
        match (GitHubSync::from_config(&cfg.sync), SyncTargets::from_config(&cfg.sync)) {
            (Ok(client), Ok(targets)) => {
                info!(store = client.name(), parlays = %targets.parlays, builder = %targets.builder, "Artifact sync enabled");
                Some((Arc::new(client) as Arc<dyn ArtifactSync>, targets))
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Artifact sync not configured, local files only");
                None
            }
        }
    } else {
        None
    };

    let mut engine = Engine::new(cfg)?;
    if let Some(provider) = provider {
        engine = engine.with_provider(provider);
    }
    if let Some((sync, targets)) = sync {
        engine = engine.with_sync(sync, targets);
    }
    Ok(engine)
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("propedge=info"));

    let json_logging = std::env::var("PROPEDGE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
