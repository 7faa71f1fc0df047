use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use rewear::error::ExternalServiceError;
use rewear::gate::{ImageUpload, ImageVerifier, Verdict};
use rewear::models::Actor;
use rewear::moderation::StatusFilter;
use rewear::{BrowseState, Config, Marketplace};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Stand-in until a content-safety service is wired up; the configured fail
/// policy decides every verdict.
struct UnconfiguredVerifier;

#[async_trait]
impl ImageVerifier for UnconfiguredVerifier {
    async fn verify(&self, _image: &ImageUpload) -> Result<Verdict, ExternalServiceError> {
        Err(ExternalServiceError::Unavailable("no verification service configured".into()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let config = Config::from_env();
    info!(
        data_dir = ?config.data_dir,
        poll_secs = config.poll_interval.as_secs(),
        page_size = config.page_size,
        "bootstrapping rewear"
    );

    let market = Marketplace::from_config(config, Arc::new(UnconfiguredVerifier))
        .context("failed to build marketplace")?;

    let system = Actor::moderator("system");
    let repaired = market.reconcile_as(&system).await.context("reconciliation failed")?;
    info!(repaired, "startup reconciliation done");

    let polling = market.polling();
    let mut dashboard = market
        .live_dashboard(&system, &polling, StatusFilter::All, None)
        .await
        .context("failed to load moderation dashboard")?;
    let mut catalog = market.live_catalog(&polling).await.context("failed to load catalog")?;
    let mut browse = BrowseState::new(market.config().page_size);

    loop {
        let counts = dashboard.snapshot().counts;
        let page = browse.apply(&catalog.snapshot());
        info!(
            pending = counts.on_processing,
            approved = counts.approved,
            rejected = counts.rejected,
            catalog_pages = page.total_pages,
            "marketplace state"
        );

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            running = dashboard.changed() => if !running { break },
            running = catalog.changed() => if !running { break },
        }
    }

    info!("shutting down");
    Ok(())
}
