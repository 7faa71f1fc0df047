use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::engagement::EngagementStore;
use crate::error::{MarketError, MarketResult};
use crate::gate::{ImageVerifier, VerificationGate};
use crate::intake::{ItemSubmissionIntake, ListingDraft};
use crate::models::*;
use crate::moderation::{ModerationStore, StatusCounts, StatusFilter};
use crate::polling::{BusNotifier, ChangeBus, Collection, LiveView, Notifier, PollingNotifier};
use crate::repo::{JsonFileRepo, NotifyingRepo, Repo};
use crate::seed;
use crate::sync::CatalogSync;

/// Early-returns `Forbidden` unless the actor holds the moderator capability.
macro_rules! require_moderator {
    ($actor:expr) => {
        if !$actor.is_moderator {
            tracing::warn!(actor = %$actor.id, "moderation attempted without capability");
            return Err(MarketError::Forbidden);
        }
    };
}

/// What the moderation dashboard renders on each refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub items: Vec<PendingItem>,
    pub counts: StatusCounts,
}

/// Wires every store over one repository.
pub struct Marketplace {
    config: Config,
    bus: ChangeBus,
    gate: Arc<VerificationGate>,
    intake: ItemSubmissionIntake,
    moderation: ModerationStore,
    catalog: CatalogStore,
    engagement: EngagementStore,
}

impl Marketplace {
    /// Builds over `backend`; writes are published on this marketplace's change bus.
    pub fn new(config: Config, backend: Arc<dyn Repo>, verifier: Arc<dyn ImageVerifier>) -> Self {
        let bus = ChangeBus::new();
        let repo: Arc<dyn Repo> = Arc::new(NotifyingRepo::new(backend, bus.clone()));
        let sync = CatalogSync::new(repo.clone());
        let catalog = CatalogStore::new(repo.clone(), seed::catalog());
        Self {
            gate: Arc::new(VerificationGate::new(verifier, config.verification_policy)),
            intake: ItemSubmissionIntake::new(repo.clone()),
            moderation: ModerationStore::new(repo, sync),
            engagement: EngagementStore::new(catalog.clone()),
            catalog,
            bus,
            config,
        }
    }

    /// JSON file backend when `data_dir` is set, process memory otherwise.
    pub fn from_config(config: Config, verifier: Arc<dyn ImageVerifier>) -> MarketResult<Self> {
        let backend: Arc<dyn Repo> = match &config.data_dir {
            Some(dir) => Arc::new(JsonFileRepo::open(dir)),
            None => Self::memory_backend()?,
        };
        Ok(Self::new(config, backend, verifier))
    }

    #[cfg(feature = "inmem-store")]
    fn memory_backend() -> MarketResult<Arc<dyn Repo>> {
        info!("using in-memory repository backend");
        Ok(Arc::new(crate::repo::inmem::InMemRepo::empty()))
    }

    #[cfg(not(feature = "inmem-store"))]
    fn memory_backend() -> MarketResult<Arc<dyn Repo>> {
        Err(MarketError::Store("REWEAR_DATA_DIR must be set without the inmem-store feature".into()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
    pub fn gate(&self) -> &Arc<VerificationGate> {
        &self.gate
    }
    pub fn intake(&self) -> &ItemSubmissionIntake {
        &self.intake
    }
    pub fn moderation(&self) -> &ModerationStore {
        &self.moderation
    }
    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }
    pub fn engagement(&self) -> &EngagementStore {
        &self.engagement
    }

    pub fn new_draft(&self) -> ListingDraft {
        ListingDraft::new(self.config.max_images)
    }

    pub async fn submit(&self, draft: &ListingDraft, seller: Seller) -> MarketResult<ItemId> {
        self.intake.submit(draft, seller).await
    }

    pub async fn review_queue(
        &self,
        actor: &Actor,
        filter: StatusFilter,
        search: Option<&str>,
    ) -> MarketResult<Vec<PendingItem>> {
        require_moderator!(actor);
        self.moderation.list(filter, search).await
    }

    pub async fn approve_as(&self, actor: &Actor, id: &str) -> MarketResult<CatalogItem> {
        require_moderator!(actor);
        info!(actor = %actor.id, item_id = %id, "approve requested");
        self.moderation.approve(id).await
    }

    pub async fn reject_as(&self, actor: &Actor, id: &str, message: &str) -> MarketResult<()> {
        require_moderator!(actor);
        info!(actor = %actor.id, item_id = %id, "reject requested");
        self.moderation.reject(id, message).await
    }

    pub async fn reconcile_as(&self, actor: &Actor) -> MarketResult<usize> {
        require_moderator!(actor);
        self.moderation.reconcile().await
    }

    /// Fixed-interval refresh using the configured poll period.
    pub fn polling(&self) -> PollingNotifier {
        PollingNotifier::new(self.config.poll_interval)
    }

    /// Refresh on writes made through this marketplace.
    pub fn on_change(&self, collections: &[Collection]) -> BusNotifier {
        self.bus.watching(collections)
    }

    pub async fn live_dashboard(
        &self,
        actor: &Actor,
        notifier: &dyn Notifier,
        filter: StatusFilter,
        search: Option<String>,
    ) -> MarketResult<LiveView<DashboardSnapshot>> {
        require_moderator!(actor);
        let moderation = self.moderation.clone();
        LiveView::spawn(notifier, move || {
            let moderation = moderation.clone();
            let search = search.clone();
            async move {
                let items = moderation.list(filter, search.as_deref()).await?;
                let counts = moderation.counts().await?;
                Ok::<_, MarketError>(DashboardSnapshot { items, counts })
            }
        })
        .await
    }

    pub async fn live_catalog(&self, notifier: &dyn Notifier) -> MarketResult<LiveView<Vec<CatalogItem>>> {
        let catalog = self.catalog.clone();
        LiveView::spawn(notifier, move || {
            let catalog = catalog.clone();
            async move { catalog.list().await }
        })
        .await
    }

    pub async fn live_my_items(
        &self,
        submitter: &str,
        notifier: &dyn Notifier,
    ) -> MarketResult<LiveView<Vec<PendingItem>>> {
        let intake = self.intake.clone();
        let submitter = submitter.to_string();
        LiveView::spawn(notifier, move || {
            let intake = intake.clone();
            let submitter = submitter.clone();
            async move { intake.my_items(&submitter).await }
        })
        .await
    }
}
