use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{MarketError, MarketResult};
use crate::models::*;
use crate::repo::Repo;
use crate::sync::CatalogSync;

/// Dashboard status tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ItemStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: ItemStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(s) => *s == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(StatusFilter::All),
            other => other.parse().map(StatusFilter::Only),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: usize,
    pub on_processing: usize,
    pub approved: usize,
    pub rejected: usize,
}

fn matches_search(item: &PendingItem, needle: &str) -> bool {
    item.title.to_lowercase().contains(needle) || item.brand.to_lowercase().contains(needle)
}

/// Pending listings and the OnProcessing -> Approved | Rejected state machine.
#[derive(Clone)]
pub struct ModerationStore {
    repo: Arc<dyn Repo>,
    sync: CatalogSync,
}

impl ModerationStore {
    pub fn new(repo: Arc<dyn Repo>, sync: CatalogSync) -> Self {
        Self { repo, sync }
    }

    /// Items in submission order, narrowed by status and a title/brand search.
    pub async fn list(&self, filter: StatusFilter, search: Option<&str>) -> MarketResult<Vec<PendingItem>> {
        let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
        Ok(self
            .repo
            .list_pending()
            .await?
            .into_iter()
            .filter(|p| filter.matches(p.status))
            .filter(|p| needle.as_deref().map_or(true, |n| matches_search(p, n)))
            .collect())
    }

    pub async fn get(&self, id: &str) -> MarketResult<PendingItem> {
        Ok(self.repo.get_pending(id).await?)
    }

    fn transition_refused(&self, err: MarketError) -> MarketError {
        if let MarketError::InvalidTransition { id, from, to } = &err {
            warn!(item_id = %id, from = %from, to = %to, "rejected state transition");
        }
        err
    }

    /// Approves an `OnProcessing` item and publishes it to the catalog.
    ///
    /// The status change and the catalog insert land in the same commit, so
    /// a concurrent `reject` either wins outright or fails.
    pub async fn approve(&self, id: &str) -> MarketResult<CatalogItem> {
        let item = self.get(id).await?;
        if item.status != ItemStatus::OnProcessing {
            return Err(self.transition_refused(MarketError::InvalidTransition {
                id: id.to_string(),
                from: item.status,
                to: ItemStatus::Approved,
            }));
        }
        let published = self.sync.approve(&item).await.map_err(|e| self.transition_refused(e))?;
        metrics::increment_counter!("rewear_items_approved_total");
        info!(item_id = %id, "item approved");
        Ok(published)
    }

    /// Rejects an `OnProcessing` item. An item whose id is already in the
    /// catalog cannot be rejected and yields `SyncConflict`.
    pub async fn reject(&self, id: &str, message: &str) -> MarketResult<()> {
        let message = message.trim();
        if message.is_empty() {
            return Err(MarketError::missing("rejectionMessage"));
        }
        self.repo
            .reject_pending(id, message.to_string())
            .await
            .map_err(|e| self.transition_refused(e.into()))?;
        metrics::increment_counter!("rewear_items_rejected_total");
        info!(item_id = %id, "item rejected");
        Ok(())
    }

    pub async fn counts(&self) -> MarketResult<StatusCounts> {
        let items = self.repo.list_pending().await?;
        let mut counts = StatusCounts { total: items.len(), ..Default::default() };
        for item in &items {
            match item.status {
                ItemStatus::OnProcessing => counts.on_processing += 1,
                ItemStatus::Approved => counts.approved += 1,
                ItemStatus::Rejected => counts.rejected += 1,
            }
        }
        Ok(counts)
    }

    /// Publishes approved items that never reached the catalog. Returns how many were published.
    pub async fn reconcile(&self) -> MarketResult<usize> {
        let mut published = 0;
        for item in self.list(StatusFilter::Only(ItemStatus::Approved), None).await? {
            if !self.sync.is_published(&item.id).await? {
                self.sync.publish(&item).await?;
                published += 1;
            }
        }
        if published > 0 {
            info!(published, "reconciled approved items missing from catalog");
        }
        Ok(published)
    }
}
