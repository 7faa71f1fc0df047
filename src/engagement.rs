use tracing::info;

use crate::catalog::CatalogStore;
use crate::error::MarketResult;
use crate::models::CatalogItem;

/// Upvotes and view counts on catalog entries. The voter is always explicit.
///
/// Every change is applied inside one repository commit, so concurrent
/// voters never overwrite each other.
#[derive(Clone)]
pub struct EngagementStore {
    catalog: CatalogStore,
}

impl EngagementStore {
    pub fn new(catalog: CatalogStore) -> Self {
        Self { catalog }
    }

    /// Toggles `voter_id`'s vote. Returns the updated entry.
    pub async fn upvote(&self, item_id: &str, voter_id: &str) -> MarketResult<CatalogItem> {
        let voter = voter_id.to_string();
        let item = self
            .catalog
            .update_engagement(item_id, move |e| {
                match e.upvoted_by.iter().position(|v| *v == voter) {
                    Some(pos) => {
                        e.upvoted_by.remove(pos);
                    }
                    None => e.upvoted_by.push(voter),
                }
                e.upvotes = e.upvoted_by.len() as u32;
            })
            .await?;
        let added = item.upvoted_by.iter().any(|v| v == voter_id);
        info!(item_id, voter_id, added, upvotes = item.upvotes, "upvote toggled");
        Ok(item)
    }

    /// Counts every call; repeat views by the same viewer are not collapsed.
    pub async fn record_view(&self, item_id: &str) -> MarketResult<u64> {
        let item = self
            .catalog
            .update_engagement(item_id, |e| e.views = e.views.saturating_add(1))
            .await?;
        info!(item_id, views = item.views, "view recorded");
        Ok(item.views)
    }
}
