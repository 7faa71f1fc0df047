use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{MarketError, MarketResult};
use crate::models::*;
use crate::repo::{Repo, RepoError};

/// Builds the public record for an approved listing. Optional fields get
/// their catalog defaults here and nowhere else.
pub fn to_catalog_item(item: &PendingItem) -> CatalogItem {
    let location = item
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(UNKNOWN_LOCATION)
        .to_string();
    let seller = item
        .seller
        .clone()
        .filter(|s| !s.name.trim().is_empty())
        .map(|mut s| {
            s.rating.get_or_insert(PLACEHOLDER_SELLER_RATING);
            s.avatar.get_or_insert_with(|| PLACEHOLDER_SELLER_AVATAR.to_string());
            s
        })
        .unwrap_or_else(Seller::placeholder);
    CatalogItem {
        id: item.id.clone(),
        title: item.title.clone(),
        description: item.description.clone(),
        price: item.price,
        category: item.category,
        item_type: item.item_type.clone(),
        size: item.size.clone(),
        condition: item.condition,
        color: item.color.clone(),
        brand: item.brand.clone(),
        location,
        tags: item.tags.clone(),
        images: item.images.clone(),
        seller,
        posted_at: item.submitted_date,
        upvotes: 0,
        upvoted_by: Vec::new(),
        views: 0,
    }
}

/// The only writer creating catalog entries from pending listings.
#[derive(Clone)]
pub struct CatalogSync {
    repo: Arc<dyn Repo>,
}

impl CatalogSync {
    pub fn new(repo: Arc<dyn Repo>) -> Self {
        Self { repo }
    }

    /// Approves `item` and publishes it in one repository commit.
    ///
    /// When an entry with the same id is already in the catalog it is kept
    /// and returned, and the conflict is counted.
    pub async fn approve(&self, item: &PendingItem) -> MarketResult<CatalogItem> {
        let approval = self.repo.approve_pending(&item.id, to_catalog_item(item)).await?;
        if approval.created {
            info!(item_id = %approval.entry.id, posted_at = %approval.entry.posted_at, "published to catalog");
        } else {
            let conflict = MarketError::SyncConflict(item.id.clone());
            warn!(item_id = %item.id, error = %conflict, "sync conflict recovered");
            metrics::increment_counter!("rewear_catalog_sync_conflicts_total");
        }
        Ok(approval.entry)
    }

    /// Publishes `item` once per id. A second call returns the stored entry untouched.
    pub async fn publish(&self, item: &PendingItem) -> MarketResult<CatalogItem> {
        match self.repo.get_catalog_item(&item.id).await {
            Ok(existing) => {
                info!(item_id = %item.id, "already published, returning existing entry");
                return Ok(existing);
            }
            Err(RepoError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        match self.repo.insert_catalog_item(to_catalog_item(item)).await {
            Ok(created) => {
                info!(item_id = %created.id, posted_at = %created.posted_at, "published to catalog");
                Ok(created)
            }
            Err(RepoError::Conflict(_)) => {
                // lost a race with another publisher; recover with the winner's entry
                let conflict = MarketError::SyncConflict(item.id.clone());
                warn!(item_id = %item.id, error = %conflict, "sync conflict recovered");
                metrics::increment_counter!("rewear_catalog_sync_conflicts_total");
                Ok(self.repo.get_catalog_item(&item.id).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn is_published(&self, id: &str) -> MarketResult<bool> {
        match self.repo.get_catalog_item(id).await {
            Ok(_) => Ok(true),
            Err(RepoError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pending(seller: Option<Seller>, location: Option<&str>) -> PendingItem {
        PendingItem {
            id: "42".into(),
            title: "Vintage Jacket".into(),
            description: "Warm".into(),
            price: 250,
            category: Category::Outerwear,
            item_type: "Jacket".into(),
            size: "M".into(),
            condition: Condition::Good,
            color: String::new(),
            brand: String::new(),
            location: location.map(String::from),
            tags: vec!["vintage".into()],
            images: vec![ImageRef("images/aa/aa".into())],
            seller,
            submitted_date: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            status: ItemStatus::Approved,
            rejection_message: None,
            upvotes: 3,
            upvoted_by: vec!["a".into(), "b".into(), "c".into()],
            views: 9,
        }
    }

    #[test]
    fn missing_fields_get_catalog_defaults() {
        let c = to_catalog_item(&pending(None, Some("  ")));
        assert_eq!(c.location, UNKNOWN_LOCATION);
        assert_eq!(c.seller.name, PLACEHOLDER_SELLER_NAME);
        assert_eq!(c.seller.rating, Some(4.0));
        assert_eq!(c.posted_at, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
        assert_eq!((c.upvotes, c.views), (0, 0));
        assert!(c.upvoted_by.is_empty());
    }

    #[test]
    fn present_seller_keeps_identity() {
        let c = to_catalog_item(&pending(Some(Seller::new("Kim", "kim@example.com")), Some("Oslo")));
        assert_eq!(c.seller.name, "Kim");
        assert_eq!(c.seller.contact, "kim@example.com");
        assert_eq!(c.seller.rating, Some(PLACEHOLDER_SELLER_RATING));
        assert_eq!(c.location, "Oslo");
    }
}
