use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{MarketError, MarketResult};
use crate::gate::DraftImages;
use crate::models::*;
use crate::repo::Repo;

/// A listing being composed by a user. Every field may still be empty.
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub price: Option<u32>,
    pub category: Option<Category>,
    pub item_type: String,
    pub size: String,
    pub condition: Option<Condition>,
    pub color: String,
    pub brand: String,
    pub location: String,
    pub tags: Vec<String>,
    pub images: DraftImages,
}

impl ListingDraft {
    pub fn new(max_images: usize) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            price: None,
            category: None,
            item_type: String::new(),
            size: String::new(),
            condition: None,
            color: String::new(),
            brand: String::new(),
            location: String::new(),
            tags: Vec::new(),
            images: DraftImages::new(max_images),
        }
    }

    /// Adds a trimmed, non-empty tag unless already present.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Names of required fields that are absent or invalid, in form order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if !matches!(self.price, Some(p) if p > 0) {
            missing.push("price");
        }
        if self.category.is_none() {
            missing.push("category");
        }
        if self.condition.is_none() {
            missing.push("condition");
        }
        if self.images.is_empty() {
            missing.push("images");
        }
        missing
    }
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for t in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

// "<unix millis>-<9 random chars>", same shape as ids minted by the browser
fn new_item_id() -> ItemId {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..9])
}

#[derive(Clone)]
pub struct ItemSubmissionIntake {
    repo: Arc<dyn Repo>,
}

impl ItemSubmissionIntake {
    pub fn new(repo: Arc<dyn Repo>) -> Self {
        Self { repo }
    }

    /// Checks required fields first, then image verification.
    pub fn validate(draft: &ListingDraft) -> MarketResult<()> {
        let missing_fields = draft.missing_fields();
        if !missing_fields.is_empty() {
            return Err(MarketError::Validation { missing_fields });
        }
        let (pending, rejected) = draft.images.blocking_counts();
        if pending > 0 || rejected > 0 {
            return Err(MarketError::ModerationPending { pending, rejected });
        }
        Ok(())
    }

    /// Creates an `OnProcessing` item and records it for the submitter.
    pub async fn submit(&self, draft: &ListingDraft, seller: Seller) -> MarketResult<ItemId> {
        Self::validate(draft)?;
        let (Some(price), Some(category), Some(condition)) = (draft.price, draft.category, draft.condition) else {
            return Err(MarketError::Validation { missing_fields: draft.missing_fields() });
        };
        let location = draft.location.trim();
        let item = PendingItem {
            id: new_item_id(),
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            price,
            category,
            item_type: draft.item_type.trim().to_string(),
            size: draft.size.trim().to_string(),
            condition,
            color: draft.color.trim().to_string(),
            brand: draft.brand.trim().to_string(),
            location: (!location.is_empty()).then(|| location.to_string()),
            tags: normalize_tags(&draft.tags),
            images: draft.images.image_refs(),
            seller: Some(seller),
            submitted_date: Utc::now(),
            status: ItemStatus::OnProcessing,
            rejection_message: None,
            upvotes: 0,
            upvoted_by: Vec::new(),
            views: 0,
        };

        let item = self.repo.put_pending(item).await?;
        // the pending collection is authoritative, "my items" resolves against it
        if let Err(e) = self.repo.record_submission(item.clone()).await {
            warn!(item_id = %item.id, error = %e, "failed to record submitter copy");
        }
        metrics::increment_counter!("rewear_items_submitted_total");
        info!(item_id = %item.id, images = item.images.len(), "item submitted for moderation");
        Ok(item.id)
    }

    /// The submitter's items in submission order, with current moderation state.
    pub async fn my_items(&self, submitter: &str) -> MarketResult<Vec<PendingItem>> {
        let mine = self.repo.list_submitted(submitter).await?;
        if mine.is_empty() {
            return Ok(mine);
        }
        let current: HashMap<ItemId, PendingItem> = self
            .repo
            .list_pending()
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Ok(mine
            .into_iter()
            .map(|copy| match current.get(&copy.id) {
                Some(live) => PendingItem {
                    status: live.status,
                    rejection_message: live.rejection_message.clone(),
                    ..copy
                },
                None => copy,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let tags = vec![" denim ".to_string(), "".into(), "denim".into(), "vintage".into()];
        assert_eq!(normalize_tags(&tags), vec!["denim".to_string(), "vintage".into()]);

        let mut draft = ListingDraft::new(5);
        assert!(draft.add_tag(" wool "));
        assert!(!draft.add_tag("wool"));
        assert!(!draft.add_tag("   "));
    }

    #[test]
    fn empty_draft_reports_every_required_field() {
        let draft = ListingDraft::new(5);
        assert_eq!(
            draft.missing_fields(),
            vec!["title", "description", "price", "category", "condition", "images"]
        );
    }

    #[test]
    fn zero_price_is_invalid() {
        let mut draft = ListingDraft::new(5);
        draft.price = Some(0);
        assert!(draft.missing_fields().contains(&"price"));
    }

    #[test]
    fn ids_have_browser_shape() {
        let id = new_item_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 9);
    }
}
