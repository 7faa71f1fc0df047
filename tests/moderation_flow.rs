#![cfg(feature = "inmem-store")]

use std::sync::Arc;

use rewear::error::ExternalServiceError;
use rewear::gate::{ImageUpload, ImageVerifier, Verdict};
use rewear::intake::ListingDraft;
use rewear::models::{Actor, Category, Condition, ItemStatus, Seller, UNKNOWN_LOCATION};
use rewear::moderation::StatusFilter;
use rewear::{Config, MarketError, Marketplace};

/// Verifier answering the same verdict for every image.
struct Fixed(Verdict);

#[async_trait::async_trait]
impl ImageVerifier for Fixed {
    async fn verify(&self, _image: &ImageUpload) -> Result<Verdict, ExternalServiceError> {
        Ok(self.0)
    }
}

fn market_with(verdict: Verdict) -> Marketplace {
    Marketplace::from_config(Config::default(), Arc::new(Fixed(verdict))).unwrap()
}

fn market() -> Marketplace {
    market_with(Verdict::Verified)
}

fn png(seed: u8) -> Vec<u8> {
    let mut v = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    v.extend_from_slice(&[0, 0, 0, 0x0D, b'I', b'H', b'D', b'R', seed]);
    v
}

fn seller() -> Seller {
    Seller::new("Robin", "robin@example.com")
}

/// A complete draft whose single image has been through the gate.
async fn draft(m: &Marketplace, title: &str, price: u32) -> ListingDraft {
    let mut d = m.new_draft();
    d.title = title.into();
    d.description = "Lined, two pockets".into();
    d.price = Some(price);
    d.category = Some(Category::Outerwear);
    d.condition = Some(Condition::Good);
    d.brand = "Levi's".into();
    d.images.add(ImageUpload::from_bytes(png(1)).unwrap()).unwrap();
    d.images.start_verification(m.gate());
    d.images.settle().await;
    d
}

#[tokio::test]
async fn submit_then_approve_publishes_with_submission_date() {
    let m = market();
    let id = m.submit(&draft(&m, "Vintage Jacket", 250).await, seller()).await.unwrap();

    let pending = m.moderation().get(&id).await.unwrap();
    assert_eq!(pending.status, ItemStatus::OnProcessing);
    assert_eq!(pending.rejection_message, None);
    assert_eq!((pending.upvotes, pending.views), (0, 0));

    m.moderation().approve(&id).await.unwrap();
    let item = m.catalog().get(&id).await.unwrap();
    assert_eq!(item.price, 250);
    assert_eq!(item.posted_at, pending.submitted_date);
    assert_eq!(item.upvotes, 0);
    assert_eq!(item.location, UNKNOWN_LOCATION);
    assert_eq!(m.moderation().get(&id).await.unwrap().status, ItemStatus::Approved);
}

#[tokio::test]
async fn draft_without_images_is_rejected_before_any_write() {
    let m = market();
    let mut d = draft(&m, "Vintage Jacket", 250).await;
    d.images.remove(0);

    let err = m.submit(&d, seller()).await.unwrap_err();
    match err {
        MarketError::Validation { missing_fields } => assert_eq!(missing_fields, vec!["images"]),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(m.moderation().list(StatusFilter::All, None).await.unwrap().is_empty());
    assert!(m.intake().my_items("robin@example.com").await.unwrap().is_empty());
}

#[tokio::test]
async fn unverified_or_rejected_images_block_submission() {
    let m = market();
    let mut d = m.new_draft();
    d.title = "Scarf".into();
    d.description = "Wool".into();
    d.price = Some(40);
    d.category = Some(Category::Accessories);
    d.condition = Some(Condition::New);
    d.images.add(ImageUpload::from_bytes(png(9)).unwrap()).unwrap();
    // verification never started
    let err = m.submit(&d, seller()).await.unwrap_err();
    assert!(matches!(err, MarketError::ModerationPending { pending: 1, rejected: 0 }));

    let strict = market_with(Verdict::Rejected);
    let mut d = draft(&strict, "Scarf", 40).await;
    d.images.start_verification(strict.gate());
    let err = strict.submit(&d, seller()).await.unwrap_err();
    assert!(matches!(err, MarketError::ModerationPending { pending: 0, rejected: 1 }));
}

#[tokio::test]
async fn blank_rejection_message_keeps_item_processing() {
    let m = market();
    let id = m.submit(&draft(&m, "Parka", 300).await, seller()).await.unwrap();

    let err = m.moderation().reject(&id, "   ").await.unwrap_err();
    assert!(matches!(err, MarketError::Validation { .. }));
    assert_eq!(m.moderation().get(&id).await.unwrap().status, ItemStatus::OnProcessing);
}

#[tokio::test]
async fn double_approval_yields_single_catalog_entry() {
    let m = market();
    let id = m.submit(&draft(&m, "Trench Coat", 180).await, seller()).await.unwrap();

    m.moderation().approve(&id).await.unwrap();
    let err = m.moderation().approve(&id).await.unwrap_err();
    assert!(matches!(
        err,
        MarketError::InvalidTransition { from: ItemStatus::Approved, to: ItemStatus::Approved, .. }
    ));

    let all = m.catalog().list().await.unwrap();
    assert_eq!(all.iter().filter(|c| c.id == id).count(), 1);
    assert_eq!(all.len(), m.catalog().seed().len() + 1);
}

#[tokio::test]
async fn rejected_item_cannot_be_approved() {
    let m = market();
    let id = m.submit(&draft(&m, "Bomber", 120).await, seller()).await.unwrap();
    m.moderation().reject(&id, "Photos are blurry").await.unwrap();

    let err = m.moderation().approve(&id).await.unwrap_err();
    assert!(matches!(err, MarketError::InvalidTransition { from: ItemStatus::Rejected, .. }));
    let item = m.moderation().get(&id).await.unwrap();
    assert_eq!(item.status, ItemStatus::Rejected);
    assert_eq!(item.rejection_message.as_deref(), Some("Photos are blurry"));
    assert!(matches!(m.catalog().get(&id).await, Err(MarketError::NotFound(_))));

    let err = m.moderation().reject(&id, "again").await.unwrap_err();
    assert!(matches!(err, MarketError::InvalidTransition { .. }));
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let m = market();
    assert!(matches!(m.moderation().approve("nope").await, Err(MarketError::NotFound(id)) if id == "nope"));
    assert!(matches!(m.moderation().reject("nope", "x").await, Err(MarketError::NotFound(_))));
}

#[tokio::test]
async fn list_filters_by_status_and_search_in_submission_order() {
    let m = market();
    let a = m.submit(&draft(&m, "Denim Jacket", 100).await, seller()).await.unwrap();
    let b = m.submit(&draft(&m, "Rain Coat", 90).await, seller()).await.unwrap();
    let c = m.submit(&draft(&m, "Denim Vest", 60).await, seller()).await.unwrap();
    m.moderation().approve(&b).await.unwrap();

    let all: Vec<_> = m.moderation().list(StatusFilter::All, None).await.unwrap();
    assert_eq!(all.iter().map(|p| p.id.clone()).collect::<Vec<_>>(), vec![a.clone(), b.clone(), c.clone()]);

    let denim = m.moderation().list(StatusFilter::All, Some("DENIM")).await.unwrap();
    assert_eq!(denim.len(), 2);
    // brand matches too
    assert_eq!(m.moderation().list(StatusFilter::All, Some("levi")).await.unwrap().len(), 3);

    let waiting = m
        .moderation()
        .list(StatusFilter::Only(ItemStatus::OnProcessing), Some("denim"))
        .await
        .unwrap();
    assert_eq!(waiting.iter().map(|p| p.id.clone()).collect::<Vec<_>>(), vec![a, c]);

    let counts = m.moderation().counts().await.unwrap();
    assert_eq!((counts.total, counts.on_processing, counts.approved, counts.rejected), (3, 2, 1, 0));
}

#[tokio::test]
async fn my_items_track_moderation_outcome() {
    let m = market();
    let a = m.submit(&draft(&m, "Hoodie", 30).await, seller()).await.unwrap();
    let b = m.submit(&draft(&m, "Cap", 15).await, seller()).await.unwrap();
    m.submit(&draft(&m, "Gloves", 10).await, Seller::new("Ana", "ana@example.com"))
        .await
        .unwrap();
    m.moderation().reject(&b, "Counterfeit").await.unwrap();

    let mine = m.intake().my_items("robin@example.com").await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!((mine[0].id.as_str(), mine[0].status), (a.as_str(), ItemStatus::OnProcessing));
    assert_eq!(mine[1].status, ItemStatus::Rejected);
    assert_eq!(mine[1].rejection_message.as_deref(), Some("Counterfeit"));
}

#[tokio::test]
async fn moderation_requires_capability() {
    let m = market();
    let id = m.submit(&draft(&m, "Blazer", 70).await, seller()).await.unwrap();
    let user = Actor::user("robin@example.com");

    assert!(matches!(m.approve_as(&user, &id).await, Err(MarketError::Forbidden)));
    assert!(matches!(m.reject_as(&user, &id, "no").await, Err(MarketError::Forbidden)));
    assert!(matches!(
        m.review_queue(&user, StatusFilter::All, None).await,
        Err(MarketError::Forbidden)
    ));
    assert_eq!(m.moderation().get(&id).await.unwrap().status, ItemStatus::OnProcessing);

    let admin = Actor::moderator("admin");
    m.approve_as(&admin, &id).await.unwrap();
    assert_eq!(m.review_queue(&admin, StatusFilter::All, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn tags_and_location_are_normalised_on_submit() {
    let m = market();
    let mut d = draft(&m, "Sandals", 20).await;
    d.tags = vec![" summer ".into(), "summer".into(), "".into(), "beach".into()];
    d.location = "  Lisbon ".into();
    let id = m.submit(&d, seller()).await.unwrap();

    let item = m.moderation().get(&id).await.unwrap();
    assert_eq!(item.tags, vec!["summer".to_string(), "beach".into()]);
    assert_eq!(item.location.as_deref(), Some("Lisbon"));
    assert_eq!(item.images.len(), 1);
}
