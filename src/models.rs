use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// Opaque listing id, shared by a pending item and the catalog entry it yields
pub type ItemId = String;

pub const PLACEHOLDER_SELLER_NAME: &str = "Unknown Seller";
pub const PLACEHOLDER_SELLER_AVATAR: &str =
    "https://images.unsplash.com/photo-1472099645785-5658abf4ff4e?w=150&h=150&fit=crop&crop=face";
pub const PLACEHOLDER_SELLER_RATING: f32 = 4.0;
pub const UNKNOWN_LOCATION: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Tops,
    Bottoms,
    Dresses,
    Outerwear,
    Footwear,
    Accessories,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Tops,
        Category::Bottoms,
        Category::Dresses,
        Category::Outerwear,
        Category::Footwear,
        Category::Accessories,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tops => "Tops",
            Category::Bottoms => "Bottoms",
            Category::Dresses => "Dresses",
            Category::Outerwear => "Outerwear",
            Category::Footwear => "Footwear",
            Category::Accessories => "Accessories",
        }
    }
}

impl FromStr for Category {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    New,
    #[serde(rename = "Like New")]
    LikeNew,
    Good,
    Fair,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::LikeNew => "Like New",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
        }
    }
}

impl FromStr for Condition {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Condition::New),
            "like new" | "like-new" => Ok(Condition::LikeNew),
            "good" => Ok(Condition::Good),
            "fair" => Ok(Condition::Fair),
            _ => Err(()),
        }
    }
}

/// Moderation state of a pending listing.
///
/// `OnProcessing` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemStatus {
    OnProcessing,
    Approved,
    Rejected,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::OnProcessing => "on-processing",
            ItemStatus::Approved => "approved",
            ItemStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ItemStatus::OnProcessing)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "on-processing" => Ok(ItemStatus::OnProcessing),
            "approved" => Ok(ItemStatus::Approved),
            "rejected" => Ok(ItemStatus::Rejected),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seller {
    pub name: String,
    #[serde(rename = "email", default)]
    pub contact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

impl Seller {
    pub fn new(name: impl Into<String>, contact: impl Into<String>) -> Self {
        Self { name: name.into(), contact: contact.into(), avatar: None, rating: None }
    }

    pub fn placeholder() -> Self {
        Self {
            name: PLACEHOLDER_SELLER_NAME.to_string(),
            contact: String::new(),
            avatar: Some(PLACEHOLDER_SELLER_AVATAR.to_string()),
            rating: Some(PLACEHOLDER_SELLER_RATING),
        }
    }
}

/// Reference to a stored image (content-addressed key or external URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    /// Content-addressed key: `images/<first two hex chars>/<digest>`.
    pub fn from_digest(digest: &str) -> Self {
        let prefix = digest.get(0..2).unwrap_or(digest);
        ImageRef(format!("images/{prefix}/{digest}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A listing awaiting (or having received) a moderation decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingItem {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    #[serde(deserialize_with = "de_eco_points")]
    pub price: u32,
    pub category: Category,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub size: String,
    pub condition: Condition,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<Seller>,
    pub submitted_date: DateTime<Utc>,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_message: Option<String>,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub upvoted_by: Vec<String>,
    #[serde(default)]
    pub views: u64,
}

impl PendingItem {
    pub fn submitter(&self) -> Option<&str> {
        self.seller.as_ref().map(|s| s.contact.as_str()).filter(|c| !c.is_empty())
    }
}

/// A publicly visible listing. Only the engagement counters change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    #[serde(deserialize_with = "de_eco_points")]
    pub price: u32,
    pub category: Category,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub size: String,
    pub condition: Condition,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub brand: String,
    pub location: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    pub seller: Seller,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub upvoted_by: Vec<String>,
    #[serde(default)]
    pub views: u64,
}

impl CatalogItem {
    pub fn engagement(&self) -> Engagement {
        Engagement { upvotes: self.upvotes, upvoted_by: self.upvoted_by.clone(), views: self.views }
    }

    pub fn set_engagement(&mut self, e: Engagement) {
        self.upvotes = e.upvotes;
        self.upvoted_by = e.upvoted_by;
        self.views = e.views;
    }
}

/// The mutable part of a catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub upvoted_by: Vec<String>,
    #[serde(default)]
    pub views: u64,
}

/// Caller identity for moderation entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub is_moderator: bool,
}

impl Actor {
    pub fn user(id: impl Into<String>) -> Self {
        Self { id: id.into(), is_moderator: false }
    }
    pub fn moderator(id: impl Into<String>) -> Self {
        Self { id: id.into(), is_moderator: true }
    }
}

// Older dashboard records carry the price as a numeric string
fn de_eco_points<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u32),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse::<u32>()
            .map_err(|_| serde::de::Error::custom(format!("invalid eco points value '{s}'"))),
    }
}
