use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ExternalServiceError;
use crate::gate::ImageUpload;
use crate::intake::ListingDraft;

/// Eco points per dollar of estimated resale price.
pub const ECO_POINTS_PER_DOLLAR: u32 = 10;

static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));
static DOLLAR_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(\d+)").expect("static regex"));

/// Listing fields suggested from a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDescription {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub estimated_price: String,
}

impl GeneratedDescription {
    pub fn fallback() -> Self {
        Self {
            title: "Clothing Item".into(),
            description: "Please add a detailed description of this item.".into(),
            category: "Tops".into(),
            item_type: "T-shirt".into(),
            size: "M".into(),
            condition: "Good".into(),
            color: "Unknown".into(),
            brand: "Unknown".into(),
            tags: vec!["clothing".into(), "fashion".into()],
            estimated_price: "$10-20".into(),
        }
    }

    /// Pulls the first `{...}` block out of free-form model output.
    pub fn from_model_text(text: &str) -> Result<Self, ExternalServiceError> {
        let m = JSON_OBJECT
            .find(text)
            .ok_or_else(|| ExternalServiceError::InvalidResponse("no JSON object in reply".into()))?;
        serde_json::from_str(m.as_str()).map_err(|e| ExternalServiceError::InvalidResponse(e.to_string()))
    }

    /// `"$15-25"` -> 150: the first dollar amount at ten points per dollar.
    pub fn eco_points(&self) -> Option<u32> {
        let caps = DOLLAR_AMOUNT.captures(&self.estimated_price)?;
        let dollars: u32 = caps.get(1)?.as_str().parse().ok()?;
        dollars.checked_mul(ECO_POINTS_PER_DOLLAR).filter(|p| *p > 0)
    }

    /// Overwrites the draft's descriptive fields. Unknown category or
    /// condition strings clear the field so the user has to pick one.
    pub fn apply_to(&self, draft: &mut ListingDraft) {
        draft.title = self.title.clone();
        draft.description = self.description.clone();
        draft.category = self.category.parse().ok();
        draft.item_type = self.item_type.clone();
        draft.size = self.size.clone();
        draft.condition = self.condition.parse().ok();
        draft.color = self.color.clone();
        draft.brand = self.brand.clone();
        draft.tags = self.tags.clone();
        if let Some(points) = self.eco_points() {
            draft.price = Some(points);
        }
    }
}

#[async_trait]
pub trait DescriptionGenerator: Send + Sync {
    async fn generate(&self, image: &ImageUpload) -> Result<GeneratedDescription, ExternalServiceError>;
}

/// Best-effort generation: any failure yields [`GeneratedDescription::fallback`].
pub async fn describe(generator: &dyn DescriptionGenerator, image: &ImageUpload) -> GeneratedDescription {
    match generator.generate(image).await {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, digest = image.digest(), "description generation failed, using fallback");
            GeneratedDescription::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Condition};

    #[test]
    fn parses_json_wrapped_in_prose() {
        let text = "Sure! Here you go:\n```json\n{\"title\":\"Denim Jacket\",\"description\":\"Blue\",\"category\":\"Outerwear\",\"type\":\"Jacket\",\"condition\":\"Like New\",\"tags\":[\"denim\"],\"estimatedPrice\":\"$30-45\"}\n```";
        let d = GeneratedDescription::from_model_text(text).unwrap();
        assert_eq!(d.title, "Denim Jacket");
        assert_eq!(d.eco_points(), Some(300));
        assert!(GeneratedDescription::from_model_text("no json here").is_err());
    }

    #[test]
    fn apply_fills_draft_and_drops_unknown_enums() {
        let mut draft = ListingDraft::new(5);
        let mut d = GeneratedDescription::fallback();
        d.condition = "Excellent".into();
        d.apply_to(&mut draft);
        assert_eq!(draft.category, Some(Category::Tops));
        assert_eq!(draft.condition, None);
        assert_eq!(draft.price, Some(100));

        d.condition = "fair".into();
        d.apply_to(&mut draft);
        assert_eq!(draft.condition, Some(Condition::Fair));
    }

    struct Offline;

    #[async_trait]
    impl DescriptionGenerator for Offline {
        async fn generate(&self, _image: &ImageUpload) -> Result<GeneratedDescription, ExternalServiceError> {
            Err(ExternalServiceError::Unavailable("quota exceeded".into()))
        }
    }

    #[tokio::test]
    async fn generator_failure_yields_fallback() {
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
        let image = ImageUpload::from_bytes(png).unwrap();
        assert_eq!(describe(&Offline, &image).await, GeneratedDescription::fallback());
    }

    #[test]
    fn price_without_dollar_amount_is_ignored() {
        let mut d = GeneratedDescription::fallback();
        d.estimated_price = "about twenty".into();
        assert_eq!(d.eco_points(), None);
    }
}
