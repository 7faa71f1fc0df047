use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{MarketError, MarketResult};
use crate::models::*;
use crate::repo::{Repo, RepoError};

/// Seed listings followed by everything published through moderation.
///
/// Seed records never change except for their engagement counters, which are
/// persisted apart from the catalog records and overlaid on read.
#[derive(Clone)]
pub struct CatalogStore {
    repo: Arc<dyn Repo>,
    seed: Arc<Vec<CatalogItem>>,
}

fn with_counters(mut seed: CatalogItem, counters: Engagement) -> CatalogItem {
    seed.set_engagement(counters);
    seed
}

impl CatalogStore {
    pub fn new(repo: Arc<dyn Repo>, seed: Vec<CatalogItem>) -> Self {
        Self { repo, seed: Arc::new(seed) }
    }

    pub fn seed(&self) -> &[CatalogItem] {
        &self.seed
    }

    fn seed_item(&self, id: &str) -> Option<&CatalogItem> {
        self.seed.iter().find(|s| s.id == id)
    }

    pub async fn list(&self) -> MarketResult<Vec<CatalogItem>> {
        let stored = self.repo.list_catalog().await?;
        let mut counters = self.repo.seed_engagement().await?;
        let seed_ids: HashSet<&str> = self.seed.iter().map(|s| s.id.as_str()).collect();
        // documents written before counters were kept separately
        let legacy: HashMap<&str, &CatalogItem> = stored
            .iter()
            .filter(|c| seed_ids.contains(c.id.as_str()))
            .map(|c| (c.id.as_str(), c))
            .collect();

        let mut items = Vec::with_capacity(self.seed.len() + stored.len());
        items.extend(self.seed.iter().map(|s| {
            match counters.remove(&s.id).or_else(|| legacy.get(s.id.as_str()).map(|c| c.engagement())) {
                Some(e) => with_counters(s.clone(), e),
                None => s.clone(),
            }
        }));
        items.extend(stored.iter().filter(|c| !seed_ids.contains(c.id.as_str())).cloned());
        Ok(items)
    }

    pub async fn get(&self, id: &str) -> MarketResult<CatalogItem> {
        let stored = match self.repo.get_catalog_item(id).await {
            Ok(c) => Some(c),
            Err(RepoError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };
        match (self.seed_item(id).cloned(), stored) {
            (Some(s), Some(c)) => Ok(with_counters(s, c.engagement())),
            (Some(s), None) => match self.repo.seed_engagement().await?.remove(id) {
                Some(e) => Ok(with_counters(s, e)),
                None => Ok(s),
            },
            (None, Some(c)) => Ok(c),
            (None, None) => Err(MarketError::NotFound(id.to_string())),
        }
    }

    /// Applies `update` to the counters of `id` in a single commit and
    /// returns the entry as stored afterwards.
    pub async fn update_engagement<F>(&self, id: &str, update: F) -> MarketResult<CatalogItem>
    where
        F: FnOnce(&mut Engagement) + Send + 'static,
    {
        let seed = self.seed_item(id).map(CatalogItem::engagement);
        let counters = self.repo.update_engagement(id, seed, Box::new(update)).await?;
        let mut item = match self.seed_item(id) {
            Some(s) => s.clone(),
            None => self.repo.get_catalog_item(id).await?,
        };
        item.set_engagement(counters);
        Ok(item)
    }
}
