use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::*;
use crate::polling::{ChangeBus, Collection};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RepoError {
    #[error("not found: {0}")] NotFound(ItemId),
    #[error("conflict: {0}")] Conflict(ItemId),
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition { id: ItemId, from: ItemStatus, to: ItemStatus },
    #[error("internal error: {0}")] Internal(String),
}

fn not_found(id: &str) -> RepoError {
    RepoError::NotFound(id.to_string())
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Pending listings, in submission order.
#[async_trait]
pub trait PendingRepo: Send + Sync {
    async fn list_pending(&self) -> RepoResult<Vec<PendingItem>>;
    async fn get_pending(&self, id: &str) -> RepoResult<PendingItem>;
    /// Insert or replace by id; a replaced record keeps its position.
    async fn put_pending(&self, item: PendingItem) -> RepoResult<PendingItem>;
}

pub type EngagementUpdate = Box<dyn FnOnce(&mut Engagement) + Send>;

/// Published catalog entries. Only synced items are stored as records; the
/// seed set lives in `CatalogStore` and only its counters are persisted here.
#[async_trait]
pub trait CatalogRepo: Send + Sync {
    async fn list_catalog(&self) -> RepoResult<Vec<CatalogItem>>;
    async fn get_catalog_item(&self, id: &str) -> RepoResult<CatalogItem>;
    async fn put_catalog_item(&self, item: CatalogItem) -> RepoResult<CatalogItem>;
    /// Fails with `Conflict` when an entry with the same id already exists.
    async fn insert_catalog_item(&self, item: CatalogItem) -> RepoResult<CatalogItem>;
    /// Applies `update` to the counters of `id` in one commit.
    ///
    /// Stored entries are updated in place. Otherwise, when `seed` is given,
    /// the counters are kept under the seed id, starting from `seed`.
    async fn update_engagement(
        &self,
        id: &str,
        seed: Option<Engagement>,
        update: EngagementUpdate,
    ) -> RepoResult<Engagement>;
    /// Persisted counters of seed items, by id.
    async fn seed_engagement(&self) -> RepoResult<BTreeMap<ItemId, Engagement>>;
}

/// Per-submitter copies taken at submission time.
#[async_trait]
pub trait SubmitterRepo: Send + Sync {
    async fn list_submitted(&self, submitter: &str) -> RepoResult<Vec<PendingItem>>;
    async fn record_submission(&self, item: PendingItem) -> RepoResult<()>;
}

/// Outcome of an approval committed together with its catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    pub item: PendingItem,
    pub entry: CatalogItem,
    /// `false` when an entry with the same id was already published.
    pub created: bool,
}

/// Moderation decisions. Each call checks and changes the status in a single
/// commit; anything but `OnProcessing` fails with `InvalidTransition`.
#[async_trait]
pub trait ModerationRepo: Send + Sync {
    /// Marks the item approved and inserts `entry` into the catalog unless
    /// its id is already there.
    async fn approve_pending(&self, id: &str, entry: CatalogItem) -> RepoResult<Approval>;
    /// Fails with `Conflict` when the id is already in the catalog.
    async fn reject_pending(&self, id: &str, message: String) -> RepoResult<PendingItem>;
}

pub trait Repo: PendingRepo + CatalogRepo + SubmitterRepo + ModerationRepo {}

impl<T> Repo for T where T: PendingRepo + CatalogRepo + SubmitterRepo + ModerationRepo {}

/// The whole persisted document. Key names are shared with the browser views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub pending_items: Vec<PendingItem>,
    #[serde(default)]
    pub browse_items: Vec<CatalogItem>,
    #[serde(default)]
    pub user_items: Vec<PendingItem>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub seed_engagement: BTreeMap<ItemId, Engagement>,
}

fn upsert<T, F>(items: &mut Vec<T>, item: T, same: F)
where
    F: Fn(&T) -> bool,
{
    match items.iter_mut().find(|existing| same(existing)) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

fn pending_for_decision<'a>(s: &'a mut Snapshot, id: &str, to: ItemStatus) -> RepoResult<&'a mut PendingItem> {
    let item = s.pending_items.iter_mut().find(|p| p.id == id).ok_or_else(|| not_found(id))?;
    if item.status != ItemStatus::OnProcessing {
        return Err(RepoError::InvalidTransition { id: id.to_string(), from: item.status, to });
    }
    Ok(item)
}

/// Storage seam for a snapshot document.
///
/// `commit` is a full read-modify-write: the closure works on a private copy
/// and the copy only becomes visible once it has been stored. Two processes
/// sharing one backend resolve concurrent commits last-writer-wins.
pub trait SnapshotBackend: Send + Sync {
    fn load(&self) -> RepoResult<Snapshot>;
    fn commit<T, F>(&self, f: F) -> RepoResult<T>
    where
        F: FnOnce(&mut Snapshot) -> RepoResult<T>;
}

/// Process-local backend.
#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<Snapshot>,
}

impl MemoryBackend {
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self { state: RwLock::new(snapshot) }
    }
}

impl SnapshotBackend for MemoryBackend {
    fn load(&self) -> RepoResult<Snapshot> {
        let s = self.state.read().map_err(|e| RepoError::Internal(e.to_string()))?;
        Ok(s.clone())
    }

    fn commit<T, F>(&self, f: F) -> RepoResult<T>
    where
        F: FnOnce(&mut Snapshot) -> RepoResult<T>,
    {
        let mut s = self.state.write().map_err(|e| RepoError::Internal(e.to_string()))?;
        let mut copy = s.clone();
        let out = f(&mut copy)?;
        *s = copy;
        Ok(out)
    }
}

/// JSON document on disk, re-read on every operation.
pub struct FileBackend {
    path: PathBuf,
    // serialises writers inside this process only
    write_lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    /// `<dir>/state.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_from(path: &Path) -> RepoResult<Snapshot> {
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice::<Snapshot>(&bytes).map_err(|e| {
                log::error!("failed to parse snapshot '{}': {e}", path.display());
                RepoError::Internal(format!("corrupt snapshot: {e}"))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Snapshot::default()),
            Err(e) => Err(RepoError::Internal(e.to_string())),
        }
    }

    // write-temp-then-rename, so a failed write leaves the old document intact
    fn write_to(path: &Path, snapshot: &Snapshot) -> RepoResult<()> {
        let bytes = serde_json::to_vec_pretty(snapshot).map_err(|e| RepoError::Internal(e.to_string()))?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| RepoError::Internal(e.to_string()))?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(|e| {
            log::error!("failed to write snapshot '{}': {e}", tmp.display());
            RepoError::Internal(e.to_string())
        })?;
        std::fs::rename(&tmp, path).map_err(|e| RepoError::Internal(e.to_string()))
    }
}

impl SnapshotBackend for FileBackend {
    fn load(&self) -> RepoResult<Snapshot> {
        Self::read_from(&self.path)
    }

    fn commit<T, F>(&self, f: F) -> RepoResult<T>
    where
        F: FnOnce(&mut Snapshot) -> RepoResult<T>,
    {
        let _guard = self.write_lock.lock().map_err(|e| RepoError::Internal(e.to_string()))?;
        let mut snapshot = Self::read_from(&self.path)?;
        let out = f(&mut snapshot)?;
        Self::write_to(&self.path, &snapshot)?;
        log::debug!("committed snapshot '{}'", self.path.display());
        Ok(out)
    }
}

/// Repository over any snapshot backend.
pub struct SnapshotRepo<B> {
    backend: B,
}

impl<B: SnapshotBackend> SnapshotRepo<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;

    pub type InMemRepo = SnapshotRepo<MemoryBackend>;

    impl InMemRepo {
        pub fn empty() -> Self {
            SnapshotRepo::new(MemoryBackend::default())
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self { Self::empty() }
    }
}

pub type JsonFileRepo = SnapshotRepo<FileBackend>;

impl JsonFileRepo {
    pub fn open(dir: &Path) -> Self {
        log::info!("using snapshot file '{}'", dir.join("state.json").display());
        SnapshotRepo::new(FileBackend::in_dir(dir))
    }
}

#[async_trait]
impl<B: SnapshotBackend> PendingRepo for SnapshotRepo<B> {
    async fn list_pending(&self) -> RepoResult<Vec<PendingItem>> {
        Ok(self.backend.load()?.pending_items)
    }
    async fn get_pending(&self, id: &str) -> RepoResult<PendingItem> {
        self.backend
            .load()?
            .pending_items
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))
    }
    async fn put_pending(&self, item: PendingItem) -> RepoResult<PendingItem> {
        self.backend.commit(|s| {
            let id = item.id.clone();
            upsert(&mut s.pending_items, item.clone(), |p| p.id == id);
            Ok(item)
        })
    }
}

#[async_trait]
impl<B: SnapshotBackend> CatalogRepo for SnapshotRepo<B> {
    async fn list_catalog(&self) -> RepoResult<Vec<CatalogItem>> {
        Ok(self.backend.load()?.browse_items)
    }
    async fn get_catalog_item(&self, id: &str) -> RepoResult<CatalogItem> {
        self.backend
            .load()?
            .browse_items
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found(id))
    }
    async fn put_catalog_item(&self, item: CatalogItem) -> RepoResult<CatalogItem> {
        self.backend.commit(|s| {
            let id = item.id.clone();
            upsert(&mut s.browse_items, item.clone(), |c| c.id == id);
            Ok(item)
        })
    }
    async fn insert_catalog_item(&self, item: CatalogItem) -> RepoResult<CatalogItem> {
        self.backend.commit(|s| {
            if s.browse_items.iter().any(|c| c.id == item.id) {
                return Err(RepoError::Conflict(item.id));
            }
            s.browse_items.push(item.clone());
            Ok(item)
        })
    }
    async fn update_engagement(
        &self,
        id: &str,
        seed: Option<Engagement>,
        update: EngagementUpdate,
    ) -> RepoResult<Engagement> {
        self.backend.commit(|s| {
            if let Some(c) = s.browse_items.iter_mut().find(|c| c.id == id) {
                let mut e = c.engagement();
                update(&mut e);
                c.set_engagement(e.clone());
                return Ok(e);
            }
            let seed = seed.ok_or_else(|| not_found(id))?;
            let e = s.seed_engagement.entry(id.to_string()).or_insert(seed);
            update(e);
            Ok(e.clone())
        })
    }
    async fn seed_engagement(&self) -> RepoResult<BTreeMap<ItemId, Engagement>> {
        Ok(self.backend.load()?.seed_engagement)
    }
}

#[async_trait]
impl<B: SnapshotBackend> ModerationRepo for SnapshotRepo<B> {
    async fn approve_pending(&self, id: &str, entry: CatalogItem) -> RepoResult<Approval> {
        self.backend.commit(|s| {
            let item = pending_for_decision(s, id, ItemStatus::Approved)?;
            item.status = ItemStatus::Approved;
            item.rejection_message = None;
            let item = item.clone();
            let (entry, created) = match s.browse_items.iter().find(|c| c.id == id) {
                Some(existing) => (existing.clone(), false),
                None => {
                    s.browse_items.push(entry.clone());
                    (entry, true)
                }
            };
            Ok(Approval { item, entry, created })
        })
    }
    async fn reject_pending(&self, id: &str, message: String) -> RepoResult<PendingItem> {
        self.backend.commit(|s| {
            let published = s.browse_items.iter().any(|c| c.id == id);
            let item = pending_for_decision(s, id, ItemStatus::Rejected)?;
            if published {
                return Err(RepoError::Conflict(id.to_string()));
            }
            item.status = ItemStatus::Rejected;
            item.rejection_message = Some(message);
            Ok(item.clone())
        })
    }
}

#[async_trait]
impl<B: SnapshotBackend> SubmitterRepo for SnapshotRepo<B> {
    async fn list_submitted(&self, submitter: &str) -> RepoResult<Vec<PendingItem>> {
        Ok(self
            .backend
            .load()?
            .user_items
            .into_iter()
            .filter(|p| p.submitter() == Some(submitter))
            .collect())
    }
    async fn record_submission(&self, item: PendingItem) -> RepoResult<()> {
        self.backend.commit(|s| {
            let id = item.id.clone();
            upsert(&mut s.user_items, item, |p| p.id == id);
            Ok(())
        })
    }
}

/// Decorator publishing a change event after every successful write.
pub struct NotifyingRepo {
    inner: Arc<dyn Repo>,
    bus: ChangeBus,
}

impl NotifyingRepo {
    pub fn new(inner: Arc<dyn Repo>, bus: ChangeBus) -> Self {
        Self { inner, bus }
    }
}

#[async_trait]
impl PendingRepo for NotifyingRepo {
    async fn list_pending(&self) -> RepoResult<Vec<PendingItem>> {
        self.inner.list_pending().await
    }
    async fn get_pending(&self, id: &str) -> RepoResult<PendingItem> {
        self.inner.get_pending(id).await
    }
    async fn put_pending(&self, item: PendingItem) -> RepoResult<PendingItem> {
        let out = self.inner.put_pending(item).await?;
        self.bus.publish(Collection::Pending);
        Ok(out)
    }
}

#[async_trait]
impl CatalogRepo for NotifyingRepo {
    async fn list_catalog(&self) -> RepoResult<Vec<CatalogItem>> {
        self.inner.list_catalog().await
    }
    async fn get_catalog_item(&self, id: &str) -> RepoResult<CatalogItem> {
        self.inner.get_catalog_item(id).await
    }
    async fn put_catalog_item(&self, item: CatalogItem) -> RepoResult<CatalogItem> {
        let out = self.inner.put_catalog_item(item).await?;
        self.bus.publish(Collection::Catalog);
        Ok(out)
    }
    async fn insert_catalog_item(&self, item: CatalogItem) -> RepoResult<CatalogItem> {
        let out = self.inner.insert_catalog_item(item).await?;
        self.bus.publish(Collection::Catalog);
        Ok(out)
    }
    async fn update_engagement(
        &self,
        id: &str,
        seed: Option<Engagement>,
        update: EngagementUpdate,
    ) -> RepoResult<Engagement> {
        let out = self.inner.update_engagement(id, seed, update).await?;
        self.bus.publish(Collection::Catalog);
        Ok(out)
    }
    async fn seed_engagement(&self) -> RepoResult<BTreeMap<ItemId, Engagement>> {
        self.inner.seed_engagement().await
    }
}

#[async_trait]
impl ModerationRepo for NotifyingRepo {
    async fn approve_pending(&self, id: &str, entry: CatalogItem) -> RepoResult<Approval> {
        let out = self.inner.approve_pending(id, entry).await?;
        self.bus.publish(Collection::Pending);
        if out.created {
            self.bus.publish(Collection::Catalog);
        }
        Ok(out)
    }
    async fn reject_pending(&self, id: &str, message: String) -> RepoResult<PendingItem> {
        let out = self.inner.reject_pending(id, message).await?;
        self.bus.publish(Collection::Pending);
        Ok(out)
    }
}

#[async_trait]
impl SubmitterRepo for NotifyingRepo {
    async fn list_submitted(&self, submitter: &str) -> RepoResult<Vec<PendingItem>> {
        self.inner.list_submitted(submitter).await
    }
    async fn record_submission(&self, item: PendingItem) -> RepoResult<()> {
        self.inner.record_submission(item).await?;
        self.bus.publish(Collection::Submissions);
        Ok(())
    }
}
