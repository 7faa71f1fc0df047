//! Change propagation between independently rendered views.
//!
//! A [`LiveView`] holds a snapshot of some store read and replaces it wholesale
//! every time its [`Notifier`] fires. Two notifiers are provided:
//!
//! - [`PollingNotifier`] fires on a fixed interval (the dashboard, browse and
//!   "my items" screens all refresh every 5 seconds by default);
//! - [`ChangeBus`] fires when a repository write is published, for callers
//!   that wrap their repository in [`crate::repo::NotifyingRepo`].
//!
//! Dropping a `LiveView` cancels its refresh task, so no reads happen after
//! the view is gone.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Persisted collection touched by a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Pending,
    Catalog,
    Submissions,
}

#[async_trait]
pub trait Trigger: Send {
    /// Resolves when the observer should re-read its store.
    async fn fired(&mut self);
}

pub trait Notifier: Send + Sync {
    fn subscribe(&self) -> Box<dyn Trigger>;
}

#[derive(Debug, Clone, Copy)]
pub struct PollingNotifier {
    period: Duration,
}

impl PollingNotifier {
    pub fn new(period: Duration) -> Self {
        // tokio intervals reject a zero period
        Self { period: period.max(Duration::from_millis(1)) }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

struct IntervalTrigger(Interval);

#[async_trait]
impl Trigger for IntervalTrigger {
    async fn fired(&mut self) {
        self.0.tick().await;
    }
}

impl Notifier for PollingNotifier {
    fn subscribe(&self) -> Box<dyn Trigger> {
        // first tick one period from now: the view has just loaded
        let mut interval = time::interval_at(time::Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Box::new(IntervalTrigger(interval))
    }
}

/// In-process publish/subscribe channel for repository writes.
#[derive(Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<Collection>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn publish(&self, collection: Collection) {
        // no subscribers is fine
        let _ = self.tx.send(collection);
    }

    /// Notifier firing on writes to any of `collections`.
    pub fn watching(&self, collections: &[Collection]) -> BusNotifier {
        BusNotifier { tx: self.tx.clone(), collections: collections.to_vec() }
    }
}

pub struct BusNotifier {
    tx: broadcast::Sender<Collection>,
    collections: Vec<Collection>,
}

impl Notifier for BusNotifier {
    fn subscribe(&self) -> Box<dyn Trigger> {
        Box::new(BusTrigger { rx: self.tx.subscribe(), collections: self.collections.clone() })
    }
}

struct BusTrigger {
    rx: broadcast::Receiver<Collection>,
    collections: Vec<Collection>,
}

#[async_trait]
impl Trigger for BusTrigger {
    async fn fired(&mut self) {
        loop {
            match self.rx.recv().await {
                Ok(c) if self.collections.contains(&c) => return,
                Ok(_) => continue,
                // missed events: re-read anyway
                Err(broadcast::error::RecvError::Lagged(_)) => return,
                Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
            }
        }
    }
}

/// A snapshot kept fresh by a background refresh task.
pub struct LiveView<T> {
    rx: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> LiveView<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Loads once, then re-loads each time `notifier` fires.
    ///
    /// A failed refresh is logged and the previous snapshot is kept; a failed
    /// initial load is returned to the caller.
    pub async fn spawn<F, Fut, E>(notifier: &dyn Notifier, load: F) -> Result<Self, E>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        // subscribe first so a write racing the initial load still fires
        let mut trigger = notifier.subscribe();
        let initial = load().await?;
        let (tx, rx) = watch::channel(initial);
        let task = tokio::spawn(async move {
            loop {
                trigger.fired().await;
                match load().await {
                    Ok(next) => {
                        if tx.send(next).is_err() {
                            debug!("live view receiver gone, stopping refresh");
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "live view refresh failed, keeping previous snapshot"),
                }
            }
        });
        Ok(Self { rx, task })
    }

    pub fn snapshot(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Waits for the next refresh. Returns `false` once the refresh task has ended.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl<T> Drop for LiveView<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counter_loader(
        source: Arc<AtomicU32>,
        loads: Arc<AtomicU32>,
    ) -> impl Fn() -> std::future::Ready<Result<u32, String>> + Send + Sync + 'static {
        move || {
            loads.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(source.load(Ordering::SeqCst)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polling_view_picks_up_external_writes() {
        let source = Arc::new(AtomicU32::new(1));
        let loads = Arc::new(AtomicU32::new(0));
        let notifier = PollingNotifier::new(Duration::from_secs(5));
        let mut view = LiveView::spawn(&notifier, counter_loader(source.clone(), loads.clone()))
            .await
            .unwrap();
        assert_eq!(view.snapshot(), 1);

        source.store(7, Ordering::SeqCst);
        assert!(view.changed().await);
        assert_eq!(view.snapshot(), 7);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_view_stops_reads() {
        let source = Arc::new(AtomicU32::new(0));
        let loads = Arc::new(AtomicU32::new(0));
        let notifier = PollingNotifier::new(Duration::from_secs(5));
        let view = LiveView::spawn(&notifier, counter_loader(source, loads.clone()))
            .await
            .unwrap();
        drop(view);
        time::advance(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bus_fires_only_for_watched_collections() {
        let bus = ChangeBus::new();
        let notifier = bus.watching(&[Collection::Catalog]);
        let mut trigger = notifier.subscribe();
        bus.publish(Collection::Pending);
        bus.publish(Collection::Catalog);
        // returns after skipping the pending event
        tokio::time::timeout(Duration::from_secs(1), trigger.fired()).await.unwrap();
    }
}
