//! Realtime change feed.
//!
//! Notifications only name the table that changed; consumers re-fetch the whole table.
//! Delivery is at-least-once and unordered, so a lagging subscriber is simply told
//! once more that its table changed.

use super::{DynStore, KeyValueStore, Table};
use crate::error::AppResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const DEFAULT_CAPACITY: usize = 256;

pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, table: Table, on_change: ChangeCallback) -> SubscriptionHandle;

    fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// In-process feed over a tokio broadcast channel. Each subscription runs its own
/// listener task, which `unsubscribe` aborts.
pub struct BroadcastFeed {
    sender: broadcast::Sender<Table>,
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl BroadcastFeed {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Announce that `table` changed. Returns how many receivers saw it.
    pub fn notify(&self, table: Table) -> usize {
        match self.sender.send(table) {
            Ok(count) => {
                log::debug!("Change on {table} delivered to {count} receivers");
                count
            }
            // 没有订阅者不算错误
            Err(_) => 0,
        }
    }

    /// Raw receiver for streaming every table's notifications (used by SSE clients).
    pub fn receiver(&self) -> broadcast::Receiver<Table> {
        self.sender.subscribe()
    }

    pub fn subscription_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }
}

impl Default for BroadcastFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed for BroadcastFeed {
    fn subscribe(&self, table: Table, on_change: ChangeCallback) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // 先创建接收端，保证订阅返回后的通知不会丢失
        let mut rx = self.sender.subscribe();

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(changed) if changed == table => on_change(),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        log::warn!("Subscriber for {table} lagged {n} notifications");
                        on_change();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.insert(id, task);
        }
        SubscriptionHandle(id)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        let task = self
            .listeners
            .lock()
            .ok()
            .and_then(|mut listeners| listeners.remove(&handle.0));
        if let Some(task) = task {
            task.abort();
        }
    }
}

/// Store decorator that announces every successful write on the feed.
pub struct ObservedStore {
    inner: DynStore,
    feed: Arc<BroadcastFeed>,
}

impl ObservedStore {
    pub fn new(inner: DynStore, feed: Arc<BroadcastFeed>) -> Self {
        Self { inner, feed }
    }
}

#[async_trait]
impl KeyValueStore for ObservedStore {
    async fn get(&self, table: Table) -> AppResult<Vec<Value>> {
        self.inner.get(table).await
    }

    async fn set(&self, table: Table, record: Value, id: &str) -> AppResult<()> {
        self.inner.set(table, record, id).await?;
        self.feed.notify(table);
        Ok(())
    }

    async fn update(&self, table: Table, patch: Value, id: &str) -> AppResult<()> {
        self.inner.update(table, patch, id).await?;
        self.feed.notify(table);
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str) -> AppResult<()> {
        self.inner.delete(table, id).await?;
        self.feed.notify(table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    async fn wait_for(counter: &AtomicUsize, expected: usize) {
        for _ in 0..100 {
            if counter.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn counting_callback(counter: Arc<AtomicUsize>) -> ChangeCallback {
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_subscriber_only_sees_its_table() {
        let feed = BroadcastFeed::new();
        let hits = Arc::new(AtomicUsize::new(0));
        feed.subscribe(Table::Bookings, counting_callback(hits.clone()));

        feed.notify(Table::Products);
        feed.notify(Table::Bookings);
        wait_for(&hits, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let feed = BroadcastFeed::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = feed.subscribe(Table::Products, counting_callback(hits.clone()));
        assert_eq!(feed.subscription_count(), 1);

        feed.unsubscribe(handle);
        assert_eq!(feed.subscription_count(), 0);
        feed.notify(Table::Products);
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_observed_store_notifies_after_successful_writes() {
        let feed = Arc::new(BroadcastFeed::new());
        let store = ObservedStore::new(Arc::new(MemoryStore::new()), feed.clone());
        let mut rx = feed.receiver();

        store.set(Table::Coupons, json!({}), "CP-1").await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Table::Coupons);

        // 失败的写入不发通知
        assert!(store
            .update(Table::Coupons, json!({"isActive": false}), "missing")
            .await
            .is_err());
        store.delete(Table::Coupons, "CP-1").await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Table::Coupons);
        assert!(rx.try_recv().is_err());
    }
}
