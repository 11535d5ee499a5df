use super::{ChangeFeed, DynStore, SubscriptionHandle, Table, fetch_all};
use crate::error::AppResult;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;

/// Whole-table snapshot that re-fetches the table whenever the feed reports a change.
pub struct TableMirror<T> {
    table: Table,
    store: DynStore,
    rows: RwLock<Option<Vec<T>>>,
}

impl<T> TableMirror<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(table: Table, store: DynStore) -> Arc<Self> {
        Arc::new(Self {
            table,
            store,
            rows: RwLock::new(None),
        })
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Reload the table from the store. Returns the number of rows now held.
    pub async fn refresh(&self) -> AppResult<usize> {
        let rows: Vec<T> = fetch_all(self.store.as_ref(), self.table).await?;
        let count = rows.len();
        *self.rows.write().await = Some(rows);
        log::debug!("Mirror of {} refreshed: {count} rows", self.table);
        Ok(count)
    }

    /// Current rows, loading them on first use.
    pub async fn snapshot(&self) -> AppResult<Vec<T>> {
        if let Some(rows) = self.rows.read().await.as_ref() {
            return Ok(rows.clone());
        }
        self.refresh().await?;
        Ok(self.rows.read().await.clone().unwrap_or_default())
    }

    /// Keep this mirror fresh from `feed`. The subscription holds only a weak
    /// reference, so dropping the mirror ends the refreshes.
    pub fn attach(self: &Arc<Self>, feed: &dyn ChangeFeed) -> SubscriptionHandle {
        let weak: Weak<Self> = Arc::downgrade(self);
        feed.subscribe(
            self.table,
            Arc::new(move || {
                let Some(mirror) = weak.upgrade() else {
                    return;
                };
                tokio::spawn(async move {
                    if let Err(e) = mirror.refresh().await {
                        log::warn!("Failed to refresh mirror of {}: {e}", mirror.table);
                    }
                });
            }),
        )
    }
}
