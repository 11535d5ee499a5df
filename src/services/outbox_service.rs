//! Local retry queue for creates that could not reach the store.
//!
//! Entries are keyed by (table, id); a newer record for the same key replaces the
//! queued one. Replays use `set`, which is an upsert, so delivering an entry twice
//! leaves the same row behind.

use crate::database::{KeyValueStore, Table};
use crate::error::{AppError, AppResult};
use crate::models::DrainReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEntry {
    pub table: Table,
    pub id: String,
    pub record: Value,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
}

pub struct OutboxService {
    path: PathBuf,
    entries: Mutex<Vec<OutboxEntry>>,
}

impl OutboxService {
    /// Open the queue at `path`, starting empty when the file does not exist yet.
    pub async fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        if !entries.is_empty() {
            log::info!(
                "Outbox loaded {} pending records from {}",
                entries.len(),
                path.display()
            );
        }
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub async fn enqueue(&self, table: Table, id: &str, record: Value) -> AppResult<()> {
        let mut entries = self.entries.lock().await;
        let entry = OutboxEntry {
            table,
            id: id.to_string(),
            record,
            enqueued_at: Utc::now(),
            attempts: 0,
        };
        match entries.iter_mut().find(|e| e.table == table && e.id == id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        self.persist(&entries).await
    }

    pub async fn pending(&self) -> Vec<OutboxEntry> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Write `record` now, or queue it when the store is unreachable.
    /// Returns `true` when the record reached the store directly.
    pub async fn save_or_enqueue<T: Serialize>(
        &self,
        store: &dyn KeyValueStore,
        table: Table,
        record: &T,
        id: &str,
    ) -> AppResult<bool> {
        let value = serde_json::to_value(record)?;
        match store.set(table, value.clone(), id).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_store_unavailable() => {
                log::warn!("Store unavailable, queued {table}/{id} in outbox: {e}");
                self.enqueue(table, id, value).await?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Replay every queued record. Delivered entries are removed; failures stay
    /// queued with `attempts` bumped.
    pub async fn drain(&self, store: &dyn KeyValueStore) -> AppResult<DrainReport> {
        let mut entries = self.entries.lock().await;
        if entries.is_empty() {
            return Ok(DrainReport {
                delivered: 0,
                remaining: 0,
            });
        }

        let mut remaining = Vec::new();
        let mut delivered = 0;
        for mut entry in entries.drain(..) {
            match store.set(entry.table, entry.record.clone(), &entry.id).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    entry.attempts += 1;
                    log::warn!(
                        "Outbox replay of {}/{} failed (attempt {}): {e}",
                        entry.table,
                        entry.id,
                        entry.attempts
                    );
                    remaining.push(entry);
                }
            }
        }
        *entries = remaining;
        self.persist(&entries).await?;

        if delivered > 0 {
            log::info!(
                "Outbox delivered {delivered} records, {} remaining",
                entries.len()
            );
        }
        Ok(DrainReport {
            delivered,
            remaining: entries.len(),
        })
    }

    async fn persist(&self, entries: &[OutboxEntry]) -> AppResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to save outbox: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::FlakyStore;
    use serde_json::json;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> OutboxService {
        OutboxService::load(dir.path().join("outbox.json")).await.unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_replaces_same_key() {
        let dir = TempDir::new().unwrap();
        let outbox = open(&dir).await;
        outbox
            .enqueue(Table::CustomerCodes, "C-1", json!({"customerName": "a"}))
            .await
            .unwrap();
        outbox
            .enqueue(Table::CustomerCodes, "C-1", json!({"customerName": "b"}))
            .await
            .unwrap();
        outbox
            .enqueue(Table::Bookings, "C-1", json!({}))
            .await
            .unwrap();

        let pending = outbox.pending().await;
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].record["customerName"], "b");
    }

    #[tokio::test]
    async fn test_queue_survives_reload() {
        let dir = TempDir::new().unwrap();
        {
            let outbox = open(&dir).await;
            outbox
                .enqueue(Table::ChatMessages, "M-1", json!({"text": "مرحبا"}))
                .await
                .unwrap();
        }
        let reopened = open(&dir).await;
        let pending = reopened.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].record["text"], "مرحبا");
    }

    #[tokio::test]
    async fn test_save_or_enqueue_falls_back_when_store_down() {
        let dir = TempDir::new().unwrap();
        let outbox = open(&dir).await;
        let store = FlakyStore::new();
        store.set_down(true);

        let delivered = outbox
            .save_or_enqueue(&store, Table::CustomerCodes, &json!({"code": "PENDING"}), "C-1")
            .await
            .unwrap();
        assert!(!delivered);
        assert_eq!(outbox.len().await, 1);
    }

    #[tokio::test]
    async fn test_drain_delivers_and_keeps_failures() {
        let dir = TempDir::new().unwrap();
        let outbox = open(&dir).await;
        let store = FlakyStore::new();
        outbox
            .enqueue(Table::CustomerCodes, "C-1", json!({"code": "PENDING"}))
            .await
            .unwrap();

        store.set_down(true);
        let report = outbox.drain(&store).await.unwrap();
        assert_eq!(report.delivered, 0);
        assert_eq!(report.remaining, 1);
        assert_eq!(outbox.pending().await[0].attempts, 1);

        store.set_down(false);
        let report = outbox.drain(&store).await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.remaining, 0);

        let rows = store.inner.get(Table::CustomerCodes).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "C-1");

        // 再次重放不会产生重复记录
        outbox
            .enqueue(Table::CustomerCodes, "C-1", json!({"code": "PENDING"}))
            .await
            .unwrap();
        outbox.drain(&store).await.unwrap();
        assert_eq!(store.inner.get(Table::CustomerCodes).await.unwrap().len(), 1);
    }
}
