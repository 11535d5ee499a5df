//! Storage port for the hosted backend.
//!
//! Every record lives in a named table and is addressed by its string id. Rows travel
//! as JSON so the same services run against the remote backend and the in-memory
//! store. Typed access goes through [`fetch_all`], [`fetch_by_id`] and [`put`].

pub mod connection;
pub mod feed;
pub mod memory;
pub mod mirror;

pub use connection::create_store;
pub use feed::{BroadcastFeed, ChangeCallback, ChangeFeed, ObservedStore, SubscriptionHandle};
pub use memory::MemoryStore;
pub use mirror::TableMirror;

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Products,
    Categories,
    Bookings,
    CustomerCodes,
    ChatMessages,
    AppContent,
    Coupons,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Products,
        Table::Categories,
        Table::Bookings,
        Table::CustomerCodes,
        Table::ChatMessages,
        Table::AppContent,
        Table::Coupons,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Products => "products",
            Table::Categories => "categories",
            Table::Bookings => "bookings",
            Table::CustomerCodes => "customer_codes",
            Table::ChatMessages => "chat_messages",
            Table::AppContent => "app_content",
            Table::Coupons => "coupons",
        }
    }

    pub fn parse(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// get / set / update / delete by id. `set` is an upsert; `update` merges the given
/// fields into an existing row.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, table: Table) -> AppResult<Vec<Value>>;

    async fn set(&self, table: Table, record: Value, id: &str) -> AppResult<()>;

    async fn update(&self, table: Table, patch: Value, id: &str) -> AppResult<()>;

    async fn delete(&self, table: Table, id: &str) -> AppResult<()>;
}

pub type DynStore = Arc<dyn KeyValueStore>;

/// 读取整表并反序列化，无法解析的行（如初始化占位文档）记录日志后跳过
pub async fn fetch_all<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    table: Table,
) -> AppResult<Vec<T>> {
    let rows = store.get(table).await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<T>(row) {
            Ok(item) => Some(item),
            Err(e) => {
                log::warn!("Skipping unreadable row in {table}: {e}");
                None
            }
        })
        .collect())
}

/// The raw row with `id`, before deserialization.
pub async fn fetch_row(store: &dyn KeyValueStore, table: Table, id: &str) -> AppResult<Option<Value>> {
    let rows = store.get(table).await?;
    Ok(rows
        .into_iter()
        .find(|row| row.get("id").and_then(Value::as_str) == Some(id)))
}

/// 与 [`fetch_all`] 一致：无法解析的行视为不存在
pub async fn fetch_by_id<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    table: Table,
    id: &str,
) -> AppResult<Option<T>> {
    let Some(row) = fetch_row(store, table, id).await? else {
        return Ok(None);
    };
    match serde_json::from_value(row) {
        Ok(item) => Ok(Some(item)),
        Err(e) => {
            log::warn!("Treating unreadable row {id} in {table} as missing: {e}");
            Ok(None)
        }
    }
}

/// Like [`fetch_by_id`] but a missing row is a `NotFound` error.
pub async fn require_by_id<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    table: Table,
    id: &str,
) -> AppResult<T> {
    fetch_by_id(store, table, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{table} record {id} not found")))
}

pub async fn put<T: Serialize>(
    store: &dyn KeyValueStore,
    table: Table,
    record: &T,
    id: &str,
) -> AppResult<()> {
    store.set(table, serde_json::to_value(record)?, id).await
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Row {
        id: String,
        n: i64,
    }

    #[test]
    fn test_table_names_round_trip() {
        for t in Table::ALL {
            assert_eq!(Table::parse(t.as_str()), Some(t));
        }
        assert_eq!(Table::parse("codes"), None);
    }

    #[tokio::test]
    async fn test_fetch_all_skips_unreadable_rows() {
        let store = MemoryStore::new();
        put(&store, Table::Products, &Row { id: "a".into(), n: 1 }, "a")
            .await
            .unwrap();
        store
            .set(Table::Products, json!({ "init": true }), "__init__")
            .await
            .unwrap();

        let rows: Vec<Row> = fetch_all(&store, Table::Products).await.unwrap();
        assert_eq!(rows, vec![Row { id: "a".into(), n: 1 }]);
    }

    #[tokio::test]
    async fn test_unreadable_row_by_id_counts_as_missing() {
        let store = MemoryStore::new();
        store
            .set(Table::Products, json!({ "n": null }), "a")
            .await
            .unwrap();

        let row: Option<Row> = fetch_by_id(&store, Table::Products, "a").await.unwrap();
        assert!(row.is_none());
        let err = require_by_id::<Row>(&store, Table::Products, "a")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(fetch_row(&store, Table::Products, "a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_require_by_id_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = require_by_id::<Row>(&store, Table::Bookings, "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
