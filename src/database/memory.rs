use super::{KeyValueStore, Table};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process store used when no remote backend is configured, and in tests.
/// Rows keep insertion order; an upsert of an existing id replaces it in place.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, table: Table) -> AppResult<Vec<Value>> {
        let tables = self.tables.read().await;
        Ok(tables.get(&table).cloned().unwrap_or_default())
    }

    async fn set(&self, table: Table, mut record: Value, id: &str) -> AppResult<()> {
        let Some(obj) = record.as_object_mut() else {
            return Err(AppError::ValidationError(format!(
                "{table} record must be a JSON object"
            )));
        };
        obj.insert("id".to_string(), Value::String(id.to_string()));

        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_default();
        match rows.iter_mut().find(|row| row_id(row) == Some(id)) {
            Some(existing) => *existing = record,
            None => rows.push(record),
        }
        Ok(())
    }

    async fn update(&self, table: Table, patch: Value, id: &str) -> AppResult<()> {
        let Value::Object(fields) = patch else {
            return Err(AppError::ValidationError(format!(
                "{table} patch must be a JSON object"
            )));
        };

        let mut tables = self.tables.write().await;
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row) == Some(id)))
            .ok_or_else(|| AppError::NotFound(format!("{table} record {id} not found")))?;

        if let Some(obj) = row.as_object_mut() {
            for (k, v) in fields {
                if k != "id" {
                    obj.insert(k, v);
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(rows) = tables.get_mut(&table) {
            rows.retain(|row| row_id(row) != Some(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_is_upsert_and_keeps_order() {
        let store = MemoryStore::new();
        store.set(Table::Products, json!({"name": "a"}), "1").await.unwrap();
        store.set(Table::Products, json!({"name": "b"}), "2").await.unwrap();
        store.set(Table::Products, json!({"name": "a2"}), "1").await.unwrap();

        let rows = store.get(Table::Products).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], json!({"id": "1", "name": "a2"}));
        assert_eq!(rows[1]["id"], "2");
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        store
            .set(
                Table::CustomerCodes,
                json!({"code": "PENDING", "status": "pending", "customerName": "Sara"}),
                "C-1",
            )
            .await
            .unwrap();
        store
            .update(
                Table::CustomerCodes,
                json!({"code": "NICE-1234", "status": "approved", "id": "other"}),
                "C-1",
            )
            .await
            .unwrap();

        let rows = store.get(Table::CustomerCodes).await.unwrap();
        assert_eq!(rows[0]["id"], "C-1");
        assert_eq!(rows[0]["code"], "NICE-1234");
        assert_eq!(rows[0]["customerName"], "Sara");
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update(Table::Bookings, json!({"status": "Confirmed"}), "BOK-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.set(Table::Coupons, json!({}), "CP-1").await.unwrap();
        store.delete(Table::Coupons, "CP-1").await.unwrap();
        store.delete(Table::Coupons, "CP-1").await.unwrap();
        assert!(store.get(Table::Coupons).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tables_are_isolated() {
        let store = MemoryStore::new();
        store.set(Table::Products, json!({}), "1").await.unwrap();
        assert!(store.get(Table::Categories).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_object_record_is_rejected() {
        let store = MemoryStore::new();
        assert!(store.set(Table::Products, json!([1, 2]), "1").await.is_err());
    }
}
