use crate::config::StoreConfig;
use crate::database::{KeyValueStore, Table};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

/// PostgREST client for a Supabase project. Each table is addressed by its name under
/// `/rest/v1`, rows by `id=eq.{id}`.
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(config: &StoreConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.supabase_key.clone(),
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn send(&self, table: Table, request: RequestBuilder) -> AppResult<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("{table}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Supabase request on {table} failed: {status} {body}");
            return Err(AppError::StoreUnavailable(format!("{table}: HTTP {status}")));
        }
        Ok(response)
    }

    async fn rows(&self, table: Table, response: Response) -> AppResult<Vec<Value>> {
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("{table}: unreadable response: {e}")))
    }
}

#[async_trait]
impl KeyValueStore for SupabaseStore {
    async fn get(&self, table: Table) -> AppResult<Vec<Value>> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*")]);
        let response = self.send(table, request).await?;
        self.rows(table, response).await
    }

    async fn set(&self, table: Table, mut record: Value, id: &str) -> AppResult<()> {
        let Some(obj) = record.as_object_mut() else {
            return Err(AppError::ValidationError(format!(
                "{table} record must be a JSON object"
            )));
        };
        obj.insert("id".to_string(), Value::String(id.to_string()));

        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&record);
        self.send(table, request).await?;
        Ok(())
    }

    async fn update(&self, table: Table, patch: Value, id: &str) -> AppResult<()> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(table, request).await?;
        if self.rows(table, response).await?.is_empty() {
            return Err(AppError::NotFound(format!("{table} record {id} not found")));
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str) -> AppResult<()> {
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))]);
        self.send(table, request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> StoreConfig {
        StoreConfig {
            supabase_url: url.to_string(),
            supabase_key: "anon".to_string(),
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_table_url_strips_trailing_slash() {
        let store = SupabaseStore::new(&config("https://demo.supabase.co/")).unwrap();
        assert_eq!(
            store.table_url(Table::CustomerCodes),
            "https://demo.supabase.co/rest/v1/customer_codes"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_store_unavailable() {
        let store = SupabaseStore::new(&config("http://127.0.0.1:9")).unwrap();
        let err = store.get(Table::Products).await.unwrap_err();
        assert!(err.is_store_unavailable());
    }
}
