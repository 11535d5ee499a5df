use crate::database::{DynStore, Table, fetch_row, put};
use crate::error::{AppError, AppResult};
use crate::models::*;

/// Storefront texts and settings. A missing row reads as the built-in defaults.
#[derive(Clone)]
pub struct ContentService {
    store: DynStore,
}

impl ContentService {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    pub async fn get(&self) -> AppResult<AppContent> {
        Ok(self.stored().await?.unwrap_or_default())
    }

    /// The stored row, if one has ever been saved. A row that exists but cannot be
    /// read is an error, never the defaults: it carries the admin password.
    pub async fn stored(&self) -> AppResult<Option<AppContent>> {
        let row = fetch_row(self.store.as_ref(), Table::AppContent, CONTENT_ID).await?;
        Ok(row.map(serde_json::from_value).transpose()?)
    }

    /// 公开读取，不含管理员密码
    pub async fn get_public(&self) -> AppResult<AppContent> {
        Ok(self.get().await?.public())
    }

    pub async fn update(&self, request: UpdateContentRequest) -> AppResult<AppContent> {
        let mut content = self.get().await?;

        if let Some(v) = request.about_us {
            content.about_us = v;
        }
        if let Some(v) = request.rental_policy {
            content.rental_policy = v;
        }
        if let Some(v) = request.cancellation_policy {
            content.cancellation_policy = v;
        }
        if let Some(v) = request.admin_password {
            let v = v.trim().to_string();
            if v.is_empty() {
                return Err(AppError::ValidationError(
                    "Admin password cannot be empty".to_string(),
                ));
            }
            content.admin_password = Some(v);
        }
        if let Some(v) = request.code_prefix {
            let v = v.trim().to_uppercase();
            if v.is_empty() || !v.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(AppError::ValidationError(
                    "Code prefix must be letters or digits".to_string(),
                ));
            }
            content.code_prefix = v;
        }
        if let Some(v) = request.gallery {
            content.gallery = v;
        }
        if let Some(v) = request.categories {
            content.categories = v;
        }

        content.id = CONTENT_ID.to_string();
        put(self.store.as_ref(), Table::AppContent, &content, CONTENT_ID).await?;
        log::info!("App content updated");
        Ok(content.public())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use std::sync::Arc;

    fn service() -> ContentService {
        ContentService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_missing_row_reads_defaults() {
        let content = service().get().await.unwrap();
        assert_eq!(content.code_prefix, "NICE");
        assert_eq!(content.admin_password, None);
        assert!(!content.categories.is_empty());
    }

    #[tokio::test]
    async fn test_update_hides_password_from_public_reads() {
        let svc = service();
        let updated = svc
            .update(UpdateContentRequest {
                admin_password: Some("s3cret".into()),
                code_prefix: Some("vip".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.admin_password, None);
        assert_eq!(updated.code_prefix, "VIP");

        assert_eq!(svc.get().await.unwrap().admin_password.as_deref(), Some("s3cret"));
        assert_eq!(svc.get_public().await.unwrap().admin_password, None);
    }

    #[tokio::test]
    async fn test_update_rejects_bad_prefix() {
        let err = service()
            .update(UpdateContentRequest {
                code_prefix: Some("NI CE".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
