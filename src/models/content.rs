use crate::config::DEFAULT_CODE_PREFIX;
use super::common::null_as_default;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

pub const CONTENT_ID: &str = "main";

/// Storefront texts and settings, stored as a single row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppContent {
    #[serde(default = "default_content_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub about_us: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rental_policy: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cancellation_policy: String,
    #[serde(default, alias = "admin_password", skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(default = "default_prefix", deserialize_with = "prefix_or_default")]
    pub code_prefix: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub gallery: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
}

fn default_content_id() -> String {
    CONTENT_ID.to_string()
}

fn default_prefix() -> String {
    DEFAULT_CODE_PREFIX.to_string()
}

fn prefix_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_prefix))
}

impl Default for AppContent {
    fn default() -> Self {
        Self {
            id: default_content_id(),
            about_us: "نحن متخصصون في تأجير أفخم مستلزمات الأعراس والمناسبات، نسعى دائماً لجعل ليلة العمر ذكرى لا تُنسى.".to_string(),
            rental_policy: "يتم دفع تأمين مسترد عند الحجز. يجب الحفاظ على سلامة القطع المستأجرة.".to_string(),
            cancellation_policy: "العربون غير مسترد في حال الإلغاء قبل الموعد بـ 48 ساعة.".to_string(),
            admin_password: None,
            code_prefix: default_prefix(),
            gallery: Vec::new(),
            categories: ["كوشات", "صوتيات", "إضاءة", "أثاث", "أدوات مائدة"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl AppContent {
    /// Copy safe to hand to any client.
    pub fn public(&self) -> Self {
        Self {
            admin_password: None,
            ..self.clone()
        }
    }
}

/// Partial update from the admin settings form.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContentRequest {
    pub about_us: Option<String>,
    pub rental_policy: Option<String>,
    pub cancellation_policy: Option<String>,
    pub admin_password: Option<String>,
    pub code_prefix: Option<String>,
    pub gallery: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_columns_read_as_defaults() {
        let row = serde_json::json!({
            "id": "main",
            "admin_password": "OWNER9",
            "aboutUs": null,
            "codePrefix": null,
            "gallery": null,
            "categories": null
        });
        let content: AppContent = serde_json::from_value(row).unwrap();
        assert_eq!(content.admin_password.as_deref(), Some("OWNER9"));
        assert_eq!(content.code_prefix, "NICE");
        assert!(content.about_us.is_empty());
        assert!(content.gallery.is_empty());
        assert!(content.categories.is_empty());
    }
}
