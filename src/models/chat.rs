use super::common::null_as_default;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Customer,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    /// Customer code id the conversation belongs to.
    #[serde(alias = "customer_code_id", default, deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(alias = "sender_type")]
    pub sender: Sender,
    #[serde(alias = "message")]
    pub text: String,
    #[serde(alias = "created_at", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(alias = "is_read", default, deserialize_with = "null_as_default")]
    pub is_read: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub text: String,
    /// Required when an admin replies.
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_row() {
        let row = serde_json::json!({
            "id": "MSG-1700000000000",
            "customer_code_id": "C-1",
            "sender_type": "customer",
            "message": "متى يصل الطلب؟",
            "is_read": false,
            "created_at": "2024-03-10T10:00:00Z"
        });
        let m: ChatMessage = serde_json::from_value(row).unwrap();
        assert_eq!(m.user_id, "C-1");
        assert_eq!(m.sender, Sender::Customer);
        assert_eq!(m.text, "متى يصل الطلب؟");
        assert!(!m.is_read);
    }

    #[test]
    fn test_admin_row_without_customer_or_timestamp() {
        let row = serde_json::json!({
            "id": "MSG-2",
            "customer_code_id": null,
            "sender_type": "admin",
            "message": "أهلاً",
            "is_read": null
        });
        let m: ChatMessage = serde_json::from_value(row).unwrap();
        assert!(m.user_id.is_empty());
        assert_eq!(m.sender, Sender::Admin);
        assert!(!m.is_read);
    }
}
