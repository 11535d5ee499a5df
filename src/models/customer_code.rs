use chrono::{DateTime, Utc};
use super::common::null_as_default;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 待审核记录的占位码
pub const PENDING_CODE: &str = "PENDING";
/// 被封禁记录的占位码
pub const BLOCKED_CODE: &str = "BLOCKED";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CodeStatus {
    Pending,
    Approved,
    Rejected,
    Blocked,
}

impl std::fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeStatus::Pending => write!(f, "pending"),
            CodeStatus::Approved => write!(f, "approved"),
            CodeStatus::Rejected => write!(f, "rejected"),
            CodeStatus::Blocked => write!(f, "blocked"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCode {
    pub id: String,
    pub code: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_phone: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub status: CodeStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub wallet_balance: f64,
}

impl CustomerCode {
    /// A fresh access request: inactive, placeholder code, empty wallet.
    pub fn pending(id: String, customer_name: String, user_phone: Option<String>) -> Self {
        Self {
            id,
            code: PENDING_CODE.to_string(),
            customer_name,
            user_phone,
            created_at: Utc::now(),
            is_active: false,
            status: CodeStatus::Pending,
            wallet_balance: 0.0,
        }
    }

    pub fn matches(&self, presented: &str) -> bool {
        self.is_active && self.code == presented
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeRequest {
    #[schema(example = "NICE-1234")]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestAccessRequest {
    #[schema(example = "سارة")]
    pub name: String,
    #[schema(example = "0501234567")]
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestAccessResponse {
    pub id: String,
    pub status: CodeStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueCodeRequest {
    pub customer_name: String,
    #[serde(default)]
    pub user_phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<CodeStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_defaults() {
        let c = CustomerCode::pending("C-1".into(), "Sara".into(), None);
        assert_eq!(c.code, PENDING_CODE);
        assert_eq!(c.status, CodeStatus::Pending);
        assert!(!c.is_active);
        assert_eq!(c.wallet_balance, 0.0);
        // 占位码永远不能登录
        assert!(!c.matches(PENDING_CODE));
    }

    #[test]
    fn test_deserialize_backend_row() {
        let row = serde_json::json!({
            "id": "C-1700000000000",
            "code": "NICE-4821",
            "customerName": "أحمد",
            "isActive": true,
            "status": "approved",
            "walletBalance": 0,
            "createdAt": "2024-03-10T10:00:00Z"
        });
        let c: CustomerCode = serde_json::from_value(row).unwrap();
        assert!(c.matches("NICE-4821"));
        assert_eq!(c.user_phone, None);
    }

    #[test]
    fn test_null_wallet_balance_reads_as_zero() {
        let row = serde_json::json!({
            "id": "C-2",
            "code": "NICE-1000",
            "customerName": "Huda",
            "isActive": true,
            "status": "approved",
            "walletBalance": null
        });
        let c: CustomerCode = serde_json::from_value(row).unwrap();
        assert_eq!(c.wallet_balance, 0.0);
        assert!(c.matches("NICE-1000"));
    }
}
