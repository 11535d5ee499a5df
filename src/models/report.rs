use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    /// Sum of totals over Confirmed, Delivered and Completed bookings.
    pub total_revenue: f64,
    pub total_deposits: f64,
    pub bookings_by_status: BTreeMap<String, usize>,
    pub pending_access_requests: usize,
    pub active_customers: usize,
    pub product_count: usize,
}
