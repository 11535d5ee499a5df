use crate::database::{DynStore, Table, fetch_all};
use crate::error::AppResult;
use crate::models::*;
use std::collections::BTreeMap;

#[derive(Clone)]
pub struct ReportService {
    store: DynStore,
}

impl ReportService {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    pub async fn summary(&self) -> AppResult<ReportSummary> {
        let bookings: Vec<Booking> = fetch_all(self.store.as_ref(), Table::Bookings).await?;
        let codes: Vec<CustomerCode> = fetch_all(self.store.as_ref(), Table::CustomerCodes).await?;
        let products: Vec<Product> = fetch_all(self.store.as_ref(), Table::Products).await?;
        Ok(summarize(&bookings, &codes, products.len()))
    }
}

pub fn summarize(bookings: &[Booking], codes: &[CustomerCode], product_count: usize) -> ReportSummary {
    let mut bookings_by_status: BTreeMap<String, usize> = BookingStatus::ALL
        .iter()
        .map(|s| (s.to_string(), 0))
        .collect();
    let mut total_revenue = 0.0;
    let mut total_deposits = 0.0;

    for booking in bookings {
        *bookings_by_status.entry(booking.status.to_string()).or_default() += 1;
        if booking.status.is_revenue() {
            total_revenue += booking.total_price;
            total_deposits += booking.deposit_amount;
        }
    }

    ReportSummary {
        total_revenue,
        total_deposits,
        bookings_by_status,
        pending_access_requests: codes
            .iter()
            .filter(|c| c.status == CodeStatus::Pending)
            .count(),
        active_customers: codes.iter().filter(|c| c.is_active).count(),
        product_count,
    }
}
