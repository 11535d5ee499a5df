use crate::database::{DynStore, Table, fetch_all, require_by_id};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::{CatalogService, CouponService, OutboxService};
use crate::utils::generate_id;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

/// 未填写地点时的默认值（联系客户时再确定）
pub const DEFAULT_LOCATION: &str = "سيتم التحديد عند التواصل";

#[derive(Clone)]
pub struct BookingService {
    store: DynStore,
    outbox: Arc<OutboxService>,
    catalog: CatalogService,
    coupons: CouponService,
}

impl BookingService {
    pub fn new(
        store: DynStore,
        outbox: Arc<OutboxService>,
        catalog: CatalogService,
        coupons: CouponService,
    ) -> Self {
        Self {
            store,
            outbox,
            catalog,
            coupons,
        }
    }

    /// Turn the cart into a Pending booking. Prices come from the catalog, never
    /// from the client.
    pub async fn checkout(
        &self,
        customer: &CustomerCode,
        request: CheckoutRequest,
    ) -> AppResult<Booking> {
        if request.items.is_empty() {
            return Err(AppError::ValidationError("Cart is empty".to_string()));
        }

        let mut items = Vec::with_capacity(request.items.len());
        let mut subtotal = 0.0;
        for line in &request.items {
            if line.quantity == 0 {
                return Err(AppError::ValidationError(format!(
                    "Quantity for {} must be at least 1",
                    line.product_id
                )));
            }
            let product = self.catalog.get_product(&line.product_id).await?;
            if !product.is_available {
                return Err(AppError::ValidationError(format!(
                    "{} is not available",
                    product.name
                )));
            }
            subtotal += product.price * f64::from(line.quantity);
            items.push(BookingItem {
                product_id: product.id,
                quantity: line.quantity,
                name: product.name,
            });
        }

        let coupon = match request.coupon_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => Some(self.coupons.validate(code).await?),
            _ => None,
        };
        let discount = coupon.as_ref().map_or(0.0, |c| c.discount_on(subtotal));
        let total_price = subtotal - discount;

        let now = Utc::now();
        let start_date = request.start_date.unwrap_or(now);
        let end_date = request.end_date.unwrap_or(start_date);
        if end_date < start_date {
            return Err(AppError::ValidationError(
                "End date must not be before start date".to_string(),
            ));
        }

        let booking = Booking {
            id: generate_id("BOK"),
            user_id: customer.id.clone(),
            user_name: customer.customer_name.clone(),
            user_phone: customer.user_phone.clone().unwrap_or_default(),
            start_date,
            end_date,
            status: BookingStatus::Pending,
            total_price,
            location: request
                .location
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            created_at: now,
            items,
            deposit_amount: deposit_for(total_price),
            coupon_code: coupon.as_ref().map(|c| c.code.clone()),
            discount_amount: discount,
        };

        self.outbox
            .save_or_enqueue(self.store.as_ref(), Table::Bookings, &booking, &booking.id)
            .await?;

        if let Some(coupon) = &coupon
            && let Err(e) = self.coupons.record_usage(coupon).await
        {
            log::warn!("Failed to record usage of coupon {}: {e}", coupon.code);
        }

        log::info!(
            "Booking created: id={}, user={}, total={:.2}, deposit={:.2}",
            booking.id,
            booking.user_id,
            booking.total_price,
            booking.deposit_amount
        );
        Ok(booking)
    }

    /// A customer's bookings, newest first.
    pub async fn my_bookings(&self, user_id: &str) -> AppResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = fetch_all(self.store.as_ref(), Table::Bookings).await?;
        bookings.retain(|b| b.user_id == user_id);
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    /// Customers only see their own bookings; anything else reads as missing.
    pub async fn get(&self, session: &Session, id: &str) -> AppResult<Booking> {
        let booking: Booking = require_by_id(self.store.as_ref(), Table::Bookings, id).await?;
        if !session.is_admin() && session.customer_id() != Some(booking.user_id.as_str()) {
            return Err(AppError::NotFound(format!("bookings record {id} not found")));
        }
        Ok(booking)
    }

    pub async fn list(&self, query: &BookingQuery) -> AppResult<PaginatedResponse<Booking>> {
        let mut bookings: Vec<Booking> = fetch_all(self.store.as_ref(), Table::Bookings).await?;
        if let Some(status) = query.status {
            bookings.retain(|b| b.status == status);
        }
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(PaginationParams::new(query.page, query.per_page).paginate(bookings))
    }

    pub async fn set_status(&self, id: &str, status: BookingStatus) -> AppResult<Booking> {
        let mut booking: Booking = require_by_id(self.store.as_ref(), Table::Bookings, id).await?;
        if !booking.status.can_transition_to(status) {
            return Err(AppError::InvalidTransition(format!(
                "booking {id} cannot move from {} to {status}",
                booking.status
            )));
        }

        self.store
            .update(Table::Bookings, json!({ "status": status }), id)
            .await?;
        log::info!("Booking {id} status: {} -> {status}", booking.status);
        booking.status = status;
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, put};
    use chrono::Duration;
    use tempfile::TempDir;

    struct Fixture {
        service: BookingService,
        coupons: CouponService,
        _dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store: DynStore = Arc::new(MemoryStore::new());
        for (id, price, available) in [("kosha", 1500.0, true), ("chair", 20.0, true), ("old", 10.0, false)] {
            let product = Product {
                id: id.into(),
                name: id.into(),
                description: String::new(),
                price,
                images: vec![],
                category_id: String::new(),
                section_id: String::new(),
                is_available: available,
                stock: 1,
                specifications: Specifications::default(),
            };
            put(store.as_ref(), Table::Products, &product, id).await.unwrap();
        }
        let outbox = Arc::new(
            OutboxService::load(dir.path().join("outbox.json"))
                .await
                .unwrap(),
        );
        let coupons = CouponService::new(store.clone());
        let service = BookingService::new(
            store.clone(),
            outbox,
            CatalogService::new(store),
            coupons.clone(),
        );
        Fixture {
            service,
            coupons,
            _dir: dir,
        }
    }

    fn customer(id: &str) -> CustomerCode {
        let mut c = CustomerCode::pending(id.into(), "Sara".into(), Some("0501234567".into()));
        c.code = "NICE-1234".into();
        c.status = CodeStatus::Approved;
        c.is_active = true;
        c
    }

    fn cart(lines: &[(&str, u32)]) -> CheckoutRequest {
        CheckoutRequest {
            items: lines
                .iter()
                .map(|(id, qty)| CartLine {
                    product_id: id.to_string(),
                    quantity: *qty,
                })
                .collect(),
            location: None,
            start_date: None,
            end_date: None,
            coupon_code: None,
        }
    }

    #[tokio::test]
    async fn test_checkout_prices_from_catalog() {
        let f = fixture().await;
        let booking = f
            .service
            .checkout(&customer("C-1"), cart(&[("kosha", 1), ("chair", 50)]))
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.total_price, 2500.0);
        assert_eq!(booking.deposit_amount, 2500.0 * 0.20);
        assert_eq!(booking.location, DEFAULT_LOCATION);
        assert_eq!(booking.user_phone, "0501234567");
        assert_eq!(booking.items.len(), 2);
        assert!(booking.id.starts_with("BOK-"));
    }

    #[tokio::test]
    async fn test_checkout_rejects_bad_carts() {
        let f = fixture().await;
        let sara = customer("C-1");
        assert!(f.service.checkout(&sara, cart(&[])).await.is_err());
        assert!(f.service.checkout(&sara, cart(&[("chair", 0)])).await.is_err());
        assert!(f.service.checkout(&sara, cart(&[("old", 1)])).await.is_err());
        assert!(matches!(
            f.service.checkout(&sara, cart(&[("ghost", 1)])).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_checkout_applies_coupon_and_counts_usage() {
        let f = fixture().await;
        f.coupons
            .create(CreateCouponRequest {
                code: "WEDDING10".into(),
                discount_type: DiscountType::Percentage,
                discount_value: 10.0,
                valid_until: Utc::now() + Duration::days(1),
                usage_limit: Some(1),
            })
            .await
            .unwrap();

        let mut request = cart(&[("kosha", 1)]);
        request.coupon_code = Some("wedding10".into());
        let booking = f.service.checkout(&customer("C-1"), request).await.unwrap();

        assert_eq!(booking.discount_amount, 150.0);
        assert_eq!(booking.total_price, 1350.0);
        assert_eq!(booking.deposit_amount, 1350.0 * 0.20);
        assert_eq!(booking.coupon_code.as_deref(), Some("WEDDING10"));

        // 使用次数已满
        let mut again = cart(&[("kosha", 1)]);
        again.coupon_code = Some("WEDDING10".into());
        assert!(f.service.checkout(&customer("C-1"), again).await.is_err());
    }

    #[tokio::test]
    async fn test_customers_only_see_own_bookings() {
        let f = fixture().await;
        let booking = f
            .service
            .checkout(&customer("C-1"), cart(&[("chair", 2)]))
            .await
            .unwrap();

        assert_eq!(f.service.my_bookings("C-1").await.unwrap().len(), 1);
        assert!(f.service.my_bookings("C-2").await.unwrap().is_empty());

        let owner = Session::customer(customer("C-1"));
        let stranger = Session::customer(customer("C-2"));
        assert!(f.service.get(&owner, &booking.id).await.is_ok());
        assert!(f.service.get(&stranger, &booking.id).await.is_err());
        assert!(f.service.get(&Session::admin(), &booking.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_admin_status_transitions() {
        let f = fixture().await;
        let id = f
            .service
            .checkout(&customer("C-1"), cart(&[("chair", 1)]))
            .await
            .unwrap()
            .id;

        assert!(matches!(
            f.service.set_status(&id, BookingStatus::Delivered).await,
            Err(AppError::InvalidTransition(_))
        ));
        for next in [
            BookingStatus::Confirmed,
            BookingStatus::Delivered,
            BookingStatus::Completed,
        ] {
            assert_eq!(f.service.set_status(&id, next).await.unwrap().status, next);
        }
        assert!(f.service.set_status(&id, BookingStatus::Cancelled).await.is_err());

        let listed = f
            .service
            .list(&BookingQuery {
                page: None,
                per_page: None,
                status: Some(BookingStatus::Completed),
            })
            .await
            .unwrap();
        assert_eq!(listed.total, 1);
    }
}
