use crate::database::{DynStore, Table, fetch_all, require_by_id, put};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::generate_id;
use chrono::Utc;
use serde_json::json;

#[derive(Clone)]
pub struct CouponService {
    store: DynStore,
}

impl CouponService {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AppResult<Vec<Coupon>> {
        let mut coupons: Vec<Coupon> = fetch_all(self.store.as_ref(), Table::Coupons).await?;
        coupons.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(coupons)
    }

    pub async fn create(&self, request: CreateCouponRequest) -> AppResult<Coupon> {
        let code = request.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(AppError::ValidationError("Coupon code is required".to_string()));
        }
        if request.discount_value <= 0.0 {
            return Err(AppError::ValidationError(
                "Discount value must be positive".to_string(),
            ));
        }
        if request.discount_type == DiscountType::Percentage && request.discount_value > 100.0 {
            return Err(AppError::ValidationError(
                "Percentage discount cannot exceed 100".to_string(),
            ));
        }

        let existing = self.list().await?;
        if existing.iter().any(|c| c.code == code) {
            return Err(AppError::ValidationError(format!(
                "Coupon {code} already exists"
            )));
        }

        let coupon = Coupon {
            id: generate_id("CP"),
            code,
            discount_type: request.discount_type,
            discount_value: request.discount_value,
            valid_until: request.valid_until,
            usage_limit: request.usage_limit,
            usage_count: 0,
            is_active: true,
            created_at: Utc::now(),
        };
        put(self.store.as_ref(), Table::Coupons, &coupon, &coupon.id).await?;
        log::info!("Coupon created: {}", coupon.code);
        Ok(coupon)
    }

    pub async fn set_active(&self, id: &str, is_active: bool) -> AppResult<Coupon> {
        let mut coupon: Coupon = require_by_id(self.store.as_ref(), Table::Coupons, id).await?;
        self.store
            .update(Table::Coupons, json!({ "isActive": is_active }), id)
            .await?;
        coupon.is_active = is_active;
        Ok(coupon)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.store.delete(Table::Coupons, id).await
    }

    /// 按券码查找可用优惠券（大小写不敏感）
    pub async fn validate(&self, code: &str) -> AppResult<Coupon> {
        let code = code.trim().to_uppercase();
        let coupon = self
            .list()
            .await?
            .into_iter()
            .find(|c| c.code == code)
            .ok_or_else(|| AppError::NotFound(format!("Coupon {code} not found")))?;

        if !coupon.is_redeemable(Utc::now()) {
            return Err(AppError::ValidationError(format!(
                "Coupon {code} is expired or no longer available"
            )));
        }
        Ok(coupon)
    }

    pub async fn check(&self, request: &ValidateCouponRequest) -> AppResult<ValidateCouponResponse> {
        let coupon = self.validate(&request.code).await?;
        let discount = request.total.map(|total| calculate_discount(&coupon, total));
        Ok(ValidateCouponResponse { coupon, discount })
    }

    /// Count one redemption. Last write wins under concurrent checkouts.
    pub async fn record_usage(&self, coupon: &Coupon) -> AppResult<()> {
        self.store
            .update(
                Table::Coupons,
                json!({ "usageCount": coupon.usage_count + 1 }),
                &coupon.id,
            )
            .await
    }
}

pub fn calculate_discount(coupon: &Coupon, total: f64) -> f64 {
    coupon.discount_on(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use chrono::Duration;
    use std::sync::Arc;

    fn request(code: &str, discount_type: DiscountType, value: f64) -> CreateCouponRequest {
        CreateCouponRequest {
            code: code.into(),
            discount_type,
            discount_value: value,
            valid_until: Utc::now() + Duration::days(7),
            usage_limit: Some(1),
        }
    }

    #[tokio::test]
    async fn test_create_and_validate_case_insensitive() {
        let svc = CouponService::new(Arc::new(MemoryStore::new()));
        let created = svc
            .create(request("wedding10", DiscountType::Percentage, 10.0))
            .await
            .unwrap();
        assert_eq!(created.code, "WEDDING10");

        let checked = svc
            .check(&ValidateCouponRequest {
                code: " Wedding10 ".into(),
                total: Some(1000.0),
            })
            .await
            .unwrap();
        assert_eq!(checked.discount, Some(100.0));
    }

    #[tokio::test]
    async fn test_duplicate_and_invalid_coupons_rejected() {
        let svc = CouponService::new(Arc::new(MemoryStore::new()));
        svc.create(request("A", DiscountType::Fixed, 5.0)).await.unwrap();
        assert!(svc.create(request("a", DiscountType::Fixed, 5.0)).await.is_err());
        assert!(svc.create(request("B", DiscountType::Percentage, 120.0)).await.is_err());
        assert!(svc.create(request("C", DiscountType::Fixed, 0.0)).await.is_err());
    }

    #[tokio::test]
    async fn test_usage_limit_and_deactivation() {
        let svc = CouponService::new(Arc::new(MemoryStore::new()));
        let coupon = svc.create(request("ONCE", DiscountType::Fixed, 50.0)).await.unwrap();

        svc.record_usage(&coupon).await.unwrap();
        assert!(matches!(
            svc.validate("ONCE").await,
            Err(AppError::ValidationError(_))
        ));

        let other = svc.create(request("OFF", DiscountType::Fixed, 50.0)).await.unwrap();
        svc.set_active(&other.id, false).await.unwrap();
        assert!(svc.validate("OFF").await.is_err());
        assert!(matches!(
            svc.validate("MISSING").await,
            Err(AppError::NotFound(_))
        ));
    }
}
