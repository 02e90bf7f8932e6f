//! Admin-facing coupon management. Resolution lives in
//! [`crate::services::discounts`]; this module only creates, lists and
//! retires coupon rows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::coupon;
use crate::errors::ServiceError;

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct CreateCouponRequest {
    #[validate(length(min = 3, max = 32))]
    pub code: String,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub max_discount: Option<i64>,
    pub min_purchase: Option<i64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: Option<i32>,
}

#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, req), fields(code = %req.code))]
    pub async fn create_coupon(
        &self,
        req: CreateCouponRequest,
    ) -> Result<coupon::Model, ServiceError> {
        req.validate()?;

        match req.discount_type.as_str() {
            "percentage" => {
                if req.discount_value <= Decimal::ZERO || req.discount_value > Decimal::from(100)
                {
                    return Err(ServiceError::ValidationError(
                        "Nilai diskon persentase harus antara 0 dan 100".to_string(),
                    ));
                }
            }
            "fixed" => {
                if req.discount_value <= Decimal::ZERO {
                    return Err(ServiceError::ValidationError(
                        "Nilai diskon harus lebih dari 0".to_string(),
                    ));
                }
            }
            other => {
                return Err(ServiceError::ValidationError(format!(
                    "Tipe diskon tidak dikenal: {}",
                    other
                )));
            }
        }

        let code = req.code.trim().to_uppercase();
        let existing = coupon::Entity::find()
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Kode kupon {} sudah terdaftar",
                code
            )));
        }

        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            discount_type: Set(req.discount_type),
            discount_value: Set(req.discount_value),
            max_discount: Set(req.max_discount),
            min_purchase: Set(req.min_purchase),
            starts_at: Set(req.starts_at),
            ends_at: Set(req.ends_at),
            usage_limit: Set(req.usage_limit),
            usage_limit_per_user: Set(req.usage_limit_per_user),
            usage_count: Set(0),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        info!(coupon_id = %model.id, code = %model.code, "Coupon created");
        Ok(model)
    }

    pub async fn list_coupons(&self) -> Result<Vec<coupon::Model>, ServiceError> {
        Ok(coupon::Entity::find()
            .order_by_desc(coupon::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Hard-deletes an unused coupon; one with usage history is only
    /// deactivated so past redemptions keep a valid reference.
    #[instrument(skip(self))]
    pub async fn delete_coupon(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = coupon::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Kupon tidak ditemukan".to_string()))?;

        if existing.usage_count > 0 {
            let mut active: coupon::ActiveModel = existing.into();
            active.is_active = Set(false);
            active.updated_at = Set(Some(Utc::now()));
            active.update(&*self.db).await?;
            info!(coupon_id = %id, "Coupon deactivated (has usage history)");
        } else {
            existing.delete(&*self.db).await?;
            info!(coupon_id = %id, "Coupon deleted");
        }
        Ok(())
    }
}
