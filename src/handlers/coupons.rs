use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::entities::coupon;
use crate::errors::ServiceError;
use crate::services::coupons::CreateCouponRequest;
use crate::services::discounts::{self, CustomerIdentity};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub subtotal: i64,
    pub user_id: Option<Uuid>,
    pub guest_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidatedCoupon {
    pub code: String,
    pub discount_amount: i64,
}

/// POST /coupons/validate. Public; runs the exact resolver the checkout
/// path uses, so the amounts always agree.
pub async fn validate_coupon(
    State(state): State<AppState>,
    Json(request): Json<ValidateCouponRequest>,
) -> ApiResult<ValidatedCoupon> {
    let identity = match (request.user_id, request.guest_email) {
        (Some(id), _) => CustomerIdentity::User(id),
        (None, Some(email)) => CustomerIdentity::Guest(email),
        (None, None) => CustomerIdentity::Guest(String::new()),
    };

    match discounts::resolve(
        &*state.db,
        &request.code,
        request.subtotal,
        &identity,
        Utc::now(),
    )
    .await?
    {
        Ok(resolved) => Ok(ApiResponse::ok(ValidatedCoupon {
            code: resolved.code,
            discount_amount: resolved.amount,
        })),
        Err(rejection) => Err(ServiceError::ValidationError(rejection.message())),
    }
}

/// POST /coupons (admin).
pub async fn create_coupon(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateCouponRequest>,
) -> ApiResult<coupon::Model> {
    let created = state.services.coupons.create_coupon(request).await?;
    Ok(ApiResponse::ok(created))
}

/// GET /coupons (admin).
pub async fn list_coupons(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<coupon::Model>> {
    let coupons = state.services.coupons.list_coupons().await?;
    Ok(ApiResponse::ok(coupons))
}

/// DELETE /coupons/:id (admin). Deactivates instead of deleting once the
/// coupon has usage history.
pub async fn delete_coupon(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.coupons.delete_coupon(id).await?;
    Ok(ApiResponse::message("Kupon dihapus"))
}
