use axum::extract::State;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::auth::AdminUser;
use crate::entities::product_variant;
use crate::{ApiResponse, ApiResult, AppState};

/// GET /variants/low-stock (admin). Variants at or below their minimum
/// stock threshold.
pub async fn list_low_stock(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<product_variant::Model>> {
    let variants = product_variant::Entity::find()
        .filter(product_variant::Column::IsActive.eq(true))
        .filter(
            Expr::col(product_variant::Column::StockQuantity)
                .lte(Expr::col(product_variant::Column::MinStock)),
        )
        .order_by_asc(product_variant::Column::StockQuantity)
        .all(&*state.db)
        .await
        .map_err(crate::errors::ServiceError::from)?;
    Ok(ApiResponse::ok(variants))
}
