use axum::extract::State;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::shipping_cost;
use crate::{ApiResponse, ApiResult, AppState};

/// GET /shipping-costs. Public read-only rate table; checkout always reads
/// the cost server-side from the same rows.
pub async fn list_shipping_costs(
    State(state): State<AppState>,
) -> ApiResult<Vec<shipping_cost::Model>> {
    let rates = shipping_cost::Entity::find()
        .filter(shipping_cost::Column::IsActive.eq(true))
        .order_by_asc(shipping_cost::Column::Courier)
        .all(&*state.db)
        .await
        .map_err(crate::errors::ServiceError::from)?;
    Ok(ApiResponse::ok(rates))
}
