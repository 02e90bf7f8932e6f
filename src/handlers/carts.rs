use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::entities::cart_item;
use crate::services::carts::AddCartItemRequest;
use crate::{ApiResponse, ApiResult, AppState};

/// POST /cart/items.
pub async fn add_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<AddCartItemRequest>,
) -> ApiResult<cart_item::Model> {
    let line = state.services.carts.add_item(claims.sub, request).await?;
    Ok(ApiResponse::ok(line))
}

/// GET /cart/items.
pub async fn list_items(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> ApiResult<Vec<cart_item::Model>> {
    let lines = state.services.carts.list_items(claims.sub).await?;
    Ok(ApiResponse::ok(lines))
}

/// DELETE /cart/items/:id.
pub async fn remove_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.services.carts.remove_item(claims.sub, id).await?;
    Ok(ApiResponse::message("Item dihapus dari keranjang"))
}
