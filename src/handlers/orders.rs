use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{AdminUser, OptionalUser};
use crate::entities::order;
use crate::services::order_status::OrderStatus;
use crate::services::orders::{
    CreateOrderRequest, CreatedOrder, OrderDetail, OrderListFilter, OrderPage,
};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AttachTrackingRequest {
    pub tracking_number: String,
}

/// POST /orders. Registered users authenticate with a bearer token; guests
/// supply `guest_email` in the body.
pub async fn create_order(
    State(state): State<AppState>,
    OptionalUser(claims): OptionalUser,
    Json(request): Json<CreateOrderRequest>,
) -> ApiResult<CreatedOrder> {
    let user_id = claims.map(|c| c.sub);
    let created = state.services.orders.create_order(request, user_id).await?;
    Ok(ApiResponse::ok(created))
}

/// GET /orders/track/:token. Public; the token is the credential.
pub async fn track_order(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<OrderDetail> {
    let detail = state.services.orders.track_by_token(&token).await?;
    Ok(ApiResponse::ok(detail))
}

/// GET /orders (admin).
pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<OrderListFilter>,
) -> ApiResult<OrderPage> {
    let page = state.services.orders.list_orders(filter).await?;
    Ok(ApiResponse::ok(page))
}

/// GET /orders/:id (admin).
pub async fn get_order(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetail> {
    let detail = state.services.orders.get_order(id).await?;
    Ok(ApiResponse::ok(detail))
}

/// PUT /orders/:id/status (admin).
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<order::Model> {
    let actor = claims.email.or(Some(claims.sub.to_string()));
    let updated = state
        .services
        .order_status
        .set_status(id, request.status, request.notes, actor)
        .await?;
    Ok(ApiResponse::ok(updated))
}

/// PUT /orders/:id/tracking (admin). Attaching a courier tracking number
/// moves the order to `shipped`.
pub async fn attach_tracking(
    State(state): State<AppState>,
    AdminUser(claims): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AttachTrackingRequest>,
) -> ApiResult<order::Model> {
    let actor = claims.email.or(Some(claims.sub.to_string()));
    let updated = state
        .services
        .order_status
        .attach_tracking(id, request.tracking_number, actor)
        .await?;
    Ok(ApiResponse::ok(updated))
}
