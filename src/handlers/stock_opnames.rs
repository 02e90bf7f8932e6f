use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::entities::stock_opname;
use crate::services::stock_opname::{
    CreateOpnameRequest, OpnameDetailView, OpnameSummary, UpdateOpnameDetailRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

/// POST /stock-opnames (admin).
pub async fn create_opname(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateOpnameRequest>,
) -> ApiResult<OpnameDetailView> {
    let view = state.services.stock_opnames.create(request).await?;
    Ok(ApiResponse::ok(view))
}

/// GET /stock-opnames (admin).
pub async fn list_opnames(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<stock_opname::Model>> {
    let opnames = state.services.stock_opnames.list().await?;
    Ok(ApiResponse::ok(opnames))
}

/// GET /stock-opnames/:id (admin).
pub async fn get_opname(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OpnameDetailView> {
    let view = state.services.stock_opnames.get(id).await?;
    Ok(ApiResponse::ok(view))
}

/// PUT /stock-opnames/:id/details/:detail_id (admin). Draft only.
pub async fn update_detail(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((id, detail_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateOpnameDetailRequest>,
) -> ApiResult<crate::entities::stock_opname_detail::Model> {
    let detail = state
        .services
        .stock_opnames
        .update_detail(id, detail_id, request)
        .await?;
    Ok(ApiResponse::ok(detail))
}

/// POST /stock-opnames/:id/complete (admin).
pub async fn complete_opname(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OpnameSummary> {
    let summary = state.services.stock_opnames.complete(id).await?;
    Ok(ApiResponse::ok(summary))
}

/// POST /stock-opnames/:id/cancel (admin).
pub async fn cancel_opname(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<stock_opname::Model> {
    let cancelled = state.services.stock_opnames.cancel(id).await?;
    Ok(ApiResponse::ok(cancelled))
}
