//! Lokapasar marketplace API: checkout, coupons, order lifecycle and stock
//! opname over a relational store.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod notifications;
pub mod services;

use config::AppConfig;
use errors::ServiceError;
use events::EventSender;
use handlers::AppServices;

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub event_sender: EventSender,
    pub services: AppServices,
}

/// Uniform success envelope; errors use the same shape with `success:false`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: None,
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            message: Some(message.to_string()),
        })
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ServiceError>;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn status(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    state.db.ping().await.map_err(ServiceError::from)?;
    Ok(ApiResponse::ok(serde_json::json!({
        "database": "up",
        "environment": state.config.environment,
    })))
}

/// All `/api/v1` routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/orders",
            post(handlers::orders::create_order).get(handlers::orders::list_orders),
        )
        .route("/orders/track/:token", get(handlers::orders::track_order))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/status", put(handlers::orders::update_status))
        .route("/orders/:id/tracking", put(handlers::orders::attach_tracking))
        .route("/coupons/validate", post(handlers::coupons::validate_coupon))
        .route(
            "/coupons",
            post(handlers::coupons::create_coupon).get(handlers::coupons::list_coupons),
        )
        .route("/coupons/:id", delete(handlers::coupons::delete_coupon))
        .route(
            "/shipping-costs",
            get(handlers::shipping_costs::list_shipping_costs),
        )
        .route(
            "/cart/items",
            get(handlers::carts::list_items).post(handlers::carts::add_item),
        )
        .route("/cart/items/:id", delete(handlers::carts::remove_item))
        .route("/variants/low-stock", get(handlers::variants::list_low_stock))
        .route(
            "/stock-opnames",
            post(handlers::stock_opnames::create_opname)
                .get(handlers::stock_opnames::list_opnames),
        )
        .route("/stock-opnames/:id", get(handlers::stock_opnames::get_opname))
        .route(
            "/stock-opnames/:id/details/:detail_id",
            put(handlers::stock_opnames::update_detail),
        )
        .route(
            "/stock-opnames/:id/complete",
            post(handlers::stock_opnames::complete_opname),
        )
        .route(
            "/stock-opnames/:id/cancel",
            post(handlers::stock_opnames::cancel_opname),
        )
}

/// Full application router: liveness endpoints plus the versioned API,
/// with request tracing. Outer layers (CORS, compression) are applied by
/// the binary.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .nest("/api/v1", api_v1_routes())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
