//! HTTP handlers. Each submodule owns one resource; routing is assembled in
//! `crate::api_v1_routes`.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::carts::CartService;
use crate::services::coupons::CouponService;
use crate::services::order_status::OrderStatusService;
use crate::services::orders::OrderService;
use crate::services::stock_opname::StockOpnameService;

pub mod carts;
pub mod coupons;
pub mod orders;
pub mod shipping_costs;
pub mod stock_opnames;
pub mod variants;

/// Service instances shared by all handlers through `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub orders: OrderService,
    pub order_status: OrderStatusService,
    pub coupons: CouponService,
    pub carts: CartService,
    pub stock_opnames: StockOpnameService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        config: AppConfig,
    ) -> Self {
        Self {
            orders: OrderService::new(db.clone(), event_sender.clone(), config),
            order_status: OrderStatusService::new(db.clone(), event_sender.clone()),
            coupons: CouponService::new(db.clone()),
            carts: CartService::new(db.clone()),
            stock_opnames: StockOpnameService::new(db, event_sender),
        }
    }
}
