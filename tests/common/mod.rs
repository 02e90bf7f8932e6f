//! Shared test harness: a fresh SQLite-backed application per test.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use lokapasar_api::auth::issue_token;
use lokapasar_api::config::AppConfig;
use lokapasar_api::db::{self, DbConfig};
use lokapasar_api::entities::{coupon, legacy_discount, product, product_variant, shipping_cost, user};
use lokapasar_api::events::{process_events, EventSender};
use lokapasar_api::handlers::AppServices;
use lokapasar_api::notifications::NoopMailer;
use lokapasar_api::AppState;

pub const TEST_JWT_SECRET: &str = "test_jwt_secret_value_long_enough_for_validation_1";

pub struct TestApp {
    pub state: AppState,
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
}

impl TestApp {
    pub fn router(&self) -> axum::Router {
        lokapasar_api::app_router(self.state.clone())
    }

    pub fn admin_token(&self) -> String {
        issue_token(
            TEST_JWT_SECRET,
            Uuid::new_v4(),
            Some("admin@lokapasar.test".to_string()),
            "admin",
            3600,
        )
        .expect("failed to issue admin token")
    }

    pub fn member_token(&self, user_id: Uuid) -> String {
        issue_token(TEST_JWT_SECRET, user_id, None, "member", 3600)
            .expect("failed to issue member token")
    }
}

pub async fn spawn_app() -> TestApp {
    let db_file = std::env::temp_dir().join(format!("lokapasar-test-{}.db", Uuid::new_v4()));
    let database_url = format!("sqlite://{}?mode=rwc", db_file.display());

    let mut config = AppConfig::new(
        database_url,
        TEST_JWT_SECRET.to_string(),
        "test".to_string(),
    );
    // One connection keeps SQLite writes serialized.
    config.db_max_connections = 1;
    config.db_min_connections = 1;

    let connection = db::establish_connection_with_config(&DbConfig::from_app_config(&config))
        .await
        .expect("failed to open test database");
    db::run_migrations(&connection)
        .await
        .expect("failed to apply schema");
    let db = Arc::new(connection);

    let (tx, rx) = mpsc::channel(64);
    let event_sender = EventSender::new(tx);
    tokio::spawn(process_events(rx, Arc::new(NoopMailer)));

    let services = AppServices::new(db.clone(), event_sender.clone(), config.clone());
    let state = AppState {
        db: db.clone(),
        config: config.clone(),
        event_sender,
        services,
    };

    TestApp { state, db, config }
}

pub async fn seed_user(db: &DatabaseConnection, member_discount_pct: Option<Decimal>) -> user::Model {
    let id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(id),
        email: Set(format!("user-{}@lokapasar.test", id)),
        name: Set("Budi Santoso".to_string()),
        member_discount_pct: Set(member_discount_pct),
        is_active: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("failed to seed user")
}

/// Product plus one variant, with an optional currently-active discount
/// window on the product.
pub async fn seed_product_with_variant(
    db: &DatabaseConnection,
    base_price: i64,
    surcharge: i64,
    stock: i32,
    discount_pct: Option<Decimal>,
) -> (product::Model, product_variant::Model) {
    let now = Utc::now();
    let product_id = Uuid::new_v4();
    let parent = product::ActiveModel {
        id: Set(product_id),
        name: Set("Kaos Polos Premium".to_string()),
        sku: Set(format!("KPP-{}", &product_id.simple().to_string()[..8])),
        base_price: Set(base_price),
        discount_pct: Set(discount_pct),
        discount_starts_at: Set(discount_pct.map(|_| now - Duration::days(1))),
        discount_ends_at: Set(discount_pct.map(|_| now + Duration::days(1))),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .expect("failed to seed product");

    let variant_id = Uuid::new_v4();
    let variant = product_variant::ActiveModel {
        id: Set(variant_id),
        product_id: Set(product_id),
        sku: Set(format!("{}-L", parent.sku)),
        size: Set("L".to_string()),
        warehouse_id: Set(Uuid::new_v4()),
        additional_price: Set(surcharge),
        cost_price: Set(base_price / 2),
        stock_quantity: Set(stock),
        min_stock: Set(2),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .expect("failed to seed variant");

    (parent, variant)
}

pub struct CouponSeed {
    pub code: String,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub max_discount: Option<i64>,
    pub min_purchase: Option<i64>,
    pub starts_at: Option<chrono::DateTime<Utc>>,
    pub ends_at: Option<chrono::DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: Option<i32>,
}

impl CouponSeed {
    pub fn percentage(code: &str, value: Decimal) -> Self {
        Self {
            code: code.to_string(),
            discount_type: "percentage".to_string(),
            discount_value: value,
            max_discount: None,
            min_purchase: None,
            starts_at: None,
            ends_at: None,
            usage_limit: None,
            usage_limit_per_user: None,
        }
    }

    pub fn fixed(code: &str, value: i64) -> Self {
        Self {
            code: code.to_string(),
            discount_type: "fixed".to_string(),
            discount_value: Decimal::from(value),
            max_discount: None,
            min_purchase: None,
            starts_at: None,
            ends_at: None,
            usage_limit: None,
            usage_limit_per_user: None,
        }
    }
}

pub async fn seed_coupon(db: &DatabaseConnection, seed: CouponSeed) -> coupon::Model {
    coupon::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(seed.code.to_uppercase()),
        discount_type: Set(seed.discount_type),
        discount_value: Set(seed.discount_value),
        max_discount: Set(seed.max_discount),
        min_purchase: Set(seed.min_purchase),
        starts_at: Set(seed.starts_at),
        ends_at: Set(seed.ends_at),
        usage_limit: Set(seed.usage_limit),
        usage_limit_per_user: Set(seed.usage_limit_per_user),
        usage_count: Set(0),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(db)
    .await
    .expect("failed to seed coupon")
}

pub async fn seed_legacy_discount(
    db: &DatabaseConnection,
    code: &str,
    discount_type: &str,
    value: Decimal,
    min_purchase: Option<i64>,
) -> legacy_discount::Model {
    legacy_discount::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code.to_uppercase()),
        discount_type: Set(discount_type.to_string()),
        discount_value: Set(value),
        min_purchase: Set(min_purchase),
        usage_limit: Set(None),
        usage_count: Set(0),
        starts_at: Set(None),
        ends_at: Set(None),
        is_active: Set(true),
    }
    .insert(db)
    .await
    .expect("failed to seed legacy discount")
}

pub async fn seed_shipping_cost(db: &DatabaseConnection, cost: i64) -> shipping_cost::Model {
    shipping_cost::ActiveModel {
        id: Set(Uuid::new_v4()),
        courier: Set("JNE".to_string()),
        service: Set("REG".to_string()),
        destination: Set("Bandung".to_string()),
        cost: Set(cost),
        etd: Set(Some("2-3 hari".to_string())),
        is_active: Set(true),
    }
    .insert(db)
    .await
    .expect("failed to seed shipping cost")
}

/// A complete, valid shipping address for order requests.
pub fn shipping_address() -> lokapasar_api::services::orders::ShippingAddressRequest {
    lokapasar_api::services::orders::ShippingAddressRequest {
        recipient_name: "Budi Santoso".to_string(),
        phone: "081234567890".to_string(),
        address: "Jl. Merdeka No. 17".to_string(),
        city: "Bandung".to_string(),
        province: "Jawa Barat".to_string(),
        postal_code: Some("40111".to_string()),
    }
}
