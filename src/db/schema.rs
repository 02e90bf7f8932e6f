//! Embedded DDL for the marketplace schema.
//!
//! Every statement is idempotent; `run_migrations` replays the whole list at
//! startup. Types are kept portable between PostgreSQL (deployment) and
//! SQLite (test harness), with one adjustment: percentage columns are
//! declared `numeric` for PostgreSQL, but SQLite's NUMERIC affinity stores
//! integer-valued decimals as INTEGER, which the driver refuses to decode
//! into `Decimal`. [`statements_for`] rewrites those columns to REAL
//! affinity on SQLite.

use sea_orm::DbBackend;

const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id uuid PRIMARY KEY,
        email varchar(255) NOT NULL UNIQUE,
        name varchar(255) NOT NULL,
        member_discount_pct numeric,
        is_active boolean NOT NULL DEFAULT TRUE,
        created_at timestamp with time zone NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS products (
        id uuid PRIMARY KEY,
        name varchar(255) NOT NULL,
        sku varchar(64) NOT NULL,
        base_price bigint NOT NULL,
        discount_pct numeric,
        discount_starts_at timestamp with time zone,
        discount_ends_at timestamp with time zone,
        is_active boolean NOT NULL DEFAULT TRUE,
        created_at timestamp with time zone NOT NULL,
        updated_at timestamp with time zone
    )"#,
    r#"CREATE TABLE IF NOT EXISTS product_variants (
        id uuid PRIMARY KEY,
        product_id uuid NOT NULL,
        sku varchar(64) NOT NULL,
        size varchar(32) NOT NULL,
        warehouse_id uuid NOT NULL,
        additional_price bigint NOT NULL DEFAULT 0,
        cost_price bigint NOT NULL DEFAULT 0,
        stock_quantity integer NOT NULL DEFAULT 0,
        min_stock integer NOT NULL DEFAULT 0,
        is_active boolean NOT NULL DEFAULT TRUE,
        created_at timestamp with time zone NOT NULL,
        updated_at timestamp with time zone
    )"#,
    r#"CREATE TABLE IF NOT EXISTS orders (
        id uuid PRIMARY KEY,
        order_number varchar(32) NOT NULL,
        tracking_token varchar(64) NOT NULL UNIQUE,
        user_id uuid,
        guest_email varchar(255),
        status varchar(32) NOT NULL,
        payment_status varchar(32) NOT NULL,
        payment_method varchar(32),
        coupon_code varchar(64),
        subtotal bigint NOT NULL,
        member_discount bigint NOT NULL DEFAULT 0,
        discount_amount bigint NOT NULL DEFAULT 0,
        shipping_cost bigint NOT NULL DEFAULT 0,
        tax bigint NOT NULL DEFAULT 0,
        total bigint NOT NULL,
        notes text,
        courier_tracking_number varchar(64),
        created_at timestamp with time zone NOT NULL,
        shipped_at timestamp with time zone,
        delivered_at timestamp with time zone,
        updated_at timestamp with time zone
    )"#,
    r#"CREATE TABLE IF NOT EXISTS order_items (
        id uuid PRIMARY KEY,
        order_id uuid NOT NULL,
        variant_id uuid NOT NULL,
        product_name varchar(255) NOT NULL,
        sku varchar(64) NOT NULL,
        size varchar(32) NOT NULL,
        quantity integer NOT NULL,
        unit_price bigint NOT NULL,
        unit_cost bigint NOT NULL DEFAULT 0,
        subtotal bigint NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS order_shipping_addresses (
        id uuid PRIMARY KEY,
        order_id uuid NOT NULL,
        recipient_name varchar(255) NOT NULL,
        phone varchar(32) NOT NULL,
        address text NOT NULL,
        city varchar(128) NOT NULL,
        province varchar(128) NOT NULL,
        postal_code varchar(16)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS guest_order_details (
        id uuid PRIMARY KEY,
        order_id uuid NOT NULL,
        email varchar(255) NOT NULL,
        recipient_name varchar(255) NOT NULL,
        phone varchar(32) NOT NULL,
        address text NOT NULL,
        city varchar(128) NOT NULL,
        province varchar(128) NOT NULL,
        postal_code varchar(16)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS order_status_histories (
        id uuid PRIMARY KEY,
        order_id uuid NOT NULL,
        status varchar(32) NOT NULL,
        title varchar(128) NOT NULL,
        notes text,
        actor varchar(255),
        created_at timestamp with time zone NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS coupons (
        id uuid PRIMARY KEY,
        code varchar(64) NOT NULL UNIQUE,
        discount_type varchar(16) NOT NULL,
        discount_value numeric NOT NULL,
        max_discount bigint,
        min_purchase bigint,
        starts_at timestamp with time zone,
        ends_at timestamp with time zone,
        usage_limit integer,
        usage_limit_per_user integer,
        usage_count integer NOT NULL DEFAULT 0,
        is_active boolean NOT NULL DEFAULT TRUE,
        created_at timestamp with time zone NOT NULL,
        updated_at timestamp with time zone
    )"#,
    r#"CREATE TABLE IF NOT EXISTS coupon_usages (
        id uuid PRIMARY KEY,
        coupon_id uuid NOT NULL,
        order_id uuid NOT NULL,
        user_id uuid,
        guest_email varchar(255),
        discount_amount bigint NOT NULL,
        created_at timestamp with time zone NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS legacy_discounts (
        id uuid PRIMARY KEY,
        code varchar(64) NOT NULL UNIQUE,
        discount_type varchar(16) NOT NULL,
        discount_value numeric NOT NULL,
        min_purchase bigint,
        usage_limit integer,
        usage_count integer NOT NULL DEFAULT 0,
        starts_at timestamp with time zone,
        ends_at timestamp with time zone,
        is_active boolean NOT NULL DEFAULT TRUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS shipping_costs (
        id uuid PRIMARY KEY,
        courier varchar(64) NOT NULL,
        service varchar(64) NOT NULL,
        destination varchar(128) NOT NULL,
        cost bigint NOT NULL,
        etd varchar(32),
        is_active boolean NOT NULL DEFAULT TRUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS cart_items (
        id uuid PRIMARY KEY,
        user_id uuid NOT NULL,
        variant_id uuid NOT NULL,
        quantity integer NOT NULL,
        created_at timestamp with time zone NOT NULL,
        updated_at timestamp with time zone
    )"#,
    r#"CREATE TABLE IF NOT EXISTS inventory_movements (
        id uuid PRIMARY KEY,
        variant_id uuid NOT NULL,
        movement_type varchar(16) NOT NULL,
        quantity integer NOT NULL,
        reference varchar(64),
        note text,
        created_at timestamp with time zone NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS stock_opnames (
        id uuid PRIMARY KEY,
        opname_number varchar(32) NOT NULL,
        warehouse_id uuid NOT NULL,
        opname_date timestamp with time zone NOT NULL,
        status varchar(16) NOT NULL,
        notes text,
        created_at timestamp with time zone NOT NULL,
        completed_at timestamp with time zone
    )"#,
    r#"CREATE TABLE IF NOT EXISTS stock_opname_details (
        id uuid PRIMARY KEY,
        opname_id uuid NOT NULL,
        variant_id uuid NOT NULL,
        system_qty integer NOT NULL,
        physical_qty integer NOT NULL DEFAULT 0,
        note text
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items (order_id)",
    "CREATE INDEX IF NOT EXISTS idx_status_histories_order ON order_status_histories (order_id)",
    "CREATE INDEX IF NOT EXISTS idx_coupon_usages_coupon ON coupon_usages (coupon_id)",
    "CREATE INDEX IF NOT EXISTS idx_cart_items_user ON cart_items (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_movements_variant ON inventory_movements (variant_id)",
    "CREATE INDEX IF NOT EXISTS idx_opname_details_opname ON stock_opname_details (opname_id)",
];

/// Ordered DDL statements for `run_migrations`, adjusted for the backend.
///
/// On SQLite the `numeric` percentage columns are rewritten to `real` so
/// stored decimals keep REAL affinity and decode back into `Decimal`.
pub fn statements_for(backend: DbBackend) -> Vec<String> {
    STATEMENTS
        .iter()
        .map(|statement| match backend {
            DbBackend::Sqlite => statement.replace(" numeric", " real"),
            _ => (*statement).to_string(),
        })
        .collect()
}
