//! End-to-end checkout and status lifecycle against a real (SQLite) store.

mod common;

use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use lokapasar_api::entities::{
    cart_item, coupon, coupon_usage, guest_order_detail, inventory_movement, order, order_item,
    order_status_history, product_variant,
};
use lokapasar_api::errors::ServiceError;
use lokapasar_api::services::discounts::{self, CouponRejection, CustomerIdentity};
use lokapasar_api::services::order_status::OrderStatus;
use lokapasar_api::services::orders::{CreateOrderRequest, OrderLineRequest};

use common::{
    seed_coupon, seed_product_with_variant, seed_shipping_cost, seed_user, shipping_address,
    spawn_app, CouponSeed,
};

fn order_request(variant_id: Uuid, quantity: i32) -> CreateOrderRequest {
    CreateOrderRequest {
        items: vec![OrderLineRequest {
            product_variant_id: variant_id,
            quantity,
        }],
        shipping_address: Some(shipping_address()),
        coupon_code: None,
        shipping_cost_id: None,
        payment_method: Some("bank_transfer".to_string()),
        guest_email: None,
        notes: None,
    }
}

#[tokio::test]
async fn checkout_recomputes_every_component_and_honors_the_total_invariant() {
    let app = spawn_app().await;
    let member = seed_user(&app.db, Some(dec!(5))).await;
    // 100_000 base, +5_000 surcharge, 20% off window active: unit 85_000.
    let (_, variant) = seed_product_with_variant(&app.db, 100_000, 5_000, 10, Some(dec!(20))).await;
    let mut seed = CouponSeed::percentage("HEMAT10", dec!(10));
    seed.max_discount = Some(15_000);
    seed.min_purchase = Some(50_000);
    seed_coupon(&app.db, seed).await;

    let mut request = order_request(variant.id, 2);
    request.coupon_code = Some("hemat10".to_string());
    let created = app
        .state
        .services
        .orders
        .create_order(request, Some(member.id))
        .await
        .expect("checkout failed");

    let header = order::Entity::find_by_id(created.order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(header.subtotal, 170_000);
    assert_eq!(header.member_discount, 8_500);
    // 10% of 170_000 is 17_000, capped at 15_000.
    assert_eq!(header.discount_amount, 15_000);
    assert_eq!(header.shipping_cost, app.config.default_shipping_cost);
    assert_eq!(header.tax, 16_115); // 11% of 146_500
    assert_eq!(
        header.total,
        header.subtotal - header.member_discount - header.discount_amount
            + header.shipping_cost
            + header.tax
    );
    assert_eq!(header.status, "pending");
    assert_eq!(header.coupon_code.as_deref(), Some("HEMAT10"));

    assert_eq!(header.tracking_token.len(), 64);
    assert!(header.tracking_token.chars().all(|c| c.is_ascii_hexdigit()));

    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(header.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].unit_price, 85_000);
    assert_eq!(items[0].subtotal, 170_000);

    let refreshed = product_variant::Entity::find_by_id(variant.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.stock_quantity, 8);

    let history = order_status_history::Entity::find()
        .filter(order_status_history::Column::OrderId.eq(header.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, "pending");
    assert_eq!(history[0].title, "Menunggu Konfirmasi");
}

#[tokio::test]
async fn cancellation_restores_stock_and_releases_coupon_usage() {
    let app = spawn_app().await;
    let member = seed_user(&app.db, None).await;
    let (_, variant) = seed_product_with_variant(&app.db, 80_000, 0, 5, None).await;
    let seeded = seed_coupon(&app.db, CouponSeed::fixed("POTONG10K", 10_000)).await;

    let mut request = order_request(variant.id, 2);
    request.coupon_code = Some("POTONG10K".to_string());
    let created = app
        .state
        .services
        .orders
        .create_order(request, Some(member.id))
        .await
        .unwrap();

    let after_checkout = coupon::Entity::find_by_id(seeded.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_checkout.usage_count, 1);

    app.state
        .services
        .order_status
        .set_status(
            created.order_id,
            OrderStatus::Cancelled,
            Some("Dibatalkan oleh admin".to_string()),
            Some("admin@lokapasar.test".to_string()),
        )
        .await
        .unwrap();

    let refreshed = product_variant::Entity::find_by_id(variant.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.stock_quantity, 5, "stock must round-trip");

    let after_cancel = coupon::Entity::find_by_id(seeded.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_cancel.usage_count, 0);

    let usages = coupon_usage::Entity::find()
        .filter(coupon_usage::Column::OrderId.eq(created.order_id))
        .all(&*app.db)
        .await
        .unwrap();
    assert!(usages.is_empty(), "usage row must be hard-deleted");

    let restock = inventory_movement::Entity::find()
        .filter(inventory_movement::Column::VariantId.eq(variant.id))
        .filter(inventory_movement::Column::MovementType.eq("in"))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(restock.len(), 1);
    assert_eq!(restock[0].quantity, 2);
    assert_eq!(restock[0].note.as_deref(), Some("order-cancelled"));
}

#[tokio::test]
async fn dispatched_orders_reject_cancellation_and_cancelled_is_terminal() {
    let app = spawn_app().await;
    let member = seed_user(&app.db, None).await;
    let (_, variant) = seed_product_with_variant(&app.db, 60_000, 0, 10, None).await;

    let created = app
        .state
        .services
        .orders
        .create_order(order_request(variant.id, 1), Some(member.id))
        .await
        .unwrap();

    app.state
        .services
        .order_status
        .attach_tracking(created.order_id, "JNE123456789".to_string(), None)
        .await
        .unwrap();

    let header = order::Entity::find_by_id(created.order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.status, "shipped");
    assert!(header.shipped_at.is_some());
    assert_eq!(header.courier_tracking_number.as_deref(), Some("JNE123456789"));

    let err = app
        .state
        .services
        .order_status
        .set_status(created.order_id, OrderStatus::Cancelled, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatusTransition(_)));

    // A separate order cancelled while pending accepts nothing afterwards.
    let other = app
        .state
        .services
        .orders
        .create_order(order_request(variant.id, 1), Some(member.id))
        .await
        .unwrap();
    app.state
        .services
        .order_status
        .set_status(other.order_id, OrderStatus::Cancelled, None, None)
        .await
        .unwrap();
    let err = app
        .state
        .services
        .order_status
        .set_status(other.order_id, OrderStatus::Confirmed, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStatusTransition(_)));
}

#[tokio::test]
async fn insufficient_stock_names_the_shortfall() {
    let app = spawn_app().await;
    let member = seed_user(&app.db, None).await;
    let (_, variant) = seed_product_with_variant(&app.db, 50_000, 0, 3, None).await;

    let err = app
        .state
        .services
        .orders
        .create_order(order_request(variant.id, 5), Some(member.id))
        .await
        .unwrap_err();
    match err {
        ServiceError::InsufficientStock(msg) => {
            assert!(msg.contains("diminta 5"));
            assert!(msg.contains("tersisa 3"));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // Nothing committed.
    let refreshed = product_variant::Entity::find_by_id(variant.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.stock_quantity, 3);
    let orders = order::Entity::find().all(&*app.db).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn guest_checkout_requires_contact_fields_and_stores_guest_detail() {
    let app = spawn_app().await;
    let (_, variant) = seed_product_with_variant(&app.db, 90_000, 0, 4, None).await;

    let mut incomplete = order_request(variant.id, 1);
    incomplete.guest_email = Some("tamu@lokapasar.test".to_string());
    if let Some(addr) = incomplete.shipping_address.as_mut() {
        addr.phone = String::new();
    }
    let err = app
        .state
        .services
        .orders
        .create_order(incomplete, None)
        .await
        .unwrap_err();
    match err {
        ServiceError::ValidationError(msg) => assert!(msg.contains("telepon")),
        other => panic!("unexpected error: {:?}", other),
    }

    let mut complete = order_request(variant.id, 1);
    complete.guest_email = Some("tamu@lokapasar.test".to_string());
    let created = app
        .state
        .services
        .orders
        .create_order(complete, None)
        .await
        .unwrap();

    let detail = guest_order_detail::Entity::find()
        .filter(guest_order_detail::Column::OrderId.eq(created.order_id))
        .one(&*app.db)
        .await
        .unwrap()
        .expect("guest detail row missing");
    assert_eq!(detail.email, "tamu@lokapasar.test");
    assert_eq!(detail.city, "Bandung");
}

#[tokio::test]
async fn missing_identity_and_empty_cart_are_rejected_before_any_write() {
    let app = spawn_app().await;
    let (_, variant) = seed_product_with_variant(&app.db, 40_000, 0, 4, None).await;

    let err = app
        .state
        .services
        .orders
        .create_order(order_request(variant.id, 1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let mut empty = order_request(variant.id, 1);
    empty.items.clear();
    empty.guest_email = Some("tamu@lokapasar.test".to_string());
    let err = app
        .state
        .services
        .orders
        .create_order(empty, None)
        .await
        .unwrap_err();
    match err {
        ServiceError::ValidationError(msg) => assert_eq!(msg, "Keranjang kosong"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn checkout_clears_the_registered_users_cart_and_uses_selected_shipping_rate() {
    let app = spawn_app().await;
    let member = seed_user(&app.db, None).await;
    let (_, variant) = seed_product_with_variant(&app.db, 55_000, 0, 6, None).await;
    let rate = seed_shipping_cost(&app.db, 22_000).await;

    app.state
        .services
        .carts
        .add_item(
            member.id,
            lokapasar_api::services::carts::AddCartItemRequest {
                variant_id: variant.id,
                quantity: 2,
            },
        )
        .await
        .unwrap();

    let mut request = order_request(variant.id, 2);
    request.shipping_cost_id = Some(rate.id);
    let created = app
        .state
        .services
        .orders
        .create_order(request, Some(member.id))
        .await
        .unwrap();

    let header = order::Entity::find_by_id(created.order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.shipping_cost, 22_000);

    let remaining = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(member.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert!(remaining.is_empty(), "cart must be cleared in the checkout transaction");
}

#[tokio::test]
async fn validation_and_checkout_compute_identical_discounts() {
    let app = spawn_app().await;
    let member = seed_user(&app.db, None).await;
    let (_, variant) = seed_product_with_variant(&app.db, 100_000, 0, 10, None).await;
    let mut seed = CouponSeed::percentage("HEMAT10", dec!(10));
    seed.max_discount = Some(15_000);
    seed_coupon(&app.db, seed).await;

    // Same subtotal the order will compute: 2 x 100_000.
    let validated = discounts::resolve(
        &*app.db,
        "HEMAT10",
        200_000,
        &CustomerIdentity::User(member.id),
        Utc::now(),
    )
    .await
    .unwrap()
    .expect("coupon should be applicable");

    let mut request = order_request(variant.id, 2);
    request.coupon_code = Some("HEMAT10".to_string());
    let created = app
        .state
        .services
        .orders
        .create_order(request, Some(member.id))
        .await
        .unwrap();

    let header = order::Entity::find_by_id(created.order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.discount_amount, validated.amount);
    assert_eq!(header.discount_amount, 15_000);
}

#[tokio::test]
async fn legacy_discount_applies_when_no_coupon_matches() {
    let app = spawn_app().await;
    let member = seed_user(&app.db, None).await;
    let (_, variant) = seed_product_with_variant(&app.db, 70_000, 0, 5, None).await;
    common::seed_legacy_discount(&app.db, "LAMA5", "percentage", dec!(5), None).await;

    let mut request = order_request(variant.id, 1);
    request.coupon_code = Some("lama5".to_string());
    let created = app
        .state
        .services
        .orders
        .create_order(request, Some(member.id))
        .await
        .unwrap();

    let header = order::Entity::find_by_id(created.order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.discount_amount, 3_500);

    let refreshed = lokapasar_api::entities::legacy_discount::Entity::find()
        .filter(lokapasar_api::entities::legacy_discount::Column::Code.eq("LAMA5"))
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.usage_count, 1);
}

#[tokio::test]
async fn exhausted_coupon_is_skipped_silently_at_checkout() {
    let app = spawn_app().await;
    let first = seed_user(&app.db, None).await;
    let second = seed_user(&app.db, None).await;
    let (_, variant) = seed_product_with_variant(&app.db, 60_000, 0, 10, None).await;
    let mut seed = CouponSeed::fixed("HABIS1X", 5_000);
    seed.usage_limit = Some(1);
    let seeded = seed_coupon(&app.db, seed).await;

    let mut request = order_request(variant.id, 1);
    request.coupon_code = Some("HABIS1X".to_string());
    let redeemed = app
        .state
        .services
        .orders
        .create_order(request, Some(first.id))
        .await
        .unwrap();
    let header = order::Entity::find_by_id(redeemed.order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.discount_amount, 5_000);

    let rejection = discounts::resolve(
        &*app.db,
        "HABIS1X",
        60_000,
        &CustomerIdentity::User(second.id),
        Utc::now(),
    )
    .await
    .unwrap()
    .unwrap_err();
    assert_eq!(rejection, CouponRejection::UsageLimitReached);

    let mut request = order_request(variant.id, 1);
    request.coupon_code = Some("HABIS1X".to_string());
    let refused = app
        .state
        .services
        .orders
        .create_order(request, Some(second.id))
        .await
        .unwrap();
    let header = order::Entity::find_by_id(refused.order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.discount_amount, 0);
    assert!(header.coupon_code.is_none());

    let refreshed = coupon::Entity::find_by_id(seeded.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.usage_count, 1);
}

#[tokio::test]
async fn per_identity_limit_blocks_only_the_identity_that_redeemed() {
    let app = spawn_app().await;
    let member = seed_user(&app.db, None).await;
    let (_, variant) = seed_product_with_variant(&app.db, 60_000, 0, 10, None).await;
    let mut seed = CouponSeed::percentage("SEKALI", dec!(10));
    seed.usage_limit_per_user = Some(1);
    let seeded = seed_coupon(&app.db, seed).await;

    let mut request = order_request(variant.id, 1);
    request.coupon_code = Some("SEKALI".to_string());
    app.state
        .services
        .orders
        .create_order(request, Some(member.id))
        .await
        .unwrap();

    let rejection = discounts::resolve(
        &*app.db,
        "SEKALI",
        60_000,
        &CustomerIdentity::User(member.id),
        Utc::now(),
    )
    .await
    .unwrap()
    .unwrap_err();
    assert_eq!(rejection, CouponRejection::AlreadyUsed);

    // A different identity is unaffected by someone else's redemption.
    discounts::resolve(
        &*app.db,
        "SEKALI",
        60_000,
        &CustomerIdentity::Guest("lain@lokapasar.test".to_string()),
        Utc::now(),
    )
    .await
    .unwrap()
    .expect("other identities may still redeem");

    let mut request = order_request(variant.id, 1);
    request.coupon_code = Some("SEKALI".to_string());
    let refused = app
        .state
        .services
        .orders
        .create_order(request, Some(member.id))
        .await
        .unwrap();
    let header = order::Entity::find_by_id(refused.order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.discount_amount, 0);
    assert!(header.coupon_code.is_none());

    let usages = coupon_usage::Entity::find()
        .filter(coupon_usage::Column::CouponId.eq(seeded.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(usages.len(), 1);
}

#[tokio::test]
async fn cancellation_releases_the_source_that_was_actually_redeemed() {
    let app = spawn_app().await;
    let member = seed_user(&app.db, None).await;
    let (_, variant) = seed_product_with_variant(&app.db, 70_000, 0, 5, None).await;

    // Same code in both tables, but the coupon is retired. Checkout matches
    // the legacy discount, so cancellation must decrement that counter and
    // leave the coupon untouched.
    let retired = seed_coupon(&app.db, CouponSeed::percentage("WARISAN", dec!(50))).await;
    let mut deactivate: coupon::ActiveModel = retired.clone().into();
    deactivate.is_active = Set(false);
    deactivate.update(&*app.db).await.unwrap();
    let legacy =
        common::seed_legacy_discount(&app.db, "WARISAN", "percentage", dec!(5), None).await;

    let mut request = order_request(variant.id, 1);
    request.coupon_code = Some("WARISAN".to_string());
    let created = app
        .state
        .services
        .orders
        .create_order(request, Some(member.id))
        .await
        .unwrap();
    let header = order::Entity::find_by_id(created.order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.discount_amount, 3_500);

    app.state
        .services
        .order_status
        .set_status(created.order_id, OrderStatus::Cancelled, None, None)
        .await
        .unwrap();

    let refreshed = lokapasar_api::entities::legacy_discount::Entity::find_by_id(legacy.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.usage_count, 0);

    let untouched = coupon::Entity::find_by_id(retired.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.usage_count, 0);
}

#[tokio::test]
async fn cancellation_releases_a_coupon_retired_after_redemption() {
    let app = spawn_app().await;
    let member = seed_user(&app.db, None).await;
    let (_, variant) = seed_product_with_variant(&app.db, 50_000, 0, 5, None).await;
    let seeded = seed_coupon(&app.db, CouponSeed::fixed("PENSIUN", 5_000)).await;

    let mut request = order_request(variant.id, 1);
    request.coupon_code = Some("PENSIUN".to_string());
    let created = app
        .state
        .services
        .orders
        .create_order(request, Some(member.id))
        .await
        .unwrap();

    let mut deactivate: coupon::ActiveModel = coupon::Entity::find_by_id(seeded.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap()
        .into();
    deactivate.is_active = Set(false);
    deactivate.update(&*app.db).await.unwrap();

    app.state
        .services
        .order_status
        .set_status(created.order_id, OrderStatus::Cancelled, None, None)
        .await
        .unwrap();

    let refreshed = coupon::Entity::find_by_id(seeded.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.usage_count, 0);

    let usages = coupon_usage::Entity::find()
        .filter(coupon_usage::Column::OrderId.eq(created.order_id))
        .all(&*app.db)
        .await
        .unwrap();
    assert!(usages.is_empty());
}

#[tokio::test]
async fn percentage_columns_round_trip_as_decimals() {
    let app = spawn_app().await;
    let member = seed_user(&app.db, Some(dec!(5))).await;
    let (parent, _) =
        seed_product_with_variant(&app.db, 100_000, 0, 5, Some(dec!(12.5))).await;
    let seeded = seed_coupon(&app.db, CouponSeed::percentage("BULAT10", dec!(10))).await;
    let legacy = common::seed_legacy_discount(&app.db, "LAMA5", "percentage", dec!(5), None).await;

    // Integer-valued and fractional percentages both decode back intact.
    let refreshed = lokapasar_api::entities::user::Entity::find_by_id(member.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.member_discount_pct, Some(dec!(5)));

    let refreshed = lokapasar_api::entities::product::Entity::find_by_id(parent.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.discount_pct, Some(dec!(12.5)));

    let refreshed = coupon::Entity::find_by_id(seeded.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.discount_value, dec!(10));

    let refreshed = lokapasar_api::entities::legacy_discount::Entity::find_by_id(legacy.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.discount_value, dec!(5));
}

#[tokio::test]
async fn inapplicable_coupon_is_silently_ignored_at_checkout() {
    let app = spawn_app().await;
    let member = seed_user(&app.db, None).await;
    let (_, variant) = seed_product_with_variant(&app.db, 30_000, 0, 5, None).await;
    let mut seed = CouponSeed::percentage("MINIMAL", dec!(10));
    seed.min_purchase = Some(500_000);
    let seeded = seed_coupon(&app.db, seed).await;

    let mut request = order_request(variant.id, 1);
    request.coupon_code = Some("MINIMAL".to_string());
    let created = app
        .state
        .services
        .orders
        .create_order(request, Some(member.id))
        .await
        .unwrap();

    let header = order::Entity::find_by_id(created.order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.discount_amount, 0);
    assert!(header.coupon_code.is_none());

    let refreshed = coupon::Entity::find_by_id(seeded.id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.usage_count, 0);
}
