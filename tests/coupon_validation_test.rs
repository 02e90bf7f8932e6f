//! Router-level tests: the public validation endpoint, guest checkout over
//! HTTP, tracking, and admin guards.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{seed_coupon, seed_product_with_variant, spawn_app, CouponSeed};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn validate_returns_the_computed_discount() {
    let app = spawn_app().await;
    let mut seed = CouponSeed::percentage("HEMAT10", dec!(10));
    seed.max_discount = Some(15_000);
    seed.min_purchase = Some(50_000);
    seed_coupon(&app.db, seed).await;

    let response = app
        .router()
        .oneshot(post_json(
            "/api/v1/coupons/validate",
            json!({ "code": "hemat10", "subtotal": 200_000, "guest_email": "tamu@lokapasar.test" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["code"], json!("HEMAT10"));
    assert_eq!(body["data"]["discount_amount"], json!(15_000));
}

#[tokio::test]
async fn validate_surfaces_indonesian_rejections() {
    let app = spawn_app().await;
    let mut expired = CouponSeed::percentage("KADALUARSA", dec!(10));
    expired.ends_at = Some(Utc::now() - Duration::days(1));
    seed_coupon(&app.db, expired).await;
    let mut minimum = CouponSeed::fixed("MAHAL", 20_000);
    minimum.min_purchase = Some(300_000);
    seed_coupon(&app.db, minimum).await;

    let cases = [
        (json!({ "code": "TIDAKADA", "subtotal": 100_000 }), "Kupon tidak ditemukan"),
        (json!({ "code": "KADALUARSA", "subtotal": 100_000 }), "Kupon sudah kadaluarsa"),
        (json!({ "code": "MAHAL", "subtotal": 100_000 }), "Minimum pembelian"),
    ];
    for (payload, expected) in cases {
        let response = app
            .router()
            .oneshot(post_json("/api/v1/coupons/validate", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], json!(false));
        assert!(
            body["message"].as_str().unwrap().contains(expected),
            "expected message containing {:?}, got {}",
            expected,
            body["message"]
        );
    }
}

#[tokio::test]
async fn validate_rejects_exhausted_and_already_used_coupons() {
    let app = spawn_app().await;
    let (_, variant) = seed_product_with_variant(&app.db, 80_000, 0, 10, None).await;
    let mut exhausted = CouponSeed::fixed("HABIS1X", 5_000);
    exhausted.usage_limit = Some(1);
    seed_coupon(&app.db, exhausted).await;
    let mut once_each = CouponSeed::percentage("SEKALI", dec!(10));
    once_each.usage_limit_per_user = Some(1);
    seed_coupon(&app.db, once_each).await;

    // Redeem both codes once as the same guest.
    for code in ["HABIS1X", "SEKALI"] {
        let response = app
            .router()
            .oneshot(post_json(
                "/api/v1/orders",
                json!({
                    "items": [{ "product_variant_id": variant.id, "quantity": 1 }],
                    "shipping_address": {
                        "recipient_name": "Siti Aminah",
                        "phone": "081200034567",
                        "address": "Jl. Kenanga 5",
                        "city": "Surabaya",
                        "province": "Jawa Timur"
                    },
                    "guest_email": "tamu@lokapasar.test",
                    "coupon_code": code
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // The total limit is spent, so everyone is refused.
    let response = app
        .router()
        .oneshot(post_json(
            "/api/v1/coupons/validate",
            json!({ "code": "HABIS1X", "subtotal": 80_000, "guest_email": "lain@lokapasar.test" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], json!("Kupon sudah habis"));

    // The per-identity limit only binds the identity that redeemed.
    let response = app
        .router()
        .oneshot(post_json(
            "/api/v1/coupons/validate",
            json!({ "code": "SEKALI", "subtotal": 80_000, "guest_email": "tamu@lokapasar.test" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], json!("Kupon sudah pernah digunakan"));

    let response = app
        .router()
        .oneshot(post_json(
            "/api/v1/coupons/validate",
            json!({ "code": "SEKALI", "subtotal": 80_000, "guest_email": "lain@lokapasar.test" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["discount_amount"], json!(8_000));
}

#[tokio::test]
async fn guest_checkout_and_public_tracking_over_http() {
    let app = spawn_app().await;
    let (_, variant) = seed_product_with_variant(&app.db, 120_000, 0, 5, None).await;

    let response = app
        .router()
        .oneshot(post_json(
            "/api/v1/orders",
            json!({
                "items": [{ "product_variant_id": variant.id, "quantity": 1 }],
                "shipping_address": {
                    "recipient_name": "Siti Aminah",
                    "phone": "081200034567",
                    "address": "Jl. Kenanga 5",
                    "city": "Surabaya",
                    "province": "Jawa Timur"
                },
                "guest_email": "siti@lokapasar.test"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let token = body["data"]["tracking_token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);
    assert!(body["data"]["tracking_url"].as_str().unwrap().ends_with(&token));

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/orders/track/{}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["order"]["status"], json!("pending"));
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["history"][0]["title"], json!("Menunggu Konfirmasi"));

    // An unknown token reveals nothing.
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/orders/track/{}", "0".repeat(64)))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_endpoints_require_an_admin_token() {
    let app = spawn_app().await;

    let response = app
        .router()
        .oneshot(Request::builder().uri("/api/v1/orders").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let member_token = app.member_token(uuid::Uuid::new_v4());
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/v1/orders")
                .header(header::AUTHORIZATION, format!("Bearer {}", member_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin_token = app.admin_token();
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/v1/orders")
                .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["orders"], json!([]));
}

#[tokio::test]
async fn admin_can_create_list_and_retire_coupons() {
    let app = spawn_app().await;
    let admin_token = app.admin_token();

    let create = post_json(
        "/api/v1/coupons",
        json!({ "code": "baru25", "discount_type": "fixed", "discount_value": "25000" }),
    );
    let (mut parts, body) = create.into_parts();
    parts.headers.insert(
        header::AUTHORIZATION,
        format!("Bearer {}", admin_token).parse().unwrap(),
    );
    let response = app
        .router()
        .oneshot(Request::from_parts(parts, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["code"], json!("BARU25"));

    // Duplicate codes conflict.
    let duplicate = post_json(
        "/api/v1/coupons",
        json!({ "code": "BARU25", "discount_type": "fixed", "discount_value": "10000" }),
    );
    let (mut parts, dup_body) = duplicate.into_parts();
    parts.headers.insert(
        header::AUTHORIZATION,
        format!("Bearer {}", admin_token).parse().unwrap(),
    );
    let response = app
        .router()
        .oneshot(Request::from_parts(parts, dup_body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_and_status_respond() {
    let app = spawn_app().await;

    let response = app
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router()
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["database"], json!("up"));
}
