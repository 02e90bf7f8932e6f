//! Coupon and legacy-discount resolution.
//!
//! Codes are checked against the coupon table first, then against the older
//! discount table kept for backward compatibility. Callers receive a tagged
//! [`DiscountSource`] and never branch on which table matched. The checkout
//! path and the public validation endpoint run the exact same checks; only
//! the surfaced shape differs (silent `None` vs a typed rejection).

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{coupon, coupon_usage, legacy_discount, order};
use crate::errors::ServiceError;
use crate::services::pricing;

/// Who is redeeming. Guests are identified by email for per-identity limits.
#[derive(Clone, Debug)]
pub enum CustomerIdentity {
    User(Uuid),
    Guest(String),
}

impl CustomerIdentity {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            CustomerIdentity::User(id) => Some(*id),
            CustomerIdentity::Guest(_) => None,
        }
    }

    pub fn guest_email(&self) -> Option<&str> {
        match self {
            CustomerIdentity::User(_) => None,
            CustomerIdentity::Guest(email) => Some(email),
        }
    }
}

/// Which table produced the discount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscountSource {
    Coupon(Uuid),
    Legacy(Uuid),
}

#[derive(Clone, Debug)]
pub struct ResolvedDiscount {
    pub amount: i64,
    pub source: DiscountSource,
    pub code: String,
}

/// Why a code was refused, with the user-facing Indonesian message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum CouponRejection {
    NotFound,
    NotYetActive,
    Expired,
    UsageLimitReached,
    AlreadyUsed,
    MinPurchaseNotMet(i64),
}

impl CouponRejection {
    pub fn message(&self) -> String {
        match self {
            CouponRejection::NotFound => "Kupon tidak ditemukan".to_string(),
            CouponRejection::NotYetActive => "Kupon belum aktif".to_string(),
            CouponRejection::Expired => "Kupon sudah kadaluarsa".to_string(),
            CouponRejection::UsageLimitReached => "Kupon sudah habis".to_string(),
            CouponRejection::AlreadyUsed => "Kupon sudah pernah digunakan".to_string(),
            CouponRejection::MinPurchaseNotMet(min) => {
                format!("Minimum pembelian Rp {} belum terpenuhi", min)
            }
        }
    }
}

/// Discount amount for an eligible instrument. Percentage values round half
/// away from zero and honor the optional cap; fixed values never exceed the
/// subtotal they apply to.
pub fn compute_amount(
    discount_type: &str,
    value: rust_decimal::Decimal,
    max_discount: Option<i64>,
    subtotal: i64,
) -> i64 {
    match discount_type {
        "percentage" => {
            let raw = pricing::percentage_of(subtotal, value);
            match max_discount {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
        _ => value.to_i64().unwrap_or(0).min(subtotal),
    }
}

/// Resolves a code against both discount tables.
///
/// The outer `Result` is infrastructure failure; the inner one separates an
/// applicable discount from a typed rejection.
pub async fn resolve<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    subtotal: i64,
    identity: &CustomerIdentity,
    now: DateTime<Utc>,
) -> Result<Result<ResolvedDiscount, CouponRejection>, ServiceError> {
    let normalized = code.trim().to_uppercase();

    let found = coupon::Entity::find()
        .filter(coupon::Column::Code.eq(normalized.clone()))
        .filter(coupon::Column::IsActive.eq(true))
        .one(conn)
        .await?;
    if let Some(c) = found {
        return check_coupon(conn, &c, subtotal, identity, now).await;
    }

    let found = legacy_discount::Entity::find()
        .filter(legacy_discount::Column::Code.eq(normalized))
        .filter(legacy_discount::Column::IsActive.eq(true))
        .one(conn)
        .await?;
    if let Some(d) = found {
        return Ok(check_legacy(&d, subtotal, now));
    }

    Ok(Err(CouponRejection::NotFound))
}

/// Checkout variant: a code that does not apply simply yields no discount.
pub async fn resolve_for_checkout<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    subtotal: i64,
    identity: &CustomerIdentity,
    now: DateTime<Utc>,
) -> Result<Option<ResolvedDiscount>, ServiceError> {
    Ok(resolve(conn, code, subtotal, identity, now).await?.ok())
}

async fn check_coupon<C: ConnectionTrait>(
    conn: &C,
    c: &coupon::Model,
    subtotal: i64,
    identity: &CustomerIdentity,
    now: DateTime<Utc>,
) -> Result<Result<ResolvedDiscount, CouponRejection>, ServiceError> {
    if let Some(starts_at) = c.starts_at {
        if now < starts_at {
            return Ok(Err(CouponRejection::NotYetActive));
        }
    }
    if let Some(ends_at) = c.ends_at {
        if now > ends_at {
            return Ok(Err(CouponRejection::Expired));
        }
    }
    if let Some(limit) = c.usage_limit {
        if c.usage_count >= limit {
            return Ok(Err(CouponRejection::UsageLimitReached));
        }
    }
    if let Some(per_user) = c.usage_limit_per_user {
        let mut usage_query = coupon_usage::Entity::find()
            .filter(coupon_usage::Column::CouponId.eq(c.id));
        usage_query = match identity {
            CustomerIdentity::User(id) => {
                usage_query.filter(coupon_usage::Column::UserId.eq(*id))
            }
            CustomerIdentity::Guest(email) => {
                usage_query.filter(coupon_usage::Column::GuestEmail.eq(email.clone()))
            }
        };
        let used = usage_query.count(conn).await?;
        if used >= per_user as u64 {
            return Ok(Err(CouponRejection::AlreadyUsed));
        }
    }
    if let Some(min) = c.min_purchase {
        if subtotal < min {
            return Ok(Err(CouponRejection::MinPurchaseNotMet(min)));
        }
    }

    Ok(Ok(ResolvedDiscount {
        amount: compute_amount(&c.discount_type, c.discount_value, c.max_discount, subtotal),
        source: DiscountSource::Coupon(c.id),
        code: c.code.clone(),
    }))
}

fn check_legacy(
    d: &legacy_discount::Model,
    subtotal: i64,
    now: DateTime<Utc>,
) -> Result<ResolvedDiscount, CouponRejection> {
    if let Some(starts_at) = d.starts_at {
        if now < starts_at {
            return Err(CouponRejection::NotYetActive);
        }
    }
    if let Some(ends_at) = d.ends_at {
        if now > ends_at {
            return Err(CouponRejection::Expired);
        }
    }
    if let Some(limit) = d.usage_limit {
        if d.usage_count >= limit {
            return Err(CouponRejection::UsageLimitReached);
        }
    }
    if let Some(min) = d.min_purchase {
        if subtotal < min {
            return Err(CouponRejection::MinPurchaseNotMet(min));
        }
    }

    Ok(ResolvedDiscount {
        amount: compute_amount(&d.discount_type, d.discount_value, None, subtotal),
        source: DiscountSource::Legacy(d.id),
        code: d.code.clone(),
    })
}

/// Records one redemption inside the caller's order transaction: for coupons
/// a usage row plus a counter increment, for legacy discounts the counter only.
pub async fn record_usage<C: ConnectionTrait>(
    txn: &C,
    resolved: &ResolvedDiscount,
    order_id: Uuid,
    identity: &CustomerIdentity,
) -> Result<(), ServiceError> {
    match resolved.source {
        DiscountSource::Coupon(coupon_id) => {
            coupon_usage::ActiveModel {
                id: Set(Uuid::new_v4()),
                coupon_id: Set(coupon_id),
                order_id: Set(order_id),
                user_id: Set(identity.user_id()),
                guest_email: Set(identity.guest_email().map(|e| e.to_string())),
                discount_amount: Set(resolved.amount),
                created_at: Set(Utc::now()),
            }
            .insert(txn)
            .await?;

            coupon::Entity::update_many()
                .col_expr(
                    coupon::Column::UsageCount,
                    Expr::col(coupon::Column::UsageCount).add(1),
                )
                .filter(coupon::Column::Id.eq(coupon_id))
                .exec(txn)
                .await?;
        }
        DiscountSource::Legacy(discount_id) => {
            legacy_discount::Entity::update_many()
                .col_expr(
                    legacy_discount::Column::UsageCount,
                    Expr::col(legacy_discount::Column::UsageCount).add(1),
                )
                .filter(legacy_discount::Column::Id.eq(discount_id))
                .exec(txn)
                .await?;
        }
    }
    Ok(())
}

/// Reverses the redemption when the owning order is cancelled. The usage
/// counter never goes below zero and the usage row is hard-deleted so
/// per-identity limits stay accurate.
///
/// Only coupon redemptions leave a usage row, so the row recorded for this
/// order identifies which table the code matched at checkout. Resolving the
/// stored code again would pick the wrong counter when the same code exists
/// in both tables, or when the redeemed coupon was deactivated afterwards.
pub async fn release_usage<C: ConnectionTrait>(
    txn: &C,
    cancelled: &order::Model,
) -> Result<(), ServiceError> {
    let code = match &cancelled.coupon_code {
        Some(code) => code.clone(),
        None => return Ok(()),
    };

    if let Some(usage) = coupon_usage::Entity::find()
        .filter(coupon_usage::Column::OrderId.eq(cancelled.id))
        .one(txn)
        .await?
    {
        coupon_usage::Entity::delete_by_id(usage.id).exec(txn).await?;

        if let Some(c) = coupon::Entity::find_by_id(usage.coupon_id).one(txn).await? {
            let mut active: coupon::ActiveModel = c.clone().into();
            active.usage_count = Set((c.usage_count - 1).max(0));
            active.update(txn).await?;
        }
        return Ok(());
    }

    if let Some(d) = legacy_discount::Entity::find()
        .filter(legacy_discount::Column::Code.eq(code))
        .one(txn)
        .await?
    {
        let mut active: legacy_discount::ActiveModel = d.clone().into();
        active.usage_count = Set((d.usage_count - 1).max(0));
        active.update(txn).await?;
    }
    Ok(())
}
