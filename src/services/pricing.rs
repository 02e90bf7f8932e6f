//! Pure pricing arithmetic. All amounts are integers in the smallest
//! currency unit; fractional intermediates round half away from zero.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Flat consumption tax rate applied to the discounted taxable base.
const TAX_RATE_PCT: i64 = 11;

fn round_to_unit(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Rounded percentage of an integer amount.
pub fn percentage_of(amount: i64, pct: Decimal) -> i64 {
    round_to_unit(Decimal::from(amount) * pct / Decimal::from(100))
}

fn window_contains(
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    starts_at.map_or(true, |s| now >= s) && ends_at.map_or(true, |e| now <= e)
}

/// Effective unit price for one variant line.
///
/// The product-level percentage discount applies to the base price only:
/// the discounted price itself is rounded (`round(base * (1 - pct/100))`),
/// not the discount, which matters at exact .5 ties. The variant surcharge
/// is added afterwards. Either window bound may be absent (open-ended).
pub fn unit_price(
    base_price: i64,
    surcharge: i64,
    discount_pct: Option<Decimal>,
    discount_starts_at: Option<DateTime<Utc>>,
    discount_ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    let effective_base = match discount_pct {
        Some(pct) if pct > Decimal::ZERO
            && window_contains(discount_starts_at, discount_ends_at, now) =>
        {
            round_to_unit(
                Decimal::from(base_price) * (Decimal::from(100) - pct) / Decimal::from(100),
            )
        }
        _ => base_price,
    };
    (effective_base + surcharge).max(0)
}

/// Tax on the discounted taxable base, floored at zero before the rate.
pub fn tax_amount(taxable: i64) -> i64 {
    percentage_of(taxable.max(0), Decimal::from(TAX_RATE_PCT))
}
