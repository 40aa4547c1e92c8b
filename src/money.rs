//! Money arithmetic for order amounts.
//!
//! All amounts are `Decimal` with 2-decimal precision, rounded half-up at
//! the cent. The same rounding is applied everywhere an amount is produced,
//! including the conversion to minor units for the payment gateway.

use anyhow::anyhow;
use rust_decimal::prelude::*;

use crate::models::{OrderItem, SelectedOption};

const DECIMAL_PLACES: u32 = 2;

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Cents for the gateway. Fails only on amounts the wire type cannot hold.
pub fn to_minor_units(value: Decimal) -> anyhow::Result<i64> {
    round_money(value)
        .checked_mul(Decimal::from(100))
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| anyhow!("amount out of range: {value}"))
}

pub fn line_total(unit_price: Decimal, options: &[SelectedOption], quantity: i32) -> Decimal {
    let per_unit = unit_price + options.iter().map(|o| o.price_delta).sum::<Decimal>();
    round_money(per_unit * Decimal::from(quantity))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub platform_fee: Decimal,
    pub total: Decimal,
}

/// The platform fee is recorded on the order but absorbed by the merchant
/// at payout: the customer-facing total equals the subtotal.
pub fn order_totals(items: &[OrderItem], fee_percent: Decimal) -> OrderTotals {
    let subtotal = round_money(items.iter().map(|i| i.line_total).sum());
    let platform_fee = round_money(subtotal * fee_percent / Decimal::from(100));
    OrderTotals {
        subtotal,
        platform_fee,
        total: subtotal,
    }
}
