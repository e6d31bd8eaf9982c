//! Order pricing and the voucher stacking policy.
//!
//! Everything here is a pure function of its inputs: the same items, vouchers
//! and `now` always produce the same numbers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::order::OrderItem;
use super::voucher::{Voucher, VoucherKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub gross_total: i64,
    pub discount: i64,
    pub net_total: i64,
    /// Vouchers that contributed to `discount`, in application order.
    pub applied_voucher_ids: Vec<Uuid>,
}

pub fn gross_total(items: &[OrderItem]) -> i64 {
    items
        .iter()
        .fold(0_i64, |acc, item| acc.saturating_add(item.total_price.max(0)))
}

pub fn net_total(gross_total: i64, discount: i64) -> i64 {
    gross_total.saturating_sub(discount).max(0)
}

/// Prices `items` with `vouchers` applied in the order given.
///
/// Ineligible vouchers (inactive, outside their window, exhausted) are
/// skipped without error. The first eligible voucher is always accepted;
/// later ones need `can_stack`, and at most one percentage voucher applies.
pub fn price(items: &[OrderItem], vouchers: &[Voucher], now: DateTime<Utc>) -> PriceBreakdown {
    let gross = gross_total(items);

    let mut applied: Vec<Uuid> = Vec::new();
    let mut has_percentage = false;
    let mut discount = 0_i64;

    for voucher in vouchers.iter().filter(|v| v.is_redeemable_at(now)) {
        if applied.contains(&voucher.id) {
            continue;
        }
        if !applied.is_empty() {
            if !voucher.can_stack {
                continue;
            }
            if voucher.kind == VoucherKind::Percentage && has_percentage {
                continue;
            }
        }

        discount = discount.saturating_add(contribution(voucher, gross));
        has_percentage |= voucher.kind == VoucherKind::Percentage;
        applied.push(voucher.id);
    }

    let discount = discount.clamp(0, gross);
    PriceBreakdown {
        gross_total: gross,
        discount,
        net_total: net_total(gross, discount),
        applied_voucher_ids: applied,
    }
}

fn contribution(voucher: &Voucher, gross: i64) -> i64 {
    let value = voucher.value.max(0);
    match voucher.kind {
        // Both operands are non-negative, so integer division floors.
        VoucherKind::Percentage => {
            let amount = i128::from(gross) * i128::from(value) / 100;
            i64::try_from(amount).unwrap_or(i64::MAX)
        }
        VoucherKind::FixedAmount => value,
    }
}
