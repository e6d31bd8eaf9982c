use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoucherKind {
    Percentage,
    FixedAmount,
}

impl VoucherKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherKind::Percentage => "PERCENTAGE",
            VoucherKind::FixedAmount => "FIXED_AMOUNT",
        }
    }
}

impl FromStr for VoucherKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PERCENTAGE" => Ok(VoucherKind::Percentage),
            "FIXED_AMOUNT" => Ok(VoucherKind::FixedAmount),
            other => Err(DomainError::Integrity(format!("unknown voucher type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Voucher {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub kind: VoucherKind,
    /// Percent for `Percentage`, minor currency units for `FixedAmount`.
    pub value: i64,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub can_stack: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Voucher {
    /// Active, inside its validity window (bounds inclusive, a missing bound
    /// is open) and below its usage limit.
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if self.start_date.is_some_and(|start| now < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| now > end) {
            return false;
        }
        self.usage_limit.map_or(true, |limit| self.used_count < limit)
    }
}

/// Snapshot of the vouchers applied to one order and the discount they produced.
#[derive(Debug, Clone)]
pub struct VoucherUsage {
    pub id: Uuid,
    pub voucher_ids: Vec<Uuid>,
    pub discount_amount: i64,
    pub created_at: DateTime<Utc>,
}
