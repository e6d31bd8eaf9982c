use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use super::errors::DomainError;
use super::pricing;
use super::principal::Principal;
use super::product::Reservation;
use super::voucher::VoucherUsage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipping,
    Delivered,
    Cancelled,
    PaymentFailed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::PaymentFailed => "payment_failed",
        }
    }

    /// Transitions reachable through an explicit status update.
    ///
    /// `PaymentFailed` is absent on purpose: only payment reconciliation
    /// enters it.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Processing)
                | (Confirmed, Cancelled)
                | (Processing, Shipping)
                | (Processing, Cancelled)
                | (Shipping, Delivered)
        )
    }

    /// Whether the order's items still hold units taken from stock.
    pub fn holds_stock(&self) -> bool {
        *self != OrderStatus::PaymentFailed
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::PaymentFailed
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "processing" => Ok(OrderStatus::Processing),
            "shipping" => Ok(OrderStatus::Shipping),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "payment_failed" => Ok(OrderStatus::PaymentFailed),
            other => Err(DomainError::Validation(format!("unknown order status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Bank,
    Cod,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Bank => "bank",
            PaymentMethod::Cod => "cod",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank" => Ok(PaymentMethod::Bank),
            "cod" => Ok(PaymentMethod::Cod),
            other => Err(DomainError::Validation(format!("unknown payment method '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    /// Total for `quantity` units at the price snapshotted on creation.
    pub fn total_for(&self, quantity: i32) -> i64 {
        self.unit_price.saturating_mul(i64::from(quantity))
    }
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
}

impl From<&Reservation> for NewOrderItem {
    fn from(reservation: &Reservation) -> Self {
        Self {
            product_id: reservation.product_id,
            quantity: reservation.quantity,
            unit_price: reservation.unit_price,
            total_price: reservation.line_total(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShippingInfo {
    pub shipping_address: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub order_item_ids: Vec<Uuid>,
    pub order_code: String,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping: ShippingInfo,
    pub notes: Option<String>,
    pub voucher_usage_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_visible_to(&self, principal: &Principal) -> bool {
        principal.is_admin() || self.user_id == Some(principal.id)
    }

    /// Item quantities may only change while the order still holds stock.
    pub fn ensure_items_editable(&self) -> Result<(), DomainError> {
        if self.status.holds_stock() {
            Ok(())
        } else {
            Err(DomainError::OrderClosed(self.order_code.clone()))
        }
    }

    /// Moves the order to `next` through an explicit status update.
    ///
    /// Returns `Ok(false)` when the order already is in `next`, so retried
    /// updates are no-ops.
    pub fn apply_status(&mut self, next: OrderStatus) -> Result<bool, DomainError> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(true)
    }

    /// Records a failed payment. Returns `false` if the failure was already
    /// recorded, in which case nothing changes.
    pub fn mark_payment_failed(&mut self, message: &str) -> bool {
        if self.status == OrderStatus::PaymentFailed {
            return false;
        }
        self.status = OrderStatus::PaymentFailed;
        self.notes = Some(append_note(self.notes.as_deref(), &failure_note(message)));
        self.updated_at = Utc::now();
        true
    }

    pub fn recompute_total(&mut self, items: &[OrderItem], usage: Option<&VoucherUsage>) {
        self.total_amount = order_total(items, usage);
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<Uuid>,
    pub order_item_ids: Vec<Uuid>,
    pub order_code: String,
    pub total_amount: i64,
    pub payment_method: PaymentMethod,
    pub shipping: ShippingInfo,
    pub voucher_usage_id: Option<Uuid>,
}

impl NewOrder {
    /// Builds a pending order whose total is derived from `items` and `usage`.
    pub fn new(
        user_id: Option<Uuid>,
        items: &[OrderItem],
        usage: &VoucherUsage,
        payment_method: PaymentMethod,
        shipping: ShippingInfo,
    ) -> Self {
        Self {
            user_id,
            order_item_ids: items.iter().map(|i| i.id).collect(),
            order_code: generate_order_code(),
            total_amount: order_total(items, Some(usage)),
            payment_method,
            shipping,
            voucher_usage_id: Some(usage.id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderPage {
    pub items: Vec<Order>,
    pub total: i64,
}

/// Gross item total minus the usage discount, floored at zero.
pub fn order_total(items: &[OrderItem], usage: Option<&VoucherUsage>) -> i64 {
    pricing::net_total(
        pricing::gross_total(items),
        usage.map_or(0, |u| u.discount_amount),
    )
}

/// Numeric order code: epoch milliseconds followed by three random digits.
///
/// Stays below 2^53 so the payment gateway accepts it as a JSON integer.
pub fn generate_order_code() -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("{}{:03}", Utc::now().timestamp_millis(), suffix)
}

pub fn failure_note(message: &str) -> String {
    let message = message.trim();
    if message.is_empty() {
        "Payment failed".to_string()
    } else {
        format!("Payment failed: {message}")
    }
}

fn append_note(existing: Option<&str>, note: &str) -> String {
    match existing {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}\n{note}"),
        _ => note.to_string(),
    }
}
