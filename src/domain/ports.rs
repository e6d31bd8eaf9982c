use uuid::Uuid;

use super::errors::DomainError;
use super::notification::{NotificationKind, Recipient};
use super::order::{NewOrder, NewOrderItem, Order, OrderItem, OrderPage, OrderStatus};
use super::principal::Principal;
use super::product::Reservation;
use super::voucher::{Voucher, VoucherUsage};

/// Owner of per-product stock.
///
/// Apart from these calls, stock only moves when a payment failure is
/// recorded (`OrderRepository::mark_payment_failed`).
pub trait InventoryLedger: Send + Sync + 'static {
    /// Checks `is_active && stock_quantity >= quantity` and decrements in one
    /// indivisible step.
    fn reserve(&self, product_id: Uuid, quantity: i32) -> Result<Reservation, DomainError>;

    /// Unconditionally gives `quantity` units back to the product.
    fn release(&self, product_id: Uuid, quantity: i32) -> Result<(), DomainError>;

    /// Sets an order item's quantity and reserves or releases the difference
    /// as one step. The item and the orders referencing it stay locked
    /// throughout; fails with `OrderClosed` if one of those orders has
    /// already returned its stock.
    fn resize_item(&self, item_id: Uuid, quantity: i32) -> Result<OrderItem, DomainError>;

    /// Deletes an order item and releases its full quantity as one step,
    /// under the same rules as `resize_item`. Returns the deleted item.
    fn remove_item(&self, item_id: Uuid) -> Result<OrderItem, DomainError>;
}

pub trait OrderItemRepository: Send + Sync + 'static {
    fn create_many(&self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItem>, DomainError>;
    /// Items that exist among `ids`; unknown ids are left out.
    fn find_many(&self, ids: &[Uuid]) -> Result<Vec<OrderItem>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderItem>, DomainError>;
    fn delete_many(&self, ids: &[Uuid]) -> Result<(), DomainError>;
}

pub trait VoucherRepository: Send + Sync + 'static {
    /// Vouchers for `ids` in the same order as `ids`; unknown ids are left out.
    fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Voucher>, DomainError>;
    /// Adds one use to each voucher that is still below its limit.
    fn increment_used_count(&self, ids: &[Uuid]) -> Result<(), DomainError>;
    fn create_usage(
        &self,
        voucher_ids: Vec<Uuid>,
        discount_amount: i64,
    ) -> Result<VoucherUsage, DomainError>;
    fn find_usage(&self, id: Uuid) -> Result<Option<VoucherUsage>, DomainError>;
    fn delete_usage(&self, id: Uuid) -> Result<(), DomainError>;
}

/// Result of a status update: the status seen under lock and the order after it.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub previous: OrderStatus,
    pub order: Order,
}

impl StatusChange {
    pub fn entered(&self, status: OrderStatus) -> bool {
        self.previous != status && self.order.status == status
    }
}

/// A payment failure that won the compare-and-set, with the items whose
/// units went back to stock in the same step.
#[derive(Debug, Clone)]
pub struct PaymentFailure {
    pub order: Order,
    pub restocked: Vec<OrderItem>,
}

pub trait OrderRepository: Send + Sync + 'static {
    fn create(&self, order: NewOrder) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn find_by_code(&self, order_code: &str) -> Result<Option<Order>, DomainError>;
    /// Newest first. `owner` restricts the page to one user's orders.
    fn list(&self, owner: Option<Uuid>, page: i64, limit: i64) -> Result<OrderPage, DomainError>;
    fn find_by_item(&self, item_id: Uuid) -> Result<Vec<Order>, DomainError>;
    /// Reads and rewrites the status as one step via `Order::apply_status`.
    fn transition_status(&self, id: Uuid, next: OrderStatus) -> Result<StatusChange, DomainError>;
    /// Compare-and-set into `payment_failed` via `Order::mark_payment_failed`,
    /// releasing the stock of every referenced item in the same transaction.
    ///
    /// Only the caller that performed the transition gets `Some`; `None` if
    /// the order was already failed. On error nothing is written, so a
    /// redelivered callback can try again.
    fn mark_payment_failed(
        &self,
        order_code: &str,
        message: &str,
    ) -> Result<Option<PaymentFailure>, DomainError>;
    fn update_items(
        &self,
        id: Uuid,
        order_item_ids: &[Uuid],
        total_amount: i64,
    ) -> Result<(), DomainError>;
    fn delete(&self, id: Uuid) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinkRequest {
    pub order_code: String,
    pub amount: i64,
    pub description: String,
    pub cancel_url: String,
    pub return_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLink {
    pub checkout_url: String,
}

pub trait PaymentGateway: Send + Sync + 'static {
    fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<PaymentLink, DomainError>;
}

/// Best-effort delivery; callers log failures and carry on.
pub trait Notifier: Send + Sync + 'static {
    fn notify(
        &self,
        recipient: Recipient,
        kind: NotificationKind,
        content: &str,
    ) -> Result<(), DomainError>;
}

pub trait PrincipalResolver: Send + Sync + 'static {
    /// Resolves the raw `Authorization` header value, if one was sent.
    fn resolve(&self, authorization: Option<&str>) -> Result<Principal, DomainError>;
}
