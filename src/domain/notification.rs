use uuid::Uuid;

use super::order::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    User(Uuid),
    /// Every user holding the admin role.
    Admins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    OrderRequested,
    OrderConfirmed,
    OrderProcessing,
    OrderShipping,
    OrderDelivered,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderRequested => "order_requested",
            NotificationKind::OrderConfirmed => "order_confirmed",
            NotificationKind::OrderProcessing => "order_processing",
            NotificationKind::OrderShipping => "order_shipping",
            NotificationKind::OrderDelivered => "order_delivered",
        }
    }

    /// The customer-facing notification for an order entering `status`, if any.
    pub fn for_status(status: OrderStatus, order_code: &str) -> Option<(Self, String)> {
        let notification = match status {
            OrderStatus::Confirmed => (
                NotificationKind::OrderConfirmed,
                format!("Order {order_code} has been confirmed."),
            ),
            OrderStatus::Processing => (
                NotificationKind::OrderProcessing,
                format!("Order {order_code} is being processed."),
            ),
            OrderStatus::Shipping => (
                NotificationKind::OrderShipping,
                format!("Order {order_code} is on its way."),
            ),
            OrderStatus::Delivered => (
                NotificationKind::OrderDelivered,
                format!("Order {order_code} has been delivered."),
            ),
            _ => return None,
        };
        Some(notification)
    }
}
