use thiserror::Error;
use uuid::Uuid;

use super::order::OrderStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Product {0} not found")]
    ProductNotFound(Uuid),
    #[error("Product {0} is not available for purchase")]
    ProductInactive(Uuid),
    #[error("Insufficient stock for product {0}")]
    InsufficientStock(Uuid),
    #[error("Order {0} has already returned its stock")]
    OrderClosed(String),
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),
    #[error("Integrity error: {0}")]
    Integrity(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
