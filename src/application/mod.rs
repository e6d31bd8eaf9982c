pub mod checkout;
pub mod order_service;
pub mod reconciliation;

pub use checkout::{CheckoutLine, CheckoutOutcome, CheckoutRequest, CheckoutService, RedirectUrls};
pub use order_service::OrderService;
pub use reconciliation::{PaymentCallback, PaymentReconciler, Reconciliation};
