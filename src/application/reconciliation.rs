use std::sync::Arc;

use crate::domain::errors::DomainError;
use crate::domain::notification::{NotificationKind, Recipient};
use crate::domain::order::Order;
use crate::domain::ports::{Notifier, OrderRepository};

/// Result code the gateway sends for a successful payment.
pub const PAYMENT_SUCCESS_CODE: &str = "00";

#[derive(Debug, Clone, Default)]
pub struct PaymentCallback {
    pub order_code: Option<String>,
    pub code: String,
    pub message: Option<String>,
}

/// What a callback led to. The webhook acknowledges every variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// No order code: a verification ping from the gateway.
    Ping,
    UnknownOrder,
    Paid,
    /// Order moved to `payment_failed`; this many item lines were restocked.
    Failed { restocked_lines: usize },
    /// Duplicate failure delivery; nothing changed.
    AlreadyFailed,
    /// Internal error, already logged.
    Error,
}

pub struct PaymentReconciler {
    orders: Arc<dyn OrderRepository>,
    notifier: Arc<dyn Notifier>,
}

impl PaymentReconciler {
    pub fn new(orders: Arc<dyn OrderRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self { orders, notifier }
    }

    /// Never fails: errors are logged and reported as `Reconciliation::Error`.
    pub fn handle_callback(&self, callback: PaymentCallback) -> Reconciliation {
        match self.reconcile(&callback) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!(
                    "Payment callback for order {:?} could not be reconciled: {}",
                    callback.order_code,
                    e
                );
                Reconciliation::Error
            }
        }
    }

    fn reconcile(&self, callback: &PaymentCallback) -> Result<Reconciliation, DomainError> {
        let Some(order_code) = callback
            .order_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        else {
            return Ok(Reconciliation::Ping);
        };

        let Some(order) = self.orders.find_by_code(order_code)? else {
            log::info!("Payment callback for unknown order {}", order_code);
            return Ok(Reconciliation::UnknownOrder);
        };

        if callback.code == PAYMENT_SUCCESS_CODE {
            self.announce_paid(&order);
            return Ok(Reconciliation::Paid);
        }

        let message = callback.message.as_deref().unwrap_or_default();
        let Some(failed) = self.orders.mark_payment_failed(order_code, message)? else {
            log::info!("Duplicate payment failure for order {} ignored", order_code);
            return Ok(Reconciliation::AlreadyFailed);
        };

        let restocked_lines = failed.restocked.len();
        log::info!(
            "Order {} marked payment_failed, {} line(s) restocked",
            failed.order.order_code,
            restocked_lines
        );
        Ok(Reconciliation::Failed { restocked_lines })
    }

    fn announce_paid(&self, order: &Order) {
        let content = format!("A customer has placed order {}.", order.order_code);
        if let Err(e) = self
            .notifier
            .notify(Recipient::Admins, NotificationKind::OrderRequested, &content)
        {
            log::warn!("Failed to notify admins about order {}: {}", order.order_code, e);
        }
    }
}
