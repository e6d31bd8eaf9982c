use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, NewOrderItem, Order, PaymentMethod, ShippingInfo};
use crate::domain::ports::{
    InventoryLedger, OrderItemRepository, OrderRepository, PaymentGateway, PaymentLinkRequest,
    VoucherRepository,
};
use crate::domain::pricing;
use crate::domain::product::Reservation;

/// Gateway-imposed cap on the payment description.
pub const MAX_DESCRIPTION_CHARS: usize = 25;

#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub lines: Vec<CheckoutLine>,
    pub payment_method: Option<PaymentMethod>,
    pub shipping: ShippingInfo,
    pub voucher_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub checkout_url: String,
}

#[derive(Debug, Clone)]
pub struct RedirectUrls {
    pub cancel_url: String,
    pub return_url: String,
}

/// Rows written by a checkout that has not completed yet.
#[derive(Debug, Default)]
struct Written {
    item_ids: Vec<Uuid>,
    usage_id: Option<Uuid>,
    order_id: Option<Uuid>,
}

pub struct CheckoutService {
    ledger: Arc<dyn InventoryLedger>,
    items: Arc<dyn OrderItemRepository>,
    vouchers: Arc<dyn VoucherRepository>,
    orders: Arc<dyn OrderRepository>,
    gateway: Arc<dyn PaymentGateway>,
    urls: RedirectUrls,
}

impl CheckoutService {
    pub fn new(
        ledger: Arc<dyn InventoryLedger>,
        items: Arc<dyn OrderItemRepository>,
        vouchers: Arc<dyn VoucherRepository>,
        orders: Arc<dyn OrderRepository>,
        gateway: Arc<dyn PaymentGateway>,
        urls: RedirectUrls,
    ) -> Self {
        Self {
            ledger,
            items,
            vouchers,
            orders,
            gateway,
            urls,
        }
    }

    /// Reserves stock, prices the order, persists it and requests a payment
    /// link. Any failure after the first reservation releases every unit
    /// reserved by this call and removes whatever rows were written.
    pub fn checkout(
        &self,
        user_id: Option<Uuid>,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, DomainError> {
        let payment_method = validate(&request)?;

        let reservations = self.reserve_all(&request.lines)?;

        let mut written = Written::default();
        match self.place_order(user_id, &request, payment_method, &reservations, &mut written) {
            Ok(outcome) => {
                log::info!(
                    "Order {} placed with {} line(s), total {}",
                    outcome.order.order_code,
                    reservations.len(),
                    outcome.order.total_amount
                );
                Ok(outcome)
            }
            Err(e) => {
                log::warn!("Checkout failed, compensating: {}", e);
                self.remove_written(&written);
                self.release_all(&reservations);
                Err(e)
            }
        }
    }

    fn reserve_all(&self, lines: &[CheckoutLine]) -> Result<Vec<Reservation>, DomainError> {
        let mut reserved = Vec::with_capacity(lines.len());
        for line in lines {
            match self.ledger.reserve(line.product_id, line.quantity) {
                Ok(reservation) => reserved.push(reservation),
                Err(e) => {
                    log::info!(
                        "Reservation of product {} failed after {} successful line(s): {}",
                        line.product_id,
                        reserved.len(),
                        e
                    );
                    self.release_all(&reserved);
                    return Err(e);
                }
            }
        }
        Ok(reserved)
    }

    fn release_all(&self, reservations: &[Reservation]) {
        for r in reservations {
            if let Err(e) = self.ledger.release(r.product_id, r.quantity) {
                log::error!(
                    "Failed to release {} unit(s) of product {}: {}",
                    r.quantity,
                    r.product_id,
                    e
                );
            }
        }
    }

    fn place_order(
        &self,
        user_id: Option<Uuid>,
        request: &CheckoutRequest,
        payment_method: PaymentMethod,
        reservations: &[Reservation],
        written: &mut Written,
    ) -> Result<CheckoutOutcome, DomainError> {
        let items = self
            .items
            .create_many(reservations.iter().map(NewOrderItem::from).collect())?;
        written.item_ids = items.iter().map(|i| i.id).collect();

        let vouchers = self.vouchers.find_many(&request.voucher_ids)?;
        let breakdown = pricing::price(&items, &vouchers, Utc::now());
        let usage = self
            .vouchers
            .create_usage(breakdown.applied_voucher_ids.clone(), breakdown.discount)?;
        written.usage_id = Some(usage.id);

        let order = self.orders.create(NewOrder::new(
            user_id,
            &items,
            &usage,
            payment_method,
            request.shipping.clone(),
        ))?;
        written.order_id = Some(order.id);

        let link = self
            .gateway
            .create_payment_link(&PaymentLinkRequest {
                order_code: order.order_code.clone(),
                amount: order.total_amount,
                description: payment_description(&order.order_code),
                cancel_url: self.urls.cancel_url.clone(),
                return_url: self.urls.return_url.clone(),
            })
            .map_err(|e| match e {
                DomainError::PaymentGateway(_) => e,
                other => DomainError::PaymentGateway(other.to_string()),
            })?;

        Ok(CheckoutOutcome {
            order,
            checkout_url: link.checkout_url,
        })
    }

    fn remove_written(&self, written: &Written) {
        if let Some(order_id) = written.order_id {
            if let Err(e) = self.orders.delete(order_id) {
                log::error!("Failed to remove order {} during rollback: {}", order_id, e);
            }
        }
        if let Some(usage_id) = written.usage_id {
            if let Err(e) = self.vouchers.delete_usage(usage_id) {
                log::error!("Failed to remove voucher usage {} during rollback: {}", usage_id, e);
            }
        }
        if !written.item_ids.is_empty() {
            if let Err(e) = self.items.delete_many(&written.item_ids) {
                log::error!("Failed to remove order items during rollback: {}", e);
            }
        }
    }
}

pub fn payment_description(order_code: &str) -> String {
    format!("Payment {order_code}")
        .chars()
        .take(MAX_DESCRIPTION_CHARS)
        .collect()
}

fn validate(request: &CheckoutRequest) -> Result<PaymentMethod, DomainError> {
    if request.lines.is_empty() {
        return Err(DomainError::Validation("at least one item is required".to_string()));
    }
    if let Some(line) = request.lines.iter().find(|l| l.quantity < 1) {
        return Err(DomainError::Validation(format!(
            "quantity for product {} must be at least 1",
            line.product_id
        )));
    }
    let payment_method = request
        .payment_method
        .ok_or_else(|| DomainError::Validation("payment_method is required".to_string()))?;

    let shipping = &request.shipping;
    for (field, value) in [
        ("shipping_address", &shipping.shipping_address),
        ("customer_name", &shipping.customer_name),
        ("customer_phone", &shipping.customer_phone),
    ] {
        if value.trim().is_empty() {
            return Err(DomainError::Validation(format!("{field} is required")));
        }
    }
    if shipping.customer_name.chars().count() > 255 {
        return Err(DomainError::Validation(
            "customer_name must be at most 255 characters".to_string(),
        ));
    }
    if shipping.customer_phone.chars().count() > 15 {
        return Err(DomainError::Validation(
            "customer_phone must be at most 15 characters".to_string(),
        ));
    }
    Ok(payment_method)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::order::OrderStatus;
    use crate::domain::voucher::VoucherKind;
    use crate::fixtures::{product, shipping, voucher};
    use crate::infrastructure::memory::{InMemoryStore, StubPaymentGateway};

    struct Harness {
        store: Arc<InMemoryStore>,
        gateway: Arc<StubPaymentGateway>,
        service: CheckoutService,
    }

    fn harness(gateway: StubPaymentGateway) -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(gateway);
        let service = CheckoutService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            gateway.clone(),
            RedirectUrls {
                cancel_url: "https://shop.test/order-history".to_string(),
                return_url: "https://shop.test/order-history".to_string(),
            },
        );
        Harness {
            store,
            gateway,
            service,
        }
    }

    fn request(lines: Vec<(Uuid, i32)>, voucher_ids: Vec<Uuid>) -> CheckoutRequest {
        CheckoutRequest {
            lines: lines
                .into_iter()
                .map(|(product_id, quantity)| CheckoutLine {
                    product_id,
                    quantity,
                })
                .collect(),
            payment_method: Some(PaymentMethod::Bank),
            shipping: shipping(),
            voucher_ids,
        }
    }

    #[test]
    fn successful_checkout_reserves_prices_and_links() {
        let h = harness(StubPaymentGateway::succeeding());
        let shirt = h.store.insert_product(product(250_000, 10));
        let hat = h.store.insert_product(product(100_000, 5));
        let pct = h.store.insert_voucher(voucher(VoucherKind::Percentage, 10, true));
        let fixed = h.store.insert_voucher(voucher(VoucherKind::FixedAmount, 50_000, true));
        let user = Uuid::new_v4();

        let outcome = h
            .service
            .checkout(
                Some(user),
                request(vec![(shirt.id, 1), (hat.id, 3)], vec![pct.id, fixed.id]),
            )
            .expect("checkout should succeed");

        // gross 550_000, 10% = 55_000, plus 50_000 fixed
        assert_eq!(outcome.order.total_amount, 445_000);
        assert_eq!(outcome.order.status, OrderStatus::Pending);
        assert_eq!(outcome.order.user_id, Some(user));
        assert_eq!(outcome.order.order_item_ids.len(), 2);
        assert!(outcome.checkout_url.contains(&outcome.order.order_code));

        assert_eq!(h.store.stock_of(shirt.id), Some(9));
        assert_eq!(h.store.stock_of(hat.id), Some(2));

        let usage_id = outcome.order.voucher_usage_id.expect("usage should be linked");
        let usage = h.store.usage(usage_id).expect("usage should be stored");
        assert_eq!(usage.discount_amount, 105_000);
        assert_eq!(usage.voucher_ids, vec![pct.id, fixed.id]);

        // Vouchers are only counted on confirmation.
        assert_eq!(h.store.voucher(pct.id).unwrap().used_count, 0);

        let sent = h.gateway.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].amount, 445_000);
        assert_eq!(sent[0].order_code, outcome.order.order_code);
        assert!(sent[0].description.chars().count() <= MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn checkout_without_vouchers_still_records_an_empty_usage() {
        let h = harness(StubPaymentGateway::succeeding());
        let p = h.store.insert_product(product(300_000, 1));

        let outcome = h
            .service
            .checkout(None, request(vec![(p.id, 1)], vec![]))
            .expect("checkout should succeed");

        let usage = h
            .store
            .usage(outcome.order.voucher_usage_id.unwrap())
            .expect("usage should exist");
        assert!(usage.voucher_ids.is_empty());
        assert_eq!(usage.discount_amount, 0);
        assert_eq!(outcome.order.total_amount, 300_000);
        assert_eq!(outcome.order.user_id, None);
    }

    #[test]
    fn unknown_voucher_ids_are_ignored() {
        let h = harness(StubPaymentGateway::succeeding());
        let p = h.store.insert_product(product(100_000, 1));

        let outcome = h
            .service
            .checkout(None, request(vec![(p.id, 1)], vec![Uuid::new_v4()]))
            .expect("checkout should succeed");

        assert_eq!(outcome.order.total_amount, 100_000);
    }

    #[test]
    fn validation_happens_before_any_reservation() {
        let h = harness(StubPaymentGateway::succeeding());
        let p = h.store.insert_product(product(100_000, 5));

        let mut missing_phone = request(vec![(p.id, 2)], vec![]);
        missing_phone.shipping.customer_phone = "  ".to_string();
        let err = h.service.checkout(None, missing_phone).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let mut no_method = request(vec![(p.id, 2)], vec![]);
        no_method.payment_method = None;
        assert!(matches!(
            h.service.checkout(None, no_method).unwrap_err(),
            DomainError::Validation(_)
        ));

        assert!(matches!(
            h.service.checkout(None, request(vec![], vec![])).unwrap_err(),
            DomainError::Validation(_)
        ));
        assert!(matches!(
            h.service.checkout(None, request(vec![(p.id, 0)], vec![])).unwrap_err(),
            DomainError::Validation(_)
        ));

        assert_eq!(h.store.stock_of(p.id), Some(5));
        assert!(h.gateway.requests().is_empty());
    }

    #[test]
    fn partial_reservation_failure_releases_earlier_lines() {
        let h = harness(StubPaymentGateway::succeeding());
        let a = h.store.insert_product(product(10_000, 4));
        let b = h.store.insert_product(product(20_000, 6));
        let c = h.store.insert_product(product(30_000, 1));

        let err = h
            .service
            .checkout(None, request(vec![(a.id, 2), (b.id, 3), (c.id, 2)], vec![]))
            .unwrap_err();

        assert!(matches!(err, DomainError::InsufficientStock(id) if id == c.id));
        assert_eq!(h.store.stock_of(a.id), Some(4));
        assert_eq!(h.store.stock_of(b.id), Some(6));
        assert_eq!(h.store.stock_of(c.id), Some(1));
        assert_eq!(h.store.order_count(), 0);
        assert_eq!(h.store.item_count(), 0);
        assert!(h.gateway.requests().is_empty());
    }

    #[test]
    fn inactive_or_missing_products_fail_the_checkout() {
        let h = harness(StubPaymentGateway::succeeding());
        let a = h.store.insert_product(product(10_000, 4));
        let mut retired = product(10_000, 4);
        retired.is_active = false;
        let retired = h.store.insert_product(retired);

        let err = h
            .service
            .checkout(None, request(vec![(a.id, 1), (retired.id, 1)], vec![]))
            .unwrap_err();
        assert!(matches!(err, DomainError::ProductInactive(id) if id == retired.id));

        let missing = Uuid::new_v4();
        let err = h
            .service
            .checkout(None, request(vec![(a.id, 1), (missing, 1)], vec![]))
            .unwrap_err();
        assert!(matches!(err, DomainError::ProductNotFound(id) if id == missing));

        assert_eq!(h.store.stock_of(a.id), Some(4));
        assert_eq!(h.store.stock_of(retired.id), Some(4));
    }

    #[test]
    fn gateway_failure_rolls_everything_back() {
        let h = harness(StubPaymentGateway::failing("gateway timeout"));
        let a = h.store.insert_product(product(100_000, 5));
        let b = h.store.insert_product(product(200_000, 5));
        let v = h.store.insert_voucher(voucher(VoucherKind::FixedAmount, 10_000, false));

        let err = h
            .service
            .checkout(None, request(vec![(a.id, 1), (b.id, 1)], vec![v.id]))
            .unwrap_err();

        assert!(matches!(err, DomainError::PaymentGateway(_)));
        assert_eq!(h.store.stock_of(a.id), Some(5));
        assert_eq!(h.store.stock_of(b.id), Some(5));
        assert_eq!(h.store.order_count(), 0);
        assert_eq!(h.store.item_count(), 0);
        assert_eq!(h.store.usage_count(), 0);
        assert_eq!(h.gateway.requests().len(), 1);
    }

    #[test]
    fn persistence_failure_releases_reserved_stock() {
        let h = harness(StubPaymentGateway::succeeding());
        let a = h.store.insert_product(product(100_000, 5));
        h.store.fail_order_inserts(true);

        let err = h
            .service
            .checkout(None, request(vec![(a.id, 2)], vec![]))
            .unwrap_err();

        assert!(matches!(err, DomainError::Internal(_)));
        assert_eq!(h.store.stock_of(a.id), Some(5));
        assert_eq!(h.store.item_count(), 0);
        assert_eq!(h.store.usage_count(), 0);
    }

    #[test]
    fn description_is_truncated_to_gateway_limit() {
        let d = payment_description("12345678901234567890");
        assert_eq!(d.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(d.starts_with("Payment 1234"));
        assert_eq!(payment_description("42"), "Payment 42");
    }
}
