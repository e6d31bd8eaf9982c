//! In-process adapters for every port, used by the test suites.
//!
//! A single mutex guards all state, which makes each port call atomic with
//! respect to every other call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::notification::{NotificationKind, Recipient};
use crate::domain::order::{
    generate_order_code, NewOrder, NewOrderItem, Order, OrderItem, OrderPage, OrderStatus,
    PaymentMethod, ShippingInfo,
};
use crate::domain::ports::{
    InventoryLedger, Notifier, OrderItemRepository, OrderRepository, PaymentFailure,
    PaymentGateway, PaymentLink, PaymentLinkRequest, StatusChange, VoucherRepository,
};
use crate::domain::product::{Product, Reservation};
use crate::domain::voucher::{Voucher, VoucherUsage};

#[derive(Default)]
struct State {
    products: HashMap<Uuid, Product>,
    items: HashMap<Uuid, OrderItem>,
    vouchers: HashMap<Uuid, Voucher>,
    usages: HashMap<Uuid, VoucherUsage>,
    orders: HashMap<Uuid, Order>,
}

impl State {
    fn take_stock(&mut self, product_id: Uuid, quantity: i32) -> Result<i64, DomainError> {
        let product = self
            .products
            .get_mut(&product_id)
            .ok_or(DomainError::ProductNotFound(product_id))?;
        if !product.is_active {
            return Err(DomainError::ProductInactive(product_id));
        }
        if product.stock_quantity < quantity {
            return Err(DomainError::InsufficientStock(product_id));
        }
        product.stock_quantity -= quantity;
        product.updated_at = Utc::now();
        Ok(product.amount)
    }

    fn return_stock(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let product = self
            .products
            .get_mut(&product_id)
            .ok_or(DomainError::ProductNotFound(product_id))?;
        product.stock_quantity = product.stock_quantity.saturating_add(quantity);
        product.updated_at = Utc::now();
        Ok(())
    }

    /// The item, provided every order referencing it still holds stock.
    fn editable_item(&self, item_id: Uuid) -> Result<OrderItem, DomainError> {
        let item = self
            .items
            .get(&item_id)
            .cloned()
            .ok_or(DomainError::NotFound("Order item"))?;
        for order in self.orders.values() {
            if order.order_item_ids.contains(&item_id) {
                order.ensure_items_editable()?;
            }
        }
        Ok(item)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    fail_order_inserts: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_product(&self, product: Product) -> Product {
        self.lock().products.insert(product.id, product.clone());
        product
    }

    pub fn insert_voucher(&self, voucher: Voucher) -> Voucher {
        self.lock().vouchers.insert(voucher.id, voucher.clone());
        voucher
    }

    /// Drops a product so that stock operations on it fail.
    pub fn remove_product(&self, product_id: Uuid) {
        self.lock().products.remove(&product_id);
    }

    pub fn stock_of(&self, product_id: Uuid) -> Option<i32> {
        self.lock().products.get(&product_id).map(|p| p.stock_quantity)
    }

    pub fn voucher(&self, id: Uuid) -> Option<Voucher> {
        self.lock().vouchers.get(&id).cloned()
    }

    pub fn usage(&self, id: Uuid) -> Option<VoucherUsage> {
        self.lock().usages.get(&id).cloned()
    }

    pub fn order(&self, id: Uuid) -> Option<Order> {
        self.lock().orders.get(&id).cloned()
    }

    pub fn item(&self, id: Uuid) -> Option<OrderItem> {
        self.lock().items.get(&id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    pub fn item_count(&self) -> usize {
        self.lock().items.len()
    }

    pub fn usage_count(&self) -> usize {
        self.lock().usages.len()
    }

    /// Makes `OrderRepository::create` fail, to exercise rollback paths.
    pub fn fail_order_inserts(&self, fail: bool) {
        self.fail_order_inserts.store(fail, Ordering::SeqCst);
    }

    /// Sets a status directly, bypassing the transition rules.
    pub fn force_status(&self, id: Uuid, status: OrderStatus) {
        if let Some(order) = self.lock().orders.get_mut(&id) {
            order.status = status;
        }
    }

    /// Inserts the products, reserves each line and stores a pending order
    /// the way a completed checkout would.
    pub fn seed_order(
        &self,
        user_id: Option<Uuid>,
        lines: &[(Product, i32)],
        voucher_ids: &[Uuid],
        discount_amount: i64,
    ) -> Order {
        let mut new_items = Vec::with_capacity(lines.len());
        for (product, quantity) in lines {
            if self.stock_of(product.id).is_none() {
                self.insert_product(product.clone());
            }
            let reservation = self
                .reserve(product.id, *quantity)
                .unwrap_or_else(|e| panic!("seed reservation failed: {e}"));
            new_items.push(NewOrderItem::from(&reservation));
        }
        let items = OrderItemRepository::create_many(self, new_items)
            .unwrap_or_else(|e| panic!("seed items failed: {e}"));
        let usage = self
            .create_usage(voucher_ids.to_vec(), discount_amount)
            .unwrap_or_else(|e| panic!("seed usage failed: {e}"));
        let order = NewOrder::new(
            user_id,
            &items,
            &usage,
            PaymentMethod::Bank,
            ShippingInfo::default(),
        );
        loop {
            let mut attempt = order.clone();
            attempt.order_code = generate_order_code();
            if let Ok(created) = self.create(attempt) {
                return created;
            }
        }
    }
}

impl InventoryLedger for InMemoryStore {
    fn reserve(&self, product_id: Uuid, quantity: i32) -> Result<Reservation, DomainError> {
        if quantity < 1 {
            return Err(DomainError::Validation("quantity must be at least 1".to_string()));
        }
        let unit_price = self.lock().take_stock(product_id, quantity)?;
        Ok(Reservation {
            product_id,
            quantity,
            unit_price,
        })
    }

    fn release(&self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        if quantity < 1 {
            return Err(DomainError::Validation("quantity must be at least 1".to_string()));
        }
        self.lock().return_stock(product_id, quantity)
    }

    fn resize_item(&self, item_id: Uuid, quantity: i32) -> Result<OrderItem, DomainError> {
        if quantity < 1 {
            return Err(DomainError::Validation("quantity must be at least 1".to_string()));
        }
        let mut state = self.lock();
        let item = state.editable_item(item_id)?;
        let delta = quantity - item.quantity;
        if delta > 0 {
            state.take_stock(item.product_id, delta)?;
        } else if delta < 0 {
            state.return_stock(item.product_id, -delta)?;
        }

        let item = state
            .items
            .get_mut(&item_id)
            .ok_or(DomainError::NotFound("Order item"))?;
        item.total_price = item.total_for(quantity);
        item.quantity = quantity;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    fn remove_item(&self, item_id: Uuid) -> Result<OrderItem, DomainError> {
        let mut state = self.lock();
        let item = state.editable_item(item_id)?;
        state.return_stock(item.product_id, item.quantity)?;
        state.items.remove(&item_id);
        Ok(item)
    }
}

impl OrderItemRepository for InMemoryStore {
    fn create_many(&self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItem>, DomainError> {
        let mut state = self.lock();
        let now = Utc::now();
        let created: Vec<OrderItem> = items
            .into_iter()
            .map(|i| OrderItem {
                id: Uuid::new_v4(),
                product_id: i.product_id,
                quantity: i.quantity,
                unit_price: i.unit_price,
                total_price: i.total_price,
                created_at: now,
                updated_at: now,
            })
            .collect();
        for item in &created {
            state.items.insert(item.id, item.clone());
        }
        Ok(created)
    }

    fn find_many(&self, ids: &[Uuid]) -> Result<Vec<OrderItem>, DomainError> {
        let state = self.lock();
        Ok(ids.iter().filter_map(|id| state.items.get(id).cloned()).collect())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderItem>, DomainError> {
        Ok(self.lock().items.get(&id).cloned())
    }

    fn delete_many(&self, ids: &[Uuid]) -> Result<(), DomainError> {
        let mut state = self.lock();
        for id in ids {
            state.items.remove(id);
        }
        Ok(())
    }
}

impl VoucherRepository for InMemoryStore {
    fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Voucher>, DomainError> {
        let state = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| state.vouchers.get(id).cloned())
            .collect())
    }

    fn increment_used_count(&self, ids: &[Uuid]) -> Result<(), DomainError> {
        let mut state = self.lock();
        for id in ids {
            if let Some(v) = state.vouchers.get_mut(id) {
                if v.usage_limit.map_or(true, |limit| v.used_count < limit) {
                    v.used_count += 1;
                }
            }
        }
        Ok(())
    }

    fn create_usage(
        &self,
        voucher_ids: Vec<Uuid>,
        discount_amount: i64,
    ) -> Result<VoucherUsage, DomainError> {
        let usage = VoucherUsage {
            id: Uuid::new_v4(),
            voucher_ids,
            discount_amount,
            created_at: Utc::now(),
        };
        self.lock().usages.insert(usage.id, usage.clone());
        Ok(usage)
    }

    fn find_usage(&self, id: Uuid) -> Result<Option<VoucherUsage>, DomainError> {
        Ok(self.lock().usages.get(&id).cloned())
    }

    fn delete_usage(&self, id: Uuid) -> Result<(), DomainError> {
        self.lock().usages.remove(&id);
        Ok(())
    }
}

impl OrderRepository for InMemoryStore {
    fn create(&self, order: NewOrder) -> Result<Order, DomainError> {
        if self.fail_order_inserts.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("order insert rejected".to_string()));
        }
        let mut state = self.lock();
        if state.orders.values().any(|o| o.order_code == order.order_code) {
            return Err(DomainError::Internal(format!(
                "duplicate order code {}",
                order.order_code
            )));
        }
        let now = Utc::now();
        let created = Order {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            order_item_ids: order.order_item_ids,
            order_code: order.order_code,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            payment_method: order.payment_method,
            shipping: order.shipping,
            notes: None,
            voucher_usage_id: order.voucher_usage_id,
            created_at: now,
            updated_at: now,
        };
        state.orders.insert(created.id, created.clone());
        Ok(created)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.lock().orders.get(&id).cloned())
    }

    fn find_by_code(&self, order_code: &str) -> Result<Option<Order>, DomainError> {
        Ok(self
            .lock()
            .orders
            .values()
            .find(|o| o.order_code == order_code)
            .cloned())
    }

    fn list(&self, owner: Option<Uuid>, page: i64, limit: i64) -> Result<OrderPage, DomainError> {
        let state = self.lock();
        let mut matching: Vec<&Order> = state
            .orders
            .values()
            .filter(|o| owner.map_or(true, |owner| o.user_id == Some(owner)))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as i64;
        let offset = ((page - 1) * limit).max(0) as usize;
        Ok(OrderPage {
            items: matching
                .into_iter()
                .skip(offset)
                .take(limit.max(0) as usize)
                .cloned()
                .collect(),
            total,
        })
    }

    fn find_by_item(&self, item_id: Uuid) -> Result<Vec<Order>, DomainError> {
        Ok(self
            .lock()
            .orders
            .values()
            .filter(|o| o.order_item_ids.contains(&item_id))
            .cloned()
            .collect())
    }

    fn transition_status(&self, id: Uuid, next: OrderStatus) -> Result<StatusChange, DomainError> {
        let mut state = self.lock();
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(DomainError::NotFound("Order"))?;
        let previous = order.status;
        order.apply_status(next)?;
        Ok(StatusChange {
            previous,
            order: order.clone(),
        })
    }

    fn mark_payment_failed(
        &self,
        order_code: &str,
        message: &str,
    ) -> Result<Option<PaymentFailure>, DomainError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let order = state
            .orders
            .values_mut()
            .find(|o| o.order_code == order_code)
            .ok_or(DomainError::NotFound("Order"))?;
        let restocked: Vec<OrderItem> = order
            .order_item_ids
            .iter()
            .filter_map(|id| state.items.get(id).cloned())
            .collect();
        // Checked up front so a failure leaves the order untouched.
        if let Some(item) = restocked
            .iter()
            .find(|i| !state.products.contains_key(&i.product_id))
        {
            return Err(DomainError::ProductNotFound(item.product_id));
        }
        if !order.mark_payment_failed(message) {
            return Ok(None);
        }
        let order = order.clone();
        for item in &restocked {
            state.return_stock(item.product_id, item.quantity)?;
        }
        Ok(Some(PaymentFailure { order, restocked }))
    }

    fn update_items(
        &self,
        id: Uuid,
        order_item_ids: &[Uuid],
        total_amount: i64,
    ) -> Result<(), DomainError> {
        let mut state = self.lock();
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(DomainError::NotFound("Order"))?;
        order.order_item_ids = order_item_ids.to_vec();
        order.total_amount = total_amount;
        order.updated_at = Utc::now();
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        self.lock().orders.remove(&id);
        Ok(())
    }
}

/// Payment gateway double that records every request.
pub struct StubPaymentGateway {
    failure: Option<String>,
    requests: Mutex<Vec<PaymentLinkRequest>>,
}

impl StubPaymentGateway {
    pub fn succeeding() -> Self {
        Self {
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PaymentLinkRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PaymentGateway for StubPaymentGateway {
    fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<PaymentLink, DomainError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        match &self.failure {
            Some(reason) => Err(DomainError::PaymentGateway(reason.clone())),
            None => Ok(PaymentLink {
                checkout_url: format!("https://pay.test/web/{}", request.order_code),
            }),
        }
    }
}

/// Notifier double that keeps what it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Recipient, NotificationKind, String)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(Recipient, NotificationKind, String)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Notifier for RecordingNotifier {
    fn notify(
        &self,
        recipient: Recipient,
        kind: NotificationKind,
        content: &str,
    ) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("notification channel down".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((recipient, kind, content.to_string()));
        Ok(())
    }
}
