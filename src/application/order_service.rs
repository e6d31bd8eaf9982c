use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::notification::{NotificationKind, Recipient};
use crate::domain::order::{order_total, Order, OrderItem, OrderPage, OrderStatus};
use crate::domain::ports::{
    InventoryLedger, Notifier, OrderItemRepository, OrderRepository, StatusChange,
    VoucherRepository,
};
use crate::domain::principal::Principal;

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    items: Arc<dyn OrderItemRepository>,
    vouchers: Arc<dyn VoucherRepository>,
    ledger: Arc<dyn InventoryLedger>,
    notifier: Arc<dyn Notifier>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        items: Arc<dyn OrderItemRepository>,
        vouchers: Arc<dyn VoucherRepository>,
        ledger: Arc<dyn InventoryLedger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            orders,
            items,
            vouchers,
            ledger,
            notifier,
        }
    }

    pub fn get_order(&self, principal: &Principal, id: Uuid) -> Result<Order, DomainError> {
        let order = self
            .orders
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Order"))?;
        // Someone else's order is reported as missing rather than forbidden.
        if !order.is_visible_to(principal) {
            return Err(DomainError::NotFound("Order"));
        }
        Ok(order)
    }

    pub fn list_orders(
        &self,
        principal: &Principal,
        page: i64,
        limit: i64,
    ) -> Result<OrderPage, DomainError> {
        let owner = (!principal.is_admin()).then_some(principal.id);
        self.orders.list(owner, page.max(1), limit.clamp(1, 100))
    }

    /// Admin status update. Entering `confirmed` counts one use of every
    /// voucher on the order's usage; a retried confirmation does not.
    pub fn update_status(
        &self,
        principal: &Principal,
        id: Uuid,
        next: OrderStatus,
    ) -> Result<Order, DomainError> {
        principal.require_admin()?;

        let change = self.orders.transition_status(id, next)?;
        if change.previous == change.order.status {
            return Ok(change.order);
        }
        log::info!(
            "Order {} moved from {} to {}",
            change.order.order_code,
            change.previous,
            change.order.status
        );

        if change.entered(OrderStatus::Confirmed) {
            self.count_voucher_uses(&change);
        }
        self.notify_owner(&change.order);
        Ok(change.order)
    }

    /// Changes an item's quantity, reserving or releasing the difference and
    /// recomputing every order that references the item.
    pub fn update_order_item_quantity(
        &self,
        principal: &Principal,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<OrderItem, DomainError> {
        principal.require_admin()?;
        if quantity < 1 {
            return Err(DomainError::Validation("quantity must be at least 1".to_string()));
        }

        let updated = self.ledger.resize_item(item_id, quantity)?;
        log::info!("Order item {} resized to {}", item_id, quantity);

        for order in self.orders.find_by_item(item_id)? {
            self.recompute(&order, &order.order_item_ids)?;
        }
        Ok(updated)
    }

    /// Deletes an item, returns its stock and drops it from referencing orders.
    pub fn delete_order_item(&self, principal: &Principal, item_id: Uuid) -> Result<(), DomainError> {
        principal.require_admin()?;

        let removed = self.ledger.remove_item(item_id)?;
        log::info!(
            "Order item {} deleted, {} unit(s) of product {} released",
            item_id,
            removed.quantity,
            removed.product_id
        );

        for order in self.orders.find_by_item(item_id)? {
            let remaining: Vec<Uuid> = order
                .order_item_ids
                .iter()
                .copied()
                .filter(|id| *id != item_id)
                .collect();
            self.recompute(&order, &remaining)?;
        }
        Ok(())
    }

    fn recompute(&self, order: &Order, item_ids: &[Uuid]) -> Result<(), DomainError> {
        let items = self.items.find_many(item_ids)?;
        let usage = match order.voucher_usage_id {
            Some(usage_id) => Some(self.vouchers.find_usage(usage_id)?.ok_or_else(|| {
                DomainError::Integrity(format!(
                    "order {} references missing voucher usage {}",
                    order.order_code, usage_id
                ))
            })?),
            None => None,
        };
        let total = order_total(&items, usage.as_ref());
        self.orders.update_items(order.id, item_ids, total)
    }

    fn count_voucher_uses(&self, change: &StatusChange) {
        let Some(usage_id) = change.order.voucher_usage_id else {
            return;
        };
        let result = self.vouchers.find_usage(usage_id).and_then(|usage| match usage {
            Some(usage) if usage.voucher_ids.is_empty() => Ok(()),
            Some(usage) => self.vouchers.increment_used_count(&usage.voucher_ids),
            None => Err(DomainError::Integrity(format!(
                "voucher usage {usage_id} is missing"
            ))),
        });
        if let Err(e) = result {
            log::error!(
                "Failed to count voucher uses for order {}: {}",
                change.order.order_code,
                e
            );
        }
    }

    fn notify_owner(&self, order: &Order) {
        let Some(user_id) = order.user_id else {
            return;
        };
        let Some((kind, content)) = NotificationKind::for_status(order.status, &order.order_code)
        else {
            return;
        };
        if let Err(e) = self.notifier.notify(Recipient::User(user_id), kind, &content) {
            log::warn!("Failed to notify user {} about order {}: {}", user_id, order.order_code, e);
        }
    }
}
