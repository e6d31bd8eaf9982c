use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, PaymentMethod, ShippingInfo,
};
use crate::domain::product::Product;
use crate::domain::voucher::{Voucher, VoucherKind, VoucherUsage};
use crate::schema::{notifications, order_items, orders, products, voucher_usages, vouchers};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub amount: i64,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            amount: row.amount,
            stock_quantity: row.stock_quantity,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub amount: i64,
    pub stock_quantity: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
}

impl From<NewOrderItem> for NewOrderItemRow {
    fn from(item: NewOrderItem) -> Self {
        NewOrderItemRow {
            id: Uuid::new_v4(),
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = vouchers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VoucherRow {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub kind: String,
    pub value: i64,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub can_stack: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl TryFrom<VoucherRow> for Voucher {
    type Error = DomainError;

    fn try_from(row: VoucherRow) -> Result<Self, Self::Error> {
        Ok(Voucher {
            id: row.id,
            code: row.code,
            name: row.name,
            kind: row.kind.parse::<VoucherKind>()?,
            value: row.value,
            usage_limit: row.usage_limit,
            used_count: row.used_count,
            can_stack: row.can_stack,
            start_date: row.start_date,
            end_date: row.end_date,
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = vouchers)]
pub struct NewVoucherRow<'a> {
    pub id: Uuid,
    pub code: &'a str,
    pub name: &'a str,
    pub kind: &'a str,
    pub value: i64,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub can_stack: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl<'a> From<&'a Voucher> for NewVoucherRow<'a> {
    fn from(v: &'a Voucher) -> Self {
        NewVoucherRow {
            id: v.id,
            code: &v.code,
            name: &v.name,
            kind: v.kind.as_str(),
            value: v.value,
            usage_limit: v.usage_limit,
            used_count: v.used_count,
            can_stack: v.can_stack,
            start_date: v.start_date,
            end_date: v.end_date,
            is_active: v.is_active,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = voucher_usages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VoucherUsageRow {
    pub id: Uuid,
    pub voucher_ids: Vec<Uuid>,
    pub discount_amount: i64,
    pub created_at: DateTime<Utc>,
}

impl From<VoucherUsageRow> for VoucherUsage {
    fn from(row: VoucherUsageRow) -> Self {
        VoucherUsage {
            id: row.id,
            voucher_ids: row.voucher_ids,
            discount_amount: row.discount_amount,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = voucher_usages)]
pub struct NewVoucherUsageRow {
    pub id: Uuid,
    pub voucher_ids: Vec<Uuid>,
    pub discount_amount: i64,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub order_item_ids: Vec<Uuid>,
    pub order_code: String,
    pub total_amount: i64,
    pub status: String,
    pub payment_method: String,
    pub shipping_address: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub voucher_usage_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    /// Unknown status or payment method strings mean the row was written by
    /// something other than this service.
    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<OrderStatus>().map_err(|_| {
            DomainError::Integrity(format!("order {} has status '{}'", row.id, row.status))
        })?;
        let payment_method = row.payment_method.parse::<PaymentMethod>().map_err(|_| {
            DomainError::Integrity(format!(
                "order {} has payment method '{}'",
                row.id, row.payment_method
            ))
        })?;
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            order_item_ids: row.order_item_ids,
            order_code: row.order_code,
            total_amount: row.total_amount,
            status,
            payment_method,
            shipping: ShippingInfo {
                shipping_address: row.shipping_address,
                customer_name: row.customer_name,
                customer_phone: row.customer_phone,
                customer_email: row.customer_email,
            },
            notes: row.notes,
            voucher_usage_id: row.voucher_usage_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub order_item_ids: Vec<Uuid>,
    pub order_code: String,
    pub total_amount: i64,
    pub status: String,
    pub payment_method: String,
    pub shipping_address: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub voucher_usage_id: Option<Uuid>,
}

impl From<NewOrder> for NewOrderRow {
    fn from(order: NewOrder) -> Self {
        NewOrderRow {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            order_item_ids: order.order_item_ids,
            order_code: order.order_code,
            total_amount: order.total_amount,
            status: OrderStatus::Pending.as_str().to_string(),
            payment_method: order.payment_method.as_str().to_string(),
            shipping_address: order.shipping.shipping_address,
            customer_name: order.shipping.customer_name,
            customer_phone: order.shipping.customer_phone,
            customer_email: order.shipping.customer_email,
            voucher_usage_id: order.voucher_usage_id,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotificationRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: &'a str,
    pub content: &'a str,
}
