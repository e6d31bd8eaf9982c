use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::OrderItem;
use crate::domain::ports::InventoryLedger;
use crate::domain::product::{Product, Reservation};
use crate::schema::products;

use super::models::ProductRow;
use super::order_item_repo::{delete_item, lock_item, set_quantity};
use super::order_repo::lock_by_item;

/// Stock ledger backed by the `products` table.
///
/// Stock only ever moves through relative `UPDATE`s, so concurrent callers
/// are serialised by Postgres row locking rather than by this process.
pub struct DieselInventoryLedger {
    pool: DbPool,
}

impl DieselInventoryLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn require_positive(quantity: i32) -> Result<(), DomainError> {
    if quantity < 1 {
        return Err(DomainError::Validation(
            "quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Explains why a conditional decrement matched no row.
fn rejection(conn: &mut PgConnection, product_id: Uuid) -> Result<DomainError, DomainError> {
    let product: Option<Product> = products::table
        .find(product_id)
        .select(ProductRow::as_select())
        .first(conn)
        .optional()?
        .map(Product::from);
    Ok(match product {
        None => DomainError::ProductNotFound(product_id),
        Some(p) if !p.is_active => DomainError::ProductInactive(product_id),
        Some(_) => DomainError::InsufficientStock(product_id),
    })
}

/// Decrements stock only if the product is active and has `quantity` units
/// left. Returns the current unit price.
pub(super) fn take_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    quantity: i32,
) -> Result<i64, DomainError> {
    let unit_price: Option<i64> = diesel::update(products::table)
        .filter(products::id.eq(product_id))
        .filter(products::is_active.eq(true))
        .filter(products::stock_quantity.ge(quantity))
        .set((
            products::stock_quantity.eq(products::stock_quantity - quantity),
            products::updated_at.eq(Utc::now()),
        ))
        .returning(products::amount)
        .get_result(conn)
        .optional()?;

    match unit_price {
        Some(unit_price) => {
            log::debug!("Reserved {} unit(s) of product {}", quantity, product_id);
            Ok(unit_price)
        }
        None => Err(rejection(conn, product_id)?),
    }
}

pub(super) fn return_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), DomainError> {
    let updated = diesel::update(products::table.find(product_id))
        .set((
            products::stock_quantity.eq(products::stock_quantity + quantity),
            products::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;
    if updated == 0 {
        return Err(DomainError::ProductNotFound(product_id));
    }
    log::debug!("Released {} unit(s) of product {}", quantity, product_id);
    Ok(())
}

/// Locks the item and every order referencing it, refusing to go on if one
/// of those orders has already returned its stock.
fn lock_editable_item(conn: &mut PgConnection, item_id: Uuid) -> Result<OrderItem, DomainError> {
    let item = lock_item(conn, item_id)?.ok_or(DomainError::NotFound("Order item"))?;
    for order in lock_by_item(conn, item_id)? {
        order.ensure_items_editable()?;
    }
    Ok(item)
}

impl InventoryLedger for DieselInventoryLedger {
    fn reserve(&self, product_id: Uuid, quantity: i32) -> Result<Reservation, DomainError> {
        require_positive(quantity)?;
        let mut conn = self.pool.get()?;
        let unit_price = take_stock(&mut conn, product_id, quantity)?;
        Ok(Reservation {
            product_id,
            quantity,
            unit_price,
        })
    }

    fn release(&self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        require_positive(quantity)?;
        let mut conn = self.pool.get()?;
        return_stock(&mut conn, product_id, quantity)
    }

    fn resize_item(&self, item_id: Uuid, quantity: i32) -> Result<OrderItem, DomainError> {
        require_positive(quantity)?;
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let item = lock_editable_item(conn, item_id)?;
            let delta = quantity - item.quantity;
            if delta > 0 {
                take_stock(conn, item.product_id, delta)?;
            } else if delta < 0 {
                return_stock(conn, item.product_id, -delta)?;
            }
            set_quantity(conn, &item, quantity)
        })
    }

    fn remove_item(&self, item_id: Uuid) -> Result<OrderItem, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let item = lock_editable_item(conn, item_id)?;
            delete_item(conn, item_id)?;
            return_stock(conn, item.product_id, item.quantity)?;
            Ok(item)
        })
    }
}
