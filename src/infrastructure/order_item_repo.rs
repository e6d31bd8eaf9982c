use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrderItem, OrderItem};
use crate::domain::ports::OrderItemRepository;
use crate::schema::order_items;

use super::models::{NewOrderItemRow, OrderItemRow};

pub struct DieselOrderItemRepository {
    pool: DbPool,
}

impl DieselOrderItemRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// The item row, locked until the transaction ends.
pub(super) fn lock_item(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<OrderItem>, DomainError> {
    let row = order_items::table
        .find(id)
        .select(OrderItemRow::as_select())
        .for_update()
        .first(conn)
        .optional()?;
    Ok(row.map(OrderItem::from))
}

/// Rewrites quantity and total at the item's snapshotted unit price.
pub(super) fn set_quantity(
    conn: &mut PgConnection,
    item: &OrderItem,
    quantity: i32,
) -> Result<OrderItem, DomainError> {
    let row = diesel::update(order_items::table.find(item.id))
        .set((
            order_items::quantity.eq(quantity),
            order_items::total_price.eq(item.total_for(quantity)),
            order_items::updated_at.eq(Utc::now()),
        ))
        .returning(OrderItemRow::as_returning())
        .get_result(conn)?;
    Ok(OrderItem::from(row))
}

pub(super) fn delete_item(conn: &mut PgConnection, id: Uuid) -> Result<(), DomainError> {
    diesel::delete(order_items::table.find(id)).execute(conn)?;
    Ok(())
}

impl OrderItemRepository for DieselOrderItemRepository {
    fn create_many(&self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItem>, DomainError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get()?;
        let rows: Vec<NewOrderItemRow> = items.into_iter().map(NewOrderItemRow::from).collect();

        let created = diesel::insert_into(order_items::table)
            .values(&rows)
            .returning(OrderItemRow::as_returning())
            .get_results(&mut conn)?;
        Ok(created.into_iter().map(OrderItem::from).collect())
    }

    fn find_many(&self, ids: &[Uuid]) -> Result<Vec<OrderItem>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get()?;
        let rows = order_items::table
            .filter(order_items::id.eq_any(ids.to_vec()))
            .select(OrderItemRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderItem>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = order_items::table
            .find(id)
            .select(OrderItemRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(OrderItem::from))
    }

    fn delete_many(&self, ids: &[Uuid]) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get()?;
        diesel::delete(order_items::table.filter(order_items::id.eq_any(ids.to_vec())))
            .execute(&mut conn)?;
        Ok(())
    }
}
