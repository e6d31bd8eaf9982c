use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, Order, OrderItem, OrderPage, OrderStatus};
use crate::domain::ports::{OrderRepository, PaymentFailure, StatusChange};
use crate::schema::{order_items, orders};

use super::models::{NewOrderRow, OrderItemRow, OrderRow};
use super::product_repo::return_stock;

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Row for `orders.order_code = code`, locked until the transaction ends.
fn lock_by_code(conn: &mut PgConnection, order_code: &str) -> Result<Option<Order>, DomainError> {
    orders::table
        .filter(orders::order_code.eq(order_code))
        .select(OrderRow::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .map(Order::try_from)
        .transpose()
}

/// Every order whose item list contains `item_id`, locked until the
/// transaction ends.
pub(super) fn lock_by_item(
    conn: &mut PgConnection,
    item_id: Uuid,
) -> Result<Vec<Order>, DomainError> {
    orders::table
        .filter(orders::order_item_ids.contains(vec![item_id]))
        .select(OrderRow::as_select())
        .for_update()
        .load::<OrderRow>(conn)?
        .into_iter()
        .map(Order::try_from)
        .collect()
}

fn save_status(conn: &mut PgConnection, order: &Order) -> Result<(), DomainError> {
    diesel::update(orders::table.find(order.id))
        .set((
            orders::status.eq(order.status.as_str()),
            orders::notes.eq(order.notes.as_deref()),
            orders::updated_at.eq(order.updated_at),
        ))
        .execute(conn)?;
    Ok(())
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(orders::table)
            .values(&NewOrderRow::from(order))
            .returning(OrderRow::as_returning())
            .get_result(&mut conn)?;
        row.try_into()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    fn find_by_code(&self, order_code: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        orders::table
            .filter(orders::order_code.eq(order_code))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Order::try_from)
            .transpose()
    }

    fn list(&self, owner: Option<Uuid>, page: i64, limit: i64) -> Result<OrderPage, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1) * limit;
        conn.transaction::<_, DomainError, _>(|conn| {
            let mut count = orders::table.into_boxed();
            let mut rows = orders::table.into_boxed();
            if let Some(owner) = owner {
                count = count.filter(orders::user_id.eq(owner));
                rows = rows.filter(orders::user_id.eq(owner));
            }

            let total: i64 = count.count().get_result(conn)?;
            let rows = rows
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            Ok(OrderPage {
                items: rows
                    .into_iter()
                    .map(Order::try_from)
                    .collect::<Result<_, _>>()?,
                total,
            })
        })
    }

    fn find_by_item(&self, item_id: Uuid) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        orders::table
            .filter(orders::order_item_ids.contains(vec![item_id]))
            .select(OrderRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    fn transition_status(&self, id: Uuid, next: OrderStatus) -> Result<StatusChange, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = orders::table
                .find(id)
                .select(OrderRow::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound("Order"))?;
            let mut order = Order::try_from(row)?;
            let previous = order.status;

            if order.apply_status(next)? {
                save_status(conn, &order)?;
            }
            Ok(StatusChange { previous, order })
        })
    }

    fn mark_payment_failed(
        &self,
        order_code: &str,
        message: &str,
    ) -> Result<Option<PaymentFailure>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut order =
                lock_by_code(conn, order_code)?.ok_or(DomainError::NotFound("Order"))?;
            if !order.mark_payment_failed(message) {
                return Ok(None);
            }
            save_status(conn, &order)?;

            let restocked: Vec<OrderItem> = order_items::table
                .filter(order_items::id.eq_any(order.order_item_ids.clone()))
                .select(OrderItemRow::as_select())
                .load::<OrderItemRow>(conn)?
                .into_iter()
                .map(OrderItem::from)
                .collect();
            for item in &restocked {
                return_stock(conn, item.product_id, item.quantity)?;
            }
            Ok(Some(PaymentFailure { order, restocked }))
        })
    }

    fn update_items(
        &self,
        id: Uuid,
        order_item_ids: &[Uuid],
        total_amount: i64,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(orders::table.find(id))
            .set((
                orders::order_item_ids.eq(order_item_ids.to_vec()),
                orders::total_amount.eq(total_amount),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::NotFound("Order"));
        }
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::delete(orders::table.find(id)).execute(&mut conn)?;
        Ok(())
    }
}
