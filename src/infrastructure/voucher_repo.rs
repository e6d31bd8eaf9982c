use std::collections::HashMap;

use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::VoucherRepository;
use crate::domain::voucher::{Voucher, VoucherUsage};
use crate::schema::{voucher_usages, vouchers};

use super::models::{NewVoucherUsageRow, VoucherRow, VoucherUsageRow};

pub struct DieselVoucherRepository {
    pool: DbPool,
}

impl DieselVoucherRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl VoucherRepository for DieselVoucherRepository {
    fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Voucher>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get()?;
        let rows = vouchers::table
            .filter(vouchers::id.eq_any(ids.to_vec()))
            .select(VoucherRow::as_select())
            .load(&mut conn)?;

        // Pricing is order-dependent, so hand the vouchers back in request order.
        let mut by_id: HashMap<Uuid, VoucherRow> = rows.into_iter().map(|r| (r.id, r)).collect();
        ids.iter()
            .filter_map(|id| by_id.remove(id))
            .map(Voucher::try_from)
            .collect()
    }

    fn increment_used_count(&self, ids: &[Uuid]) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get()?;
        let updated = diesel::update(vouchers::table)
            .filter(vouchers::id.eq_any(ids.to_vec()))
            .filter(
                vouchers::usage_limit
                    .is_null()
                    .or(vouchers::used_count.nullable().lt(vouchers::usage_limit)),
            )
            .set(vouchers::used_count.eq(vouchers::used_count + 1))
            .execute(&mut conn)?;
        log::debug!("Counted one use on {} of {} voucher(s)", updated, ids.len());
        Ok(())
    }

    fn create_usage(
        &self,
        voucher_ids: Vec<Uuid>,
        discount_amount: i64,
    ) -> Result<VoucherUsage, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(voucher_usages::table)
            .values(&NewVoucherUsageRow {
                id: Uuid::new_v4(),
                voucher_ids,
                discount_amount,
            })
            .returning(VoucherUsageRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn find_usage(&self, id: Uuid) -> Result<Option<VoucherUsage>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = voucher_usages::table
            .find(id)
            .select(VoucherUsageRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(VoucherUsage::from))
    }

    fn delete_usage(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::delete(voucher_usages::table.find(id)).execute(&mut conn)?;
        Ok(())
    }
}
