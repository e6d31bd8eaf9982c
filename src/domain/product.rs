use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Unit price in minor currency units.
    pub amount: i64,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stock taken out of a product by a successful `reserve`.
///
/// Carries the unit price observed at the instant of the reservation so the
/// resulting order item can snapshot it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

impl Reservation {
    pub fn line_total(&self) -> i64 {
        self.unit_price.saturating_mul(i64::from(self.quantity))
    }
}
