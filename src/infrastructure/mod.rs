pub mod jwt;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod models;
pub mod notifier;
pub mod order_item_repo;
pub mod order_repo;
pub mod payos;
pub mod product_repo;
#[cfg(test)]
pub mod test_db;
pub mod voucher_repo;
