pub mod errors;
pub mod notification;
pub mod order;
pub mod ports;
pub mod pricing;
pub mod principal;
pub mod product;
pub mod voucher;
