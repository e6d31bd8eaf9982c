use chrono::Utc;
use uuid::Uuid;

use crate::domain::order::ShippingInfo;
use crate::domain::principal::{Principal, Role};
use crate::domain::product::Product;
use crate::domain::voucher::{Voucher, VoucherKind};

pub fn product(amount: i64, stock_quantity: i32) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: "Linen shirt".to_string(),
        amount,
        stock_quantity,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn voucher(kind: VoucherKind, value: i64, can_stack: bool) -> Voucher {
    let id = Uuid::new_v4();
    Voucher {
        id,
        code: format!("{}-{}", kind.as_str(), &id.simple().to_string()[..8]),
        name: "Promotion".to_string(),
        kind,
        value,
        usage_limit: None,
        used_count: 0,
        can_stack,
        start_date: None,
        end_date: None,
        is_active: true,
    }
}

pub fn shipping() -> ShippingInfo {
    ShippingInfo {
        shipping_address: "12 Hang Bac, Hoan Kiem, Ha Noi".to_string(),
        customer_name: "Nguyen Van A".to_string(),
        customer_phone: "0901234567".to_string(),
        customer_email: Some("a@example.com".to_string()),
    }
}

pub fn admin() -> Principal {
    Principal {
        id: Uuid::new_v4(),
        role: Role::Admin,
    }
}

pub fn customer() -> Principal {
    Principal {
        id: Uuid::new_v4(),
        role: Role::Customer,
    }
}
