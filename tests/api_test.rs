//! HTTP-level tests: the real routes, extractors and error mapping wired to
//! the in-memory adapters.

use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use fulfillment_service::application::{
    CheckoutService, OrderService, PaymentReconciler, RedirectUrls,
};
use fulfillment_service::configure;
use fulfillment_service::domain::notification::{NotificationKind, Recipient};
use fulfillment_service::domain::order::OrderStatus;
use fulfillment_service::domain::principal::{Principal, Role};
use fulfillment_service::domain::product::Product;
use fulfillment_service::domain::voucher::{Voucher, VoucherKind};
use fulfillment_service::infrastructure::jwt::JwtPrincipalResolver;
use fulfillment_service::infrastructure::memory::{
    InMemoryStore, RecordingNotifier, StubPaymentGateway,
};
use fulfillment_service::AppState;

const SECRET: &str = "api-test-secret-with-enough-entropy";

struct Fixture {
    store: Arc<InMemoryStore>,
    gateway: Arc<StubPaymentGateway>,
    notifier: Arc<RecordingNotifier>,
}

impl Fixture {
    fn new(gateway: StubPaymentGateway) -> Self {
        Fixture {
            store: Arc::new(InMemoryStore::new()),
            gateway: Arc::new(gateway),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    fn state(&self) -> web::Data<AppState> {
        let s = &self.store;
        let redirect = "http://shop.test/order-history".to_string();
        web::Data::new(AppState {
            checkout: Arc::new(CheckoutService::new(
                s.clone(),
                s.clone(),
                s.clone(),
                s.clone(),
                self.gateway.clone(),
                RedirectUrls {
                    cancel_url: redirect.clone(),
                    return_url: redirect,
                },
            )),
            orders: Arc::new(OrderService::new(
                s.clone(),
                s.clone(),
                s.clone(),
                s.clone(),
                self.notifier.clone(),
            )),
            reconciler: Arc::new(PaymentReconciler::new(s.clone(), self.notifier.clone())),
            principals: Arc::new(JwtPrincipalResolver::new(SECRET)),
        })
    }
}

fn product(amount: i64, stock_quantity: i32) -> Product {
    Product {
        id: Uuid::new_v4(),
        name: "Ceramic mug".to_string(),
        amount,
        stock_quantity,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn voucher(kind: VoucherKind, value: i64, can_stack: bool) -> Voucher {
    let id = Uuid::new_v4();
    Voucher {
        id,
        code: id.simple().to_string(),
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

fn principal(role: Role) -> Principal {
    Principal {
        id: Uuid::new_v4(),
        role,
    }
}

fn bearer(principal: &Principal) -> (header::HeaderName, String) {
    let token = JwtPrincipalResolver::new(SECRET)
        .issue(principal, Duration::minutes(10))
        .expect("token should be issued");
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

fn checkout_body(lines: &[(Uuid, i32)], voucher_ids: &[Uuid]) -> Value {
    json!({
        "items": lines
            .iter()
            .map(|(id, q)| json!({ "product_id": id, "quantity": q }))
            .collect::<Vec<_>>(),
        "payment_method": "bank",
        "shipping_address": "12 Hang Bac, Ha Noi",
        "customer_name": "Tran Thi B",
        "customer_phone": "0912345678",
        "voucher_ids": voucher_ids,
    })
}

#[actix_web::test]
async fn checkout_applies_vouchers_and_returns_payment_link() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let p = f.store.insert_product(product(500_000, 5));
    let pct = f.store.insert_voucher(voucher(VoucherKind::Percentage, 10, false));
    let fixed = f.store.insert_voucher(voucher(VoucherKind::FixedAmount, 50_000, true));
    let buyer = principal(Role::Customer);
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/orders/checkout")
        .insert_header(bearer(&buyer))
        .set_json(checkout_body(&[(p.id, 1)], &[pct.id, fixed.id]))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["order"]["total_amount"], 400_000);
    assert_eq!(body["order"]["status"], "pending");
    assert_eq!(body["order"]["user_id"], json!(buyer.id));
    let code = body["order"]["order_code"].as_str().unwrap();
    assert!(body["checkout_url"].as_str().unwrap().contains(code));
    assert_eq!(f.store.stock_of(p.id), Some(4));
    assert_eq!(f.gateway.requests()[0].return_url, "http://shop.test/order-history");
}

#[actix_web::test]
async fn anonymous_checkout_is_allowed() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let p = f.store.insert_product(product(120_000, 2));
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/orders/checkout")
        .set_json(checkout_body(&[(p.id, 2)], &[]))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["order"]["user_id"].is_null());
    assert_eq!(body["order"]["total_amount"], 240_000);
}

#[actix_web::test]
async fn checkout_with_a_bad_token_is_rejected() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let p = f.store.insert_product(product(120_000, 2));
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/orders/checkout")
        .insert_header((header::AUTHORIZATION, "Bearer not-a-jwt"))
        .set_json(checkout_body(&[(p.id, 1)], &[]))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(f.store.stock_of(p.id), Some(2));
}

#[actix_web::test]
async fn insufficient_stock_is_a_conflict_and_reserves_nothing() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let plenty = f.store.insert_product(product(10_000, 10));
    let scarce = f.store.insert_product(product(10_000, 1));
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/orders/checkout")
        .set_json(checkout_body(&[(plenty.id, 3), (scarce.id, 2)], &[]))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains(&scarce.id.to_string()));
    assert_eq!(f.store.stock_of(plenty.id), Some(10));
    assert_eq!(f.store.stock_of(scarce.id), Some(1));
    assert_eq!(f.store.order_count(), 0);
}

#[actix_web::test]
async fn unknown_product_is_not_found() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/orders/checkout")
        .set_json(checkout_body(&[(Uuid::new_v4(), 1)], &[]))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn gateway_failure_restores_everything() {
    let f = Fixture::new(StubPaymentGateway::failing("gateway unavailable"));
    let p = f.store.insert_product(product(80_000, 3));
    let v = f.store.insert_voucher(voucher(VoucherKind::FixedAmount, 10_000, false));
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/orders/checkout")
        .set_json(checkout_body(&[(p.id, 2)], &[v.id]))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(f.store.stock_of(p.id), Some(3));
    assert_eq!(f.store.order_count(), 0);
    assert_eq!(f.store.item_count(), 0);
    assert_eq!(f.store.usage_count(), 0);
    assert_eq!(f.store.voucher(v.id).unwrap().used_count, 0);
}

#[actix_web::test]
async fn invalid_checkout_requests_are_bad_requests() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let p = f.store.insert_product(product(80_000, 3));
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    let mut unknown_method = checkout_body(&[(p.id, 1)], &[]);
    unknown_method["payment_method"] = json!("crypto");
    let bodies = [
        checkout_body(&[], &[]),
        checkout_body(&[(p.id, 0)], &[]),
        unknown_method,
    ];
    for body in bodies {
        let req = test::TestRequest::post()
            .uri("/orders/checkout")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    let req = test::TestRequest::post()
        .uri("/orders/checkout")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());

    assert_eq!(f.store.stock_of(p.id), Some(3));
}

#[actix_web::test]
async fn listing_requires_a_token() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    let req = test::TestRequest::get().uri("/orders").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn customers_list_only_their_own_orders() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let me = principal(Role::Customer);
    let admin = principal(Role::Admin);
    f.store.seed_order(Some(me.id), &[(product(10_000, 5), 1)], &[], 0);
    f.store.seed_order(Some(me.id), &[(product(10_000, 5), 1)], &[], 0);
    f.store.seed_order(Some(Uuid::new_v4()), &[(product(10_000, 5), 1)], &[], 0);
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri("/orders?page=1&limit=1")
        .insert_header(bearer(&me))
        .to_request();
    let mine: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(mine["total"], 2);
    assert_eq!(mine["items"].as_array().unwrap().len(), 1);
    assert_eq!(mine["limit"], 1);

    let req = test::TestRequest::get()
        .uri("/orders?limit=500")
        .insert_header(bearer(&admin))
        .to_request();
    let all: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(all["total"], 3);
    assert_eq!(all["limit"], 100);
}

#[actix_web::test]
async fn another_customers_order_is_not_found() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let owner = principal(Role::Customer);
    let stranger = principal(Role::Customer);
    let order = f
        .store
        .seed_order(Some(owner.id), &[(product(10_000, 5), 1)], &[], 0);
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    let req = test::TestRequest::get()
        .uri(&format!("/orders/{}", order.id))
        .insert_header(bearer(&stranger))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&format!("/orders/{}", order.id))
        .insert_header(bearer(&owner))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["order_code"], order.order_code.as_str());
}

#[actix_web::test]
async fn status_updates_are_admin_only_and_follow_the_lifecycle() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let owner = principal(Role::Customer);
    let admin = principal(Role::Admin);
    let v = f.store.insert_voucher(voucher(VoucherKind::Percentage, 10, false));
    let order = f
        .store
        .seed_order(Some(owner.id), &[(product(100_000, 5), 1)], &[v.id], 10_000);
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;
    let uri = format!("/orders/{}/status", order.id);

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(bearer(&owner))
        .set_json(json!({ "status": "confirmed" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    for _ in 0..2 {
        let req = test::TestRequest::patch()
            .uri(&uri)
            .insert_header(bearer(&admin))
            .set_json(json!({ "status": "confirmed" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    assert_eq!(f.store.voucher(v.id).unwrap().used_count, 1);
    assert_eq!(f.store.order(order.id).unwrap().status, OrderStatus::Confirmed);

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(bearer(&admin))
        .set_json(json!({ "status": "delivered" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header(bearer(&admin))
        .set_json(json!({ "status": "teleported" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let confirmations = f
        .notifier
        .sent()
        .into_iter()
        .filter(|(to, kind, _)| {
            *to == Recipient::User(owner.id) && *kind == NotificationKind::OrderConfirmed
        })
        .count();
    assert_eq!(confirmations, 1);
}

#[actix_web::test]
async fn order_item_quantity_changes_move_stock_and_totals() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let admin = principal(Role::Admin);
    let p = product(50_000, 10);
    let order = f.store.seed_order(None, &[(p.clone(), 2)], &[], 0);
    let item_id = order.order_item_ids[0];
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    let req = test::TestRequest::patch()
        .uri(&format!("/order-items/{item_id}"))
        .insert_header(bearer(&admin))
        .set_json(json!({ "quantity": 5 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["quantity"], 5);
    assert_eq!(body["total_price"], 250_000);
    assert_eq!(f.store.stock_of(p.id), Some(5));
    assert_eq!(f.store.order(order.id).unwrap().total_amount, 250_000);

    let req = test::TestRequest::patch()
        .uri(&format!("/order-items/{item_id}"))
        .insert_header(bearer(&admin))
        .set_json(json!({ "quantity": 50 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
    assert_eq!(f.store.stock_of(p.id), Some(5));
}

#[actix_web::test]
async fn deleting_an_order_item_releases_its_stock() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let admin = principal(Role::Admin);
    let kept = product(30_000, 4);
    let dropped = product(70_000, 4);
    let order = f
        .store
        .seed_order(None, &[(kept.clone(), 1), (dropped.clone(), 2)], &[], 0);
    let dropped_item = order.order_item_ids[1];
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    let req = test::TestRequest::delete()
        .uri(&format!("/order-items/{dropped_item}"))
        .insert_header(bearer(&admin))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(f.store.stock_of(dropped.id), Some(4));
    let stored = f.store.order(order.id).unwrap();
    assert_eq!(stored.order_item_ids, vec![order.order_item_ids[0]]);
    assert_eq!(stored.total_amount, 30_000);
}

#[actix_web::test]
async fn failed_payment_callback_restocks_once() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let p = product(90_000, 6);
    let order = f.store.seed_order(None, &[(p.clone(), 4)], &[], 0);
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;
    let numeric_code: i64 = order.order_code.parse().unwrap();

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/payos/callback")
            .set_json(json!({
                "code": "01",
                "desc": "payment expired",
                "data": { "orderCode": numeric_code, "amount": 360000 }
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "success": true }));
    }

    assert_eq!(f.store.stock_of(p.id), Some(6));
    let stored = f.store.order(order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::PaymentFailed);
    assert_eq!(stored.notes.as_deref(), Some("Payment failed: payment expired"));
}

#[actix_web::test]
async fn item_changes_after_a_failed_payment_conflict() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let admin = principal(Role::Admin);
    let p = product(90_000, 5);
    let order = f.store.seed_order(None, &[(p.clone(), 3)], &[], 0);
    let item_id = order.order_item_ids[0];
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;
    assert_eq!(f.store.stock_of(p.id), Some(2));

    let req = test::TestRequest::post()
        .uri("/payos/callback")
        .set_json(json!({ "code": "01", "desc": "expired", "data": { "orderCode": order.order_code } }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert_eq!(f.store.stock_of(p.id), Some(5));

    let req = test::TestRequest::delete()
        .uri(&format!("/order-items/{item_id}"))
        .insert_header(bearer(&admin))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::patch()
        .uri(&format!("/order-items/{item_id}"))
        .insert_header(bearer(&admin))
        .set_json(json!({ "quantity": 1 }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    assert_eq!(f.store.stock_of(p.id), Some(5));
    assert!(f.store.item(item_id).is_some());
}

#[actix_web::test]
async fn successful_payment_callback_notifies_admins() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let order = f.store.seed_order(None, &[(product(90_000, 6), 1)], &[], 0);
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/payos/callback")
        .set_json(json!({ "code": "00", "desc": "success", "data": { "orderCode": order.order_code } }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(f.store.order(order.id).unwrap().status, OrderStatus::Pending);
    let sent = f.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Recipient::Admins);
}

#[actix_web::test]
async fn webhook_acknowledges_garbage_and_pings() {
    let f = Fixture::new(StubPaymentGateway::succeeding());
    let app = test::init_service(App::new().app_data(f.state()).configure(configure)).await;

    for payload in ["not json at all", r#"{"code":"00","desc":"ping"}"#, r#"{"code":"01","data":{"orderCode":123}}"#] {
        let req = test::TestRequest::post()
            .uri("/payos/callback")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    assert!(f.notifier.sent().is_empty());
}
