use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::{CheckoutLine, CheckoutRequest};
use crate::domain::order::{Order, OrderStatus, PaymentMethod, ShippingInfo};
use crate::domain::principal::Principal;
use crate::errors::AppError;
use crate::handlers::auth::MaybePrincipal;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutOrderRequest {
    pub items: Vec<CheckoutItemRequest>,
    /// `bank` or `cod`.
    pub payment_method: Option<String>,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    pub customer_email: Option<String>,
    /// Applied in the order given.
    #[serde(default)]
    pub voucher_ids: Vec<Uuid>,
}

impl CheckoutOrderRequest {
    fn into_command(self) -> Result<CheckoutRequest, AppError> {
        let payment_method = self
            .payment_method
            .as_deref()
            .map(str::parse::<PaymentMethod>)
            .transpose()?;
        Ok(CheckoutRequest {
            lines: self
                .items
                .into_iter()
                .map(|i| CheckoutLine {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
            payment_method,
            shipping: ShippingInfo {
                shipping_address: self.shipping_address,
                customer_name: self.customer_name,
                customer_phone: self.customer_phone,
                customer_email: self.customer_email.filter(|e| !e.trim().is_empty()),
            },
            voucher_ids: self.voucher_ids,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub order_code: String,
    pub order_item_ids: Vec<Uuid>,
    /// Minor currency units.
    pub total_amount: i64,
    pub status: String,
    pub payment_method: String,
    pub shipping_address: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub voucher_usage_id: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        OrderResponse {
            id: o.id,
            user_id: o.user_id,
            order_code: o.order_code,
            order_item_ids: o.order_item_ids,
            total_amount: o.total_amount,
            status: o.status.as_str().to_string(),
            payment_method: o.payment_method.as_str().to_string(),
            shipping_address: o.shipping.shipping_address,
            customer_name: o.shipping.customer_name,
            customer_phone: o.shipping.customer_phone,
            customer_email: o.shipping.customer_email,
            notes: o.notes,
            voucher_usage_id: o.voucher_usage_id,
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: OrderResponse,
    pub checkout_url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders/checkout
///
/// Reserves stock for every line, prices the order with the given vouchers,
/// stores it as `pending` and returns a payment link. Nothing stays reserved
/// or stored if any step fails.
#[utoipa::path(
    post,
    path = "/orders/checkout",
    request_body = CheckoutOrderRequest,
    responses(
        (status = 201, description = "Order placed, payment link created", body = CheckoutResponse),
        (status = 400, description = "Invalid checkout request"),
        (status = 401, description = "Invalid access token"),
        (status = 404, description = "Unknown product"),
        (status = 409, description = "Insufficient stock or inactive product"),
        (status = 502, description = "Payment gateway failure"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn checkout(
    state: web::Data<AppState>,
    principal: MaybePrincipal,
    body: web::Json<CheckoutOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner().into_command()?;
    let user_id = principal.0.map(|p| p.id);
    let service = state.checkout.clone();

    let outcome = web::block(move || service.checkout(user_id, request))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(CheckoutResponse {
        order: outcome.order.into(),
        checkout_url: outcome.checkout_url,
    }))
}

/// GET /orders
///
/// Newest first. Administrators see every order, customers only their own.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 401, description = "Missing or invalid access token"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    principal: Principal,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let service = state.orders.clone();

    let result = web::block(move || service.list_orders(&principal, page, limit))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 401, description = "Missing or invalid access token"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let service = state.orders.clone();

    let order = web::block(move || service.get_order(&principal, order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PATCH /orders/{id}/status
///
/// Admin only. Re-sending the current status is a no-op.
#[utoipa::path(
    patch,
    path = "/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn update_status(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let next: OrderStatus = body.status.parse()?;
    let service = state.orders.clone();

    let order = web::block(move || service.update_status(&principal, order_id, next))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
