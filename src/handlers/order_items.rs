use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::order::OrderItem;
use crate::domain::principal::Principal;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(i: OrderItem) -> Self {
        OrderItemResponse {
            id: i.id,
            product_id: i.product_id,
            quantity: i.quantity,
            unit_price: i.unit_price,
            total_price: i.total_price,
        }
    }
}

/// PATCH /order-items/{id}
///
/// Admin only. Reserves or releases the quantity difference and recomputes
/// the totals of every order holding the item.
#[utoipa::path(
    patch,
    path = "/order-items/{id}",
    params(
        ("id" = Uuid, Path, description = "Order item UUID"),
    ),
    request_body = UpdateOrderItemRequest,
    responses(
        (status = 200, description = "Quantity updated", body = OrderItemResponse),
        (status = 400, description = "Quantity below 1"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Order item not found"),
        (status = 409, description = "Insufficient stock, or the payment failed"),
    ),
    tag = "order-items"
)]
pub async fn update_order_item(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderItemRequest>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let quantity = body.quantity;
    let service = state.orders.clone();

    let item = web::block(move || service.update_order_item_quantity(&principal, item_id, quantity))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderItemResponse::from(item)))
}

/// DELETE /order-items/{id}
#[utoipa::path(
    delete,
    path = "/order-items/{id}",
    params(
        ("id" = Uuid, Path, description = "Order item UUID"),
    ),
    responses(
        (status = 204, description = "Item deleted and its stock released"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Order item not found"),
        (status = 409, description = "Payment failed; stock already returned"),
    ),
    tag = "order-items"
)]
pub async fn delete_order_item(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let service = state.orders.clone();

    web::block(move || service.delete_order_item(&principal, item_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::NoContent().finish())
}
