pub mod auth;
pub mod order_items;
pub mod orders;
pub mod payos;

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        orders::checkout,
        orders::list_orders,
        orders::get_order,
        orders::update_status,
        order_items::update_order_item,
        order_items::delete_order_item,
        payos::callback,
    ),
    components(schemas(
        orders::CheckoutItemRequest,
        orders::CheckoutOrderRequest,
        orders::CheckoutResponse,
        orders::OrderResponse,
        orders::ListOrdersResponse,
        orders::UpdateStatusRequest,
        order_items::UpdateOrderItemRequest,
        order_items::OrderItemResponse,
        payos::PayOsWebhook,
        payos::PayOsWebhookData,
    )),
    tags(
        (name = "orders", description = "Checkout and order lifecycle"),
        (name = "order-items", description = "Admin adjustments to order lines"),
        (name = "payments", description = "Payment gateway callbacks"),
    )
)]
pub struct ApiDoc;
