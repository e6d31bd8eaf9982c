use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::application::PaymentCallback;
use crate::AppState;

/// Webhook payload. Only the fields reconciliation needs are modelled.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PayOsWebhook {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub code: Value,
    pub desc: Option<String>,
    pub data: Option<PayOsWebhookData>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayOsWebhookData {
    /// PayOS sends a JSON number; strings are accepted too.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub order_code: Value,
    pub desc: Option<String>,
}

/// Numbers and strings both become their textual form; anything else is absent.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl From<PayOsWebhook> for PaymentCallback {
    fn from(hook: PayOsWebhook) -> Self {
        let (order_code, data_desc) = match hook.data {
            Some(data) => (scalar_text(&data.order_code), data.desc),
            None => (None, None),
        };
        PaymentCallback {
            order_code,
            code: scalar_text(&hook.code).unwrap_or_default(),
            message: hook.desc.or(data_desc),
        }
    }
}

fn acknowledged() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true }))
}

/// POST /payos/callback
///
/// Always answers 200 so the gateway keeps the webhook enabled; anything that
/// goes wrong is logged instead.
#[utoipa::path(
    post,
    path = "/payos/callback",
    request_body = PayOsWebhook,
    responses(
        (status = 200, description = "Callback acknowledged"),
    ),
    tag = "payments"
)]
pub async fn callback(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let hook: PayOsWebhook = match serde_json::from_slice(&body) {
        Ok(hook) => hook,
        Err(e) => {
            log::warn!("Ignoring malformed payment callback: {}", e);
            return acknowledged();
        }
    };
    let callback = PaymentCallback::from(hook);
    let reconciler = state.reconciler.clone();

    match web::block(move || reconciler.handle_callback(callback)).await {
        Ok(outcome) => log::debug!("Payment callback reconciled: {:?}", outcome),
        Err(e) => log::error!("Payment callback worker failed: {}", e),
    }
    acknowledged()
}
