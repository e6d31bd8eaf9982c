//! PayOS payment-link client.

use std::sync::OnceLock;
use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::domain::errors::DomainError;
use crate::domain::ports::{PaymentGateway, PaymentLink, PaymentLinkRequest};

const SUCCESS_CODE: &str = "00";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct PayOsConfig {
    pub api_url: String,
    pub client_id: String,
    pub api_key: String,
    pub checksum_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentBody<'a> {
    order_code: i64,
    amount: i64,
    description: &'a str,
    cancel_url: &'a str,
    return_url: &'a str,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct PayOsResponse {
    code: String,
    #[serde(default)]
    desc: String,
    data: Option<PaymentData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentData {
    checkout_url: String,
}

/// HMAC-SHA256 over the alphabetically ordered `key=value` pairs PayOS signs,
/// hex encoded.
pub fn sign(checksum_key: &str, request: &PaymentLinkRequest) -> Result<String, DomainError> {
    let data = format!(
        "amount={}&cancelUrl={}&description={}&orderCode={}&returnUrl={}",
        request.amount,
        request.cancel_url,
        request.description,
        request.order_code,
        request.return_url
    );
    let mut mac = Hmac::<Sha256>::new_from_slice(checksum_key.as_bytes())
        .map_err(|_| DomainError::PaymentGateway("invalid checksum key".to_string()))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub struct PayOsClient {
    config: PayOsConfig,
    // Built on first use: a blocking client must not be created on an async
    // runtime thread.
    http: OnceLock<reqwest::blocking::Client>,
}

impl PayOsClient {
    pub fn new(config: PayOsConfig) -> Self {
        Self {
            config,
            http: OnceLock::new(),
        }
    }

    fn http(&self) -> Result<&reqwest::blocking::Client, DomainError> {
        if let Some(client) = self.http.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DomainError::PaymentGateway(e.to_string()))?;
        Ok(self.http.get_or_init(|| client))
    }
}

impl PaymentGateway for PayOsClient {
    fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<PaymentLink, DomainError> {
        let order_code: i64 = request.order_code.parse().map_err(|_| {
            DomainError::PaymentGateway(format!(
                "order code '{}' is not numeric",
                request.order_code
            ))
        })?;
        let body = CreatePaymentBody {
            order_code,
            amount: request.amount,
            description: &request.description,
            cancel_url: &request.cancel_url,
            return_url: &request.return_url,
            signature: sign(&self.config.checksum_key, request)?,
        };

        let url = format!(
            "{}/v2/payment-requests",
            self.config.api_url.trim_end_matches('/')
        );
        let response: PayOsResponse = self
            .http()?
            .post(url)
            .header("x-client-id", &self.config.client_id)
            .header("x-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| DomainError::PaymentGateway(e.to_string()))?;

        into_link(response)
    }
}

fn into_link(response: PayOsResponse) -> Result<PaymentLink, DomainError> {
    if response.code != SUCCESS_CODE {
        return Err(DomainError::PaymentGateway(format!(
            "code {}: {}",
            response.code, response.desc
        )));
    }
    response
        .data
        .map(|d| PaymentLink {
            checkout_url: d.checkout_url,
        })
        .ok_or_else(|| DomainError::PaymentGateway("response carries no checkout URL".to_string()))
}
