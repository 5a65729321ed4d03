//! Typed HTTP client for the payment backend.
//!
//! Three operations back the confirmation core: create a payment attempt,
//! poll its status, and apply a manual confirmation override. The status
//! endpoint answers `PENDING` as a successful response; only transport
//! failures and non-2xx replies surface as errors.

use reqwest::Client;
use url::Url;

use super::ClientError;
use crate::config::GatewayConfig;
use crate::objects::payment::{CreatePaymentRequest, CreatePaymentResponse, StatusSnapshot};

/// Typed HTTP client for the Dormpay **payment API**.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: Url,
}

impl GatewayClient {
    /// Create a new `GatewayClient` with default HTTP settings.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Create a `GatewayClient` from a [`GatewayConfig`], applying its
    /// per-request timeout.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: config.base_url.clone(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /create-payment` – create a payment attempt with the provider
    /// selected by `request.kind`.
    pub async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<CreatePaymentResponse, ClientError> {
        let url = self.base_url.join("/create-payment")?;

        let resp = self.http.post(url).json(request).send().await?;

        parse_response(resp).await
    }

    /// `GET /status/{order_id}` – poll the current payment status.
    pub async fn get_status(&self, order_id: &str) -> Result<StatusSnapshot, ClientError> {
        let url = self.base_url.join(&format!("/status/{order_id}"))?;

        let resp = self.http.get(url).send().await?;

        parse_response(resp).await
    }

    /// `POST /confirm/{order_id}` – manual/operator confirmation override.
    /// Same response shape as the status endpoint.
    pub async fn confirm(&self, order_id: &str) -> Result<StatusSnapshot, ClientError> {
        let url = self.base_url.join(&format!("/confirm/{order_id}"))?;

        let resp = self.http.post(url).send().await?;

        parse_response(resp).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
