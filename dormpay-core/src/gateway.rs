//! Contract between the confirmation core and the payment backend.
//!
//! The core never talks HTTP directly: it consumes this trait, and the SDK's
//! [`GatewayClient`](dormpay_sdk::client::GatewayClient) provides the
//! production implementation. Tests substitute scripted gateways.

use async_trait::async_trait;
use dormpay_sdk::client::{ClientError, GatewayClient};
use dormpay_sdk::objects::{CreatePaymentRequest, CreatePaymentResponse, StatusSnapshot};
use thiserror::Error;

/// Errors surfaced by a [`PaymentGateway`].
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure reaching the payment backend. Transient:
    /// polling tolerates these up to its consecutive-error threshold.
    #[error("network error: {0}")]
    Network(String),

    /// The backend explicitly rejected the call. Never retried
    /// automatically.
    #[error("provider error {code}: {message}")]
    Provider { code: u16, message: String },

    /// The backend answered with a body the core cannot interpret.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<ClientError> for GatewayError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Http(e) => Self::Network(e.to_string()),
            ClientError::Api { status, body } => Self::Provider {
                code: status.as_u16(),
                message: body,
            },
            ClientError::Json(e) => Self::Decode(e.to_string()),
            ClientError::Url(e) => Self::Network(e.to_string()),
        }
    }
}

/// Asynchronous operations the confirmation core needs from the payment
/// backend.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment attempt with the provider selected by
    /// `request.kind`.
    async fn create(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<CreatePaymentResponse, GatewayError>;

    /// Poll the current status of an order.
    ///
    /// Must not fail merely because the status is still `PENDING`.
    async fn get_status(&self, order_id: &str) -> Result<StatusSnapshot, GatewayError>;

    /// Manual/operator confirmation override. Same response shape as
    /// [`get_status`](PaymentGateway::get_status).
    async fn confirm(&self, order_id: &str) -> Result<StatusSnapshot, GatewayError>;
}

#[async_trait]
impl PaymentGateway for GatewayClient {
    async fn create(
        &self,
        request: &CreatePaymentRequest,
    ) -> Result<CreatePaymentResponse, GatewayError> {
        self.create_payment(request).await.map_err(Into::into)
    }

    async fn get_status(&self, order_id: &str) -> Result<StatusSnapshot, GatewayError> {
        GatewayClient::get_status(self, order_id)
            .await
            .map_err(Into::into)
    }

    async fn confirm(&self, order_id: &str) -> Result<StatusSnapshot, GatewayError> {
        GatewayClient::confirm(self, order_id)
            .await
            .map_err(Into::into)
    }
}
