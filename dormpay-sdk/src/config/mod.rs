//! Client-side configuration for the payment backend connection.

use std::time::Duration;
use url::Url;

/// Default per-request timeout applied by [`GatewayClient::from_config`].
///
/// [`GatewayClient::from_config`]: crate::client::GatewayClient::from_config
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the payment backend.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Root URL of the payment backend.
    pub base_url: Url,
    /// Per-request timeout for every backend call.
    pub request_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
