use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which provider integration a payment attempt goes through.
///
/// `Polling` providers hand back a QR/bank-transfer target and are confirmed
/// by repeatedly querying the status endpoint; `Redirect` providers hand back
/// a checkout URL and are confirmed by the embedded browser navigating to a
/// return URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Polling,
    Redirect,
}

/// Provider-side payment status.
///
/// The backend is case-insensitive on the wire; parsing normalizes to
/// uppercase before comparison, and serialization always emits uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    /// Parse a wire status token, ignoring case and surrounding whitespace.
    pub fn parse_wire(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "SUCCESS" => Some(Self::Success),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns `true` if no further status change can occur for this order.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = CompactString::deserialize(deserializer)?;
        Self::parse_wire(&token)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown payment status: {token}")))
    }
}

/// Request payload for creating a new payment attempt.
///
/// `order_id` may be omitted, in which case the backend generates a value
/// unique for the lifetime of its order store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub kind: PaymentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<CompactString>,
    pub amount: Decimal,
    pub order_info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<CompactString>,
}

/// Response returned by the "create payment" endpoint.
///
/// `payment_url`/`qr_code` carry the provider-specific completion medium: a
/// checkout redirect URL for redirect providers, a QR image URL or raw QR
/// payload for polling providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub order_id: CompactString,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
}

/// Response returned by the "status" and "confirm" endpoints.
///
/// Each snapshot supersedes the previous one for the same order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub order_id: CompactString,
    pub status: PaymentStatus,
}
