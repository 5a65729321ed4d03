#![allow(dead_code)]

use async_trait::async_trait;
use dormpay_core::events::OutcomeState;
use dormpay_core::gateway::{GatewayError, PaymentGateway};
use dormpay_sdk::objects::{
    CreatePaymentRequest, CreatePaymentResponse, PaymentKind, PaymentStatus, StatusSnapshot,
};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

/// Long enough that, under the paused test clock, every pending timer in
/// the system has fired before the deadline.
const SILENCE_WINDOW: Duration = Duration::from_secs(3600);

/// Route processor logs through the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Scripted gateway ───────────────────────────────────────────────────────

/// One scripted reply for the status endpoint.
#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Pending,
    Success,
    Failed,
    /// Transport failure; counts toward the consecutive-error threshold.
    NetworkError,
    /// Park until [`MockGateway::release`] is called, then report success.
    /// Used to pin a call in flight while the test cancels the session.
    Stall,
}

/// Scripted reply for the create endpoint.
pub enum CreateScript {
    Ok(CreatePaymentResponse),
    ProviderError { code: u16, message: String },
    NetworkError,
}

/// In-memory [`PaymentGateway`] with scripted replies and call accounting.
pub struct MockGateway {
    create_reply: CreateScript,
    statuses: Mutex<VecDeque<Scripted>>,
    /// Replayed forever once the scripted queue is empty.
    fallback: Scripted,
    confirm_reply: Mutex<Option<PaymentStatus>>,
    /// Simulated backend latency per status call.
    latency: Duration,
    status_calls: AtomicUsize,
    in_flight: AtomicUsize,
    overlapped: AtomicBool,
    stall_entered: Notify,
    stall_gate: Notify,
}

impl MockGateway {
    pub fn new(create_reply: CreateScript) -> Self {
        Self {
            create_reply,
            statuses: Mutex::new(VecDeque::new()),
            fallback: Scripted::Pending,
            confirm_reply: Mutex::new(None),
            latency: Duration::ZERO,
            status_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            overlapped: AtomicBool::new(false),
            stall_entered: Notify::new(),
            stall_gate: Notify::new(),
        }
    }

    pub fn with_statuses(self, statuses: impl IntoIterator<Item = Scripted>) -> Self {
        self.statuses.lock().unwrap().extend(statuses);
        self
    }

    pub fn with_fallback(mut self, fallback: Scripted) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_confirm(self, status: PaymentStatus) -> Self {
        *self.confirm_reply.lock().unwrap() = Some(status);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of `get_status` calls issued so far.
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Whether two status calls were ever in flight at the same time.
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    /// Resolves once a `Stall`-scripted status call has entered the gateway.
    pub async fn stalled(&self) {
        self.stall_entered.notified().await;
    }

    /// Release a parked `Stall` call.
    pub fn release(&self) {
        self.stall_gate.notify_one();
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create(
        &self,
        _request: &CreatePaymentRequest,
    ) -> Result<CreatePaymentResponse, GatewayError> {
        match &self.create_reply {
            CreateScript::Ok(response) => Ok(response.clone()),
            CreateScript::ProviderError { code, message } => Err(GatewayError::Provider {
                code: *code,
                message: message.clone(),
            }),
            CreateScript::NetworkError => {
                Err(GatewayError::Network("connection refused".to_string()))
            }
        }
    }

    async fn get_status(&self, order_id: &str) -> Result<StatusSnapshot, GatewayError> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) != 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;
        tokio::task::yield_now().await;

        let script = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);

        let result = match script {
            Scripted::Pending => Ok(snapshot(order_id, PaymentStatus::Pending)),
            Scripted::Success => Ok(snapshot(order_id, PaymentStatus::Success)),
            Scripted::Failed => Ok(snapshot(order_id, PaymentStatus::Failed)),
            Scripted::NetworkError => Err(GatewayError::Network("connection reset".to_string())),
            Scripted::Stall => {
                self.stall_entered.notify_one();
                self.stall_gate.notified().await;
                Ok(snapshot(order_id, PaymentStatus::Success))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn confirm(&self, order_id: &str) -> Result<StatusSnapshot, GatewayError> {
        match *self.confirm_reply.lock().unwrap() {
            Some(status) => Ok(snapshot(order_id, status)),
            None => Err(GatewayError::Provider {
                code: 404,
                message: "confirm not available".to_string(),
            }),
        }
    }
}

// ── Builders ───────────────────────────────────────────────────────────────

pub fn snapshot(order_id: &str, status: PaymentStatus) -> StatusSnapshot {
    StatusSnapshot {
        order_id: order_id.into(),
        status,
    }
}

/// A `PENDING` create response carrying a QR payload (polling provider).
pub fn created_with_qr(order_id: &str, qr: &str) -> CreatePaymentResponse {
    CreatePaymentResponse {
        order_id: order_id.into(),
        status: PaymentStatus::Pending,
        amount: Some(Decimal::new(45_000, 0)),
        payment_url: None,
        qr_code: Some(qr.to_string()),
    }
}

/// A `PENDING` create response carrying a checkout URL (redirect provider).
pub fn created_with_checkout_url(order_id: &str, url: &str) -> CreatePaymentResponse {
    CreatePaymentResponse {
        order_id: order_id.into(),
        status: PaymentStatus::Pending,
        amount: Some(Decimal::new(45_000, 0)),
        payment_url: Some(url.to_string()),
        qr_code: None,
    }
}

/// A create response with a terminal status and no completion medium.
pub fn created_terminal(order_id: &str, status: PaymentStatus) -> CreatePaymentResponse {
    CreatePaymentResponse {
        order_id: order_id.into(),
        status,
        amount: Some(Decimal::new(45_000, 0)),
        payment_url: None,
        qr_code: None,
    }
}

pub fn order_request(order_info: &str) -> CreatePaymentRequest {
    CreatePaymentRequest {
        kind: PaymentKind::Polling,
        order_id: None,
        amount: Decimal::new(45_000, 0),
        order_info: order_info.to_string(),
        user_id: Some("u-117".into()),
    }
}

// ── Stream helpers ─────────────────────────────────────────────────────────

pub async fn next_state(states: &mut ReceiverStream<OutcomeState>) -> OutcomeState {
    tokio::time::timeout(SILENCE_WINDOW, states.next())
        .await
        .expect("timed out waiting for a state")
        .expect("outcome stream closed")
}

/// Drain every state the session will ever emit from here on.
///
/// Ends once the stream stays silent for the full window; under the paused
/// clock that means every timer-driven emission has had its chance.
pub async fn collect_until_silent(states: &mut ReceiverStream<OutcomeState>) -> Vec<OutcomeState> {
    let mut collected = Vec::new();
    while let Ok(Some(state)) = tokio::time::timeout(SILENCE_WINDOW, states.next()).await {
        collected.push(state);
    }
    collected
}

/// Assert the stream emits nothing further (monotonicity after a terminal
/// state, or inertness after cancellation).
pub async fn assert_silent(states: &mut ReceiverStream<OutcomeState>) {
    let leftover = collect_until_silent(states).await;
    assert!(leftover.is_empty(), "unexpected states: {leftover:?}");
}
