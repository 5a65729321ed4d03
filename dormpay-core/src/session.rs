//! PaymentSession aggregate.
//!
//! A session binds one polling coordinator or one redirect detector to a
//! single payment attempt and publishes a monotonic stream of
//! [`OutcomeState`] values. One session, one order id, one terminal value;
//! a retry after a failed attempt is a fresh session.
//!
//! The session is the single writer of its outcome stream: every emission
//! goes through a publisher that refuses to publish after a terminal state
//! or after cancellation, and collapses consecutive duplicates. This is what
//! lets consumers assert ordering and terminality instead of inferring them
//! from UI recomposition timing.

use crate::events::{
    NavigationEventReceiver, OutcomeState, OutcomeStateReceiver, OutcomeStateSender,
    PaymentOutcome, SurfaceCommandSender, outcome_state_channel, status_update_channel,
};
use crate::gateway::PaymentGateway;
use crate::processors::{
    DetectionResult, PollResult, PollingCoordinator, PollingPolicy, RedirectOutcome,
    RedirectOutcomeDetector, ReturnUrlPattern,
};
use crate::shutdown::{cancellation_channel, cancelled};
use compact_str::CompactString;
use dormpay_sdk::objects::{
    CreatePaymentRequest, CreatePaymentResponse, PaymentKind, PaymentStatus,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Knobs for both confirmation paths.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub polling: PollingPolicy,
    pub redirect: ReturnUrlPattern,
}

/// Errors returned by [`PaymentSession`] operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An attempt has already been attached to this session. One session
    /// carries exactly one attempt; retry with a fresh session.
    #[error("an attempt is already attached to this session")]
    AlreadyAttached,

    /// No payment attempt has produced an order id yet.
    #[error("no payment attempt is active")]
    NoActiveAttempt,

    /// The manual confirmation call was rejected by the backend.
    #[error(transparent)]
    Gateway(#[from] crate::gateway::GatewayError),
}

// ---------------------------------------------------------------------------
// State publisher
// ---------------------------------------------------------------------------

/// Single writer for a session's outcome stream.
///
/// Publishing is refused once a terminal state has gone out or the session
/// has been revoked (cancelled/dropped); consecutive duplicate states
/// collapse so consumers see each distinct state exactly once.
struct StatePublisher {
    tx: OutcomeStateSender,
    last: Mutex<OutcomeState>,
    revoked: AtomicBool,
}

impl StatePublisher {
    fn new(tx: OutcomeStateSender) -> Self {
        Self {
            tx,
            last: Mutex::new(OutcomeState::Idle),
            revoked: AtomicBool::new(false),
        }
    }

    /// Revoke synchronously: no publish that starts after this call can
    /// emit anything.
    fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    async fn publish(&self, state: OutcomeState) {
        if self.revoked.load(Ordering::SeqCst) {
            return;
        }

        let mut last = self.last.lock().await;
        if last.is_terminal() || *last == state {
            return;
        }
        // Re-check under the lock so a cancellation that raced the first
        // check is still a hard cut.
        if self.revoked.load(Ordering::SeqCst) {
            return;
        }

        *last = state.clone();
        if self.tx.send(state).await.is_err() {
            debug!("outcome stream receiver dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentSession
// ---------------------------------------------------------------------------

/// Hands the embedded-browser event streams to a pending redirect attempt.
///
/// Returned by [`PaymentSession::start_redirect`]; the UI calls
/// [`bind`](RedirectBinding::bind) once the browser surface pointed at the
/// checkout URL is ready. Dropping the binding without calling `bind` is
/// treated as the user never opening the browser.
pub struct RedirectBinding {
    ready_tx: oneshot::Sender<SurfaceStreams>,
}

struct SurfaceStreams {
    events: NavigationEventReceiver,
    commands: Option<SurfaceCommandSender>,
}

impl RedirectBinding {
    pub fn bind(
        self,
        events: NavigationEventReceiver,
        commands: Option<SurfaceCommandSender>,
    ) {
        let _ = self.ready_tx.send(SurfaceStreams { events, commands });
    }
}

/// Owns the lifecycle of one payment attempt and its outcome stream.
pub struct PaymentSession {
    gateway: Arc<dyn PaymentGateway>,
    config: SessionConfig,
    publisher: Arc<StatePublisher>,
    outcome_rx: Option<OutcomeStateReceiver>,
    shutdown_tx: watch::Sender<bool>,
    attempt: Option<JoinHandle<()>>,
    order_id: Arc<Mutex<Option<CompactString>>>,
}

impl PaymentSession {
    pub fn new(gateway: Arc<dyn PaymentGateway>, config: SessionConfig) -> Self {
        let (state_tx, state_rx) = outcome_state_channel();
        let (shutdown_tx, _) = cancellation_channel();

        Self {
            gateway,
            config,
            publisher: Arc::new(StatePublisher::new(state_tx)),
            outcome_rx: Some(state_rx),
            shutdown_tx,
            attempt: None,
            order_id: Arc::new(Mutex::new(None)),
        }
    }

    /// The stream of [`OutcomeState`] values, the only way a consumer
    /// observes progress. The first call takes the stream; later calls
    /// return `None`.
    pub fn outcomes(&mut self) -> Option<ReceiverStream<OutcomeState>> {
        self.outcome_rx.take().map(ReceiverStream::new)
    }

    /// Start a polling-provider attempt (QR/bank transfer).
    ///
    /// Spawns the attempt task: create the payment, surface the QR medium
    /// via `AwaitingCompletion`, then poll until a terminal state. A create
    /// response that already carries a terminal status short-circuits
    /// straight to `Outcome`.
    pub fn start_polling(&mut self, request: CreatePaymentRequest) -> Result<(), SessionError> {
        self.ensure_unattached()?;

        let mut request = request;
        request.kind = PaymentKind::Polling;
        ensure_order_id(&mut request);

        let task = run_polling_attempt(
            Arc::clone(&self.gateway),
            self.config.polling,
            request,
            Arc::clone(&self.publisher),
            Arc::clone(&self.order_id),
            self.shutdown_tx.subscribe(),
        );
        self.attempt = Some(tokio::spawn(task));
        Ok(())
    }

    /// Start a redirect-provider attempt (hosted checkout page).
    ///
    /// The checkout URL is surfaced via `AwaitingCompletion`; the returned
    /// [`RedirectBinding`] is how the UI reports the browser surface ready,
    /// after which the navigation stream is watched for a return URL.
    pub fn start_redirect(
        &mut self,
        request: CreatePaymentRequest,
    ) -> Result<RedirectBinding, SessionError> {
        self.ensure_unattached()?;

        let mut request = request;
        request.kind = PaymentKind::Redirect;
        ensure_order_id(&mut request);

        let (ready_tx, ready_rx) = oneshot::channel();
        let task = run_redirect_attempt(
            Arc::clone(&self.gateway),
            self.config.redirect.clone(),
            request,
            Arc::clone(&self.publisher),
            Arc::clone(&self.order_id),
            ready_rx,
            self.shutdown_tx.subscribe(),
        );
        self.attempt = Some(tokio::spawn(task));
        Ok(RedirectBinding { ready_tx })
    }

    /// Manual confirmation override ("I have transferred the money").
    ///
    /// Stops the attached coordinator first (the override's status call
    /// must not overlap a poll tick), then applies the returned snapshot.
    /// A `PENDING` reply resolves nothing; the caller may confirm again or
    /// cancel. After [`cancel`](PaymentSession::cancel) the outcome stream
    /// is closed for good and the reply is only returned, not published.
    pub async fn confirm(&self) -> Result<PaymentStatus, SessionError> {
        let order_id = self
            .order_id
            .lock()
            .await
            .clone()
            .ok_or(SessionError::NoActiveAttempt)?;

        let _ = self.shutdown_tx.send(true);

        let snapshot = self.gateway.confirm(&order_id).await?;
        info!(order_id = %order_id, status = %snapshot.status, "manual confirmation applied");

        match snapshot.status {
            PaymentStatus::Success => {
                self.publisher
                    .publish(OutcomeState::Outcome(PaymentOutcome::Succeeded))
                    .await;
            }
            PaymentStatus::Failed => {
                self.publisher
                    .publish(OutcomeState::Outcome(PaymentOutcome::Failed))
                    .await;
            }
            PaymentStatus::Pending => {}
        }

        Ok(snapshot.status)
    }

    /// Stop whichever coordinator/detector is attached.
    ///
    /// Idempotent and safe after a terminal state. No state emission can
    /// start after this returns: the publisher is revoked before the
    /// shutdown signal goes out, so even a poll tick already in flight
    /// cannot mutate the stream.
    pub fn cancel(&self) {
        self.publisher.revoke();
        let _ = self.shutdown_tx.send(true);
    }

    fn ensure_unattached(&self) -> Result<(), SessionError> {
        if self.attempt.is_some() {
            return Err(SessionError::AlreadyAttached);
        }
        Ok(())
    }
}

impl Drop for PaymentSession {
    /// Destroying the hosting screen must stop the attached task
    /// synchronously: a leaked poll loop would keep calling a meaningless
    /// backend, and a leaked navigation listener would retain a dead
    /// browser surface.
    fn drop(&mut self) {
        self.publisher.revoke();
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.attempt.take() {
            task.abort();
        }
    }
}

fn ensure_order_id(request: &mut CreatePaymentRequest) {
    if request.order_id.is_none() {
        request.order_id = Some(CompactString::from(Uuid::new_v4().to_string()));
    }
}

// ---------------------------------------------------------------------------
// Attempt tasks
// ---------------------------------------------------------------------------

/// Shared preamble of both attempt kinds: publish `Requesting`, run the
/// create call raced against cancellation, record the order id, and
/// short-circuit if the provider already knows the terminal answer.
///
/// Returns the created response only when the attempt should continue into
/// its watch phase.
async fn create_attempt(
    gateway: &Arc<dyn PaymentGateway>,
    request: &CreatePaymentRequest,
    publisher: &Arc<StatePublisher>,
    order_slot: &Arc<Mutex<Option<CompactString>>>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Option<CreatePaymentResponse> {
    publisher.publish(OutcomeState::Requesting).await;

    let created = tokio::select! {
        biased;

        _ = cancelled(shutdown_rx) => {
            debug!("attempt cancelled before the create call resolved");
            return None;
        }

        result = gateway.create(request) => result,
    };

    let response = match created {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "create-payment failed");
            publisher.publish(OutcomeState::Error(e.to_string())).await;
            return None;
        }
    };

    *order_slot.lock().await = Some(response.order_id.clone());

    match response.status {
        PaymentStatus::Success => {
            info!(order_id = %response.order_id, "provider reported success at creation");
            publisher
                .publish(OutcomeState::Outcome(PaymentOutcome::Succeeded))
                .await;
            None
        }
        PaymentStatus::Failed => {
            info!(order_id = %response.order_id, "provider reported failure at creation");
            publisher
                .publish(OutcomeState::Outcome(PaymentOutcome::Failed))
                .await;
            None
        }
        PaymentStatus::Pending => Some(response),
    }
}

async fn run_polling_attempt(
    gateway: Arc<dyn PaymentGateway>,
    policy: PollingPolicy,
    request: CreatePaymentRequest,
    publisher: Arc<StatePublisher>,
    order_slot: Arc<Mutex<Option<CompactString>>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let Some(response) =
        create_attempt(&gateway, &request, &publisher, &order_slot, &mut shutdown_rx).await
    else {
        return;
    };

    if response.qr_code.is_none() && response.payment_url.is_none() {
        warn!(order_id = %response.order_id, "pending polling payment without a QR medium");
        publisher
            .publish(OutcomeState::Error(
                "provider returned no completion medium".to_string(),
            ))
            .await;
        return;
    }

    publisher
        .publish(OutcomeState::AwaitingCompletion {
            payment: response.clone(),
            polled: None,
        })
        .await;

    let (update_tx, mut update_rx) = status_update_channel();
    let coordinator = PollingCoordinator::new(
        Arc::clone(&gateway),
        response.order_id.clone(),
        policy,
        update_tx,
        shutdown_rx,
    );

    // Forward PENDING snapshots as AwaitingCompletion updates while the
    // coordinator runs. The forwarder drains to completion (the sender is
    // dropped with the coordinator) before the terminal state goes out, so
    // snapshots are applied strictly in completion order.
    let forwarder = {
        let publisher = Arc::clone(&publisher);
        let payment = response.clone();
        tokio::spawn(async move {
            while let Some(snapshot) = update_rx.recv().await {
                publisher
                    .publish(OutcomeState::AwaitingCompletion {
                        payment: payment.clone(),
                        polled: Some(snapshot),
                    })
                    .await;
            }
        })
    };

    let result = coordinator.run().await;
    let _ = forwarder.await;

    let terminal = match result {
        PollResult::Succeeded(_) => Some(OutcomeState::Outcome(PaymentOutcome::Succeeded)),
        PollResult::Failed(_) => Some(OutcomeState::Outcome(PaymentOutcome::Failed)),
        PollResult::TimedOut => Some(OutcomeState::Outcome(PaymentOutcome::TimedOut)),
        PollResult::Aborted { error: Some(e) } => Some(OutcomeState::Error(e.to_string())),
        // Explicit cancellation: the user backed out, no outcome.
        PollResult::Aborted { error: None } => None,
    };

    if let Some(state) = terminal {
        publisher.publish(state).await;
    }
}

async fn run_redirect_attempt(
    gateway: Arc<dyn PaymentGateway>,
    pattern: ReturnUrlPattern,
    request: CreatePaymentRequest,
    publisher: Arc<StatePublisher>,
    order_slot: Arc<Mutex<Option<CompactString>>>,
    ready_rx: oneshot::Receiver<SurfaceStreams>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let Some(response) =
        create_attempt(&gateway, &request, &publisher, &order_slot, &mut shutdown_rx).await
    else {
        return;
    };

    if response.payment_url.is_none() {
        warn!(order_id = %response.order_id, "pending redirect payment without a checkout url");
        publisher
            .publish(OutcomeState::Error(
                "provider returned no checkout url".to_string(),
            ))
            .await;
        return;
    }

    publisher
        .publish(OutcomeState::AwaitingCompletion {
            payment: response.clone(),
            polled: None,
        })
        .await;

    // Wait for the UI to report the browser surface ready.
    let streams = tokio::select! {
        biased;

        _ = cancelled(&mut shutdown_rx) => return,

        ready = ready_rx => match ready {
            Ok(streams) => streams,
            Err(_) => {
                debug!(
                    order_id = %response.order_id,
                    "redirect binding dropped before the surface was ready"
                );
                return;
            }
        },
    };

    let detector =
        RedirectOutcomeDetector::new(pattern, streams.events, streams.commands, shutdown_rx);
    let result = detector.run().await;

    let terminal = match result {
        DetectionResult::Classified {
            outcome: RedirectOutcome::Succeeded,
            ..
        } => Some(OutcomeState::Outcome(PaymentOutcome::Succeeded)),
        DetectionResult::Classified {
            outcome: RedirectOutcome::Failed,
            ..
        } => Some(OutcomeState::Outcome(PaymentOutcome::Failed)),
        // User backed out before any match: no outcome.
        DetectionResult::Dismissed => None,
        DetectionResult::Disconnected => {
            Some(OutcomeState::Outcome(PaymentOutcome::Unresolvable))
        }
        DetectionResult::Cancelled => None,
    };

    if let Some(state) = terminal {
        publisher.publish(state).await;
    }
}
