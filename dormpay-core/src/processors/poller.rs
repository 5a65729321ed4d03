//! PollingCoordinator processor.
//!
//! The PollingCoordinator is responsible for:
//! - Driving the fixed-interval status-poll loop for one payment attempt
//! - Serializing ticks (the next poll is not scheduled until the previous
//!   response has been applied)
//! - Applying the consecutive-error threshold and the global attempt cap
//! - Emitting `PENDING` snapshots as progress updates
//! - Stopping immediately, discarding any in-flight call, on cancellation
//!
//! The error threshold and attempt cap exist because the provider's status
//! endpoint can be transiently unreachable without the underlying payment
//! having failed: infinite retry would hang the caller indefinitely, and
//! zero tolerance would abort on a single blip.

use crate::events::StatusUpdateSender;
use crate::gateway::{GatewayError, PaymentGateway};
use crate::shutdown::cancelled;
use compact_str::CompactString;
use dormpay_sdk::objects::{PaymentStatus, StatusSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Timing and tolerance knobs for one polling attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    /// Fixed delay between status polls.
    pub interval: Duration,
    /// Consecutive failed polls tolerated before the attempt is aborted.
    pub error_threshold: u32,
    /// Total polls allowed before the attempt is declared timed out.
    pub attempt_cap: u32,
}

impl PollingPolicy {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
    pub const DEFAULT_ERROR_THRESHOLD: u32 = 3;
    /// 60 polls at 5 seconds bound an attempt to five minutes.
    pub const DEFAULT_ATTEMPT_CAP: u32 = 60;
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            error_threshold: Self::DEFAULT_ERROR_THRESHOLD,
            attempt_cap: Self::DEFAULT_ATTEMPT_CAP,
        }
    }
}

/// Terminal state of one polling attempt. No transitions out.
#[derive(Debug)]
pub enum PollResult {
    /// The provider reported `SUCCESS`.
    Succeeded(StatusSnapshot),
    /// The provider reported `FAILED`.
    Failed(StatusSnapshot),
    /// The attempt cap elapsed with no terminal status. The true outcome
    /// is unknown, not negative.
    TimedOut,
    /// The attempt stopped early: with the error that crossed the
    /// threshold, or without one on explicit cancellation.
    Aborted { error: Option<GatewayError> },
}

/// Drives status polling for a single in-flight payment attempt.
pub struct PollingCoordinator {
    gateway: Arc<dyn PaymentGateway>,
    order_id: CompactString,
    policy: PollingPolicy,
    update_tx: StatusUpdateSender,
    shutdown_rx: watch::Receiver<bool>,
}

impl PollingCoordinator {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        order_id: CompactString,
        policy: PollingPolicy,
        update_tx: StatusUpdateSender,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            gateway,
            order_id,
            policy,
            update_tx,
            shutdown_rx,
        }
    }

    /// Run until a terminal state is reached.
    ///
    /// Each iteration sleeps one full interval after the previous response
    /// was applied, so a slow backend stretches the schedule instead of
    /// piling up overlapping calls. A cancellation that arrives while a
    /// call is in flight discards that call's result.
    pub async fn run(mut self) -> PollResult {
        info!(order_id = %self.order_id, "PollingCoordinator started");

        let mut attempts: u32 = 0;
        let mut consecutive_errors: u32 = 0;

        loop {
            tokio::select! {
                biased;

                _ = cancelled(&mut self.shutdown_rx) => {
                    info!(order_id = %self.order_id, "PollingCoordinator cancelled");
                    return PollResult::Aborted { error: None };
                }

                _ = tokio::time::sleep(self.policy.interval) => {}
            }

            // The attempt counter advances on every tick, errors included.
            attempts += 1;

            let result = tokio::select! {
                biased;

                _ = cancelled(&mut self.shutdown_rx) => {
                    info!(
                        order_id = %self.order_id,
                        attempt = attempts,
                        "PollingCoordinator cancelled mid-poll, result discarded"
                    );
                    return PollResult::Aborted { error: None };
                }

                result = self.gateway.get_status(&self.order_id) => result,
            };

            match result {
                Ok(snapshot) => {
                    consecutive_errors = 0;
                    debug!(
                        order_id = %self.order_id,
                        status = %snapshot.status,
                        attempt = attempts,
                        "poll tick"
                    );

                    match snapshot.status {
                        PaymentStatus::Success => {
                            info!(order_id = %self.order_id, attempts, "payment confirmed");
                            return PollResult::Succeeded(snapshot);
                        }
                        PaymentStatus::Failed => {
                            info!(order_id = %self.order_id, attempts, "payment failed");
                            return PollResult::Failed(snapshot);
                        }
                        PaymentStatus::Pending => {
                            if self.update_tx.send(snapshot).await.is_err() {
                                warn!(
                                    order_id = %self.order_id,
                                    "status update receiver dropped, stopping"
                                );
                                return PollResult::Aborted { error: None };
                            }
                        }
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        order_id = %self.order_id,
                        error = %e,
                        consecutive_errors,
                        attempt = attempts,
                        "poll tick failed"
                    );

                    if consecutive_errors >= self.policy.error_threshold {
                        return PollResult::Aborted { error: Some(e) };
                    }
                }
            }

            if attempts >= self.policy.attempt_cap {
                info!(
                    order_id = %self.order_id,
                    attempts,
                    "PollingCoordinator reached attempt cap"
                );
                return PollResult::TimedOut;
            }
        }
    }
}
