//! RedirectOutcomeDetector processor.
//!
//! The RedirectOutcomeDetector is responsible for:
//! - Consuming navigation events from the primary embedded-browser surface
//!   and from every pop-up context the checkout page spawns
//! - Classifying the first navigation that hits a configured return URL
//! - Requesting closure of a pop-up context that produced the match
//! - Distinguishing user dismissal from abnormal stream teardown
//!
//! Checkout pages are allowed to open an arbitrary number of pop-ups (bank
//! 3-D-Secure flows commonly do); the binding clones one event sender into
//! each, so the detector sees a single merged stream. Only the first
//! matching navigation across all surfaces counts.

use crate::events::{
    NavigationEvent, NavigationEventReceiver, SurfaceCommand, SurfaceCommandSender, SurfaceId,
};
use crate::shutdown::cancelled;
use smallvec::SmallVec;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

/// Return-URL recognition settings. Defaults follow the VNPay contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnUrlPattern {
    /// Path markers that identify a return navigation.
    pub return_markers: Vec<String>,
    /// Query parameter carrying the provider response code.
    pub response_code_param: String,
    /// Query parameter carrying the transaction status.
    pub transaction_status_param: String,
    /// Value of either parameter that denotes success.
    pub success_code: String,
}

impl Default for ReturnUrlPattern {
    fn default() -> Self {
        Self {
            return_markers: vec!["/vnpay/return".to_string(), "/payment/return".to_string()],
            response_code_param: "vnp_ResponseCode".to_string(),
            transaction_status_param: "vnp_TransactionStatus".to_string(),
            success_code: "00".to_string(),
        }
    }
}

impl ReturnUrlPattern {
    fn matches_path(&self, path: &str) -> bool {
        self.return_markers.iter().any(|m| path.contains(m.as_str()))
    }

    fn is_success_param(&self, key: &str, value: &str) -> bool {
        (key == self.response_code_param || key == self.transaction_status_param)
            && value == self.success_code
    }
}

/// Classification of a matched return navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOutcome {
    Succeeded,
    Failed,
}

/// How a detection run ended.
#[derive(Debug, PartialEq, Eq)]
pub enum DetectionResult {
    /// A return navigation matched. First match across all surfaces wins.
    Classified {
        outcome: RedirectOutcome,
        surface: SurfaceId,
    },
    /// The primary surface closed before any match: the user backed out.
    /// Not a failure; no outcome is reported.
    Dismissed,
    /// The event stream dropped without a close signal; the outcome can no
    /// longer be determined.
    Disconnected,
    /// Cancellation was signaled.
    Cancelled,
}

/// Observes one merged navigation stream and classifies the first return
/// navigation as a terminal payment outcome.
pub struct RedirectOutcomeDetector {
    pattern: ReturnUrlPattern,
    nav_rx: NavigationEventReceiver,
    command_tx: Option<SurfaceCommandSender>,
    shutdown_rx: watch::Receiver<bool>,
}

impl RedirectOutcomeDetector {
    /// Create a new detector over a navigation stream.
    ///
    /// `command_tx` is optional: a binding that cannot close pop-ups on
    /// request simply omits it.
    pub fn new(
        pattern: ReturnUrlPattern,
        nav_rx: NavigationEventReceiver,
        command_tx: Option<SurfaceCommandSender>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            pattern,
            nav_rx,
            command_tx,
            shutdown_rx,
        }
    }

    /// Run until the first match, dismissal, disconnection, or cancellation.
    pub async fn run(mut self) -> DetectionResult {
        info!("RedirectOutcomeDetector started");

        let mut popups: SmallVec<[SurfaceId; 4]> = SmallVec::new();

        loop {
            let event = tokio::select! {
                biased;

                _ = cancelled(&mut self.shutdown_rx) => {
                    info!("RedirectOutcomeDetector cancelled");
                    return DetectionResult::Cancelled;
                }

                event = self.nav_rx.recv() => event,
            };

            let Some(event) = event else {
                warn!("navigation stream dropped without a close signal");
                return DetectionResult::Disconnected;
            };

            match event {
                NavigationEvent::PopupOpened { opener, surface } => {
                    debug!(%opener, %surface, "checkout page opened a pop-up context");
                    popups.push(surface);
                }

                NavigationEvent::SurfaceClosed { surface } => {
                    if surface.is_primary() {
                        info!("primary surface closed before any match");
                        return DetectionResult::Dismissed;
                    }
                    popups.retain(|s| *s != surface);
                }

                NavigationEvent::WillNavigate { surface, url }
                | NavigationEvent::DidFinishLoad { surface, url } => {
                    let Some(outcome) = classify_return_url(&url, &self.pattern) else {
                        continue;
                    };

                    info!(%surface, ?outcome, url = %url, "return navigation matched");

                    if !surface.is_primary() {
                        if let Some(tx) = &self.command_tx {
                            // Best effort: the binding may already be gone.
                            let _ = tx.send(SurfaceCommand::Close(surface)).await;
                        }
                    }

                    return DetectionResult::Classified { outcome, surface };
                }
            }
        }
    }
}

/// Classify `raw` against the return-URL contract.
///
/// Returns `None` when the URL is not a return navigation at all, and the
/// success/failure classification when it is. A return URL whose query
/// cannot be parsed classifies as `Failed`; classification never errors.
pub fn classify_return_url(raw: &str, pattern: &ReturnUrlPattern) -> Option<RedirectOutcome> {
    match Url::parse(raw) {
        Ok(url) => {
            if !pattern.matches_path(url.path()) {
                return None;
            }
            let success = url
                .query_pairs()
                .any(|(key, value)| pattern.is_success_param(&key, &value));
            Some(classified(success))
        }
        Err(_) => {
            // Embedded browsers also report relative and otherwise
            // non-absolute URLs; salvage the path and query by hand.
            let (path, query) = match raw.split_once('?') {
                Some((path, query)) => (path, query),
                None => (raw, ""),
            };
            if !pattern.matches_path(path) {
                return None;
            }
            let success = query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .any(|(key, value)| {
                    urlencoding::decode(value)
                        .map(|value| pattern.is_success_param(key, &value))
                        .unwrap_or(false)
                });
            Some(classified(success))
        }
    }
}

fn classified(success: bool) -> RedirectOutcome {
    if success {
        RedirectOutcome::Succeeded
    } else {
        RedirectOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> ReturnUrlPattern {
        ReturnUrlPattern::default()
    }

    #[test]
    fn success_code_in_response_code_param() {
        let outcome = classify_return_url(
            "https://pay.example.com/payment/return?vnp_ResponseCode=00",
            &pattern(),
        );
        assert_eq!(outcome, Some(RedirectOutcome::Succeeded));
    }

    #[test]
    fn success_code_in_transaction_status_param() {
        let outcome = classify_return_url(
            "https://pay.example.com/vnpay/return?vnp_TransactionStatus=00&vnp_ResponseCode=24",
            &pattern(),
        );
        assert_eq!(outcome, Some(RedirectOutcome::Succeeded));
    }

    #[test]
    fn non_success_code_classifies_as_failed() {
        let outcome = classify_return_url(
            "https://pay.example.com/payment/return?vnp_ResponseCode=24",
            &pattern(),
        );
        assert_eq!(outcome, Some(RedirectOutcome::Failed));
    }

    #[test]
    fn return_url_without_params_classifies_as_failed() {
        let outcome =
            classify_return_url("https://pay.example.com/payment/return", &pattern());
        assert_eq!(outcome, Some(RedirectOutcome::Failed));
    }

    #[test]
    fn unrelated_url_is_not_classified() {
        assert_eq!(
            classify_return_url("https://pay.example.com/checkout/start", &pattern()),
            None
        );
        // The marker must appear in the path, not in the query.
        assert_eq!(
            classify_return_url(
                "https://pay.example.com/checkout?next=/payment/return",
                &pattern()
            ),
            None
        );
    }

    #[test]
    fn garbled_query_classifies_as_failed() {
        let outcome = classify_return_url(
            "https://pay.example.com/payment/return?%%%=&&vnp",
            &pattern(),
        );
        assert_eq!(outcome, Some(RedirectOutcome::Failed));
    }

    #[test]
    fn relative_return_url_falls_back_to_manual_parsing() {
        let outcome =
            classify_return_url("/payment/return?vnp_ResponseCode=00", &pattern());
        assert_eq!(outcome, Some(RedirectOutcome::Succeeded));

        let outcome = classify_return_url("/payment/return?vnp_ResponseCode=97", &pattern());
        assert_eq!(outcome, Some(RedirectOutcome::Failed));
    }

    #[test]
    fn percent_encoded_values_are_decoded_in_the_fallback() {
        let outcome =
            classify_return_url("/vnpay/return?vnp_ResponseCode=%30%30", &pattern());
        assert_eq!(outcome, Some(RedirectOutcome::Succeeded));
    }
}
