//! Confirmation processors.
//!
//! This module contains the two tasks that discover a payment's terminal
//! state:
//!
//! - `PollingCoordinator`: drives the fixed-interval status-poll loop for
//!   polling providers (QR/bank transfer)
//! - `RedirectOutcomeDetector`: classifies embedded-browser navigations for
//!   redirect providers (hosted checkout pages)

pub mod poller;
pub mod redirect;

pub use poller::{PollResult, PollingCoordinator, PollingPolicy};
pub use redirect::{
    DetectionResult, RedirectOutcome, RedirectOutcomeDetector, ReturnUrlPattern,
    classify_return_url,
};
