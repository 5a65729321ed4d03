//! Event and state type definitions for the confirmation flow.

use dormpay_sdk::objects::{CreatePaymentResponse, StatusSnapshot};
use serde::Serialize;

/// Identifier for one embedded-browser surface.
///
/// The hosting UI's main browser view is [`SurfaceId::PRIMARY`]; the binding
/// assigns a fresh id to every pop-up context the checkout page opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SurfaceId(pub u32);

impl SurfaceId {
    /// The main embedded-browser view the checkout URL is loaded into.
    pub const PRIMARY: SurfaceId = SurfaceId(0);

    pub fn is_primary(self) -> bool {
        self == Self::PRIMARY
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_primary() {
            write!(f, "primary")
        } else {
            write!(f, "popup:{}", self.0)
        }
    }
}

/// Navigation events reported by the embedded-browser binding.
///
/// The binding clones its sender into every pop-up context it creates, so a
/// single stream carries events from the primary surface and all children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// The surface is about to navigate to `url`.
    WillNavigate { surface: SurfaceId, url: String },
    /// The surface finished loading `url`.
    DidFinishLoad { surface: SurfaceId, url: String },
    /// The checkout page opened a pop-up browser context.
    PopupOpened { opener: SurfaceId, surface: SurfaceId },
    /// A surface was torn down. Closing the primary surface before any
    /// match means the user backed out of the payment.
    SurfaceClosed { surface: SurfaceId },
}

impl NavigationEvent {
    /// The surface this event concerns.
    pub fn surface(&self) -> SurfaceId {
        match self {
            Self::WillNavigate { surface, .. }
            | Self::DidFinishLoad { surface, .. }
            | Self::PopupOpened { surface, .. }
            | Self::SurfaceClosed { surface } => *surface,
        }
    }
}

/// Commands sent back to the embedded-browser binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceCommand {
    /// Close/detach the given surface. Sent when a return navigation
    /// matched inside a pop-up context.
    Close(SurfaceId),
}

/// Terminal result of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaymentOutcome {
    /// The provider confirmed the payment.
    Succeeded,
    /// The provider rejected the payment, or the return navigation carried
    /// a non-success code.
    Failed,
    /// The polling attempt cap elapsed; the true outcome is unknown, not
    /// negative.
    TimedOut,
    /// The attempt can no longer be resolved (the navigation stream was
    /// torn down without a close signal).
    Unresolvable,
}

/// UI-facing state of one payment session.
///
/// States are published in the monotonic order `Requesting ->
/// AwaitingCompletion -> (Outcome | Error)`; once a terminal value goes out
/// the session is inert and late-arriving snapshots are discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OutcomeState {
    /// No attempt has been started.
    Idle,
    /// The create call is in flight.
    Requesting,
    /// The attempt was created and a coordinator/detector is watching for
    /// completion. `payment` carries the completion medium (QR payload or
    /// checkout URL); `polled` is the latest `PENDING` status snapshot.
    AwaitingCompletion {
        payment: CreatePaymentResponse,
        polled: Option<StatusSnapshot>,
    },
    /// The attempt finished with a distinguished terminal result.
    Outcome(PaymentOutcome),
    /// Infrastructure failure: the create call was rejected or polling
    /// exhausted its error tolerance. Retry-eligible for the caller.
    Error(String),
}

impl OutcomeState {
    /// Returns `true` if no further state can follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Outcome(_) | Self::Error(_))
    }
}
