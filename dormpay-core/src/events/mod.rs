//! Event system for the payment confirmation flow.
//!
//! This module provides the event types and channel infrastructure that
//! connect the embedded-browser binding, the confirmation processors, and
//! the UI-facing outcome stream.
//!
//! # Event Flow
//!
//! 1. `NavigationEvent` (browser binding) -> `RedirectOutcomeDetector`
//! 2. `RedirectOutcomeDetector` emits `SurfaceCommand` -> browser binding
//! 3. `StatusSnapshot` updates (`PollingCoordinator`) -> `PaymentSession`
//! 4. `PaymentSession` emits `OutcomeState` -> UI consumer
//!
//! All channels are bounded tokio mpsc channels; senders may be cloned into
//! every browser surface that participates in a redirect flow.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, NavigationEventReceiver, NavigationEventSender, OutcomeStateReceiver,
    OutcomeStateSender, StatusUpdateReceiver, StatusUpdateSender, SurfaceCommandReceiver,
    SurfaceCommandSender, navigation_event_channel, outcome_state_channel, status_update_channel,
    surface_command_channel,
};

pub use types::{NavigationEvent, OutcomeState, PaymentOutcome, SurfaceCommand, SurfaceId};
