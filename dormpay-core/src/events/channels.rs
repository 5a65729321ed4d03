//! Event channel factories and handles.
//!
//! Provides factory functions for creating the bounded channels used by the
//! confirmation flow, with type aliases for the sender/receiver handles.

use super::types::{NavigationEvent, OutcomeState, SurfaceCommand};
use dormpay_sdk::objects::StatusSnapshot;
use tokio::sync::mpsc;

/// Default buffer size for event channels.
///
/// Navigation bursts from a checkout page are small; this keeps memory
/// bounded while never back-pressuring a browser binding in practice.
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

/// Sender handle for NavigationEvent events.
pub type NavigationEventSender = mpsc::Sender<NavigationEvent>;
/// Receiver handle for NavigationEvent events.
pub type NavigationEventReceiver = mpsc::Receiver<NavigationEvent>;

/// Sender handle for SurfaceCommand events.
pub type SurfaceCommandSender = mpsc::Sender<SurfaceCommand>;
/// Receiver handle for SurfaceCommand events.
pub type SurfaceCommandReceiver = mpsc::Receiver<SurfaceCommand>;

/// Sender handle for polled status snapshots.
pub type StatusUpdateSender = mpsc::Sender<StatusSnapshot>;
/// Receiver handle for polled status snapshots.
pub type StatusUpdateReceiver = mpsc::Receiver<StatusSnapshot>;

/// Sender handle for session outcome states.
pub type OutcomeStateSender = mpsc::Sender<OutcomeState>;
/// Receiver handle for session outcome states.
pub type OutcomeStateReceiver = mpsc::Receiver<OutcomeState>;

/// Create a new NavigationEvent channel.
///
/// The browser binding clones the sender into every surface it manages;
/// the detector owns the receiver.
pub fn navigation_event_channel() -> (NavigationEventSender, NavigationEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create a new SurfaceCommand channel.
///
/// The detector holds the sender; the browser binding owns the receiver.
pub fn surface_command_channel() -> (SurfaceCommandSender, SurfaceCommandReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create a new status update channel.
///
/// The polling coordinator emits `PENDING` snapshots on it while it runs.
pub fn status_update_channel() -> (StatusUpdateSender, StatusUpdateReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create a new outcome state channel.
///
/// One per session; the session's publisher is the only writer.
pub fn outcome_state_channel() -> (OutcomeStateSender, OutcomeStateReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
