//! Cancellation signaling shared by the session and its processors.
//!
//! A [`PaymentSession`](crate::session::PaymentSession) owns the sender side
//! of one cancellation channel; every processor it attaches holds a receiver
//! and races it, `biased`, against its own work.

use tokio::sync::watch;

/// Create a cancellation channel. The initial value is "not cancelled".
pub fn cancellation_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Resolves once cancellation is signaled.
///
/// A dropped sender counts as cancellation: a processor that outlives its
/// session must stop, not spin.
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
