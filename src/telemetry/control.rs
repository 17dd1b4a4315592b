//! Span helpers for the control channel listener.

use tracing::Span;
use uuid::Uuid;

/// The logging scope handed to a [`crate::engine::ControlListener`].
///
/// Every event the listener emits lands inside this span, tagged with the
/// endpoint it runs for.
pub fn listener_span(endpoint: &str) -> Span {
    tracing::info_span!("readyq.distributor", "distributor.endpoint" = endpoint)
}

/// Child span for one inbound control message.
///
/// `control.worker` is declared empty and filled once the reply address
/// has been read.
pub fn message_span(parent: &Span, message_id: &Uuid) -> Span {
    tracing::debug_span!(
        parent: parent,
        "control.message",
        "control.message_id" = %message_id,
        "control.worker" = tracing::field::Empty,
    )
}
