//! Control-channel transports.
//!
//! A transport turns "listen on channel C" into a stream of
//! [`TransportMessage`]s. Delivery, acknowledgement and retries are the
//! transport's business; the listener only consumes the stream.

pub mod memory;
pub mod pgmq;

use std::future::Future;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::model::TransportMessage;

pub use memory::MemoryTransport;
pub use pgmq::PgmqTransport;

/// Something that can deliver control-channel messages.
pub trait Transport: Send + Sync {
    /// Begin listening on `channel`.
    ///
    /// Fails with [`crate::error::Error::TransportUnavailable`] when the
    /// channel cannot be opened. The stream ends when the transport stops.
    fn start(
        &self,
        channel: &str,
    ) -> impl Future<Output = Result<mpsc::Receiver<TransportMessage>>> + Send;
}
