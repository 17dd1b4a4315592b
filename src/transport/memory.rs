//! In-process transport backed by a tokio channel.

use std::sync::Mutex;
use tokio::sync::mpsc;

use super::Transport;
use crate::error::{Error, Result};
use crate::model::TransportMessage;

/// A single-channel in-memory transport.
///
/// Producers obtain senders via [`MemoryTransport::sender`]; the receiving
/// half is handed out once, by the first `start`.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: mpsc::Sender<TransportMessage>,
    rx: Mutex<Option<mpsc::Receiver<TransportMessage>>>,
}

impl MemoryTransport {
    pub fn new(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    pub fn sender(&self) -> mpsc::Sender<TransportMessage> {
        self.tx.clone()
    }
}

impl Transport for MemoryTransport {
    async fn start(&self, channel: &str) -> Result<mpsc::Receiver<TransportMessage>> {
        self.rx
            .lock()
            .map_err(|_| Error::TransportUnavailable(format!("{channel}: lock poisoned")))?
            .take()
            .ok_or_else(|| Error::TransportUnavailable(format!("{channel}: already started")))
    }
}
