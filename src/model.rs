//! Core data model.
//!
//! Workers are identified by the reply-to address they send control
//! notifications from. A transport message is what the control channel
//! delivers; only messages flagged as control messages concern this crate.

pub mod notification;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub use notification::{ControlNotification, Signal, headers};

// ---------------------------------------------------------------------------
// Worker Address
// ---------------------------------------------------------------------------

/// Opaque identity of a worker instance: its reply-to address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerAddress(String);

impl WorkerAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerAddress {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for WorkerAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Transport Message
// ---------------------------------------------------------------------------

/// A message as delivered by the transport.
///
/// This is also the JSON payload shape on the pgmq control queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportMessage {
    /// Transport-assigned message id.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Set by the transport for out-of-band control messages.
    #[serde(default, rename = "control")]
    pub is_control: bool,

    /// Sender's reply address.
    #[serde(default)]
    pub reply_to: Option<WorkerAddress>,

    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl TransportMessage {
    /// A control message sent from `reply_to`, with no headers yet.
    pub fn control(reply_to: impl Into<WorkerAddress>) -> Self {
        Self {
            id: Uuid::new_v4(),
            is_control: true,
            reply_to: Some(reply_to.into()),
            headers: HashMap::new(),
        }
    }

    /// An ordinary (non-control) message.
    pub fn work(reply_to: impl Into<WorkerAddress>) -> Self {
        Self {
            is_control: false,
            ..Self::control(reply_to)
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Mark this message as a worker-starting announcement.
    pub fn worker_starting(self) -> Self {
        self.with_header(headers::WORKER_STARTING, "true")
    }

    /// Attach a capacity-available report.
    pub fn capacity_available(self, capacity: i64) -> Self {
        self.with_header(headers::CAPACITY_AVAILABLE, capacity.to_string())
    }
}
