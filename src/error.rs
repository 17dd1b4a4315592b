//! Error types for readyq.

use thiserror::Error;

use crate::model::WorkerAddress;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed control notification: {0}")]
    MalformedNotification(String),

    #[error("negative capacity {value} reported by worker {address}")]
    NegativeCapacity { address: WorkerAddress, value: i64 },

    #[error("capacity {value} reported by worker {address} is out of range")]
    CapacityOutOfRange { address: WorkerAddress, value: i64 },

    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors scoped to a single notification; the listener drops
    /// the message and keeps going.
    pub fn is_notification_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedNotification(_)
                | Error::NegativeCapacity { .. }
                | Error::CapacityOutOfRange { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
