//! Control notifications, parsed out of a transport message's headers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::WorkerAddress;
use crate::error::{Error, Result};

/// Header names carried by control messages.
pub mod headers {
    /// Presence-only marker: the sending worker has just started.
    pub const WORKER_STARTING: &str = "readyq.worker-starting";
    /// The sending worker's current free capacity, as a decimal integer.
    pub const CAPACITY_AVAILABLE: &str = "readyq.capacity-available";
}

/// One capacity-related signal carried by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    WorkerStarting,
    CapacityAvailable { capacity: i64 },
}

/// A validated control notification.
///
/// `signals` is in application order: a reset always precedes a
/// capacity report from the same notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlNotification {
    pub worker: WorkerAddress,
    pub signals: Vec<Signal>,
}

impl ControlNotification {
    /// Parse the signals for `worker` out of a header map.
    ///
    /// The sign of the capacity is not checked here; the tracker owns that rule.
    pub fn from_headers(worker: WorkerAddress, header_map: &HashMap<String, String>) -> Result<Self> {
        let mut signals = Vec::with_capacity(2);

        if header_map.contains_key(headers::WORKER_STARTING) {
            signals.push(Signal::WorkerStarting);
        }

        if let Some(raw) = header_map.get(headers::CAPACITY_AVAILABLE) {
            let capacity = raw.trim().parse::<i64>().map_err(|e| {
                Error::MalformedNotification(format!(
                    "worker {worker} sent capacity {raw:?} which is not an integer: {e}"
                ))
            })?;
            signals.push(Signal::CapacityAvailable { capacity });
        }

        Ok(Self { worker, signals })
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hdrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn reset_is_ordered_before_capacity() {
        let n = ControlNotification::from_headers(
            "w1".into(),
            &hdrs(&[
                (headers::CAPACITY_AVAILABLE, "4"),
                (headers::WORKER_STARTING, ""),
            ]),
        )
        .unwrap();
        assert_eq!(
            n.signals,
            vec![
                Signal::WorkerStarting,
                Signal::CapacityAvailable { capacity: 4 }
            ]
        );
    }

    #[test]
    fn non_integer_capacity_is_malformed() {
        for raw in ["", "five", "2.5", "9999999999999999999999"] {
            let err = ControlNotification::from_headers(
                "w1".into(),
                &hdrs(&[(headers::CAPACITY_AVAILABLE, raw)]),
            )
            .unwrap_err();
            assert!(matches!(err, Error::MalformedNotification(_)), "{raw:?}");
        }
    }

    #[test]
    fn negative_capacity_parses() {
        let n = ControlNotification::from_headers(
            "w2".into(),
            &hdrs(&[(headers::CAPACITY_AVAILABLE, "-1")]),
        )
        .unwrap();
        assert_eq!(n.signals, vec![Signal::CapacityAvailable { capacity: -1 }]);
    }

    #[test]
    fn unrelated_headers_yield_no_signals() {
        let n = ControlNotification::from_headers("w3".into(), &hdrs(&[("x-trace", "abc")]))
            .unwrap();
        assert!(n.is_empty());
    }
}
