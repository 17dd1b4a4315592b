//! Availability tracker: the authoritative worker → free capacity map.
//!
//! Each record is guarded by its `DashMap` shard lock, so every operation
//! is atomic per worker address without a registry-wide lock.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use opentelemetry::KeyValue;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::WorkerAddress;
use crate::telemetry::metrics;

/// Per-worker capacity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CapacityRecord {
    available: u32,
    updated_at: DateTime<Utc>,
}

impl CapacityRecord {
    fn with_available(available: u32) -> Self {
        Self {
            available,
            updated_at: Utc::now(),
        }
    }
}

/// A point-in-time view of one worker, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerCapacity {
    pub worker: WorkerAddress,
    pub available: u32,
    pub updated_at: DateTime<Utc>,
}

/// Tracks how much capacity each known worker has reported.
///
/// Records are created lazily on first notification and never expired here.
#[derive(Debug, Default)]
pub struct AvailabilityTracker {
    workers: DashMap<WorkerAddress, CapacityRecord>,
}

impl AvailabilityTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget whatever capacity `worker` had; it is known with zero available.
    pub fn reset_worker(&self, worker: &WorkerAddress) {
        self.workers
            .insert(worker.clone(), CapacityRecord::with_available(0));
        metrics::worker_resets().add(1, &[]);
    }

    /// Check that `capacity` is a value [`Self::report_capacity`] accepts.
    pub fn validate_capacity(worker: &WorkerAddress, capacity: i64) -> Result<u32> {
        if capacity < 0 {
            return Err(Error::NegativeCapacity {
                address: worker.clone(),
                value: capacity,
            });
        }
        u32::try_from(capacity).map_err(|_| Error::CapacityOutOfRange {
            address: worker.clone(),
            value: capacity,
        })
    }

    /// Record the worker's current total free capacity (absolute, not a delta).
    ///
    /// A negative or oversized value is rejected and the record is left as is.
    pub fn report_capacity(&self, worker: &WorkerAddress, capacity: i64) -> Result<()> {
        let available = Self::validate_capacity(worker, capacity)?;
        self.workers
            .insert(worker.clone(), CapacityRecord::with_available(available));
        metrics::capacity_reports().add(1, &[]);
        Ok(())
    }

    /// Claim one unit of `worker`'s capacity.
    ///
    /// Returns the worker as a dispatch candidate, or `None` when it has no
    /// capacity left or is unknown.
    pub fn try_reserve(&self, worker: &WorkerAddress) -> Option<WorkerAddress> {
        let reserved = match self.workers.get_mut(worker) {
            Some(mut record) if record.available > 0 => {
                record.available -= 1;
                true
            }
            _ => false,
        };
        record_reservation(reserved);
        reserved.then(|| worker.clone())
    }

    /// Claim one unit from whichever worker currently reports the most
    /// capacity. Ties go to the lowest address.
    pub fn try_reserve_any(&self) -> Option<WorkerAddress> {
        // Collect first: holding a shard read guard while calling get_mut
        // on the same shard would deadlock.
        let mut candidates: Vec<(WorkerAddress, u32)> = self
            .workers
            .iter()
            .filter(|r| r.available > 0)
            .map(|r| (r.key().clone(), r.available))
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        for (worker, _) in candidates {
            let claimed = match self.workers.get_mut(&worker) {
                Some(mut record) if record.available > 0 => {
                    record.available -= 1;
                    true
                }
                _ => false,
            };
            if claimed {
                record_reservation(true);
                return Some(worker);
            }
        }
        record_reservation(false);
        None
    }

    /// Current available capacity for `worker`, if it is known.
    pub fn available(&self, worker: &WorkerAddress) -> Option<u32> {
        self.workers.get(worker).map(|r| r.available)
    }

    /// Best-effort view of every known worker, sorted by address.
    ///
    /// Records may change while the snapshot is taken; never route from it.
    pub fn snapshot(&self) -> Vec<WorkerCapacity> {
        let mut all: Vec<WorkerCapacity> = self
            .workers
            .iter()
            .map(|r| WorkerCapacity {
                worker: r.key().clone(),
                available: r.available,
                updated_at: r.updated_at,
            })
            .collect();
        all.sort_by(|a, b| a.worker.cmp(&b.worker));
        all
    }

    /// Number of known workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

fn record_reservation(reserved: bool) {
    metrics::reservations().add(
        1,
        &[KeyValue::new("result", if reserved { "ok" } else { "empty" })],
    );
}
