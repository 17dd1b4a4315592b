//! Worker admission: a yes/no gate consulted before any capacity update.
//!
//! Used to cap how many distinct workers the distributor will recognise.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::model::WorkerAddress;

/// Decides whether notifications from a worker address are dropped.
pub trait AdmissionPolicy: Send + Sync {
    fn should_reject(&self, worker: &WorkerAddress) -> bool;
}

impl<F> AdmissionPolicy for F
where
    F: Fn(&WorkerAddress) -> bool + Send + Sync,
{
    fn should_reject(&self, worker: &WorkerAddress) -> bool {
        self(worker)
    }
}

/// Admits every worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdmitAll;

impl AdmissionPolicy for AdmitAll {
    fn should_reject(&self, _worker: &WorkerAddress) -> bool {
        false
    }
}

/// Admits the first `max` distinct workers seen, then rejects newcomers.
#[derive(Debug)]
pub struct WorkerLimit {
    max: usize,
    admitted: Mutex<HashSet<WorkerAddress>>,
}

impl WorkerLimit {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            admitted: Mutex::new(HashSet::new()),
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Number of workers admitted so far.
    pub fn admitted(&self) -> usize {
        self.admitted.lock().map(|set| set.len()).unwrap_or(self.max)
    }
}

impl AdmissionPolicy for WorkerLimit {
    fn should_reject(&self, worker: &WorkerAddress) -> bool {
        // A poisoned lock means a panic mid-update; fail closed.
        let Ok(mut admitted) = self.admitted.lock() else {
            return true;
        };
        if admitted.contains(worker) {
            return false;
        }
        if admitted.len() >= self.max {
            return true;
        }
        admitted.insert(worker.clone());
        false
    }
}
