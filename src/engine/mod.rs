//! Distributor control plane: worker availability and the control channel
//! listener that keeps it current.

pub mod availability;
pub mod control;

pub use availability::{AvailabilityTracker, WorkerCapacity};
pub use control::{ControlListener, Disposition};
