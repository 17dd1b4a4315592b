//! # readyq
//!
//! Control plane of a master/worker distributor. Workers announce start-up
//! and free capacity over a control channel; the master keeps a live view
//! of each worker's capacity that the router reserves from.

pub mod admission;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod model;
pub mod telemetry;
pub mod transport;
