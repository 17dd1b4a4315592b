//! Metric instruments, created from the global `"readyq"` meter.
//!
//! Without a registered `MeterProvider` every instrument is a no-op.

use opentelemetry::metrics::{Counter, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("readyq")
}

/// Counter: inbound messages on the control channel.
/// Labels: `disposition` ("ignored" | "rejected" | "applied" | "malformed").
pub fn control_notifications() -> Counter<u64> {
    meter()
        .u64_counter("readyq.control.notifications")
        .with_description("Messages received on the control channel")
        .build()
}

/// Counter: worker records reset by a worker-starting notification.
pub fn worker_resets() -> Counter<u64> {
    meter()
        .u64_counter("readyq.worker.resets")
        .with_description("Worker capacity resets")
        .build()
}

/// Counter: accepted capacity reports.
pub fn capacity_reports() -> Counter<u64> {
    meter()
        .u64_counter("readyq.worker.capacity_reports")
        .with_description("Accepted worker capacity reports")
        .build()
}

/// Counter: reservation attempts.
/// Labels: `result` ("ok" | "empty").
pub fn reservations() -> Counter<u64> {
    meter()
        .u64_counter("readyq.worker.reservations")
        .with_description("Capacity reservation attempts")
        .build()
}

/// Counter: pgmq operations on the control queue.
/// Labels: `queue`, `operation`.
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("readyq.queue.operations")
        .with_description("Number of control queue operations")
        .build()
}
