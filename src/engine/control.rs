//! Control channel listener: filters control messages, parses worker
//! notifications and applies them to the availability tracker.

use crate::admission::AdmissionPolicy;
use crate::error::{Error, Result};
use crate::model::{ControlNotification, Signal, TransportMessage};
use crate::telemetry::control::message_span;
use crate::telemetry::metrics;
use crate::transport::Transport;
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, mpsc};
use tracing::{Instrument, Span, debug, info, warn};

use super::availability::AvailabilityTracker;

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Not a control message; left alone.
    Ignored,
    /// The admission policy vetoed the sender.
    Rejected,
    /// Every signal in the notification was applied.
    Applied(ControlNotification),
}

impl Disposition {
    fn label(&self) -> &'static str {
        match self {
            Disposition::Ignored => "ignored",
            Disposition::Rejected => "rejected",
            Disposition::Applied(_) => "applied",
        }
    }
}

/// Bridges a control-channel transport to the [`AvailabilityTracker`].
///
/// The listener does no capacity arithmetic: it parses and forwards.
pub struct ControlListener {
    tracker: Arc<AvailabilityTracker>,
    policy: Arc<dyn AdmissionPolicy>,
    span: Span,
    shutdown: Arc<Notify>,
    stopping: Arc<AtomicBool>,
}

impl Clone for ControlListener {
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            policy: Arc::clone(&self.policy),
            span: self.span.clone(),
            shutdown: Arc::clone(&self.shutdown),
            stopping: Arc::clone(&self.stopping),
        }
    }
}

impl ControlListener {
    /// `span` scopes every event this listener logs; see
    /// [`crate::telemetry::control::listener_span`].
    pub fn new(
        tracker: Arc<AvailabilityTracker>,
        policy: Arc<dyn AdmissionPolicy>,
        span: Span,
    ) -> Self {
        Self {
            tracker,
            policy,
            span,
            shutdown: Arc::new(Notify::new()),
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn tracker(&self) -> &Arc<AvailabilityTracker> {
        &self.tracker
    }

    /// Stop accepting notifications, in this listener and every clone of
    /// it. Sticky: a later `run` returns straight away. In-flight work is
    /// not drained.
    pub fn shutdown(&self) {
        self.stopping.store(true, Ordering::Release);
        self.shutdown.notify_waiters();
    }

    /// Start `transport` on `channel` and process messages until shutdown
    /// or until the transport closes the stream.
    ///
    /// A transport that cannot start is returned as an error; per-message
    /// failures are logged and never stop the loop.
    pub async fn run<T: Transport>(&self, transport: &T, channel: &str) -> Result<()> {
        let mut inbound = transport.start(channel).instrument(self.span.clone()).await?;
        self.pump(&mut inbound, channel)
            .instrument(self.span.clone())
            .await;
        Ok(())
    }

    async fn pump(&self, inbound: &mut mpsc::Receiver<TransportMessage>, channel: &str) {
        // Register for the wakeup before checking the flag so a shutdown
        // between the two is not lost.
        let stopped = self.shutdown.notified();
        tokio::pin!(stopped);
        stopped.as_mut().enable();
        if self.stopping.load(Ordering::Acquire) {
            info!(channel, "control listener already shut down");
            return;
        }

        info!(channel, "listening for control notifications");
        loop {
            tokio::select! {
                _ = &mut stopped => {
                    info!(channel, "control listener shutting down");
                    return;
                }
                message = inbound.recv() => {
                    let Some(message) = message else {
                        info!(channel, "control channel closed");
                        return;
                    };
                    self.process(&message);
                }
            }
        }
    }

    /// Handle one message, logging and counting a failure instead of
    /// returning it.
    pub fn process(&self, message: &TransportMessage) {
        if let Err(e) = self.handle(message) {
            metrics::control_notifications()
                .add(1, &[KeyValue::new("disposition", "malformed")]);
            self.span.in_scope(|| {
                warn!(
                    message_id = %message.id,
                    reply_to = message.reply_to.as_ref().map(|w| w.as_str()),
                    "discarding control notification: {e}"
                );
            });
        }
    }

    /// Handle one inbound message.
    ///
    /// Non-control messages are ignored without a trace. For control
    /// messages the admission policy runs first, then the headers are parsed
    /// and validated in full before anything is applied, so a malformed
    /// notification (non-integer or negative capacity) leaves the tracker
    /// untouched.
    pub fn handle(&self, message: &TransportMessage) -> Result<Disposition> {
        if !message.is_control {
            return Ok(Disposition::Ignored);
        }

        // Enter the listener span too: the per-message span is debug level
        // and may be disabled.
        let _scope = self.span.enter();
        let span = message_span(&self.span, &message.id);
        let _entered = span.enter();

        let worker = message.reply_to.clone().ok_or_else(|| {
            Error::MalformedNotification("control message has no reply address".to_string())
        })?;
        span.record("control.worker", worker.as_str());

        let disposition = if self.policy.should_reject(&worker) {
            debug!(%worker, "worker not admitted, dropping notification");
            Disposition::Rejected
        } else {
            let notification = ControlNotification::from_headers(worker, &message.headers)?;
            self.apply(&notification)?;
            Disposition::Applied(notification)
        };

        metrics::control_notifications()
            .add(1, &[KeyValue::new("disposition", disposition.label())]);
        Ok(disposition)
    }

    fn apply(&self, notification: &ControlNotification) -> Result<()> {
        let worker = &notification.worker;
        if notification.is_empty() {
            debug!(%worker, "control notification carried no worker signals");
        }

        // Nothing is applied unless every signal is valid.
        for signal in &notification.signals {
            if let Signal::CapacityAvailable { capacity } = *signal {
                AvailabilityTracker::validate_capacity(worker, capacity)?;
            }
        }

        for signal in &notification.signals {
            match *signal {
                Signal::WorkerStarting => {
                    self.tracker.reset_worker(worker);
                    info!(%worker, "worker has started up, clearing previously reported capacity");
                }
                Signal::CapacityAvailable { capacity } => {
                    self.tracker.report_capacity(worker, capacity)?;
                    info!(%worker, capacity, "worker checked in with available capacity");
                }
            }
        }
        Ok(())
    }
}
