//! Control channel on a pgmq queue.
//!
//! A background task polls the queue, decodes each JSON payload into a
//! [`TransportMessage`], forwards it and archives it.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::Transport;
use crate::db::Db;
use crate::db::pgmq::PgmqMessage;
use crate::error::{Error, Result};
use crate::model::TransportMessage;

/// Polling settings for [`PgmqTransport`].
#[derive(Debug, Clone)]
pub struct PgmqOptions {
    /// How long to wait before polling again after an empty read.
    pub poll_interval: Duration,
    /// Visibility timeout (seconds) for messages being forwarded.
    pub visibility_timeout: i32,
    /// Messages fetched per read.
    pub batch_size: i32,
    /// Capacity of the channel between the poller and the listener.
    pub buffer: usize,
}

impl Default for PgmqOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            visibility_timeout: 30,
            batch_size: 32,
            buffer: 256,
        }
    }
}

pub struct PgmqTransport {
    db: Arc<Db>,
    options: PgmqOptions,
}

impl PgmqTransport {
    pub fn new(db: Arc<Db>, options: PgmqOptions) -> Self {
        Self { db, options }
    }
}

impl Transport for PgmqTransport {
    async fn start(&self, channel: &str) -> Result<mpsc::Receiver<TransportMessage>> {
        self.db
            .create_queue(channel)
            .await
            .map_err(|e| Error::TransportUnavailable(format!("cannot open queue {channel}: {e}")))?;

        let (tx, rx) = mpsc::channel(self.options.buffer);
        tokio::spawn(poll_queue(
            Arc::clone(&self.db),
            channel.to_string(),
            self.options.clone(),
            tx,
        ));
        Ok(rx)
    }
}

/// Poll until the receiving side goes away.
async fn poll_queue(
    db: Arc<Db>,
    queue: String,
    options: PgmqOptions,
    tx: mpsc::Sender<TransportMessage>,
) {
    while !tx.is_closed() {
        let batch = match db
            .read_from_queue(&queue, options.visibility_timeout, options.batch_size)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                warn!(queue = %queue, "control queue read failed: {e}");
                tokio::time::sleep(options.poll_interval).await;
                continue;
            }
        };

        if batch.is_empty() {
            tokio::time::sleep(options.poll_interval).await;
            continue;
        }

        for raw in batch {
            if !forward(&db, &queue, raw, &tx).await {
                debug!(queue = %queue, "listener gone, stopping control queue poller");
                return;
            }
        }
    }
}

/// Decode and forward one message, then archive it. Returns false once the
/// listener has stopped; the message is left for its visibility timeout.
async fn forward(
    db: &Db,
    queue: &str,
    raw: PgmqMessage,
    tx: &mpsc::Sender<TransportMessage>,
) -> bool {
    let msg_id = raw.msg_id;
    let enqueued_at = raw.enqueued_at;
    match serde_json::from_value::<TransportMessage>(raw.message) {
        Ok(message) => {
            debug!(queue, msg_id, message_id = %message.id, %enqueued_at, "forwarding control message");
            if tx.send(message).await.is_err() {
                return false;
            }
        }
        Err(e) => {
            warn!(
                queue,
                msg_id,
                read_ct = raw.read_ct,
                %enqueued_at,
                "undecodable control payload: {e}"
            );
        }
    }

    if let Err(e) = db.archive_message(queue, msg_id).await {
        warn!(queue, msg_id, "failed to archive control message: {e}");
    }
    true
}
