//! pgmq primitives for the control queue, via plain SQLx calls to
//! `pgmq.create`, `pgmq.send`, `pgmq.read` and `pgmq.archive`.

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;

use crate::error::Result;
use crate::telemetry::metrics;

/// A raw message read from a pgmq queue.
#[derive(Debug, Clone)]
pub struct PgmqMessage {
    pub msg_id: i64,
    pub read_ct: i32,
    pub enqueued_at: DateTime<Utc>,
    pub message: serde_json::Value,
}

fn record_queue_op(queue: &str, operation: &'static str) {
    metrics::queue_operations().add(
        1,
        &[
            KeyValue::new("queue", queue.to_string()),
            KeyValue::new("operation", operation),
        ],
    );
}

impl super::Db {
    /// Create a queue if it does not exist yet.
    pub async fn create_queue(&self, queue: &str) -> Result<()> {
        sqlx::query("SELECT pgmq.create($1)")
            .bind(queue)
            .execute(&self.pool)
            .await?;
        record_queue_op(queue, "create");
        Ok(())
    }

    /// Enqueue a JSON payload for immediate delivery. Returns the message id.
    pub async fn send_to_queue(&self, queue: &str, payload: &serde_json::Value) -> Result<i64> {
        let (msg_id,): (i64,) = sqlx::query_as("SELECT pgmq.send($1, $2)")
            .bind(queue)
            .bind(payload)
            .fetch_one(&self.pool)
            .await?;
        record_queue_op(queue, "send");
        Ok(msg_id)
    }

    /// Read up to `batch` messages, hiding them for `vt_seconds`.
    pub async fn read_from_queue(
        &self,
        queue: &str,
        vt_seconds: i32,
        batch: i32,
    ) -> Result<Vec<PgmqMessage>> {
        let rows = sqlx::query_as::<_, (i64, i32, DateTime<Utc>, serde_json::Value)>(
            "SELECT msg_id, read_ct, enqueued_at, message FROM pgmq.read($1, $2, $3)",
        )
        .bind(queue)
        .bind(vt_seconds)
        .bind(batch)
        .fetch_all(&self.pool)
        .await?;

        record_queue_op(queue, if rows.is_empty() { "read_empty" } else { "read" });

        Ok(rows
            .into_iter()
            .map(|(msg_id, read_ct, enqueued_at, message)| PgmqMessage {
                msg_id,
                read_ct,
                enqueued_at,
                message,
            })
            .collect())
    }

    /// Move a consumed message to the archive table.
    pub async fn archive_message(&self, queue: &str, msg_id: i64) -> Result<()> {
        sqlx::query("SELECT pgmq.archive($1, $2)")
            .bind(queue)
            .bind(msg_id)
            .execute(&self.pool)
            .await?;
        record_queue_op(queue, "archive");
        Ok(())
    }
}
