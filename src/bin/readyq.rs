//! readyq CLI: run the distributor control plane, or announce worker
//! events onto its control queue.

use clap::{Parser, Subcommand};
use readyq::admission::{AdmissionPolicy, AdmitAll, WorkerLimit};
use readyq::config::Config;
use readyq::db::Db;
use readyq::engine::{AvailabilityTracker, ControlListener};
use readyq::model::TransportMessage;
use readyq::telemetry::control::listener_span;
use readyq::telemetry::{TelemetryConfig, init_telemetry};
use readyq::transport::PgmqTransport;
use readyq::transport::pgmq::PgmqOptions;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "readyq", about = "Distributor control plane")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen on the control queue and track worker capacity
    Serve {
        /// Log a capacity snapshot every N seconds (0 disables)
        #[arg(long, default_value_t = 30)]
        snapshot_interval: u64,
    },
    /// Send a control notification as a worker would
    Announce {
        /// Worker reply address
        worker: String,
        /// Mark the worker as freshly started
        #[arg(long)]
        starting: bool,
        /// Current free capacity
        #[arg(long, allow_negative_numbers = true)]
        capacity: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve { snapshot_interval } => cmd_serve(config, snapshot_interval).await,
        Command::Announce {
            worker,
            starting,
            capacity,
        } => cmd_announce(config, worker, starting, capacity).await,
    }
}

async fn cmd_serve(config: Config, snapshot_interval: u64) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: config.endpoint_name.clone(),
        log_level: config.log_level.clone(),
    })?;

    let db = Db::connect(config.database_url.expose_secret()).await?;
    db.migrate().await?;
    let transport = PgmqTransport::new(
        Arc::new(db),
        PgmqOptions {
            poll_interval: config.poll_interval,
            ..PgmqOptions::default()
        },
    );

    let policy: Arc<dyn AdmissionPolicy> = match config.max_workers {
        Some(max) => Arc::new(WorkerLimit::new(max)),
        None => Arc::new(AdmitAll),
    };
    let tracker = Arc::new(AvailabilityTracker::new());
    let listener = ControlListener::new(
        Arc::clone(&tracker),
        policy,
        listener_span(&config.endpoint_name),
    );

    let ctrl = listener.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        ctrl.shutdown();
    });

    if snapshot_interval > 0 {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(snapshot_interval));
            loop {
                tick.tick().await;
                for w in tracker.snapshot() {
                    tracing::info!(
                        worker = %w.worker,
                        available = w.available,
                        updated_at = %w.updated_at,
                        "capacity snapshot"
                    );
                }
            }
        });
    }

    listener.run(&transport, &config.control_queue).await?;
    Ok(())
}

async fn cmd_announce(
    config: Config,
    worker: String,
    starting: bool,
    capacity: Option<i64>,
) -> anyhow::Result<()> {
    if !starting && capacity.is_none() {
        anyhow::bail!("nothing to announce: pass --starting and/or --capacity");
    }

    let mut message = TransportMessage::control(worker);
    if starting {
        message = message.worker_starting();
    }
    if let Some(capacity) = capacity {
        message = message.capacity_available(capacity);
    }

    let db = Db::connect(config.database_url.expose_secret()).await?;
    db.migrate().await?;
    db.create_queue(&config.control_queue).await?;
    let msg_id = db
        .send_to_queue(&config.control_queue, &serde_json::to_value(&message)?)
        .await?;

    println!("Sent: control message {msg_id} ({})", message.id);
    Ok(())
}
