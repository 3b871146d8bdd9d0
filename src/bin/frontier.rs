//! frontier CLI — operator interface to a shared crawl frontier.

use clap::{Parser, Subcommand};
use crawl_frontier::config::Config;
use crawl_frontier::config::secrets::ExposeSecret;
use crawl_frontier::frontier::{Frontier, SubmitResult};
use crawl_frontier::model::{WorkItem, normalize_url};
use crawl_frontier::store::RedisStore;
use crawl_frontier::telemetry::worker::{record_item, record_items_processed, start_worker_span};
use crawl_frontier::telemetry::{TelemetryConfig, init_telemetry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{Instrument, error, info};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "frontier", about = "Shared crawl frontier")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit seed URLs (skipping ones already seen)
    Seed {
        urls: Vec<String>,
        /// Priority (higher = more urgent)
        #[arg(long, default_value_t = 0)]
        priority: i32,
        /// Handler that should process the response
        #[arg(long)]
        callback: Option<String>,
        /// Queue even if the URL was seen before
        #[arg(long)]
        dont_filter: bool,
    },
    /// Print the number of pending items
    Len,
    /// Pop one item and print it as JSON
    Pop {
        /// Seconds to wait for an item (0 = don't wait)
        #[arg(long, default_value_t = 0.0)]
        timeout: f64,
    },
    /// Delete all pending items
    Clear,
    /// Check whether a URL has been seen
    Seen { url: String },
    /// Run consumer workers that drain the frontier
    Work {
        /// Number of concurrent workers
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Seconds each pop waits before reporting idle
        #[arg(long, default_value_t = 5.0)]
        timeout: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "crawl-frontier".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let store = RedisStore::connect(config.redis_url.expose_secret()).await?;
    let frontier = Frontier::open(&config.frontier, Arc::new(store))?;

    match cli.command {
        Command::Seed {
            urls,
            priority,
            callback,
            dont_filter,
        } => cmd_seed(&frontier, urls, priority, callback, dont_filter).await,
        Command::Len => {
            println!("{}", frontier.len().await?);
            Ok(())
        }
        Command::Pop { timeout } => cmd_pop(&frontier, seconds(timeout)?).await,
        Command::Clear => {
            frontier.clear().await?;
            println!("Cleared {}", frontier.queue().key());
            Ok(())
        }
        Command::Seen { url } => {
            let seen = frontier.filter().exists(&normalize_url(&url)).await?;
            println!("{}", if seen { "seen" } else { "not seen" });
            Ok(())
        }
        Command::Work { workers, timeout } => {
            cmd_work(Arc::new(frontier), workers, seconds(timeout)?).await
        }
    }
}

fn seconds(value: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|e| anyhow::anyhow!("invalid timeout {value}: {e}"))
}

async fn cmd_seed(
    frontier: &Frontier,
    urls: Vec<String>,
    priority: i32,
    callback: Option<String>,
    dont_filter: bool,
) -> anyhow::Result<()> {
    let mut queued = 0usize;
    for url in urls {
        let mut item = WorkItem::new(&url)
            .priority(priority)
            .dont_filter(dont_filter);
        if let Some(ref cb) = callback {
            item = item.callback(cb);
        }
        match frontier.submit(&item).await? {
            SubmitResult::Queued => {
                queued += 1;
                println!("Queued:    {url}");
            }
            SubmitResult::Duplicate => println!("Duplicate: {url}"),
        }
    }
    println!("\n{queued} item(s) queued, {} pending", frontier.len().await?);
    Ok(())
}

async fn cmd_pop(frontier: &Frontier, timeout: Duration) -> anyhow::Result<()> {
    match frontier.next(timeout).await? {
        Some(item) => println!("{}", serde_json::to_string_pretty(&item)?),
        None => println!("Queue empty."),
    }
    Ok(())
}

async fn cmd_work(frontier: Arc<Frontier>, workers: usize, timeout: Duration) -> anyhow::Result<()> {
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        let _ = stop_tx.send(true);
    });

    info!(workers, queue = frontier.queue().key(), "workers started");

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let frontier = Arc::clone(&frontier);
        handles.push(tokio::spawn(run_worker(frontier, stop_rx.clone(), timeout)));
    }
    for handle in handles {
        if let Err(e) = handle.await {
            error!("worker task failed: {e}");
        }
    }

    info!("workers stopped");
    Ok(())
}

/// Drain the frontier until shutdown, recording each item on the worker span.
async fn run_worker(frontier: Arc<Frontier>, stop: watch::Receiver<bool>, timeout: Duration) {
    let worker_id = Uuid::new_v4();
    let span = start_worker_span(frontier.queue().key(), &worker_id);

    let processed = frontier
        .consume(&stop, timeout, |item| record_item(&span, &item))
        .instrument(span.clone())
        .await;

    record_items_processed(&span, processed);
}
