//! Entry point: loads configuration, wires the queue and workers together,
//! and runs until SIGINT/SIGTERM.

mod config;
mod db_writer;
mod error;
mod event;
mod http_poller;
mod metrics;
mod parser;
mod queue;
mod rate_limiter;
mod ws_client;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use config::{Config, RpcMode};
use metrics::Metrics;
use queue::BoundedQueue;
use rate_limiter::RateLimiter;

/// Concurrent ingestion engine: subscribes to a Solana JSON-RPC log stream
/// over HTTP and/or WebSocket, decodes program log payloads, and persists
/// them to PostgreSQL.
#[derive(Parser, Debug)]
#[command(name = "chain-log-ingestor", version, disable_version_flag = true)]
struct Cli {
    /// Path to a `.env`-style configuration file.
    #[arg(short = 'c', long = "config", default_value = ".env")]
    config: String,

    /// Print version information and exit.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.log_color)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };
    init_tracing(&config);

    let config = Arc::new(config);
    let queue = Arc::new(BoundedQueue::new(config.queue_capacity));
    let metrics = Arc::new(Metrics::new());
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_rps));
    let running = Arc::new(AtomicBool::new(true));

    {
        let running = Arc::clone(&running);
        if let Err(err) = ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        }) {
            tracing::warn!(error = %err, "failed to install signal handler");
        }
    }

    let use_ws = config.rpc_mode != RpcMode::Http;
    let use_http = config.rpc_mode == RpcMode::Http || config.rpc_mode == RpcMode::Dual;

    let mut handles = Vec::new();

    if use_ws {
        let (config, queue, metrics, running) = (
            Arc::clone(&config),
            Arc::clone(&queue),
            Arc::clone(&metrics),
            Arc::clone(&running),
        );
        handles.push(
            std::thread::Builder::new()
                .name("ws-client".into())
                .spawn(move || ws_client::run(config, queue, metrics, running))
                .expect("failed to spawn ws-client thread"),
        );
    }

    if use_http {
        let (config, queue, metrics, rate_limiter, running) = (
            Arc::clone(&config),
            Arc::clone(&queue),
            Arc::clone(&metrics),
            Arc::clone(&rate_limiter),
            Arc::clone(&running),
        );
        handles.push(
            std::thread::Builder::new()
                .name("http-poller".into())
                .spawn(move || http_poller::run(config, queue, metrics, rate_limiter, running))
                .expect("failed to spawn http-poller thread"),
        );
    }

    let db_handle = {
        let config = Arc::clone(&config);
        let queue = Arc::clone(&queue);
        std::thread::Builder::new()
            .name("db-writer".into())
            .spawn(move || db_writer::run(&config, &queue))
            .expect("failed to spawn db-writer thread")
    };

    let metrics_handle = {
        let metrics = Arc::clone(&metrics);
        let running = Arc::clone(&running);
        std::thread::Builder::new()
            .name("metrics-reporter".into())
            .spawn(move || {
                const TICK: Duration = Duration::from_millis(200);
                const SUMMARY_INTERVAL: Duration = Duration::from_secs(60);
                let mut elapsed = Duration::ZERO;
                while running.load(Ordering::Relaxed) {
                    std::thread::sleep(TICK);
                    elapsed += TICK;
                    if elapsed >= SUMMARY_INTERVAL {
                        metrics.log_summary();
                        elapsed = Duration::ZERO;
                    }
                }
            })
            .expect("failed to spawn metrics-reporter thread")
    };

    tracing::info!(mode = %config.rpc_mode, "ingestion engine started");

    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(200));
    }

    tracing::info!("shutting down");
    for handle in handles {
        let _ = handle.join();
    }
    queue.close();
    let _ = db_handle.join();
    let _ = metrics_handle.join();
}
