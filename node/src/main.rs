// Copyright (c) 2026 Attest Labs. MIT License.
// See LICENSE for details.

//! # Attest Ledger Node
//!
//! Entry point for the `attest-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens (or creates) the ledger, and
//! serves the REST API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — start the ledger node
//! - `init`    — initialize the data directory and persist a fresh ledger
//! - `status`  — query a running node's status endpoint
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use attest_ledger::config::{SNAPSHOT_FILENAME, SNAPSHOT_FORMAT_VERSION};
use attest_ledger::policy::RulePolicy;
use attest_ledger::{JsonSnapshotStore, LedgerService};

use cli::{AttestNodeCli, Commands};
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = AttestNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full ledger node: REST API server and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "attest_node=info,attest_ledger=info,tower_http=debug",
        LogFormat::Pretty,
    );

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        difficulty = args.difficulty,
        "starting attest-node"
    );

    // --- Ledger (load-or-create) ---
    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("failed to create data directory: {}", args.data_dir.display()))?;

    let snapshot_path = args.data_dir.join(SNAPSHOT_FILENAME);
    let store = JsonSnapshotStore::new(snapshot_path.clone());
    let ledger = Arc::new(
        LedgerService::open(args.difficulty, Box::new(store), Box::<RulePolicy>::default())
            .with_context(|| format!("failed to open ledger at {}", snapshot_path.display()))?,
    );

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());
    let info = ledger.info().context("failed to read ledger info")?;
    node_metrics.chain_length.set(info.stats.total_blocks as i64);
    tracing::info!(
        blocks = info.stats.total_blocks,
        difficulty = info.stats.difficulty,
        latest = %info.stats.latest_block_hash,
        "ledger ready"
    );

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (snapshot format {})",
            env!("CARGO_PKG_VERSION"),
            SNAPSHOT_FORMAT_VERSION,
        ),
        ledger,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("REST API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("attest-node stopped");
    Ok(())
}

/// Initializes a new data directory and persists a fresh ledger with its
/// sealed genesis block. Idempotent: an existing snapshot is loaded, not
/// overwritten.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("attest_node=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), difficulty = args.difficulty, "initializing node");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let snapshot_path = data_dir.join(SNAPSHOT_FILENAME);
    let store = JsonSnapshotStore::new(snapshot_path.clone());
    let ledger =
        LedgerService::open(args.difficulty, Box::new(store), Box::<RulePolicy>::default())
            .with_context(|| format!("failed to initialize ledger at {}", snapshot_path.display()))?;

    let info = ledger.info().context("failed to read ledger info")?;

    println!("Node initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Snapshot       : {}", snapshot_path.display());
    println!("  Difficulty     : {}", info.stats.difficulty);
    println!("  Blocks         : {}", info.stats.total_blocks);
    println!("  Genesis hash   : {}", info.genesis_block.hash);

    Ok(())
}

/// Queries a running node's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/status", args.rpc_url.trim_end_matches('/'));
    let body: String = http_get_stub(&url).await?;
    println!("{}", body);
    Ok(())
}

/// Minimal HTTP GET without pulling in `reqwest` as a dependency.
/// In a real deployment, swap this for a proper HTTP client.
async fn http_get_stub(url: &str) -> Result<String> {
    // Use tokio's TCP stream + raw HTTP/1.1 to avoid adding reqwest.
    let parsed: url::Url = url
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid URL: {}", e))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("missing host in URL"))?;
    let port = parsed.port().unwrap_or(80);
    let path = parsed.path();

    let addr = format!("{}:{}", host, port);
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host,
    );

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    // Strip HTTP headers — everything after the first blank line is the body.
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_else(|| response.to_string());

    Ok(body)
}

/// Prints version information to stdout.
fn print_version() {
    println!("attest-node {}", env!("CARGO_PKG_VERSION"));
    println!("snapshot   v{}", SNAPSHOT_FORMAT_VERSION);
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Minimal URL parser — just enough to extract host/port/path.
/// Avoids pulling in the `url` crate for a single use.
mod url {
    pub struct Url {
        host: String,
        port: Option<u16>,
        path: String,
    }

    impl Url {
        pub fn host_str(&self) -> Option<&str> {
            Some(&self.host)
        }

        pub fn port(&self) -> Option<u16> {
            self.port
        }

        pub fn path(&self) -> &str {
            &self.path
        }
    }

    impl std::str::FromStr for Url {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            // Strip scheme.
            let rest = s
                .strip_prefix("http://")
                .or_else(|| s.strip_prefix("https://"))
                .unwrap_or(s);

            let (authority, path) = match rest.find('/') {
                Some(i) => (&rest[..i], &rest[i..]),
                None => (rest, "/"),
            };

            let (host, port) = match authority.rfind(':') {
                Some(i) => {
                    let p = authority[i + 1..]
                        .parse::<u16>()
                        .map_err(|e| format!("bad port: {}", e))?;
                    (authority[..i].to_string(), Some(p))
                }
                None => (authority.to_string(), None),
            };

            Ok(Url {
                host,
                port,
                path: path.to_string(),
            })
        }
    }
}
