//! # CLI Interface
//!
//! Defines the command-line argument structure for `attest-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `status`,
//! and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use attest_ledger::config::{DEFAULT_DIFFICULTY, DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};

/// Attest certificate-ledger node.
///
/// Hosts a single tamper-evident certificate-verification ledger:
/// admits records through the configured policy, seals them into the
/// hash chain, serves the REST query surface, and exposes Prometheus
/// metrics.
#[derive(Parser, Debug)]
#[command(
    name = "attest-node",
    about = "Attest certificate-ledger node",
    version,
    propagate_version = true
)]
pub struct AttestNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Attest node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the ledger node.
    Run(RunArgs),
    /// Initialize a new data directory — creates (and persists) a fresh
    /// ledger with its genesis block.
    Init(InitArgs),
    /// Query the status of a running node via its REST endpoint.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node data directory where the ledger snapshot lives.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "ATTEST_DATA_DIR", default_value = "~/.attest")]
    pub data_dir: PathBuf,

    /// Port for the REST API.
    #[arg(long, env = "ATTEST_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "ATTEST_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Proof-of-work difficulty (leading zero hex characters) for newly
    /// created ledgers. Ignored when a snapshot already exists — the
    /// difficulty is a property of the chain, fixed at its birth.
    #[arg(long, env = "ATTEST_DIFFICULTY", default_value_t = DEFAULT_DIFFICULTY)]
    pub difficulty: u32,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "ATTEST_DATA_DIR", default_value = "~/.attest")]
    pub data_dir: PathBuf,

    /// Proof-of-work difficulty for the new ledger.
    #[arg(long, env = "ATTEST_DIFFICULTY", default_value_t = DEFAULT_DIFFICULTY)]
    pub difficulty: u32,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// REST endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:9650")]
    pub rpc_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        AttestNodeCli::command().debug_assert();
    }
}
