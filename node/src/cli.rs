//! # CLI Interface
//!
//! Defines the command-line argument structure for `crest-node` using
//! `clap` derive. Supports three subcommands: `demo`, `keygen`, and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Crest checkpointed-ledger node.
///
/// A driver binary for the Crest ledger engine: runs a scripted
/// end-to-end scenario over the public API, generates account keypairs,
/// and prints build information.
#[derive(Parser, Debug)]
#[command(
    name = "crest-node",
    about = "Crest checkpointed-ledger node",
    version,
    propagate_version = true
)]
pub struct CrestNodeCli {
    /// Default log filter when RUST_LOG is not set.
    #[arg(
        long,
        global = true,
        env = "CREST_LOG_LEVEL",
        default_value = "crest_node=info,crest_ledger=info"
    )]
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    #[arg(long, global = true, env = "CREST_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Crest node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scripted end-to-end demo scenario: create, seed, open,
    /// transfer, signed authorizations, fork.
    Demo(DemoArgs),
    /// Generate a fresh account keypair (or derive one from a seed).
    Keygen(KeygenArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `demo` subcommand.
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Write a pretty-printed JSON snapshot of the final universe state
    /// to this path.
    #[arg(long, short = 'o', env = "CREST_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Hex-encoded 32-byte secret for deterministic derivation.
    ///
    /// When omitted, a fresh key is drawn from the operating system RNG.
    /// **Never pass a production secret on the command line** — shells
    /// keep history.
    #[arg(long)]
    pub seed: Option<String>,
}
