// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Crest Node
//!
//! Entry point for the `crest-node` binary. Parses CLI arguments,
//! initializes logging, and dispatches to the handlers.
//!
//! The binary supports three subcommands:
//!
//! - `demo`    — run a scripted end-to-end scenario over the ledger API
//! - `keygen`  — generate an account keypair
//! - `version` — print build version information

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;

use crest_ledger::{
    AllowanceAuthorization, AuthorizationHash, CrestKeypair, ForkOptions, LedgerMetadata,
    TransferAuthorization, Universe,
};

use cli::{Commands, CrestNodeCli};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = CrestNodeCli::parse();
    logging::init_logging(&cli.log_level, LogFormat::from_str_lossy(&cli.log_format));

    match cli.command {
        Commands::Demo(args) => run_demo(args),
        Commands::Keygen(args) => generate_keys(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Runs the scripted scenario: seed a disabled ledger, open it, move value
/// directly and through both signed authorization flows, then fork it and
/// let the two histories diverge.
fn run_demo(args: cli::DemoArgs) -> Result<()> {
    let mut universe = Universe::new();

    let controller_key = CrestKeypair::generate();
    let alice_key = CrestKeypair::generate();
    let controller = controller_key.address();
    let alice = alice_key.address();
    let bob = CrestKeypair::generate().address();
    let carol = CrestKeypair::generate().address();

    // --- Genesis: transfers disabled for pre-distribution ---
    let ledger = universe.create_ledger(
        controller,
        LedgerMetadata::new("Crest Credit", "CRD"),
        false,
    );

    universe.advance_marker();
    universe
        .mint(&ledger, controller, controller, 1_000_000)
        .context("minting the initial supply")?;

    universe.advance_marker();
    universe.transfer_from(&ledger, controller, controller, alice, 250_000)?;
    universe.transfer_from(&ledger, controller, controller, bob, 250_000)?;
    tracing::info!(
        alice = %alice,
        bob = %bob,
        "seeded holders while transfers were disabled"
    );

    // --- Open the gate; holders move value themselves ---
    universe.set_transfers_enabled(&ledger, controller, true)?;
    universe.advance_marker();
    universe.transfer(&ledger, alice, bob, 50_000)?;

    // --- Signed allowance flow: alice permits bob off-band ---
    let domain = universe.signing_domain(&ledger)?;
    let now = universe.now();
    let nonce = universe.nonce_of(&ledger, &alice)?;
    let permit = AllowanceAuthorization::sign(&alice_key, &domain, bob, 30_000, nonce, now + 600)
        .context("signing the allowance authorization")?;
    universe.apply_allowance_authorization(&ledger, &permit)?;

    universe.advance_marker();
    universe.transfer_from(&ledger, bob, alice, carol, 10_000)?;

    // --- Signed transfer flow: alice pushes to carol, relayed by anyone ---
    let push = TransferAuthorization::sign(
        &alice_key,
        &domain,
        carol,
        5_000,
        now.saturating_sub(60),
        now + 600,
        AuthorizationHash::derive(b"crest-demo-invoice-1"),
    )
    .context("signing the transfer authorization")?;
    universe.advance_marker();
    universe.apply_transfer_authorization(&ledger, &push)?;

    let fork_marker = universe.current_marker();
    tracing::info!(
        marker = fork_marker,
        alice = universe.balance(&ledger, &alice)?,
        bob = universe.balance(&ledger, &bob)?,
        carol = universe.balance(&ledger, &carol)?,
        supply = universe.total_supply(&ledger)?,
        checkpoints = universe.ledger(&ledger)?.checkpoint_count(),
        "state before the fork"
    );

    // --- Fork and diverge ---
    let child = universe.fork(
        controller,
        ledger,
        LedgerMetadata::new("Crest Credit Fork", "CRDF"),
        true,
        ForkOptions::default(),
    )?;
    universe.advance_marker();
    universe.mint(&child, controller, carol, 1_000_000)?;

    tracing::info!(
        parent_supply = universe.total_supply(&ledger)?,
        child_supply = universe.total_supply(&child)?,
        child_carol = universe.balance(&child, &carol)?,
        parent_carol_at_fork = universe.balance_at(&ledger, &carol, fork_marker)?,
        "forked ledgers diverged"
    );

    if let Some(path) = args.snapshot {
        let json = serde_json::to_vec_pretty(&universe).context("serializing the universe")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        tracing::info!(path = %path.display(), "snapshot written");
    }

    Ok(())
}

/// Generates (or deterministically derives) an account keypair and prints
/// it to stdout.
fn generate_keys(args: cli::KeygenArgs) -> Result<()> {
    let keypair = match args.seed {
        Some(seed) => CrestKeypair::from_hex(seed.trim())
            .context("the --seed value is not a valid hex-encoded secret key")?,
        None => CrestKeypair::generate(),
    };

    println!("address:    {}", keypair.address());
    println!("secret key: {}", hex::encode(keypair.secret_bytes()));
    Ok(())
}

/// Prints version information for the binary and the ledger library.
fn print_version() {
    println!("crest-node {}", env!("CARGO_PKG_VERSION"));
    println!("crest-ledger {}", crest_ledger::config::CREST_VERSION);
}
