//! Integration tests for the ledger lifecycle.
//!
//! These exercise the full public surface across module boundaries the way
//! a host would drive it: one universe, one marker stream, operations
//! stamped in sequence, and historical reads verified against the books
//! afterwards.

use crest_ledger::{
    Address, Amount, Clock, LedgerError, LedgerId, LedgerMetadata, Marker, Universe,
};

fn addr(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

const CONTROLLER: u8 = 0xAA;

/// Helper: a fresh universe on a pinned clock with one enabled ledger.
fn setup() -> (Universe, LedgerId, Address) {
    let mut universe = Universe::with_clock(Clock::Fixed(1_000));
    let controller = addr(CONTROLLER);
    let id = universe.create_ledger(controller, LedgerMetadata::new("Crest Credit", "CRD"), true);
    (universe, id, controller)
}

// ---------------------------------------------------------------------------
// The canonical scenario
// ---------------------------------------------------------------------------

#[test]
fn mint_burn_transfer_with_historical_reads() {
    let (mut universe, id, controller) = setup();
    let (a, b) = (addr(1), addr(2));

    universe.advance_marker_to(10).unwrap();
    universe.mint(&id, controller, a, 100).unwrap();
    assert_eq!(universe.balance_at(&id, &a, 10).unwrap(), 100);

    universe.advance_marker_to(11).unwrap();
    universe.burn(&id, controller, a, 20).unwrap();
    assert_eq!(universe.balance_at(&id, &a, 11).unwrap(), 80);
    // History is immutable: the marker-10 view is untouched.
    assert_eq!(universe.balance_at(&id, &a, 10).unwrap(), 100);

    universe.advance_marker_to(12).unwrap();
    universe.transfer(&id, a, b, 10).unwrap();
    assert_eq!(universe.balance_at(&id, &a, 12).unwrap(), 70);
    assert_eq!(universe.balance_at(&id, &b, 12).unwrap(), 10);
    assert_eq!(universe.total_supply_at(&id, 12).unwrap(), 80);

    // And the full past is still addressable.
    assert_eq!(universe.total_supply_at(&id, 10).unwrap(), 100);
    assert_eq!(universe.total_supply_at(&id, 11).unwrap(), 80);
    assert_eq!(universe.balance_at(&id, &b, 11).unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Conservation properties
// ---------------------------------------------------------------------------

#[test]
fn balances_equal_recorded_flows_at_every_marker() {
    let (mut universe, id, controller) = setup();
    let accounts: Vec<Address> = (1..=4).map(addr).collect();

    // (marker, op) script: mints, burns, and transfers interleaved.
    struct Flow {
        marker: Marker,
        // (account index, signed delta) pairs this op applies.
        deltas: Vec<(usize, i64)>,
    }
    let mut flows: Vec<Flow> = Vec::new();

    universe.advance_marker_to(1).unwrap();
    universe.mint(&id, controller, accounts[0], 1_000).unwrap();
    flows.push(Flow { marker: 1, deltas: vec![(0, 1_000)] });

    universe.advance_marker_to(2).unwrap();
    universe.mint(&id, controller, accounts[1], 500).unwrap();
    flows.push(Flow { marker: 2, deltas: vec![(1, 500)] });

    universe.advance_marker_to(3).unwrap();
    universe.transfer(&id, accounts[0], accounts[2], 250).unwrap();
    flows.push(Flow { marker: 3, deltas: vec![(0, -250), (2, 250)] });

    universe.advance_marker_to(4).unwrap();
    universe.burn(&id, controller, accounts[1], 100).unwrap();
    flows.push(Flow { marker: 4, deltas: vec![(1, -100)] });

    universe.advance_marker_to(5).unwrap();
    universe.transfer(&id, accounts[2], accounts[3], 50).unwrap();
    universe.transfer(&id, accounts[0], accounts[3], 50).unwrap();
    flows.push(Flow { marker: 5, deltas: vec![(2, -50), (0, -50), (3, 100)] });

    // Every account at every marker equals the sum of its flows so far.
    for probe in 0..=6u64 {
        for (index, account) in accounts.iter().enumerate() {
            let expected: i64 = flows
                .iter()
                .filter(|flow| flow.marker <= probe)
                .flat_map(|flow| flow.deltas.iter())
                .filter(|(i, _)| *i == index)
                .map(|(_, delta)| delta)
                .sum();
            assert_eq!(
                universe.balance_at(&id, account, probe).unwrap(),
                expected as Amount,
                "account {index} at marker {probe}"
            );
        }
    }
}

#[test]
fn supply_equals_sum_of_balances_at_every_marker() {
    let (mut universe, id, controller) = setup();
    let accounts: Vec<Address> = (1..=3).map(addr).collect();

    universe.advance_marker_to(1).unwrap();
    universe.mint(&id, controller, accounts[0], 600).unwrap();
    universe.advance_marker_to(2).unwrap();
    universe.transfer(&id, accounts[0], accounts[1], 200).unwrap();
    universe.advance_marker_to(3).unwrap();
    universe.burn(&id, controller, accounts[1], 50).unwrap();
    universe.advance_marker_to(4).unwrap();
    universe.transfer(&id, accounts[0], accounts[2], 150).unwrap();

    for probe in 0..=5u64 {
        let sum: Amount = accounts
            .iter()
            .map(|account| universe.balance_at(&id, account, probe).unwrap())
            .sum();
        assert_eq!(
            universe.total_supply_at(&id, probe).unwrap(),
            sum,
            "marker {probe}"
        );
    }
}

// ---------------------------------------------------------------------------
// Overflow boundaries
// ---------------------------------------------------------------------------

#[test]
fn supply_overflow_rejects_and_leaves_state_unchanged() {
    let (mut universe, id, controller) = setup();
    let (a, b) = (addr(1), addr(2));

    universe.advance_marker_to(1).unwrap();
    universe.mint(&id, controller, a, u64::MAX - 100).unwrap();

    universe.advance_marker_to(2).unwrap();
    let err = universe.mint(&id, controller, b, 101).unwrap_err();
    assert_eq!(
        err,
        LedgerError::Overflow {
            current: u64::MAX - 100,
            increment: 101,
        }
    );
    // Post-failure, supply and balances are exactly as before the call.
    assert_eq!(universe.total_supply(&id).unwrap(), u64::MAX - 100);
    assert_eq!(universe.balance(&id, &b).unwrap(), 0);

    // The boundary value itself is fine.
    universe.mint(&id, controller, b, 100).unwrap();
    assert_eq!(universe.total_supply(&id).unwrap(), u64::MAX);
}

#[test]
fn burn_shortfall_rejects_and_leaves_state_unchanged() {
    let (mut universe, id, controller) = setup();
    let a = addr(1);

    universe.advance_marker_to(1).unwrap();
    universe.mint(&id, controller, a, 100).unwrap();

    universe.advance_marker_to(2).unwrap();
    let err = universe.burn(&id, controller, a, 101).unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientBalance {
            account: a,
            available: 100,
            requested: 101,
        }
    );
    assert_eq!(universe.balance(&id, &a).unwrap(), 100);
    assert_eq!(universe.total_supply(&id).unwrap(), 100);
}

// ---------------------------------------------------------------------------
// Pre-distribution workflow
// ---------------------------------------------------------------------------

#[test]
fn disabled_ledger_supports_controller_seeding_then_opens() {
    let mut universe = Universe::with_clock(Clock::Fixed(0));
    let controller = addr(CONTROLLER);
    let id = universe.create_ledger(
        controller,
        LedgerMetadata::new("Crest Credit", "CRD"),
        false,
    );
    let holders: Vec<Address> = (1..=3).map(addr).collect();

    // Seed: mint to the treasury, distribute with the controller's
    // allowance-free transfer_from while the gate is down.
    universe.advance_marker_to(1).unwrap();
    universe.mint(&id, controller, controller, 900).unwrap();
    universe.advance_marker_to(2).unwrap();
    for holder in &holders {
        universe
            .transfer_from(&id, controller, controller, *holder, 300)
            .unwrap();
    }

    // Holders cannot move yet.
    let err = universe.transfer(&id, holders[0], holders[1], 1).unwrap_err();
    assert_eq!(err, LedgerError::TransfersDisabled);

    // Open the gate; normal life begins.
    universe.set_transfers_enabled(&id, controller, true).unwrap();
    universe.advance_marker_to(3).unwrap();
    universe.transfer(&id, holders[0], holders[1], 100).unwrap();
    assert_eq!(universe.balance(&id, &holders[1]).unwrap(), 400);
    assert_eq!(universe.total_supply(&id).unwrap(), 900);
}

#[test]
fn controller_handoff_moves_every_privilege() {
    let (mut universe, id, controller) = setup();
    let successor = addr(0xBB);

    universe.change_controller(&id, controller, successor).unwrap();

    // The old controller is just another account now.
    let err = universe.mint(&id, controller, controller, 1).unwrap_err();
    assert_eq!(err, LedgerError::Unauthorized { caller: controller });
    let err = universe
        .change_controller(&id, controller, controller)
        .unwrap_err();
    assert_eq!(err, LedgerError::Unauthorized { caller: controller });

    universe.advance_marker_to(1).unwrap();
    universe.mint(&id, successor, addr(1), 10).unwrap();
    universe.set_transfers_enabled(&id, successor, false).unwrap();
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[test]
fn universe_snapshot_survives_a_disk_roundtrip() {
    let (mut universe, id, controller) = setup();
    universe.advance_marker_to(10).unwrap();
    universe.mint(&id, controller, addr(1), 100).unwrap();
    universe.advance_marker_to(11).unwrap();
    universe.transfer(&id, addr(1), addr(2), 40).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("universe.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&universe).unwrap()).unwrap();

    let restored: Universe =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(restored.current_marker(), 11);
    assert_eq!(restored.balance_at(&id, &addr(1), 10).unwrap(), 100);
    assert_eq!(restored.balance(&id, &addr(1)).unwrap(), 60);
    assert_eq!(restored.balance(&id, &addr(2)).unwrap(), 40);
    assert_eq!(restored.total_supply(&id).unwrap(), 100);
}
