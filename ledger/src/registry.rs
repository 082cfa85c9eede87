//! # Universe
//!
//! The explicit context object that owns every ledger, the monotonic marker
//! sequence, and the clock. Nothing in this crate is ambient global state:
//! a test builds as many independent universes as it likes, and two
//! universes never see each other.
//!
//! The universe is also where fork delegation is resolved. A forked ledger
//! stores no balance history of its own at creation; reads walk the parent
//! chain until some ledger's local history covers the queried marker,
//! clamping the marker to each fork boundary on the way up. Writes are then
//! orchestrated two-phase: resolve every current value through the chain,
//! hand the numbers to the target [`Ledger`] to validate and commit.
//!
//! ## Sequencing
//!
//! One marker stream orders all ledgers in a universe, the way a block
//! height orders everything on one chain. Callers advance it through
//! [`Universe::advance_marker`] or pin it with
//! [`Universe::advance_marker_to`]; every mutation stamps the current
//! marker. Marker assignment and state mutation are inseparable because
//! both happen under the same `&mut Universe`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::authorization::{AllowanceAuthorization, SigningDomain, TransferAuthorization};
use crate::config::MAX_FORK_DEPTH;
use crate::crypto::keys::Address;
use crate::error::LedgerError;
use crate::ledger::{ForkPoint, Ledger, LedgerMetadata};
use crate::types::{Amount, LedgerId, Marker, Nonce, Timestamp};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the Unix-second timestamps checked against authorization
/// validity windows.
///
/// Production universes run on [`Clock::System`]. Tests pin
/// [`Clock::Fixed`] so that deadline and window assertions are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clock {
    /// Wall-clock time from the host.
    System,
    /// A pinned timestamp, advanced only by [`Universe::set_clock`].
    Fixed(Timestamp),
}

impl Clock {
    /// The current Unix second under this clock.
    pub fn now(&self) -> Timestamp {
        match self {
            // Saturate rather than wrap on a hopelessly misconfigured host
            // clock reporting pre-1970 time.
            Clock::System => chrono::Utc::now().timestamp().max(0) as Timestamp,
            Clock::Fixed(now) => *now,
        }
    }
}

// ---------------------------------------------------------------------------
// Fork options
// ---------------------------------------------------------------------------

/// Options for [`Universe::fork`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkOptions {
    /// Marker at which the child splits off. Defaults to the universe's
    /// current marker; may point anywhere at or below it, never ahead.
    pub at_marker: Option<Marker>,
    /// Starting total supply for the child, recorded eagerly at the fork
    /// marker. When omitted, supply delegates to the parent lazily like
    /// every balance does.
    pub initial_supply: Option<Amount>,
}

impl ForkOptions {
    /// Forks at the given historical marker instead of the current one.
    pub fn at_marker(mut self, marker: Marker) -> Self {
        self.at_marker = Some(marker);
        self
    }

    /// Gives the child an independent starting supply.
    pub fn initial_supply(mut self, supply: Amount) -> Self {
        self.initial_supply = Some(supply);
        self
    }
}

// ---------------------------------------------------------------------------
// Universe
// ---------------------------------------------------------------------------

/// All ledgers of one deployment, plus the marker sequence and the clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    ledgers: HashMap<LedgerId, Ledger>,
    marker: Marker,
    clock: Clock,
    /// Feeds [`LedgerId`] derivation so identical metadata still yields
    /// distinct ids. Never decreases, never reused.
    creation_sequence: u64,
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

impl Universe {
    /// An empty universe on the system clock, starting at marker 0.
    pub fn new() -> Self {
        Self::with_clock(Clock::System)
    }

    /// An empty universe on the given clock.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            ledgers: HashMap::new(),
            marker: 0,
            clock,
            creation_sequence: 0,
        }
    }

    // -- sequencing ---------------------------------------------------------

    /// The marker every mutation currently stamps.
    pub fn current_marker(&self) -> Marker {
        self.marker
    }

    /// Advances the marker by one and returns the new value.
    pub fn advance_marker(&mut self) -> Marker {
        self.marker += 1;
        self.marker
    }

    /// Jumps the marker forward to `marker`.
    ///
    /// The host's sequencing handle for sparse streams (block heights that
    /// skip numbers). Regression is a sequencing bug and is rejected.
    pub fn advance_marker_to(&mut self, marker: Marker) -> Result<Marker, LedgerError> {
        if marker < self.marker {
            return Err(LedgerError::invariant(format!(
                "marker {marker} would regress from current marker {}",
                self.marker
            )));
        }
        self.marker = marker;
        Ok(self.marker)
    }

    // -- clock --------------------------------------------------------------

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    /// The current Unix second as the authorization flows will see it.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // -- registry -----------------------------------------------------------

    /// Creates a genesis ledger and returns its id.
    pub fn create_ledger(
        &mut self,
        controller: Address,
        metadata: LedgerMetadata,
        transfers_enabled: bool,
    ) -> LedgerId {
        let id = LedgerId::derive(self.creation_sequence, &metadata.name, &metadata.symbol, None);
        self.creation_sequence += 1;

        info!(
            ledger = %id,
            name = %metadata.name,
            symbol = %metadata.symbol,
            %controller,
            transfers_enabled,
            marker = self.marker,
            "ledger created"
        );
        self.ledgers.insert(
            id,
            Ledger::create(id, metadata, controller, transfers_enabled, self.marker),
        );
        id
    }

    /// Forks `parent` into a new child ledger controlled by `caller`.
    ///
    /// O(1) in the number of holders: no balance is copied, the child
    /// delegates reads at or below the fork marker to the parent. The one
    /// eager write is the optional `initial_supply` checkpoint. Allowances,
    /// nonces, and consumed authorization hashes never carry over.
    ///
    /// Anyone may fork any existing ledger; forking grants no authority
    /// over the parent.
    pub fn fork(
        &mut self,
        caller: Address,
        parent: LedgerId,
        metadata: LedgerMetadata,
        transfers_enabled: bool,
        options: ForkOptions,
    ) -> Result<LedgerId, LedgerError> {
        let parent_depth = self.chain_depth(&parent)?;
        if parent_depth + 1 > MAX_FORK_DEPTH {
            return Err(LedgerError::invariant(format!(
                "fork chain depth {} would exceed maximum {MAX_FORK_DEPTH}",
                parent_depth + 1
            )));
        }

        let fork_marker = options.at_marker.unwrap_or(self.marker);
        if fork_marker > self.marker {
            return Err(LedgerError::invariant(format!(
                "fork marker {fork_marker} is ahead of current marker {}",
                self.marker
            )));
        }

        let id = LedgerId::derive(
            self.creation_sequence,
            &metadata.name,
            &metadata.symbol,
            Some(&parent),
        );
        self.creation_sequence += 1;

        info!(
            ledger = %id,
            %parent,
            fork_marker,
            controller = %caller,
            initial_supply = ?options.initial_supply,
            "ledger forked"
        );
        self.ledgers.insert(
            id,
            Ledger::forked(
                id,
                metadata,
                caller,
                transfers_enabled,
                self.marker,
                ForkPoint {
                    parent,
                    fork_marker,
                },
                options.initial_supply,
            ),
        );
        Ok(id)
    }

    /// Looks up a ledger by id.
    pub fn ledger(&self, id: &LedgerId) -> Result<&Ledger, LedgerError> {
        self.ledgers
            .get(id)
            .ok_or(LedgerError::UnknownLedger { id: *id })
    }

    pub fn contains(&self, id: &LedgerId) -> bool {
        self.ledgers.contains_key(id)
    }

    pub fn ledger_count(&self) -> usize {
        self.ledgers.len()
    }

    /// The signing domain authorizations for this ledger must be signed
    /// under. Derived from injectable metadata, never hardcoded.
    pub fn signing_domain(&self, id: &LedgerId) -> Result<SigningDomain, LedgerError> {
        let ledger = self.ledger(id)?;
        let metadata = ledger.metadata();
        Ok(SigningDomain::new(&metadata.name, &metadata.version, id))
    }

    // -- reads --------------------------------------------------------------

    /// Current balance of `account` on `id`, resolved through the fork
    /// chain.
    pub fn balance(&self, id: &LedgerId, account: &Address) -> Result<Amount, LedgerError> {
        self.balance_at(id, account, self.marker)
    }

    /// Balance of `account` on `id` as of `marker`.
    ///
    /// Walks the parent chain: each hop clamps the queried marker to the
    /// fork boundary, so a child created at marker F answers queries above
    /// F with the parent's value *at* F until it records its own history.
    pub fn balance_at(
        &self,
        id: &LedgerId,
        account: &Address,
        marker: Marker,
    ) -> Result<Amount, LedgerError> {
        self.resolve(id, marker, |ledger, marker| {
            ledger.local_balance_at(account, marker)
        })
    }

    /// Current total supply of `id`, resolved through the fork chain.
    pub fn total_supply(&self, id: &LedgerId) -> Result<Amount, LedgerError> {
        self.total_supply_at(id, self.marker)
    }

    /// Total supply of `id` as of `marker`, same delegation as balances.
    pub fn total_supply_at(&self, id: &LedgerId, marker: Marker) -> Result<Amount, LedgerError> {
        self.resolve(id, marker, Ledger::local_supply_at)
    }

    /// Current allowance from `owner` to `spender`. Never delegated:
    /// allowances are not historical and not inherited.
    pub fn allowance(
        &self,
        id: &LedgerId,
        owner: &Address,
        spender: &Address,
    ) -> Result<Amount, LedgerError> {
        Ok(self.ledger(id)?.allowance(owner, spender))
    }

    /// The nonce the owner's next allowance authorization must carry.
    pub fn nonce_of(&self, id: &LedgerId, owner: &Address) -> Result<Nonce, LedgerError> {
        Ok(self.ledger(id)?.nonce_of(owner))
    }

    // Iterative chain walk shared by balance and supply reads. `lookup`
    // answers from one ledger's local history; `None` sends the walk one
    // hop up with the marker clamped to the fork boundary.
    fn resolve(
        &self,
        id: &LedgerId,
        marker: Marker,
        lookup: impl Fn(&Ledger, Marker) -> Option<Amount>,
    ) -> Result<Amount, LedgerError> {
        let mut ledger = self.ledger(id)?;
        let mut marker = marker;
        // One extra pass over MAX_FORK_DEPTH so a chain right at the cap
        // still resolves; fork() guarantees no longer chain exists.
        for _ in 0..=MAX_FORK_DEPTH {
            if let Some(value) = lookup(ledger, marker) {
                return Ok(value);
            }
            match ledger.fork_point() {
                Some(fork_point) => {
                    marker = marker.min(fork_point.fork_marker);
                    ledger = self.ledger(&fork_point.parent)?;
                }
                None => return Ok(0),
            }
        }
        Err(LedgerError::invariant(format!(
            "fork chain of ledger {id} exceeds maximum depth {MAX_FORK_DEPTH}"
        )))
    }

    fn chain_depth(&self, id: &LedgerId) -> Result<usize, LedgerError> {
        let mut ledger = self.ledger(id)?;
        let mut depth = 0;
        while let Some(fork_point) = ledger.fork_point() {
            depth += 1;
            if depth > MAX_FORK_DEPTH {
                return Err(LedgerError::invariant(format!(
                    "fork chain of ledger {id} exceeds maximum depth {MAX_FORK_DEPTH}"
                )));
            }
            ledger = self.ledger(&fork_point.parent)?;
        }
        Ok(depth)
    }

    // -- administrative operations ------------------------------------------

    /// Hands the controller role to `new_controller`. Controller-only.
    pub fn change_controller(
        &mut self,
        id: &LedgerId,
        caller: Address,
        new_controller: Address,
    ) -> Result<(), LedgerError> {
        self.guard_controller(id, &caller)?;
        info!(ledger = %id, old = %caller, new = %new_controller, "controller changed");
        self.ledger_mut(id)?.set_controller(new_controller);
        Ok(())
    }

    /// Toggles the transfer gate. Controller-only, in either direction.
    pub fn set_transfers_enabled(
        &mut self,
        id: &LedgerId,
        caller: Address,
        enabled: bool,
    ) -> Result<(), LedgerError> {
        self.guard_controller(id, &caller)?;
        info!(ledger = %id, enabled, "transfer gate toggled");
        self.ledger_mut(id)?.set_transfers_enabled(enabled);
        Ok(())
    }

    // -- value operations ----------------------------------------------------

    /// Mints `amount` new units to `to`. Controller-only. Returns the new
    /// total supply.
    pub fn mint(
        &mut self,
        id: &LedgerId,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        self.guard_controller(id, &caller)?;
        let to_balance = self.balance(id, &to)?;
        let supply = self.total_supply(id)?;

        let marker = self.marker;
        let new_supply = self
            .ledger_mut(id)?
            .record_mint(to, to_balance, supply, amount, marker)?;
        info!(ledger = %id, %to, amount, new_supply, marker, "minted");
        Ok(new_supply)
    }

    /// Burns `amount` units held by `from`. Controller-only. Returns the
    /// new total supply.
    pub fn burn(
        &mut self,
        id: &LedgerId,
        caller: Address,
        from: Address,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        self.guard_controller(id, &caller)?;
        let from_balance = self.balance(id, &from)?;
        let supply = self.total_supply(id)?;

        let marker = self.marker;
        let new_supply = self
            .ledger_mut(id)?
            .record_burn(from, from_balance, supply, amount, marker)?;
        info!(ledger = %id, %from, amount, new_supply, marker, "burned");
        Ok(new_supply)
    }

    /// Moves `amount` of the caller's own funds to `to`.
    ///
    /// While transfers are disabled only the controller may move value;
    /// once enabled, anyone may. A zero amount succeeds without touching
    /// state.
    pub fn transfer(
        &mut self,
        id: &LedgerId,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.guard_transfer_gate(id, &caller)?;
        self.execute_transfer(id, caller, to, amount)
    }

    /// Sets the caller's allowance for `spender`.
    ///
    /// Gated by the transfer flag for everyone including the controller:
    /// an allowance is a promise that value can move, and while the gate is
    /// down it cannot.
    pub fn approve(
        &mut self,
        id: &LedgerId,
        caller: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if !self.ledger(id)?.transfers_enabled() {
            return Err(LedgerError::TransfersDisabled);
        }
        debug!(ledger = %id, owner = %caller, %spender, amount, "allowance set");
        self.ledger_mut(id)?.set_allowance(caller, spender, amount);
        Ok(())
    }

    /// Moves `amount` from `from` to `to` on the caller's allowance.
    ///
    /// The controller bypasses both the allowance and the transfer gate --
    /// this is the pre-distribution tool for seeding balances while
    /// transfers are still disabled. Everyone else needs the gate open and
    /// allowance cover; the allowance is debited only once the move has
    /// committed.
    pub fn transfer_from(
        &mut self,
        id: &LedgerId,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if caller == self.ledger(id)?.controller() {
            return self.execute_transfer(id, from, to, amount);
        }

        let ledger = self.ledger(id)?;
        if !ledger.transfers_enabled() {
            return Err(LedgerError::TransfersDisabled);
        }
        let available = ledger.allowance(&from, &caller);
        if available < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: from,
                spender: caller,
                available,
                requested: amount,
            });
        }

        self.execute_transfer(id, from, to, amount)?;
        self.ledger_mut(id)?.debit_allowance(from, caller, amount)
    }

    /// Recovers holdings mistakenly sent to the ledger's own account.
    /// Controller-only. Returns the amount recovered.
    ///
    /// `Some(asset)` moves the full balance this ledger's account holds on
    /// the `asset` ledger over to the controller; the asset ledger's own
    /// transfer gating applies, and a zero balance claims successfully as a
    /// no-op. `None` is the native-holdings sentinel and is always a no-op,
    /// because native value can never reach the ledger's account in the
    /// first place -- every inbound path rejects it as a recipient.
    pub fn claim(
        &mut self,
        id: &LedgerId,
        caller: Address,
        asset: Option<LedgerId>,
    ) -> Result<Amount, LedgerError> {
        self.guard_controller(id, &caller)?;
        let Some(asset_id) = asset else {
            return Ok(0);
        };

        let holder = self.ledger(id)?.address();
        let amount = self.balance(&asset_id, &holder)?;
        if amount == 0 {
            return Ok(0);
        }

        self.guard_transfer_gate(&asset_id, &holder)?;
        self.execute_transfer(&asset_id, holder, caller, amount)?;
        info!(ledger = %id, asset = %asset_id, amount, to = %caller, "claimed stranded holdings");
        Ok(amount)
    }

    // -- signed authorization operations --------------------------------------

    /// Applies a signed allowance authorization (permit flow).
    ///
    /// Submittable by anyone holding the signed payload. Gated like
    /// [`approve`](Self::approve); then the deadline, nonce, and signature
    /// are checked in that order. Success sets the allowance and advances
    /// the owner's nonce, consuming the authorization forever.
    pub fn apply_allowance_authorization(
        &mut self,
        id: &LedgerId,
        authorization: &AllowanceAuthorization,
    ) -> Result<(), LedgerError> {
        let ledger = self.ledger(id)?;
        if !ledger.transfers_enabled() {
            return Err(LedgerError::TransfersDisabled);
        }
        let expected_nonce = ledger.nonce_of(&authorization.owner);
        let domain = self.signing_domain(id)?;
        authorization.validate(&domain, self.now(), expected_nonce)?;

        info!(
            ledger = %id,
            owner = %authorization.owner,
            spender = %authorization.spender,
            amount = authorization.amount,
            nonce = authorization.nonce,
            "allowance authorization applied"
        );
        let ledger = self.ledger_mut(id)?;
        ledger.set_allowance(
            authorization.owner,
            authorization.spender,
            authorization.amount,
        );
        ledger.increment_nonce(authorization.owner);
        Ok(())
    }

    /// Applies a signed transfer authorization (push-payment flow).
    ///
    /// Submittable by anyone holding the signed payload. Still gated by the
    /// transfer flag; then the validity window, replay state, and signature
    /// are checked, then the recipient and balance. Success moves the value
    /// and permanently consumes the authorization hash for the payer --
    /// even when the value is zero.
    pub fn apply_transfer_authorization(
        &mut self,
        id: &LedgerId,
        authorization: &TransferAuthorization,
    ) -> Result<(), LedgerError> {
        let ledger = self.ledger(id)?;
        if !ledger.transfers_enabled() {
            return Err(LedgerError::TransfersDisabled);
        }
        let already_used =
            ledger.is_authorization_used(&authorization.from, &authorization.authorization_hash);
        let domain = self.signing_domain(id)?;
        authorization.validate(&domain, self.now(), already_used)?;

        // Unlike the direct path, a zero-value push still validates its
        // recipient: the signer named one, so it must be a real one.
        let ledger = self.ledger(id)?;
        if authorization.to.is_zero() || authorization.to == ledger.address() {
            return Err(LedgerError::InvalidRecipient {
                to: authorization.to,
            });
        }
        let from_balance = self.balance(id, &authorization.from)?;
        if authorization.value > from_balance {
            return Err(LedgerError::InsufficientBalance {
                account: authorization.from,
                available: from_balance,
                requested: authorization.value,
            });
        }

        self.execute_transfer(id, authorization.from, authorization.to, authorization.value)?;
        self.ledger_mut(id)?
            .mark_authorization_used(authorization.from, authorization.authorization_hash);
        info!(
            ledger = %id,
            from = %authorization.from,
            to = %authorization.to,
            value = authorization.value,
            hash = %authorization.authorization_hash,
            "transfer authorization applied"
        );
        Ok(())
    }

    // -- internal helpers -----------------------------------------------------

    fn ledger_mut(&mut self, id: &LedgerId) -> Result<&mut Ledger, LedgerError> {
        self.ledgers
            .get_mut(id)
            .ok_or(LedgerError::UnknownLedger { id: *id })
    }

    fn guard_controller(&self, id: &LedgerId, caller: &Address) -> Result<(), LedgerError> {
        if self.ledger(id)?.controller() == *caller {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized { caller: *caller })
        }
    }

    fn guard_transfer_gate(&self, id: &LedgerId, mover: &Address) -> Result<(), LedgerError> {
        let ledger = self.ledger(id)?;
        if ledger.transfers_enabled() || ledger.controller() == *mover {
            Ok(())
        } else {
            Err(LedgerError::TransfersDisabled)
        }
    }

    // The common move path behind transfer, transfer_from, claim, and the
    // signed transfer flow. Gate and allowance checks have already happened;
    // this handles the zero short-circuit, the recipient rules, balance
    // resolution through the fork chain, and the checkpoint writes.
    fn execute_transfer(
        &mut self,
        id: &LedgerId,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let ledger = self.ledger(id)?;
        if to.is_zero() || to == ledger.address() {
            return Err(LedgerError::InvalidRecipient { to });
        }

        let from_balance = self.balance(id, &from)?;
        let to_balance = self.balance(id, &to)?;

        let marker = self.marker;
        self.ledger_mut(id)?
            .record_transfer(from, from_balance, to, to_balance, amount, marker)?;
        debug!(ledger = %id, %from, %to, amount, marker, "transferred");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SharedUniverse
// ---------------------------------------------------------------------------

/// A universe behind a read-write lock, for multi-threaded hosts.
///
/// The engine itself has no internal parallelism; this wrapper is the
/// total-order commit boundary. Each [`commit`](Self::commit) closure runs
/// alone against the state, so marker assignment and mutation stay
/// inseparable. Reads share the lock and see only fully committed state.
#[derive(Debug, Clone, Default)]
pub struct SharedUniverse {
    inner: Arc<RwLock<Universe>>,
}

impl SharedUniverse {
    /// Wraps a universe for shared access.
    pub fn new(universe: Universe) -> Self {
        Self {
            inner: Arc::new(RwLock::new(universe)),
        }
    }

    /// Runs a read-only closure under the shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&Universe) -> R) -> R {
        f(&self.inner.read())
    }

    /// Runs a mutating closure exclusively, as one committed step.
    pub fn commit<R>(&self, f: impl FnOnce(&mut Universe) -> R) -> R {
        f(&mut self.inner.write())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
