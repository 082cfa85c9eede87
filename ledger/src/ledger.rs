//! # Ledger State
//!
//! One ledger: its metadata, controller, the checkpointed balance and
//! supply histories, the current-value allowance table, and the replay
//! state for signed authorizations (nonce counters and consumed hashes).
//!
//! A `Ledger` on its own only answers *local* questions. Forked ledgers
//! inherit history from their parent lazily, and resolving a delegated read
//! needs access to the whole family tree -- that lives in
//! [`Universe`](crate::registry::Universe). The mutators here therefore
//! take pre-resolved balances as arguments: the universe reads through the
//! fork chain first, then hands this module the numbers to validate and
//! commit. Every mutator checks everything before writing anything, so a
//! returned error always means untouched state.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointStore;
use crate::config::{DEFAULT_DECIMALS, SIGNING_DOMAIN_VERSION};
use crate::crypto::keys::Address;
use crate::error::LedgerError;
use crate::types::{Amount, AuthorizationHash, LedgerId, Marker, Nonce};

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Descriptive properties of a ledger, fixed at creation.
///
/// `name` and `version` also feed the signing domain separator, so changing
/// either would orphan every authorization signed before the change. That
/// is why there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMetadata {
    /// Human-readable name, e.g. "Crest Credit".
    pub name: String,
    /// Short ticker symbol, e.g. "CRD".
    pub symbol: String,
    /// Display decimals. Cosmetic only; the engine works in smallest units.
    pub decimals: u8,
    /// Signing-domain version tag.
    pub version: String,
}

impl LedgerMetadata {
    /// Metadata with the default decimals and domain version.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals: DEFAULT_DECIMALS,
            version: SIGNING_DOMAIN_VERSION.to_string(),
        }
    }

    /// Overrides the display decimals.
    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }
}

/// Where a forked ledger hangs off its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkPoint {
    /// The parent ledger.
    pub parent: LedgerId,
    /// Reads at or below this marker delegate to the parent; writes must
    /// land strictly above it.
    pub fork_marker: Marker,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// A single checkpointed ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    id: LedgerId,
    metadata: LedgerMetadata,
    controller: Address,
    transfers_enabled: bool,
    created_at_marker: Marker,
    fork_point: Option<ForkPoint>,
    balances: HashMap<Address, CheckpointStore>,
    total_supply: CheckpointStore,
    allowances: HashMap<Address, HashMap<Address, Amount>>,
    nonces: HashMap<Address, Nonce>,
    used_authorizations: HashMap<Address, HashSet<AuthorizationHash>>,
}

impl Ledger {
    /// Creates a genesis ledger with no parent and empty history.
    pub fn create(
        id: LedgerId,
        metadata: LedgerMetadata,
        controller: Address,
        transfers_enabled: bool,
        created_at_marker: Marker,
    ) -> Self {
        Self {
            id,
            metadata,
            controller,
            transfers_enabled,
            created_at_marker,
            fork_point: None,
            balances: HashMap::new(),
            total_supply: CheckpointStore::new(),
            allowances: HashMap::new(),
            nonces: HashMap::new(),
            used_authorizations: HashMap::new(),
        }
    }

    /// Creates a forked ledger.
    ///
    /// Balance history is never copied -- the empty local stores delegate
    /// to the parent through the universe. `initial_supply` is the one
    /// exception: when the fork wants a starting supply different from the
    /// parent's, a single eager supply checkpoint is written at the fork
    /// marker. Allowances, nonces, and used hashes always start empty.
    pub fn forked(
        id: LedgerId,
        metadata: LedgerMetadata,
        controller: Address,
        transfers_enabled: bool,
        created_at_marker: Marker,
        fork_point: ForkPoint,
        initial_supply: Option<Amount>,
    ) -> Self {
        let mut total_supply = CheckpointStore::new();
        if let Some(supply) = initial_supply {
            // Fresh store, first append: cannot fail.
            let _ = total_supply.append(fork_point.fork_marker, supply);
        }
        Self {
            id,
            metadata,
            controller,
            transfers_enabled,
            created_at_marker,
            fork_point: Some(fork_point),
            balances: HashMap::new(),
            total_supply,
            allowances: HashMap::new(),
            nonces: HashMap::new(),
            used_authorizations: HashMap::new(),
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn id(&self) -> LedgerId {
        self.id
    }

    pub fn metadata(&self) -> &LedgerMetadata {
        &self.metadata
    }

    pub fn controller(&self) -> Address {
        self.controller
    }

    pub fn transfers_enabled(&self) -> bool {
        self.transfers_enabled
    }

    pub fn created_at_marker(&self) -> Marker {
        self.created_at_marker
    }

    pub fn fork_point(&self) -> Option<&ForkPoint> {
        self.fork_point.as_ref()
    }

    pub fn is_fork(&self) -> bool {
        self.fork_point.is_some()
    }

    /// The ledger's own address in account space. Funds must never be
    /// transferred here; nothing can sign for it.
    pub fn address(&self) -> Address {
        self.id.address()
    }

    // -- local reads --------------------------------------------------------

    /// Balance of `who` at `marker` from local history only. `None` means
    /// the local history does not cover the marker and the caller should
    /// delegate to the parent (or conclude zero for a genesis ledger).
    pub fn local_balance_at(&self, who: &Address, marker: Marker) -> Option<Amount> {
        self.balances.get(who).and_then(|store| store.value_at(marker))
    }

    /// Total supply at `marker` from local history only.
    pub fn local_supply_at(&self, marker: Marker) -> Option<Amount> {
        self.total_supply.value_at(marker)
    }

    /// Current allowance from `owner` to `spender`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|per_owner| per_owner.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// The nonce the owner's next allowance authorization must carry.
    pub fn nonce_of(&self, owner: &Address) -> Nonce {
        self.nonces.get(owner).copied().unwrap_or(0)
    }

    /// True if `owner` has already consumed this transfer authorization.
    pub fn is_authorization_used(&self, owner: &Address, hash: &AuthorizationHash) -> bool {
        self.used_authorizations
            .get(owner)
            .is_some_and(|hashes| hashes.contains(hash))
    }

    /// Number of balance checkpoints across all accounts, for diagnostics.
    pub fn checkpoint_count(&self) -> usize {
        self.total_supply.len() + self.balances.values().map(CheckpointStore::len).sum::<usize>()
    }

    // -- administrative mutators ---------------------------------------------

    pub fn set_transfers_enabled(&mut self, enabled: bool) {
        self.transfers_enabled = enabled;
    }

    pub fn set_controller(&mut self, new_controller: Address) {
        self.controller = new_controller;
    }

    // -- value mutators -----------------------------------------------------
    //
    // Callers pass balances already resolved through the fork chain. Each
    // mutator validates every condition before its first write, so failures
    // leave the ledger byte-for-byte unchanged.

    /// Moves `amount` from `from` to `to`, writing one checkpoint per side.
    pub fn record_transfer(
        &mut self,
        from: Address,
        from_balance: Amount,
        to: Address,
        to_balance: Amount,
        amount: Amount,
        marker: Marker,
    ) -> Result<(), LedgerError> {
        self.guard_fork_boundary(marker)?;
        self.guard_balance_marker(&from, marker)?;
        self.guard_balance_marker(&to, marker)?;

        let new_from = from_balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account: from,
                available: from_balance,
                requested: amount,
            })?;

        if from == to {
            // Net-zero move. Record the touch so the history shows it.
            self.balances.entry(from).or_default().append(marker, from_balance)?;
            return Ok(());
        }

        let new_to = to_balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                current: to_balance,
                increment: amount,
            })?;

        self.balances.entry(from).or_default().append(marker, new_from)?;
        self.balances.entry(to).or_default().append(marker, new_to)?;
        Ok(())
    }

    /// Creates `amount` new units for `to`. Returns the new total supply.
    pub fn record_mint(
        &mut self,
        to: Address,
        to_balance: Amount,
        supply: Amount,
        amount: Amount,
        marker: Marker,
    ) -> Result<Amount, LedgerError> {
        self.guard_fork_boundary(marker)?;
        self.guard_supply_marker(marker)?;
        self.guard_balance_marker(&to, marker)?;

        // Supply and recipient balance are checked independently: either
        // sum exceeding the range rejects the whole mint.
        let new_supply = supply.checked_add(amount).ok_or(LedgerError::Overflow {
            current: supply,
            increment: amount,
        })?;
        let new_to = to_balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                current: to_balance,
                increment: amount,
            })?;

        self.total_supply.append(marker, new_supply)?;
        self.balances.entry(to).or_default().append(marker, new_to)?;
        Ok(new_supply)
    }

    /// Destroys `amount` units held by `from`. Returns the new total supply.
    ///
    /// Both the holder's balance and the recorded supply must cover the
    /// amount. On a fork whose supply was overridden below the inherited
    /// balances, the supply can be the binding constraint.
    pub fn record_burn(
        &mut self,
        from: Address,
        from_balance: Amount,
        supply: Amount,
        amount: Amount,
        marker: Marker,
    ) -> Result<Amount, LedgerError> {
        self.guard_fork_boundary(marker)?;
        self.guard_supply_marker(marker)?;
        self.guard_balance_marker(&from, marker)?;

        let new_from = from_balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account: from,
                available: from_balance,
                requested: amount,
            })?;
        let new_supply = supply
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account: from,
                available: supply,
                requested: amount,
            })?;

        self.total_supply.append(marker, new_supply)?;
        self.balances.entry(from).or_default().append(marker, new_from)?;
        Ok(new_supply)
    }

    // -- allowance mutators --------------------------------------------------

    /// Sets the allowance from `owner` to `spender`. Zero clears the entry.
    pub fn set_allowance(&mut self, owner: Address, spender: Address, amount: Amount) {
        if amount == 0 {
            if let Some(per_owner) = self.allowances.get_mut(&owner) {
                per_owner.remove(&spender);
                if per_owner.is_empty() {
                    self.allowances.remove(&owner);
                }
            }
        } else {
            self.allowances.entry(owner).or_default().insert(spender, amount);
        }
    }

    /// Subtracts a spent amount from an allowance. Callers verify
    /// sufficiency up front; underflow here is state corruption.
    pub fn debit_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let available = self.allowance(&owner, &spender);
        let remaining =
            available
                .checked_sub(amount)
                .ok_or(LedgerError::InsufficientAllowance {
                    owner,
                    spender,
                    available,
                    requested: amount,
                })?;
        self.set_allowance(owner, spender, remaining);
        Ok(())
    }

    // -- replay-protection mutators -------------------------------------------

    /// Advances the owner's allowance-authorization counter by one.
    pub fn increment_nonce(&mut self, owner: Address) {
        *self.nonces.entry(owner).or_insert(0) += 1;
    }

    /// Permanently consumes a transfer-authorization hash for `owner`.
    pub fn mark_authorization_used(&mut self, owner: Address, hash: AuthorizationHash) {
        self.used_authorizations.entry(owner).or_default().insert(hash);
    }

    // -- write guards ---------------------------------------------------------

    // Writes on a fork must land strictly after the fork marker, otherwise
    // they would rewrite history the parent still owns.
    fn guard_fork_boundary(&self, marker: Marker) -> Result<(), LedgerError> {
        if let Some(fork_point) = &self.fork_point {
            if marker <= fork_point.fork_marker {
                return Err(LedgerError::write_before_fork(
                    marker,
                    fork_point.fork_marker,
                ));
            }
        }
        Ok(())
    }

    // The mutators write up to two checkpoint stores. Checking marker
    // monotonicity for every store up front keeps a failure from leaving
    // one store written and the other not.
    fn guard_balance_marker(&self, who: &Address, marker: Marker) -> Result<(), LedgerError> {
        match self.balances.get(who).and_then(CheckpointStore::latest_marker) {
            Some(latest) if latest > marker => Err(LedgerError::invariant(format!(
                "balance write for {who} at marker {marker} precedes checkpoint at {latest}"
            ))),
            _ => Ok(()),
        }
    }

    fn guard_supply_marker(&self, marker: Marker) -> Result<(), LedgerError> {
        match self.total_supply.latest_marker() {
            Some(latest) if latest > marker => Err(LedgerError::invariant(format!(
                "supply write at marker {marker} precedes checkpoint at {latest}"
            ))),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
