//! # Checkpoint Store
//!
//! The storage primitive underneath every balance and every supply figure:
//! an append-only list of `(marker, value)` pairs, ordered by marker. A
//! value's history is the list itself; its current value is the last entry;
//! its value "as of marker M" is the last entry at or before M, found by
//! binary search.
//!
//! This is what makes historical reads and cheap forks possible. Nothing is
//! ever rewritten in place except a second write within the same marker,
//! which collapses into the existing entry so that one marker never maps to
//! two values.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::types::{Amount, Marker};

/// One point in a value's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Sequence marker at which the value took effect.
    pub marker: Marker,
    /// The value from this marker onward.
    pub value: Amount,
}

/// An ordered history of checkpoints for a single key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointStore {
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` as effective from `marker` onward.
    ///
    /// Markers must be non-decreasing across appends. A second append at
    /// the latest marker overwrites that entry instead of growing the list,
    /// so several writes within one marker leave exactly one checkpoint.
    /// An append at an earlier marker is a sequencing bug and is rejected.
    pub fn append(&mut self, marker: Marker, value: Amount) -> Result<(), LedgerError> {
        match self.checkpoints.last_mut() {
            Some(last) if last.marker == marker => {
                last.value = value;
                Ok(())
            }
            Some(last) if last.marker > marker => Err(LedgerError::invariant(format!(
                "checkpoint marker {marker} precedes latest marker {}",
                last.marker
            ))),
            _ => {
                self.checkpoints.push(Checkpoint { marker, value });
                Ok(())
            }
        }
    }

    /// Returns the value in effect at `marker`: the value of the latest
    /// checkpoint at or before it.
    ///
    /// `None` means this history cannot answer the query -- either the
    /// store is empty or the marker predates the first checkpoint. The
    /// caller decides whether that means zero or a delegated lookup in a
    /// parent ledger.
    pub fn value_at(&self, marker: Marker) -> Option<Amount> {
        let first = self.checkpoints.first()?;
        if marker < first.marker {
            return None;
        }
        // Hot path: queries at or beyond the latest write, which is what
        // every current-value read is.
        let last = self.checkpoints[self.checkpoints.len() - 1];
        if marker >= last.marker {
            return Some(last.value);
        }

        // partition_point gives the first index with cp.marker > marker;
        // the entry before it is the latest one at or before the query.
        let idx = self
            .checkpoints
            .partition_point(|cp| cp.marker <= marker);
        Some(self.checkpoints[idx - 1].value)
    }

    /// The current value, if any checkpoint exists.
    pub fn latest(&self) -> Option<Amount> {
        self.checkpoints.last().map(|cp| cp.value)
    }

    /// Marker of the most recent checkpoint.
    pub fn latest_marker(&self) -> Option<Marker> {
        self.checkpoints.last().map(|cp| cp.marker)
    }

    /// Marker of the oldest checkpoint.
    pub fn first_marker(&self) -> Option<Marker> {
        self.checkpoints.first().map(|cp| cp.marker)
    }

    /// Number of checkpoints recorded.
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// True if no checkpoint has ever been recorded.
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// The full history, oldest first.
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
