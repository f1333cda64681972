use plg_common::Points;
use serde::{Deserialize, Serialize};

use crate::db_types::LedgerEntry;

/// Outcome of an idempotent ledger insert.
#[derive(Debug, Clone)]
pub enum InsertEntryResult {
    Inserted(LedgerEntry),
    /// The entry id was seen before; the original row is returned untouched.
    AlreadyExists(LedgerEntry),
}

/// The state of the ledger after an append, whether it committed a new entry or replayed a
/// duplicate submission.
#[derive(Debug, Clone)]
pub struct AppliedEntry {
    pub entry: LedgerEntry,
    pub balance: Points,
    pub version: i64,
    /// Tier cached on the balance row before this append.
    pub previous_tier: String,
    pub tier: String,
    /// True when the idempotency key had already been applied and nothing was written.
    pub duplicate: bool,
}

impl AppliedEntry {
    pub fn tier_changed(&self) -> bool {
        !self.duplicate && self.previous_tier != self.tier
    }
}

/// Tally of one expiration sweep run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepOutcome {
    /// Members that held at least one overdue earn entry.
    pub members_swept: usize,
    /// Expire entries appended in this run.
    pub entries_expired: usize,
    /// Total points removed. Always non-negative.
    pub points_expired: Points,
    /// Members skipped because their lock could not be acquired in time.
    pub members_skipped: usize,
}

impl SweepOutcome {
    pub fn absorb(&mut self, entries: usize, points: Points) {
        self.members_swept += 1;
        self.entries_expired += entries;
        self.points_expired += points;
    }
}
