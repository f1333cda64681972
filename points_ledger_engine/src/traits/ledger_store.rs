use chrono::{DateTime, Utc};
use plg_common::Points;
use thiserror::Error;

use crate::{
    db_types::{LedgerEntry, MemberBalance, MemberId, MemberSummary, NewLedgerEntry, Pagination},
    tier::TierLadder,
    traits::AppliedEntry,
};

/// Read-only access to balances and history. Reads do not take the per-member lock; they may
/// observe a balance that is about to change, which is a display lag, not a correctness issue.
#[allow(async_fn_in_trait)]
pub trait BalanceManagement: Clone {
    async fn fetch_balance(&self, member_id: &MemberId) -> Result<Option<MemberBalance>, LedgerStoreError>;

    /// Entries for the member, newest first.
    async fn history_for_member(
        &self,
        member_id: &MemberId,
        pagination: Pagination,
    ) -> Result<Vec<LedgerEntry>, LedgerStoreError>;

    /// Lifetime totals aggregated from the ledger.
    async fn summary_for_member(&self, member_id: &MemberId) -> Result<MemberSummary, LedgerStoreError>;
}

/// The contract a storage backend must satisfy to drive the points ledger.
///
/// The one non-negotiable behaviour is `append_entry`: the idempotent ledger insert, the
/// version-guarded balance update and the tier cache refresh happen in one atomic unit, or not
/// at all.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone + BalanceManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Appends `entry` and projects it onto the member's balance in a single transaction.
    ///
    /// * If the entry id was applied before, nothing is written and the prior state comes back
    ///   flagged as a duplicate.
    /// * If the projected balance would drop below zero, fails with `InsufficientBalance` and
    ///   nothing is committed.
    /// * If the balance row moved under us, fails with `StaleVersion`; the caller retries under
    ///   the member lock.
    async fn append_entry(&self, entry: NewLedgerEntry, ladder: &TierLadder) -> Result<AppliedEntry, LedgerStoreError>;

    /// Members holding earn entries past their TTL with no matching expire entry yet.
    async fn members_with_stale_earns(&self, now: DateTime<Utc>) -> Result<Vec<MemberId>, LedgerStoreError>;

    /// The member's full history, oldest first, for consumption replay.
    async fn full_ledger_for_member(&self, member_id: &MemberId) -> Result<Vec<LedgerEntry>, LedgerStoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerStoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerStoreError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Balance for member {0} changed underneath the update")]
    StaleVersion(MemberId),
    #[error("Member {member} has {balance}, cannot apply {delta}")]
    InsufficientBalance { member: MemberId, balance: Points, delta: Points },
    #[error("The requested member {0} does not exist")]
    MemberNotFound(MemberId),
    #[error("The requested ledger entry {0} does not exist")]
    EntryNotFound(String),
}

impl From<sqlx::Error> for LedgerStoreError {
    fn from(e: sqlx::Error) -> Self {
        LedgerStoreError::DatabaseError(e.to_string())
    }
}
