//! `SqliteDatabase` is the concrete SQLite implementation of the ledger storage traits.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqlitePool;

use super::{balances, db_url, ledger, new_pool};
use crate::{
    db_types::{LedgerEntry, MemberBalance, MemberId, MemberSummary, NewLedgerEntry, Pagination},
    tier::TierLadder,
    traits::{AppliedEntry, BalanceManagement, InsertEntryResult, LedgerDatabase, LedgerStoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `PLG_DATABASE_URL` (or the default path).
    pub async fn new(max_connections: u32) -> Result<Self, LedgerStoreError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerStoreError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl BalanceManagement for SqliteDatabase {
    async fn fetch_balance(&self, member_id: &MemberId) -> Result<Option<MemberBalance>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        balances::fetch_balance(member_id, &mut conn).await
    }

    async fn history_for_member(
        &self,
        member_id: &MemberId,
        pagination: Pagination,
    ) -> Result<Vec<LedgerEntry>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        ledger::entries_for_member(member_id, pagination, &mut conn).await
    }

    async fn summary_for_member(&self, member_id: &MemberId) -> Result<MemberSummary, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        ledger::summary_for_member(member_id, &mut conn).await
    }
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// In one transaction: create the balance row if needed, bounce duplicate entry ids back
    /// with the current state, insert the entry, and project it onto the balance under the
    /// version guard. Any error rolls the whole unit back.
    async fn append_entry(&self, entry: NewLedgerEntry, ladder: &TierLadder) -> Result<AppliedEntry, LedgerStoreError> {
        let mut tx = self.pool.begin().await?;
        let balance = balances::fetch_or_create_balance(&entry.member_id, ladder.lowest_tier(), &mut tx).await?;
        let stored = match ledger::idempotent_insert(entry, &mut tx).await? {
            InsertEntryResult::AlreadyExists(existing) => {
                // Nothing to write: report the state the original submission produced.
                tx.commit().await?;
                debug!("🗃️ Entry [{}] already applied, returning prior state", existing.entry_id);
                return Ok(AppliedEntry {
                    entry: existing,
                    balance: balance.current_balance,
                    version: balance.version,
                    previous_tier: balance.tier_name.clone(),
                    tier: balance.tier_name,
                    duplicate: true,
                });
            },
            InsertEntryResult::Inserted(stored) => stored,
        };
        let projected = balance.current_balance + stored.amount;
        if projected.value() < 0 {
            // Dropping the transaction rolls back the insert.
            return Err(LedgerStoreError::InsufficientBalance {
                member: stored.member_id,
                balance: balance.current_balance,
                delta: stored.amount,
            });
        }
        let new_tier = ladder.tier_for(projected).to_string();
        let update = balances::apply_delta(&stored.member_id, stored.amount, balance.version, &new_tier, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Entry [{}] {} committed for member {}. Balance {} at version {}",
            stored.entry_id, stored.kind, stored.member_id, update.current_balance, update.version
        );
        Ok(AppliedEntry {
            entry: stored,
            balance: update.current_balance,
            version: update.version,
            previous_tier: balance.tier_name,
            tier: new_tier,
            duplicate: false,
        })
    }

    async fn members_with_stale_earns(&self, now: DateTime<Utc>) -> Result<Vec<MemberId>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        ledger::members_with_stale_earns(now, &mut conn).await
    }

    async fn full_ledger_for_member(&self, member_id: &MemberId) -> Result<Vec<LedgerEntry>, LedgerStoreError> {
        let mut conn = self.pool.acquire().await?;
        ledger::full_ledger_for_member(member_id, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), LedgerStoreError> {
        self.pool.close().await;
        Ok(())
    }
}
