//! Request and response payloads for the mutation API.

use chrono::{DateTime, Utc};
use plg_common::Points;
use serde::{Deserialize, Serialize};
use points_ledger_engine::traits::{AppliedEntry, SweepOutcome};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarnParams {
    pub member_id: String,
    pub amount: i64,
    pub source_ref: String,
    pub idempotency_key: String,
    /// Overrides the configured default TTL for this earn entry.
    pub ttl_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemParams {
    pub member_id: String,
    pub amount: i64,
    pub source_ref: String,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAdjustParams {
    pub member_id: String,
    /// Signed: positive awards, negative deducts.
    pub amount: i64,
    pub actor_id: String,
    pub reason: String,
    pub idempotency_key: String,
}

/// The state every successful mutation reports back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResult {
    pub balance: Points,
    pub tier: String,
}

impl From<AppliedEntry> for MutationResult {
    fn from(applied: AppliedEntry) -> Self {
        Self { balance: applied.balance, tier: applied.tier }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResult {
    pub balance: Points,
    pub tier: String,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResult {
    pub expired: usize,
    pub points_expired: Points,
    pub members_swept: usize,
    pub members_skipped: usize,
}

impl From<SweepOutcome> for SweepResult {
    fn from(outcome: SweepOutcome) -> Self {
        Self {
            expired: outcome.entries_expired,
            points_expired: outcome.points_expired,
            members_swept: outcome.members_swept,
            members_skipped: outcome.members_skipped,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}
