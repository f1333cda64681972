//! FIFO consumption replay.
//!
//! The ledger never stores how much of an earn entry is still unspent. When the sweeper needs
//! the unconsumed remainder of an expired earn entry, it replays the member's history in
//! chronological order: debits deplete the oldest credit with points remaining first, and an
//! expire entry zeroes out the earn entry it references. Replaying is cheap (one pass over the
//! member's entries) and cannot drift from the ledger, which is the source of truth.

use chrono::{DateTime, Utc};
use plg_common::Points;

use crate::db_types::{LedgerEntry, TransactionKind};

/// The unconsumed remainder of a single earn entry after replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarnRemainder {
    pub entry_id: String,
    pub source_ref: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub remaining: Points,
}

struct PoolEntry {
    kind: TransactionKind,
    source_ref: String,
    remaining: i64,
}

/// Replays `entries` (chronological, oldest first) and returns the remaining amount of every
/// earn entry. Admin awards join the consumption pool, since debits draw from the whole
/// balance, but only earn entries are reported: they alone carry an expiry date.
pub fn replay_remainders(entries: &[LedgerEntry]) -> Vec<EarnRemainder> {
    let mut pool: Vec<PoolEntry> = Vec::new();
    let mut earns: Vec<(usize, &LedgerEntry)> = Vec::new();

    for entry in entries {
        match entry.kind {
            TransactionKind::Earn | TransactionKind::AdminAward => {
                if entry.kind == TransactionKind::Earn {
                    earns.push((pool.len(), entry));
                }
                pool.push(PoolEntry {
                    kind: entry.kind,
                    source_ref: entry.source_ref.clone(),
                    remaining: entry.amount.value(),
                });
            },
            TransactionKind::Redeem | TransactionKind::AdminDeduct => {
                let mut debit = -entry.amount.value();
                for credit in pool.iter_mut() {
                    if debit == 0 {
                        break;
                    }
                    let consumed = credit.remaining.min(debit);
                    credit.remaining -= consumed;
                    debit -= consumed;
                }
                // Any leftover debit means the balance invariant was violated upstream;
                // replay stays total and simply runs the pool dry.
            },
            TransactionKind::Expire => {
                if let Some(earn) = pool
                    .iter_mut()
                    .find(|c| c.kind == TransactionKind::Earn && c.source_ref == entry.source_ref && c.remaining > 0)
                {
                    earn.remaining = 0;
                }
            },
        }
    }

    earns
        .into_iter()
        .map(|(idx, entry)| EarnRemainder {
            entry_id: entry.entry_id.clone(),
            source_ref: entry.source_ref.clone(),
            expires_at: entry.expires_at,
            remaining: Points::from(pool[idx].remaining),
        })
        .collect()
}

/// Earn entries past their TTL that still hold unconsumed points.
pub fn stale_earns(remainders: &[EarnRemainder], now: DateTime<Utc>) -> Vec<EarnRemainder> {
    remainders
        .iter()
        .filter(|r| r.remaining.is_positive() && r.expires_at.map(|exp| exp <= now).unwrap_or(false))
        .cloned()
        .collect()
}
