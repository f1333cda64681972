//! Data types shared between the storage backends and the public APIs.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use plg_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------     MemberId       ---------------------------------------------------------
/// A lightweight wrapper around the member identifier issued by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct MemberId(pub String);

impl FromStr for MemberId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl<S: Into<String>> From<S> for MemberId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl MemberId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------  TransactionKind   ---------------------------------------------------------
/// The closed set of ledger entry kinds. Every consumption site matches exhaustively, so a new
/// kind cannot be silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Points earned from a stay or booking. Carries an expiry date.
    Earn,
    /// Points spent by the member.
    Redeem,
    /// Points removed because an earn entry passed its TTL.
    Expire,
    /// Administrator-granted points.
    AdminAward,
    /// Administrator-removed points.
    AdminDeduct,
}

impl TransactionKind {
    /// Kinds that add points to the member's pool.
    pub fn is_credit(&self) -> bool {
        matches!(self, TransactionKind::Earn | TransactionKind::AdminAward)
    }

    /// Kinds that remove points from the member's pool.
    pub fn is_debit(&self) -> bool {
        matches!(self, TransactionKind::Redeem | TransactionKind::Expire | TransactionKind::AdminDeduct)
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Earn => write!(f, "earn"),
            TransactionKind::Redeem => write!(f, "redeem"),
            TransactionKind::Expire => write!(f, "expire"),
            TransactionKind::AdminAward => write!(f, "admin_award"),
            TransactionKind::AdminDeduct => write!(f, "admin_deduct"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid transaction kind: {0}")]
pub struct KindConversionError(String);

impl FromStr for TransactionKind {
    type Err = KindConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earn" => Ok(Self::Earn),
            "redeem" => Ok(Self::Redeem),
            "expire" => Ok(Self::Expire),
            "admin_award" => Ok(Self::AdminAward),
            "admin_deduct" => Ok(Self::AdminDeduct),
            s => Err(KindConversionError(s.to_string())),
        }
    }
}

//--------------------------------------    LedgerEntry     ---------------------------------------------------------
/// A committed ledger entry. Entries are append-only; corrections are new compensating entries.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    /// The caller-supplied idempotency key. Unique across all entries.
    pub entry_id: String,
    pub member_id: MemberId,
    pub kind: TransactionKind,
    /// Signed amount. Credits positive, debits negative.
    pub amount: Points,
    /// The originating event (stay id, booking id, redemption id).
    pub source_ref: String,
    /// Who caused the entry: the member, or an administrator.
    pub actor_id: String,
    pub note: Option<String>,
    /// Set only for `Earn` entries.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   NewLedgerEntry   ---------------------------------------------------------
/// A ledger entry that has not been committed yet.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub entry_id: String,
    pub member_id: MemberId,
    pub kind: TransactionKind,
    pub amount: Points,
    pub source_ref: String,
    pub actor_id: String,
    pub note: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NewLedgerEntry {
    pub fn earn(
        entry_id: String,
        member_id: MemberId,
        amount: Points,
        source_ref: String,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            entry_id,
            actor_id: member_id.to_string(),
            member_id,
            kind: TransactionKind::Earn,
            amount: amount.magnitude(),
            source_ref,
            note: None,
            expires_at: Some(now + ttl),
            created_at: now,
        }
    }

    pub fn redeem(entry_id: String, member_id: MemberId, amount: Points, source_ref: String) -> Self {
        Self {
            entry_id,
            actor_id: member_id.to_string(),
            member_id,
            kind: TransactionKind::Redeem,
            amount: -amount.magnitude(),
            source_ref,
            note: None,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// An administrative adjustment. Positive amounts become awards, negative ones deductions.
    pub fn admin_adjust(
        entry_id: String,
        member_id: MemberId,
        amount: Points,
        actor_id: String,
        reason: String,
    ) -> Self {
        let kind = if amount.is_negative() { TransactionKind::AdminDeduct } else { TransactionKind::AdminAward };
        Self {
            entry_id,
            member_id,
            kind,
            amount,
            source_ref: format!("admin-{actor_id}"),
            actor_id,
            note: Some(reason),
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// A compensating entry for the unconsumed remainder of an expired earn entry.
    /// The entry id is derived from the member and the earn entry's source ref, so repeated
    /// sweeps produce the same key and the insert stays idempotent. Source refs are only
    /// unique within a member, hence the member in the key.
    pub fn expire(member_id: MemberId, remaining: Points, source_ref: String, now: DateTime<Utc>) -> Self {
        Self {
            entry_id: format!("expire-{member_id}-{source_ref}"),
            member_id,
            kind: TransactionKind::Expire,
            amount: -remaining.magnitude(),
            source_ref,
            actor_id: "sweeper".to_string(),
            note: None,
            expires_at: None,
            created_at: now,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.note = Some(note);
        self
    }
}

//--------------------------------------   MemberBalance    ---------------------------------------------------------
/// The cached per-member aggregate. `current_balance` always equals the signed sum of the
/// member's ledger entries; `version` increments on every committed mutation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MemberBalance {
    pub member_id: MemberId,
    pub current_balance: Points,
    pub version: i64,
    /// Last tier computed for this balance. A display cache, recomputable at any time.
    pub tier_name: String,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   MemberSummary    ---------------------------------------------------------
/// Lifetime totals for a member, aggregated straight from the ledger.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MemberSummary {
    pub total_earned: Points,
    pub total_redeemed: Points,
    pub total_expired: Points,
    pub total_deducted: Points,
    pub current_balance: Points,
    pub entry_count: i64,
    pub last_entry_at: Option<DateTime<Utc>>,
}

//--------------------------------------     Pagination     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { offset: 0, limit: 50 }
    }
}

impl Pagination {
    /// One-based page number with the given page size.
    pub fn page(page: i64, page_size: i64) -> Self {
        let limit = page_size.max(1);
        let offset = (page.max(1) - 1) * limit;
        Self { offset, limit }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kind_round_trip() {
        for kind in [
            TransactionKind::Earn,
            TransactionKind::Redeem,
            TransactionKind::Expire,
            TransactionKind::AdminAward,
            TransactionKind::AdminDeduct,
        ] {
            assert_eq!(kind.to_string().parse::<TransactionKind>().unwrap(), kind);
        }
        assert!("points".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn kind_direction() {
        assert!(TransactionKind::Earn.is_credit());
        assert!(TransactionKind::AdminAward.is_credit());
        assert!(TransactionKind::Redeem.is_debit());
        assert!(TransactionKind::Expire.is_debit());
        assert!(TransactionKind::AdminDeduct.is_debit());
    }

    #[test]
    fn redeem_amount_is_negative() {
        let entry =
            NewLedgerEntry::redeem("k1".into(), "m1".into(), Points::from(60), "reward-9".into());
        assert_eq!(entry.amount, Points::from(-60));
        assert_eq!(entry.kind, TransactionKind::Redeem);
    }

    #[test]
    fn adjust_kind_follows_sign() {
        let award =
            NewLedgerEntry::admin_adjust("k2".into(), "m1".into(), Points::from(25), "adm".into(), "promo".into());
        assert_eq!(award.kind, TransactionKind::AdminAward);
        let deduct =
            NewLedgerEntry::admin_adjust("k3".into(), "m1".into(), Points::from(-25), "adm".into(), "fraud".into());
        assert_eq!(deduct.kind, TransactionKind::AdminDeduct);
        assert_eq!(deduct.amount, Points::from(-25));
    }

    #[test]
    fn pagination_pages() {
        let p = Pagination::page(3, 20);
        assert_eq!(p.offset, 40);
        assert_eq!(p.limit, 20);
        let clamped = Pagination::page(0, 0);
        assert_eq!(clamped.offset, 0);
        assert_eq!(clamped.limit, 1);
    }
}
