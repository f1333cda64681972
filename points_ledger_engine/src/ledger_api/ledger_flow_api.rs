use std::{fmt::Debug, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use log::*;
use plg_common::Points;

use crate::{
    db_types::{MemberId, NewLedgerEntry},
    events::{EventProducers, PointsExpiredEvent, TierChangedEvent},
    helpers::{replay_remainders, stale_earns},
    ledger_api::{errors::LedgerApiError, member_lock::MemberLocks},
    tier::TierLadder,
    traits::{AppliedEntry, LedgerDatabase, SweepOutcome},
};

/// Version conflicts are retried this many times under the member lock before the request is
/// bounced back as busy.
const MAX_VERSION_RETRIES: u32 = 3;

/// `LedgerApi` is the primary API for mutating a member's points ledger: earning, redemption,
/// administrative adjustment and expiry sweeps all funnel through it. It owns the per-member
/// serialization and the bounded optimistic retry; the storage backend owns atomicity.
pub struct LedgerApi<B> {
    db: B,
    ladder: Arc<TierLadder>,
    locks: MemberLocks,
    producers: EventProducers,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B, ladder: Arc<TierLadder>, producers: EventProducers) -> Self {
        Self { db, ladder, locks: MemberLocks::default(), producers }
    }

    pub fn with_locks(mut self, locks: MemberLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn ladder(&self) -> &TierLadder {
        &self.ladder
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> LedgerApi<B>
where B: LedgerDatabase
{
    /// Records earned points for a member. The amount must be positive; the points carry an
    /// expiry `ttl` from now. Resubmitting the same idempotency key returns the prior result.
    pub async fn earn(
        &self,
        member_id: MemberId,
        amount: Points,
        source_ref: String,
        idempotency_key: String,
        ttl: Duration,
    ) -> Result<AppliedEntry, LedgerApiError> {
        if !amount.is_positive() {
            return Err(LedgerApiError::InvalidRequest(format!("Earn amount must be positive, got {amount}")));
        }
        validate_key(&idempotency_key)?;
        let entry = NewLedgerEntry::earn(idempotency_key, member_id, amount, source_ref, ttl);
        self.apply_serialized(entry).await
    }

    /// Redeems points. The amount is given as a positive magnitude and recorded as a debit.
    /// Fails with `InsufficientBalance` if the member's balance cannot cover it; nothing is
    /// committed in that case.
    pub async fn redeem(
        &self,
        member_id: MemberId,
        amount: Points,
        source_ref: String,
        idempotency_key: String,
    ) -> Result<AppliedEntry, LedgerApiError> {
        if !amount.is_positive() {
            return Err(LedgerApiError::InvalidRequest(format!("Redeem amount must be positive, got {amount}")));
        }
        validate_key(&idempotency_key)?;
        let entry = NewLedgerEntry::redeem(idempotency_key, member_id, amount, source_ref);
        self.apply_serialized(entry).await
    }

    /// Applies an administrator-initiated adjustment. Positive amounts award points, negative
    /// amounts deduct them, subject to the same non-negative balance invariant as redemptions.
    /// A capability token (`actor_id`) and a reason are required for the audit trail; their
    /// validation beyond presence is the caller's concern.
    pub async fn admin_adjust(
        &self,
        member_id: MemberId,
        amount: Points,
        actor_id: String,
        reason: String,
        idempotency_key: String,
    ) -> Result<AppliedEntry, LedgerApiError> {
        if actor_id.trim().is_empty() {
            return Err(LedgerApiError::InvalidAdjustment("A capability token is required".to_string()));
        }
        if reason.trim().is_empty() {
            return Err(LedgerApiError::InvalidAdjustment("A reason is required".to_string()));
        }
        if amount.is_zero() {
            return Err(LedgerApiError::InvalidAdjustment("Adjustment amount cannot be zero".to_string()));
        }
        validate_key(&idempotency_key)?;
        let entry = NewLedgerEntry::admin_adjust(idempotency_key, member_id, amount, actor_id, reason);
        self.apply_serialized(entry).await
    }

    /// Expires the unconsumed remainder of every earn entry past its TTL.
    ///
    /// Each member is processed under the same lock as live mutations, so a sweep never races
    /// a redemption that is consuming the entry being expired. Runs are idempotent: an entry
    /// that has already been fully expired produces no further action. Members whose lock
    /// cannot be acquired in time are skipped and picked up by the next run.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepOutcome, LedgerApiError> {
        let members = self.db.members_with_stale_earns(now).await?;
        debug!("🕰️ Sweep found {} member(s) with overdue earn entries", members.len());
        let mut outcome = SweepOutcome::default();
        for member in members {
            match self.sweep_member(&member, now).await {
                Ok((entries, points)) => {
                    if entries > 0 {
                        outcome.absorb(entries, points);
                    }
                },
                Err(LedgerApiError::Busy(member)) => {
                    warn!("🕰️ Member {member} was locked for the whole sweep window, skipping until the next run");
                    outcome.members_skipped += 1;
                },
                Err(e) => return Err(e),
            }
        }
        Ok(outcome)
    }

    async fn sweep_member(&self, member_id: &MemberId, now: DateTime<Utc>) -> Result<(usize, Points), LedgerApiError> {
        let _guard = self.locks.acquire(member_id).await?;
        let entries = self.db.full_ledger_for_member(member_id).await?;
        let remainders = replay_remainders(&entries);
        let mut expired_entries = 0usize;
        let mut expired_points = Points::default();
        for stale in stale_earns(&remainders, now) {
            let entry = NewLedgerEntry::expire(member_id.clone(), stale.remaining, stale.source_ref, now);
            let applied = self.apply_with_retries(entry).await?;
            if applied.duplicate {
                continue;
            }
            expired_entries += 1;
            expired_points += applied.entry.amount.magnitude();
            self.call_tier_changed_hook(&applied).await;
        }
        if expired_entries > 0 {
            debug!("🕰️ Expired {expired_points} across {expired_entries} entries for member {member_id}");
            let event = PointsExpiredEvent {
                member_id: member_id.clone(),
                amount: expired_points,
                entries: expired_entries,
                swept_at: now,
            };
            for emitter in &self.producers.points_expired_producer {
                emitter.publish_event(event.clone()).await;
            }
        }
        Ok((expired_entries, expired_points))
    }

    /// Takes the member's lock, then applies the entry with a bounded optimistic retry.
    async fn apply_serialized(&self, entry: NewLedgerEntry) -> Result<AppliedEntry, LedgerApiError> {
        let _guard = self.locks.acquire(&entry.member_id).await?;
        let applied = self.apply_with_retries(entry).await?;
        self.call_tier_changed_hook(&applied).await;
        Ok(applied)
    }

    /// Must be called with the member's lock held.
    async fn apply_with_retries(&self, entry: NewLedgerEntry) -> Result<AppliedEntry, LedgerApiError> {
        let mut attempt = 0;
        loop {
            match self.db.append_entry(entry.clone(), &self.ladder).await {
                Err(crate::traits::LedgerStoreError::StaleVersion(member)) => {
                    attempt += 1;
                    if attempt >= MAX_VERSION_RETRIES {
                        warn!("🔁️ Version conflict for member {member} persisted after {attempt} attempts");
                        return Err(LedgerApiError::Busy(member));
                    }
                    debug!("🔁️ Version conflict for member {member}, retrying ({attempt}/{MAX_VERSION_RETRIES})");
                },
                other => return other.map_err(LedgerApiError::from),
            }
        }
    }

    async fn call_tier_changed_hook(&self, applied: &AppliedEntry) {
        if !applied.tier_changed() {
            return;
        }
        info!(
            "🏅️ Member {} moved from {} to {} at {}",
            applied.entry.member_id, applied.previous_tier, applied.tier, applied.balance
        );
        let event = TierChangedEvent::new(
            applied.entry.member_id.clone(),
            applied.previous_tier.clone(),
            applied.tier.clone(),
            applied.balance,
        );
        for emitter in &self.producers.tier_changed_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}

fn validate_key(idempotency_key: &str) -> Result<(), LedgerApiError> {
    if idempotency_key.trim().is_empty() {
        return Err(LedgerApiError::InvalidRequest("An idempotency key is required".to_string()));
    }
    Ok(())
}
