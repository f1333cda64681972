use chrono::{DateTime, Utc};
use plg_common::Points;
use serde::{Deserialize, Serialize};

use crate::db_types::MemberId;

/// Published after a committed mutation moves a member across a tier threshold, in either
/// direction. Delivery is fire-and-forget; consumers must tolerate missing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierChangedEvent {
    pub member_id: MemberId,
    pub old_tier: String,
    pub new_tier: String,
    pub balance: Points,
}

impl TierChangedEvent {
    pub fn new(member_id: MemberId, old_tier: String, new_tier: String, balance: Points) -> Self {
        Self { member_id, old_tier, new_tier, balance }
    }
}

/// Published once per member per sweep run that actually expired something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsExpiredEvent {
    pub member_id: MemberId,
    /// Total points removed for this member in the run. Always positive.
    pub amount: Points,
    pub entries: usize,
    pub swept_at: DateTime<Utc>,
}
