use log::trace;

use crate::{
    db_types::{LedgerEntry, MemberBalance, MemberId, MemberSummary, Pagination},
    ledger_api::errors::BalanceApiError,
    traits::BalanceManagement,
};

/// Read-side API for balances, history and lifetime summaries. None of these calls take the
/// per-member lock; they serve display traffic and may lag an in-flight mutation.
#[derive(Debug, Clone)]
pub struct BalanceApi<B> {
    db: B,
}

impl<B> BalanceApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> BalanceApi<B>
where B: BalanceManagement
{
    /// The member's cached balance and tier. Fails with `MemberNotFound` for members the
    /// ledger has never seen.
    pub async fn balance_for_member(&self, member_id: &MemberId) -> Result<MemberBalance, BalanceApiError> {
        trace!("🧑️ Fetching balance for member {member_id}");
        self.db
            .fetch_balance(member_id)
            .await?
            .ok_or_else(|| BalanceApiError::MemberNotFound(member_id.clone()))
    }

    /// The member's ledger entries, newest first.
    pub async fn history_for_member(
        &self,
        member_id: &MemberId,
        pagination: Pagination,
    ) -> Result<Vec<LedgerEntry>, BalanceApiError> {
        trace!("🧑️ Fetching history for member {member_id}");
        let entries = self.db.history_for_member(member_id, pagination).await?;
        Ok(entries)
    }

    /// Lifetime totals for the member, aggregated from the ledger.
    pub async fn summary_for_member(&self, member_id: &MemberId) -> Result<MemberSummary, BalanceApiError> {
        trace!("🧑️ Fetching summary for member {member_id}");
        let summary = self.db.summary_for_member(member_id).await?;
        Ok(summary)
    }
}
