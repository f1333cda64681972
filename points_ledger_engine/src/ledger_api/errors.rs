use plg_common::Points;
use thiserror::Error;

use crate::{db_types::MemberId, ledger_api::member_lock::LockTimeout, traits::LedgerStoreError};

#[derive(Debug, Clone, Error)]
pub enum LedgerApiError {
    #[error("Member {member} has {balance} available, cannot apply a debit of {requested}")]
    InsufficientBalance { member: MemberId, balance: Points, requested: Points },
    #[error("Member {0} is busy. Retry the request later.")]
    Busy(MemberId),
    #[error("Invalid adjustment: {0}")]
    InvalidAdjustment(String),
    #[error("Invalid mutation request: {0}")]
    InvalidRequest(String),
    #[error("The requested member {0} does not exist")]
    MemberNotFound(MemberId),
    #[error("Storage failure: {0}")]
    DatabaseError(String),
}

impl From<LedgerStoreError> for LedgerApiError {
    fn from(e: LedgerStoreError) -> Self {
        match e {
            LedgerStoreError::DatabaseError(s) => Self::DatabaseError(s),
            LedgerStoreError::InsufficientBalance { member, balance, delta } => {
                Self::InsufficientBalance { member, balance, requested: delta.magnitude() }
            },
            // A version conflict that reaches this conversion has exhausted its retries.
            LedgerStoreError::StaleVersion(member) => Self::Busy(member),
            LedgerStoreError::MemberNotFound(member) => Self::MemberNotFound(member),
            LedgerStoreError::EntryNotFound(id) => Self::DatabaseError(format!("Ledger entry {id} went missing")),
        }
    }
}

impl From<LockTimeout> for LedgerApiError {
    fn from(e: LockTimeout) -> Self {
        Self::Busy(e.0)
    }
}

#[derive(Debug, Clone, Error)]
pub enum BalanceApiError {
    #[error("Storage failure: {0}")]
    DatabaseError(String),
    #[error("The requested member {0} does not exist")]
    MemberNotFound(MemberId),
}

impl From<LedgerStoreError> for BalanceApiError {
    fn from(e: LedgerStoreError) -> Self {
        match e {
            LedgerStoreError::MemberNotFound(member) => Self::MemberNotFound(member),
            other => Self::DatabaseError(other.to_string()),
        }
    }
}
