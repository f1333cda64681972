mod data_objects;
mod ledger_store;

pub use data_objects::{AppliedEntry, InsertEntryResult, SweepOutcome};
pub use ledger_store::{BalanceManagement, LedgerDatabase, LedgerStoreError};
