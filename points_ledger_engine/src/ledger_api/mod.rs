mod balance_api;
mod errors;
mod ledger_flow_api;
mod member_lock;

pub use balance_api::BalanceApi;
pub use errors::{BalanceApiError, LedgerApiError};
pub use ledger_flow_api::LedgerApi;
pub use member_lock::{LockTimeout, MemberLocks};
