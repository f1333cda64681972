//! Points Ledger Engine
//!
//! The core of the loyalty points service: an append-only ledger of point-affecting events per
//! member, a cached balance projection kept transactionally in step with the ledger, and tier
//! computation as a pure function of balance. The library is divided into:
//!
//! 1. Database management ([`mod@db`]). SQLite is the supported backend. Callers should not
//!    touch the database directly; the data types in [`db_types`] are public, the queries are
//!    not. Backends implement the traits in [`traits`].
//! 2. The public API ([`LedgerApi`] for mutations and sweeps, [`BalanceApi`] for reads). All
//!    mutations for one member are serialized through a per-member lock and either fully
//!    commit or leave no trace.
//!
//! The engine also emits events (tier changes, expiry sweeps) through a small hook framework
//! in [`events`]; delivery is fire-and-forget.

mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
mod ledger_api;
pub mod tier;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{db_url, new_pool, run_migrations, SqliteDatabase};
pub use ledger_api::{BalanceApi, BalanceApiError, LedgerApi, LedgerApiError, LockTimeout, MemberLocks};
