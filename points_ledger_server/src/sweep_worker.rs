use std::sync::Arc;

use chrono::Utc;
use log::*;
use points_ledger_engine::{events::EventProducers, tier::TierLadder, LedgerApi, MemberLocks, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the expiry sweep worker. Do not await the returned JoinHandle, as it will run
/// indefinitely. The worker shares the server's lock registry, so a sweep and a live mutation
/// for the same member never interleave.
pub fn start_sweep_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    ladder: Arc<TierLadder>,
    locks: MemberLocks,
    interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let api = LedgerApi::new(db, ladder, producers).with_locks(locks);
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Points expiry sweep worker started");
        loop {
            timer.tick().await;
            info!("🕰️ Running points expiry sweep");
            match api.sweep_expired(Utc::now()).await {
                Ok(outcome) => {
                    info!(
                        "🕰️ Sweep complete. {} entries ({}) expired across {} members, {} members skipped",
                        outcome.entries_expired,
                        outcome.points_expired,
                        outcome.members_swept,
                        outcome.members_skipped
                    );
                },
                Err(e) => {
                    error!("🕰️ Error running points expiry sweep: {e}");
                },
            }
        }
    })
}
