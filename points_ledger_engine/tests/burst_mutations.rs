use std::{sync::Arc, time::Duration};

use log::*;
use plg_common::Points;
use points_ledger_engine::{
    db_types::MemberId,
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    tier::TierLadder,
    traits::BalanceManagement,
    LedgerApi,
    SqliteDatabase,
};
use tokio::runtime::Runtime;

const NUM_MUTATIONS: u64 = 20;
const RATE: u64 = 100; // mutations per second

#[test]
fn burst_mutations() {
    info!("🚀️ Starting mutation injection test");

    let sys = Runtime::new().unwrap();

    let delay = Duration::from_millis(1000 / RATE);

    sys.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
        let api = Arc::new(LedgerApi::new(db.clone(), Arc::new(TierLadder::default_ladder()), EventProducers::default()));

        let mut timer = tokio::time::interval(delay);
        info!("🚀️ Injecting {NUM_MUTATIONS} earn entries");
        for i in 0..NUM_MUTATIONS {
            timer.tick().await;
            let member = MemberId::from(format!("member-{}", (i + 1) % 5));
            #[allow(clippy::cast_possible_wrap)]
            let amount = Points::from(10 * (i + 1) as i64);
            let key = format!("burst-{i}");
            let source = format!("stay-{i}");
            if let Err(e) = api.earn(member, amount, source, key, chrono::Duration::days(30)).await {
                panic!("Error processing mutation {i}: {e}");
            }
        }

        // Each member received 4 of the 20 entries; the ledger and cache must agree.
        for m in 0..5 {
            let member = MemberId::from(format!("member-{m}"));
            let balance = db.fetch_balance(&member).await.unwrap().unwrap();
            let summary = db.summary_for_member(&member).await.unwrap();
            assert_eq!(balance.current_balance, summary.current_balance);
            assert_eq!(balance.version, 4);
        }
    });
    info!("🚀️ test complete");
}
