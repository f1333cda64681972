//! End-to-end ledger flows against a real SQLite database.

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex as StdMutex},
};

use chrono::{Duration, Utc};
use plg_common::Points;
use points_ledger_engine::{
    db_types::{MemberId, Pagination, TransactionKind},
    events::{EventHandlers, EventHooks, EventProducers, TierChangedEvent},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    tier::TierLadder,
    traits::BalanceManagement,
    BalanceApi,
    LedgerApi,
    LedgerApiError,
    SqliteDatabase,
};

async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

fn ladder() -> Arc<TierLadder> {
    Arc::new(TierLadder::default_ladder())
}

fn api(db: SqliteDatabase) -> LedgerApi<SqliteDatabase> {
    LedgerApi::new(db, ladder(), EventProducers::default())
}

fn member(name: &str) -> MemberId {
    MemberId::from(name)
}

#[tokio::test]
async fn balance_tracks_the_sum_of_entries() {
    let db = new_db().await;
    let api = api(db.clone());
    let m = member("alice");
    api.earn(m.clone(), Points::from(100), "stay-1".into(), "k1".into(), Duration::days(30)).await.unwrap();
    api.earn(m.clone(), Points::from(40), "stay-2".into(), "k2".into(), Duration::days(30)).await.unwrap();
    api.redeem(m.clone(), Points::from(30), "reward-1".into(), "k3".into()).await.unwrap();

    let balance = db.fetch_balance(&m).await.unwrap().unwrap();
    assert_eq!(balance.current_balance, Points::from(110));

    let summary = db.summary_for_member(&m).await.unwrap();
    assert_eq!(summary.current_balance, balance.current_balance);
    assert_eq!(summary.total_earned, Points::from(140));
    assert_eq!(summary.total_redeemed, Points::from(30));
    assert_eq!(summary.entry_count, 3);
}

#[tokio::test]
async fn idempotent_replay_applies_once() {
    let db = new_db().await;
    let api = api(db.clone());
    let m = member("bob");
    let first =
        api.earn(m.clone(), Points::from(100), "stay-1".into(), "dup-key".into(), Duration::days(30)).await.unwrap();
    assert!(!first.duplicate);
    let replayed =
        api.earn(m.clone(), Points::from(100), "stay-1".into(), "dup-key".into(), Duration::days(30)).await.unwrap();
    assert!(replayed.duplicate);
    assert_eq!(replayed.entry.id, first.entry.id);
    assert_eq!(replayed.balance, Points::from(100));

    let history = db.history_for_member(&m, Pagination::default()).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn scenario_a_second_earn_crosses_the_silver_threshold() {
    let db = new_db().await;

    let seen = Arc::new(StdMutex::new(Vec::<TierChangedEvent>::new()));
    let sink = seen.clone();
    let mut hooks = EventHooks::default();
    hooks.on_tier_changed(move |ev| {
        let sink = sink.clone();
        Box::pin(async move {
            sink.lock().unwrap().push(ev);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let api = LedgerApi::new(db.clone(), ladder(), producers);
    let m = member("carol");
    let first = api.earn(m.clone(), Points::from(100), "stay-1".into(), "k1".into(), Duration::days(30)).await.unwrap();
    assert_eq!(first.tier, "Bronze");
    assert!(!first.tier_changed());

    let second = api.earn(m.clone(), Points::from(100), "stay-2".into(), "k2".into(), Duration::days(30)).await.unwrap();
    assert_eq!(second.balance, Points::from(200));
    assert_eq!(second.tier, "Silver");
    assert!(second.tier_changed());

    // The hook is fire-and-forget; give the handler task a beat to drain.
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    let events = seen.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].old_tier, "Bronze");
    assert_eq!(events[0].new_tier, "Silver");
    assert_eq!(events[0].balance, Points::from(200));
}

#[tokio::test]
async fn scenario_b_overdrawn_redemption_is_rejected_and_leaves_no_trace() {
    let db = new_db().await;
    let api = api(db.clone());
    let m = member("dave");
    api.earn(m.clone(), Points::from(150), "stay-1".into(), "k1".into(), Duration::days(30)).await.unwrap();

    let err = api.redeem(m.clone(), Points::from(200), "reward-1".into(), "k2".into()).await.unwrap_err();
    assert!(matches!(err, LedgerApiError::InsufficientBalance { .. }));

    let balance = db.fetch_balance(&m).await.unwrap().unwrap();
    assert_eq!(balance.current_balance, Points::from(150));
    let history = db.history_for_member(&m, Pagination::default()).await.unwrap();
    assert_eq!(history.len(), 1, "the rejected redemption must not leave a ledger entry");
}

#[tokio::test]
async fn scenario_c_sweep_expires_an_untouched_earn_in_full() {
    let db = new_db().await;
    let api = api(db.clone());
    let m = member("erin");
    // TTL already in the past: the entry is overdue the moment the sweep looks at it.
    api.earn(m.clone(), Points::from(100), "stay-1".into(), "k1".into(), Duration::days(-1)).await.unwrap();

    let outcome = api.sweep_expired(Utc::now()).await.unwrap();
    assert_eq!(outcome.entries_expired, 1);
    assert_eq!(outcome.points_expired, Points::from(100));

    let balance = db.fetch_balance(&m).await.unwrap().unwrap();
    assert_eq!(balance.current_balance, Points::from(0));
    let history = db.history_for_member(&m, Pagination::default()).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].kind, TransactionKind::Expire);
    assert_eq!(history[0].amount, Points::from(-100));
}

#[tokio::test]
async fn scenario_d_sweep_expires_only_the_unconsumed_remainder() {
    let db = new_db().await;
    let api = api(db.clone());
    let m = member("frank");
    api.earn(m.clone(), Points::from(100), "stay-1".into(), "k1".into(), Duration::days(-1)).await.unwrap();
    api.redeem(m.clone(), Points::from(60), "reward-1".into(), "k2".into()).await.unwrap();

    let outcome = api.sweep_expired(Utc::now()).await.unwrap();
    assert_eq!(outcome.entries_expired, 1);
    assert_eq!(outcome.points_expired, Points::from(40));

    let balance = db.fetch_balance(&m).await.unwrap().unwrap();
    assert_eq!(balance.current_balance, Points::from(0), "expiry never drives a balance negative");
}

#[tokio::test]
async fn sweeps_are_idempotent() {
    let db = new_db().await;
    let api = api(db.clone());
    let m = member("grace");
    api.earn(m.clone(), Points::from(100), "stay-1".into(), "k1".into(), Duration::days(-1)).await.unwrap();

    let first = api.sweep_expired(Utc::now()).await.unwrap();
    assert_eq!(first.entries_expired, 1);
    let second = api.sweep_expired(Utc::now()).await.unwrap();
    assert_eq!(second.entries_expired, 0, "a fully expired entry produces no further action");

    let history = db.history_for_member(&m, Pagination::default()).await.unwrap();
    assert_eq!(history.iter().filter(|e| e.kind == TransactionKind::Expire).count(), 1);
}

#[tokio::test]
async fn sweep_handles_shared_source_refs_across_members() {
    let db = new_db().await;
    let api = api(db.clone());
    let kim = member("kim");
    let liam = member("liam");
    // Source refs are only unique within a member; the sweep must expire both entries.
    api.earn(kim.clone(), Points::from(100), "stay-1".into(), "k-kim".into(), Duration::days(-1)).await.unwrap();
    api.earn(liam.clone(), Points::from(80), "stay-1".into(), "k-liam".into(), Duration::days(-1)).await.unwrap();

    let outcome = api.sweep_expired(Utc::now()).await.unwrap();
    assert_eq!(outcome.entries_expired, 2);
    assert_eq!(outcome.members_swept, 2);

    assert_eq!(db.fetch_balance(&kim).await.unwrap().unwrap().current_balance, Points::from(0));
    assert_eq!(db.fetch_balance(&liam).await.unwrap().unwrap().current_balance, Points::from(0));
}

#[tokio::test]
async fn scenario_e_concurrent_earns_both_commit() {
    let db = new_db().await;
    let api = Arc::new(api(db.clone()));
    let m = member("heidi");

    let a = {
        let api = api.clone();
        let m = m.clone();
        tokio::spawn(async move {
            api.earn(m, Points::from(50), "stay-1".into(), "k-a".into(), Duration::days(30)).await
        })
    };
    let b = {
        let api = api.clone();
        let m = m.clone();
        tokio::spawn(async move {
            api.earn(m, Points::from(70), "stay-2".into(), "k-b".into(), Duration::days(30)).await
        })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let balance = db.fetch_balance(&m).await.unwrap().unwrap();
    assert_eq!(balance.current_balance, Points::from(120), "no lost update");
    assert_eq!(balance.version, 2);
}

#[tokio::test]
async fn admin_adjustments_share_the_standard_invariants() {
    let db = new_db().await;
    let api = api(db.clone());
    let m = member("ivan");

    let err = api
        .admin_adjust(m.clone(), Points::from(50), "admin-7".into(), "  ".into(), "k1".into())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerApiError::InvalidAdjustment(_)));
    let err = api
        .admin_adjust(m.clone(), Points::from(50), "".into(), "goodwill".into(), "k1".into())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerApiError::InvalidAdjustment(_)));

    let award =
        api.admin_adjust(m.clone(), Points::from(50), "admin-7".into(), "goodwill".into(), "k1".into()).await.unwrap();
    assert_eq!(award.entry.kind, TransactionKind::AdminAward);
    assert_eq!(award.balance, Points::from(50));
    assert_eq!(award.entry.note.as_deref(), Some("goodwill"));
    assert_eq!(award.entry.actor_id, "admin-7");

    // A deduction past the balance is rejected just like a redemption.
    let err = api
        .admin_adjust(m.clone(), Points::from(-80), "admin-7".into(), "correction".into(), "k2".into())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerApiError::InsufficientBalance { .. }));

    let deduct = api
        .admin_adjust(m.clone(), Points::from(-30), "admin-7".into(), "correction".into(), "k3".into())
        .await
        .unwrap();
    assert_eq!(deduct.entry.kind, TransactionKind::AdminDeduct);
    assert_eq!(deduct.balance, Points::from(20));
}

#[tokio::test]
async fn history_pages_newest_first() {
    let db = new_db().await;
    let api = api(db.clone());
    let m = member("judy");
    for i in 0..5 {
        api.earn(m.clone(), Points::from(10 + i), format!("stay-{i}"), format!("k-{i}"), Duration::days(30))
            .await
            .unwrap();
    }
    let page = db.history_for_member(&m, Pagination { offset: 0, limit: 2 }).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].source_ref, "stay-4");
    assert_eq!(page[1].source_ref, "stay-3");
    let rest = db.history_for_member(&m, Pagination { offset: 2, limit: 10 }).await.unwrap();
    assert_eq!(rest.len(), 3);
}

#[tokio::test]
async fn unknown_members_read_as_not_found() {
    let db = new_db().await;
    let reads = BalanceApi::new(db);
    let err = reads.balance_for_member(&member("nobody")).await.unwrap_err();
    assert!(matches!(err, points_ledger_engine::BalanceApiError::MemberNotFound(_)));
}
