use actix_web::{http::StatusCode, test};
use plg_common::Points;
use serde_json::Value;

use crate::{
    data_objects::{BalanceResult, EarnParams, RedeemParams},
    endpoint_tests::helpers::test_db,
    test_app,
};

#[actix_web::test]
async fn unknown_member_balance_is_not_found() {
    let db = test_db().await;
    let app = test_app!(db);

    let req = test::TestRequest::get().uri("/balance/nobody").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn health_endpoint_is_up() {
    let db = test_db().await;
    let app = test_app!(db);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn history_is_newest_first_and_paged() {
    let db = test_db().await;
    let app = test_app!(db);

    for i in 0..3 {
        let body = EarnParams {
            member_id: "grace".to_string(),
            amount: 10,
            source_ref: format!("stay-{i}"),
            idempotency_key: format!("k-{i}"),
            ttl_days: None,
        };
        let req = test::TestRequest::post().uri("/earn").set_json(body).to_request();
        test::call_service(&app, req).await;
    }
    let body = RedeemParams {
        member_id: "grace".to_string(),
        amount: 5,
        source_ref: "reward-1".to_string(),
        idempotency_key: "k-r".to_string(),
    };
    let req = test::TestRequest::post().uri("/redeem").set_json(body).to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/history/grace?page=1&page_size=2").to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    let entries = page.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["kind"], "redeem");
    assert_eq!(entries[1]["source_ref"], "stay-2");

    let req = test::TestRequest::get().uri("/history/grace?page=2&page_size=2").to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page.as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn summary_totals_follow_the_ledger() {
    let db = test_db().await;
    let app = test_app!(db);

    let body = EarnParams {
        member_id: "heidi".to_string(),
        amount: 100,
        source_ref: "stay-1".to_string(),
        idempotency_key: "k1".to_string(),
        ttl_days: None,
    };
    let req = test::TestRequest::post().uri("/earn").set_json(body).to_request();
    test::call_service(&app, req).await;
    let body = RedeemParams {
        member_id: "heidi".to_string(),
        amount: 30,
        source_ref: "reward-1".to_string(),
        idempotency_key: "k2".to_string(),
    };
    let req = test::TestRequest::post().uri("/redeem").set_json(body).to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/summary/heidi").to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary["total_earned"], 100);
    assert_eq!(summary["total_redeemed"], 30);
    assert_eq!(summary["current_balance"], 70);
    assert_eq!(summary["entry_count"], 2);

    let req = test::TestRequest::get().uri("/balance/heidi").to_request();
    let balance: BalanceResult = test::call_and_read_body_json(&app, req).await;
    assert_eq!(balance.balance, Points::from(70));
}

#[actix_web::test]
async fn tier_ladder_is_published() {
    let db = test_db().await;
    let app = test_app!(db);

    let req = test::TestRequest::get().uri("/tiers").to_request();
    let ladder: Value = test::call_and_read_body_json(&app, req).await;
    let rungs = ladder.as_array().unwrap();
    assert_eq!(rungs.len(), 4);
    assert_eq!(rungs[0]["name"], "Bronze");
    assert_eq!(rungs[0]["min_balance"], 0);
    assert_eq!(rungs[3]["name"], "Platinum");
}
