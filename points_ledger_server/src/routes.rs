//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go
//! into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are async throughout: every call into the engine crosses a lock-acquisition or
//! database boundary, and blocking a worker thread on either would stall unrelated requests.

use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::{Duration, Utc};
use log::*;
use plg_common::Points;
use points_ledger_engine::{
    db_types::{MemberId, Pagination},
    BalanceApi,
    LedgerApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    data_objects::{AdminAdjustParams, BalanceResult, EarnParams, HistoryQuery, MutationResult, RedeemParams, SweepResult},
    errors::ServerError,
};

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------  Mutations  --------------------------------------------------
#[post("/earn")]
pub async fn earn(
    body: web::Json<EarnParams>,
    api: web::Data<LedgerApi<SqliteDatabase>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST earn {} for member {}", params.amount, params.member_id);
    let ttl_days = params.ttl_days.unwrap_or(config.default_earn_ttl_days);
    if ttl_days <= 0 {
        return Err(ServerError::InvalidRequest(format!("ttl_days must be positive, got {ttl_days}")));
    }
    let applied = api
        .earn(
            MemberId::from(params.member_id),
            Points::from(params.amount),
            params.source_ref,
            params.idempotency_key,
            Duration::days(ttl_days),
        )
        .await?;
    Ok(HttpResponse::Ok().json(MutationResult::from(applied)))
}

#[post("/redeem")]
pub async fn redeem(
    body: web::Json<RedeemParams>,
    api: web::Data<LedgerApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST redeem {} for member {}", params.amount, params.member_id);
    let applied = api
        .redeem(
            MemberId::from(params.member_id),
            Points::from(params.amount),
            params.source_ref,
            params.idempotency_key,
        )
        .await?;
    Ok(HttpResponse::Ok().json(MutationResult::from(applied)))
}

#[post("/admin-adjust")]
pub async fn admin_adjust(
    body: web::Json<AdminAdjustParams>,
    api: web::Data<LedgerApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST admin-adjust {} for member {} by {}", params.amount, params.member_id, params.actor_id);
    let applied = api
        .admin_adjust(
            MemberId::from(params.member_id),
            Points::from(params.amount),
            params.actor_id,
            params.reason,
            params.idempotency_key,
        )
        .await?;
    Ok(HttpResponse::Ok().json(MutationResult::from(applied)))
}

#[post("/sweep-expired")]
pub async fn sweep_expired(api: web::Data<LedgerApi<SqliteDatabase>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST sweep-expired");
    let outcome = api.sweep_expired(Utc::now()).await?;
    info!("💻️ Sweep expired {} entries across {} members", outcome.entries_expired, outcome.members_swept);
    Ok(HttpResponse::Ok().json(SweepResult::from(outcome)))
}

// ----------------------------------------------    Reads   ---------------------------------------------------
#[get("/balance/{member_id}")]
pub async fn balance(
    path: web::Path<String>,
    api: web::Data<BalanceApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let member_id = MemberId::from(path.into_inner());
    debug!("💻️ GET balance for {member_id}");
    let row = api.balance_for_member(&member_id).await?;
    let result = BalanceResult { balance: row.current_balance, tier: row.tier_name, as_of: row.updated_at };
    Ok(HttpResponse::Ok().json(result))
}

#[get("/history/{member_id}")]
pub async fn history(
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
    api: web::Data<BalanceApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let member_id = MemberId::from(path.into_inner());
    debug!("💻️ GET history for {member_id}");
    let pagination = Pagination::page(query.page.unwrap_or(1), query.page_size.unwrap_or(50));
    let entries = api.history_for_member(&member_id, pagination).await?;
    Ok(HttpResponse::Ok().json(entries))
}

#[get("/summary/{member_id}")]
pub async fn summary(
    path: web::Path<String>,
    api: web::Data<BalanceApi<SqliteDatabase>>,
) -> Result<HttpResponse, ServerError> {
    let member_id = MemberId::from(path.into_inner());
    debug!("💻️ GET summary for {member_id}");
    let summary = api.summary_for_member(&member_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/tiers")]
pub async fn tiers(config: web::Data<ServerConfig>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET tiers");
    Ok(HttpResponse::Ok().json(config.tier_ladder.thresholds()))
}
