use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use points_ledger_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    run_migrations,
    BalanceApi,
    LedgerApi,
    MemberLocks,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{admin_adjust, balance, earn, health, history, redeem, summary, sweep_expired, tiers},
    sweep_worker::start_sweep_worker,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    run_migrations(db.pool()).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let handlers = EventHandlers::new(25, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let locks = MemberLocks::default();
    let ladder = Arc::new(config.tier_ladder.clone());
    start_sweep_worker(db.clone(), producers.clone(), ladder, locks.clone(), config.sweep_interval());

    let srv = create_server_instance(config, db, producers, locks)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Wires the ledger APIs and routes into a configurable app fragment. The lock registry is
/// shared: every worker (and the sweep worker) must serialize on the same per-member locks.
pub fn configure_app(
    cfg: &mut web::ServiceConfig,
    db: SqliteDatabase,
    config: ServerConfig,
    producers: EventProducers,
    locks: MemberLocks,
) {
    let ladder = Arc::new(config.tier_ladder.clone());
    let ledger_api = LedgerApi::new(db.clone(), ladder, producers).with_locks(locks);
    let balance_api = BalanceApi::new(db);
    cfg.app_data(web::Data::new(ledger_api))
        .app_data(web::Data::new(balance_api))
        .app_data(web::Data::new(config))
        .service(health)
        .service(earn)
        .service(redeem)
        .service(admin_adjust)
        .service(sweep_expired)
        .service(balance)
        .service(history)
        .service(summary)
        .service(tiers);
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    locks: MemberLocks,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let db = db.clone();
        let config = config.clone();
        let producers = producers.clone();
        let locks = locks.clone();
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("plg::access_log"))
            .configure(move |cfg| configure_app(cfg, db, config, producers, locks))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// The stock event hooks: log tier transitions and sweep results. Notification delivery proper
/// belongs to an external collaborator subscribing its own hooks.
fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_tier_changed(|ev| {
        Box::pin(async move {
            info!("🏅️ Member {} moved tier: {} -> {} ({})", ev.member_id, ev.old_tier, ev.new_tier, ev.balance);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_points_expired(|ev| {
        Box::pin(async move {
            info!("🕰️ Member {} had {} expire across {} entries", ev.member_id, ev.amount, ev.entries);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}
