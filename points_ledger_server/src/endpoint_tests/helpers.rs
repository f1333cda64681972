//! Shared scaffolding for endpoint tests: a throwaway database and a fully wired app.

use points_ledger_engine::{
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    SqliteDatabase,
};

pub async fn test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database")
}

/// Builds the service exactly as production wiring does, minus the background sweep worker.
#[macro_export]
macro_rules! test_app {
    ($db:expr) => {{
        let db = $db.clone();
        actix_web::test::init_service(actix_web::App::new().configure(move |cfg| {
            $crate::server::configure_app(
                cfg,
                db,
                $crate::config::ServerConfig::default(),
                points_ledger_engine::events::EventProducers::default(),
                points_ledger_engine::MemberLocks::default(),
            )
        }))
        .await
    }};
}
