use chrono::Utc;
use log::debug;
use plg_common::Points;
use sqlx::SqliteConnection;

use crate::{
    db_types::{MemberBalance, MemberId},
    traits::LedgerStoreError,
};

pub async fn fetch_balance(
    member_id: &MemberId,
    conn: &mut SqliteConnection,
) -> Result<Option<MemberBalance>, LedgerStoreError> {
    let balance = sqlx::query_as(
        "SELECT member_id, current_balance, version, tier_name, updated_at FROM member_balances WHERE member_id = $1",
    )
    .bind(member_id)
    .fetch_optional(conn)
    .await?;
    Ok(balance)
}

/// Fetches the balance row for the member, creating the zero row on first touch. New members
/// start in the lowest tier.
pub async fn fetch_or_create_balance(
    member_id: &MemberId,
    lowest_tier: &str,
    conn: &mut SqliteConnection,
) -> Result<MemberBalance, LedgerStoreError> {
    let created = sqlx::query(
        "INSERT INTO member_balances (member_id, tier_name, updated_at) VALUES ($1, $2, $3) \
         ON CONFLICT (member_id) DO NOTHING",
    )
    .bind(member_id)
    .bind(lowest_tier)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    if created.rows_affected() > 0 {
        debug!("🧑️ Created balance row for member {member_id}");
    }
    fetch_balance(member_id, conn)
        .await?
        .ok_or_else(|| LedgerStoreError::MemberNotFound(member_id.clone()))
}

/// The balance update after an append.
#[derive(Debug, Clone, Copy)]
pub struct BalanceUpdate {
    pub current_balance: Points,
    pub version: i64,
}

/// Applies `delta` to the member's cached balance, guarded by the optimistic version check.
/// Zero rows affected means the row moved underneath us and the caller must retry with a fresh
/// read; the stored value is never silently overwritten.
pub async fn apply_delta(
    member_id: &MemberId,
    delta: Points,
    expected_version: i64,
    tier_name: &str,
    conn: &mut SqliteConnection,
) -> Result<BalanceUpdate, LedgerStoreError> {
    let row: Option<(i64, i64)> = sqlx::query_as(
        r#"UPDATE member_balances SET
           current_balance = current_balance + $1,
           version = version + 1,
           tier_name = $2,
           updated_at = $3
           WHERE member_id = $4 AND version = $5
           RETURNING current_balance, version
        "#,
    )
    .bind(delta)
    .bind(tier_name)
    .bind(Utc::now())
    .bind(member_id)
    .bind(expected_version)
    .fetch_optional(conn)
    .await?;
    match row {
        Some((current_balance, version)) => {
            Ok(BalanceUpdate { current_balance: Points::from(current_balance), version })
        },
        None => Err(LedgerStoreError::StaleVersion(member_id.clone())),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        test_utils::prepare_env::{prepare_test_env, random_db_path},
        SqliteDatabase,
    };

    #[tokio::test]
    async fn version_guard_rejects_stale_writers() {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let member = MemberId::from("m-1");

        let balance = fetch_or_create_balance(&member, "Bronze", &mut conn).await.unwrap();
        assert_eq!(balance.version, 0);
        assert_eq!(balance.current_balance, Points::from(0));
        assert_eq!(balance.tier_name, "Bronze");

        let update = apply_delta(&member, Points::from(10), 0, "Bronze", &mut conn).await.unwrap();
        assert_eq!(update.version, 1);
        assert_eq!(update.current_balance, Points::from(10));

        // A writer still holding version 0 must fail loudly, not overwrite.
        let err = apply_delta(&member, Points::from(10), 0, "Bronze", &mut conn).await.unwrap_err();
        assert!(matches!(err, LedgerStoreError::StaleVersion(_)));
    }

    #[tokio::test]
    async fn create_is_idempotent_per_member() {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let member = MemberId::from("m-2");

        let first = fetch_or_create_balance(&member, "Bronze", &mut conn).await.unwrap();
        let second = fetch_or_create_balance(&member, "Bronze", &mut conn).await.unwrap();
        assert_eq!(first.member_id, second.member_id);
        assert_eq!(second.version, 0);
    }
}
