use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{LedgerEntry, MemberId, MemberSummary, NewLedgerEntry, Pagination},
    traits::{InsertEntryResult, LedgerStoreError},
};

/// Inserts the entry, returning the existing row instead if the entry id has been seen before.
/// Run inside the caller's transaction; a failed commit leaves no partial record.
pub async fn idempotent_insert(
    entry: NewLedgerEntry,
    conn: &mut SqliteConnection,
) -> Result<InsertEntryResult, LedgerStoreError> {
    let result = match fetch_entry_by_entry_id(&entry.entry_id, conn).await? {
        Some(existing) => InsertEntryResult::AlreadyExists(existing),
        None => {
            let inserted = insert_entry(entry, conn).await?;
            debug!("📝️ Ledger entry [{}] inserted with id {}", inserted.entry_id, inserted.id);
            InsertEntryResult::Inserted(inserted)
        },
    };
    Ok(result)
}

async fn insert_entry(entry: NewLedgerEntry, conn: &mut SqliteConnection) -> Result<LedgerEntry, LedgerStoreError> {
    let entry = sqlx::query_as(
        r#"
            INSERT INTO ledger_entries (
                entry_id,
                member_id,
                kind,
                amount,
                source_ref,
                actor_id,
                note,
                expires_at,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(entry.entry_id)
    .bind(entry.member_id)
    .bind(entry.kind)
    .bind(entry.amount)
    .bind(entry.source_ref)
    .bind(entry.actor_id)
    .bind(entry.note)
    .bind(entry.expires_at)
    .bind(entry.created_at)
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

pub async fn fetch_entry_by_entry_id(
    entry_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<LedgerEntry>, sqlx::Error> {
    let entry = sqlx::query_as("SELECT * FROM ledger_entries WHERE entry_id = $1")
        .bind(entry_id)
        .fetch_optional(conn)
        .await?;
    Ok(entry)
}

/// Entries for the member, newest first.
pub async fn entries_for_member(
    member_id: &MemberId,
    pagination: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, LedgerStoreError> {
    let entries = sqlx::query_as(
        r#"
        SELECT * FROM ledger_entries
        WHERE member_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(member_id)
    .bind(pagination.limit)
    .bind(pagination.offset)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

/// The member's entire history, oldest first, as the consumption replay needs it.
pub async fn full_ledger_for_member(
    member_id: &MemberId,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, LedgerStoreError> {
    let entries = sqlx::query_as(
        "SELECT * FROM ledger_entries WHERE member_id = $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(member_id)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

/// Members holding earn entries past their TTL with no matching expire entry yet.
pub async fn members_with_stale_earns(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<MemberId>, LedgerStoreError> {
    let members = sqlx::query_scalar::<_, String>(
        r#"
        SELECT DISTINCT e.member_id FROM ledger_entries e
        WHERE e.kind = 'earn'
          AND e.expires_at IS NOT NULL
          AND e.expires_at <= $1
          AND NOT EXISTS (
              SELECT 1 FROM ledger_entries x
              WHERE x.kind = 'expire'
                AND x.member_id = e.member_id
                AND x.source_ref = e.source_ref
          )
        "#,
    )
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(members.into_iter().map(MemberId::from).collect())
}

/// Lifetime totals for the member, straight off the ledger.
pub async fn summary_for_member(
    member_id: &MemberId,
    conn: &mut SqliteConnection,
) -> Result<MemberSummary, LedgerStoreError> {
    let summary = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN kind IN ('earn', 'admin_award') THEN amount ELSE 0 END), 0) AS total_earned,
            COALESCE(SUM(CASE WHEN kind = 'redeem' THEN -amount ELSE 0 END), 0) AS total_redeemed,
            COALESCE(SUM(CASE WHEN kind = 'expire' THEN -amount ELSE 0 END), 0) AS total_expired,
            COALESCE(SUM(CASE WHEN kind = 'admin_deduct' THEN -amount ELSE 0 END), 0) AS total_deducted,
            COALESCE(SUM(amount), 0) AS current_balance,
            COUNT(*) AS entry_count,
            MAX(created_at) AS last_entry_at
        FROM ledger_entries
        WHERE member_id = $1
        "#,
    )
    .bind(member_id)
    .fetch_one(conn)
    .await?;
    Ok(summary)
}
