//! Answer record database operations

use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

use crate::models::AnswerRecord;
use crate::pairing::canonical_pair;
use crate::Result;

/// Append one answer record.
///
/// Records are immutable: there is deliberately no update or delete path.
/// Callers that must survive lock contention wrap this in
/// [`retry_on_lock`](crate::db::retry_on_lock).
pub async fn insert_record(pool: &SqlitePool, record: &AnswerRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO records (
            id, language, first_name, last_name, email,
            option_left, option_right, n_trials, result, source, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.language.as_str())
    .bind(&record.first_name)
    .bind(&record.last_name)
    .bind(&record.email)
    .bind(&record.option_left)
    .bind(&record.option_right)
    .bind(record.n_trials)
    .bind(record.result.as_str())
    .bind(&record.source)
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Canonical unordered pairs already answered by a respondent.
///
/// Left/right orientation and the judgment itself are ignored; the resume
/// filter only needs to know which combinations were presented.
pub async fn answered_pairs(pool: &SqlitePool, email: &str) -> Result<HashSet<(String, String)>> {
    let rows = sqlx::query("SELECT option_left, option_right FROM records WHERE email = ?")
        .bind(email)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let left: String = row.get("option_left");
            let right: String = row.get("option_right");
            canonical_pair(&left, &right)
        })
        .collect())
}

/// Total answer records for a respondent (diagnostics and tests)
pub async fn count_records(pool: &SqlitePool, email: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
