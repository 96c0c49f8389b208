//! Packaging status (dirty-tracking) database operations

use crate::db::parse_timestamp;
use chrono::Utc;
use lingo_common::db::models::PackStatus;
use lingo_common::Result;
use sqlx::{Row, SqlitePool};

/// Mark a (release, language) pair as needing a new pack
pub async fn mark_dirty(pool: &SqlitePool, version_id: &str, language_code: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pack_status (version_id, language_code, needs_release, last_updated)
        VALUES (?, ?, 1, ?)
        ON CONFLICT(version_id, language_code) DO UPDATE SET
            needs_release = 1,
            last_updated = excluded.last_updated
        "#,
    )
    .bind(version_id)
    .bind(language_code)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a (release, language) pair as covered by a generated pack
pub async fn mark_clean(pool: &SqlitePool, version_id: &str, language_code: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE pack_status
        SET needs_release = 0, last_updated = ?
        WHERE version_id = ? AND language_code = ?
        "#,
    )
    .bind(Utc::now().to_rfc3339())
    .bind(version_id)
    .bind(language_code)
    .execute(pool)
    .await?;

    Ok(())
}

/// All rows currently marked dirty
pub async fn list_dirty(pool: &SqlitePool) -> Result<Vec<PackStatus>> {
    let rows = sqlx::query(
        r#"
        SELECT version_id, language_code, needs_release, last_updated
        FROM pack_status
        WHERE needs_release = 1
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let last_updated_str: String = row.get("last_updated");
            let needs_release: i64 = row.get("needs_release");
            Ok(PackStatus {
                version_id: row.get("version_id"),
                language_code: row.get("language_code"),
                needs_release: needs_release != 0,
                last_updated: parse_timestamp(&last_updated_str)?,
            })
        })
        .collect()
}

/// Languages already tracked for a release (dirty or clean)
pub async fn tracked_languages(pool: &SqlitePool, version_id: &str) -> Result<Vec<String>> {
    let languages: Vec<String> =
        sqlx::query_scalar("SELECT language_code FROM pack_status WHERE version_id = ?")
            .bind(version_id)
            .fetch_all(pool)
            .await?;

    Ok(languages)
}
