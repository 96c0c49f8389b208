//! Translation slot database operations
//!
//! A slot is the (item, target language) pair proposals attach to, created
//! lazily on first proposal. This module also carries the accepted-content
//! queries the packaging pipeline reads.

use lingo_common::db::models::Translation;
use lingo_common::{Error, Result};
use sqlx::SqlitePool;

/// Find or lazily create the slot for an (item, language) pair
pub async fn get_or_create(pool: &SqlitePool, item_id: i64, language_code: &str) -> Result<i64> {
    sqlx::query(
        r#"
        INSERT INTO translations (item_id, language_code)
        VALUES (?, ?)
        ON CONFLICT(item_id, language_code) DO NOTHING
        "#,
    )
    .bind(item_id)
    .bind(language_code)
    .execute(pool)
    .await?;

    let id: i64 = sqlx::query_scalar(
        "SELECT id FROM translations WHERE item_id = ? AND language_code = ?",
    )
    .bind(item_id)
    .bind(language_code)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::Internal(format!("translation slot vanished for item {}", item_id)))?;

    Ok(id)
}

/// Load one slot by id
pub async fn get_translation(pool: &SqlitePool, id: i64) -> Result<Option<Translation>> {
    let translation = sqlx::query_as::<_, Translation>(
        "SELECT id, item_id, language_code FROM translations WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(translation)
}

/// Languages that have at least one accurate proposal for a release's items
pub async fn languages_with_accepted(pool: &SqlitePool, version_id: &str) -> Result<Vec<String>> {
    let languages: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT t.language_code
        FROM translations t
        JOIN version_items vi ON vi.item_id = t.item_id
        WHERE vi.version_id = ?
          AND EXISTS (
              SELECT 1 FROM proposals p
              WHERE p.translation_id = t.id AND p.status = 'accurate'
          )
        "#,
    )
    .bind(version_id)
    .fetch_all(pool)
    .await?;

    Ok(languages)
}

/// Count of a release's items that have an accurate proposal in one language
pub async fn count_accepted(pool: &SqlitePool, version_id: &str, language_code: &str) -> Result<u32> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM translations t
        JOIN version_items vi ON vi.item_id = t.item_id
        WHERE vi.version_id = ?
          AND t.language_code = ?
          AND EXISTS (
              SELECT 1 FROM proposals p
              WHERE p.translation_id = t.id AND p.status = 'accurate'
          )
        "#,
    )
    .bind(version_id)
    .bind(language_code)
    .fetch_one(pool)
    .await?;

    Ok(count as u32)
}

/// One accepted (language, key, value) row for the packaging map
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AcceptedRow {
    pub language_code: String,
    pub key: String,
    pub value: String,
}

/// Every accepted translation for a release, across all languages
pub async fn accepted_for_version(pool: &SqlitePool, version_id: &str) -> Result<Vec<AcceptedRow>> {
    let rows = sqlx::query_as::<_, AcceptedRow>(
        r#"
        SELECT t.language_code, i.key, p.value
        FROM translations t
        JOIN items i ON i.id = t.item_id
        JOIN version_items vi ON vi.item_id = i.id
        JOIN proposals p ON p.translation_id = t.id AND p.status = 'accurate'
        WHERE vi.version_id = ?
        "#,
    )
    .bind(version_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
