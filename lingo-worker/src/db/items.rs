//! Item (translatable string) database operations
//!
//! Items are content-addressed: two strings with identical (key, value) are
//! the same item, enforced by a UNIQUE constraint. Releases share items
//! through the version_items link table.

use lingo_common::db::models::Item;
use lingo_common::{Error, Result};
use sqlx::SqlitePool;

/// Insert an item if its (key, value) content is new. Returns the row id
/// either way, plus whether a new row was actually created.
pub async fn insert_or_get(pool: &SqlitePool, key: &str, value: &str) -> Result<(i64, bool)> {
    let result =
        sqlx::query("INSERT INTO items (key, value) VALUES (?, ?) ON CONFLICT(key, value) DO NOTHING")
            .bind(key)
            .bind(value)
            .execute(pool)
            .await?;
    let created = result.rows_affected() > 0;

    let id: i64 = sqlx::query_scalar("SELECT id FROM items WHERE key = ? AND value = ?")
        .bind(key)
        .bind(value)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::Internal(format!("item vanished after insert: {}", key)))?;

    Ok((id, created))
}

/// Link a release to an item (idempotent)
pub async fn link_version_item(pool: &SqlitePool, version_id: &str, item_id: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO version_items (version_id, item_id)
        VALUES (?, ?)
        ON CONFLICT(version_id, item_id) DO NOTHING
        "#,
    )
    .bind(version_id)
    .bind(item_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// All items belonging to one release
pub async fn items_for_version(pool: &SqlitePool, version_id: &str) -> Result<Vec<Item>> {
    let items = sqlx::query_as::<_, Item>(
        r#"
        SELECT i.id, i.key, i.value
        FROM items i
        JOIN version_items vi ON vi.item_id = i.id
        WHERE vi.version_id = ?
        "#,
    )
    .bind(version_id)
    .fetch_all(pool)
    .await?;

    Ok(items)
}

/// Number of items in one release
pub async fn count_for_version(pool: &SqlitePool, version_id: &str) -> Result<u32> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM version_items WHERE version_id = ?")
            .bind(version_id)
            .fetch_one(pool)
            .await?;

    Ok(count as u32)
}

/// Ids of all releases containing an item
pub async fn versions_containing_item(pool: &SqlitePool, item_id: i64) -> Result<Vec<String>> {
    let ids: Vec<String> =
        sqlx::query_scalar("SELECT version_id FROM version_items WHERE item_id = ?")
            .bind(item_id)
            .fetch_all(pool)
            .await?;

    Ok(ids)
}
