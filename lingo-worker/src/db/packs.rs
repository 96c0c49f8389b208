//! Per-project pack record operations

use chrono::Utc;
use lingo_common::Result;
use sqlx::SqlitePool;

/// Record that a project's translation pack was (re)generated now
pub async fn touch(pool: &SqlitePool, project_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO packs (project_id, last_updated)
        VALUES (?, ?)
        ON CONFLICT(project_id) DO UPDATE SET last_updated = excluded.last_updated
        "#,
    )
    .bind(project_id)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}
