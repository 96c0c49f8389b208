//! Release (version) database operations

use lingo_common::db::models::Version;
use lingo_common::Result;
use sqlx::SqlitePool;

/// All known releases of a project
pub async fn list_for_project(pool: &SqlitePool, project_id: &str) -> Result<Vec<Version>> {
    let versions = sqlx::query_as::<_, Version>(
        "SELECT id, project_id FROM versions WHERE project_id = ?",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(versions)
}

/// All releases across all projects
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Version>> {
    let versions = sqlx::query_as::<_, Version>("SELECT id, project_id FROM versions")
        .fetch_all(pool)
        .await?;

    Ok(versions)
}

/// Insert a newly discovered release. Releases are never mutated.
pub async fn insert_version(pool: &SqlitePool, version: &Version) -> Result<()> {
    sqlx::query("INSERT INTO versions (id, project_id) VALUES (?, ?) ON CONFLICT(id) DO NOTHING")
        .bind(&version.id)
        .bind(&version.project_id)
        .execute(pool)
        .await?;

    Ok(())
}
