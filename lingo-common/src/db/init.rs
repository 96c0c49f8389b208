//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up
//! idempotently. Every helper uses `CREATE TABLE IF NOT EXISTS` so repeated
//! startups are safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while a pipeline writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_projects_table(&pool).await?;
    create_versions_table(&pool).await?;
    create_items_table(&pool).await?;
    create_version_items_table(&pool).await?;
    create_translations_table(&pool).await?;
    create_proposals_table(&pool).await?;
    create_proposal_votes_table(&pool).await?;
    create_pack_status_table(&pool).await?;
    create_packs_table(&pool).await?;

    Ok(pool)
}

async fn create_projects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            opt_in TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_versions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS versions (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL REFERENCES projects(id),
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_items_table(pool: &SqlitePool) -> Result<()> {
    // Items are content-addressed: identical (key, value) pairs share one row
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            UNIQUE(key, value)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_version_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS version_items (
            version_id TEXT NOT NULL REFERENCES versions(id),
            item_id INTEGER NOT NULL REFERENCES items(id),
            PRIMARY KEY (version_id, item_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_translations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS translations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_id INTEGER NOT NULL REFERENCES items(id),
            language_code TEXT NOT NULL,
            UNIQUE(item_id, language_code)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_proposals_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS proposals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            translation_id INTEGER NOT NULL REFERENCES translations(id),
            user_id TEXT NOT NULL,
            value TEXT NOT NULL,
            note TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            score INTEGER NOT NULL DEFAULT 0,
            approvals INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_proposal_votes_table(pool: &SqlitePool) -> Result<()> {
    // vote is +1 or -1
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS proposal_votes (
            proposal_id INTEGER NOT NULL REFERENCES proposals(id),
            user_id TEXT NOT NULL,
            vote INTEGER NOT NULL,
            PRIMARY KEY (proposal_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_pack_status_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pack_status (
            version_id TEXT NOT NULL REFERENCES versions(id),
            language_code TEXT NOT NULL,
            needs_release INTEGER NOT NULL DEFAULT 1,
            last_updated TEXT NOT NULL,
            PRIMARY KEY (version_id, language_code)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_packs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS packs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id TEXT NOT NULL UNIQUE REFERENCES projects(id),
            last_updated TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
