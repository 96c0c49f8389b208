//! Tests for database initialization
//!
//! Covers first-run creation, idempotent re-initialization, and the
//! constraints the accessors rely on (content-addressed items, one vote
//! per user per proposal).

use lingo_common::db::init_database;
use tempfile::TempDir;

#[tokio::test]
async fn creates_database_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("lingo.db");
    assert!(!db_path.exists());

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists());

    // All tables exist
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in [
        "items",
        "pack_status",
        "packs",
        "projects",
        "proposal_votes",
        "proposals",
        "translations",
        "version_items",
        "versions",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }
}

#[tokio::test]
async fn reinitialization_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("lingo.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO projects (id, slug, title) VALUES ('p1', 'mod', 'Mod')")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    // Second init must not clobber existing data
    let pool = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("deeper").join("lingo.db");

    init_database(&db_path).await.unwrap();
    assert!(db_path.exists());
}

#[tokio::test]
async fn items_are_unique_by_key_and_value() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("lingo.db")).await.unwrap();

    sqlx::query("INSERT INTO items (key, value) VALUES ('k', 'v')")
        .execute(&pool)
        .await
        .unwrap();

    // Same content rejected, different value accepted
    assert!(sqlx::query("INSERT INTO items (key, value) VALUES ('k', 'v')")
        .execute(&pool)
        .await
        .is_err());
    sqlx::query("INSERT INTO items (key, value) VALUES ('k', 'other')")
        .execute(&pool)
        .await
        .unwrap();
}
