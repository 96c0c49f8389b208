//! Project database operations

use lingo_common::db::models::Project;
use lingo_common::Result;
use sqlx::SqlitePool;

/// Load one project by id
pub async fn get_project(pool: &SqlitePool, id: &str) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>(
        "SELECT id, slug, title, opt_in FROM projects WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(project)
}

/// All projects whose owner has opted in to translation
pub async fn list_opted_in(pool: &SqlitePool) -> Result<Vec<Project>> {
    let projects = sqlx::query_as::<_, Project>(
        "SELECT id, slug, title, opt_in FROM projects WHERE opt_in IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;

    Ok(projects)
}

/// Insert or update a project row
pub async fn upsert_project(pool: &SqlitePool, project: &Project) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO projects (id, slug, title, opt_in)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            slug = excluded.slug,
            title = excluded.title,
            opt_in = excluded.opt_in
        "#,
    )
    .bind(&project.id)
    .bind(&project.slug)
    .bind(&project.title)
    .bind(&project.opt_in)
    .execute(pool)
    .await?;

    Ok(())
}

/// Clear a project's opt-in marker (upstream rejected it)
pub async fn clear_opt_in(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("UPDATE projects SET opt_in = NULL WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}
