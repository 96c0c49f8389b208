//! Proposal database operations
//!
//! Score and approval changes are expressed as single SQL updates so that
//! concurrent votes never lose increments.

use crate::consensus::ProposalRank;
use crate::db::parse_timestamp;
use chrono::Utc;
use lingo_common::db::models::{Proposal, ProposalStatus};
use lingo_common::Result;
use sqlx::{Row, SqlitePool};

/// Ranking fields plus the current status, as needed for a recompute
#[derive(Debug, Clone)]
pub struct RankedRow {
    pub rank: ProposalRank,
    pub status: ProposalStatus,
}

fn proposal_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Proposal> {
    let created_at_str: String = row.get("created_at");
    let status_str: String = row.get("status");
    Ok(Proposal {
        id: row.get("id"),
        translation_id: row.get("translation_id"),
        user_id: row.get("user_id"),
        value: row.get("value"),
        note: row.get("note"),
        status: ProposalStatus::parse(&status_str),
        score: row.get("score"),
        approvals: row.get("approvals"),
        created_at: parse_timestamp(&created_at_str)?,
    })
}

/// Load one proposal by id
pub async fn get_proposal(pool: &SqlitePool, id: i64) -> Result<Option<Proposal>> {
    let row = sqlx::query(
        r#"
        SELECT id, translation_id, user_id, value, note, status, score, approvals, created_at
        FROM proposals WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| proposal_from_row(&r)).transpose()
}

/// Insert a new proposal, returning its id
pub async fn insert_proposal(
    pool: &SqlitePool,
    translation_id: i64,
    user_id: &str,
    value: &str,
    note: Option<&str>,
) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO proposals (translation_id, user_id, value, note, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(translation_id)
    .bind(user_id)
    .bind(value)
    .bind(note)
    .bind(Utc::now().to_rfc3339())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Update a proposal's text
pub async fn update_value(pool: &SqlitePool, id: i64, value: &str, note: Option<&str>) -> Result<()> {
    sqlx::query("UPDATE proposals SET value = ?, note = ? WHERE id = ?")
        .bind(value)
        .bind(note)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete a proposal and its vote rows
pub async fn delete_proposal(pool: &SqlitePool, id: i64) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM proposal_votes WHERE proposal_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM proposals WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(())
}

/// Ranking inputs for every proposal attached to a translation slot
pub async fn ranked_for_translation(pool: &SqlitePool, translation_id: i64) -> Result<Vec<RankedRow>> {
    let rows = sqlx::query(
        r#"
        SELECT id, score, approvals, status, created_at
        FROM proposals
        WHERE translation_id = ?
        "#,
    )
    .bind(translation_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let created_at_str: String = row.get("created_at");
            let status_str: String = row.get("status");
            Ok(RankedRow {
                rank: ProposalRank {
                    id: row.get("id"),
                    score: row.get("score"),
                    approvals: row.get("approvals"),
                    created_at: parse_timestamp(&created_at_str)?,
                },
                status: ProposalStatus::parse(&status_str),
            })
        })
        .collect()
}

/// Persist a consensus decision
pub async fn set_status(pool: &SqlitePool, id: i64, status: ProposalStatus) -> Result<()> {
    sqlx::query("UPDATE proposals SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Apply a vote atomically: upsert/delete the vote row and adjust the score
/// by the delta inside one transaction. Returns the new score.
pub async fn apply_vote_delta(
    pool: &SqlitePool,
    proposal_id: i64,
    user_id: &str,
    new_vote: Option<i64>,
) -> Result<i64> {
    let mut tx = pool.begin().await?;

    let existing: Option<i64> =
        sqlx::query_scalar("SELECT vote FROM proposal_votes WHERE proposal_id = ? AND user_id = ?")
            .bind(proposal_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

    let delta = match new_vote {
        Some(vote) => {
            sqlx::query(
                r#"
                INSERT INTO proposal_votes (proposal_id, user_id, vote)
                VALUES (?, ?, ?)
                ON CONFLICT(proposal_id, user_id) DO UPDATE SET vote = excluded.vote
                "#,
            )
            .bind(proposal_id)
            .bind(user_id)
            .bind(vote)
            .execute(&mut *tx)
            .await?;
            vote - existing.unwrap_or(0)
        }
        None => {
            sqlx::query("DELETE FROM proposal_votes WHERE proposal_id = ? AND user_id = ?")
                .bind(proposal_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            -existing.unwrap_or(0)
        }
    };

    let new_score: i64 =
        sqlx::query_scalar("UPDATE proposals SET score = score + ? WHERE id = ? RETURNING score")
            .bind(delta)
            .bind(proposal_id)
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;
    Ok(new_score)
}

/// Increment the approval counter, returning the new count
pub async fn increment_approvals(pool: &SqlitePool, id: i64) -> Result<i64> {
    let approvals: i64 = sqlx::query_scalar(
        "UPDATE proposals SET approvals = approvals + 1 WHERE id = ? RETURNING approvals",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(approvals)
}

/// Force a disputed proposal back to pending and decrement approvals
/// (floor 0). Only touches proposals currently marked accurate; returns
/// whether a row changed.
pub async fn apply_dispute(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE proposals
        SET status = 'pending', approvals = MAX(0, approvals - 1)
        WHERE id = ? AND status = 'accurate'
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
