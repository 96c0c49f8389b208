//! Proposal lifecycle operations
//!
//! Vote, approve, dispute, create, edit, delete: every path that changes a
//! proposal's score or membership ends in a consensus recompute for its
//! translation slot, and any proposal that *became* accurate marks every
//! release containing the slot's item as dirty for that language.
//!
//! Callers (the HTTP boundary) are assumed to have already authenticated and
//! validated their input; this module enforces the domain rules only.

use crate::consensus::{resolve, ProposalRank};
use crate::db::{items, pack_status, proposals, translations};
use lingo_common::db::models::ProposalStatus;
use lingo_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

/// Direction of a community vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Up,
    Down,
    /// Remove the caller's existing vote
    Retract,
}

/// Register a vote and recompute statuses. Returns the proposal's new score.
///
/// Users cannot vote on their own proposals. The vote row and the score
/// change are applied in one transaction so concurrent votes never lose
/// updates.
pub async fn vote(
    pool: &SqlitePool,
    proposal_id: i64,
    user_id: &str,
    kind: VoteKind,
) -> Result<i64> {
    let proposal = proposals::get_proposal(pool, proposal_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("proposal {}", proposal_id)))?;

    if proposal.user_id == user_id {
        return Err(Error::InvalidInput(
            "cannot vote on your own proposal".to_string(),
        ));
    }

    let new_vote = match kind {
        VoteKind::Up => Some(1),
        VoteKind::Down => Some(-1),
        VoteKind::Retract => None,
    };

    let new_score = proposals::apply_vote_delta(pool, proposal_id, user_id, new_vote).await?;
    debug!(proposal_id, new_score, "Vote registered");

    recompute_statuses(pool, proposal.translation_id, None).await?;
    Ok(new_score)
}

/// Add a moderator approval and recompute. Returns the new approval count.
pub async fn approve(pool: &SqlitePool, proposal_id: i64) -> Result<i64> {
    let proposal = proposals::get_proposal(pool, proposal_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("proposal {}", proposal_id)))?;

    let approvals = proposals::increment_approvals(pool, proposal_id).await?;
    debug!(proposal_id, approvals, "Proposal approved");

    recompute_statuses(pool, proposal.translation_id, None).await?;
    Ok(approvals)
}

/// Dispute an accepted proposal: force it back to pending, decrement its
/// approvals (floor 0), then recompute the slot.
pub async fn dispute(pool: &SqlitePool, proposal_id: i64) -> Result<()> {
    let proposal = proposals::get_proposal(pool, proposal_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("proposal {}", proposal_id)))?;

    if proposal.status != ProposalStatus::Accurate {
        return Err(Error::InvalidInput(
            "only accurate proposals can be disputed".to_string(),
        ));
    }

    proposals::apply_dispute(pool, proposal_id).await?;
    info!(proposal_id, "Proposal disputed");

    recompute_statuses(pool, proposal.translation_id, None).await?;
    Ok(())
}

/// Create a proposal, lazily creating the translation slot for the
/// (item, language) pair, and recompute. Returns the new proposal's id.
pub async fn create_proposal(
    pool: &SqlitePool,
    item_id: i64,
    language_code: &str,
    user_id: &str,
    value: &str,
    note: Option<&str>,
) -> Result<i64> {
    let translation_id = translations::get_or_create(pool, item_id, language_code).await?;
    let proposal_id =
        proposals::insert_proposal(pool, translation_id, user_id, value, note).await?;

    debug!(proposal_id, translation_id, "Proposal created");
    recompute_statuses(pool, translation_id, None).await?;
    Ok(proposal_id)
}

/// Edit a proposal's text.
///
/// `preserve_status = true` is the moderator path: the text changes but the
/// prior status stands and no recompute runs.
pub async fn edit_proposal(
    pool: &SqlitePool,
    proposal_id: i64,
    value: &str,
    note: Option<&str>,
    preserve_status: bool,
) -> Result<()> {
    let proposal = proposals::get_proposal(pool, proposal_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("proposal {}", proposal_id)))?;

    proposals::update_value(pool, proposal_id, value, note).await?;

    if preserve_status {
        debug!(proposal_id, "Moderator edit, status preserved");
        return Ok(());
    }

    recompute_statuses(pool, proposal.translation_id, None).await?;
    Ok(())
}

/// Delete a proposal. The recompute runs with the doomed proposal excluded
/// so it cannot influence the outcome.
pub async fn remove_proposal(pool: &SqlitePool, proposal_id: i64) -> Result<()> {
    let proposal = proposals::get_proposal(pool, proposal_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("proposal {}", proposal_id)))?;

    recompute_statuses(pool, proposal.translation_id, Some(proposal_id)).await?;
    proposals::delete_proposal(pool, proposal_id).await?;

    debug!(proposal_id, "Proposal deleted");
    Ok(())
}

/// Run the consensus engine over a translation slot and persist the outcome.
///
/// Statuses are only written when they changed. If any proposal transitioned
/// to accurate, every release containing the slot's item is marked dirty for
/// the slot's language so the next packaging pass picks it up.
pub async fn recompute_statuses(
    pool: &SqlitePool,
    translation_id: i64,
    skip: Option<i64>,
) -> Result<()> {
    let rows = proposals::ranked_for_translation(pool, translation_id).await?;
    if rows.is_empty() {
        return Ok(());
    }

    let ranks: Vec<ProposalRank> = rows.iter().map(|r| r.rank.clone()).collect();
    let decisions = resolve(&ranks, skip);

    let mut became_accurate = false;
    for decision in &decisions {
        let prior = rows
            .iter()
            .find(|r| r.rank.id == decision.id)
            .map(|r| r.status);

        if prior != Some(decision.status) {
            proposals::set_status(pool, decision.id, decision.status).await?;
            if decision.status == ProposalStatus::Accurate {
                became_accurate = true;
            }
        }
    }

    if became_accurate {
        mark_versions_dirty(pool, translation_id).await?;
    }

    Ok(())
}

/// Mark every release containing the slot's item as needing a new pack for
/// the slot's language.
async fn mark_versions_dirty(pool: &SqlitePool, translation_id: i64) -> Result<()> {
    let translation = match translations::get_translation(pool, translation_id).await? {
        Some(t) => t,
        None => {
            warn!(translation_id, "Translation slot not found while marking dirty");
            return Ok(());
        }
    };

    let version_ids = items::versions_containing_item(pool, translation.item_id).await?;
    for version_id in &version_ids {
        pack_status::mark_dirty(pool, version_id, &translation.language_code).await?;
    }

    debug!(
        translation_id,
        versions = version_ids.len(),
        language = %translation.language_code,
        "Marked releases dirty"
    );
    Ok(())
}
