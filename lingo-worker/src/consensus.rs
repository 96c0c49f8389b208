//! Consensus engine for proposal statuses
//!
//! Pure ranking logic with no I/O. Given every proposal attached to one
//! translation slot, decides which single proposal (if any) is the accepted
//! one. Moderator approvals weigh four times a community vote.
//!
//! Ties on rank break deterministically: earliest created proposal first,
//! then smallest id.

use chrono::{DateTime, Utc};
use lingo_common::db::models::ProposalStatus;

/// Ranking input: the scoring fields of one proposal
#[derive(Debug, Clone)]
pub struct ProposalRank {
    pub id: i64,
    pub score: i64,
    pub approvals: i64,
    pub created_at: DateTime<Utc>,
}

impl ProposalRank {
    /// Ordering key: approvals weigh 4x a vote
    pub fn rank(&self) -> i64 {
        self.score + self.approvals * 4
    }
}

/// Status decision for one proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDecision {
    pub id: i64,
    pub status: ProposalStatus,
}

/// Decide the status of every proposal attached to one translation slot.
///
/// Rules:
/// 1. `skip` (a proposal mid-deletion) is excluded and gets no decision.
/// 2. Proposals are ordered by rank descending.
/// 3. The top-ranked proposal becomes `Accurate` iff its score is
///    non-negative; every other proposal becomes `Pending`.
/// 4. A single remaining proposal follows the same score rule.
pub fn resolve(proposals: &[ProposalRank], skip: Option<i64>) -> Vec<StatusDecision> {
    let mut remaining: Vec<&ProposalRank> = proposals
        .iter()
        .filter(|p| skip != Some(p.id))
        .collect();

    if remaining.is_empty() {
        return Vec::new();
    }

    remaining.sort_by(|a, b| {
        b.rank()
            .cmp(&a.rank())
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    remaining
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let status = if i == 0 && p.score >= 0 {
                ProposalStatus::Accurate
            } else {
                ProposalStatus::Pending
            };
            StatusDecision { id: p.id, status }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn proposal(id: i64, score: i64, approvals: i64) -> ProposalRank {
        // created_at ordered by id so default tie-break follows id
        ProposalRank {
            id,
            score,
            approvals,
            created_at: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
        }
    }

    fn status_of(decisions: &[StatusDecision], id: i64) -> ProposalStatus {
        decisions.iter().find(|d| d.id == id).unwrap().status
    }

    #[test]
    fn approvals_outweigh_votes() {
        // ranks: 3 + 1*4 = 7 vs 5 + 0 = 5
        let decisions = resolve(&[proposal(1, 3, 1), proposal(2, 5, 0)], None);
        assert_eq!(status_of(&decisions, 1), ProposalStatus::Accurate);
        assert_eq!(status_of(&decisions, 2), ProposalStatus::Pending);
    }

    #[test]
    fn exactly_one_accurate_winner() {
        let proposals = vec![
            proposal(1, 0, 0),
            proposal(2, 4, 2),
            proposal(3, 12, 0),
            proposal(4, -1, 5),
        ];
        let decisions = resolve(&proposals, None);
        let accurate: Vec<_> = decisions
            .iter()
            .filter(|d| d.status == ProposalStatus::Accurate)
            .collect();
        assert_eq!(accurate.len(), 1);
        assert_eq!(accurate[0].id, 4); // rank 19 beats 12
    }

    #[test]
    fn negative_score_top_stays_pending() {
        // Top rank but negative score cannot win
        let decisions = resolve(&[proposal(1, -1, 3), proposal(2, -5, 0)], None);
        assert!(decisions
            .iter()
            .all(|d| d.status == ProposalStatus::Pending));
    }

    #[test]
    fn single_negative_proposal_stays_pending() {
        let decisions = resolve(&[proposal(1, -1, 0)], None);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].status, ProposalStatus::Pending);
    }

    #[test]
    fn single_zero_score_proposal_wins() {
        let decisions = resolve(&[proposal(1, 0, 0)], None);
        assert_eq!(status_of(&decisions, 1), ProposalStatus::Accurate);
    }

    #[test]
    fn skip_excluded_from_output_and_ranking() {
        let proposals = vec![proposal(1, 10, 0), proposal(2, 5, 0), proposal(3, 1, 0)];

        let decisions = resolve(&proposals, Some(1));
        assert!(decisions.iter().all(|d| d.id != 1));
        // With the leader skipped, second place wins
        assert_eq!(status_of(&decisions, 2), ProposalStatus::Accurate);
        assert_eq!(status_of(&decisions, 3), ProposalStatus::Pending);

        // Relative order of the remaining proposals is unchanged
        let without_skip = resolve(&[proposal(2, 5, 0), proposal(3, 1, 0)], None);
        assert_eq!(decisions, without_skip);
    }

    #[test]
    fn tie_breaks_to_earliest_created() {
        let older = ProposalRank {
            id: 7,
            score: 4,
            approvals: 0,
            created_at: Utc.timestamp_opt(1_000, 0).unwrap(),
        };
        let newer = ProposalRank {
            id: 2,
            score: 4,
            approvals: 0,
            created_at: Utc.timestamp_opt(2_000, 0).unwrap(),
        };
        let decisions = resolve(&[newer, older], None);
        assert_eq!(status_of(&decisions, 7), ProposalStatus::Accurate);
        assert_eq!(status_of(&decisions, 2), ProposalStatus::Pending);
    }

    #[test]
    fn empty_input_yields_no_decisions() {
        assert!(resolve(&[], None).is_empty());
        assert!(resolve(&[proposal(1, 0, 0)], Some(1)).is_empty());
    }

    #[test]
    fn rank_ordering_is_monotonic() {
        let proposals = vec![
            proposal(1, 2, 1), // rank 6
            proposal(2, 5, 1), // rank 9
            proposal(3, 1, 0), // rank 1
        ];
        let decisions = resolve(&proposals, None);
        // Highest rank wins; everything below it is pending
        assert_eq!(status_of(&decisions, 2), ProposalStatus::Accurate);
        assert_eq!(status_of(&decisions, 1), ProposalStatus::Pending);
        assert_eq!(status_of(&decisions, 3), ProposalStatus::Pending);
    }
}
