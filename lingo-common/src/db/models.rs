//! Row models shared across the backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked upstream project
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Project {
    pub id: String,
    pub slug: String,
    pub title: String,
    /// Opt-in marker set by the project owner; NULL means not participating
    pub opt_in: Option<String>,
}

/// One discovered release of a tracked project. Never mutated.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Version {
    pub id: String,
    pub project_id: String,
}

/// One translatable string, deduplicated by (key, value) content
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub key: String,
    pub value: String,
}

/// The (item, target language) slot that proposals attach to
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Translation {
    pub id: i64,
    pub item_id: i64,
    pub language_code: String,
}

/// Consensus status of a proposal. Never set directly by callers; always the
/// output of the consensus engine (or a dispute forcing `Pending`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Accurate,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Accurate => "accurate",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "accurate" => ProposalStatus::Accurate,
            _ => ProposalStatus::Pending,
        }
    }
}

/// One user's candidate translation for a slot
#[derive(Debug, Clone)]
pub struct Proposal {
    pub id: i64,
    pub translation_id: i64,
    pub user_id: String,
    pub value: String,
    pub note: Option<String>,
    pub status: ProposalStatus,
    /// Net votes (upvotes minus downvotes)
    pub score: i64,
    /// Moderator approvals, weighted 4x a vote in ranking
    pub approvals: i64,
    pub created_at: DateTime<Utc>,
}

/// Dirty-tracking row per (release, language) pair with accepted content
#[derive(Debug, Clone)]
pub struct PackStatus {
    pub version_id: String,
    pub language_code: String,
    pub needs_release: bool,
    pub last_updated: DateTime<Utc>,
}
