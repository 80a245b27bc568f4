use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "vote_target_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Post,
    Comment,
}

/// Something a user can vote on: the kind tag decides which table holds the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteTarget {
    pub kind: TargetKind,
    pub id: Uuid,
}

impl VoteTarget {
    pub fn post(id: Uuid) -> Self {
        Self {
            kind: TargetKind::Post,
            id,
        }
    }

    pub fn comment(id: Uuid) -> Self {
        Self {
            kind: TargetKind::Comment,
            id,
        }
    }
}

/// A user's requested opinion. `Neutral` retracts whatever was there before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum VoteValue {
    Down,
    Neutral,
    Up,
}

impl VoteValue {
    pub fn as_i16(self) -> i16 {
        match self {
            VoteValue::Down => -1,
            VoteValue::Neutral => 0,
            VoteValue::Up => 1,
        }
    }
}

impl TryFrom<i16> for VoteValue {
    type Error = AppError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(VoteValue::Down),
            0 => Ok(VoteValue::Neutral),
            1 => Ok(VoteValue::Up),
            _ => Err(AppError::BadRequest("Invalid vote type".to_string())),
        }
    }
}

impl From<VoteValue> for i16 {
    fn from(value: VoteValue) -> Self {
        value.as_i16()
    }
}

/// Ledger row. At most one exists per (user_id, target_id) and `value` is never 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub target_kind: TargetKind,
    pub value: i16, // -1 for downvote, 1 for upvote
    pub created_at: DateTime<Utc>,
}

// Vote request
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub vote_type: i16, // -1 for downvote, 0 for remove vote, 1 for upvote
}

/// Result of a completed vote cast. A repeat of the current vote is still
/// `applied`, with a `score_change` of 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub applied: bool,
    pub score_change: i32,
}
