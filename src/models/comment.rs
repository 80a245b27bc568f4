use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Content a removed comment is left with. The row itself stays so replies keep their parent.
pub const REMOVED_CONTENT: &str = "[removed]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    /// 0 for top-level comments, `parent.depth + 1` otherwise.
    pub depth: i32,
    pub score: i32,
    pub upvotes: i32,
    pub downvotes: i32,
    /// Direct children that have not been removed.
    pub child_count: i32,
    pub is_edited: bool,
    pub is_removed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentPatch {
    pub content: Option<String>,
    pub score: Option<i32>,
    pub upvotes: Option<i32>,
    pub downvotes: Option<i32>,
    pub child_count: Option<i32>,
    pub is_edited: Option<bool>,
    pub is_removed: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CommentPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Comment {
    pub fn apply(&mut self, patch: &CommentPatch) {
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(score) = patch.score {
            self.score = score;
        }
        if let Some(upvotes) = patch.upvotes {
            self.upvotes = upvotes;
        }
        if let Some(downvotes) = patch.downvotes {
            self.downvotes = downvotes;
        }
        if let Some(child_count) = patch.child_count {
            self.child_count = child_count;
        }
        if let Some(is_edited) = patch.is_edited {
            self.is_edited = is_edited;
        }
        if let Some(is_removed) = patch.is_removed {
            self.is_removed = is_removed;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

// Create comment request
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
}

// Update comment request
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
}

// Comment sorting options. `Top` orders the same way as `Best`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentSort {
    #[default]
    Best,
    Top,
    New,
}
