use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "post_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Text,
    Link,
    Image,
}

/// A submission in a subreddit. `score == upvotes - downvotes` holds after every
/// committed write; the counters are only ever moved by the vote ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub url: Option<String>,
    pub post_type: PostType,
    pub author_id: Uuid,
    pub subreddit: String,
    pub score: i32,
    pub upvotes: i32,
    pub downvotes: i32,
    pub comment_count: i32,
    pub is_stickied: bool,
    pub is_locked: bool,
    pub is_nsfw: bool,
    pub is_removed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a post row. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPatch {
    pub content: Option<String>,
    pub score: Option<i32>,
    pub upvotes: Option<i32>,
    pub downvotes: Option<i32>,
    pub comment_count: Option<i32>,
    pub is_stickied: Option<bool>,
    pub is_locked: Option<bool>,
    pub is_nsfw: Option<bool>,
    pub is_removed: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Post {
    pub fn apply(&mut self, patch: &PostPatch) {
        if let Some(content) = &patch.content {
            self.content = Some(content.clone());
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
        if let Some(comment_count) = patch.comment_count {
            self.comment_count = comment_count;
        }
        if let Some(is_stickied) = patch.is_stickied {
            self.is_stickied = is_stickied;
        }
        if let Some(is_locked) = patch.is_locked {
            self.is_locked = is_locked;
        }
        if let Some(is_nsfw) = patch.is_nsfw {
            self.is_nsfw = is_nsfw;
        }
        if let Some(is_removed) = patch.is_removed {
            self.is_removed = is_removed;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

// Create post request
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    pub content: Option<String>,
    #[validate(url)]
    pub url: Option<String>,
    pub post_type: PostType,
    #[validate(length(min = 1, max = 64))]
    pub subreddit: String,
    pub is_nsfw: Option<bool>,
}

// Update post request
#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    #[validate(length(max = 40000))]
    pub content: Option<String>,
    pub is_stickied: Option<bool>,
    pub is_locked: Option<bool>,
    pub is_nsfw: Option<bool>,
}

// Sorting options for post listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    #[default]
    Hot,
    New,
    Top,
}
