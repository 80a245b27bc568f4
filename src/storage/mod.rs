//! Document store the ranking core runs against.
//!
//! Every mutating service call opens one [`Transaction`], performs its
//! read-modify-write sequence and commits. Dropping a transaction without
//! committing discards its writes, so an error raised half way through an
//! operation leaves no partial counter updates behind. Listings read through a
//! [`Reader`] snapshot and never write.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{Comment, CommentPatch, Post, PostPatch, Vote},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Ordering applied to an equality query. Ties keep insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    ScoreDesc,
    CreatedAtDesc,
}

/// Posts visible in listings. Removed posts are never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Subreddit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentFilter {
    /// Comments on a post that have no parent.
    TopLevel(Uuid),
    /// Direct replies to a comment.
    Children(Uuid),
    Author(Uuid),
}

/// Vote queries return rows in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteFilter {
    Target(Uuid),
    User(Uuid),
}

#[async_trait]
pub trait Reader: Send {
    async fn get_post(&mut self, id: Uuid) -> Result<Option<Post>>;

    async fn get_comment(&mut self, id: Uuid) -> Result<Option<Comment>>;

    async fn find_vote(&mut self, user_id: Uuid, target_id: Uuid) -> Result<Option<Vote>>;

    async fn query_posts(
        &mut self,
        filter: &PostFilter,
        order: OrderBy,
        limit: Option<usize>,
    ) -> Result<Vec<Post>>;

    async fn query_comments(
        &mut self,
        filter: CommentFilter,
        order: OrderBy,
        limit: Option<usize>,
    ) -> Result<Vec<Comment>>;

    async fn query_votes(&mut self, filter: VoteFilter, limit: Option<usize>) -> Result<Vec<Vote>>;
}

#[async_trait]
pub trait Transaction: Reader {
    async fn insert_post(&mut self, post: &Post) -> Result<()>;

    async fn insert_comment(&mut self, comment: &Comment) -> Result<()>;

    /// Fails with `InvariantViolation` if the user already has a vote on the target.
    async fn insert_vote(&mut self, vote: &Vote) -> Result<()>;

    /// Patches are no-ops when the row no longer exists.
    async fn patch_post(&mut self, id: Uuid, patch: &PostPatch) -> Result<()>;

    async fn patch_comment(&mut self, id: Uuid, patch: &CommentPatch) -> Result<()>;

    async fn set_vote_value(&mut self, id: Uuid, value: i16) -> Result<()>;

    async fn delete_vote(&mut self, id: Uuid) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Opens an atomic read-write unit of work.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    /// Opens a consistent read-only view.
    async fn snapshot(&self) -> Result<Box<dyn Reader>>;
}
