use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

use super::{CommentFilter, OrderBy, PostFilter, Reader, Storage, Transaction, VoteFilter};
use crate::{
    error::{AppError, Result},
    models::{Comment, CommentPatch, Post, PostPatch, Vote},
};

/// In-process store. Writers are serialized by the lock and mutate the live
/// tables in place, recording an undo entry per change. Dropping a transaction
/// without committing replays the undo log in reverse.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
struct Tables {
    posts: Vec<Post>,
    post_index: HashMap<Uuid, usize>,
    comments: Vec<Comment>,
    comment_index: HashMap<Uuid, usize>,
    // Keyed by insertion sequence so iteration keeps cast order across deletes.
    votes: BTreeMap<u64, Vote>,
    vote_by_pair: HashMap<(Uuid, Uuid), u64>,
    vote_by_id: HashMap<Uuid, u64>,
    next_vote_seq: u64,
}

/// Inverse of one write, applied on rollback.
#[derive(Debug)]
enum Undo {
    InsertPost,
    InsertComment,
    PatchPost(usize, Box<Post>),
    PatchComment(usize, Box<Comment>),
    InsertVote(u64),
    SetVoteValue(u64, i16),
    DeleteVote(u64, Vote),
}

fn take_limit<T>(mut rows: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

impl Tables {
    fn get_post(&self, id: Uuid) -> Option<Post> {
        self.post_index.get(&id).map(|&i| self.posts[i].clone())
    }

    fn get_comment(&self, id: Uuid) -> Option<Comment> {
        self.comment_index.get(&id).map(|&i| self.comments[i].clone())
    }

    fn find_vote(&self, user_id: Uuid, target_id: Uuid) -> Option<Vote> {
        self.vote_by_pair
            .get(&(user_id, target_id))
            .and_then(|seq| self.votes.get(seq))
            .cloned()
    }

    fn query_posts(&self, filter: &PostFilter, order: OrderBy, limit: Option<usize>) -> Vec<Post> {
        let mut rows: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| !p.is_removed)
            .filter(|p| match filter {
                PostFilter::All => true,
                PostFilter::Subreddit(name) => &p.subreddit == name,
            })
            .cloned()
            .collect();

        // sort_by is stable, so equal keys stay in insertion order
        match order {
            OrderBy::ScoreDesc => rows.sort_by(|a, b| b.score.cmp(&a.score)),
            OrderBy::CreatedAtDesc => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        take_limit(rows, limit)
    }

    fn query_comments(
        &self,
        filter: CommentFilter,
        order: OrderBy,
        limit: Option<usize>,
    ) -> Vec<Comment> {
        let mut rows: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| match filter {
                CommentFilter::TopLevel(post_id) => c.post_id == post_id && c.parent_id.is_none(),
                CommentFilter::Children(parent_id) => c.parent_id == Some(parent_id),
                CommentFilter::Author(author_id) => c.author_id == author_id,
            })
            .cloned()
            .collect();

        match order {
            OrderBy::ScoreDesc => rows.sort_by(|a, b| b.score.cmp(&a.score)),
            OrderBy::CreatedAtDesc => rows.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        take_limit(rows, limit)
    }

    fn query_votes(&self, filter: VoteFilter, limit: Option<usize>) -> Vec<Vote> {
        let rows = self
            .votes
            .values()
            .filter(|v| match filter {
                VoteFilter::Target(target_id) => v.target_id == target_id,
                VoteFilter::User(user_id) => v.user_id == user_id,
            })
            .cloned()
            .collect();
        take_limit(rows, limit)
    }

    fn insert_post(&mut self, post: &Post) -> Result<Undo> {
        if self.post_index.contains_key(&post.id) {
            return Err(AppError::InvariantViolation(format!(
                "post {} already exists",
                post.id
            )));
        }
        self.post_index.insert(post.id, self.posts.len());
        self.posts.push(post.clone());
        Ok(Undo::InsertPost)
    }

    fn insert_comment(&mut self, comment: &Comment) -> Result<Undo> {
        if self.comment_index.contains_key(&comment.id) {
            return Err(AppError::InvariantViolation(format!(
                "comment {} already exists",
                comment.id
            )));
        }
        self.comment_index.insert(comment.id, self.comments.len());
        self.comments.push(comment.clone());
        Ok(Undo::InsertComment)
    }

    fn insert_vote(&mut self, vote: &Vote) -> Result<Undo> {
        let pair = (vote.user_id, vote.target_id);
        if self.vote_by_pair.contains_key(&pair) {
            return Err(AppError::InvariantViolation(format!(
                "user {} already voted on {}",
                vote.user_id, vote.target_id
            )));
        }
        let seq = self.next_vote_seq;
        self.next_vote_seq += 1;
        self.restore_vote(seq, vote.clone());
        Ok(Undo::InsertVote(seq))
    }

    fn patch_post(&mut self, id: Uuid, patch: &PostPatch) -> Option<Undo> {
        let &i = self.post_index.get(&id)?;
        let before = self.posts[i].clone();
        self.posts[i].apply(patch);
        Some(Undo::PatchPost(i, Box::new(before)))
    }

    fn patch_comment(&mut self, id: Uuid, patch: &CommentPatch) -> Option<Undo> {
        let &i = self.comment_index.get(&id)?;
        let before = self.comments[i].clone();
        self.comments[i].apply(patch);
        Some(Undo::PatchComment(i, Box::new(before)))
    }

    fn set_vote_value(&mut self, id: Uuid, value: i16) -> Option<Undo> {
        let &seq = self.vote_by_id.get(&id)?;
        let vote = self.votes.get_mut(&seq)?;
        let before = vote.value;
        vote.value = value;
        Some(Undo::SetVoteValue(seq, before))
    }

    fn delete_vote(&mut self, id: Uuid) -> Option<Undo> {
        let seq = self.vote_by_id.remove(&id)?;
        let vote = self.votes.remove(&seq)?;
        self.vote_by_pair.remove(&(vote.user_id, vote.target_id));
        Some(Undo::DeleteVote(seq, vote))
    }

    fn restore_vote(&mut self, seq: u64, vote: Vote) {
        self.vote_by_pair.insert((vote.user_id, vote.target_id), seq);
        self.vote_by_id.insert(vote.id, seq);
        self.votes.insert(seq, vote);
    }

    fn revert(&mut self, undo: Undo) {
        match undo {
            // Inserts append, and the log is replayed newest first, so the row
            // being reverted is always the last one.
            Undo::InsertPost => {
                if let Some(post) = self.posts.pop() {
                    self.post_index.remove(&post.id);
                }
            }
            Undo::InsertComment => {
                if let Some(comment) = self.comments.pop() {
                    self.comment_index.remove(&comment.id);
                }
            }
            Undo::PatchPost(i, before) => self.posts[i] = *before,
            Undo::PatchComment(i, before) => self.comments[i] = *before,
            Undo::InsertVote(seq) => {
                if let Some(vote) = self.votes.remove(&seq) {
                    self.vote_by_pair.remove(&(vote.user_id, vote.target_id));
                    self.vote_by_id.remove(&vote.id);
                }
            }
            Undo::SetVoteValue(seq, value) => {
                if let Some(vote) = self.votes.get_mut(&seq) {
                    vote.value = value;
                }
            }
            Undo::DeleteVote(seq, vote) => self.restore_vote(seq, vote),
        }
    }
}

pub struct MemoryTransaction {
    live: OwnedRwLockWriteGuard<Tables>,
    undo: Vec<Undo>,
}

impl MemoryTransaction {
    fn record(&mut self, undo: Option<Undo>) {
        self.undo.extend(undo);
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        while let Some(undo) = self.undo.pop() {
            self.live.revert(undo);
        }
    }
}

pub struct MemorySnapshot {
    tables: OwnedRwLockReadGuard<Tables>,
}

#[async_trait]
impl Storage for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let live = self.tables.clone().write_owned().await;
        Ok(Box::new(MemoryTransaction {
            live,
            undo: Vec::new(),
        }))
    }

    async fn snapshot(&self) -> Result<Box<dyn Reader>> {
        let tables = self.tables.clone().read_owned().await;
        Ok(Box::new(MemorySnapshot { tables }))
    }
}

#[async_trait]
impl Reader for MemorySnapshot {
    async fn get_post(&mut self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.tables.get_post(id))
    }

    async fn get_comment(&mut self, id: Uuid) -> Result<Option<Comment>> {
        Ok(self.tables.get_comment(id))
    }

    async fn find_vote(&mut self, user_id: Uuid, target_id: Uuid) -> Result<Option<Vote>> {
        Ok(self.tables.find_vote(user_id, target_id))
    }

    async fn query_posts(
        &mut self,
        filter: &PostFilter,
        order: OrderBy,
        limit: Option<usize>,
    ) -> Result<Vec<Post>> {
        Ok(self.tables.query_posts(filter, order, limit))
    }

    async fn query_comments(
        &mut self,
        filter: CommentFilter,
        order: OrderBy,
        limit: Option<usize>,
    ) -> Result<Vec<Comment>> {
        Ok(self.tables.query_comments(filter, order, limit))
    }

    async fn query_votes(&mut self, filter: VoteFilter, limit: Option<usize>) -> Result<Vec<Vote>> {
        Ok(self.tables.query_votes(filter, limit))
    }
}

#[async_trait]
impl Reader for MemoryTransaction {
    async fn get_post(&mut self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.live.get_post(id))
    }

    async fn get_comment(&mut self, id: Uuid) -> Result<Option<Comment>> {
        Ok(self.live.get_comment(id))
    }

    async fn find_vote(&mut self, user_id: Uuid, target_id: Uuid) -> Result<Option<Vote>> {
        Ok(self.live.find_vote(user_id, target_id))
    }

    async fn query_posts(
        &mut self,
        filter: &PostFilter,
        order: OrderBy,
        limit: Option<usize>,
    ) -> Result<Vec<Post>> {
        Ok(self.live.query_posts(filter, order, limit))
    }

    async fn query_comments(
        &mut self,
        filter: CommentFilter,
        order: OrderBy,
        limit: Option<usize>,
    ) -> Result<Vec<Comment>> {
        Ok(self.live.query_comments(filter, order, limit))
    }

    async fn query_votes(&mut self, filter: VoteFilter, limit: Option<usize>) -> Result<Vec<Vote>> {
        Ok(self.live.query_votes(filter, limit))
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn insert_post(&mut self, post: &Post) -> Result<()> {
        let undo = self.live.insert_post(post)?;
        self.record(Some(undo));
        Ok(())
    }

    async fn insert_comment(&mut self, comment: &Comment) -> Result<()> {
        let undo = self.live.insert_comment(comment)?;
        self.record(Some(undo));
        Ok(())
    }

    async fn insert_vote(&mut self, vote: &Vote) -> Result<()> {
        let undo = self.live.insert_vote(vote)?;
        self.record(Some(undo));
        Ok(())
    }

    async fn patch_post(&mut self, id: Uuid, patch: &PostPatch) -> Result<()> {
        let undo = self.live.patch_post(id, patch);
        self.record(undo);
        Ok(())
    }

    async fn patch_comment(&mut self, id: Uuid, patch: &CommentPatch) -> Result<()> {
        let undo = self.live.patch_comment(id, patch);
        self.record(undo);
        Ok(())
    }

    async fn set_vote_value(&mut self, id: Uuid, value: i16) -> Result<()> {
        let undo = self.live.set_vote_value(id, value);
        self.record(undo);
        Ok(())
    }

    async fn delete_vote(&mut self, id: Uuid) -> Result<()> {
        let undo = self.live.delete_vote(id);
        self.record(undo);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut tx = self;
        tx.undo.clear();
        Ok(())
    }
}
