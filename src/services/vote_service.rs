//! Vote ledger and score aggregation.
//!
//! Counters are denormalized: `cast_vote` moves `score`, `upvotes` and
//! `downvotes` by the vote delta instead of recounting the `votes` table. That
//! keeps a vote O(1), but the counters drift if anything other than this module
//! writes them. `upvotes`/`downvotes` record the direction of each delta rather
//! than the number of current up/down voters, so flipping a vote from +1 to -1
//! adds 2 to `downvotes` and leaves `upvotes` alone.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{CommentPatch, PostPatch, TargetKind, Vote, VoteOutcome, VoteTarget, VoteValue},
    storage::{Storage, Transaction, VoteFilter},
};

pub const DEFAULT_TARGET_VOTES_LIMIT: usize = 100;
pub const DEFAULT_USER_VOTES_LIMIT: usize = 50;

/// The three counters every vote target carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreCounters {
    pub score: i32,
    pub upvotes: i32,
    pub downvotes: i32,
}

impl ScoreCounters {
    pub fn with_delta(self, delta: i32) -> Self {
        let mut next = self;
        next.score += delta;
        if delta > 0 {
            next.upvotes += delta;
        } else if delta < 0 {
            next.downvotes += delta.abs();
        }
        next
    }
}

/// Records `value` as `user_id`'s opinion on `target` and moves the target's
/// counters by the difference from the previous opinion.
///
/// The ledger write and the counter update commit together; if the target does
/// not exist nothing is written and `NotFound` is returned.
pub async fn cast_vote(
    store: &dyn Storage,
    user_id: Uuid,
    target: VoteTarget,
    value: VoteValue,
) -> Result<VoteOutcome> {
    let mut tx = store.begin().await?;

    let existing = tx.find_vote(user_id, target.id).await?;
    let old_value = existing.as_ref().map_or(0, |v| i32::from(v.value));
    let new_value = i32::from(value.as_i16());
    let delta = new_value - old_value;

    if let Some(existing) = &existing {
        if existing.target_kind != target.kind {
            return Err(AppError::BadRequest(format!(
                "Vote target {} is a {:?}, not a {:?}",
                target.id, existing.target_kind, target.kind
            )));
        }
    }

    match (&existing, value) {
        (Some(existing), VoteValue::Neutral) => tx.delete_vote(existing.id).await?,
        (Some(existing), _) => {
            if existing.value != value.as_i16() {
                tx.set_vote_value(existing.id, value.as_i16()).await?;
            }
        }
        (None, VoteValue::Neutral) => {}
        (None, _) => {
            tx.insert_vote(&Vote {
                id: Uuid::new_v4(),
                user_id,
                target_id: target.id,
                target_kind: target.kind,
                value: value.as_i16(),
                created_at: Utc::now(),
            })
            .await?;
        }
    }

    apply_score_delta(tx.as_mut(), target, delta).await?;
    tx.commit().await?;

    tracing::debug!(
        %user_id,
        target_id = %target.id,
        target_kind = ?target.kind,
        old_value,
        new_value,
        score_change = delta,
        "Vote cast"
    );

    Ok(VoteOutcome {
        applied: true,
        score_change: delta,
    })
}

/// Moves the counters of `target` by `delta`, dispatching on the target kind.
pub async fn apply_score_delta(
    tx: &mut dyn Transaction,
    target: VoteTarget,
    delta: i32,
) -> Result<()> {
    match target.kind {
        TargetKind::Post => update_post_score(tx, target.id, delta).await,
        TargetKind::Comment => update_comment_score(tx, target.id, delta).await,
    }
}

async fn update_post_score(tx: &mut dyn Transaction, post_id: Uuid, delta: i32) -> Result<()> {
    let post = tx
        .get_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if delta == 0 {
        return Ok(());
    }

    let next = ScoreCounters {
        score: post.score,
        upvotes: post.upvotes,
        downvotes: post.downvotes,
    }
    .with_delta(delta);

    tx.patch_post(
        post_id,
        &PostPatch {
            score: Some(next.score),
            upvotes: Some(next.upvotes),
            downvotes: Some(next.downvotes),
            ..Default::default()
        },
    )
    .await
}

async fn update_comment_score(
    tx: &mut dyn Transaction,
    comment_id: Uuid,
    delta: i32,
) -> Result<()> {
    let comment = tx
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    if delta == 0 {
        return Ok(());
    }

    let next = ScoreCounters {
        score: comment.score,
        upvotes: comment.upvotes,
        downvotes: comment.downvotes,
    }
    .with_delta(delta);

    tx.patch_comment(
        comment_id,
        &CommentPatch {
            score: Some(next.score),
            upvotes: Some(next.upvotes),
            downvotes: Some(next.downvotes),
            ..Default::default()
        },
    )
    .await
}

/// The user's current opinion on a target: -1, 0 or 1.
pub async fn get_user_vote(store: &dyn Storage, user_id: Uuid, target_id: Uuid) -> Result<i16> {
    let mut reader = store.snapshot().await?;
    let vote = reader.find_vote(user_id, target_id).await?;
    Ok(vote.map_or(0, |v| v.value))
}

pub async fn get_votes_by_target(
    store: &dyn Storage,
    target_id: Uuid,
    limit: usize,
) -> Result<Vec<Vote>> {
    let mut reader = store.snapshot().await?;
    reader
        .query_votes(VoteFilter::Target(target_id), Some(limit))
        .await
}

pub async fn get_votes_by_user(
    store: &dyn Storage,
    user_id: Uuid,
    limit: usize,
) -> Result<Vec<Vote>> {
    let mut reader = store.snapshot().await?;
    reader.query_votes(VoteFilter::User(user_id), Some(limit)).await
}
