//! Ordering rules for post listings.
//!
//! `hot` does not scan every post: it takes the `2 * limit` highest raw scores
//! and re-sorts only those by [`hot_score`]. A young post with a modest score
//! that falls outside that window never reaches the listing even if its hot
//! score would beat everything inside it. Listings accept that bias in exchange
//! for a bounded candidate fetch.

use chrono::{DateTime, Utc};

use crate::{
    models::{Post, PostSort},
    storage::OrderBy,
};

pub const HOT_GRAVITY: f64 = 1.8;
pub const HOT_AGE_OFFSET_HOURS: f64 = 2.0;
pub const HOT_CANDIDATE_FACTOR: usize = 2;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// `score / (age_hours + 2)^1.8`. Items dated in the future are treated as brand new.
pub fn hot_score(score: i32, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_millis = (now - created_at).num_milliseconds().max(0);
    let age_hours = age_millis as f64 / MILLIS_PER_HOUR;
    f64::from(score) / (age_hours + HOT_AGE_OFFSET_HOURS).powf(HOT_GRAVITY)
}

/// Storage ordering and window size to fetch for a listing of `limit` posts.
pub fn candidate_window(sort: PostSort, limit: usize) -> (OrderBy, usize) {
    match sort {
        PostSort::New => (OrderBy::CreatedAtDesc, limit),
        PostSort::Top => (OrderBy::ScoreDesc, limit),
        PostSort::Hot => (
            OrderBy::ScoreDesc,
            limit.saturating_mul(HOT_CANDIDATE_FACTOR),
        ),
    }
}

pub fn rank_posts(sort: PostSort, candidates: Vec<Post>, limit: usize) -> Vec<Post> {
    rank_posts_at(sort, candidates, limit, Utc::now())
}

/// Orders an arbitrary candidate list and truncates it to `limit`.
/// All sorts are stable, so ties keep the candidates' incoming order.
///
/// Candidates need not arrive sorted or pre-truncated. `Hot` re-sorts by raw
/// score and cuts its own window before ranking, so a caller passing more
/// than the window gets the same result as the store's windowed query.
pub fn rank_posts_at(
    sort: PostSort,
    mut candidates: Vec<Post>,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<Post> {
    match sort {
        PostSort::New => {
            candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            candidates.truncate(limit);
            candidates
        }
        PostSort::Top => {
            candidates.sort_by(|a, b| b.score.cmp(&a.score));
            candidates.truncate(limit);
            candidates
        }
        PostSort::Hot => {
            candidates.sort_by(|a, b| b.score.cmp(&a.score));
            candidates.truncate(limit.saturating_mul(HOT_CANDIDATE_FACTOR));

            let mut scored: Vec<(f64, Post)> = candidates
                .into_iter()
                .map(|post| (hot_score(post.score, post.created_at, now), post))
                .collect();
            scored.sort_by(|a, b| b.0.total_cmp(&a.0));
            scored.truncate(limit);
            scored.into_iter().map(|(_, post)| post).collect()
        }
    }
}
