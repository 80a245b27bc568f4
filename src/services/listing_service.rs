//! Read-only listings: candidates come from the store, ordering from [`ranking`].

use uuid::Uuid;

use crate::{
    error::Result,
    models::{Comment, CommentSort, Post, PostSort},
    services::{comment_service::comment_order, ranking},
    storage::{CommentFilter, PostFilter, Storage},
};

pub const DEFAULT_COMMENTS_LIMIT: usize = 50;

pub async fn get_front_page(store: &dyn Storage, sort: PostSort, limit: usize) -> Result<Vec<Post>> {
    list_posts(store, &PostFilter::All, sort, limit).await
}

pub async fn get_by_subreddit(
    store: &dyn Storage,
    subreddit: &str,
    sort: PostSort,
    limit: usize,
) -> Result<Vec<Post>> {
    list_posts(
        store,
        &PostFilter::Subreddit(subreddit.to_string()),
        sort,
        limit,
    )
    .await
}

async fn list_posts(
    store: &dyn Storage,
    filter: &PostFilter,
    sort: PostSort,
    limit: usize,
) -> Result<Vec<Post>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let (order, window) = ranking::candidate_window(sort, limit);
    let mut reader = store.snapshot().await?;
    let candidates = reader.query_posts(filter, order, Some(window)).await?;

    tracing::debug!(?filter, ?sort, limit, candidates = candidates.len(), "Ranking posts");

    Ok(ranking::rank_posts(sort, candidates, limit))
}

/// Comments on `post_id` that have no parent.
pub async fn get_top_level_comments(
    store: &dyn Storage,
    post_id: Uuid,
    sort: CommentSort,
    limit: usize,
) -> Result<Vec<Comment>> {
    let mut reader = store.snapshot().await?;
    reader
        .query_comments(
            CommentFilter::TopLevel(post_id),
            comment_order(sort),
            Some(limit),
        )
        .await
}
