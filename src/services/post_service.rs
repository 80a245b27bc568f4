use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, Result},
    models::{CreatePostRequest, Post, PostPatch, PostType, UpdatePostRequest},
    storage::Storage,
};

pub async fn create_post(
    store: &dyn Storage,
    author_id: Uuid,
    request: &CreatePostRequest,
) -> Result<Post> {
    request.validate()?;

    match request.post_type {
        PostType::Text => {}
        PostType::Link | PostType::Image => {
            if request.url.as_deref().is_none_or(|url| url.trim().is_empty()) {
                return Err(AppError::BadRequest(
                    "Link and image posts must have a URL".to_string(),
                ));
            }
        }
    }

    let now = Utc::now();
    // Every post starts with its author's implicit upvote. No vote row backs it.
    let post = Post {
        id: Uuid::new_v4(),
        title: request.title.clone(),
        content: request.content.clone(),
        url: request.url.clone(),
        post_type: request.post_type,
        author_id,
        subreddit: request.subreddit.clone(),
        score: 1,
        upvotes: 1,
        downvotes: 0,
        comment_count: 0,
        is_stickied: false,
        is_locked: false,
        is_nsfw: request.is_nsfw.unwrap_or(false),
        is_removed: false,
        created_at: now,
        updated_at: now,
    };

    let mut tx = store.begin().await?;
    tx.insert_post(&post).await?;
    tx.commit().await?;

    tracing::info!(post_id = %post.id, %author_id, subreddit = %post.subreddit, "Post created");

    Ok(post)
}

pub async fn get_post_by_id(store: &dyn Storage, post_id: Uuid) -> Result<Option<Post>> {
    let mut reader = store.snapshot().await?;
    reader.get_post(post_id).await
}

pub async fn get_post(store: &dyn Storage, post_id: Uuid) -> Result<Post> {
    get_post_by_id(store, post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

pub async fn update_post(
    store: &dyn Storage,
    post_id: Uuid,
    request: &UpdatePostRequest,
) -> Result<Post> {
    request.validate()?;

    let mut tx = store.begin().await?;
    let mut post = tx
        .get_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let patch = PostPatch {
        content: request.content.clone(),
        is_stickied: request.is_stickied,
        is_locked: request.is_locked,
        is_nsfw: request.is_nsfw,
        updated_at: Some(Utc::now()),
        ..Default::default()
    };
    tx.patch_post(post_id, &patch).await?;
    tx.commit().await?;

    post.apply(&patch);
    tracing::debug!(%post_id, "Post updated");

    Ok(post)
}

/// Soft-removes a post. The row and its counters stay; listings skip it.
pub async fn remove_post(store: &dyn Storage, post_id: Uuid) -> Result<()> {
    let mut tx = store.begin().await?;
    tx.get_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    tx.patch_post(
        post_id,
        &PostPatch {
            is_removed: Some(true),
            updated_at: Some(Utc::now()),
            ..Default::default()
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(%post_id, "Post removed");
    Ok(())
}

pub async fn increment_comment_count(store: &dyn Storage, post_id: Uuid) -> Result<i32> {
    let mut tx = store.begin().await?;
    let post = tx
        .get_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let comment_count = post.comment_count + 1;
    tx.patch_post(
        post_id,
        &PostPatch {
            comment_count: Some(comment_count),
            ..Default::default()
        },
    )
    .await?;
    tx.commit().await?;

    Ok(comment_count)
}

pub async fn decrement_comment_count(store: &dyn Storage, post_id: Uuid) -> Result<i32> {
    let mut tx = store.begin().await?;
    let post = tx
        .get_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let comment_count = decrement_floored(post.comment_count, "comment_count", post_id);
    tx.patch_post(
        post_id,
        &PostPatch {
            comment_count: Some(comment_count),
            ..Default::default()
        },
    )
    .await?;
    tx.commit().await?;

    Ok(comment_count)
}

/// `value - 1`, clamped at zero. A clamp means the counter had already drifted.
pub fn decrement_floored(value: i32, counter: &str, row_id: Uuid) -> i32 {
    if value <= 0 {
        tracing::warn!(%row_id, counter, value, "Counter would go negative, clamping to 0");
        return 0;
    }
    value - 1
}
