//! Comment tree bookkeeping.
//!
//! Each comment stores its `depth` (parent's depth + 1, or 0) and the number of
//! active direct replies in `child_count`. Removal never deletes a row: the
//! content is replaced by [`REMOVED_CONTENT`] so the subtree stays reachable.

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, Result},
    models::{
        Comment, CommentPatch, CommentSort, CreateCommentRequest, PostPatch, REMOVED_CONTENT,
        UpdateCommentRequest,
    },
    services::post_service::decrement_floored,
    storage::{CommentFilter, OrderBy, Storage},
};

pub const DEFAULT_CHILDREN_LIMIT: usize = 20;
pub const DEFAULT_USER_COMMENTS_LIMIT: usize = 25;

pub fn comment_order(sort: CommentSort) -> OrderBy {
    match sort {
        CommentSort::Best | CommentSort::Top => OrderBy::ScoreDesc,
        CommentSort::New => OrderBy::CreatedAtDesc,
    }
}

/// Inserts a comment, bumping the parent's `child_count` and the post's
/// `comment_count` in the same transaction.
///
/// A missing parent is an error. A missing post is not: the comment is still
/// stored and the post counter update is skipped.
pub async fn create_comment(
    store: &dyn Storage,
    author_id: Uuid,
    request: &CreateCommentRequest,
) -> Result<Comment> {
    request.validate()?;

    let mut tx = store.begin().await?;

    let depth = match request.parent_id {
        Some(parent_id) => {
            let parent = tx
                .get_comment(parent_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Parent comment not found".to_string()))?;

            if parent.post_id != request.post_id {
                return Err(AppError::BadRequest(
                    "Parent comment is not on the same post".to_string(),
                ));
            }

            tx.patch_comment(
                parent_id,
                &CommentPatch {
                    child_count: Some(parent.child_count + 1),
                    ..Default::default()
                },
            )
            .await?;

            parent.depth + 1
        }
        None => 0,
    };

    let now = Utc::now();
    let comment = Comment {
        id: Uuid::new_v4(),
        content: request.content.clone(),
        author_id,
        post_id: request.post_id,
        parent_id: request.parent_id,
        depth,
        score: 1,
        upvotes: 1,
        downvotes: 0,
        child_count: 0,
        is_edited: false,
        is_removed: false,
        created_at: now,
        updated_at: now,
    };
    tx.insert_comment(&comment).await?;

    match tx.get_post(request.post_id).await? {
        Some(post) => {
            tx.patch_post(
                post.id,
                &PostPatch {
                    comment_count: Some(post.comment_count + 1),
                    ..Default::default()
                },
            )
            .await?;
        }
        None => {
            tracing::warn!(post_id = %request.post_id, comment_id = %comment.id, "Comment created on a missing post");
        }
    }

    tx.commit().await?;

    tracing::info!(
        comment_id = %comment.id,
        post_id = %comment.post_id,
        parent_id = ?comment.parent_id,
        depth,
        "Comment created"
    );

    Ok(comment)
}

pub async fn get_comment_by_id(store: &dyn Storage, comment_id: Uuid) -> Result<Option<Comment>> {
    let mut reader = store.snapshot().await?;
    reader.get_comment(comment_id).await
}

pub async fn get_comment(store: &dyn Storage, comment_id: Uuid) -> Result<Comment> {
    get_comment_by_id(store, comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
}

pub async fn update_comment(
    store: &dyn Storage,
    comment_id: Uuid,
    request: &UpdateCommentRequest,
) -> Result<Comment> {
    request.validate()?;

    let mut tx = store.begin().await?;
    let mut comment = tx
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    if comment.is_removed {
        return Err(AppError::BadRequest(
            "Cannot edit a removed comment".to_string(),
        ));
    }

    let patch = CommentPatch {
        content: Some(request.content.clone()),
        is_edited: Some(true),
        updated_at: Some(Utc::now()),
        ..Default::default()
    };
    tx.patch_comment(comment_id, &patch).await?;
    tx.commit().await?;

    comment.apply(&patch);
    tracing::debug!(%comment_id, "Comment edited");

    Ok(comment)
}

/// Soft-removes a comment and takes it out of its parent's and post's counts.
pub async fn remove_comment(store: &dyn Storage, comment_id: Uuid) -> Result<()> {
    let mut tx = store.begin().await?;
    let comment = tx
        .get_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    // A second removal would decrement the counters twice for one child.
    if comment.is_removed {
        return Err(AppError::BadRequest(
            "Comment is already removed".to_string(),
        ));
    }

    if let Some(parent_id) = comment.parent_id {
        if let Some(parent) = tx.get_comment(parent_id).await? {
            tx.patch_comment(
                parent_id,
                &CommentPatch {
                    child_count: Some(decrement_floored(
                        parent.child_count,
                        "child_count",
                        parent_id,
                    )),
                    ..Default::default()
                },
            )
            .await?;
        }
    }

    if let Some(post) = tx.get_post(comment.post_id).await? {
        tx.patch_post(
            post.id,
            &PostPatch {
                comment_count: Some(decrement_floored(
                    post.comment_count,
                    "comment_count",
                    post.id,
                )),
                ..Default::default()
            },
        )
        .await?;
    }

    tx.patch_comment(
        comment_id,
        &CommentPatch {
            content: Some(REMOVED_CONTENT.to_string()),
            is_removed: Some(true),
            updated_at: Some(Utc::now()),
            ..Default::default()
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(%comment_id, post_id = %comment.post_id, "Comment removed");
    Ok(())
}

/// Depth-first, pre-order walk from `root_id`, children by descending score.
///
/// The root sits at traversal level 0 and levels `>= max_depth` are not
/// visited, whatever depth the comments themselves store. Returns `None` when
/// the root does not exist. The walk uses an explicit stack, so very deep or
/// wide trees do not grow the call stack.
pub async fn get_thread(
    store: &dyn Storage,
    root_id: Uuid,
    max_depth: usize,
) -> Result<Option<Vec<Comment>>> {
    let mut reader = store.snapshot().await?;
    let Some(root) = reader.get_comment(root_id).await? else {
        return Ok(None);
    };

    let mut thread = Vec::new();
    let mut stack = vec![(root, 0usize)];

    while let Some((comment, level)) = stack.pop() {
        let comment_id = comment.id;
        thread.push(comment);

        if level + 1 >= max_depth {
            continue;
        }

        let children = reader
            .query_comments(CommentFilter::Children(comment_id), OrderBy::ScoreDesc, None)
            .await?;
        // Reversed so the highest-scored child is popped first.
        stack.extend(children.into_iter().rev().map(|child| (child, level + 1)));
    }

    Ok(Some(thread))
}

/// Direct replies to `parent_id`.
pub async fn get_children(
    store: &dyn Storage,
    parent_id: Uuid,
    sort: CommentSort,
    limit: usize,
) -> Result<Vec<Comment>> {
    let mut reader = store.snapshot().await?;
    reader
        .query_comments(
            CommentFilter::Children(parent_id),
            comment_order(sort),
            Some(limit),
        )
        .await
}

/// A user's comments, newest first.
pub async fn get_user_comments(
    store: &dyn Storage,
    author_id: Uuid,
    limit: usize,
) -> Result<Vec<Comment>> {
    let mut reader = store.snapshot().await?;
    reader
        .query_comments(
            CommentFilter::Author(author_id),
            OrderBy::CreatedAtDesc,
            Some(limit),
        )
        .await
}
