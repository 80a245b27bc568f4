#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use ranked_threads::{
    models::{
        Comment, CreateCommentRequest, CreatePostRequest, Post, PostType, VoteTarget, VoteValue,
    },
    services::{comment_service, post_service, vote_service},
    storage::{MemoryStore, Storage},
};
use uuid::Uuid;

pub fn store() -> MemoryStore {
    MemoryStore::new()
}

pub async fn create_post(store: &dyn Storage, subreddit: &str) -> Post {
    post_service::create_post(
        store,
        Uuid::new_v4(),
        &CreatePostRequest {
            title: "A post".to_string(),
            content: Some("body".to_string()),
            url: None,
            post_type: PostType::Text,
            subreddit: subreddit.to_string(),
            is_nsfw: None,
        },
    )
    .await
    .expect("create post")
}

/// Inserts a post with a fixed score and creation time, bypassing the service.
pub async fn seed_post(
    store: &dyn Storage,
    subreddit: &str,
    score: i32,
    created_at: DateTime<Utc>,
) -> Post {
    let post = Post {
        id: Uuid::new_v4(),
        title: format!("score {score}"),
        content: None,
        url: None,
        post_type: PostType::Text,
        author_id: Uuid::new_v4(),
        subreddit: subreddit.to_string(),
        score,
        upvotes: score.max(0),
        downvotes: (-score).max(0),
        comment_count: 0,
        is_stickied: false,
        is_locked: false,
        is_nsfw: false,
        is_removed: false,
        created_at,
        updated_at: created_at,
    };

    let mut tx = store.begin().await.expect("begin");
    tx.insert_post(&post).await.expect("insert post");
    tx.commit().await.expect("commit");
    post
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(hours)
}

pub async fn reply(store: &dyn Storage, post_id: Uuid, parent_id: Option<Uuid>) -> Comment {
    comment_service::create_comment(
        store,
        Uuid::new_v4(),
        &CreateCommentRequest {
            content: "a reply".to_string(),
            post_id,
            parent_id,
        },
    )
    .await
    .expect("create comment")
}

pub async fn upvote_comment(store: &dyn Storage, comment_id: Uuid, voters: usize) {
    for _ in 0..voters {
        vote_service::cast_vote(
            store,
            Uuid::new_v4(),
            VoteTarget::comment(comment_id),
            VoteValue::Up,
        )
        .await
        .expect("vote");
    }
}
