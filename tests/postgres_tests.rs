//! Runs the services against `PgStore`. Each test gets a fresh database with
//! the migrations applied; set DATABASE_URL and run with `--ignored`.

mod common;

use chrono::Utc;
use ranked_threads::{
    error::AppError,
    models::{PostPatch, PostSort, TargetKind, UpdatePostRequest, Vote, VoteTarget, VoteValue},
    services::{comment_service, listing_service, post_service, vote_service},
    storage::{PgStore, Storage},
};
use sqlx::PgPool;
use uuid::Uuid;

use common::{create_post, hours_ago, reply, seed_post};

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn vote_flip_and_repeat_keep_counters_in_step(pool: PgPool) {
    let store = PgStore::new(pool);
    let post = create_post(&store, "rust").await;
    let user = Uuid::new_v4();
    let target = VoteTarget::post(post.id);

    let up = vote_service::cast_vote(&store, user, target, VoteValue::Up)
        .await
        .unwrap();
    assert_eq!(up.score_change, 1);

    let down = vote_service::cast_vote(&store, user, target, VoteValue::Down)
        .await
        .unwrap();
    assert_eq!(down.score_change, -2);

    let repeat = vote_service::cast_vote(&store, user, target, VoteValue::Down)
        .await
        .unwrap();
    assert!(repeat.applied);
    assert_eq!(repeat.score_change, 0);

    let post = post_service::get_post(&store, post.id).await.unwrap();
    assert_eq!(post.score, 0);
    assert_eq!(post.upvotes, 2);
    assert_eq!(post.downvotes, 2);

    let votes = vote_service::get_votes_by_target(&store, post.id, 100)
        .await
        .unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].value, -1);

    vote_service::cast_vote(&store, user, target, VoteValue::Neutral)
        .await
        .unwrap();
    assert_eq!(
        vote_service::get_user_vote(&store, user, post.id).await.unwrap(),
        0
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn second_vote_row_for_a_pair_is_an_invariant_violation(pool: PgPool) {
    let store = PgStore::new(pool);
    let post = create_post(&store, "rust").await;
    let user = Uuid::new_v4();

    let vote = |value| Vote {
        id: Uuid::new_v4(),
        user_id: user,
        target_id: post.id,
        target_kind: TargetKind::Post,
        value,
        created_at: Utc::now(),
    };

    let mut tx = store.begin().await.unwrap();
    tx.insert_vote(&vote(1)).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = tx.insert_vote(&vote(-1)).await.unwrap_err();
    assert!(matches!(err, AppError::InvariantViolation(_)));
    drop(tx);

    let votes = vote_service::get_votes_by_user(&store, user, 50).await.unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].value, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn comment_create_and_remove_move_both_counters(pool: PgPool) {
    let store = PgStore::new(pool);
    let post = create_post(&store, "rust").await;

    let root = reply(&store, post.id, None).await;
    let child = reply(&store, post.id, Some(root.id)).await;
    assert_eq!(child.depth, 1);

    let root_row = comment_service::get_comment(&store, root.id).await.unwrap();
    assert_eq!(root_row.child_count, 1);
    assert_eq!(
        post_service::get_post(&store, post.id).await.unwrap().comment_count,
        2
    );

    comment_service::remove_comment(&store, child.id).await.unwrap();

    let removed = comment_service::get_comment(&store, child.id).await.unwrap();
    assert!(removed.is_removed);
    let root_row = comment_service::get_comment(&store, root.id).await.unwrap();
    assert_eq!(root_row.child_count, 0);
    assert_eq!(
        post_service::get_post(&store, post.id).await.unwrap().comment_count,
        1
    );

    let again = comment_service::remove_comment(&store, child.id).await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn partial_post_update_writes_only_given_columns(pool: PgPool) {
    let store = PgStore::new(pool);
    let post = create_post(&store, "rust").await;

    let updated = post_service::update_post(
        &store,
        post.id,
        &UpdatePostRequest {
            content: None,
            is_stickied: None,
            is_locked: Some(true),
            is_nsfw: None,
        },
    )
    .await
    .unwrap();
    assert!(updated.is_locked);

    let stored = post_service::get_post(&store, post.id).await.unwrap();
    assert!(stored.is_locked);
    assert!(!stored.is_stickied);
    assert_eq!(stored.content, post.content);
    assert_eq!(stored.score, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn equal_scores_list_in_insertion_order(pool: PgPool) {
    let store = PgStore::new(pool);
    let created_at = hours_ago(3);

    let first = seed_post(&store, "ties", 5, created_at).await;
    let second = seed_post(&store, "ties", 5, created_at).await;
    let third = seed_post(&store, "ties", 5, created_at).await;
    let higher = seed_post(&store, "ties", 9, created_at).await;

    let top = listing_service::get_by_subreddit(&store, "ties", PostSort::Top, 10)
        .await
        .unwrap();
    let ids: Vec<Uuid> = top.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![higher.id, first.id, second.id, third.id]);

    post_service::remove_post(&store, second.id).await.unwrap();
    let top = listing_service::get_by_subreddit(&store, "ties", PostSort::Top, 10)
        .await
        .unwrap();
    let ids: Vec<Uuid> = top.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![higher.id, first.id, third.id]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn dropped_transaction_rolls_back(pool: PgPool) {
    let store = PgStore::new(pool);
    let post = seed_post(&store, "rust", 1, hours_ago(1)).await;

    let mut tx = store.begin().await.unwrap();
    tx.patch_post(
        post.id,
        &PostPatch {
            score: Some(100),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    drop(tx);

    let stored = post_service::get_post(&store, post.id).await.unwrap();
    assert_eq!(stored.score, 1);
}
