mod common;

use proptest::prelude::*;
use ranked_threads::{
    error::AppError,
    models::{CommentSort, CreateCommentRequest, REMOVED_CONTENT, UpdateCommentRequest},
    services::{comment_service, listing_service, post_service},
    storage::Storage,
};
use uuid::Uuid;

use common::{create_post, reply, store, upvote_comment};

#[tokio::test]
async fn replies_record_depth_and_counts() {
    let store = store();
    let post = create_post(&store, "rust").await;

    let root = reply(&store, post.id, None).await;
    let child = reply(&store, post.id, Some(root.id)).await;
    let grandchild = reply(&store, post.id, Some(child.id)).await;

    assert_eq!(root.depth, 0);
    assert_eq!(child.depth, 1);
    assert_eq!(grandchild.depth, 2);
    assert_eq!(grandchild.parent_id, Some(child.id));

    let root = comment_service::get_comment(&store, root.id).await.unwrap();
    assert_eq!(root.child_count, 1);

    let post = post_service::get_post(&store, post.id).await.unwrap();
    assert_eq!(post.comment_count, 3);
}

#[tokio::test]
async fn removing_a_reply_restores_the_counts() {
    let store = store();
    let post = create_post(&store, "rust").await;
    let root = reply(&store, post.id, None).await;

    let before_root = comment_service::get_comment(&store, root.id).await.unwrap();
    let before_post = post_service::get_post(&store, post.id).await.unwrap();

    let child = reply(&store, post.id, Some(root.id)).await;
    comment_service::remove_comment(&store, child.id).await.unwrap();

    let after_root = comment_service::get_comment(&store, root.id).await.unwrap();
    let after_post = post_service::get_post(&store, post.id).await.unwrap();
    assert_eq!(after_root.child_count, before_root.child_count);
    assert_eq!(after_post.comment_count, before_post.comment_count);

    let removed = comment_service::get_comment(&store, child.id).await.unwrap();
    assert!(removed.is_removed);
    assert_eq!(removed.content, REMOVED_CONTENT);
}

#[tokio::test]
async fn removal_keeps_the_subtree_reachable() {
    let store = store();
    let post = create_post(&store, "rust").await;
    let root = reply(&store, post.id, None).await;
    let child = reply(&store, post.id, Some(root.id)).await;
    let grandchild = reply(&store, post.id, Some(child.id)).await;

    comment_service::remove_comment(&store, child.id).await.unwrap();

    let thread = comment_service::get_thread(&store, root.id, 5)
        .await
        .unwrap()
        .unwrap();
    let ids: Vec<Uuid> = thread.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![root.id, child.id, grandchild.id]);
    assert_eq!(thread[1].content, REMOVED_CONTENT);
}

#[tokio::test]
async fn removing_twice_is_rejected() {
    let store = store();
    let post = create_post(&store, "rust").await;
    let comment = reply(&store, post.id, None).await;

    comment_service::remove_comment(&store, comment.id).await.unwrap();
    let err = comment_service::remove_comment(&store, comment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let post = post_service::get_post(&store, post.id).await.unwrap();
    assert_eq!(post.comment_count, 0);
}

#[tokio::test]
async fn removing_a_missing_comment_is_not_found() {
    let store = store();
    let err = comment_service::remove_comment(&store, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn missing_parent_is_not_found() {
    let store = store();
    let post = create_post(&store, "rust").await;

    let err = comment_service::create_comment(
        &store,
        Uuid::new_v4(),
        &CreateCommentRequest {
            content: "orphan".to_string(),
            post_id: post.id,
            parent_id: Some(Uuid::new_v4()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let post = post_service::get_post(&store, post.id).await.unwrap();
    assert_eq!(post.comment_count, 0);
}

#[tokio::test]
async fn parent_on_another_post_is_rejected() {
    let store = store();
    let first = create_post(&store, "rust").await;
    let second = create_post(&store, "rust").await;
    let parent = reply(&store, first.id, None).await;

    let err = comment_service::create_comment(
        &store,
        Uuid::new_v4(),
        &CreateCommentRequest {
            content: "wrong thread".to_string(),
            post_id: second.id,
            parent_id: Some(parent.id),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn comment_on_a_missing_post_is_still_stored() {
    let store = store();
    let missing_post = Uuid::new_v4();

    let comment = reply(&store, missing_post, None).await;

    let stored = comment_service::get_comment(&store, comment.id).await.unwrap();
    assert_eq!(stored.post_id, missing_post);
    assert!(
        post_service::get_post_by_id(&store, missing_post)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn empty_content_fails_validation() {
    let store = store();
    let post = create_post(&store, "rust").await;

    let err = comment_service::create_comment(
        &store,
        Uuid::new_v4(),
        &CreateCommentRequest {
            content: String::new(),
            post_id: post.id,
            parent_id: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn editing_marks_the_comment_edited() {
    let store = store();
    let post = create_post(&store, "rust").await;
    let comment = reply(&store, post.id, None).await;

    let edited = comment_service::update_comment(
        &store,
        comment.id,
        &UpdateCommentRequest {
            content: "second thoughts".to_string(),
        },
    )
    .await
    .unwrap();
    assert!(edited.is_edited);
    assert_eq!(edited.content, "second thoughts");

    comment_service::remove_comment(&store, comment.id).await.unwrap();
    let err = comment_service::update_comment(
        &store,
        comment.id,
        &UpdateCommentRequest {
            content: "too late".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn thread_stops_at_max_depth() {
    let store = store();
    let post = create_post(&store, "rust").await;

    let mut chain = vec![reply(&store, post.id, None).await];
    for _ in 0..5 {
        let parent = chain.last().map(|c| c.id);
        chain.push(reply(&store, post.id, parent).await);
    }
    assert_eq!(chain.last().map(|c| c.depth), Some(5));

    let thread = comment_service::get_thread(&store, chain[0].id, 3)
        .await
        .unwrap()
        .unwrap();
    let ids: Vec<Uuid> = thread.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![chain[0].id, chain[1].id, chain[2].id]);

    let root_only = comment_service::get_thread(&store, chain[0].id, 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(root_only.len(), 1);
}

#[tokio::test]
async fn thread_levels_are_relative_to_the_requested_root() {
    let store = store();
    let post = create_post(&store, "rust").await;
    let top = reply(&store, post.id, None).await;
    let mid = reply(&store, post.id, Some(top.id)).await;
    let low = reply(&store, post.id, Some(mid.id)).await;

    let thread = comment_service::get_thread(&store, mid.id, 2)
        .await
        .unwrap()
        .unwrap();
    let ids: Vec<Uuid> = thread.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![mid.id, low.id]);
}

#[tokio::test]
async fn thread_is_pre_order_by_descending_score() {
    let store = store();
    let post = create_post(&store, "rust").await;
    let root = reply(&store, post.id, None).await;

    let low = reply(&store, post.id, Some(root.id)).await;
    let high = reply(&store, post.id, Some(root.id)).await;
    let high_child = reply(&store, post.id, Some(high.id)).await;
    upvote_comment(&store, high.id, 3).await;

    let thread = comment_service::get_thread(&store, root.id, 5)
        .await
        .unwrap()
        .unwrap();
    let ids: Vec<Uuid> = thread.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![root.id, high.id, high_child.id, low.id]);
}

#[tokio::test]
async fn thread_for_a_missing_root_is_none() {
    let store = store();
    let thread = comment_service::get_thread(&store, Uuid::new_v4(), 5)
        .await
        .unwrap();
    assert!(thread.is_none());
}

#[tokio::test]
async fn children_and_top_level_listings() {
    let store = store();
    let post = create_post(&store, "rust").await;
    let first = reply(&store, post.id, None).await;
    let second = reply(&store, post.id, None).await;
    let nested = reply(&store, post.id, Some(first.id)).await;
    upvote_comment(&store, second.id, 2).await;

    let top_level =
        listing_service::get_top_level_comments(&store, post.id, CommentSort::Best, 50)
            .await
            .unwrap();
    let ids: Vec<Uuid> = top_level.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let children = comment_service::get_children(&store, first.id, CommentSort::Top, 20)
        .await
        .unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, nested.id);
}

#[tokio::test]
async fn user_comments_are_listed_for_the_author() {
    let store = store();
    let post = create_post(&store, "rust").await;
    let author = Uuid::new_v4();

    for content in ["one", "two"] {
        comment_service::create_comment(
            &store,
            author,
            &CreateCommentRequest {
                content: content.to_string(),
                post_id: post.id,
                parent_id: None,
            },
        )
        .await
        .unwrap();
    }
    reply(&store, post.id, None).await;

    let comments = comment_service::get_user_comments(&store, author, 25)
        .await
        .unwrap();
    assert_eq!(comments.len(), 2);
    assert!(comments.iter().all(|c| c.author_id == author));
}

#[derive(Debug, Clone)]
enum TreeOp {
    /// Reply to the comment picked by the index, or start a new top-level one.
    Create(Option<usize>),
    Remove(usize),
}

fn tree_op() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        3 => prop::option::of(any::<usize>()).prop_map(TreeOp::Create),
        1 => any::<usize>().prop_map(TreeOp::Remove),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_tree_counters_follow_creates_and_removes(
        ops in prop::collection::vec(tree_op(), 1..40)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        runtime.block_on(async {
            let store = store();
            let storage: &dyn Storage = &store;
            let post = create_post(storage, "prop").await;

            // (id, parent index, removed)
            let mut tree: Vec<(Uuid, Option<usize>, bool)> = Vec::new();

            for op in &ops {
                match op {
                    TreeOp::Create(pick) => {
                        let parent = match pick {
                            Some(sel) if !tree.is_empty() => Some(sel % tree.len()),
                            _ => None,
                        };
                        let comment =
                            reply(storage, post.id, parent.map(|i| tree[i].0)).await;
                        tree.push((comment.id, parent, false));
                    }
                    TreeOp::Remove(sel) => {
                        if tree.is_empty() {
                            continue;
                        }
                        let index = sel % tree.len();
                        let result = comment_service::remove_comment(storage, tree[index].0).await;
                        if tree[index].2 {
                            assert!(matches!(result, Err(AppError::BadRequest(_))));
                        } else {
                            result.unwrap();
                            tree[index].2 = true;
                        }
                    }
                }
            }

            let mut depths = Vec::with_capacity(tree.len());
            for (index, (id, parent, removed)) in tree.iter().enumerate() {
                let comment = comment_service::get_comment(storage, *id).await.unwrap();
                let expected_depth = match parent {
                    Some(p) => depths[*p] + 1,
                    None => 0,
                };
                assert_eq!(comment.depth, expected_depth);
                depths.push(comment.depth);

                let active_children = tree
                    .iter()
                    .filter(|(_, p, r)| *p == Some(index) && !*r)
                    .count();
                assert_eq!(comment.child_count as usize, active_children);
                assert_eq!(comment.is_removed, *removed);
            }

            let active = tree.iter().filter(|(_, _, r)| !*r).count();
            let post = post_service::get_post(storage, post.id).await.unwrap();
            assert_eq!(post.comment_count as usize, active);
        });
    }
}
