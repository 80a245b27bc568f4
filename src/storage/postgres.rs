use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{CommentFilter, OrderBy, PostFilter, Reader, Storage, Transaction, VoteFilter};
use crate::{
    error::{AppError, Result},
    models::{Comment, CommentPatch, Post, PostPatch, Vote},
};

const POST_COLUMNS: &str = "id, title, content, url, post_type, author_id, subreddit, \
     score, upvotes, downvotes, comment_count, is_stickied, is_locked, is_nsfw, is_removed, \
     created_at, updated_at";

const COMMENT_COLUMNS: &str = "id, content, author_id, post_id, parent_id, depth, \
     score, upvotes, downvotes, child_count, is_edited, is_removed, created_at, updated_at";

const VOTE_COLUMNS: &str = "id, user_id, target_id, target_kind, value, created_at";

/// Postgres-backed store. Read-write transactions run SERIALIZABLE so the
/// read-modify-write sequences in the services cannot interleave.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Storage for PgStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn snapshot(&self) -> Result<Box<dyn Reader>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

fn order_clause(order: OrderBy) -> &'static str {
    match order {
        OrderBy::ScoreDesc => " ORDER BY score DESC, seq ASC",
        OrderBy::CreatedAtDesc => " ORDER BY created_at DESC, seq ASC",
    }
}

fn push_limit(qb: &mut QueryBuilder<'_, Postgres>, limit: Option<usize>) {
    if let Some(limit) = limit {
        qb.push(" LIMIT ").push_bind(limit as i64);
    }
}

#[async_trait]
impl Reader for PgTransaction {
    async fn get_post(&mut self, id: Uuid) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(post)
    }

    async fn get_comment(&mut self, id: Uuid) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(comment)
    }

    async fn find_vote(&mut self, user_id: Uuid, target_id: Uuid) -> Result<Option<Vote>> {
        let vote = sqlx::query_as::<_, Vote>(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE user_id = $1 AND target_id = $2"
        ))
        .bind(user_id)
        .bind(target_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(vote)
    }

    async fn query_posts(
        &mut self,
        filter: &PostFilter,
        order: OrderBy,
        limit: Option<usize>,
    ) -> Result<Vec<Post>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE is_removed = FALSE"
        ));
        if let PostFilter::Subreddit(name) = filter {
            qb.push(" AND subreddit = ").push_bind(name.clone());
        }
        qb.push(order_clause(order));
        push_limit(&mut qb, limit);

        let posts = qb
            .build_query_as::<Post>()
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(posts)
    }

    async fn query_comments(
        &mut self,
        filter: CommentFilter,
        order: OrderBy,
        limit: Option<usize>,
    ) -> Result<Vec<Comment>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE "
        ));
        match filter {
            CommentFilter::TopLevel(post_id) => {
                qb.push("post_id = ")
                    .push_bind(post_id)
                    .push(" AND parent_id IS NULL");
            }
            CommentFilter::Children(parent_id) => {
                qb.push("parent_id = ").push_bind(parent_id);
            }
            CommentFilter::Author(author_id) => {
                qb.push("author_id = ").push_bind(author_id);
            }
        }
        qb.push(order_clause(order));
        push_limit(&mut qb, limit);

        let comments = qb
            .build_query_as::<Comment>()
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(comments)
    }

    async fn query_votes(&mut self, filter: VoteFilter, limit: Option<usize>) -> Result<Vec<Vote>> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {VOTE_COLUMNS} FROM votes WHERE "));
        match filter {
            VoteFilter::Target(target_id) => {
                qb.push("target_id = ").push_bind(target_id);
            }
            VoteFilter::User(user_id) => {
                qb.push("user_id = ").push_bind(user_id);
            }
        }
        qb.push(" ORDER BY seq ASC");
        push_limit(&mut qb, limit);

        let votes = qb
            .build_query_as::<Vote>()
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(votes)
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn insert_post(&mut self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (
                id, title, content, url, post_type, author_id, subreddit,
                score, upvotes, downvotes, comment_count,
                is_stickied, is_locked, is_nsfw, is_removed, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.url)
        .bind(post.post_type)
        .bind(post.author_id)
        .bind(&post.subreddit)
        .bind(post.score)
        .bind(post.upvotes)
        .bind(post.downvotes)
        .bind(post.comment_count)
        .bind(post.is_stickied)
        .bind(post.is_locked)
        .bind(post.is_nsfw)
        .bind(post.is_removed)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_comment(&mut self, comment: &Comment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO comments (
                id, content, author_id, post_id, parent_id, depth,
                score, upvotes, downvotes, child_count,
                is_edited, is_removed, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(comment.id)
        .bind(&comment.content)
        .bind(comment.author_id)
        .bind(comment.post_id)
        .bind(comment.parent_id)
        .bind(comment.depth)
        .bind(comment.score)
        .bind(comment.upvotes)
        .bind(comment.downvotes)
        .bind(comment.child_count)
        .bind(comment.is_edited)
        .bind(comment.is_removed)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_vote(&mut self, vote: &Vote) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO votes (id, user_id, target_id, target_kind, value, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(vote.id)
        .bind(vote.user_id)
        .bind(vote.target_id)
        .bind(vote.target_kind)
        .bind(vote.value)
        .bind(vote.created_at)
        .execute(&mut *self.tx)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::InvariantViolation(format!(
                    "user {} already voted on {}",
                    vote.user_id, vote.target_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn patch_post(&mut self, id: Uuid, patch: &PostPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE posts SET ");
        let mut set = qb.separated(", ");
        if let Some(content) = &patch.content {
            set.push("content = ").push_bind_unseparated(content.clone());
        }
        if let Some(score) = patch.score {
            set.push("score = ").push_bind_unseparated(score);
        }
        if let Some(upvotes) = patch.upvotes {
            set.push("upvotes = ").push_bind_unseparated(upvotes);
        }
        if let Some(downvotes) = patch.downvotes {
            set.push("downvotes = ").push_bind_unseparated(downvotes);
        }
        if let Some(comment_count) = patch.comment_count {
            set.push("comment_count = ")
                .push_bind_unseparated(comment_count);
        }
        if let Some(is_stickied) = patch.is_stickied {
            set.push("is_stickied = ").push_bind_unseparated(is_stickied);
        }
        if let Some(is_locked) = patch.is_locked {
            set.push("is_locked = ").push_bind_unseparated(is_locked);
        }
        if let Some(is_nsfw) = patch.is_nsfw {
            set.push("is_nsfw = ").push_bind_unseparated(is_nsfw);
        }
        if let Some(is_removed) = patch.is_removed {
            set.push("is_removed = ").push_bind_unseparated(is_removed);
        }
        if let Some(updated_at) = patch.updated_at {
            set.push("updated_at = ").push_bind_unseparated(updated_at);
        }
        qb.push(" WHERE id = ").push_bind(id);

        qb.build().execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn patch_comment(&mut self, id: Uuid, patch: &CommentPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE comments SET ");
        let mut set = qb.separated(", ");
        if let Some(content) = &patch.content {
            set.push("content = ").push_bind_unseparated(content.clone());
        }
        if let Some(score) = patch.score {
            set.push("score = ").push_bind_unseparated(score);
        }
        if let Some(upvotes) = patch.upvotes {
            set.push("upvotes = ").push_bind_unseparated(upvotes);
        }
        if let Some(downvotes) = patch.downvotes {
            set.push("downvotes = ").push_bind_unseparated(downvotes);
        }
        if let Some(child_count) = patch.child_count {
            set.push("child_count = ").push_bind_unseparated(child_count);
        }
        if let Some(is_edited) = patch.is_edited {
            set.push("is_edited = ").push_bind_unseparated(is_edited);
        }
        if let Some(is_removed) = patch.is_removed {
            set.push("is_removed = ").push_bind_unseparated(is_removed);
        }
        if let Some(updated_at) = patch.updated_at {
            set.push("updated_at = ").push_bind_unseparated(updated_at);
        }
        qb.push(" WHERE id = ").push_bind(id);

        qb.build().execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn set_vote_value(&mut self, id: Uuid, value: i16) -> Result<()> {
        sqlx::query("UPDATE votes SET value = $1 WHERE id = $2")
            .bind(value)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn delete_vote(&mut self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM votes WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
