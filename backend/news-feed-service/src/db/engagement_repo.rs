use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::EngagementRepository;
use crate::error::Result;
use crate::models::CommentRecord;

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    parent_id: Option<Uuid>,
    author_id: Uuid,
    author_username: String,
    author_avatar: Option<String>,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            parent_id: row.parent_id,
            author_id: row.author_id,
            author_username: row.author_username,
            author_avatar: row.author_avatar,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Read-only access to likes and comments
#[derive(Clone)]
pub struct PgEngagementRepository {
    pool: PgPool,
}

impl PgEngagementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EngagementRepository for PgEngagementRepository {
    async fn liked_posts_by_authors(
        &self,
        viewer_id: Uuid,
        author_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Uuid)>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT l.post_id, p.user_id
            FROM likes l
            JOIN posts p ON p.id = l.post_id
            WHERE l.user_id = $1 AND p.user_id = ANY($2)
            "#,
        )
        .bind(viewer_id)
        .bind(author_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn liked_post_ids(&self, viewer_id: Uuid, post_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let liked: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT post_id
            FROM likes
            WHERE user_id = $1 AND post_id = ANY($2)
            "#,
        )
        .bind(viewer_id)
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(liked)
    }

    async fn comments_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<CommentRecord>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<CommentRow> = sqlx::query_as(
            r#"
            SELECT c.id, c.post_id, c.parent_id, c.user_id AS author_id,
                   u.username AS author_username, pr.avatar AS author_avatar,
                   c.content, c.created_at, c.updated_at
            FROM comments c
            JOIN users u ON u.id = c.user_id
            LEFT JOIN profiles pr ON pr.user_id = c.user_id
            WHERE c.post_id = ANY($1)
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }
}
