use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::SocialGraphRepository;
use crate::error::Result;

/// Follow edges and community memberships
#[derive(Clone)]
pub struct PgSocialGraphRepository {
    pool: PgPool,
}

impl PgSocialGraphRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SocialGraphRepository for PgSocialGraphRepository {
    async fn following_ids(&self, viewer_id: Uuid) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT following_id
            FROM follows
            WHERE follower_id = $1
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn joined_community_ids(&self, viewer_id: Uuid) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT community_id
            FROM community_members
            WHERE user_id = $1 AND is_approved = TRUE
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn top_public_communities(&self, excluding: &[Uuid], limit: i64) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM communities
            WHERE visibility = 'public' AND NOT (id = ANY($1))
            ORDER BY members_count DESC, created_at DESC
            LIMIT $2
            "#,
        )
        .bind(excluding)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
