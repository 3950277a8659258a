use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::PostViewRepository;
use crate::error::Result;

/// One row per (viewer, post) pair. Concurrent requests for the same viewer
/// may race on the same pairs; the unique constraint absorbs the duplicates.
const RECORD_VIEWS_SQL: &str = r#"
    INSERT INTO post_views (user_id, post_id, viewed_at)
    SELECT $1, post_id, $3
    FROM UNNEST($2::uuid[]) AS shown(post_id)
    ON CONFLICT (user_id, post_id) DO NOTHING
"#;

/// PostView ledger. The only table the feed writes to.
#[derive(Clone)]
pub struct PgPostViewRepository {
    pool: PgPool,
}

impl PgPostViewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostViewRepository for PgPostViewRepository {
    async fn viewed_since(&self, viewer_id: Uuid, since: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT post_id
            FROM post_views
            WHERE user_id = $1 AND viewed_at >= $2
            "#,
        )
        .bind(viewer_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn record_views(
        &self,
        viewer_id: Uuid,
        post_ids: &[Uuid],
        viewed_at: DateTime<Utc>,
    ) -> Result<u64> {
        if post_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(RECORD_VIEWS_SQL)
            .bind(viewer_id)
            .bind(post_ids)
            .bind(viewed_at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_views_ignores_existing_pairs() {
        let sql: String = RECORD_VIEWS_SQL.split_whitespace().collect::<Vec<_>>().join(" ");

        assert!(sql.starts_with("INSERT INTO post_views (user_id, post_id, viewed_at)"));
        assert!(sql.contains("FROM UNNEST($2::uuid[])"));
        assert!(sql.ends_with("ON CONFLICT (user_id, post_id) DO NOTHING"));
    }
}
