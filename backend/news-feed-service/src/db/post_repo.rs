use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::warn;
use uuid::Uuid;

use super::{AuthorFilter, CommunityScope, PostQuery, PostRepository};
use crate::error::Result;
use crate::models::{PostRecord, PostStatus, PostType};

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    author_username: String,
    author_avatar: Option<String>,
    community_id: Option<Uuid>,
    title: String,
    post_type: String,
    content: Option<String>,
    media_file: Option<Json<Vec<String>>>,
    link: Option<String>,
    tags: Option<Json<Vec<String>>>,
    status: String,
    is_pinned: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    likes_count: i64,
    comments_count: i64,
    shares_count: i64,
}

impl PostRow {
    fn into_record(self) -> Option<PostRecord> {
        let status = PostStatus::parse(&self.status)?;
        let post_type = PostType::parse(&self.post_type).unwrap_or(PostType::Text);

        Some(PostRecord {
            id: self.id,
            author_id: self.author_id,
            author_username: self.author_username,
            author_avatar: self.author_avatar,
            community_id: self.community_id,
            title: self.title,
            post_type,
            content: self.content,
            media_file: self.media_file.map(|m| m.0).unwrap_or_default(),
            link: self.link,
            tags: self.tags.map(|t| t.0).unwrap_or_default(),
            status,
            is_pinned: self.is_pinned,
            created_at: self.created_at,
            updated_at: self.updated_at,
            likes_count: self.likes_count,
            comments_count: self.comments_count,
            shares_count: self.shares_count,
        })
    }
}

/// Repository for candidate post reads
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn build_query(query: &PostQuery) -> QueryBuilder<'static, Postgres> {
        let mut qb: QueryBuilder<'static, Postgres> = QueryBuilder::new(
            r#"
            SELECT * FROM (
                SELECT p.id, p.user_id AS author_id, u.username AS author_username,
                       pr.avatar AS author_avatar, p.community_id, p.title, p.post_type,
                       p.content, p.media_file, p.link, p.tags, p.status, p.is_pinned,
                       p.created_at, p.updated_at,
                       (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS likes_count,
                       (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count,
                       (SELECT COUNT(*) FROM shares s WHERE s.post_id = p.id) AS shares_count
                FROM posts p
                JOIN users u ON u.id = p.user_id
                LEFT JOIN profiles pr ON pr.user_id = p.user_id
                WHERE p.status = 'approved' AND p.created_at >= "#,
        );
        qb.push_bind(query.created_after);

        match &query.authors {
            AuthorFilter::Any => {}
            AuthorFilter::In(ids) => {
                qb.push(" AND p.user_id = ANY(");
                qb.push_bind(ids.clone());
                qb.push(")");
            }
            AuthorFilter::NotIn(ids) => {
                qb.push(" AND NOT (p.user_id = ANY(");
                qb.push_bind(ids.clone());
                qb.push("))");
            }
        }

        match &query.communities {
            CommunityScope::Any => {}
            CommunityScope::Unaffiliated => {
                qb.push(" AND p.community_id IS NULL");
            }
            CommunityScope::In(ids) => {
                qb.push(" AND p.community_id = ANY(");
                qb.push_bind(ids.clone());
                qb.push(")");
            }
        }

        if !query.exclude_post_ids.is_empty() {
            qb.push(" AND NOT (p.id = ANY(");
            qb.push_bind(query.exclude_post_ids.clone());
            qb.push("))");
        }

        qb.push(") AS candidates");

        if let Some(min) = query.min_engagement {
            qb.push(" WHERE likes_count + comments_count * 2 + shares_count * 3 >= ");
            qb.push_bind(min);
        }

        qb.push(" ORDER BY created_at DESC");
        qb
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn find_approved(&self, query: &PostQuery) -> Result<Vec<PostRecord>> {
        // Empty id lists can never match; skip the round trip.
        if matches!(&query.authors, AuthorFilter::In(ids) if ids.is_empty())
            || matches!(&query.communities, CommunityScope::In(ids) if ids.is_empty())
        {
            return Ok(Vec::new());
        }

        let mut qb = Self::build_query(query);
        let rows: Vec<PostRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        let total = rows.len();
        let records: Vec<PostRecord> = rows.into_iter().filter_map(PostRow::into_record).collect();
        if records.len() != total {
            warn!(
                "Dropped {} post rows with an unknown status",
                total - records.len()
            );
        }

        Ok(records)
    }
}
