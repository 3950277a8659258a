//! Data access for the news feed.
//!
//! The feed reads tables owned by the rest of the platform and writes only
//! `post_views`. Expected layout (PostgreSQL):
//!
//! - `posts(id, user_id, community_id, title, post_type, content, media_file jsonb,
//!   link, tags jsonb, status, is_pinned, created_at, updated_at)`
//! - `likes(user_id, post_id, created_at)`, `comments(id, user_id, post_id, parent_id,
//!   content, created_at, updated_at)`, `shares(user_id, post_id, created_at)`
//! - `follows(follower_id, following_id)`, unique per pair
//! - `communities(id, visibility, members_count, created_at)`,
//!   `community_members(user_id, community_id, is_approved)`
//! - `post_views(user_id, post_id, viewed_at)`, unique on `(user_id, post_id)`
//! - `users(id, username)`, `profiles(user_id, avatar)`

pub mod engagement_repo;
pub mod graph_repo;
pub mod memory;
pub mod post_repo;
pub mod view_repo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CommentRecord, PostRecord};

pub use engagement_repo::PgEngagementRepository;
pub use graph_repo::PgSocialGraphRepository;
pub use memory::InMemoryStore;
pub use post_repo::PgPostRepository;
pub use view_repo::PgPostViewRepository;

/// Author restriction for a post query
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AuthorFilter {
    #[default]
    Any,
    In(Vec<Uuid>),
    NotIn(Vec<Uuid>),
}

impl AuthorFilter {
    pub fn matches(&self, author_id: Uuid) -> bool {
        match self {
            Self::Any => true,
            Self::In(ids) => ids.contains(&author_id),
            Self::NotIn(ids) => !ids.contains(&author_id),
        }
    }
}

/// Community restriction for a post query
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CommunityScope {
    #[default]
    Any,
    /// Only posts that belong to no community
    Unaffiliated,
    In(Vec<Uuid>),
}

impl CommunityScope {
    pub fn matches(&self, community_id: Option<Uuid>) -> bool {
        match self {
            Self::Any => true,
            Self::Unaffiliated => community_id.is_none(),
            Self::In(ids) => community_id.map(|c| ids.contains(&c)).unwrap_or(false),
        }
    }
}

/// Filter for approved posts. Status is not part of the query: the post
/// repository only ever returns approved posts.
#[derive(Debug, Clone, PartialEq)]
pub struct PostQuery {
    pub created_after: DateTime<Utc>,
    pub authors: AuthorFilter,
    pub communities: CommunityScope,
    pub exclude_post_ids: Vec<Uuid>,
    /// Minimum of likes + 2*comments + 3*shares
    pub min_engagement: Option<i64>,
}

impl PostQuery {
    pub fn created_after(created_after: DateTime<Utc>) -> Self {
        Self {
            created_after,
            authors: AuthorFilter::Any,
            communities: CommunityScope::Any,
            exclude_post_ids: Vec::new(),
            min_engagement: None,
        }
    }

    pub fn authors(mut self, authors: AuthorFilter) -> Self {
        self.authors = authors;
        self
    }

    pub fn communities(mut self, communities: CommunityScope) -> Self {
        self.communities = communities;
        self
    }

    pub fn excluding(mut self, post_ids: Vec<Uuid>) -> Self {
        self.exclude_post_ids = post_ids;
        self
    }

    pub fn min_engagement(mut self, min: i64) -> Self {
        self.min_engagement = Some(min);
        self
    }

    /// In-process evaluation of the filter, used by the in-memory store.
    pub fn matches(&self, post: &PostRecord) -> bool {
        post.created_at >= self.created_after
            && self.authors.matches(post.author_id)
            && self.communities.matches(post.community_id)
            && !self.exclude_post_ids.contains(&post.id)
            && self
                .min_engagement
                .map(|min| post.engagement() >= min)
                .unwrap_or(true)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Approved posts matching `query`, newest first, with aggregated counts.
    async fn find_approved(&self, query: &PostQuery) -> Result<Vec<PostRecord>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialGraphRepository: Send + Sync {
    async fn following_ids(&self, viewer_id: Uuid) -> Result<Vec<Uuid>>;

    /// Communities with an approved membership for the viewer
    async fn joined_community_ids(&self, viewer_id: Uuid) -> Result<Vec<Uuid>>;

    /// Public communities ranked by member count, largest first
    async fn top_public_communities(&self, excluding: &[Uuid], limit: i64) -> Result<Vec<Uuid>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostViewRepository: Send + Sync {
    async fn viewed_since(&self, viewer_id: Uuid, since: DateTime<Utc>) -> Result<Vec<Uuid>>;

    /// Insert one PostView per post, skipping pairs that already exist.
    /// Returns the number of rows actually inserted.
    async fn record_views(
        &self,
        viewer_id: Uuid,
        post_ids: &[Uuid],
        viewed_at: DateTime<Utc>,
    ) -> Result<u64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngagementRepository: Send + Sync {
    /// (post_id, author_id) for every post by `author_ids` the viewer liked
    async fn liked_posts_by_authors(
        &self,
        viewer_id: Uuid,
        author_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Uuid)>>;

    /// Subset of `post_ids` the viewer liked
    async fn liked_post_ids(&self, viewer_id: Uuid, post_ids: &[Uuid]) -> Result<Vec<Uuid>>;

    /// All comments on `post_ids`, oldest first
    async fn comments_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<CommentRecord>>;
}

/// The collaborator stores the feed engine reads from and writes to.
#[derive(Clone)]
pub struct Repositories {
    pub posts: Arc<dyn PostRepository>,
    pub graph: Arc<dyn SocialGraphRepository>,
    pub views: Arc<dyn PostViewRepository>,
    pub engagement: Arc<dyn EngagementRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            graph: Arc::new(PgSocialGraphRepository::new(pool.clone())),
            views: Arc::new(PgPostViewRepository::new(pool.clone())),
            engagement: Arc::new(PgEngagementRepository::new(pool)),
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            posts: store.clone(),
            graph: store.clone(),
            views: store.clone(),
            engagement: store,
        }
    }
}
