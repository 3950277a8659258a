use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{CandidatePool, PoolSettings, PoolSource};
use crate::db::{AuthorFilter, CommunityScope, PostQuery, PostRepository};
use crate::error::Result;
use crate::models::{PostRecord, ViewerContext};

/// Community-less posts by authors the viewer follows
pub struct FollowedAuthorsPool {
    posts: Arc<dyn PostRepository>,
    settings: PoolSettings,
}

impl FollowedAuthorsPool {
    pub fn new(posts: Arc<dyn PostRepository>, settings: PoolSettings) -> Self {
        Self { posts, settings }
    }
}

#[async_trait]
impl CandidatePool for FollowedAuthorsPool {
    async fn collect(&self, viewer: &ViewerContext, now: DateTime<Utc>) -> Result<Vec<PostRecord>> {
        if viewer.following.is_empty() {
            return Ok(Vec::new());
        }

        let query = PostQuery::created_after(now - self.settings.max_age)
            .authors(AuthorFilter::In(viewer.following.iter().copied().collect()))
            .communities(CommunityScope::Unaffiliated);

        self.posts.find_approved(&query).await
    }

    fn source(&self) -> PoolSource {
        PoolSource::FollowedAuthors
    }
}
