use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{CandidatePool, PoolSettings, PoolSource};
use crate::db::{AuthorFilter, CommunityScope, PostQuery, PostRepository};
use crate::error::Result;
use crate::models::{PostRecord, ViewerContext};

/// Popular recent community-less posts by authors the viewer does not follow
pub struct DiscoveryAuthorsPool {
    posts: Arc<dyn PostRepository>,
    settings: PoolSettings,
}

impl DiscoveryAuthorsPool {
    pub fn new(posts: Arc<dyn PostRepository>, settings: PoolSettings) -> Self {
        Self { posts, settings }
    }
}

#[async_trait]
impl CandidatePool for DiscoveryAuthorsPool {
    async fn collect(&self, viewer: &ViewerContext, now: DateTime<Utc>) -> Result<Vec<PostRecord>> {
        let mut excluded: Vec<_> = viewer.following.iter().copied().collect();
        excluded.push(viewer.viewer_id);

        let query = PostQuery::created_after(
            self.settings
                .window_start(now, self.settings.discovery_window),
        )
        .authors(AuthorFilter::NotIn(excluded))
        .communities(CommunityScope::Unaffiliated)
        .min_engagement(self.settings.discovery_author_min_engagement);

        self.posts.find_approved(&query).await
    }

    fn source(&self) -> PoolSource {
        PoolSource::DiscoveryAuthors
    }
}
