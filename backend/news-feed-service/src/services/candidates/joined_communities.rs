use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{CandidatePool, PoolSettings, PoolSource};
use crate::db::{CommunityScope, PostQuery, PostRepository};
use crate::error::Result;
use crate::models::{PostRecord, ViewerContext};

/// Posts in communities the viewer is an approved member of
pub struct JoinedCommunitiesPool {
    posts: Arc<dyn PostRepository>,
    settings: PoolSettings,
}

impl JoinedCommunitiesPool {
    pub fn new(posts: Arc<dyn PostRepository>, settings: PoolSettings) -> Self {
        Self { posts, settings }
    }
}

#[async_trait]
impl CandidatePool for JoinedCommunitiesPool {
    async fn collect(&self, viewer: &ViewerContext, now: DateTime<Utc>) -> Result<Vec<PostRecord>> {
        if viewer.joined_communities.is_empty() {
            return Ok(Vec::new());
        }

        let query = PostQuery::created_after(now - self.settings.max_age).communities(
            CommunityScope::In(viewer.joined_communities.iter().copied().collect()),
        );

        self.posts.find_approved(&query).await
    }

    fn source(&self) -> PoolSource {
        PoolSource::JoinedCommunities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::{fixtures, PostStatus};
    use chrono::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_posts_from_joined_communities_only() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let joined = Uuid::new_v4();

        let wanted = fixtures::post(Uuid::new_v4(), Some(joined), now - Duration::days(10));
        store.insert_post(wanted.clone());
        store.insert_post(fixtures::post(Uuid::new_v4(), Some(Uuid::new_v4()), now));
        store.insert_post(fixtures::post(Uuid::new_v4(), None, now));

        let mut rejected = fixtures::post(Uuid::new_v4(), Some(joined), now);
        rejected.status = PostStatus::Rejected;
        store.insert_post(rejected);

        let mut viewer = ViewerContext::new(Uuid::new_v4());
        viewer.joined_communities.insert(joined);

        let pool = JoinedCommunitiesPool::new(store, PoolSettings::default());
        let found = pool.collect(&viewer, now).await.unwrap();
        assert_eq!(found, vec![wanted]);
    }

    #[tokio::test]
    async fn test_posts_older_than_max_age_excluded() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let joined = Uuid::new_v4();

        let recent = fixtures::post(Uuid::new_v4(), Some(joined), now - Duration::days(29));
        store.insert_post(recent.clone());
        store.insert_post(fixtures::post(
            Uuid::new_v4(),
            Some(joined),
            now - Duration::days(31),
        ));

        let mut viewer = ViewerContext::new(Uuid::new_v4());
        viewer.joined_communities.insert(joined);

        let pool = JoinedCommunitiesPool::new(store, PoolSettings::default());
        let found = pool.collect(&viewer, now).await.unwrap();
        assert_eq!(found, vec![recent]);
    }
}
