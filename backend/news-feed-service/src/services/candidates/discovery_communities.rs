use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{CandidatePool, PoolSettings, PoolSource};
use crate::db::{CommunityScope, PostQuery, PostRepository, SocialGraphRepository};
use crate::error::Result;
use crate::models::{PostRecord, ViewerContext};

/// Well-engaged recent posts from the largest public communities the viewer
/// has not joined
pub struct DiscoveryCommunitiesPool {
    posts: Arc<dyn PostRepository>,
    graph: Arc<dyn SocialGraphRepository>,
    settings: PoolSettings,
}

impl DiscoveryCommunitiesPool {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        graph: Arc<dyn SocialGraphRepository>,
        settings: PoolSettings,
    ) -> Self {
        Self {
            posts,
            graph,
            settings,
        }
    }
}

#[async_trait]
impl CandidatePool for DiscoveryCommunitiesPool {
    async fn collect(&self, viewer: &ViewerContext, now: DateTime<Utc>) -> Result<Vec<PostRecord>> {
        let joined: Vec<_> = viewer.joined_communities.iter().copied().collect();
        let communities = self
            .graph
            .top_public_communities(&joined, self.settings.discovery_community_limit)
            .await?;

        if communities.is_empty() {
            return Ok(Vec::new());
        }

        let query = PostQuery::created_after(
            self.settings
                .window_start(now, self.settings.discovery_window),
        )
        .communities(CommunityScope::In(communities))
        .min_engagement(self.settings.discovery_community_min_engagement);

        self.posts.find_approved(&query).await
    }

    fn source(&self) -> PoolSource {
        PoolSource::DiscoveryCommunities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::{fixtures, CommunityRecord};
    use chrono::Duration;
    use uuid::Uuid;

    fn community(store: &InMemoryStore, is_public: bool, members_count: i64) -> Uuid {
        let id = Uuid::new_v4();
        store.upsert_community(CommunityRecord {
            id,
            is_public,
            members_count,
        });
        id
    }

    #[tokio::test]
    async fn test_public_unjoined_engaged_recent_posts() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let public = community(&store, true, 120);
        let private = community(&store, false, 900);
        let joined = community(&store, true, 500);

        let mut wanted = fixtures::post(Uuid::new_v4(), Some(public), now - Duration::days(2));
        wanted.likes_count = 5;
        store.insert_post(wanted.clone());

        // weighted engagement 4, below the threshold
        let mut quiet = fixtures::post(Uuid::new_v4(), Some(public), now);
        quiet.comments_count = 2;
        store.insert_post(quiet);

        let mut stale = fixtures::post(Uuid::new_v4(), Some(public), now - Duration::days(8));
        stale.shares_count = 10;
        store.insert_post(stale);

        for hidden in [private, joined] {
            let mut post = fixtures::post(Uuid::new_v4(), Some(hidden), now);
            post.likes_count = 50;
            store.insert_post(post);
        }

        let mut viewer = ViewerContext::new(Uuid::new_v4());
        viewer.joined_communities.insert(joined);

        let pool = DiscoveryCommunitiesPool::new(store.clone(), store, PoolSettings::default());
        let found = pool.collect(&viewer, now).await.unwrap();
        assert_eq!(found, vec![wanted]);
    }

    #[tokio::test]
    async fn test_community_limit_applies() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let large = community(&store, true, 1000);
        let small = community(&store, true, 10);

        for id in [large, small] {
            let mut post = fixtures::post(Uuid::new_v4(), Some(id), now);
            post.likes_count = 20;
            store.insert_post(post);
        }

        let settings = PoolSettings {
            discovery_community_limit: 1,
            ..PoolSettings::default()
        };
        let pool = DiscoveryCommunitiesPool::new(store.clone(), store, settings);
        let found = pool
            .collect(&ViewerContext::new(Uuid::new_v4()), now)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].community_id, Some(large));
    }
}
