use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{CandidatePool, PoolSettings, PoolSource};
use crate::db::{PostQuery, PostRepository, PostViewRepository};
use crate::error::Result;
use crate::models::{PostRecord, ViewerContext};

/// Posts from the last day the viewer has not been shown recently
pub struct FreshPool {
    posts: Arc<dyn PostRepository>,
    views: Arc<dyn PostViewRepository>,
    settings: PoolSettings,
}

impl FreshPool {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        views: Arc<dyn PostViewRepository>,
        settings: PoolSettings,
    ) -> Self {
        Self {
            posts,
            views,
            settings,
        }
    }
}

#[async_trait]
impl CandidatePool for FreshPool {
    async fn collect(&self, viewer: &ViewerContext, now: DateTime<Utc>) -> Result<Vec<PostRecord>> {
        let recently_viewed = self
            .views
            .viewed_since(viewer.viewer_id, now - self.settings.recently_viewed)
            .await?;

        let query =
            PostQuery::created_after(self.settings.window_start(now, self.settings.fresh_window))
                .excluding(recently_viewed);

        self.posts.find_approved(&query).await
    }

    fn source(&self) -> PoolSource {
        PoolSource::Fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::fixtures;
    use chrono::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_skips_recently_viewed_and_old_posts() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let viewer_id = Uuid::new_v4();

        let unseen = fixtures::post(Uuid::new_v4(), Some(Uuid::new_v4()), now - Duration::hours(2));
        let seen_recently = fixtures::post(Uuid::new_v4(), None, now - Duration::hours(1));
        let seen_long_ago = fixtures::post(Uuid::new_v4(), None, now - Duration::hours(20));
        let yesterday = fixtures::post(Uuid::new_v4(), None, now - Duration::hours(25));

        for post in [&unseen, &seen_recently, &seen_long_ago, &yesterday] {
            store.insert_post(post.clone());
        }
        store.insert_view(viewer_id, seen_recently.id, now - Duration::hours(1));
        store.insert_view(viewer_id, seen_long_ago.id, now - Duration::hours(13));

        let pool = FreshPool::new(store.clone(), store, PoolSettings::default());
        let mut found: Vec<_> = pool
            .collect(&ViewerContext::new(viewer_id), now)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        found.sort();

        let mut expected = vec![unseen.id, seen_long_ago.id];
        expected.sort();
        assert_eq!(found, expected);
    }
}
