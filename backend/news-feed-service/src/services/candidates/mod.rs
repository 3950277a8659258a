//! Candidate collection
//!
//! Five pools feed the ranker. Each pool is queried independently and
//! concurrently; a pool that errors is logged, counted and skipped, so the
//! feed degrades instead of failing.

mod discovery_authors;
mod discovery_communities;
mod followed_authors;
mod fresh;
mod joined_communities;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::config::FeedConfig;
use crate::db::Repositories;
use crate::error::Result;
use crate::metrics;
use crate::models::{PostRecord, PostStatus, ViewerContext};

pub use discovery_authors::DiscoveryAuthorsPool;
pub use discovery_communities::DiscoveryCommunitiesPool;
pub use followed_authors::FollowedAuthorsPool;
pub use fresh::FreshPool;
pub use joined_communities::JoinedCommunitiesPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolSource {
    FollowedAuthors,
    JoinedCommunities,
    DiscoveryCommunities,
    DiscoveryAuthors,
    Fresh,
}

impl PoolSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FollowedAuthors => "followed_authors",
            Self::JoinedCommunities => "joined_communities",
            Self::DiscoveryCommunities => "discovery_communities",
            Self::DiscoveryAuthors => "discovery_authors",
            Self::Fresh => "fresh",
        }
    }
}

impl std::fmt::Display for PoolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source of feed candidates
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CandidatePool: Send + Sync {
    async fn collect(&self, viewer: &ViewerContext, now: DateTime<Utc>) -> Result<Vec<PostRecord>>;
    fn source(&self) -> PoolSource;
}

/// Time windows and thresholds shared by the pools
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    /// Hard age limit applied to every pool
    pub max_age: Duration,
    pub discovery_window: Duration,
    pub discovery_community_limit: i64,
    pub discovery_community_min_engagement: i64,
    pub discovery_author_min_engagement: i64,
    pub fresh_window: Duration,
    pub recently_viewed: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::from(&FeedConfig::default())
    }
}

impl From<&FeedConfig> for PoolSettings {
    fn from(config: &FeedConfig) -> Self {
        Self {
            max_age: Duration::days(config.candidate_max_age_days),
            discovery_window: Duration::days(config.discovery_window_days),
            discovery_community_limit: config.discovery_community_limit,
            discovery_community_min_engagement: config.discovery_community_min_engagement,
            discovery_author_min_engagement: config.discovery_author_min_engagement,
            fresh_window: Duration::hours(config.fresh_window_hours),
            recently_viewed: Duration::hours(config.recently_viewed_hours),
        }
    }
}

impl PoolSettings {
    /// Start of a pool window, never older than `max_age`.
    pub fn window_start(&self, now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
        (now - window).max(now - self.max_age)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionStats {
    /// Candidates returned per pool, before deduplication
    pub pool_counts: Vec<(PoolSource, usize)>,
    pub failed_pools: Vec<PoolSource>,
    pub total_candidates: usize,
}

impl CollectionStats {
    pub fn count_for(&self, source: PoolSource) -> Option<usize> {
        self.pool_counts
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, count)| *count)
    }
}

pub struct CandidateCollector {
    pools: Vec<Box<dyn CandidatePool>>,
}

impl CandidateCollector {
    pub fn new(repos: &Repositories, config: &FeedConfig) -> Self {
        let settings = PoolSettings::from(config);

        let pools: Vec<Box<dyn CandidatePool>> = vec![
            Box::new(FollowedAuthorsPool::new(repos.posts.clone(), settings)),
            Box::new(JoinedCommunitiesPool::new(repos.posts.clone(), settings)),
            Box::new(DiscoveryCommunitiesPool::new(
                repos.posts.clone(),
                repos.graph.clone(),
                settings,
            )),
            Box::new(DiscoveryAuthorsPool::new(repos.posts.clone(), settings)),
            Box::new(FreshPool::new(
                repos.posts.clone(),
                repos.views.clone(),
                settings,
            )),
        ];

        Self { pools }
    }

    pub fn with_pools(pools: Vec<Box<dyn CandidatePool>>) -> Self {
        Self { pools }
    }

    /// Union of every pool, deduplicated by post id (first pool wins).
    pub async fn collect(
        &self,
        viewer: &ViewerContext,
        now: DateTime<Utc>,
    ) -> (Vec<PostRecord>, CollectionStats) {
        let results = join_all(
            self.pools
                .iter()
                .map(|pool| async move { (pool.source(), pool.collect(viewer, now).await) }),
        )
        .await;

        let mut stats = CollectionStats::default();
        let mut seen: HashSet<uuid::Uuid> = HashSet::new();
        let mut candidates = Vec::new();

        for (source, result) in results {
            match result {
                Ok(posts) => {
                    metrics::record_pool_candidates(source.as_str(), posts.len());
                    stats.pool_counts.push((source, posts.len()));
                    for post in posts {
                        if post.status == PostStatus::Approved && seen.insert(post.id) {
                            candidates.push(post);
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        "Candidate pool {} failed for viewer {}: {}",
                        source, viewer.viewer_id, e
                    );
                    metrics::record_pool_failure(source.as_str());
                    stats.failed_pools.push(source);
                }
            }
        }

        stats.total_candidates = candidates.len();

        debug!(
            "Candidates collected: viewer_id={}, pools={:?}, failed={:?}, total={}",
            viewer.viewer_id, stats.pool_counts, stats.failed_pools, stats.total_candidates
        );

        (candidates, stats)
    }
}
