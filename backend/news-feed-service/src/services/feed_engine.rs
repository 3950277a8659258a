//! Feed generation pipeline
//!
//! viewer context -> candidate pools -> relevance scoring -> diversity
//! sampling -> pin promotion. Each request is independent; the only write is
//! the PostView ledger, done separately through [`FeedEngine::record_views`].

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::candidates::{CandidateCollector, CollectionStats};
use super::diversity::DiversitySampler;
use super::pin_promoter;
use super::scoring::RelevanceScorer;
use super::view_recorder::ViewRecorder;
use crate::config::FeedConfig;
use crate::db::Repositories;
use crate::metrics;
use crate::models::{PostRecord, ScoredPost, ViewerContext};

#[derive(Debug, Clone, Default)]
pub struct FeedStats {
    pub collection: CollectionStats,
    pub sampled: usize,
    /// Pinned posts from joined communities moved to the front
    pub promoted: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GeneratedFeed {
    pub posts: Vec<ScoredPost>,
    pub stats: FeedStats,
}

impl GeneratedFeed {
    pub fn post_ids(&self) -> Vec<Uuid> {
        self.posts.iter().map(|p| p.post.id).collect()
    }
}

pub struct FeedEngine {
    repos: Repositories,
    collector: CandidateCollector,
    scorer: RelevanceScorer,
    sampler: DiversitySampler,
    recorder: ViewRecorder,
}

impl FeedEngine {
    pub fn new(repos: Repositories, config: &FeedConfig) -> Self {
        Self {
            collector: CandidateCollector::new(&repos, config),
            scorer: RelevanceScorer::new(config.time_decay_window_hours),
            sampler: DiversitySampler::new(config.target_size),
            recorder: ViewRecorder::new(repos.views.clone(), config.view_record_limit),
            repos,
        }
    }

    /// Following set and joined communities. A failed lookup leaves that
    /// part of the context empty.
    pub async fn load_viewer(&self, viewer_id: Uuid) -> ViewerContext {
        let (following, joined) = tokio::join!(
            self.repos.graph.following_ids(viewer_id),
            self.repos.graph.joined_community_ids(viewer_id),
        );

        let mut viewer = ViewerContext::new(viewer_id);

        match following {
            Ok(ids) => viewer.following = ids.into_iter().collect(),
            Err(e) => {
                warn!("Following lookup failed for viewer {}: {}", viewer_id, e);
                metrics::record_degraded_lookup("following");
            }
        }

        match joined {
            Ok(ids) => viewer.joined_communities = ids.into_iter().collect(),
            Err(e) => {
                warn!("Community lookup failed for viewer {}: {}", viewer_id, e);
                metrics::record_degraded_lookup("joined_communities");
            }
        }

        viewer
    }

    pub async fn generate<R>(
        &self,
        viewer_id: Uuid,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> GeneratedFeed
    where
        R: Rng + ?Sized,
    {
        let start = Instant::now();
        let mut viewer = self.load_viewer(viewer_id).await;

        let (candidates, collection) = self.collector.collect(&viewer, now).await;
        if candidates.is_empty() {
            info!("News feed empty: viewer_id={}", viewer_id);
            metrics::record_feed_size(0);
            return GeneratedFeed {
                posts: Vec::new(),
                stats: FeedStats {
                    collection,
                    ..Default::default()
                },
            };
        }

        self.load_liked_authors(&mut viewer, &candidates).await;

        let scored = self.scorer.score_all(candidates, &viewer, now);
        let sampled = self.sampler.sample(scored, rng);
        let sampled_len = sampled.len();

        let feed = pin_promoter::promote(sampled, &viewer.joined_communities);
        let promoted = feed
            .iter()
            .take_while(|p| p.post.is_pinned && viewer.has_joined(p.post.community_id))
            .count();

        debug!(
            "News feed stages: candidates={} sampled={} promoted={}",
            collection.total_candidates, sampled_len, promoted
        );
        info!(
            "News feed generated: viewer_id={}, candidates={}, feed_size={}, failed_pools={}, elapsed_ms={}",
            viewer_id,
            collection.total_candidates,
            feed.len(),
            collection.failed_pools.len(),
            start.elapsed().as_millis()
        );
        metrics::record_feed_size(feed.len());

        GeneratedFeed {
            posts: feed,
            stats: FeedStats {
                collection,
                sampled: sampled_len,
                promoted,
            },
        }
    }

    /// Record PostViews for the first posts shown. Best effort.
    pub async fn record_views(&self, viewer_id: Uuid, shown: &[Uuid], now: DateTime<Utc>) -> u64 {
        self.recorder.record(viewer_id, shown, now).await
    }

    /// Likes by the viewer on posts written by candidate authors.
    async fn load_liked_authors(&self, viewer: &mut ViewerContext, candidates: &[PostRecord]) {
        let authors: Vec<Uuid> = candidates
            .iter()
            .map(|p| p.author_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        match self
            .repos
            .engagement
            .liked_posts_by_authors(viewer.viewer_id, &authors)
            .await
        {
            Ok(pairs) => {
                for (post_id, author_id) in pairs {
                    viewer
                        .liked_posts_by_author
                        .entry(author_id)
                        .or_default()
                        .insert(post_id);
                }
            }
            Err(e) => {
                warn!(
                    "Liked-author lookup failed for viewer {}: {}",
                    viewer.viewer_id, e
                );
                metrics::record_degraded_lookup("liked_authors");
            }
        }
    }
}
