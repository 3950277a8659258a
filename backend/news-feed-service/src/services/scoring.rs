//! Relevance scoring for feed candidates
//!
//! score = engagement * time_decay * personalization
//!
//! - engagement: likes x1 + comments x2 + shares x3
//! - time_decay: linear from 1.0 down to a 0.1 floor over the decay window;
//!   old posts are discounted, never excluded
//! - personalization: product of every boost that applies to the viewer

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{PostRecord, ScoredPost, ViewerContext};

pub const LIKE_WEIGHT: f64 = 1.0;
pub const COMMENT_WEIGHT: f64 = 2.0;
pub const SHARE_WEIGHT: f64 = 3.0;

pub const MIN_TIME_DECAY: f64 = 0.1;

pub const FOLLOWED_AUTHOR_BOOST: f64 = 2.0;
pub const JOINED_COMMUNITY_BOOST: f64 = 1.5;
pub const LIKED_AUTHOR_BOOST: f64 = 1.3;
pub const PINNED_BOOST: f64 = 3.0;

/// Scoring inputs pulled out of a post record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringInput {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub community_id: Option<Uuid>,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub created_at: DateTime<Utc>,
    pub is_pinned: bool,
}

impl From<&PostRecord> for ScoringInput {
    fn from(post: &PostRecord) -> Self {
        Self {
            post_id: post.id,
            author_id: post.author_id,
            community_id: post.community_id,
            likes: post.likes_count,
            comments: post.comments_count,
            shares: post.shares_count,
            created_at: post.created_at,
            is_pinned: post.is_pinned,
        }
    }
}

pub fn engagement(likes: i64, comments: i64, shares: i64) -> f64 {
    likes as f64 * LIKE_WEIGHT + comments as f64 * COMMENT_WEIGHT + shares as f64 * SHARE_WEIGHT
}

/// `max(0.1, 1 - age / window)`. Future timestamps count as age zero.
pub fn time_decay(age_hours: f64, window_hours: f64) -> f64 {
    if window_hours <= 0.0 {
        return MIN_TIME_DECAY;
    }
    (1.0 - age_hours.max(0.0) / window_hours).max(MIN_TIME_DECAY)
}

pub fn personalization(input: &ScoringInput, viewer: &ViewerContext) -> f64 {
    let mut multiplier = 1.0;

    if viewer.follows(input.author_id) {
        multiplier *= FOLLOWED_AUTHOR_BOOST;
    }
    if viewer.has_joined(input.community_id) {
        multiplier *= JOINED_COMMUNITY_BOOST;
    }
    if viewer.liked_other_post_by(input.author_id, input.post_id) {
        multiplier *= LIKED_AUTHOR_BOOST;
    }
    if input.is_pinned {
        multiplier *= PINNED_BOOST;
    }

    multiplier
}

fn age_in_hours(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - created_at).num_milliseconds() as f64 / 3_600_000.0
}

#[derive(Debug, Clone, Copy)]
pub struct RelevanceScorer {
    time_decay_window_hours: f64,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new(24.0)
    }
}

impl RelevanceScorer {
    pub fn new(time_decay_window_hours: f64) -> Self {
        Self {
            time_decay_window_hours,
        }
    }

    pub fn score(&self, input: &ScoringInput, viewer: &ViewerContext, now: DateTime<Utc>) -> f64 {
        let age_hours = age_in_hours(input.created_at, now);

        engagement(input.likes, input.comments, input.shares)
            * time_decay(age_hours, self.time_decay_window_hours)
            * personalization(input, viewer)
    }

    pub fn score_all(
        &self,
        posts: Vec<PostRecord>,
        viewer: &ViewerContext,
        now: DateTime<Utc>,
    ) -> Vec<ScoredPost> {
        posts
            .into_iter()
            .map(|post| {
                let score = self.score(&ScoringInput::from(&post), viewer, now);
                ScoredPost { post, score }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input(
        likes: i64,
        comments: i64,
        shares: i64,
        age: Duration,
    ) -> (ScoringInput, DateTime<Utc>) {
        let now = Utc::now();
        (
            ScoringInput {
                post_id: Uuid::new_v4(),
                author_id: Uuid::new_v4(),
                community_id: None,
                likes,
                comments,
                shares,
                created_at: now - age,
                is_pinned: false,
            },
            now,
        )
    }

    #[test]
    fn test_followed_author_scenario() {
        let scorer = RelevanceScorer::default();
        let (post, now) = input(2, 1, 0, Duration::hours(1));
        let mut viewer = ViewerContext::new(Uuid::new_v4());
        viewer.following.insert(post.author_id);

        let score = scorer.score(&post, &viewer, now);
        // 4 * (1 - 1/24) * 2.0
        let expected = 4.0 * (1.0 - 1.0 / 24.0) * 2.0;
        assert!((score - expected).abs() < 1e-9);
        assert!((score - 7.667).abs() < 1e-3);
    }

    #[test]
    fn test_engagement_weights() {
        assert_eq!(engagement(1, 0, 0), 1.0);
        assert_eq!(engagement(0, 1, 0), 2.0);
        assert_eq!(engagement(0, 0, 1), 3.0);
        assert_eq!(engagement(2, 1, 0), 4.0);
    }

    #[test]
    fn test_score_strictly_increases_with_each_count() {
        let scorer = RelevanceScorer::default();
        let viewer = ViewerContext::new(Uuid::new_v4());
        let now = Utc::now();
        let base = ScoringInput {
            post_id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            community_id: None,
            likes: 1,
            comments: 1,
            shares: 0,
            created_at: now - Duration::hours(1),
            is_pinned: false,
        };
        let base_score = scorer.score(&base, &viewer, now);

        let more_likes = ScoringInput { likes: 2, ..base };
        let more_comments = ScoringInput { comments: 2, ..base };
        let more_shares = ScoringInput { shares: 1, ..base };

        assert!(scorer.score(&more_likes, &viewer, now) > base_score);
        assert!(scorer.score(&more_comments, &viewer, now) > base_score);
        assert!(scorer.score(&more_shares, &viewer, now) > base_score);
    }

    #[test]
    fn test_time_decay_non_increasing_and_floored() {
        let mut previous = f64::MAX;
        for hours in [0.0, 1.0, 6.0, 12.0, 23.0, 24.0, 48.0, 1000.0] {
            let decay = time_decay(hours, 24.0);
            assert!(decay <= previous);
            assert!(decay >= MIN_TIME_DECAY);
            previous = decay;
        }
        assert_eq!(time_decay(1000.0, 24.0), MIN_TIME_DECAY);
        assert_eq!(time_decay(0.0, 24.0), 1.0);
    }

    #[test]
    fn test_future_posts_do_not_exceed_full_weight() {
        assert_eq!(time_decay(-5.0, 24.0), 1.0);
    }

    #[test]
    fn test_boosts_compose_multiplicatively() {
        let community = Uuid::new_v4();
        let (mut post, now) = input(3, 0, 0, Duration::zero());
        post.community_id = Some(community);
        post.is_pinned = true;

        let mut viewer = ViewerContext::new(Uuid::new_v4());
        viewer.following.insert(post.author_id);
        viewer.joined_communities.insert(community);
        viewer
            .liked_posts_by_author
            .entry(post.author_id)
            .or_default()
            .insert(Uuid::new_v4());

        let multiplier = personalization(&post, &viewer);
        let expected =
            FOLLOWED_AUTHOR_BOOST * JOINED_COMMUNITY_BOOST * LIKED_AUTHOR_BOOST * PINNED_BOOST;
        assert!((multiplier - expected).abs() < 1e-9);

        let score = RelevanceScorer::default().score(&post, &viewer, now);
        assert!((score - 3.0 * expected).abs() < 1e-9);
    }

    #[test]
    fn test_liking_only_this_post_does_not_boost() {
        let (post, _) = input(1, 0, 0, Duration::zero());
        let mut viewer = ViewerContext::new(Uuid::new_v4());
        viewer
            .liked_posts_by_author
            .entry(post.author_id)
            .or_default()
            .insert(post.post_id);

        assert_eq!(personalization(&post, &viewer), 1.0);
    }

    #[test]
    fn test_zero_engagement_scores_zero() {
        let (post, now) = input(0, 0, 0, Duration::hours(2));
        let viewer = ViewerContext::new(Uuid::new_v4());
        assert_eq!(RelevanceScorer::default().score(&post, &viewer, now), 0.0);
    }
}
