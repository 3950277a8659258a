use rand::seq::{index, SliceRandom};
use rand::Rng;
use std::cmp::Ordering;
use std::ops::Range;
use tracing::debug;

use crate::models::ScoredPost;

/// Tiered diversity sampler.
///
/// Candidates are ranked by score and cut into high / medium / low tiers.
/// Each tier contributes a fixed share of the output, picked uniformly at
/// random inside the tier, and a serendipity share is drawn from whatever was
/// not picked yet. The result is shuffled, so two calls over the same
/// candidates normally produce different feeds.
#[derive(Debug, Clone)]
pub struct DiversitySampler {
    target_size: usize,
    mix: TierMix,
}

/// Output composition in percent of `target_size`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierMix {
    pub high_pct: usize,
    pub medium_pct: usize,
    pub low_pct: usize,
    pub serendipity_pct: usize,
}

impl Default for TierMix {
    fn default() -> Self {
        Self {
            high_pct: 40,
            medium_pct: 30,
            low_pct: 20,
            serendipity_pct: 10,
        }
    }
}

/// Per-tier pick counts before capping by tier size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierQuotas {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub serendipity: usize,
}

/// Contiguous rank ranges for the three tiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierBounds {
    pub high: Range<usize>,
    pub medium: Range<usize>,
    pub low: Range<usize>,
}

impl TierBounds {
    /// High is the top 30% (at least one post), medium runs to the 60% mark
    /// (at least one past high), low is the rest. Bounds are clamped to `len`,
    /// so with very few candidates medium and low may be empty.
    pub fn for_len(len: usize) -> Self {
        let high_end = (len * 3 / 10).max(1).min(len);
        let medium_end = (len * 6 / 10).max(high_end + 1).min(len);

        Self {
            high: 0..high_end,
            medium: high_end..medium_end,
            low: medium_end..len,
        }
    }
}

impl Default for DiversitySampler {
    fn default() -> Self {
        Self::new(50)
    }
}

impl DiversitySampler {
    pub fn new(target_size: usize) -> Self {
        Self {
            target_size,
            mix: TierMix::default(),
        }
    }

    pub fn with_mix(target_size: usize, mix: TierMix) -> Self {
        Self { target_size, mix }
    }

    pub fn quotas(&self) -> TierQuotas {
        TierQuotas {
            high: self.target_size * self.mix.high_pct / 100,
            medium: self.target_size * self.mix.medium_pct / 100,
            low: self.target_size * self.mix.low_pct / 100,
            serendipity: self.target_size * self.mix.serendipity_pct / 100,
        }
    }

    pub fn sample<R>(&self, mut candidates: Vec<ScoredPost>, rng: &mut R) -> Vec<ScoredPost>
    where
        R: Rng + ?Sized,
    {
        if candidates.is_empty() || self.target_size == 0 {
            return Vec::new();
        }

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        let total = candidates.len();
        let bounds = TierBounds::for_len(total);
        let quotas = self.quotas();

        let mut picked = vec![false; total];
        let mut selection: Vec<usize> = Vec::with_capacity(self.target_size.min(total));

        for (tier, quota) in [
            (&bounds.high, quotas.high),
            (&bounds.medium, quotas.medium),
            (&bounds.low, quotas.low),
        ] {
            let take = quota.min(tier.len());
            for offset in index::sample(rng, tier.len(), take) {
                let idx = tier.start + offset;
                picked[idx] = true;
                selection.push(idx);
            }
        }

        let leftovers: Vec<usize> = (0..total).filter(|idx| !picked[*idx]).collect();
        let serendipity = quotas.serendipity.min(leftovers.len());
        selection.extend(leftovers.choose_multiple(rng, serendipity).copied());

        selection.truncate(self.target_size);
        selection.shuffle(rng);

        debug!(
            "Diversity sampling: candidates={} high={} medium={} low={} selected={}",
            total,
            bounds.high.len(),
            bounds.medium.len(),
            bounds.low.len(),
            selection.len()
        );

        let mut slots: Vec<Option<ScoredPost>> = candidates.into_iter().map(Some).collect();
        selection
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PostRecord, PostStatus, PostType};
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn scored(score: f64) -> ScoredPost {
        let now = Utc::now();
        ScoredPost {
            post: PostRecord {
                id: Uuid::new_v4(),
                author_id: Uuid::new_v4(),
                author_username: "author".to_string(),
                author_avatar: None,
                community_id: None,
                title: "post".to_string(),
                post_type: PostType::Text,
                content: None,
                media_file: vec![],
                link: None,
                tags: vec![],
                status: PostStatus::Approved,
                is_pinned: false,
                created_at: now,
                updated_at: now,
                likes_count: 0,
                comments_count: 0,
                shares_count: 0,
            },
            score,
        }
    }

    fn candidates(n: usize) -> Vec<ScoredPost> {
        (0..n).map(|i| scored(i as f64)).collect()
    }

    fn ids(posts: &[ScoredPost]) -> Vec<Uuid> {
        posts.iter().map(|p| p.post.id).collect()
    }

    #[test]
    fn test_empty_candidates() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(DiversitySampler::default().sample(vec![], &mut rng).is_empty());
    }

    #[test]
    fn test_tier_bounds_regular() {
        let bounds = TierBounds::for_len(100);
        assert_eq!(bounds.high, 0..30);
        assert_eq!(bounds.medium, 30..60);
        assert_eq!(bounds.low, 60..100);
    }

    #[test]
    fn test_tier_bounds_tiny_inputs() {
        let one = TierBounds::for_len(1);
        assert_eq!(one.high, 0..1);
        assert!(one.medium.is_empty());
        assert!(one.low.is_empty());

        let two = TierBounds::for_len(2);
        assert_eq!(two.high, 0..1);
        assert_eq!(two.medium, 1..2);
        assert!(two.low.is_empty());

        let three = TierBounds::for_len(3);
        assert_eq!(three.high, 0..1);
        assert_eq!(three.medium, 1..2);
        assert_eq!(three.low, 2..3);
    }

    #[test]
    fn test_tiers_cover_every_rank_exactly_once() {
        for n in 1..60 {
            let bounds = TierBounds::for_len(n);
            assert_eq!(bounds.high.start, 0);
            assert_eq!(bounds.high.end, bounds.medium.start);
            assert_eq!(bounds.medium.end, bounds.low.start);
            assert_eq!(bounds.low.end, n);
            assert!(!bounds.high.is_empty());
        }
    }

    #[test]
    fn test_default_quotas() {
        let quotas = DiversitySampler::default().quotas();
        assert_eq!(
            quotas,
            TierQuotas {
                high: 20,
                medium: 15,
                low: 10,
                serendipity: 5,
            }
        );
    }

    #[test]
    fn test_full_size_output_for_large_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        let feed = DiversitySampler::default().sample(candidates(200), &mut rng);
        assert_eq!(feed.len(), 50);
        let unique: HashSet<Uuid> = ids(&feed).into_iter().collect();
        assert_eq!(unique.len(), 50);
    }

    #[test]
    fn test_tier_composition_for_large_pool() {
        let mut rng = StdRng::seed_from_u64(11);
        // scores 0..200; ranks 0..60 high (scores >= 140), 60..120 medium, rest low
        let feed = DiversitySampler::default().sample(candidates(200), &mut rng);
        let high = feed.iter().filter(|p| p.score >= 140.0).count();
        let medium = feed
            .iter()
            .filter(|p| p.score >= 80.0 && p.score < 140.0)
            .count();
        let low = feed.iter().filter(|p| p.score < 80.0).count();

        // tier quotas plus up to 5 serendipity picks landing anywhere
        assert!((20..=25).contains(&high));
        assert!((15..=20).contains(&medium));
        assert!((10..=15).contains(&low));
    }

    #[test]
    fn test_small_pool_never_exceeds_candidates() {
        for n in 1..60 {
            let mut rng = StdRng::seed_from_u64(n as u64);
            let feed = DiversitySampler::default().sample(candidates(n), &mut rng);
            assert!(feed.len() <= n.min(50));
            let unique: HashSet<Uuid> = ids(&feed).into_iter().collect();
            assert_eq!(unique.len(), feed.len());
        }
    }

    #[test]
    fn test_small_pool_takes_everything() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = candidates(10);
        let expected: HashSet<Uuid> = ids(&pool).into_iter().collect();
        let feed = DiversitySampler::default().sample(pool, &mut rng);
        let got: HashSet<Uuid> = ids(&feed).into_iter().collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_zero_score_posts_can_be_selected() {
        let mut rng = StdRng::seed_from_u64(5);
        let feed = DiversitySampler::default().sample(vec![scored(0.0), scored(0.0)], &mut rng);
        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let pool = candidates(120);
        let a = DiversitySampler::default().sample(pool.clone(), &mut StdRng::seed_from_u64(42));
        let b = DiversitySampler::default().sample(pool, &mut StdRng::seed_from_u64(42));
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn test_output_varies_across_calls() {
        let pool = candidates(120);
        let sampler = DiversitySampler::default();
        let mut orderings = HashSet::new();
        let mut memberships = HashSet::new();

        for seed in 0..20 {
            let feed = sampler.sample(pool.clone(), &mut StdRng::seed_from_u64(seed));
            let order = ids(&feed);
            let mut members = order.clone();
            members.sort();
            orderings.insert(order);
            memberships.insert(members);
        }

        assert!(orderings.len() > 1);
        assert!(memberships.len() > 1);
    }

    #[test]
    fn test_custom_mix_is_capped_by_target() {
        let mix = TierMix {
            high_pct: 100,
            medium_pct: 100,
            low_pct: 100,
            serendipity_pct: 100,
        };
        let mut rng = StdRng::seed_from_u64(9);
        let feed = DiversitySampler::with_mix(10, mix).sample(candidates(100), &mut rng);
        assert_eq!(feed.len(), 10);
    }
}
