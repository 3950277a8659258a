use std::collections::HashSet;
use uuid::Uuid;

use crate::models::ScoredPost;

/// Moves pinned posts from the viewer's joined communities to the front.
///
/// Stable partition: relative order inside both groups is kept. A pinned post
/// from a community the viewer has not joined stays where it is.
pub fn promote(feed: Vec<ScoredPost>, joined_communities: &HashSet<Uuid>) -> Vec<ScoredPost> {
    let (mut promoted, rest): (Vec<_>, Vec<_>) = feed
        .into_iter()
        .partition(|item| is_promotable(item, joined_communities));

    promoted.extend(rest);
    promoted
}

fn is_promotable(item: &ScoredPost, joined_communities: &HashSet<Uuid>) -> bool {
    item.post.is_pinned
        && item
            .post
            .community_id
            .map(|community| joined_communities.contains(&community))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use chrono::Utc;

    fn item(community: Option<Uuid>, pinned: bool) -> ScoredPost {
        let mut post = fixtures::post(Uuid::new_v4(), community, Utc::now());
        post.is_pinned = pinned;
        ScoredPost { post, score: 1.0 }
    }

    fn ids(feed: &[ScoredPost]) -> Vec<Uuid> {
        feed.iter().map(|p| p.post.id).collect()
    }

    #[test]
    fn test_pinned_joined_posts_move_first_in_order() {
        let joined = Uuid::new_v4();
        let a = item(None, false);
        let b = item(Some(joined), true);
        let c = item(Some(Uuid::new_v4()), true);
        let d = item(Some(joined), false);
        let e = item(Some(joined), true);

        let feed = vec![a.clone(), b.clone(), c.clone(), d.clone(), e.clone()];
        let promoted = promote(feed, &HashSet::from([joined]));

        assert_eq!(ids(&promoted), ids(&[b, e, a, c, d]));
    }

    #[test]
    fn test_pinned_without_community_is_not_promoted() {
        let a = item(None, false);
        let b = item(None, true);
        let feed = vec![a.clone(), b.clone()];

        let promoted = promote(feed, &HashSet::from([Uuid::new_v4()]));
        assert_eq!(ids(&promoted), ids(&[a, b]));
    }

    #[test]
    fn test_empty_feed() {
        assert!(promote(vec![], &HashSet::new()).is_empty());
    }
}
