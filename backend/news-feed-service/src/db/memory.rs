//! In-process implementation of every feed repository.
//!
//! Backs the endpoint, engine and pool tests.
//! Engagement counts on stored posts are treated as the aggregate the post
//! store would compute; `like` and `add_comment` keep them in step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use uuid::Uuid;

use super::{
    EngagementRepository, PostQuery, PostRepository, PostViewRepository, SocialGraphRepository,
};
use crate::error::Result;
use crate::models::{CommentRecord, CommunityRecord, PostRecord, PostStatus};

#[derive(Default)]
pub struct InMemoryStore {
    posts: DashMap<Uuid, PostRecord>,
    /// (follower, followed)
    follows: DashSet<(Uuid, Uuid)>,
    /// (user, community) -> approved
    memberships: DashMap<(Uuid, Uuid), bool>,
    communities: DashMap<Uuid, CommunityRecord>,
    /// (user, post) -> viewed_at
    views: DashMap<(Uuid, Uuid), DateTime<Utc>>,
    /// (user, post)
    likes: DashSet<(Uuid, Uuid)>,
    comments: DashMap<Uuid, CommentRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_post(&self, post: PostRecord) {
        self.posts.insert(post.id, post);
    }

    pub fn follow(&self, follower: Uuid, followed: Uuid) {
        self.follows.insert((follower, followed));
    }

    pub fn upsert_community(&self, community: CommunityRecord) {
        self.communities.insert(community.id, community);
    }

    pub fn set_membership(&self, user: Uuid, community: Uuid, approved: bool) {
        self.memberships.insert((user, community), approved);
    }

    /// Returns false when the like already existed.
    pub fn like(&self, user: Uuid, post: Uuid) -> bool {
        let created = self.likes.insert((user, post));
        if created {
            if let Some(mut record) = self.posts.get_mut(&post) {
                record.likes_count += 1;
            }
        }
        created
    }

    pub fn add_comment(&self, comment: CommentRecord) {
        if let Some(mut record) = self.posts.get_mut(&comment.post_id) {
            record.comments_count += 1;
        }
        self.comments.insert(comment.id, comment);
    }

    /// Seed a PostView row with an explicit timestamp.
    pub fn insert_view(&self, user: Uuid, post: Uuid, viewed_at: DateTime<Utc>) {
        self.views.entry((user, post)).or_insert(viewed_at);
    }

    pub fn views_of(&self, user: Uuid) -> Vec<(Uuid, DateTime<Utc>)> {
        self.views
            .iter()
            .filter(|entry| entry.key().0 == user)
            .map(|entry| (entry.key().1, *entry.value()))
            .collect()
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn find_approved(&self, query: &PostQuery) -> Result<Vec<PostRecord>> {
        let mut posts: Vec<PostRecord> = self
            .posts
            .iter()
            .filter(|entry| entry.status == PostStatus::Approved && query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }
}

#[async_trait]
impl SocialGraphRepository for InMemoryStore {
    async fn following_ids(&self, viewer_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .follows
            .iter()
            .filter(|edge| edge.0 == viewer_id)
            .map(|edge| edge.1)
            .collect())
    }

    async fn joined_community_ids(&self, viewer_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .memberships
            .iter()
            .filter(|entry| entry.key().0 == viewer_id && *entry.value())
            .map(|entry| entry.key().1)
            .collect())
    }

    async fn top_public_communities(&self, excluding: &[Uuid], limit: i64) -> Result<Vec<Uuid>> {
        let mut public: Vec<CommunityRecord> = self
            .communities
            .iter()
            .filter(|entry| entry.is_public && !excluding.contains(entry.key()))
            .map(|entry| entry.value().clone())
            .collect();

        public.sort_by(|a, b| b.members_count.cmp(&a.members_count));
        Ok(public
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|c| c.id)
            .collect())
    }
}

#[async_trait]
impl PostViewRepository for InMemoryStore {
    async fn viewed_since(&self, viewer_id: Uuid, since: DateTime<Utc>) -> Result<Vec<Uuid>> {
        Ok(self
            .views
            .iter()
            .filter(|entry| entry.key().0 == viewer_id && *entry.value() >= since)
            .map(|entry| entry.key().1)
            .collect())
    }

    async fn record_views(
        &self,
        viewer_id: Uuid,
        post_ids: &[Uuid],
        viewed_at: DateTime<Utc>,
    ) -> Result<u64> {
        let mut inserted = 0;
        for post_id in post_ids {
            if let Entry::Vacant(slot) = self.views.entry((viewer_id, *post_id)) {
                slot.insert(viewed_at);
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

#[async_trait]
impl EngagementRepository for InMemoryStore {
    async fn liked_posts_by_authors(
        &self,
        viewer_id: Uuid,
        author_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Uuid)>> {
        let liked: Vec<Uuid> = self
            .likes
            .iter()
            .filter(|like| like.0 == viewer_id)
            .map(|like| like.1)
            .collect();

        Ok(liked
            .into_iter()
            .filter_map(|post_id| {
                let author = self.posts.get(&post_id)?.author_id;
                author_ids.contains(&author).then_some((post_id, author))
            })
            .collect())
    }

    async fn liked_post_ids(&self, viewer_id: Uuid, post_ids: &[Uuid]) -> Result<Vec<Uuid>> {
        Ok(post_ids
            .iter()
            .filter(|post_id| self.likes.contains(&(viewer_id, **post_id)))
            .copied()
            .collect())
    }

    async fn comments_for_posts(&self, post_ids: &[Uuid]) -> Result<Vec<CommentRecord>> {
        let mut comments: Vec<CommentRecord> = self
            .comments
            .iter()
            .filter(|entry| post_ids.contains(&entry.post_id))
            .map(|entry| entry.value().clone())
            .collect();

        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }
}
