use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::db::EngagementRepository;
use crate::metrics;
use crate::models::{CommentRecord, FeedComment, FeedPost, PostRecord};

/// Turns feed posts into their response representation for one viewer:
/// like flag, nested comments and edit/delete permissions.
#[derive(Clone)]
pub struct FeedHydrator {
    engagement: Arc<dyn EngagementRepository>,
}

impl FeedHydrator {
    pub fn new(engagement: Arc<dyn EngagementRepository>) -> Self {
        Self { engagement }
    }

    pub async fn hydrate(&self, viewer_id: Uuid, posts: Vec<PostRecord>) -> Vec<FeedPost> {
        if posts.is_empty() {
            return Vec::new();
        }

        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();

        let (liked, comments) = tokio::join!(
            self.engagement.liked_post_ids(viewer_id, &post_ids),
            self.engagement.comments_for_posts(&post_ids),
        );

        let liked: HashSet<Uuid> = match liked {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!("Like lookup failed for viewer {}: {}", viewer_id, e);
                metrics::record_degraded_lookup("liked_posts");
                HashSet::new()
            }
        };

        let mut comments_by_post: HashMap<Uuid, Vec<CommentRecord>> = HashMap::new();
        match comments {
            Ok(rows) => {
                for comment in rows {
                    comments_by_post
                        .entry(comment.post_id)
                        .or_default()
                        .push(comment);
                }
            }
            Err(e) => {
                warn!("Comment lookup failed for feed page: {}", e);
                metrics::record_degraded_lookup("comments");
            }
        }

        posts
            .into_iter()
            .map(|post| {
                let comments = comments_by_post.remove(&post.id).unwrap_or_default();
                let is_liked = liked.contains(&post.id);
                to_feed_post(post, comments, viewer_id, is_liked)
            })
            .collect()
    }
}

fn to_feed_post(
    post: PostRecord,
    comments: Vec<CommentRecord>,
    viewer_id: Uuid,
    is_liked: bool,
) -> FeedPost {
    let is_author = post.author_id == viewer_id;
    let comments = nest_comments(comments, viewer_id, post.author_id);

    FeedPost {
        id: post.id,
        user: post.author_id,
        user_name: post.author_username,
        avatar: post.author_avatar,
        title: post.title,
        post_type: post.post_type,
        content: post.content,
        media_file: post.media_file,
        link: post.link,
        tags: post.tags,
        status: post.status,
        community: post.community_id,
        is_pinned: post.is_pinned,
        created_at: post.created_at,
        updated_at: post.updated_at,
        likes_count: post.likes_count,
        comments_count: post.comments_count,
        shares_count: post.shares_count,
        comments,
        can_edit: is_author,
        can_delete: is_author,
        is_liked,
    }
}

/// Builds the reply tree. Top-level comments keep the input order; a reply
/// whose parent is not among `comments` is dropped.
fn nest_comments(
    comments: Vec<CommentRecord>,
    viewer_id: Uuid,
    post_author: Uuid,
) -> Vec<FeedComment> {
    let mut children: HashMap<Uuid, Vec<CommentRecord>> = HashMap::new();
    let mut roots = Vec::new();

    for comment in comments {
        match comment.parent_id {
            Some(parent) => children.entry(parent).or_default().push(comment),
            None => roots.push(comment),
        }
    }

    roots
        .into_iter()
        .map(|root| build_comment(root, &mut children, viewer_id, post_author))
        .collect()
}

fn build_comment(
    comment: CommentRecord,
    children: &mut HashMap<Uuid, Vec<CommentRecord>>,
    viewer_id: Uuid,
    post_author: Uuid,
) -> FeedComment {
    let replies: Vec<FeedComment> = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|reply| build_comment(reply, children, viewer_id, post_author))
        .collect();

    let is_author = comment.author_id == viewer_id;

    FeedComment {
        id: comment.id,
        user: comment.author_id,
        user_name: comment.author_username,
        avatar: comment.author_avatar,
        post: comment.post_id,
        parent: comment.parent_id,
        content: comment.content,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
        replies_count: replies.len(),
        replies,
        can_edit: is_author,
        can_delete: is_author || post_author == viewer_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, MockEngagementRepository};
    use crate::error::AppError;
    use crate::models::fixtures;
    use chrono::{Duration, Utc};

    fn comment(
        post: &PostRecord,
        author: Uuid,
        parent: Option<Uuid>,
        minutes_ago: i64,
    ) -> CommentRecord {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        CommentRecord {
            id: Uuid::new_v4(),
            post_id: post.id,
            parent_id: parent,
            author_id: author,
            author_username: "commenter".to_string(),
            author_avatar: None,
            content: "nice".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_like_flag_and_post_permissions() {
        let store = Arc::new(InMemoryStore::new());
        let viewer = Uuid::new_v4();
        let own = fixtures::post(viewer, None, Utc::now());
        let other = fixtures::post(Uuid::new_v4(), None, Utc::now());
        store.insert_post(own.clone());
        store.insert_post(other.clone());
        store.like(viewer, other.id);

        let hydrated = FeedHydrator::new(store)
            .hydrate(viewer, vec![own.clone(), other.clone()])
            .await;

        assert_eq!(hydrated[0].id, own.id);
        assert!(hydrated[0].can_edit && hydrated[0].can_delete);
        assert!(!hydrated[0].is_liked);

        assert_eq!(hydrated[1].id, other.id);
        assert!(!hydrated[1].can_edit && !hydrated[1].can_delete);
        assert!(hydrated[1].is_liked);
    }

    #[tokio::test]
    async fn test_replies_nest_under_parent() {
        let store = Arc::new(InMemoryStore::new());
        let viewer = Uuid::new_v4();
        let post_author = Uuid::new_v4();
        let post = fixtures::post(post_author, None, Utc::now());
        store.insert_post(post.clone());

        let commenter = Uuid::new_v4();
        let root = comment(&post, commenter, None, 30);
        let reply = comment(&post, viewer, Some(root.id), 20);
        let nested = comment(&post, commenter, Some(reply.id), 10);
        store.add_comment(root.clone());
        store.add_comment(reply.clone());
        store.add_comment(nested.clone());

        let hydrated = FeedHydrator::new(store).hydrate(viewer, vec![post]).await;
        let comments = &hydrated[0].comments;

        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].id, root.id);
        assert_eq!(comments[0].replies_count, 1);
        assert!(!comments[0].can_edit && !comments[0].can_delete);

        let first_reply = &comments[0].replies[0];
        assert_eq!(first_reply.id, reply.id);
        assert!(first_reply.can_edit && first_reply.can_delete);
        assert_eq!(first_reply.replies[0].id, nested.id);
    }

    #[tokio::test]
    async fn test_post_author_can_delete_any_comment() {
        let store = Arc::new(InMemoryStore::new());
        let viewer = Uuid::new_v4();
        let post = fixtures::post(viewer, None, Utc::now());
        store.insert_post(post.clone());
        store.add_comment(comment(&post, Uuid::new_v4(), None, 5));

        let hydrated = FeedHydrator::new(store).hydrate(viewer, vec![post]).await;
        let only = &hydrated[0].comments[0];
        assert!(!only.can_edit);
        assert!(only.can_delete);
    }

    #[tokio::test]
    async fn test_lookup_failures_degrade() {
        let mut engagement = MockEngagementRepository::new();
        engagement
            .expect_liked_post_ids()
            .returning(|_, _| Err(AppError::Database("gone".to_string())));
        engagement
            .expect_comments_for_posts()
            .returning(|_| Err(AppError::Database("gone".to_string())));

        let post = fixtures::post(Uuid::new_v4(), None, Utc::now());
        let hydrated = FeedHydrator::new(Arc::new(engagement))
            .hydrate(Uuid::new_v4(), vec![post.clone()])
            .await;

        assert_eq!(hydrated.len(), 1);
        assert_eq!(hydrated[0].id, post.id);
        assert!(!hydrated[0].is_liked);
        assert!(hydrated[0].comments.is_empty());
    }
}
