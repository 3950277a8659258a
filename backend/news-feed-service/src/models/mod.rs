use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;
use uuid::Uuid;

/// Post lifecycle status. Only `Approved` posts ever reach a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Text,
    Media,
    Link,
}

impl PostType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "media" => Some(Self::Media),
            "link" => Some(Self::Link),
            _ => None,
        }
    }
}

/// A post as read from the post store, with its aggregated engagement counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub community_id: Option<Uuid>,
    pub title: String,
    pub post_type: PostType,
    pub content: Option<String>,
    pub media_file: Vec<String>,
    pub link: Option<String>,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
}

impl PostRecord {
    /// Weighted engagement: likes x1, comments x2, shares x3
    pub fn engagement(&self) -> i64 {
        self.likes_count + self.comments_count * 2 + self.shares_count * 3
    }
}

/// Community-level data used to rank discovery communities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityRecord {
    pub id: Uuid,
    pub is_public: bool,
    pub members_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything the engine knows about the viewer for one request.
#[derive(Debug, Clone, Default)]
pub struct ViewerContext {
    pub viewer_id: Uuid,
    pub following: HashSet<Uuid>,
    pub joined_communities: HashSet<Uuid>,
    /// author_id -> ids of that author's posts the viewer liked
    pub liked_posts_by_author: HashMap<Uuid, HashSet<Uuid>>,
}

impl ViewerContext {
    pub fn new(viewer_id: Uuid) -> Self {
        Self {
            viewer_id,
            ..Default::default()
        }
    }

    pub fn follows(&self, author_id: Uuid) -> bool {
        self.following.contains(&author_id)
    }

    pub fn has_joined(&self, community_id: Option<Uuid>) -> bool {
        community_id
            .map(|id| self.joined_communities.contains(&id))
            .unwrap_or(false)
    }

    /// True when the viewer liked some post by `author_id` other than `post_id`.
    pub fn liked_other_post_by(&self, author_id: Uuid, post_id: Uuid) -> bool {
        self.liked_posts_by_author
            .get(&author_id)
            .map(|posts| posts.iter().any(|liked| *liked != post_id))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPost {
    pub post: PostRecord,
    pub score: f64,
}

/// Comment representation with replies nested under their parent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedComment {
    pub id: Uuid,
    pub user: Uuid,
    pub user_name: String,
    pub avatar: Option<String>,
    pub post: Uuid,
    pub parent: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[schema(no_recursion)]
    pub replies: Vec<FeedComment>,
    pub replies_count: usize,
    pub can_edit: bool,
    pub can_delete: bool,
}

/// Post representation returned by the news feed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedPost {
    pub id: Uuid,
    pub user: Uuid,
    pub user_name: String,
    pub avatar: Option<String>,
    pub title: String,
    pub post_type: PostType,
    pub content: Option<String>,
    pub media_file: Vec<String>,
    pub link: Option<String>,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub community: Option<Uuid>,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
    pub comments: Vec<FeedComment>,
    pub can_edit: bool,
    pub can_delete: bool,
    pub is_liked: bool,
}

/// `{success, message, data}` body of a feed page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedResults {
    pub success: bool,
    pub message: String,
    pub data: Vec<FeedPost>,
}

/// Page-number paginated feed response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedFeedResponse {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: FeedResults,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Approved text post with no engagement
    pub fn post(
        author_id: Uuid,
        community_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> PostRecord {
        PostRecord {
            id: Uuid::new_v4(),
            author_id,
            author_username: "author".to_string(),
            author_avatar: None,
            community_id,
            title: "post".to_string(),
            post_type: PostType::Text,
            content: Some("body".to_string()),
            media_file: vec![],
            link: None,
            tags: vec![],
            status: PostStatus::Approved,
            is_pinned: false,
            created_at,
            updated_at: created_at,
            likes_count: 0,
            comments_count: 0,
            shares_count: 0,
        }
    }
}
