use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers::feed;
use crate::models::{
    FeedComment, FeedPost, FeedResults, PaginatedFeedResponse, PostStatus, PostType,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "News Feed Service API",
        version = "1.0.0",
        description = "Personalized news feed for the social platform."
    ),
    paths(feed::get_news_feed),
    components(schemas(
        PaginatedFeedResponse,
        FeedResults,
        FeedPost,
        FeedComment,
        PostStatus,
        PostType,
        ErrorResponse
    )),
    tags((name = "Feed", description = "News feed endpoints"))
)]
pub struct ApiDoc;

pub fn doc() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
