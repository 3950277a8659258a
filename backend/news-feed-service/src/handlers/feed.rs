use actix_web::{get, web, HttpRequest, HttpResponse};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use utoipa::IntoParams;
use uuid::Uuid;

use super::pagination::{page_links, paginate, PageRequest};
use crate::config::FeedConfig;
use crate::db::Repositories;
use crate::error::{ErrorResponse, Result};
use crate::metrics;
use crate::middleware::UserId;
use crate::models::{FeedResults, PaginatedFeedResponse};
use crate::services::{FeedEngine, FeedHydrator};

pub const NEWS_FEED_MESSAGE: &str = "News feed retrieved successfully";

/// Both parameters are kept raw so that malformed values reach the
/// pagination rules instead of failing query extraction.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedQueryParams {
    /// 1-based page number, or `last`
    pub page: Option<String>,
    /// Posts per page (default 10, max 100)
    pub page_size: Option<String>,
}

pub struct FeedHandlerState {
    pub engine: Arc<FeedEngine>,
    pub hydrator: FeedHydrator,
    pub config: FeedConfig,
}

impl FeedHandlerState {
    pub fn new(repos: Repositories, config: FeedConfig) -> Self {
        Self {
            engine: Arc::new(FeedEngine::new(repos.clone(), &config)),
            hydrator: FeedHydrator::new(repos.engagement),
            config,
        }
    }
}

/// Personalized news feed for the calling user
#[utoipa::path(
    get,
    path = "/api/v1/posts/news_feed",
    tag = "Feed",
    params(
        FeedQueryParams,
        ("X-User-Id" = Uuid, Header, description = "Authenticated user id set by the gateway")
    ),
    responses(
        (status = 200, description = "Feed page", body = PaginatedFeedResponse),
        (status = 401, description = "Missing or invalid user id", body = ErrorResponse),
        (status = 404, description = "Invalid page", body = ErrorResponse)
    )
)]
#[get("/news_feed")]
pub async fn get_news_feed(
    query: web::Query<FeedQueryParams>,
    user: UserId,
    http_req: HttpRequest,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    let result = build_news_feed(&query, user.0, &http_req, &state).await;
    metrics::record_feed_request(if result.is_ok() { "success" } else { "error" });

    Ok(HttpResponse::Ok().json(result?))
}

async fn build_news_feed(
    query: &FeedQueryParams,
    viewer_id: Uuid,
    http_req: &HttpRequest,
    state: &FeedHandlerState,
) -> Result<PaginatedFeedResponse> {
    let page_request = PageRequest::parse(
        query.page.as_deref(),
        query.page_size.as_deref(),
        state.config.default_page_size,
        state.config.max_page_size,
    )?;

    let now = Utc::now();
    let mut rng = StdRng::from_entropy();
    let feed = state.engine.generate(viewer_id, now, &mut rng).await;

    let records: Vec<_> = feed.posts.into_iter().map(|scored| scored.post).collect();
    let page = paginate(records, &page_request)?;
    let (next, previous) = page_links(http_req, &page);

    debug!(
        "News feed page: viewer_id={}, page={}/{}, size={}, total={}",
        viewer_id,
        page.number,
        page.num_pages,
        page.items.len(),
        page.count
    );

    let shown: Vec<Uuid> = page.items.iter().map(|p| p.id).collect();
    let data = state.hydrator.hydrate(viewer_id, page.items).await;
    state.engine.record_views(viewer_id, &shown, now).await;

    Ok(PaginatedFeedResponse {
        count: page.count,
        next,
        previous,
        results: FeedResults {
            success: true,
            message: NEWS_FEED_MESSAGE.to_string(),
            data,
        },
    })
}
