pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod services;

use actix_web::web;

pub use config::Config;
pub use error::{AppError, Result};

pub use services::{FeedEngine, FeedHydrator, GeneratedFeed};

/// Mounts the feed API under `/api/v1/posts`.
pub fn configure_feed_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/posts")
            .wrap(middleware::GatewayAuthMiddleware)
            .service(handlers::get_news_feed),
    );
}
