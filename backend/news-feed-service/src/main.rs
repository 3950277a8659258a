use actix_web::{dev::Service, web, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use news_feed_service::config::Config;
use news_feed_service::db::Repositories;
use news_feed_service::handlers::FeedHandlerState;
use news_feed_service::{configure_feed_routes, metrics, openapi};

async fn openapi_json(
    doc: web::Data<utoipa::openapi::OpenApi>,
) -> actix_web::Result<actix_web::HttpResponse> {
    let body = serde_json::to_string(&*doc).map_err(|e| {
        tracing::error!("OpenAPI serialization failed: {}", e);
        actix_web::error::ErrorInternalServerError("OpenAPI serialization error")
    })?;

    Ok(actix_web::HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},actix_web=info", config.app.log_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    tracing::info!("Starting news-feed-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database.url)
        .await
        .context("Failed to create database pool")?;

    let feed_handler_state = web::Data::new(FeedHandlerState::new(
        Repositories::postgres(db_pool),
        config.feed.clone(),
    ));
    tracing::info!(
        "Feed engine ready: target_size={}, decay_window_hours={}",
        config.feed.target_size,
        config.feed.time_decay_window_hours
    );

    let openapi_doc = web::Data::new(openapi::doc());
    let port = config.app.port;

    HttpServer::new(move || {
        App::new()
            .app_data(openapi_doc.clone())
            .app_data(feed_handler_state.clone())
            .route("/api/v1/openapi.json", web::get().to(openapi_json))
            .route("/health", web::get().to(|| async { "OK" }))
            // Health endpoints for K8s liveness and readiness
            .route("/api/v1/health/live", web::get().to(|| async { "OK" }))
            .route("/api/v1/health/ready", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let path = req
                    .match_pattern()
                    .unwrap_or_else(|| req.path().to_string());
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    match fut.await {
                        Ok(res) => {
                            metrics::observe_http_request(
                                &method,
                                &path,
                                res.status().as_u16(),
                                start.elapsed(),
                            );
                            Ok(res)
                        }
                        Err(err) => {
                            metrics::observe_http_request(
                                &method,
                                &path,
                                err.as_response_error().status_code().as_u16(),
                                start.elapsed(),
                            );
                            Err(err)
                        }
                    }
                }
            })
            .configure(configure_feed_routes)
    })
    .bind(format!("0.0.0.0:{}", port))
    .with_context(|| format!("Failed to bind on 0.0.0.0:{}", port))?
    .run()
    .await
    .context("HTTP server error")?;

    Ok(())
}
