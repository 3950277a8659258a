use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Tuning knobs for feed generation. Defaults are the production values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Maximum number of posts the sampler returns per request
    pub target_size: usize,
    /// Hours over which the linear time decay runs down to its floor
    pub time_decay_window_hours: f64,
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// How many posts of the shown page get a PostView row
    pub view_record_limit: usize,
    /// Hard age limit applied to every candidate pool
    pub candidate_max_age_days: i64,
    pub discovery_window_days: i64,
    pub discovery_community_limit: i64,
    pub discovery_community_min_engagement: i64,
    pub discovery_author_min_engagement: i64,
    pub fresh_window_hours: i64,
    /// Posts shown within this window are left out of the fresh pool
    pub recently_viewed_hours: i64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            target_size: 50,
            time_decay_window_hours: 24.0,
            default_page_size: 10,
            max_page_size: 100,
            view_record_limit: 20,
            candidate_max_age_days: 30,
            discovery_window_days: 7,
            discovery_community_limit: 50,
            discovery_community_min_engagement: 5,
            discovery_author_min_engagement: 10,
            fresh_window_hours: 24,
            recently_viewed_hours: 12,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let defaults = FeedConfig::default();

        let feed = FeedConfig {
            target_size: env_or("FEED_TARGET_SIZE", defaults.target_size)?,
            time_decay_window_hours: env_or(
                "FEED_TIME_DECAY_WINDOW_HOURS",
                defaults.time_decay_window_hours,
            )?,
            default_page_size: env_or("FEED_DEFAULT_PAGE_SIZE", defaults.default_page_size)?,
            max_page_size: env_or("FEED_MAX_PAGE_SIZE", defaults.max_page_size)?,
            view_record_limit: env_or("FEED_VIEW_RECORD_LIMIT", defaults.view_record_limit)?,
            discovery_community_limit: env_or(
                "FEED_DISCOVERY_COMMUNITY_LIMIT",
                defaults.discovery_community_limit,
            )?,
            ..defaults
        };

        if feed.time_decay_window_hours <= 0.0 {
            return Err(AppError::Config(
                "FEED_TIME_DECAY_WINDOW_HOURS must be positive".to_string(),
            ));
        }
        if feed.default_page_size == 0 || feed.max_page_size < feed.default_page_size {
            return Err(AppError::Config(
                "FEED_DEFAULT_PAGE_SIZE must be in 1..=FEED_MAX_PAGE_SIZE".to_string(),
            ));
        }

        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: env_or("APP_PORT", 8000)?,
                log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .map_err(|_| AppError::Config("DATABASE_URL must be set".to_string()))?,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            feed,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}
