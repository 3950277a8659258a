pub mod feed;
pub mod pagination;

pub use feed::{get_news_feed, FeedHandlerState, FeedQueryParams, NEWS_FEED_MESSAGE};
pub use pagination::{paginate, Page, PageNumber, PageRequest};
