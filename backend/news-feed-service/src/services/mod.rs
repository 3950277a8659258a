//! Service layer for news-feed-service
//!
//! - candidates: the five candidate pools and their collector
//! - scoring: relevance score per post and viewer
//! - diversity: tiered random sampling of scored candidates
//! - pin_promoter / view_recorder: feed post-processing and the PostView ledger
//! - feed_engine: the generation pipeline
//! - hydrator: response representation of a feed page

pub mod candidates;
pub mod diversity;
pub mod feed_engine;
pub mod hydrator;
pub mod pin_promoter;
pub mod scoring;
pub mod view_recorder;

pub use candidates::{CandidateCollector, CandidatePool, CollectionStats, PoolSource};
pub use diversity::DiversitySampler;
pub use feed_engine::{FeedEngine, FeedStats, GeneratedFeed};
pub use hydrator::FeedHydrator;
pub use scoring::RelevanceScorer;
pub use view_recorder::ViewRecorder;
