use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::PostViewRepository;
use crate::metrics;

/// Writes PostView rows for the posts a viewer was shown.
///
/// Only the first `limit` posts are recorded. Recording is best effort: a
/// failed write is logged and reported as zero inserted rows.
#[derive(Clone)]
pub struct ViewRecorder {
    views: Arc<dyn PostViewRepository>,
    limit: usize,
}

impl ViewRecorder {
    pub fn new(views: Arc<dyn PostViewRepository>, limit: usize) -> Self {
        Self { views, limit }
    }

    pub async fn record(&self, viewer_id: Uuid, shown: &[Uuid], now: DateTime<Utc>) -> u64 {
        let batch = &shown[..shown.len().min(self.limit)];
        if batch.is_empty() {
            return 0;
        }

        match self.views.record_views(viewer_id, batch, now).await {
            Ok(inserted) => {
                metrics::record_views(inserted);
                debug!(
                    "Recorded post views: viewer_id={}, shown={}, inserted={}",
                    viewer_id,
                    batch.len(),
                    inserted
                );
                inserted
            }
            Err(e) => {
                warn!("Failed to record post views for viewer {}: {}", viewer_id, e);
                0
            }
        }
    }
}
