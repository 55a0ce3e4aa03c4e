use std::sync::Arc;
use tracing::debug;
use crate::domain::{models::stats::AttendanceStats, ports::AttendeeRepository};
use crate::error::AppError;

pub struct StatsAggregator {
    repo: Arc<dyn AttendeeRepository>,
}

impl StatsAggregator {
    pub fn new(repo: Arc<dyn AttendeeRepository>) -> Self {
        Self { repo }
    }

    /// Recomputed from the live rows on every call; nothing is cached.
    pub async fn compute(&self, event_id: &str) -> Result<AttendanceStats, AppError> {
        let attendees = self.repo.list_by_event(event_id).await?;
        let stats = AttendanceStats::tally(&attendees);
        debug!(event_id, total = stats.total, present = stats.present, "Attendance stats computed");
        Ok(stats)
    }
}
