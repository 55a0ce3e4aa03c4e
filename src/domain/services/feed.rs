use tokio::sync::broadcast;
use tracing::trace;
use crate::domain::models::attendee::AttendeeStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceChanged {
    pub event_id: String,
    pub attendee_id: String,
    pub status: AttendeeStatus,
}

/// In-process fan-out of committed attendance changes. Subscribers treat a
/// signal as "stats for this event are stale" and recompute from the store.
#[derive(Clone)]
pub struct AttendanceFeed {
    tx: broadcast::Sender<AttendanceChanged>,
}

impl AttendanceFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, change: AttendanceChanged) {
        // no live subscribers is the normal case outside of open dashboards
        if self.tx.send(change).is_err() {
            trace!("No attendance feed subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AttendanceChanged> {
        self.tx.subscribe()
    }
}

impl Default for AttendanceFeed {
    fn default() -> Self {
        Self::new(256)
    }
}
