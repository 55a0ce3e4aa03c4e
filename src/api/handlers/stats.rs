use axum::{
    extract::{State, Path},
    response::{sse::{Event as SseEvent, KeepAlive, Sse}, IntoResponse},
    Json,
};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::api::handlers::event::load_event;
use crate::domain::models::user::Role;
use crate::domain::services::feed::AttendanceChanged;
use crate::error::AppError;
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, warn};

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Staff)?;
    let event = load_event(&state, &event_id).await?;
    let stats = state.stats.compute(&event.id).await?;
    Ok(Json(stats))
}

/// Server-sent `stats` events: one snapshot on connect, then a fresh one after
/// every committed change for this event.
pub async fn stream_stats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(event_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, AppError> {
    user.require(Role::Staff)?;
    let event = load_event(&state, &event_id).await?;

    // Subscribe before the first snapshot so no change slips between the two.
    let rx = state.feed.subscribe();
    debug!(event_id = %event.id, "Stats stream opened");

    let stream = stream::unfold(
        StreamState { state, event_id: event.id, rx, primed: false },
        |mut s| async move {
            if s.primed && !s.wait_for_change().await {
                debug!(event_id = %s.event_id, "Attendance feed closed, ending stats stream");
                return None;
            }
            s.primed = true;

            let event = s.snapshot().await;
            Some((Ok::<_, Infallible>(event), s))
        },
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

struct StreamState {
    state: Arc<AppState>,
    event_id: String,
    rx: broadcast::Receiver<AttendanceChanged>,
    primed: bool,
}

impl StreamState {
    /// Blocks until a change touches this event. Returns false once the feed is gone.
    async fn wait_for_change(&mut self) -> bool {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.event_id == self.event_id => return true,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    // Missed signals may have been ours; recomputing is always safe.
                    warn!(skipped, "Stats stream lagged behind the attendance feed");
                    return true;
                }
                Err(RecvError::Closed) => return false,
            }
        }
    }

    async fn snapshot(&self) -> SseEvent {
        match self.state.stats.compute(&self.event_id).await {
            Ok(stats) => SseEvent::default()
                .event("stats")
                .json_data(&stats)
                .unwrap_or_else(|e| SseEvent::default().event("error").data(e.to_string())),
            Err(e) => {
                error!(event_id = %self.event_id, "Stats recompute failed: {}", e);
                SseEvent::default().event("error").data("stats temporarily unavailable")
            }
        }
    }
}
