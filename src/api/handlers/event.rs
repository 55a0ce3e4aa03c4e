use axum::{extract::{State, Path}, response::IntoResponse, Json, http::StatusCode};
use crate::state::AppState;
use crate::api::extractors::{auth::AuthUser, json::ValidJson};
use crate::api::dtos::requests::CreateEventRequest;
use crate::domain::models::{event::Event, user::Role};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidJson(payload): ValidJson<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Admin)?;

    let slug = payload.slug.trim().to_lowercase();
    if slug.is_empty() || !slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(AppError::Validation("slug must be non-empty and contain only letters, digits and dashes".into()));
    }
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::Validation("title is required".into()));
    }

    let event = Event::new(slug, title, payload.location, payload.starts_at);
    let created = state.event_repo.create(&event).await?;

    info!("Created event: {} ({})", created.slug, created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Staff)?;
    let events = state.event_repo.list().await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Admin)?;
    state.event_repo.delete(&event_id).await?;
    info!("Deleted event (attendees cascaded): {}", event_id);
    Ok(Json(serde_json::json!({"status": "deleted"})))
}

/// Shared lookup for the attendance routes.
pub(crate) async fn load_event(state: &AppState, event_id: &str) -> Result<Event, AppError> {
    state.event_repo.find_by_id(event_id).await?
        .ok_or(AppError::NotFound("Event not found".into()))
}
