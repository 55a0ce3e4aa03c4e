use axum::{extract::{State, Path}, response::IntoResponse, Json, http::StatusCode};
use crate::state::AppState;
use crate::api::extractors::{auth::AuthUser, json::ValidJson, maybe_auth::MaybeAuthUser};
use crate::api::dtos::{
    requests::{CheckInRequest, ConfirmAttendanceRequest, ManualCheckInRequest, RegisterAttendeeRequest},
    responses::{AttendeeView, CheckInResponse, ConfirmAttendanceResponse},
};
use crate::api::handlers::event::load_event;
use crate::domain::models::{
    attendee::{GuestContact, Identity},
    user::Role,
};
use crate::domain::services::checkin_service::{CheckInMetadata, ManualAction};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn confirm_attendance(
    State(state): State<Arc<AppState>>,
    MaybeAuthUser(session): MaybeAuthUser,
    Path(event_id): Path<String>,
    ValidJson(payload): ValidJson<ConfirmAttendanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let event = load_event(&state, &event_id).await?;

    let identity = Identity::resolve(session.as_ref(), payload.guest_contact())?;
    let name_hint = name_hint(&state, &identity).await?;

    let attendee = state.registration
        .confirm_attendance(&event, identity, &name_hint, payload.companions_count)
        .await?;

    Ok((StatusCode::CREATED, Json(ConfirmAttendanceResponse {
        attendee_id: attendee.id,
        qr_code: attendee.qr_code,
        status: attendee.status,
    })))
}

pub async fn check_in(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(event_id): Path<String>,
    ValidJson(payload): ValidJson<CheckInRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Staff)?;

    let metadata = CheckInMetadata { scanner_id: payload.scanner_id, device: payload.device };
    let outcome = state.checkin.check_in_by_code(&event_id, &payload.qr_code, &metadata).await?;

    Ok(Json(CheckInResponse {
        attendee: outcome.attendee.into(),
        already_checked_in: outcome.already_checked_in,
    }))
}

pub async fn manual_check_in(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(event_id): Path<String>,
    ValidJson(payload): ValidJson<ManualCheckInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let admin = user.require(Role::Admin)?;

    let action: ManualAction = payload.action.parse()
        .map_err(|_| AppError::Validation(format!(
            "Unknown action '{}', expected checkin, undo_checkin or mark_absent",
            payload.action
        )))?;

    let attendee = state.checkin.check_in_manually(&event_id, &payload.attendee_id, action).await?;
    info!(admin_id = %admin.id, attendee_id = %attendee.id, %action, "Manual attendance change");

    Ok(Json(AttendeeView::from(attendee)))
}

pub async fn register_attendee(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(event_id): Path<String>,
    ValidJson(payload): ValidJson<RegisterAttendeeRequest>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Admin)?;
    let event = load_event(&state, &event_id).await?;

    let identity = match payload.user_id {
        Some(user_id) => {
            state.user_repo.find_by_id(&user_id).await?
                .ok_or(AppError::NotFound("User not found".into()))?;
            Identity::User { user_id }
        }
        None => Identity::guest(GuestContact {
            name: payload.guest_name,
            email: payload.guest_email,
            whatsapp: payload.guest_whatsapp,
        })?,
    };
    let name_hint = name_hint(&state, &identity).await?;

    let attendee = state.registration
        .register(&event, identity, &name_hint, payload.status, payload.companions_count)
        .await?;

    Ok((StatusCode::CREATED, Json(AttendeeView::from(attendee))))
}

pub async fn list_attendees(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Role::Staff)?;
    let event = load_event(&state, &event_id).await?;

    let attendees: Vec<AttendeeView> = state.attendee_repo.list_by_event(&event.id).await?
        .into_iter()
        .map(AttendeeView::from)
        .collect();

    Ok(Json(attendees))
}

/// Guests are named by their RSVP name, account holders by their username.
async fn name_hint(state: &AppState, identity: &Identity) -> Result<String, AppError> {
    match identity {
        Identity::Guest { name, .. } => Ok(name.clone()),
        Identity::User { user_id } => {
            let user = state.user_repo.find_by_id(user_id).await?
                .ok_or(AppError::Unauthorized)?;
            Ok(user.username)
        }
    }
}
