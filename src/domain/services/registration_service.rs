use std::sync::Arc;
use chrono::Utc;
use tracing::{info, instrument};
use crate::domain::{
    models::{
        attendee::{Attendee, AttendeeStatus, Identity},
        event::Event,
        notification::NotificationKind,
    },
    ports::AttendeeRepository,
    services::{
        attendance::{apply, Trigger},
        dispatch::Dispatcher,
        qr_issuer::{IssueMode, QrIssuer},
    },
};
use crate::error::AppError;

/// Creates attendee records: guests answering the invitation and admins
/// registering someone directly.
pub struct RegistrationService {
    repo: Arc<dyn AttendeeRepository>,
    issuer: Arc<QrIssuer>,
    dispatcher: Arc<Dispatcher>,
}

impl RegistrationService {
    pub fn new(repo: Arc<dyn AttendeeRepository>, issuer: Arc<QrIssuer>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { repo, issuer, dispatcher }
    }

    /// RSVP. Not retried on transient errors: a second attempt could mint a
    /// second code for the same person.
    #[instrument(skip(self, event, identity, name_hint), fields(event_id = %event.id))]
    pub async fn confirm_attendance(&self, event: &Event, identity: Identity, name_hint: &str, companions: i32) -> Result<Attendee, AppError> {
        let now = Utc::now();
        let trigger = Trigger::ConfirmRsvp { companions };

        let confirmed = match self.repo.find_by_identity(&event.id, &identity).await? {
            None => {
                let confirmed = apply(&Attendee::pending(event.id.clone(), identity, now), &trigger, now)?;
                self.issuer.issue(&confirmed, IssueMode::NewRecord, &event.slug, name_hint).await?
            }
            Some(existing) if existing.status == AttendeeStatus::Pending => {
                let confirmed = apply(&existing, &trigger, now)?;
                self.issuer.issue(&confirmed, IssueMode::Promote, &event.slug, name_hint).await?
            }
            Some(existing) => {
                return Err(AppError::InvalidState(format!(
                    "Attendance was already answered (attendee is {})",
                    existing.status
                )));
            }
        };

        info!(attendee_id = %confirmed.id, "Attendance confirmed");
        self.dispatcher.committed(&confirmed, NotificationKind::AttendanceConfirmed);
        Ok(confirmed)
    }

    #[instrument(skip(self, event, identity, name_hint), fields(event_id = %event.id))]
    pub async fn register(&self, event: &Event, identity: Identity, name_hint: &str, status: AttendeeStatus, companions: i32) -> Result<Attendee, AppError> {
        if companions < 0 {
            return Err(AppError::Validation("companions_count must not be negative".into()));
        }
        let now = Utc::now();

        let attendee = match status {
            AttendeeStatus::Pending => {
                let pending = Attendee { companions_count: companions, ..Attendee::pending(event.id.clone(), identity, now) };
                self.repo.insert(&pending).await?
            }
            AttendeeStatus::Confirmed => {
                let confirmed = apply(&Attendee::pending(event.id.clone(), identity, now), &Trigger::ConfirmRsvp { companions }, now)?;
                self.issuer.issue(&confirmed, IssueMode::NewRecord, &event.slug, name_hint).await?
            }
            AttendeeStatus::Present => {
                self.repo.insert(&Attendee::manual_present(event.id.clone(), identity, companions, now)).await?
            }
            AttendeeStatus::Absent => {
                return Err(AppError::Validation("Attendees cannot be registered as absent".into()));
            }
        };

        info!(attendee_id = %attendee.id, status = %attendee.status, "Attendee registered");
        match attendee.status {
            AttendeeStatus::Pending => self.dispatcher.changed(&attendee),
            AttendeeStatus::Present => self.dispatcher.committed(&attendee, NotificationKind::CheckedIn),
            _ => self.dispatcher.committed(&attendee, NotificationKind::AttendanceConfirmed),
        }
        Ok(attendee)
    }
}
