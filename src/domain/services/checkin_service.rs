use std::future::Future;
use std::sync::Arc;
use chrono::Utc;
use serde::Deserialize;
use strum::{AsRefStr, Display, EnumString};
use tracing::{info, info_span, warn, Instrument};
use crate::domain::{
    models::{
        attendee::{Attendee, AttendeeStatus},
        notification::NotificationKind,
    },
    ports::AttendeeRepository,
    services::{
        attendance::{apply, Trigger},
        dispatch::Dispatcher,
        qr_issuer::QrIssuer,
    },
};
use crate::error::AppError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckInMetadata {
    pub scanner_id: Option<String>,
    pub device: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckInOutcome {
    pub attendee: Attendee,
    /// The code had already been used; `attendee.checked_in_at` is the original arrival.
    pub already_checked_in: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ManualAction {
    Checkin,
    UndoCheckin,
    MarkAbsent,
}

impl ManualAction {
    fn trigger(self) -> Trigger {
        match self {
            ManualAction::Checkin => Trigger::ManualCheckIn,
            ManualAction::UndoCheckin => Trigger::UndoCheckIn,
            ManualAction::MarkAbsent => Trigger::MarkAbsent,
        }
    }

    fn notification(self) -> NotificationKind {
        match self {
            ManualAction::Checkin => NotificationKind::CheckedIn,
            ManualAction::UndoCheckin => NotificationKind::CheckInReverted,
            ManualAction::MarkAbsent => NotificationKind::MarkedAbsent,
        }
    }
}

/// Resolves scanner and admin check-in requests to one attendee and commits
/// the transition through the store's conditional update.
pub struct CheckInService {
    repo: Arc<dyn AttendeeRepository>,
    dispatcher: Arc<Dispatcher>,
}

impl CheckInService {
    pub fn new(repo: Arc<dyn AttendeeRepository>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { repo, dispatcher }
    }

    pub async fn check_in_by_code(&self, event_id: &str, raw_code: &str, metadata: &CheckInMetadata) -> Result<CheckInOutcome, AppError> {
        let code = QrIssuer::normalize(raw_code)?;

        let span = info_span!(
            "check_in_by_code",
            event_id = %event_id,
            scanner_id = metadata.scanner_id.as_deref().unwrap_or("-"),
            device = metadata.device.as_deref().unwrap_or("-"),
        );

        async {
            let outcome = retry_transient_once("check_in_by_code", || self.scan_once(event_id, &code)).await?;

            if outcome.already_checked_in {
                info!(attendee_id = %outcome.attendee.id, "Repeat scan, attendee already checked in");
            } else {
                info!(attendee_id = %outcome.attendee.id, "Attendee checked in by scan");
                self.dispatcher.committed(&outcome.attendee, NotificationKind::CheckedIn);
            }

            Ok(outcome)
        }
            .instrument(span)
            .await
    }

    pub async fn check_in_manually(&self, event_id: &str, attendee_id: &str, action: ManualAction) -> Result<Attendee, AppError> {
        let span = info_span!("check_in_manually", event_id = %event_id, attendee_id = %attendee_id, action = %action);

        async {
            let attendee = retry_transient_once("check_in_manually", || self.manual_once(event_id, attendee_id, action)).await?;
            info!(status = %attendee.status, "Manual attendance action applied");
            self.dispatcher.committed(&attendee, action.notification());
            Ok(attendee)
        }
            .instrument(span)
            .await
    }

    async fn scan_once(&self, event_id: &str, code: &str) -> Result<CheckInOutcome, AppError> {
        let attendee = self.repo.find_by_qr_code(code).await?
            .filter(|a| a.event_id == event_id)
            .ok_or(AppError::NotFound("No attendee holds this QR code for this event".into()))?;

        if attendee.status == AttendeeStatus::Present {
            return Ok(CheckInOutcome { attendee, already_checked_in: true });
        }

        let trigger = Trigger::Scan { code: code.to_string() };
        let updated = apply(&attendee, &trigger, Utc::now())?;

        if let Some(stored) = self.repo.compare_and_swap(&updated, attendee.status).await? {
            return Ok(CheckInOutcome { attendee: stored, already_checked_in: false });
        }

        // Lost the race: report whatever the winner left behind.
        let current = self.reload(&attendee.id).await?;
        if current.status == AttendeeStatus::Present {
            return Ok(CheckInOutcome { attendee: current, already_checked_in: true });
        }
        apply(&current, &trigger, Utc::now())?;
        Err(AppError::Conflict("Attendee changed while checking in, please scan again".into()))
    }

    async fn manual_once(&self, event_id: &str, attendee_id: &str, action: ManualAction) -> Result<Attendee, AppError> {
        let attendee = self.repo.find_by_id(attendee_id).await?
            .filter(|a| a.event_id == event_id)
            .ok_or(AppError::NotFound("Attendee not found".into()))?;

        let trigger = action.trigger();
        let updated = apply(&attendee, &trigger, Utc::now())?;

        if let Some(stored) = self.repo.compare_and_swap(&updated, attendee.status).await? {
            return Ok(stored);
        }

        let current = self.reload(&attendee.id).await?;
        apply(&current, &trigger, Utc::now())?;
        Err(AppError::Conflict("Attendee changed concurrently, please retry".into()))
    }

    async fn reload(&self, attendee_id: &str) -> Result<Attendee, AppError> {
        self.repo.find_by_id(attendee_id).await?
            .ok_or(AppError::NotFound("Attendee not found".into()))
    }
}

/// Read-then-CAS sequences are safe to repeat, so a single transient store
/// failure gets one more attempt. Everything else propagates untouched.
async fn retry_transient_once<T, F, Fut>(operation: &str, mut attempt: F) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    match attempt().await {
        Err(e) if e.is_transient() => {
            warn!("{}: transient store error, retrying once: {}", operation, e);
            attempt().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_action_parsing() {
        assert_eq!("checkin".parse::<ManualAction>().unwrap(), ManualAction::Checkin);
        assert_eq!("undo_checkin".parse::<ManualAction>().unwrap(), ManualAction::UndoCheckin);
        assert_eq!("mark_absent".parse::<ManualAction>().unwrap(), ManualAction::MarkAbsent);
        assert!("delete".parse::<ManualAction>().is_err());
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_exactly_once() {
        let mut calls = 0;
        let result: Result<(), AppError> = retry_transient_once("test", || {
            calls += 1;
            async { Err(AppError::Database(sqlx::Error::PoolTimedOut)) }
        }).await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_domain_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<(), AppError> = retry_transient_once("test", || {
            calls += 1;
            async { Err(AppError::ProtectedState("no".into())) }
        }).await;

        assert!(matches!(result, Err(AppError::ProtectedState(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_recovers_after_one_transient_failure() {
        let mut calls = 0;
        let result = retry_transient_once("test", || {
            calls += 1;
            let fail = calls == 1;
            async move {
                if fail { Err(AppError::Database(sqlx::Error::PoolTimedOut)) } else { Ok(42) }
            }
        }).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 2);
    }
}
