//! Attendance state machine.
//!
//! ```text
//! pending ──ConfirmRsvp──▶ confirmed ──Scan / ManualCheckIn──▶ present
//!    │                        ▲  │                               │
//!    │                        │  └──────MarkAbsent──▶ absent     │
//!    └──────MarkAbsent────────┼─────────────────────▶ absent     │
//!                             └──────UndoCheckIn (manual only)───┘
//! ```
//!
//! `apply` is pure: the caller supplies `now` and commits the result through
//! the store's conditional update.

use chrono::{DateTime, Utc};
use crate::domain::models::attendee::{Attendee, AttendeeStatus, CheckInOrigin};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    ConfirmRsvp { companions: i32 },
    Scan { code: String },
    ManualCheckIn,
    UndoCheckIn,
    MarkAbsent,
}

impl Trigger {
    fn describe(&self) -> &'static str {
        match self {
            Trigger::ConfirmRsvp { .. } => "confirm",
            Trigger::Scan { .. } => "scan in",
            Trigger::ManualCheckIn => "check in",
            Trigger::UndoCheckIn => "undo the check-in of",
            Trigger::MarkAbsent => "mark absent",
        }
    }
}

pub fn apply(attendee: &Attendee, trigger: &Trigger, now: DateTime<Utc>) -> Result<Attendee, AppError> {
    let mut next = attendee.clone();

    match (attendee.status, trigger) {
        (AttendeeStatus::Pending, Trigger::ConfirmRsvp { companions }) => {
            if *companions < 0 {
                return Err(AppError::Validation("companions_count must not be negative".into()));
            }
            next.status = AttendeeStatus::Confirmed;
            next.companions_count = *companions;
            next.confirmed_at = Some(now);
        }
        (AttendeeStatus::Confirmed, Trigger::Scan { code }) => {
            if attendee.qr_code.as_deref() != Some(code.as_str()) {
                return Err(AppError::NotFound("QR code does not belong to this attendee".into()));
            }
            mark_present(&mut next, CheckInOrigin::Scanner, now);
        }
        (AttendeeStatus::Confirmed, Trigger::ManualCheckIn) => {
            mark_present(&mut next, CheckInOrigin::Manual, now);
        }
        (AttendeeStatus::Present, Trigger::UndoCheckIn) => {
            if attendee.is_scanner_protected() {
                return Err(AppError::ProtectedState(
                    "This guest was checked in with their QR code; the check-in cannot be undone manually".into(),
                ));
            }
            next.status = AttendeeStatus::Confirmed;
            next.check_in_origin = CheckInOrigin::None;
            next.checked_in_at = None;
        }
        (AttendeeStatus::Pending | AttendeeStatus::Confirmed, Trigger::MarkAbsent) => {
            next.status = AttendeeStatus::Absent;
        }
        (status, trigger) => {
            return Err(AppError::InvalidState(format!(
                "Cannot {} an attendee who is {}",
                trigger.describe(),
                status
            )));
        }
    }

    Ok(next)
}

fn mark_present(next: &mut Attendee, origin: CheckInOrigin, now: DateTime<Utc>) {
    // confirmed_at <= checked_in_at must hold even under clock skew between instances
    let confirmed_at = *next.confirmed_at.get_or_insert(now);
    next.status = AttendeeStatus::Present;
    next.check_in_origin = origin;
    next.checked_in_at = Some(now.max(confirmed_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::attendee::Identity;
    use chrono::Duration;

    fn pending() -> Attendee {
        Attendee::pending(
            "event-1".into(),
            Identity::Guest { name: "Ana".into(), email: "ana@example.com".into(), whatsapp: None },
            Utc::now(),
        )
    }

    fn confirmed_with_code(code: &str) -> Attendee {
        let mut a = apply(&pending(), &Trigger::ConfirmRsvp { companions: 1 }, Utc::now()).unwrap();
        a.qr_code = Some(code.into());
        a
    }

    #[test]
    fn test_confirm_sets_companions_and_timestamp() {
        let now = Utc::now();
        let next = apply(&pending(), &Trigger::ConfirmRsvp { companions: 2 }, now).unwrap();

        assert_eq!(next.status, AttendeeStatus::Confirmed);
        assert_eq!(next.companions_count, 2);
        assert_eq!(next.confirmed_at, Some(now));
        assert!(next.qr_code.is_none(), "the issuer binds the code, not the state machine");
    }

    #[test]
    fn test_confirm_rejects_negative_companions() {
        let result = apply(&pending(), &Trigger::ConfirmRsvp { companions: -1 }, Utc::now());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_scan_checks_in_with_scanner_origin() {
        let attendee = confirmed_with_code("GAL-EV-ANA-ABC");
        let now = Utc::now() + Duration::minutes(5);

        let next = apply(&attendee, &Trigger::Scan { code: "GAL-EV-ANA-ABC".into() }, now).unwrap();

        assert_eq!(next.status, AttendeeStatus::Present);
        assert_eq!(next.check_in_origin, CheckInOrigin::Scanner);
        assert_eq!(next.checked_in_at, Some(now));
        assert!(next.is_scanner_protected());
    }

    #[test]
    fn test_scan_with_foreign_code_is_rejected() {
        let attendee = confirmed_with_code("GAL-EV-ANA-ABC");
        let result = apply(&attendee, &Trigger::Scan { code: "GAL-EV-BOB-XYZ".into() }, Utc::now());
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_scan_of_present_attendee_is_invalid_in_pure_form() {
        let attendee = confirmed_with_code("GAL-EV-ANA-ABC");
        let present = apply(&attendee, &Trigger::Scan { code: "GAL-EV-ANA-ABC".into() }, Utc::now()).unwrap();
        let again = apply(&present, &Trigger::Scan { code: "GAL-EV-ANA-ABC".into() }, Utc::now());
        assert!(matches!(again, Err(AppError::InvalidState(_))));
    }

    #[test]
    fn test_pending_cannot_be_checked_in() {
        for trigger in [Trigger::ManualCheckIn, Trigger::Scan { code: "X".into() }, Trigger::UndoCheckIn] {
            let result = apply(&pending(), &trigger, Utc::now());
            assert!(matches!(result, Err(AppError::InvalidState(_))), "{:?} should be rejected", trigger);
        }
    }

    #[test]
    fn test_manual_present_can_be_undone_once() {
        let present = Attendee::manual_present("event-1".into(), Identity::User { user_id: "u".into() }, 0, Utc::now());

        let undone = apply(&present, &Trigger::UndoCheckIn, Utc::now()).unwrap();
        assert_eq!(undone.status, AttendeeStatus::Confirmed);
        assert_eq!(undone.check_in_origin, CheckInOrigin::None);
        assert!(undone.checked_in_at.is_none());
        assert!(undone.confirmed_at.is_some());

        let twice = apply(&undone, &Trigger::UndoCheckIn, Utc::now());
        assert!(matches!(twice, Err(AppError::InvalidState(_))));
    }

    #[test]
    fn test_undo_of_scanner_check_in_is_protected() {
        let attendee = confirmed_with_code("GAL-EV-ANA-ABC");
        let present = apply(&attendee, &Trigger::Scan { code: "GAL-EV-ANA-ABC".into() }, Utc::now()).unwrap();

        let result = apply(&present, &Trigger::UndoCheckIn, Utc::now());
        assert!(matches!(result, Err(AppError::ProtectedState(_))));
    }

    #[test]
    fn test_manual_check_in_of_code_holder_is_protected() {
        let attendee = confirmed_with_code("GAL-EV-ANA-ABC");
        let present = apply(&attendee, &Trigger::ManualCheckIn, Utc::now()).unwrap();

        assert_eq!(present.check_in_origin, CheckInOrigin::Manual);
        let result = apply(&present, &Trigger::UndoCheckIn, Utc::now());
        assert!(matches!(result, Err(AppError::ProtectedState(_))));
    }

    #[test]
    fn test_absent_is_terminal() {
        let absent = apply(&pending(), &Trigger::MarkAbsent, Utc::now()).unwrap();
        assert_eq!(absent.status, AttendeeStatus::Absent);

        for trigger in [
            Trigger::ConfirmRsvp { companions: 0 },
            Trigger::ManualCheckIn,
            Trigger::UndoCheckIn,
            Trigger::MarkAbsent,
        ] {
            assert!(matches!(apply(&absent, &trigger, Utc::now()), Err(AppError::InvalidState(_))));
        }
    }

    #[test]
    fn test_check_in_never_precedes_confirmation() {
        let mut attendee = confirmed_with_code("GAL-EV-ANA-ABC");
        let later = Utc::now() + Duration::hours(1);
        attendee.confirmed_at = Some(later);

        let present = apply(&attendee, &Trigger::ManualCheckIn, Utc::now()).unwrap();
        assert!(present.confirmed_at.unwrap() <= present.checked_in_at.unwrap());
    }

    #[test]
    fn test_apply_is_deterministic() {
        let attendee = confirmed_with_code("GAL-EV-ANA-ABC");
        let now = Utc::now();
        let trigger = Trigger::Scan { code: "GAL-EV-ANA-ABC".into() };
        assert_eq!(apply(&attendee, &trigger, now).unwrap(), apply(&attendee, &trigger, now).unwrap());
    }
}
