use serde::Serialize;
use serde_json::{json, Value};
use strum::{AsRefStr, Display};
use crate::domain::models::attendee::Attendee;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    AttendanceConfirmed,
    CheckedIn,
    CheckInReverted,
    MarkedAbsent,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub event_id: String,
    pub attendee_id: String,
    pub recipients: Vec<String>,
    pub context: Value,
}

impl Notification {
    /// Addresses the guest (when they left an email) and the organizer inbox, if configured.
    pub fn for_attendee(attendee: &Attendee, kind: NotificationKind, organizer_email: Option<&str>) -> Self {
        let recipients = attendee.guest_email()
            .into_iter()
            .chain(organizer_email)
            .map(str::to_string)
            .collect();

        Self {
            kind,
            event_id: attendee.event_id.clone(),
            attendee_id: attendee.id.clone(),
            recipients,
            context: json!({
                "guest_name": attendee.guest_name().unwrap_or("Guest"),
                "qr_code": attendee.qr_code,
                "status": attendee.status,
                "companions_count": attendee.companions_count,
                "checked_in_at": attendee.checked_in_at.map(|t| t.to_rfc3339()),
                "event_id": attendee.event_id,
            }),
        }
    }
}
