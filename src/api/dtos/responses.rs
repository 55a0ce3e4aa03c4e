use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::domain::models::attendee::{Attendee, AttendeeStatus, CheckInOrigin};

/// Attendee as shown to staff and admins.
#[derive(Serialize)]
pub struct AttendeeView {
    pub id: String,
    pub event_id: String,
    pub user_id: Option<String>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_whatsapp: Option<String>,
    pub status: AttendeeStatus,
    pub qr_code: Option<String>,
    pub check_in_origin: CheckInOrigin,
    pub companions_count: i32,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Attendee> for AttendeeView {
    fn from(a: Attendee) -> Self {
        Self {
            user_id: a.user_id().map(str::to_string),
            guest_name: a.guest_name().map(str::to_string),
            guest_email: a.guest_email().map(str::to_string),
            guest_whatsapp: a.guest_whatsapp().map(str::to_string),
            id: a.id,
            event_id: a.event_id,
            status: a.status,
            qr_code: a.qr_code,
            check_in_origin: a.check_in_origin,
            companions_count: a.companions_count,
            confirmed_at: a.confirmed_at,
            checked_in_at: a.checked_in_at,
            created_at: a.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct CheckInResponse {
    #[serde(flatten)]
    pub attendee: AttendeeView,
    pub already_checked_in: bool,
}

#[derive(Serialize)]
pub struct ConfirmAttendanceResponse {
    pub attendee_id: String,
    pub qr_code: Option<String>,
    pub status: AttendeeStatus,
}
