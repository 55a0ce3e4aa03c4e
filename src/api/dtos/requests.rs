use chrono::{DateTime, Utc};
use serde::Deserialize;
use crate::domain::models::attendee::{AttendeeStatus, GuestContact};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub slug: String,
    pub title: String,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default)]
pub struct ConfirmAttendanceRequest {
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_whatsapp: Option<String>,
    #[serde(default)]
    pub companions_count: i32,
}

impl ConfirmAttendanceRequest {
    pub fn guest_contact(&self) -> GuestContact {
        GuestContact {
            name: self.guest_name.clone(),
            email: self.guest_email.clone(),
            whatsapp: self.guest_whatsapp.clone(),
        }
    }
}

#[derive(Deserialize)]
pub struct CheckInRequest {
    pub qr_code: String,
    pub scanner_id: Option<String>,
    pub device: Option<String>,
}

#[derive(Deserialize)]
pub struct ManualCheckInRequest {
    pub attendee_id: String,
    pub action: String,
}

/// Admin registration: either an existing `user_id` or guest contact fields.
#[derive(Deserialize)]
pub struct RegisterAttendeeRequest {
    pub user_id: Option<String>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_whatsapp: Option<String>,
    pub status: AttendeeStatus,
    #[serde(default)]
    pub companions_count: i32,
}
