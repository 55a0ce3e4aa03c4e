use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::domain::models::attendee::{Attendee, AttendeeStatus, CheckInOrigin, Identity};
use crate::error::AppError;

pub(crate) const ATTENDEE_COLUMNS: &str = "id, event_id, user_id, guest_name, guest_email, guest_whatsapp, status, qr_code, \
     check_in_origin, companions_count, confirmed_at, checked_in_at, created_at";

/// Flat column layout shared by both backends; identity is folded back into
/// its enum on the way out.
#[derive(Debug, FromRow)]
pub(crate) struct AttendeeRow {
    pub id: String,
    pub event_id: String,
    pub user_id: Option<String>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_whatsapp: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: AttendeeStatus,
    pub qr_code: Option<String>,
    #[sqlx(try_from = "String")]
    pub check_in_origin: CheckInOrigin,
    pub companions_count: i32,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AttendeeRow> for Attendee {
    type Error = AppError;

    fn try_from(row: AttendeeRow) -> Result<Self, Self::Error> {
        let identity = match (row.user_id, row.guest_email) {
            (Some(user_id), None) => Identity::User { user_id },
            (None, Some(email)) => Identity::Guest {
                name: row.guest_name.unwrap_or_default(),
                email,
                whatsapp: row.guest_whatsapp,
            },
            _ => {
                return Err(AppError::InternalWithMsg(format!(
                    "Attendee {} has no single identity",
                    row.id
                )));
            }
        };

        Ok(Attendee {
            id: row.id,
            event_id: row.event_id,
            identity,
            status: row.status,
            qr_code: row.qr_code,
            check_in_origin: row.check_in_origin,
            companions_count: row.companions_count,
            confirmed_at: row.confirmed_at,
            checked_in_at: row.checked_in_at,
            created_at: row.created_at,
        })
    }
}

pub(crate) fn into_attendee(row: Option<AttendeeRow>) -> Result<Option<Attendee>, AppError> {
    row.map(Attendee::try_from).transpose()
}
