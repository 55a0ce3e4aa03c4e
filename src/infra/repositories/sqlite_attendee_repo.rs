use crate::domain::{
    models::attendee::{Attendee, AttendeeStatus, Identity},
    ports::AttendeeRepository,
};
use crate::error::AppError;
use crate::infra::repositories::attendee_row::{into_attendee, AttendeeRow, ATTENDEE_COLUMNS};
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteAttendeeRepo {
    pool: SqlitePool,
}

impl SqliteAttendeeRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendeeRepository for SqliteAttendeeRepo {
    async fn insert(&self, attendee: &Attendee) -> Result<Attendee, AppError> {
        let row = sqlx::query_as::<_, AttendeeRow>(&format!(
            r#"INSERT INTO attendees (
                id, event_id, user_id, guest_name, guest_email, guest_whatsapp, status, qr_code,
                check_in_origin, companions_count, confirmed_at, checked_in_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {ATTENDEE_COLUMNS}"#
        ))
            .bind(&attendee.id)
            .bind(&attendee.event_id)
            .bind(attendee.user_id())
            .bind(attendee.guest_name())
            .bind(attendee.guest_email())
            .bind(attendee.guest_whatsapp())
            .bind(attendee.status.as_ref())
            .bind(&attendee.qr_code)
            .bind(attendee.check_in_origin.as_ref())
            .bind(attendee.companions_count)
            .bind(attendee.confirmed_at)
            .bind(attendee.checked_in_at)
            .bind(attendee.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        row.try_into()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Attendee>, AppError> {
        let row = sqlx::query_as::<_, AttendeeRow>(&format!("SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        into_attendee(row)
    }

    async fn find_by_qr_code(&self, qr_code: &str) -> Result<Option<Attendee>, AppError> {
        let row = sqlx::query_as::<_, AttendeeRow>(&format!("SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE qr_code = ?"))
            .bind(qr_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        into_attendee(row)
    }

    async fn find_by_identity(&self, event_id: &str, identity: &Identity) -> Result<Option<Attendee>, AppError> {
        let (column, key) = match identity {
            Identity::User { user_id } => ("user_id", user_id),
            Identity::Guest { email, .. } => ("guest_email", email),
        };

        let row = sqlx::query_as::<_, AttendeeRow>(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE event_id = ? AND {column} = ?"
        ))
            .bind(event_id)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        into_attendee(row)
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Attendee>, AppError> {
        sqlx::query_as::<_, AttendeeRow>(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE event_id = ? ORDER BY created_at ASC, id ASC"
        ))
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?
            .into_iter()
            .map(Attendee::try_from)
            .collect()
    }

    async fn compare_and_swap(&self, updated: &Attendee, expected: AttendeeStatus) -> Result<Option<Attendee>, AppError> {
        let row = sqlx::query_as::<_, AttendeeRow>(&format!(
            r#"UPDATE attendees SET
                status = ?, qr_code = COALESCE(qr_code, ?), check_in_origin = ?,
                companions_count = ?, confirmed_at = ?, checked_in_at = ?
               WHERE id = ? AND status = ?
               RETURNING {ATTENDEE_COLUMNS}"#
        ))
            .bind(updated.status.as_ref())
            .bind(&updated.qr_code)
            .bind(updated.check_in_origin.as_ref())
            .bind(updated.companions_count)
            .bind(updated.confirmed_at)
            .bind(updated.checked_in_at)
            .bind(&updated.id)
            .bind(expected.as_ref())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        into_attendee(row)
    }
}
