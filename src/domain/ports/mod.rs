use crate::domain::models::{
    attendee::{Attendee, AttendeeStatus, Identity},
    event::Event,
    notification::Notification,
    user::User,
};
use crate::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, AppError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> Result<Event, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError>;
    async fn list(&self) -> Result<Vec<Event>, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

/// Attendee persistence. Every state change goes through `compare_and_swap`
/// so concurrent writers on one attendee are linearized by the store.
#[async_trait]
pub trait AttendeeRepository: Send + Sync {
    async fn insert(&self, attendee: &Attendee) -> Result<Attendee, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Attendee>, AppError>;
    async fn find_by_qr_code(&self, qr_code: &str) -> Result<Option<Attendee>, AppError>;
    async fn find_by_identity(&self, event_id: &str, identity: &Identity) -> Result<Option<Attendee>, AppError>;
    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Attendee>, AppError>;

    /// Writes the mutable fields of `updated` only while the stored status is
    /// still `expected`. Returns `None` when that precondition no longer holds.
    /// A code already stored on the row is never replaced.
    async fn compare_and_swap(&self, updated: &Attendee, expected: AttendeeStatus) -> Result<Option<Attendee>, AppError>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), AppError>;
}
