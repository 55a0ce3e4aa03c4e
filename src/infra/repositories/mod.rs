mod attendee_row;

pub mod sqlite_attendee_repo;
pub mod sqlite_event_repo;
pub mod sqlite_user_repo;

pub mod postgres_attendee_repo;
pub mod postgres_event_repo;
pub mod postgres_user_repo;
