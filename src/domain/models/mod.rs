pub mod attendee;
pub mod auth;
pub mod event;
pub mod notification;
pub mod stats;
pub mod user;
