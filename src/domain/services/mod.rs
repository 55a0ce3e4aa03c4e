pub mod attendance;
pub mod auth_service;
pub mod checkin_service;
pub mod dispatch;
pub mod feed;
pub mod qr_issuer;
pub mod registration_service;
pub mod stats;
