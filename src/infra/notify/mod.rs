pub mod http_notification_service;
pub mod templates;
