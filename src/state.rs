use std::sync::Arc;
use crate::domain::ports::{AttendeeRepository, EventRepository, NotificationService, UserRepository};
use crate::domain::services::{
    auth_service::AuthService,
    checkin_service::CheckInService,
    dispatch::Dispatcher,
    feed::AttendanceFeed,
    qr_issuer::QrIssuer,
    registration_service::RegistrationService,
    stats::StatsAggregator,
};
use crate::config::Config;

#[derive(Clone)]
pub struct Repositories {
    pub user_repo: Arc<dyn UserRepository>,
    pub event_repo: Arc<dyn EventRepository>,
    pub attendee_repo: Arc<dyn AttendeeRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub user_repo: Arc<dyn UserRepository>,
    pub event_repo: Arc<dyn EventRepository>,
    pub attendee_repo: Arc<dyn AttendeeRepository>,
    pub auth_service: Arc<AuthService>,
    pub registration: Arc<RegistrationService>,
    pub checkin: Arc<CheckInService>,
    pub stats: Arc<StatsAggregator>,
    pub feed: AttendanceFeed,
}

impl AppState {
    pub fn new(config: Config, repos: Repositories, notifier: Arc<dyn NotificationService>) -> Self {
        let issuer = Arc::new(QrIssuer::new(repos.attendee_repo.clone(), config.qr_max_attempts));
        Self::with_issuer(config, repos, notifier, issuer)
    }

    /// Same wiring with a caller-supplied issuer, e.g. one with a fixed code generator.
    pub fn with_issuer(config: Config, repos: Repositories, notifier: Arc<dyn NotificationService>, issuer: Arc<QrIssuer>) -> Self {
        let feed = AttendanceFeed::default();
        let dispatcher = Arc::new(Dispatcher::new(notifier, feed.clone(), config.organizer_email.clone()));

        Self {
            auth_service: Arc::new(AuthService::new(config.clone())),
            registration: Arc::new(RegistrationService::new(repos.attendee_repo.clone(), issuer, dispatcher.clone())),
            checkin: Arc::new(CheckInService::new(repos.attendee_repo.clone(), dispatcher)),
            stats: Arc::new(StatsAggregator::new(repos.attendee_repo.clone())),
            feed,
            user_repo: repos.user_repo,
            event_repo: repos.event_repo,
            attendee_repo: repos.attendee_repo,
            config,
        }
    }
}
