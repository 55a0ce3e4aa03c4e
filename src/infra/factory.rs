use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::{info, warn};
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::state::{AppState, Repositories};
use crate::domain::models::user::{Role, User};
use crate::domain::ports::{NotificationService, UserRepository};
use crate::domain::services::auth_service::hash_password;
use crate::error::AppError;
use crate::infra::notify::http_notification_service::HttpNotificationService;
use crate::infra::repositories::{
    postgres_attendee_repo::PostgresAttendeeRepo, postgres_event_repo::PostgresEventRepo,
    postgres_user_repo::PostgresUserRepo,
    sqlite_attendee_repo::SqliteAttendeeRepo, sqlite_event_repo::SqliteEventRepo,
    sqlite_user_repo::SqliteUserRepo,
};

pub async fn bootstrap_state(config: &Config) -> AppState {
    let notifier: Arc<dyn NotificationService> = Arc::new(
        HttpNotificationService::new(config.mail_service_url.clone(), config.mail_service_token.clone())
            .expect("Failed to load notification templates"),
    );

    let repos = connect(&config.database_url).await;

    if let Err(e) = ensure_admin(config, repos.user_repo.as_ref()).await {
        warn!("Bootstrap admin was not created: {}", e);
    }

    AppState::new(config.clone(), repos, notifier)
}

pub async fn connect(database_url: &str) -> Repositories {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(opts)
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;

        Repositories {
            user_repo: Arc::new(PostgresUserRepo::new(pool.clone())),
            event_repo: Arc::new(PostgresEventRepo::new(pool.clone())),
            attendee_repo: Arc::new(PostgresAttendeeRepo::new(pool)),
        }
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;

        Repositories {
            user_repo: Arc::new(SqliteUserRepo::new(pool.clone())),
            event_repo: Arc::new(SqliteEventRepo::new(pool.clone())),
            attendee_repo: Arc::new(SqliteAttendeeRepo::new(pool)),
        }
    }
}

/// Creates the configured admin account on first start. An existing account
/// with that username is left untouched.
async fn ensure_admin(config: &Config, users: &dyn UserRepository) -> Result<(), AppError> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    if users.find_by_username(username).await?.is_some() {
        return Ok(());
    }

    let admin = User::new(username.clone(), hash_password(password)?, Role::Admin);
    users.create(&admin).await?;
    info!("Bootstrap admin '{}' created", username);
    Ok(())
}

async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
