use gallery_backend::{
    api::router::create_router,
    state::{AppState, Repositories},
    config::Config,
    infra::repositories::{
        sqlite_attendee_repo::SqliteAttendeeRepo,
        sqlite_event_repo::SqliteEventRepo,
        sqlite_user_repo::SqliteUserRepo,
    },
    domain::models::{notification::Notification, user::{Role, User}},
    domain::ports::NotificationService,
    domain::services::{auth_service::hash_password, qr_issuer::{CodeGenerator, QrIssuer}},
    error::AppError,
};
use sqlx::{sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions}, Pool, Sqlite};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    Router,
};
use std::str::FromStr;
use async_trait::async_trait;
use tower::ServiceExt;
use serde_json::{json, Value};

pub const ADMIN: (&str, &str) = ("admin", "admin-pass");
pub const STAFF: (&str, &str) = ("door", "door-pass");
pub const GUEST: (&str, &str) = ("ana", "ana-pass");

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Notifications go out on detached tasks; poll until `count` have arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<Notification> {
        for _ in 0..100 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {} notifications, got {}", count, self.sent().len());
    }
}

#[async_trait]
impl NotificationService for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct FailingNotifier;

#[async_trait]
impl NotificationService for FailingNotifier {
    async fn send(&self, _notification: &Notification) -> Result<(), AppError> {
        Err(AppError::InternalWithMsg("mail relay is down".into()))
    }
}

#[derive(Clone)]
pub struct AuthHeaders {
    pub access_token: String,
    pub csrf_token: String,
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub notifier: Arc<RecordingNotifier>,
    pub users: Vec<User>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        Self::build(notifier.clone(), notifier, None).await
    }

    pub async fn with_failing_notifier() -> Self {
        Self::build(Arc::new(FailingNotifier), Arc::new(RecordingNotifier::default()), None).await
    }

    pub async fn with_code_generator(generate: Arc<CodeGenerator>) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        Self::build(notifier.clone(), notifier, Some(generate)).await
    }

    async fn build(
        active: Arc<dyn NotificationService>,
        recorder: Arc<RecordingNotifier>,
        generate: Option<Arc<CodeGenerator>>,
    ) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let priv_key_pem = include_str!("../tests/keys/test_private.pem");
        let pub_key_pem = include_str!("../tests/keys/test_public.pem");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
            jwt_secret_key: priv_key_pem.to_string(),
            jwt_public_key: pub_key_pem.to_string(),
            auth_issuer: "test-issuer".to_string(),
            organizer_email: Some("organizer@example.com".to_string()),
            qr_max_attempts: 5,
            admin_username: None,
            admin_password: None,
        };

        let repos = Repositories {
            user_repo: Arc::new(SqliteUserRepo::new(pool.clone())),
            event_repo: Arc::new(SqliteEventRepo::new(pool.clone())),
            attendee_repo: Arc::new(SqliteAttendeeRepo::new(pool.clone())),
        };

        let state = Arc::new(match generate {
            Some(generate) => {
                let issuer = Arc::new(QrIssuer::with_generator(repos.attendee_repo.clone(), config.qr_max_attempts, generate));
                AppState::with_issuer(config, repos, active, issuer)
            }
            None => AppState::new(config, repos, active),
        });

        let mut users = Vec::new();
        for ((username, password), role) in [(ADMIN, Role::Admin), (STAFF, Role::Staff), (GUEST, Role::Guest)] {
            let user = User::new(username.to_string(), hash_password(password).unwrap(), role);
            users.push(state.user_repo.create(&user).await.expect("Failed to seed user"));
        }

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            notifier: recorder,
            users,
        }
    }

    pub fn user_id(&self, username: &str) -> String {
        self.users.iter().find(|u| u.username == username).expect("unknown test user").id.clone()
    }

    pub async fn login(&self, username: &str, password: &str) -> AuthHeaders {
        let payload = json!({
            "username": username,
            "password": password
        });

        let response = self.router.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap()
        ).await.unwrap();

        if !response.status().is_success() {
            panic!("Login failed in test helper: status {}", response.status());
        }

        let cookies: Vec<String> = response.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|h| h.to_str().unwrap().to_string())
            .collect();

        let access_token_cookie = cookies.iter()
            .find(|c| c.contains("access_token="))
            .expect("No access_token cookie returned");

        let start = access_token_cookie.find("access_token=").unwrap() + 13;
        let end = access_token_cookie[start..].find(';').unwrap_or(access_token_cookie.len() - start);
        let access_token = access_token_cookie[start..start+end].to_string();

        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body_json: Value = serde_json::from_slice(&body_bytes).unwrap();
        let csrf_token = body_json["csrf_token"].as_str().expect("No csrf_token in body").to_string();

        AuthHeaders {
            access_token,
            csrf_token
        }
    }

    pub async fn admin(&self) -> AuthHeaders {
        self.login(ADMIN.0, ADMIN.1).await
    }

    pub async fn staff(&self) -> AuthHeaders {
        self.login(STAFF.0, STAFF.1).await
    }

    /// Sends a JSON request and returns the status with the parsed body
    /// (`Value::Null` for empty or non-JSON bodies).
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>, auth: Option<&AuthHeaders>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder
                .header(header::COOKIE, format!("access_token={}", auth.access_token))
                .header("X-CSRF-Token", &auth.csrf_token);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn create_event(&self, admin: &AuthHeaders, slug: &str) -> String {
        let (status, body) = self.request(
            "POST",
            "/api/v1/events",
            Some(json!({ "slug": slug, "title": format!("Event {}", slug), "location": "Main hall" })),
            Some(admin),
        ).await;
        assert_eq!(status, StatusCode::CREATED, "event creation failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Guest RSVP; returns `(attendee_id, qr_code)`.
    pub async fn rsvp_guest(&self, event_id: &str, name: &str, email: &str, companions: i32) -> (String, String) {
        let (status, body) = self.request(
            "POST",
            &format!("/api/v1/events/{}/confirm-attendance", event_id),
            Some(json!({ "guest_name": name, "guest_email": email, "companions_count": companions })),
            None,
        ).await;
        assert_eq!(status, StatusCode::CREATED, "rsvp failed: {}", body);
        (
            body["attendee_id"].as_str().unwrap().to_string(),
            body["qr_code"].as_str().unwrap().to_string(),
        )
    }

    pub async fn scan(&self, staff: &AuthHeaders, event_id: &str, qr_code: &str) -> (StatusCode, Value) {
        self.request(
            "POST",
            &format!("/api/v1/events/{}/checkin", event_id),
            Some(json!({ "qr_code": qr_code, "scanner_id": "gate-1", "device": "test-phone" })),
            Some(staff),
        ).await
    }

    pub async fn manual(&self, admin: &AuthHeaders, event_id: &str, attendee_id: &str, action: &str) -> (StatusCode, Value) {
        self.request(
            "POST",
            &format!("/api/v1/events/{}/manual-checkin", event_id),
            Some(json!({ "attendee_id": attendee_id, "action": action })),
            Some(admin),
        ).await
    }

    pub async fn register(&self, admin: &AuthHeaders, event_id: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", &format!("/api/v1/events/{}/attendees", event_id), Some(body), Some(admin)).await
    }

    pub async fn stats(&self, staff: &AuthHeaders, event_id: &str) -> Value {
        let (status, body) = self.request("GET", &format!("/api/v1/events/{}/attendee-stats", event_id), None, Some(staff)).await;
        assert_eq!(status, StatusCode::OK, "stats failed: {}", body);
        body
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}
