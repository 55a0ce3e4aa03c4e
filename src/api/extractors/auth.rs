use axum::{
    extract::{FromRequestParts, FromRef},
    http::{request::Parts, Method},
};
use crate::state::AppState;
use crate::domain::models::user::{Role, SessionUser};
use crate::error::AppError;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::Span;

pub const ACCESS_COOKIE: &str = "access_token";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// A caller with a valid access token. Unsafe methods must also echo the
/// token's CSRF value in `X-CSRF-Token`.
pub struct AuthUser(pub SessionUser);

impl AuthUser {
    pub fn require(&self, minimum: Role) -> Result<&SessionUser, AppError> {
        if self.0.role >= minimum {
            Ok(&self.0)
        } else {
            Err(AppError::Forbidden(format!("{} role required", minimum)))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = parts.extensions.get::<Cookies>()
            .ok_or(AppError::InternalWithMsg("Cookie layer missing".into()))?;

        let access_token = cookies.get(ACCESS_COOKIE)
            .ok_or(AppError::Unauthorized)?
            .value()
            .to_string();

        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);
        let claims = app_state.auth_service.verify(&access_token)?;

        let method = &parts.method;
        if method != Method::GET && method != Method::HEAD && method != Method::OPTIONS {
            let csrf_header_val = parts.headers.get(CSRF_HEADER)
                .ok_or(AppError::Forbidden("Missing CSRF token".into()))?
                .to_str()
                .map_err(|_| AppError::Forbidden("Malformed CSRF token".into()))?;

            if csrf_header_val != claims.csrf_token {
                return Err(AppError::Forbidden("CSRF token mismatch".into()));
            }
        }

        let user = SessionUser { id: claims.sub, role: claims.role };
        Span::current().record("user_id", &user.id);

        Ok(AuthUser(user))
    }
}
