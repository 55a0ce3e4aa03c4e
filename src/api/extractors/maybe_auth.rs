use axum::{
    extract::{FromRequestParts, FromRef},
    http::request::Parts,
};
use crate::state::AppState;
use crate::domain::models::user::SessionUser;
use crate::api::extractors::auth::{ACCESS_COOKIE, CSRF_HEADER};
use std::convert::Infallible;
use std::sync::Arc;
use tower_cookies::Cookies;
use tracing::{debug, Span};

/// The session when a valid access token is present; anonymous otherwise.
/// An expired or forged token, or a missing CSRF echo on an unsafe method, is
/// treated as no session at all.
pub struct MaybeAuthUser(pub Option<SessionUser>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(cookies) = parts.extensions.get::<Cookies>() else {
            return Ok(MaybeAuthUser(None));
        };

        let Some(access_token) = cookies.get(ACCESS_COOKIE).map(|c| c.value().to_string()) else {
            return Ok(MaybeAuthUser(None));
        };

        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);
        match app_state.auth_service.verify(&access_token) {
            Ok(claims) if csrf_matches(parts, &claims.csrf_token) => {
                Span::current().record("user_id", &claims.sub);
                Ok(MaybeAuthUser(Some(SessionUser { id: claims.sub, role: claims.role })))
            }
            _ => {
                debug!("MaybeAuth: ignoring invalid access token");
                Ok(MaybeAuthUser(None))
            }
        }
    }
}

fn csrf_matches(parts: &Parts, expected: &str) -> bool {
    if parts.method.is_safe() {
        return true;
    }
    parts.headers.get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected)
}
