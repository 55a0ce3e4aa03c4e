use axum::{extract::State, response::IntoResponse, Json, http::StatusCode};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::dtos::requests::LoginRequest;
use crate::api::extractors::{auth::ACCESS_COOKIE, json::ValidJson};
use crate::domain::models::auth::{AuthResponse, UserProfile};
use crate::domain::services::auth_service::ACCESS_TOKEN_MINUTES;
use std::sync::Arc;
use tower_cookies::{Cookies, Cookie};
use tower_cookies::cookie::SameSite;
use time::Duration;
use tracing::{info, warn};

pub async fn login(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_repo.find_by_username(&payload.username).await?
        .ok_or_else(|| {
            warn!("Login attempt for unknown user");
            AppError::Unauthorized
        })?;

    state.auth_service.verify_password(&user, &payload.password)?;

    let (access_jwt, csrf_token) = state.auth_service.login(&user)?;

    set_access_cookie(&cookies, &access_jwt);

    info!("User logged in: {}", user.id);

    Ok(Json(AuthResponse {
        csrf_token,
        user: UserProfile {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }))
}

pub async fn logout(cookies: Cookies) -> Result<impl IntoResponse, AppError> {
    cookies.remove(Cookie::build((ACCESS_COOKIE, "")).path("/").into());

    info!("User logged out");

    Ok(StatusCode::OK)
}

fn set_access_cookie(cookies: &Cookies, access: &str) {
    let mut access_c = Cookie::new(ACCESS_COOKIE, access.to_string());
    access_c.set_http_only(true);
    access_c.set_secure(true);
    access_c.set_same_site(SameSite::Strict);
    access_c.set_path("/");
    access_c.set_max_age(Duration::minutes(ACCESS_TOKEN_MINUTES));
    cookies.add(access_c);
}
