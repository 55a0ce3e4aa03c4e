use serde::{Deserialize, Serialize};
use crate::domain::models::user::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,

    #[serde(rename = "https://event-gallery.app/claims/role")]
    pub role: Role,

    #[serde(rename = "https://event-gallery.app/claims/csrf")]
    pub csrf_token: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub csrf_token: String,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub role: Role,
}
