use axum::{
    extract::{FromRequest, Request},
    Json,
};
use crate::error::AppError;
use serde::de::DeserializeOwned;
use tracing::debug;

/// `Json` whose rejection renders as `AppError::Validation`, so missing or
/// mistyped body fields get the usual `{error, code}` body with a 400.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "Rejected request body");
                Err(AppError::Validation(rejection.body_text()))
            }
        }
    }
}
