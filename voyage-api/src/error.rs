use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use voyage_core::CoreError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    ValidationError(String),
    RateLimited,
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

fn core_status(err: &CoreError) -> (StatusCode, String) {
    match err {
        CoreError::ValidationFailed(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        CoreError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        CoreError::InsufficientCapacity { .. } => (StatusCode::CONFLICT, err.to_string()),
        CoreError::Storage(msg) => {
            tracing::error!("Storage failure: {}", msg);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".to_string()),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => match err.downcast_ref::<CoreError>() {
                Some(core) => core_status(core),
                None => {
                    tracing::error!("Internal Server Error: {:#}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
                }
            },
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

// CoreError arrives here too and is unwrapped again in `into_response`.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: CoreError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_core_errors_map_to_statuses() {
        assert_eq!(status_of(CoreError::ValidationFailed("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(CoreError::Unauthenticated("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(CoreError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_of(CoreError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(CoreError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(CoreError::InsufficientCapacity { requested: 2, available: 1 }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(CoreError::Storage("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_foreign_errors_are_internal() {
        let err = AppError::from(anyhow::anyhow!("socket closed"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
