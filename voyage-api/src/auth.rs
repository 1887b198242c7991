use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use voyage_booking::RegisterRequest;
use voyage_core::identity::User;
use voyage_core::Actor;
use voyage_shared::pii::Masked;

use crate::extract::ValidatedJson;
use crate::{error::AppError, middleware::issue_token, state::AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: Masked<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Public routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
}

/// Routes behind the user layer.
pub fn user_routes() -> Router<AppState> {
    Router::new().route("/v1/me", get(me))
}

async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = state.accounts.register(request).await?;
    let token = issue_token(&state.auth, &user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state.accounts.authenticate(&request.email, &request.password).await?;
    let token = issue_token(&state.auth, &user)?;
    Ok(Json(AuthResponse { token, user }))
}

async fn me(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<User>, AppError> {
    let user_id = actor.require_user()?;
    Ok(Json(state.accounts.get_user(user_id).await?))
}
