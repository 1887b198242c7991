use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use voyage_core::identity::User;
use voyage_core::{Actor, CoreError};

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

pub fn issue_token(auth: &AuthConfig, user: &User) -> Result<String, AppError> {
    let role = Actor::from_user(user)
        .role()
        .map(|r| r.as_str())
        .unwrap_or_default();
    let claims = Claims {
        sub: user.id.to_string(),
        role: role.to_owned(),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

fn unauthenticated() -> AppError {
    AppError::AuthenticationError("missing or invalid bearer token".to_string())
}

/// Resolves the bearer token to an actor. Privileges come from the stored user,
/// so a demoted admin loses access before their token expires.
async fn resolve_actor(state: &AppState, headers: &HeaderMap) -> Result<Actor, AppError> {
    // 1. Extract token from Authorization header
    let token = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(unauthenticated)?;

    // 2. Decode and validate JWT
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| unauthenticated())?;
    let user_id: i64 = token_data.claims.sub.parse().map_err(|_| unauthenticated())?;

    // 3. The user must still exist
    match state.accounts.get_user(user_id).await {
        Ok(user) => Ok(Actor::from_user(&user)),
        Err(CoreError::NotFound(_)) => Err(unauthenticated()),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// User Authentication Middleware
// ============================================================================

pub async fn user_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = resolve_actor(&state, req.headers()).await?;
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

// ============================================================================
// Admin Authentication Middleware
// ============================================================================

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = resolve_actor(&state, req.headers()).await?;
    let admin = actor.require_admin()?;
    req.extensions_mut().insert(actor);
    req.extensions_mut().insert(admin);
    Ok(next.run(req).await)
}
