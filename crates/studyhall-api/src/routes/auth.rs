//! Authentication routes — register, login, refresh.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use studyhall_common::{
    models::user::{CreateUserRequest, LoginRequest, UserResponse},
    validation::validate_request,
    HallError, HallResult,
};
use studyhall_db::repository::users;

use crate::{
    auth::{self, TokenPair},
    AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
}

#[derive(Serialize)]
struct AuthResponse {
    user: UserResponse,
    #[serde(flatten)]
    tokens: TokenPair,
}

/// POST /api/v1/auth/register
///
/// Create an account with its profile, settings, and stats rows, and
/// return the user plus a token pair.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserRequest>,
) -> HallResult<Json<AuthResponse>> {
    validate_request(&body)?;

    if users::find_by_email(&state.db.pool, &body.email)
        .await?
        .is_some()
    {
        return Err(HallError::AlreadyExists {
            resource: "Email".into(),
        });
    }

    let password_hash = auth::hash_password(&body.password)
        .map_err(|e| HallError::Internal(anyhow::anyhow!("{e}")))?;

    let user = users::create_user(&state.db.pool, &body.email, &password_hash, &body.name).await?;

    let config = studyhall_common::config::get();
    let tokens = auth::generate_token_pair(
        user.id,
        &body.name,
        &user.email,
        &config.auth.jwt_secret,
        config.auth.access_token_ttl_secs,
        config.auth.refresh_token_ttl_secs,
    )
    .map_err(|e| HallError::Internal(e.into()))?;

    tracing::info!(user_id = %user.id, "New user registered");

    Ok(Json(AuthResponse {
        user: UserResponse {
            id: user.id,
            name: body.name,
            email: user.email,
            avatar: None,
        },
        tokens,
    }))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> HallResult<Json<AuthResponse>> {
    validate_request(&body)?;

    let user = users::find_by_email(&state.db.pool, &body.email)
        .await?
        .ok_or(HallError::InvalidCredentials)?;

    let valid = auth::verify_password(&body.password, &user.password_hash)
        .map_err(|_| HallError::InvalidCredentials)?;
    if !valid {
        return Err(HallError::InvalidCredentials);
    }

    let profile = users::get_profile(&state.db.pool, user.id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "Profile".into(),
        })?;

    let config = studyhall_common::config::get();
    let tokens = auth::generate_token_pair(
        user.id,
        &profile.name,
        &user.email,
        &config.auth.jwt_secret,
        config.auth.access_token_ttl_secs,
        config.auth.refresh_token_ttl_secs,
    )
    .map_err(|e| HallError::Internal(e.into()))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        user: UserResponse {
            id: user.id,
            name: profile.name,
            email: user.email,
            avatar: profile.avatar_url,
        },
        tokens,
    }))
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new token pair.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> HallResult<Json<TokenPair>> {
    let config = studyhall_common::config::get();

    let claims =
        studyhall_common::auth::validate_token(&body.refresh_token, &config.auth.jwt_secret)
            .map_err(|_| HallError::InvalidToken)?;

    if claims.token_type != "refresh" {
        return Err(HallError::InvalidToken);
    }

    let user_id = claims
        .sub
        .parse::<uuid::Uuid>()
        .map_err(|_| HallError::InvalidToken)?;

    // The account must still exist; name may have changed since issuance.
    let user = users::find_by_id(&state.db.pool, user_id)
        .await?
        .ok_or(HallError::InvalidToken)?;
    let profile = users::get_profile(&state.db.pool, user_id)
        .await?
        .ok_or(HallError::InvalidToken)?;

    let tokens = auth::generate_token_pair(
        user.id,
        &profile.name,
        &user.email,
        &config.auth.jwt_secret,
        config.auth.access_token_ttl_secs,
        config.auth.refresh_token_ttl_secs,
    )
    .map_err(|e| HallError::Internal(e.into()))?;

    Ok(Json(tokens))
}
