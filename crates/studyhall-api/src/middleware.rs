//! Middleware — bearer-token authentication.

use axum::{extract::Request, http::header, middleware::Next, response::Response};
use studyhall_common::HallError;

/// Authentication context extracted from the Authorization header.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: uuid::Uuid,
    pub name: String,
    pub email: String,
}

/// Extract and validate the JWT from the `Authorization: Bearer` header.
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, HallError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(HallError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(HallError::Unauthorized)?;

    let config = studyhall_common::config::get();
    let claims = studyhall_common::auth::validate_token(token, &config.auth.jwt_secret)
        .map_err(|_| HallError::InvalidToken)?;

    // Refresh tokens are only good for /auth/refresh.
    if claims.token_type != "access" {
        return Err(HallError::InvalidToken);
    }

    let user_id = claims
        .sub
        .parse::<uuid::Uuid>()
        .map_err(|_| HallError::InvalidToken)?;

    request.extensions_mut().insert(AuthContext {
        user_id,
        name: claims.name,
        email: claims.email,
    });

    Ok(next.run(request).await)
}
