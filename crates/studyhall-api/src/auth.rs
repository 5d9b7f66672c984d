//! Password hashing and token issuance.
//!
//! Claims and token validation live in `studyhall_common::auth` so the
//! signaling layer can verify tokens too; everything here is specific to
//! issuing them.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use studyhall_common::auth::Claims;
use uuid::Uuid;

/// Token pair returned on login/register.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against an Argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn generate_token(
    user_id: Uuid,
    name: &str,
    email: &str,
    secret: &str,
    ttl_secs: u64,
    token_type: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ttl_secs as i64)).timestamp(),
        token_type: token_type.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Generate both access and refresh tokens.
pub fn generate_token_pair(
    user_id: Uuid,
    name: &str,
    email: &str,
    secret: &str,
    access_ttl: u64,
    refresh_ttl: u64,
) -> Result<TokenPair, jsonwebtoken::errors::Error> {
    Ok(TokenPair {
        access_token: generate_token(user_id, name, email, secret, access_ttl, "access")?,
        refresh_token: generate_token(user_id, name, email, secret, refresh_ttl, "refresh")?,
        expires_in: access_ttl,
        token_type: "Bearer".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyhall_common::auth::validate_token;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn token_pair_carries_identity() {
        let user_id = Uuid::new_v4();
        let pair =
            generate_token_pair(user_id, "Alice", "alice@uni.edu", "test-secret", 900, 3600)
                .unwrap();

        let access = validate_token(&pair.access_token, "test-secret").unwrap();
        assert_eq!(access.sub, user_id.to_string());
        assert_eq!(access.name, "Alice");
        assert_eq!(access.token_type, "access");

        let refresh = validate_token(&pair.refresh_token, "test-secret").unwrap();
        assert_eq!(refresh.token_type, "refresh");
    }
}
