//! User models — account, profile, and study statistics.
//!
//! Accounts hold only credentials; everything display-facing lives in the
//! profile row, and gamification counters live in the stats row. All three
//! are created together at registration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A StudyHall user account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub email_verified_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display-facing profile attached to a user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub university: Option<String>,
    pub major: Option<String>,
    pub study_year: i32,
    pub badges: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Gamification counters — study time, streaks, points, rank.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserStats {
    pub user_id: Uuid,
    pub total_study_seconds: i64,
    pub current_streak: i32,
    pub level_points: i64,
    pub global_rank: i32,
}

/// Registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Profile update request — all fields optional, unset fields untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub bio: Option<String>,

    pub avatar: Option<String>,

    #[validate(length(max = 128))]
    pub university: Option<String>,

    #[validate(length(max = 128))]
    pub major: Option<String>,

    #[validate(range(min = 1, max = 10))]
    pub study_year: Option<i32>,
}

/// Safe user representation returned by auth endpoints.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

/// Aggregated profile view returned by GET /users/profile.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub university: Option<String>,
    pub major: Option<String>,
    pub study_year: i32,
    pub total_hours: i64,
    pub current_streak: i32,
    pub level_points: i64,
    pub global_rank: i32,
    pub badges: serde_json::Value,
}
