//! User repository — accounts, profiles, settings, stats.

use studyhall_common::models::user::{User, UserProfile, UserStats};
use sqlx::PgPool;
use uuid::Uuid;

/// Create a new user account with its profile, settings, and stats rows.
/// Runs in a transaction so registration is all-or-nothing.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    name: &str,
) -> Result<User, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, email_verified_at)
        VALUES ($1, $2, NOW())
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO user_profiles (user_id, name) VALUES ($1, $2)")
        .bind(user.id)
        .bind(name)
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO user_settings (user_id) VALUES ($1)")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO user_stats (user_id) VALUES ($1)")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(user)
}

/// Find a user by their unique ID.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Find a user by email (case-insensitive).
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Fetch a user's profile row.
pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Update profile fields; unset arguments leave columns untouched.
pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    name: Option<&str>,
    bio: Option<&str>,
    avatar_url: Option<&str>,
    university: Option<&str>,
    major: Option<&str>,
    study_year: Option<i32>,
) -> Result<UserProfile, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(
        r#"
        UPDATE user_profiles SET
            name = COALESCE($2, name),
            bio = COALESCE($3, bio),
            avatar_url = COALESCE($4, avatar_url),
            university = COALESCE($5, university),
            major = COALESCE($6, major),
            study_year = COALESCE($7, study_year),
            updated_at = NOW()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(bio)
    .bind(avatar_url)
    .bind(university)
    .bind(major)
    .bind(study_year)
    .fetch_one(pool)
    .await
}

/// Fetch a user's stats row.
pub async fn get_stats(pool: &PgPool, user_id: Uuid) -> Result<Option<UserStats>, sqlx::Error> {
    sqlx::query_as::<_, UserStats>("SELECT * FROM user_stats WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Count registered users (for the health endpoint).
pub async fn count_users(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
