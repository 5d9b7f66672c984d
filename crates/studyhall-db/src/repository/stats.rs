//! Leaderboard and study-stat queries.

use sqlx::PgPool;
use uuid::Uuid;

/// Leaderboard entry with display fields.
#[derive(Debug, sqlx::FromRow)]
pub struct LeaderboardRow {
    pub user_id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub level_points: i64,
    pub total_study_seconds: i64,
    pub current_streak: i32,
}

/// Top users by level points.
pub async fn leaderboard(pool: &PgPool, limit: i64) -> Result<Vec<LeaderboardRow>, sqlx::Error> {
    sqlx::query_as::<_, LeaderboardRow>(
        r#"
        SELECT us.user_id, up.name, up.avatar_url,
               us.level_points, us.total_study_seconds, us.current_streak
        FROM user_stats us
        JOIN user_profiles up ON up.user_id = us.user_id
        ORDER BY us.level_points DESC, us.total_study_seconds DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// A user's rank by level points (1-based).
pub async fn user_rank(pool: &PgPool, user_id: Uuid) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT rank FROM (
            SELECT user_id,
                   RANK() OVER (ORDER BY level_points DESC, total_study_seconds DESC) AS rank
            FROM user_stats
        ) ranked
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(r,)| r))
}

/// Credit study time and points to a user.
pub async fn add_study_time(
    pool: &PgPool,
    user_id: Uuid,
    seconds: i64,
    points: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE user_stats SET
            total_study_seconds = total_study_seconds + $2,
            level_points = level_points + $3
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(seconds)
    .bind(points)
    .execute(pool)
    .await?;
    Ok(())
}
