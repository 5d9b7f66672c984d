//! Personal task repository.

use studyhall_common::models::task::UserTask;
use sqlx::PgPool;
use uuid::Uuid;

#[allow(clippy::too_many_arguments)]
pub async fn create_task(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    description: &str,
    due_date: Option<chrono::DateTime<chrono::Utc>>,
    priority: &str,
    category: &str,
    subject: &str,
    estimated_minutes: i32,
    tags: &serde_json::Value,
) -> Result<UserTask, sqlx::Error> {
    sqlx::query_as::<_, UserTask>(
        r#"
        INSERT INTO user_tasks
            (user_id, title, description, due_date, priority, category, subject,
             estimated_minutes, tags)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(due_date)
    .bind(priority)
    .bind(category)
    .bind(subject)
    .bind(estimated_minutes)
    .bind(tags)
    .fetch_one(pool)
    .await
}

pub async fn list_tasks(pool: &PgPool, user_id: Uuid) -> Result<Vec<UserTask>, sqlx::Error> {
    sqlx::query_as::<_, UserTask>(
        "SELECT * FROM user_tasks WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Update task fields; unset arguments leave columns untouched.
/// Ownership is enforced in the WHERE clause.
#[allow(clippy::too_many_arguments)]
pub async fn update_task(
    pool: &PgPool,
    task_id: Uuid,
    user_id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
    due_date: Option<chrono::DateTime<chrono::Utc>>,
    priority: Option<&str>,
    category: Option<&str>,
    subject: Option<&str>,
    estimated_minutes: Option<i32>,
    completion_percentage: Option<i32>,
    tags: Option<&serde_json::Value>,
) -> Result<Option<UserTask>, sqlx::Error> {
    sqlx::query_as::<_, UserTask>(
        r#"
        UPDATE user_tasks SET
            title = COALESCE($3, title),
            description = COALESCE($4, description),
            due_date = COALESCE($5, due_date),
            priority = COALESCE($6, priority),
            category = COALESCE($7, category),
            subject = COALESCE($8, subject),
            estimated_minutes = COALESCE($9, estimated_minutes),
            completion_percentage = COALESCE($10, completion_percentage),
            tags = COALESCE($11, tags),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(due_date)
    .bind(priority)
    .bind(category)
    .bind(subject)
    .bind(estimated_minutes)
    .bind(completion_percentage)
    .bind(tags)
    .fetch_optional(pool)
    .await
}

/// Flip a task's completed state; completing sets the timestamp and 100%.
pub async fn toggle_task(
    pool: &PgPool,
    task_id: Uuid,
    user_id: Uuid,
) -> Result<Option<UserTask>, sqlx::Error> {
    sqlx::query_as::<_, UserTask>(
        r#"
        UPDATE user_tasks SET
            is_completed = NOT is_completed,
            completed_at = CASE WHEN is_completed THEN NULL ELSE NOW() END,
            completion_percentage = CASE WHEN is_completed THEN completion_percentage ELSE 100 END,
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_task(pool: &PgPool, task_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM user_tasks WHERE id = $1 AND user_id = $2")
        .bind(task_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
