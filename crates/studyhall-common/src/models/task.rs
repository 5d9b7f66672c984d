//! Personal task tracking models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Persisted user task.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserTask {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    /// "low" | "medium" | "high"
    pub priority: String,
    pub category: String,
    pub subject: String,
    pub estimated_minutes: i32,
    pub actual_minutes: i32,
    pub is_completed: bool,
    pub completion_percentage: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub tags: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task creation request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title required"))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub subject: Option<String>,

    #[validate(range(min = 1, max = 1440))]
    pub estimated_time: Option<i32>,

    pub tags: Option<Vec<String>>,
}

/// Task update request — all fields optional.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub subject: Option<String>,

    #[validate(range(min = 1, max = 1440))]
    pub estimated_time: Option<i32>,

    #[validate(range(min = 0, max = 100))]
    pub completion_percentage: Option<i32>,

    pub tags: Option<Vec<String>>,
}
