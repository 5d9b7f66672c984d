//! Study group repository — groups, membership, group chat.

use studyhall_common::models::group::{GroupMessage, StudyGroup};
use sqlx::PgPool;
use uuid::Uuid;

/// Create a group; the creator joins as Admin.
pub async fn create_group(
    pool: &PgPool,
    created_by: Uuid,
    name: &str,
    description: &str,
    category: &str,
    subject: &str,
    is_private: bool,
    access_code: Option<&str>,
    max_members: i32,
) -> Result<StudyGroup, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let group = sqlx::query_as::<_, StudyGroup>(
        r#"
        INSERT INTO study_groups
            (created_by, name, description, category, subject, is_private, access_code, max_members)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(created_by)
    .bind(name)
    .bind(description)
    .bind(category)
    .bind(subject)
    .bind(is_private)
    .bind(access_code)
    .bind(max_members)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO group_members (group_id, user_id, role) VALUES ($1, $2, 'Admin')")
        .bind(group.id)
        .bind(created_by)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(group)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<StudyGroup>, sqlx::Error> {
    sqlx::query_as::<_, StudyGroup>("SELECT * FROM study_groups WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Group listing row with member count and the viewer's membership flag.
#[derive(Debug, sqlx::FromRow)]
pub struct GroupRow {
    pub id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub subject: String,
    pub is_private: bool,
    pub max_members: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub member_count: i64,
    pub viewer_is_member: bool,
}

pub async fn list_groups(pool: &PgPool, viewer_id: Uuid) -> Result<Vec<GroupRow>, sqlx::Error> {
    sqlx::query_as::<_, GroupRow>(
        r#"
        SELECT sg.id, sg.created_by, sg.name, sg.description, sg.category,
               sg.subject, sg.is_private, sg.max_members, sg.created_at,
               (SELECT COUNT(*) FROM group_members gm
                WHERE gm.group_id = sg.id AND gm.is_active) AS member_count,
               EXISTS (SELECT 1 FROM group_members gm
                       WHERE gm.group_id = sg.id AND gm.user_id = $1 AND gm.is_active)
                   AS viewer_is_member
        FROM study_groups sg
        ORDER BY sg.created_at DESC
        "#,
    )
    .bind(viewer_id)
    .fetch_all(pool)
    .await
}

/// Join a group. Rejoining a left group reactivates the old row.
pub async fn join_group(pool: &PgPool, group_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO group_members (group_id, user_id, role)
        VALUES ($1, $2, 'Member')
        ON CONFLICT (group_id, user_id)
        DO UPDATE SET is_active = TRUE
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn leave_group(pool: &PgPool, group_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE group_members SET is_active = FALSE WHERE group_id = $1 AND user_id = $2",
    )
    .bind(group_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn is_member(pool: &PgPool, group_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM group_members
            WHERE group_id = $1 AND user_id = $2 AND is_active
        )
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn member_count(pool: &PgPool, group_id: Uuid) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM group_members WHERE group_id = $1 AND is_active",
    )
    .bind(group_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn insert_group_message(
    pool: &PgPool,
    group_id: Uuid,
    user_id: Uuid,
    content: &str,
) -> Result<GroupMessage, sqlx::Error> {
    sqlx::query_as::<_, GroupMessage>(
        r#"
        INSERT INTO group_messages (group_id, user_id, content)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .bind(content)
    .fetch_one(pool)
    .await
}

/// Group message with sender display fields, oldest first.
#[derive(Debug, sqlx::FromRow)]
pub struct GroupMessageRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn list_group_messages(
    pool: &PgPool,
    group_id: Uuid,
    limit: i64,
) -> Result<Vec<GroupMessageRow>, sqlx::Error> {
    sqlx::query_as::<_, GroupMessageRow>(
        r#"
        SELECT gm.id, gm.user_id, gm.content, up.name, up.avatar_url, gm.created_at
        FROM group_messages gm
        JOIN user_profiles up ON up.user_id = gm.user_id
        WHERE gm.group_id = $1
        ORDER BY gm.created_at
        LIMIT $2
        "#,
    )
    .bind(group_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
