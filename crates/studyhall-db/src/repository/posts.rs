//! Social feed repository — posts, likes, comments, bookmarks, reposts.

use studyhall_common::models::social::{PostComment, SocialPost};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_post(
    pool: &PgPool,
    user_id: Uuid,
    content: &str,
    post_type: &str,
    image_url: Option<&str>,
    study_subject: Option<&str>,
    study_hours: i32,
) -> Result<SocialPost, sqlx::Error> {
    sqlx::query_as::<_, SocialPost>(
        r#"
        INSERT INTO social_posts (user_id, content, post_type, image_url, study_subject, study_hours)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(content)
    .bind(post_type)
    .bind(image_url)
    .bind(study_subject)
    .bind(study_hours)
    .fetch_one(pool)
    .await
}

pub async fn find_post(pool: &PgPool, id: Uuid) -> Result<Option<SocialPost>, sqlx::Error> {
    sqlx::query_as::<_, SocialPost>("SELECT * FROM social_posts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Feed row: post plus author display fields and the viewer's like/bookmark state.
#[derive(Debug, sqlx::FromRow)]
pub struct FeedRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub post_type: String,
    pub image_url: Option<String>,
    pub study_subject: Option<String>,
    pub study_hours: i32,
    pub likes_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
    pub original_post_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub author_streak: i32,
    pub liked_by_viewer: bool,
    pub bookmarked_by_viewer: bool,
}

/// Paged feed, newest first.
pub async fn list_feed(
    pool: &PgPool,
    viewer_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<FeedRow>, sqlx::Error> {
    sqlx::query_as::<_, FeedRow>(
        r#"
        SELECT sp.id, sp.user_id, sp.content, sp.post_type, sp.image_url,
               sp.study_subject, sp.study_hours, sp.likes_count, sp.comments_count,
               sp.shares_count, sp.original_post_id, sp.created_at,
               up.name AS author_name, up.avatar_url AS author_avatar,
               COALESCE(us.current_streak, 0) AS author_streak,
               EXISTS (SELECT 1 FROM post_likes pl
                       WHERE pl.post_id = sp.id AND pl.user_id = $1) AS liked_by_viewer,
               EXISTS (SELECT 1 FROM post_bookmarks pb
                       WHERE pb.post_id = sp.id AND pb.user_id = $1) AS bookmarked_by_viewer
        FROM social_posts sp
        JOIN user_profiles up ON up.user_id = sp.user_id
        LEFT JOIN user_stats us ON us.user_id = sp.user_id
        ORDER BY sp.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(viewer_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Toggle a like; returns the new liked state and updated count.
pub async fn toggle_like(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<(bool, i64), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let liked = removed == 0;
    if liked {
        sqlx::query("INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2)")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    let (count,): (i64,) = sqlx::query_as(
        r#"
        UPDATE social_posts
        SET likes_count = (SELECT COUNT(*) FROM post_likes WHERE post_id = $1)
        WHERE id = $1
        RETURNING likes_count
        "#,
    )
    .bind(post_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((liked, count))
}

/// Toggle a bookmark; returns whether the post is now bookmarked.
pub async fn toggle_bookmark(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let removed = sqlx::query("DELETE FROM post_bookmarks WHERE post_id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();

    if removed > 0 {
        return Ok(false);
    }
    sqlx::query("INSERT INTO post_bookmarks (post_id, user_id) VALUES ($1, $2)")
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(true)
}

/// Repost: a new post referencing the original, bumping its share count.
pub async fn repost(
    pool: &PgPool,
    user_id: Uuid,
    original_post_id: Uuid,
    content: &str,
) -> Result<SocialPost, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let post = sqlx::query_as::<_, SocialPost>(
        r#"
        INSERT INTO social_posts (user_id, content, post_type, original_post_id)
        VALUES ($1, $2, 'repost', $3)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(content)
    .bind(original_post_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE social_posts SET shares_count = shares_count + 1 WHERE id = $1")
        .bind(original_post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(post)
}

pub async fn create_comment(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
    content: &str,
) -> Result<PostComment, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let comment = sqlx::query_as::<_, PostComment>(
        r#"
        INSERT INTO post_comments (post_id, user_id, content)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .bind(content)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE social_posts SET comments_count = comments_count + 1 WHERE id = $1")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(comment)
}

/// Comment with author display fields, oldest first.
#[derive(Debug, sqlx::FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub likes_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub liked_by_viewer: bool,
}

pub async fn list_comments(
    pool: &PgPool,
    post_id: Uuid,
    viewer_id: Uuid,
) -> Result<Vec<CommentRow>, sqlx::Error> {
    sqlx::query_as::<_, CommentRow>(
        r#"
        SELECT pc.id, pc.user_id, pc.content, pc.likes_count, pc.created_at,
               up.name AS author_name, up.avatar_url AS author_avatar,
               EXISTS (SELECT 1 FROM comment_likes cl
                       WHERE cl.comment_id = pc.id AND cl.user_id = $2) AS liked_by_viewer
        FROM post_comments pc
        JOIN user_profiles up ON up.user_id = pc.user_id
        WHERE pc.post_id = $1 AND NOT pc.is_deleted
        ORDER BY pc.created_at
        "#,
    )
    .bind(post_id)
    .bind(viewer_id)
    .fetch_all(pool)
    .await
}

/// Toggle a comment like; returns the new liked state and updated count.
pub async fn toggle_comment_like(
    pool: &PgPool,
    comment_id: Uuid,
    user_id: Uuid,
) -> Result<(bool, i64), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2")
        .bind(comment_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let liked = removed == 0;
    if liked {
        sqlx::query("INSERT INTO comment_likes (comment_id, user_id) VALUES ($1, $2)")
            .bind(comment_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    let (count,): (i64,) = sqlx::query_as(
        r#"
        UPDATE post_comments
        SET likes_count = (SELECT COUNT(*) FROM comment_likes WHERE comment_id = $1)
        WHERE id = $1
        RETURNING likes_count
        "#,
    )
    .bind(comment_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((liked, count))
}

/// Users who liked a post, most recent first.
#[derive(Debug, sqlx::FromRow)]
pub struct LikerRow {
    pub user_id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
}

pub async fn list_likers(pool: &PgPool, post_id: Uuid) -> Result<Vec<LikerRow>, sqlx::Error> {
    sqlx::query_as::<_, LikerRow>(
        r#"
        SELECT pl.user_id, up.name, up.avatar_url
        FROM post_likes pl
        JOIN user_profiles up ON up.user_id = pl.user_id
        WHERE pl.post_id = $1
        ORDER BY pl.created_at DESC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
}

/// Most-liked posts of the last 24 hours.
pub async fn trending(
    pool: &PgPool,
    viewer_id: Uuid,
    limit: i64,
) -> Result<Vec<FeedRow>, sqlx::Error> {
    sqlx::query_as::<_, FeedRow>(
        r#"
        SELECT sp.id, sp.user_id, sp.content, sp.post_type, sp.image_url,
               sp.study_subject, sp.study_hours, sp.likes_count, sp.comments_count,
               sp.shares_count, sp.original_post_id, sp.created_at,
               up.name AS author_name, up.avatar_url AS author_avatar,
               COALESCE(us.current_streak, 0) AS author_streak,
               EXISTS (SELECT 1 FROM post_likes pl
                       WHERE pl.post_id = sp.id AND pl.user_id = $1) AS liked_by_viewer,
               EXISTS (SELECT 1 FROM post_bookmarks pb
                       WHERE pb.post_id = sp.id AND pb.user_id = $1) AS bookmarked_by_viewer
        FROM social_posts sp
        JOIN user_profiles up ON up.user_id = sp.user_id
        LEFT JOIN user_stats us ON us.user_id = sp.user_id
        WHERE sp.created_at > NOW() - INTERVAL '24 hours'
        ORDER BY sp.likes_count DESC, sp.created_at DESC
        LIMIT $2
        "#,
    )
    .bind(viewer_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn delete_post(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM social_posts WHERE id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
