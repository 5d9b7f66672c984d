//! Social feed routes — posts, likes, comments, bookmarks, reposts.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use studyhall_common::{
    models::social::{
        CreateCommentRequest, CreatePostRequest, PostAuthor, PostComment, SocialPost,
    },
    validation::{require_text, validate_request},
    HallError, HallResult,
};
use studyhall_db::repository::posts;
use uuid::Uuid;

use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/posts", get(feed).post(create_post))
        .route("/posts/trending", get(trending))
        .route("/posts/{id}", delete(delete_post))
        .route("/posts/{id}/like", post(like_post))
        .route("/posts/{id}/likes", get(post_likers))
        .route("/posts/{id}/bookmark", post(bookmark_post))
        .route("/posts/{id}/repost", post(repost_post))
        .route("/posts/{id}/comments", get(list_comments).post(add_comment))
        .route("/comments/{id}/like", post(like_comment))
}

#[derive(Serialize)]
struct PostView {
    id: Uuid,
    author: PostAuthor,
    content: String,
    #[serde(rename = "type")]
    post_type: String,
    image_url: Option<String>,
    study_subject: Option<String>,
    study_hours: i32,
    likes: i64,
    comments: i64,
    shares: i64,
    original_post_id: Option<Uuid>,
    liked: bool,
    bookmarked: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<posts::FeedRow> for PostView {
    fn from(row: posts::FeedRow) -> Self {
        Self {
            id: row.id,
            author: PostAuthor {
                id: row.user_id,
                name: row.author_name,
                avatar: row.author_avatar,
                streak: row.author_streak,
            },
            content: row.content,
            post_type: row.post_type,
            image_url: row.image_url,
            study_subject: row.study_subject,
            study_hours: row.study_hours,
            likes: row.likes_count,
            comments: row.comments_count,
            shares: row.shares_count,
            original_post_id: row.original_post_id,
            liked: row.liked_by_viewer,
            bookmarked: row.bookmarked_by_viewer,
            created_at: row.created_at,
        }
    }
}

#[derive(Deserialize)]
struct FeedQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

/// GET /api/v1/posts
async fn feed(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<FeedQuery>,
) -> HallResult<Json<Vec<PostView>>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let rows = posts::list_feed(&state.db.pool, auth.user_id, limit, offset).await?;
    Ok(Json(rows.into_iter().map(PostView::from).collect()))
}

/// GET /api/v1/posts/trending
///
/// Most-liked posts of the last 24 hours.
async fn trending(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> HallResult<Json<Vec<PostView>>> {
    let rows = posts::trending(&state.db.pool, auth.user_id, 20).await?;
    Ok(Json(rows.into_iter().map(PostView::from).collect()))
}

/// POST /api/v1/posts
async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreatePostRequest>,
) -> HallResult<Json<SocialPost>> {
    validate_request(&body)?;
    require_text(&body.content, "Post content")?;

    let post = posts::create_post(
        &state.db.pool,
        auth.user_id,
        body.content.trim(),
        &body.post_type,
        body.image_url.as_deref(),
        body.study_subject.as_deref(),
        body.study_hours.unwrap_or(0),
    )
    .await?;
    Ok(Json(post))
}

#[derive(Serialize)]
struct LikeResponse {
    liked: bool,
    likes: i64,
}

/// POST /api/v1/posts/{id}/like
async fn like_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<Uuid>,
) -> HallResult<Json<LikeResponse>> {
    posts::find_post(&state.db.pool, post_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "Post".into(),
        })?;

    let (liked, likes) = posts::toggle_like(&state.db.pool, post_id, auth.user_id).await?;
    Ok(Json(LikeResponse { liked, likes }))
}

#[derive(Serialize)]
struct LikerView {
    user_id: Uuid,
    name: String,
    avatar: Option<String>,
}

/// GET /api/v1/posts/{id}/likes
async fn post_likers(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<Uuid>,
) -> HallResult<Json<Vec<LikerView>>> {
    let rows = posts::list_likers(&state.db.pool, post_id).await?;
    let views = rows
        .into_iter()
        .map(|row| LikerView {
            user_id: row.user_id,
            name: row.name,
            avatar: row.avatar_url,
        })
        .collect();
    Ok(Json(views))
}

#[derive(Serialize)]
struct BookmarkResponse {
    bookmarked: bool,
}

/// POST /api/v1/posts/{id}/bookmark
async fn bookmark_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<Uuid>,
) -> HallResult<Json<BookmarkResponse>> {
    posts::find_post(&state.db.pool, post_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "Post".into(),
        })?;

    let bookmarked = posts::toggle_bookmark(&state.db.pool, post_id, auth.user_id).await?;
    Ok(Json(BookmarkResponse { bookmarked }))
}

#[derive(Deserialize)]
struct RepostRequest {
    #[serde(default)]
    content: String,
}

/// POST /api/v1/posts/{id}/repost
async fn repost_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<Uuid>,
    Json(body): Json<RepostRequest>,
) -> HallResult<Json<SocialPost>> {
    posts::find_post(&state.db.pool, post_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "Post".into(),
        })?;

    let post = posts::repost(&state.db.pool, auth.user_id, post_id, body.content.trim()).await?;
    Ok(Json(post))
}

#[derive(Serialize)]
struct CommentView {
    id: Uuid,
    author: PostAuthor,
    content: String,
    likes: i64,
    liked: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

/// GET /api/v1/posts/{id}/comments
async fn list_comments(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<Uuid>,
) -> HallResult<Json<Vec<CommentView>>> {
    let rows = posts::list_comments(&state.db.pool, post_id, auth.user_id).await?;
    let views = rows
        .into_iter()
        .map(|row| CommentView {
            id: row.id,
            author: PostAuthor {
                id: row.user_id,
                name: row.author_name,
                avatar: row.author_avatar,
                streak: 0,
            },
            content: row.content,
            likes: row.likes_count,
            liked: row.liked_by_viewer,
            created_at: row.created_at,
        })
        .collect();
    Ok(Json(views))
}

/// POST /api/v1/posts/{id}/comments
async fn add_comment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<Uuid>,
    Json(body): Json<CreateCommentRequest>,
) -> HallResult<Json<PostComment>> {
    validate_request(&body)?;
    require_text(&body.content, "Comment")?;

    posts::find_post(&state.db.pool, post_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "Post".into(),
        })?;

    let comment =
        posts::create_comment(&state.db.pool, post_id, auth.user_id, body.content.trim()).await?;
    Ok(Json(comment))
}

/// POST /api/v1/comments/{id}/like
async fn like_comment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(comment_id): Path<Uuid>,
) -> HallResult<Json<LikeResponse>> {
    let (liked, likes) = posts::toggle_comment_like(&state.db.pool, comment_id, auth.user_id)
        .await
        .map_err(|e| match e {
            // FK violation means the comment is gone, not a server fault.
            sqlx::Error::Database(ref db) if db.constraint().is_some() => HallError::NotFound {
                resource: "Comment".into(),
            },
            other => HallError::Database(other),
        })?;
    Ok(Json(LikeResponse { liked, likes }))
}

/// DELETE /api/v1/posts/{id}
async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<Uuid>,
) -> HallResult<StatusCode> {
    let deleted = posts::delete_post(&state.db.pool, post_id, auth.user_id).await?;
    if !deleted {
        return Err(HallError::NotFound {
            resource: "Post".into(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}
