use axum::{
    extract::{Query, State},
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use super::{ApiError, AppState, JsonBody, PathParam};
use crate::{
    dto::{NewPost, PostDetail, PostSummary, ViewerQuery},
    ids::PostId,
    service::posts::summarize,
    voting::VoteTag,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(get_post))
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<Vec<PostSummary>>, ApiError> {
    let posts = state
        .posts
        .list_recent(state.settings.recent_posts_limit, query.viewer())
        .await?;
    Ok(Json(posts))
}

async fn get_post(
    State(state): State<AppState>,
    PathParam(id): PathParam<PostId>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<PostDetail>, ApiError> {
    let detail = state.posts.get_post_detail(id, query.viewer()).await?;
    Ok(Json(detail))
}

async fn create_post(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<NewPost>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.create_post(body).await?;
    let location = format!("/api/posts/{}", post.id);
    let summary = summarize(post, 0, VoteTag::Neutral, Utc::now());

    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(summary)))
}
