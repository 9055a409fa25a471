use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use super::{ApiError, AppState, JsonBody, PathParam};
use crate::{
    dto::{CommentView, NewComment},
    ids::{CommentId, PostId},
    service::comments::comment_view,
    voting::VoteTag,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comments", post(add_comment))
        .route("/posts/{id}/comments/{comment_id}/replies", post(add_reply))
}

async fn add_comment(
    State(state): State<AppState>,
    PathParam(post_id): PathParam<PostId>,
    JsonBody(body): JsonBody<NewComment>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let comment = state.comments.add_comment(post_id, body).await?;
    let view = comment_view(&comment, VoteTag::Neutral, Vec::new(), Utc::now());
    Ok((StatusCode::CREATED, Json(view)))
}

async fn add_reply(
    State(state): State<AppState>,
    PathParam((post_id, parent_id)): PathParam<(PostId, CommentId)>,
    JsonBody(body): JsonBody<NewComment>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let reply = state.comments.add_reply(post_id, parent_id, body).await?;
    let view = comment_view(&reply, VoteTag::Neutral, Vec::new(), Utc::now());
    Ok((StatusCode::CREATED, Json(view)))
}
