use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use validator::Validate;

use super::{ApiError, AppState, JsonBody, PathParam};
use crate::{
    dto::{VoteOutcome, VoteRequest},
    ids::{CommentId, PostId},
    service::{validation_message, votes::VoteSubject},
    voting::Direction,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/vote", post(vote_post))
        .route("/comments/{id}/vote", post(vote_comment))
}

async fn vote_post(
    State(state): State<AppState>,
    PathParam(id): PathParam<PostId>,
    JsonBody(body): JsonBody<VoteRequest>,
) -> Result<Json<VoteOutcome>, ApiError> {
    cast(&state, VoteSubject::Post(id), body).await
}

async fn vote_comment(
    State(state): State<AppState>,
    PathParam(id): PathParam<CommentId>,
    JsonBody(body): JsonBody<VoteRequest>,
) -> Result<Json<VoteOutcome>, ApiError> {
    cast(&state, VoteSubject::Comment(id), body).await
}

async fn cast(
    state: &AppState,
    subject: VoteSubject,
    body: VoteRequest,
) -> Result<Json<VoteOutcome>, ApiError> {
    body.validate()
        .map_err(|e| ApiError::bad_request(validation_message(&e)))?;
    let direction =
        Direction::try_from(body.value).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let outcome = state
        .votes
        .cast_vote(subject, &body.username, direction)
        .await?;
    Ok(Json(outcome))
}
