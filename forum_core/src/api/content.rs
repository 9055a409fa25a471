use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use tracing::info;

use super::{ApiError, AppState, JsonBody};
use crate::{
    dto::{GenerateRequest, GenerationReport},
    generation::{GenerationError, HttpGenerator},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/all-content", delete(delete_all_content))
        .route("/generate-content", post(generate_content))
}

async fn delete_all_content(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.content.delete_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn generate_content(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<GenerateRequest>,
) -> Result<Json<GenerationReport>, ApiError> {
    // A key sent with the request wins over the configured one
    let api_key = body
        .api_key
        .filter(|k| !k.trim().is_empty())
        .or_else(|| state.settings.generation.api_key.clone())
        .ok_or(GenerationError::MissingApiKey)?;

    let generator = HttpGenerator::new(
        state.http.clone(),
        state.settings.generation.clone(),
        api_key,
    );

    info!("generating content");
    let report = state
        .content
        .generate(&generator, body.prompt.as_deref())
        .await?;
    Ok(Json(report))
}
