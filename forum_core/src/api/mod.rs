pub mod comments;
pub mod content;
pub mod posts;
pub mod votes;


use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::{header::CONTENT_TYPE, request::Parts, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::de::DeserializeOwned;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::{
    config::{ForumConfig, GenerationConfig},
    generation::GenerationError,
    service::{
        comments::{CommentsService, CommentsServiceError},
        content::{ContentService, ContentServiceError},
        posts::{PostsService, PostsServiceError},
        votes::{VotesService, VotesServiceError},
    },
};

/// Settings the handlers read at request time.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub recent_posts_limit: u64,
    pub allowed_origins: Vec<String>,
    pub generation: GenerationConfig,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostsService,
    pub comments: CommentsService,
    pub votes: VotesService,
    pub content: ContentService,
    pub settings: Arc<ApiSettings>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: &ForumConfig) -> Self {
        Self {
            posts: PostsService::new(db.clone()),
            comments: CommentsService::new(db.clone()),
            votes: VotesService::new(db.clone()),
            content: ContentService::new(db),
            settings: Arc::new(ApiSettings {
                recent_posts_limit: config.recent_posts_limit,
                allowed_origins: config.allowed_origins.clone(),
                generation: config.generation.clone(),
            }),
            http: reqwest::Client::new(),
        }
    }
}

/// Build the forum API router, mounted under `/api`.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.allowed_origins);

    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(votes::routes())
        .merge(content::routes())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}

/// Standard API error response body.
#[derive(Debug)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
    pub needs_api_key: bool,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            needs_api_key: false,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    fn internal(err: &dyn std::error::Error) -> Self {
        error!(error = %err, source = ?err.source(), "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut error = serde_json::json!({
            "code": self.code,
            "message": self.message,
        });
        if self.needs_api_key {
            error["needsApiKey"] = serde_json::Value::Bool(true);
        }
        (status, Json(serde_json::json!({ "error": error }))).into_response()
    }
}

impl From<PostsServiceError> for ApiError {
    fn from(err: PostsServiceError) -> Self {
        match err {
            PostsServiceError::PostNotFound => ApiError::not_found(err.to_string()),
            PostsServiceError::Validation(msg) => ApiError::bad_request(msg),
            PostsServiceError::DbError(_) => ApiError::internal(&err),
        }
    }
}

impl From<CommentsServiceError> for ApiError {
    fn from(err: CommentsServiceError) -> Self {
        match err {
            CommentsServiceError::PostNotFound | CommentsServiceError::CommentNotFound => {
                ApiError::not_found(err.to_string())
            }
            CommentsServiceError::Validation(msg) => ApiError::bad_request(msg),
            CommentsServiceError::DbError(_) => ApiError::internal(&err),
        }
    }
}

impl From<VotesServiceError> for ApiError {
    fn from(err: VotesServiceError) -> Self {
        match err {
            VotesServiceError::PostNotFound | VotesServiceError::CommentNotFound => {
                ApiError::not_found(err.to_string())
            }
            VotesServiceError::InvalidUsername => ApiError::bad_request(err.to_string()),
            VotesServiceError::Conflict => ApiError::new(StatusCode::CONFLICT, err.to_string()),
            VotesServiceError::DbError(_) => ApiError::internal(&err),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::MissingApiKey => ApiError {
                needs_api_key: true,
                ..ApiError::bad_request(err.to_string())
            },
            GenerationError::Network(_)
            | GenerationError::Service { .. }
            | GenerationError::EmptyResponse
            | GenerationError::NoJson
            | GenerationError::Decode(_) => {
                warn!(error = %err, "content generation failed");
                ApiError::new(StatusCode::BAD_GATEWAY, err.to_string())
            }
        }
    }
}

impl From<ContentServiceError> for ApiError {
    fn from(err: ContentServiceError) -> Self {
        match err {
            ContentServiceError::Generation(inner) => inner.into(),
            ContentServiceError::DbError(_) => ApiError::internal(&err),
        }
    }
}

/// `Json` that reports malformed bodies in the standard error shape.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_error(rejection)),
        }
    }
}

fn rejection_error(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}

/// `Path` that reports unparsable ids in the standard error shape.
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(path_error(rejection)),
        }
    }
}

fn path_error(rejection: PathRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}
