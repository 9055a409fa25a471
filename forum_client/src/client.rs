use std::time::Duration;

use forum_core::{
    dto::{
        CommentView, GenerateRequest, GenerationReport, NewComment, NewPost, PostDetail,
        PostSummary, VoteOutcome, VoteRequest,
    },
    ids::{CommentId, PostId},
    voting::Direction,
};
use reqwest::{ClientBuilder, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};
use validator::Validate;

use crate::{cache::PostCache, error::ClientError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    message: String,
    #[serde(default)]
    needs_api_key: bool,
}

/// Why a call did not produce a value.
enum CallError {
    /// The server was never reached; the caller may fall back to the cache.
    Transport(reqwest::Error),
    /// The server answered with an error.
    Api(ClientError),
}

impl From<ClientError> for CallError {
    fn from(err: ClientError) -> Self {
        CallError::Api(err)
    }
}

/// Forum API client that owns a bounded cache of what it has seen.
pub struct ForumClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    cache: PostCache,
}

impl ForumClient {
    /// `username` is sent with every vote and used as the author of comments.
    pub fn new(base_url: impl Into<String>, username: impl Into<String>) -> Result<Self, ClientError> {
        let http = build_http(reqwest::Client::builder())?;
        Self::with_http(http, base_url, username)
    }

    pub fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let username = username.into();
        let length = username.chars().count();
        if username.trim().is_empty() || length > 50 {
            return Err(ClientError::Validation(
                "username must be between 1 and 50 chars".to_string(),
            ));
        }

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username,
            cache: PostCache::default(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn cache(&self) -> &PostCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut PostCache {
        &mut self.cache
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Recent posts. Served from the cache when the server is unreachable.
    pub async fn list_posts(&mut self) -> Result<Vec<PostSummary>, ClientError> {
        let req = self
            .http
            .get(self.url("/posts"))
            .query(&[("username", &self.username)]);

        match call::<Vec<PostSummary>>(req).await {
            Ok(posts) => {
                self.cache.replace_all(posts.clone());
                Ok(posts)
            }
            Err(CallError::Transport(err)) => {
                warn!(error = %err, "listing posts offline, serving cache");
                Ok(self.cache.summaries())
            }
            Err(CallError::Api(err)) => Err(err),
        }
    }

    /// One post with its comment tree.
    pub async fn post(&mut self, post_id: PostId) -> Result<PostDetail, ClientError> {
        let req = self
            .http
            .get(self.url(&format!("/posts/{post_id}")))
            .query(&[("username", &self.username)]);

        match call::<PostDetail>(req).await {
            Ok(detail) => {
                self.cache.upsert_detail(detail.clone());
                Ok(detail)
            }
            Err(CallError::Transport(err)) => {
                warn!(error = %err, %post_id, "fetching post offline, serving cache");
                self.cache.detail(post_id).ok_or(ClientError::Offline(err))
            }
            Err(CallError::Api(err)) => Err(err),
        }
    }

    pub async fn create_post(&mut self, new: NewPost) -> Result<PostSummary, ClientError> {
        new.validate()
            .map_err(|e| ClientError::Validation(e.to_string()))?;

        let req = self.http.post(self.url("/posts")).json(&new);
        match call::<PostSummary>(req).await {
            Ok(post) => {
                self.cache.upsert_summary(post.clone());
                Ok(post)
            }
            Err(CallError::Transport(err)) => {
                warn!(error = %err, "creating post offline");
                Ok(self.cache.add_local_post(new))
            }
            Err(CallError::Api(err)) => Err(err),
        }
    }

    pub async fn vote_post(
        &mut self,
        post_id: PostId,
        direction: Direction,
    ) -> Result<VoteOutcome, ClientError> {
        let req = self
            .http
            .post(self.url(&format!("/posts/{post_id}/vote")))
            .json(&self.vote_request(direction));

        match call::<VoteOutcome>(req).await {
            Ok(outcome) => {
                self.cache.set_post_vote(post_id, outcome);
                Ok(outcome)
            }
            Err(CallError::Transport(err)) => {
                warn!(error = %err, %post_id, "voting offline");
                self.cache
                    .apply_post_vote(post_id, direction)
                    .ok_or(ClientError::Offline(err))
            }
            Err(CallError::Api(err)) => Err(err),
        }
    }

    pub async fn vote_comment(
        &mut self,
        post_id: PostId,
        comment_id: CommentId,
        direction: Direction,
    ) -> Result<VoteOutcome, ClientError> {
        let req = self
            .http
            .post(self.url(&format!("/comments/{comment_id}/vote")))
            .json(&self.vote_request(direction));

        match call::<VoteOutcome>(req).await {
            Ok(outcome) => {
                self.cache.set_comment_vote(post_id, comment_id, outcome);
                Ok(outcome)
            }
            Err(CallError::Transport(err)) => {
                warn!(error = %err, %comment_id, "voting offline");
                self.cache
                    .apply_comment_vote(post_id, comment_id, direction)
                    .ok_or(ClientError::Offline(err))
            }
            Err(CallError::Api(err)) => Err(err),
        }
    }

    pub async fn add_comment(
        &mut self,
        post_id: PostId,
        content: impl Into<String>,
    ) -> Result<CommentView, ClientError> {
        let path = format!("/posts/{post_id}/comments");
        self.submit_comment(post_id, None, path, content.into()).await
    }

    pub async fn add_reply(
        &mut self,
        post_id: PostId,
        parent_id: CommentId,
        content: impl Into<String>,
    ) -> Result<CommentView, ClientError> {
        let path = format!("/posts/{post_id}/comments/{parent_id}/replies");
        self.submit_comment(post_id, Some(parent_id), path, content.into())
            .await
    }

    async fn submit_comment(
        &mut self,
        post_id: PostId,
        parent_id: Option<CommentId>,
        path: String,
        content: String,
    ) -> Result<CommentView, ClientError> {
        let new = NewComment {
            content,
            author: self.username.clone(),
        };
        new.validate()
            .map_err(|e| ClientError::Validation(e.to_string()))?;

        let req = self.http.post(self.url(&path)).json(&new);
        match call::<CommentView>(req).await {
            Ok(comment) => {
                self.cache.insert_comment(comment.clone());
                Ok(comment)
            }
            Err(CallError::Transport(err)) => {
                warn!(error = %err, %post_id, "commenting offline");
                self.cache
                    .add_local_comment(post_id, parent_id, new)
                    .ok_or(ClientError::Offline(err))
            }
            Err(CallError::Api(err)) => Err(err),
        }
    }

    /// Wipes everything on the server, then the cache. Not available offline.
    pub async fn delete_all_content(&mut self) -> Result<(), ClientError> {
        let req = self.http.delete(self.url("/all-content"));
        match execute(req).await {
            Ok(_) => {
                self.cache.clear();
                Ok(())
            }
            Err(CallError::Transport(err)) => Err(ClientError::Offline(err)),
            Err(CallError::Api(err)) => Err(err),
        }
    }

    /// Asks the server to generate content. A missing key surfaces as
    /// [`ClientError::NeedsApiKey`].
    pub async fn generate_content(
        &mut self,
        prompt: Option<String>,
        api_key: Option<String>,
    ) -> Result<GenerationReport, ClientError> {
        let body = GenerateRequest { prompt, api_key };
        let req = self.http.post(self.url("/generate-content")).json(&body);

        match call::<GenerationReport>(req).await {
            Ok(report) => Ok(report),
            Err(CallError::Transport(err)) => Err(ClientError::Offline(err)),
            Err(CallError::Api(err)) => Err(err),
        }
    }

    fn vote_request(&self, direction: Direction) -> VoteRequest {
        VoteRequest {
            value: direction.value(),
            username: self.username.clone(),
        }
    }
}

fn build_http(builder: ClientBuilder) -> Result<reqwest::Client, ClientError> {
    builder
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(ClientError::Setup)
}

async fn execute(req: RequestBuilder) -> Result<Response, CallError> {
    let resp = req.send().await.map_err(CallError::Transport)?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    debug!(%status, body = %body, "request failed");
    Err(error_from_response(status, &body).into())
}

async fn call<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, CallError> {
    let resp = execute(req).await?;
    let bytes = resp.bytes().await.map_err(CallError::Transport)?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()).into())
}

fn error_from_response(status: StatusCode, body: &str) -> ClientError {
    let (message, needs_api_key) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.needs_api_key),
        Err(_) => (body.to_string(), false),
    };

    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::BAD_REQUEST if needs_api_key => ClientError::NeedsApiKey(message),
        StatusCode::BAD_REQUEST => ClientError::Validation(message),
        _ => ClientError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forum_core::dto::NewPost;
    use forum_core::voting::VoteTag;

    // Nothing listens on port 1, so every request fails to connect
    const UNREACHABLE: &str = "http://127.0.0.1:1/";

    fn offline_client() -> ForumClient {
        ForumClient::new(UNREACHABLE, "alice").unwrap()
    }

    #[test]
    fn test_username_is_checked() {
        assert!(matches!(
            ForumClient::new(UNREACHABLE, " "),
            Err(ClientError::Validation(_))
        ));
        assert!(ForumClient::new(UNREACHABLE, "x".repeat(51)).is_err());
        assert_eq!(offline_client().url("/posts"), "http://127.0.0.1:1/api/posts");
    }

    #[test]
    fn test_broken_http_setup_is_not_offline() {
        let builder = reqwest::Client::builder().user_agent("forum\nclient");
        assert!(matches!(build_http(builder), Err(ClientError::Setup(_))));
        assert!(build_http(reqwest::Client::builder()).is_ok());
    }

    #[test]
    fn test_error_envelope_mapping() {
        let body = r#"{"error":{"code":400,"message":"key please","needsApiKey":true}}"#;
        assert!(matches!(
            error_from_response(StatusCode::BAD_REQUEST, body),
            ClientError::NeedsApiKey(m) if m == "key please"
        ));

        let body = r#"{"error":{"code":404,"message":"post not found"}}"#;
        assert!(matches!(
            error_from_response(StatusCode::NOT_FOUND, body),
            ClientError::NotFound(m) if m == "post not found"
        ));

        assert!(matches!(
            error_from_response(StatusCode::BAD_GATEWAY, "upstream down"),
            ClientError::Server { status: 502, message } if message == "upstream down"
        ));
    }

    #[tokio::test]
    async fn test_offline_listing_serves_cache() {
        let mut client = offline_client();
        assert!(client.list_posts().await.unwrap().is_empty());

        let created = client
            .create_post(NewPost {
                title: "Written offline".into(),
                content: String::new(),
                url: None,
                author: "alice".into(),
            })
            .await
            .unwrap();

        let listed = client.list_posts().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
    }

    #[tokio::test]
    async fn test_offline_votes_and_comments_apply_locally() {
        let mut client = offline_client();
        let post = client
            .create_post(NewPost {
                title: "Offline thread".into(),
                content: String::new(),
                url: None,
                author: "alice".into(),
            })
            .await
            .unwrap();

        let outcome = client.vote_post(post.id, Direction::Up).await.unwrap();
        assert_eq!(outcome, VoteOutcome { votes: 1, user_vote: VoteTag::Up });
        let outcome = client.vote_post(post.id, Direction::Down).await.unwrap();
        assert_eq!(outcome, VoteOutcome { votes: -1, user_vote: VoteTag::Down });

        let comment = client.add_comment(post.id, "hello").await.unwrap();
        assert_eq!(comment.author, "alice");
        let reply = client.add_reply(post.id, comment.id, "again").await.unwrap();

        let outcome = client
            .vote_comment(post.id, reply.id, Direction::Up)
            .await
            .unwrap();
        assert_eq!(outcome.votes, 1);

        let detail = client.post(post.id).await.unwrap();
        assert_eq!(detail.post.comment_count, 2);
        assert_eq!(detail.comments[0].replies[0].votes, 1);
    }

    #[tokio::test]
    async fn test_offline_without_cache_reports_offline() {
        let mut client = offline_client();

        assert!(matches!(
            client.post(PostId::new()).await,
            Err(ClientError::Offline(_))
        ));
        assert!(matches!(
            client.vote_post(PostId::new(), Direction::Up).await,
            Err(ClientError::Offline(_))
        ));
        assert!(matches!(
            client.delete_all_content().await,
            Err(ClientError::Offline(_))
        ));
        assert!(matches!(
            client.generate_content(None, None).await,
            Err(ClientError::Offline(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_the_network() {
        let mut client = offline_client();
        let result = client
            .create_post(NewPost {
                title: "No".into(),
                content: String::new(),
                url: None,
                author: "alice".into(),
            })
            .await;
        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert!(client.cache().is_empty());
    }
}
