//! Content generation through an external text-generation service.
//!
//! The service is asked for a JSON document of the shape
//! `{"posts": [{"title", "content", "author", "comments": [{"content", "author"}]}]}`.
//! Replies often wrap that document in prose, so the outermost `{...}` span
//! of the first text block is what gets parsed. Individual fields are kept
//! optional here; incomplete items are dropped later by the content service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::GenerationConfig;

pub const DEFAULT_PROMPT: &str =
    "A lively general-interest community forum about technology, hobbies and everyday life.";

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("an API key is required for content generation")]
    MissingApiKey,

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("generation service responded {status}: {message}")]
    Service { status: u16, message: String },

    #[error("generation response contained no text")]
    EmptyResponse,

    #[error("generation response contained no JSON object")]
    NoJson,

    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GeneratedComment {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GeneratedPost {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub comments: Vec<GeneratedComment>,
}

#[derive(Deserialize)]
struct GeneratedBatch {
    #[serde(default)]
    posts: Vec<GeneratedPost>,
}

/// Something that can turn a free-text prompt into forum content.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<GeneratedPost>, GenerationError>;
}

/// Returns the span from the first `{` to the last `}`, if any.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Parses the posts out of a raw text reply.
pub fn parse_generated(text: &str) -> Result<Vec<GeneratedPost>, GenerationError> {
    let json = extract_json_object(text).ok_or(GenerationError::NoJson)?;
    let batch: GeneratedBatch = serde_json::from_str(json)?;
    Ok(batch.posts)
}

fn instructions(prompt: &str) -> String {
    format!(
        "Write forum content for this community: {prompt}\n\
         Respond with a single JSON object of the form \
         {{\"posts\": [{{\"title\": string, \"content\": string, \"author\": string, \
         \"comments\": [{{\"content\": string, \"author\": string}}]}}]}}. \
         Titles are 3 to 200 characters and author names at most 50."
    )
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Calls a messages-style HTTP endpoint.
pub struct HttpGenerator {
    http: reqwest::Client,
    config: GenerationConfig,
    api_key: String,
}

impl HttpGenerator {
    pub fn new(http: reqwest::Client, config: GenerationConfig, api_key: String) -> Self {
        Self {
            http,
            config,
            api_key,
        }
    }
}

#[async_trait]
impl ContentGenerator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<GeneratedPost>, GenerationError> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user",
                content: instructions(prompt),
            }],
        };

        let resp = self
            .http
            .post(&self.config.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Service { status, message });
        }

        let reply: MessagesResponse = resp.json().await?;
        let text = reply
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or(GenerationError::EmptyResponse)?;

        debug!(chars = text.len(), "generation reply received");
        parse_generated(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};

    #[test]
    fn test_extracts_outermost_object() {
        let text = "Sure! Here you go:\n{\"posts\": [{\"title\": \"a {b}\"}]}\nEnjoy.";
        assert_eq!(
            extract_json_object(text),
            Some("{\"posts\": [{\"title\": \"a {b}\"}]}")
        );
        assert_eq!(extract_json_object("no braces"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_parse_keeps_incomplete_items() {
        let posts = parse_generated(
            r#"{"posts": [
                {"title": "Complete post", "content": "c", "author": "a",
                 "comments": [{"content": "x", "author": "y"}, {"content": "z"}]},
                {"content": "no title"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].comments[1].author, None);
        assert_eq!(posts[1].title, None);
        assert!(posts[1].comments.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_generated("nothing"), Err(GenerationError::NoJson)));
        assert!(matches!(
            parse_generated("{\"posts\": 5}"),
            Err(GenerationError::Decode(_))
        ));
    }

    async fn spawn_endpoint(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1/messages")
    }

    fn config(endpoint: String) -> GenerationConfig {
        GenerationConfig {
            endpoint,
            model: "test-model".into(),
            max_tokens: 64,
            api_key: None,
        }
    }

    #[tokio::test]
    async fn test_http_generator_reads_first_text_block() {
        let router = Router::new().route(
            "/v1/messages",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers["x-api-key"], "secret");
                assert_eq!(body["model"], "test-model");
                Json(serde_json::json!({
                    "content": [
                        {"type": "text", "text": "Here: {\"posts\": [{\"title\": \"Generated\", \"content\": \"body\", \"author\": \"bot\"}]}"}
                    ]
                }))
            }),
        );
        let endpoint = spawn_endpoint(router).await;

        let generator = HttpGenerator::new(reqwest::Client::new(), config(endpoint), "secret".into());
        let posts = generator.generate("anything").await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title.as_deref(), Some("Generated"));
    }

    #[tokio::test]
    async fn test_http_generator_surfaces_service_errors() {
        let router = Router::new().route(
            "/v1/messages",
            post(|| async { (axum::http::StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let endpoint = spawn_endpoint(router).await;

        let generator = HttpGenerator::new(reqwest::Client::new(), config(endpoint), "nope".into());
        let err = generator.generate("anything").await.unwrap_err();
        assert!(matches!(err, GenerationError::Service { status: 401, ref message } if message == "bad key"));
    }
}
