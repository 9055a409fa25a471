//! Request and response bodies of the HTTP API, shared with the client crate.
//!
//! Field names go over the wire in camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::ids::{CommentId, PostId};
use crate::voting::VoteTag;

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Body of `POST /api/posts`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    #[validate(length(
        min = 3,
        max = 200,
        message = "Title length must be between 3 and 200 chars"
    ))]
    pub title: String,

    #[serde(default)]
    pub content: String,

    #[validate(length(max = 2048, message = "Url must be at most 2048 chars"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[validate(
        length(min = 1, max = 50, message = "Author length must be between 1 and 50 chars"),
        custom(function = "not_blank", message = "Author is required")
    )]
    pub author: String,
}

/// Body of both comment and reply creation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    #[validate(custom(function = "not_blank", message = "Content is required"))]
    pub content: String,

    #[validate(
        length(min = 1, max = 50, message = "Author length must be between 1 and 50 chars"),
        custom(function = "not_blank", message = "Author is required")
    )]
    pub author: String,
}

/// Body of the vote endpoints. `value` must be 1 or -1.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub value: i32,

    #[validate(
        length(min = 1, max = 50, message = "Username length must be between 1 and 50 chars"),
        custom(function = "not_blank", message = "Username is required")
    )]
    pub username: String,
}

/// Optional `?username=` on read endpoints, used to fill in `userVote`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewerQuery {
    #[serde(default)]
    pub username: Option<String>,
}

impl ViewerQuery {
    pub fn viewer(&self) -> Option<&str> {
        self.username.as_deref().filter(|u| !u.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub url: Option<String>,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub time_ago: String,
    pub votes: i32,
    pub comment_count: u64,
    #[serde(default)]
    pub user_vote: VoteTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: CommentId,
    pub post_id: PostId,
    pub parent_comment_id: Option<CommentId>,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub time_ago: String,
    pub votes: i32,
    #[serde(default)]
    pub user_vote: VoteTag,
    #[serde(default)]
    pub replies: Vec<CommentView>,
}

/// A post together with its comment forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostSummary,
    pub comments: Vec<CommentView>,
}

/// Result of one cast: the subject's new score and the voter's new tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub votes: i32,
    pub user_vote: VoteTag,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub posts_created: u64,
    pub comments_created: u64,
    pub skipped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_post_bounds() {
        let mut post = NewPost {
            title: "Hey".into(),
            content: String::new(),
            url: None,
            author: "alice".into(),
        };
        assert!(post.validate().is_ok());

        post.title = "Hi".into();
        assert!(post.validate().is_err());

        post.title = "x".repeat(201);
        assert!(post.validate().is_err());

        post.title = "x".repeat(200);
        post.author = "   ".into();
        assert!(post.validate().is_err());

        post.author = "a".repeat(51);
        assert!(post.validate().is_err());
    }

    #[test]
    fn test_blank_comment_is_rejected() {
        let comment = NewComment {
            content: "  \n".into(),
            author: "bob".into(),
        };
        let errors = comment.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("content"));
    }

    #[test]
    fn test_post_detail_flattens_summary_fields() {
        let detail = PostDetail {
            post: PostSummary {
                id: PostId::new(),
                title: "Title".into(),
                content: "Body".into(),
                url: None,
                author: "carol".into(),
                created_at: Utc::now(),
                time_ago: "just now".into(),
                votes: 3,
                comment_count: 0,
                user_vote: VoteTag::Up,
            },
            comments: vec![],
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["title"], "Title");
        assert_eq!(json["commentCount"], 0);
        assert_eq!(json["userVote"], 1);
        assert!(json["comments"].as_array().unwrap().is_empty());

        let back: PostDetail = serde_json::from_value(json).unwrap();
        assert_eq!(back, detail);
    }

    #[test]
    fn test_viewer_ignores_blank_username() {
        let q = ViewerQuery {
            username: Some(" ".into()),
        };
        assert_eq!(q.viewer(), None);
        assert_eq!(ViewerQuery::default().viewer(), None);
    }
}
