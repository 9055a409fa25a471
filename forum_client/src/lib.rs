//! HTTP client for the forum API with an offline fallback.
//!
//! [`ForumClient`] wraps the REST endpoints and mirrors what it fetches in a
//! bounded [`PostCache`]. When the server cannot be reached, reads are served
//! from the cache and writes (votes, comments, posts) are applied to it
//! locally using the same vote and threading rules the server uses, so the
//! two agree once the next successful fetch replaces the cached state.
//!
//! ```no_run
//! use forum_client::ForumClient;
//! use forum_core::voting::Direction;
//!
//! # async fn demo() -> Result<(), forum_client::ClientError> {
//! let mut client = ForumClient::new("http://127.0.0.1:5000", "alice")?;
//! let posts = client.list_posts().await?;
//! if let Some(first) = posts.first() {
//!     client.vote_post(first.id, Direction::Up).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod error;

pub use cache::{CachedComment, CachedPost, PostCache};
pub use client::ForumClient;
pub use error::ClientError;
