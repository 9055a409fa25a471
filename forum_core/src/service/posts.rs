use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use thiserror::Error;
use validator::Validate;

use crate::{
    dto::{CommentView, NewPost, PostDetail, PostSummary},
    entity::prelude::*,
    ids::PostId,
    service::{comments::comment_view, validation_message, votes},
    thread::assemble,
    time_ago::time_ago,
    voting::VoteTag,
};

#[derive(Debug, Error)]
pub enum PostsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("post not found")]
    PostNotFound,

    #[error("{0}")]
    Validation(String),
}

#[derive(Clone)]
pub struct PostsService {
    db: DatabaseConnection,
}

impl PostsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a new post with a zero score
    pub async fn create_post(&self, new: NewPost) -> Result<PostModel, PostsServiceError> {
        new.validate()
            .map_err(|e| PostsServiceError::Validation(validation_message(&e)))?;

        Ok(insert_post(&self.db, new).await?)
    }

    /// Get a specific post by ID
    pub async fn get_post(&self, post_id: PostId) -> Result<PostModel, PostsServiceError> {
        Post::find_by_id(post_id)
            .one(&self.db)
            .await?
            .ok_or(PostsServiceError::PostNotFound)
    }

    /// The `limit` newest posts, newest first, with their comment counts.
    pub async fn list_recent(
        &self,
        limit: u64,
        viewer: Option<&str>,
    ) -> Result<Vec<PostSummary>, PostsServiceError> {
        let posts = Post::find()
            .order_by_desc(PostColumn::CreatedAt)
            .order_by_desc(PostColumn::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        let ids: Vec<PostId> = posts.iter().map(|p| p.id).collect();

        let mut counts: HashMap<PostId, u64> = HashMap::new();
        let owners: Vec<PostId> = Comment::find()
            .select_only()
            .column(CommentColumn::PostId)
            .filter(CommentColumn::PostId.is_in(ids.clone()))
            .into_tuple()
            .all(&self.db)
            .await?;
        for post_id in owners {
            *counts.entry(post_id).or_default() += 1;
        }

        let tags = match viewer {
            Some(viewer) => votes::post_tags(&self.db, viewer, ids).await?,
            None => HashMap::new(),
        };

        let now = Utc::now();
        Ok(posts
            .into_iter()
            .map(|post| {
                let comment_count = counts.get(&post.id).copied().unwrap_or(0);
                let user_vote = tags.get(&post.id).copied().unwrap_or_default();
                summarize(post, comment_count, user_vote, now)
            })
            .collect())
    }

    /// A post with its whole comment forest.
    pub async fn get_post_detail(
        &self,
        post_id: PostId,
        viewer: Option<&str>,
    ) -> Result<PostDetail, PostsServiceError> {
        let post = self.get_post(post_id).await?;

        let comments = Comment::find()
            .filter(CommentColumn::PostId.eq(post_id))
            .order_by_asc(CommentColumn::CreatedAt)
            .order_by_asc(CommentColumn::Id)
            .all(&self.db)
            .await?;

        let (post_tag, comment_tags) = match viewer {
            Some(viewer) => (
                votes::post_tags(&self.db, viewer, vec![post_id])
                    .await?
                    .remove(&post_id)
                    .unwrap_or_default(),
                votes::comment_tags(&self.db, viewer, post_id).await?,
            ),
            None => (VoteTag::Neutral, HashMap::new()),
        };

        let now = Utc::now();
        let tree: Vec<CommentView> = assemble(&comments, |comment, replies| {
            let tag = comment_tags.get(&comment.id).copied().unwrap_or_default();
            comment_view(comment, tag, replies, now)
        });

        Ok(PostDetail {
            post: summarize(post, comments.len() as u64, post_tag, now),
            comments: tree,
        })
    }
}

pub(crate) async fn insert_post<C: ConnectionTrait>(
    conn: &C,
    new: NewPost,
) -> Result<PostModel, DbErr> {
    let post = PostActiveModel {
        id: Set(PostId::new()),
        title: Set(new.title),
        content: Set(new.content),
        url: Set(new.url.filter(|u| !u.trim().is_empty())),
        author: Set(new.author),
        created_at: Set(Utc::now()),
        votes: Set(0),
    };

    Post::insert(post).exec_with_returning(conn).await
}

pub(crate) fn summarize(
    post: PostModel,
    comment_count: u64,
    user_vote: VoteTag,
    now: DateTime<Utc>,
) -> PostSummary {
    PostSummary {
        id: post.id,
        time_ago: time_ago(post.created_at, now),
        title: post.title,
        content: post.content,
        url: post.url,
        author: post.author,
        created_at: post.created_at,
        votes: post.votes,
        comment_count,
        user_vote,
    }
}
