use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use thiserror::Error;
use validator::Validate;

use crate::{
    dto::{CommentView, NewComment},
    entity::prelude::*,
    ids::{CommentId, PostId},
    service::validation_message,
    thread::{build_tree, CommentNode},
    time_ago::time_ago,
    voting::VoteTag,
};

#[derive(Debug, Error)]
pub enum CommentsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("post not found")]
    PostNotFound,

    #[error("comment not found")]
    CommentNotFound,

    #[error("{0}")]
    Validation(String),
}

#[derive(Clone)]
pub struct CommentsService {
    db: DatabaseConnection,
}

impl CommentsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Add a top-level comment to a post
    pub async fn add_comment(
        &self,
        post_id: PostId,
        new: NewComment,
    ) -> Result<CommentModel, CommentsServiceError> {
        validate(&new)?;
        self.require_post(post_id).await?;

        Ok(insert_comment(&self.db, post_id, None, new).await?)
    }

    /// Reply to an existing comment. The parent must belong to `post_id`.
    pub async fn add_reply(
        &self,
        post_id: PostId,
        parent_id: CommentId,
        new: NewComment,
    ) -> Result<CommentModel, CommentsServiceError> {
        validate(&new)?;
        self.require_post(post_id).await?;

        let parent = Comment::find_by_id(parent_id)
            .filter(CommentColumn::PostId.eq(post_id))
            .one(&self.db)
            .await?
            .ok_or(CommentsServiceError::CommentNotFound)?;

        Ok(insert_comment(&self.db, post_id, Some(parent.id), new).await?)
    }

    pub async fn get_comment(
        &self,
        comment_id: CommentId,
    ) -> Result<CommentModel, CommentsServiceError> {
        Comment::find_by_id(comment_id)
            .one(&self.db)
            .await?
            .ok_or(CommentsServiceError::CommentNotFound)
    }

    /// All comments of a post arranged as reply trees, oldest first.
    pub async fn thread(
        &self,
        post_id: PostId,
    ) -> Result<Vec<CommentNode<CommentModel>>, CommentsServiceError> {
        self.require_post(post_id).await?;

        let comments = Comment::find()
            .filter(CommentColumn::PostId.eq(post_id))
            .order_by_asc(CommentColumn::CreatedAt)
            .order_by_asc(CommentColumn::Id)
            .all(&self.db)
            .await?;

        Ok(build_tree(&comments))
    }

    async fn require_post(&self, post_id: PostId) -> Result<(), CommentsServiceError> {
        let exists = Post::find_by_id(post_id).count(&self.db).await? > 0;
        if !exists {
            return Err(CommentsServiceError::PostNotFound);
        }
        Ok(())
    }
}

fn validate(new: &NewComment) -> Result<(), CommentsServiceError> {
    new.validate()
        .map_err(|e| CommentsServiceError::Validation(validation_message(&e)))
}

pub(crate) async fn insert_comment<C: ConnectionTrait>(
    conn: &C,
    post_id: PostId,
    parent_comment_id: Option<CommentId>,
    new: NewComment,
) -> Result<CommentModel, DbErr> {
    let comment = CommentActiveModel {
        id: Set(CommentId::new()),
        post_id: Set(post_id),
        parent_comment_id: Set(parent_comment_id),
        author: Set(new.author),
        content: Set(new.content),
        created_at: Set(Utc::now()),
        votes: Set(0),
    };

    Comment::insert(comment).exec_with_returning(conn).await
}

pub(crate) fn comment_view(
    comment: &CommentModel,
    user_vote: VoteTag,
    replies: Vec<CommentView>,
    now: DateTime<Utc>,
) -> CommentView {
    CommentView {
        id: comment.id,
        post_id: comment.post_id,
        parent_comment_id: comment.parent_comment_id,
        author: comment.author.clone(),
        content: comment.content.clone(),
        created_at: comment.created_at,
        time_ago: time_ago(comment.created_at, now),
        votes: comment.votes,
        user_vote,
        replies,
    }
}
