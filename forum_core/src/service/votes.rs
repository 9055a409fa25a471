use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{sea_query::Expr, ConnectionTrait, DatabaseConnection, SqlErr};
use thiserror::Error;
use tracing::debug;

use crate::{
    dto::VoteOutcome,
    entity::prelude::*,
    ids::{CommentId, PostId, VoteId},
    voting::{cast, Direction, LedgerChange, VoteTag},
};

#[derive(Debug, Error)]
pub enum VotesServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("post not found")]
    PostNotFound,

    #[error("comment not found")]
    CommentNotFound,

    #[error("username must be between 1 and 50 chars")]
    InvalidUsername,

    #[error("a concurrent vote by the same user was recorded first")]
    Conflict,
}

/// What a vote is attached to. A vote row has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteSubject {
    Post(PostId),
    Comment(CommentId),
}

impl VoteSubject {
    fn ledger_filter(self) -> sea_orm::sea_query::SimpleExpr {
        match self {
            VoteSubject::Post(id) => VoteColumn::PostId.eq(id),
            VoteSubject::Comment(id) => VoteColumn::CommentId.eq(id),
        }
    }

    fn not_found(self) -> VotesServiceError {
        match self {
            VoteSubject::Post(_) => VotesServiceError::PostNotFound,
            VoteSubject::Comment(_) => VotesServiceError::CommentNotFound,
        }
    }
}

#[derive(Clone)]
pub struct VotesService {
    db: DatabaseConnection,
}

impl VotesService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records one click of `direction` by `username` on `subject`.
    ///
    /// The ledger row and the subject's counter change in the same
    /// transaction, so the counter always equals [`Self::tally`].
    pub async fn cast_vote(
        &self,
        subject: VoteSubject,
        username: &str,
        direction: Direction,
    ) -> Result<VoteOutcome, VotesServiceError> {
        if username.trim().is_empty() || username.chars().count() > 50 {
            return Err(VotesServiceError::InvalidUsername);
        }

        let txn = self.db.begin().await?;

        if stored_score(&txn, subject).await?.is_none() {
            return Err(subject.not_found());
        }

        let existing = Vote::find()
            .filter(subject.ledger_filter())
            .filter(VoteColumn::Username.eq(username))
            .one(&txn)
            .await?;

        let current: VoteTag = existing
            .as_ref()
            .and_then(|row| Direction::try_from(row.value).ok())
            .into();
        let transition = cast(current, direction);

        match (existing, transition.change) {
            (None, LedgerChange::Insert(direction)) => {
                let (post_id, comment_id) = match subject {
                    VoteSubject::Post(id) => (Some(id), None),
                    VoteSubject::Comment(id) => (None, Some(id)),
                };
                let vote = VoteActiveModel {
                    id: Set(VoteId::new()),
                    username: Set(username.to_string()),
                    value: Set(direction.value()),
                    created_at: Set(Utc::now()),
                    post_id: Set(post_id),
                    comment_id: Set(comment_id),
                };
                Vote::insert(vote).exec(&txn).await.map_err(|err| {
                    match err.sql_err() {
                        Some(SqlErr::UniqueConstraintViolation(_)) => VotesServiceError::Conflict,
                        _ => VotesServiceError::DbError(err),
                    }
                })?;
            }
            (Some(row), LedgerChange::Remove(_)) => {
                Vote::delete_by_id(row.id).exec(&txn).await?;
            }
            (Some(row), LedgerChange::Flip { to, .. }) => {
                let mut vote: VoteActiveModel = row.into();
                vote.value = Set(to.value());
                vote.update(&txn).await?;
            }
            (row, change) => {
                return Err(VotesServiceError::DbError(DbErr::Custom(format!(
                    "ledger change {change:?} does not fit stored row {row:?}"
                ))));
            }
        }

        adjust_score(&txn, subject, transition.delta).await?;
        let votes = stored_score(&txn, subject)
            .await?
            .ok_or_else(|| subject.not_found())?;

        txn.commit().await?;

        debug!(?subject, username, delta = transition.delta, votes, "vote cast");
        Ok(VoteOutcome {
            votes,
            user_vote: transition.tag,
        })
    }

    /// Sum of the live ledger rows for `subject`, recomputed from scratch.
    pub async fn tally(&self, subject: VoteSubject) -> Result<i32, VotesServiceError> {
        let values: Vec<i32> = Vote::find()
            .select_only()
            .column(VoteColumn::Value)
            .filter(subject.ledger_filter())
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(values.into_iter().sum())
    }

    /// The denormalised counter stored on the subject row.
    pub async fn score(&self, subject: VoteSubject) -> Result<i32, VotesServiceError> {
        stored_score(&self.db, subject)
            .await?
            .ok_or_else(|| subject.not_found())
    }

    /// The tag `username` currently holds on `subject`.
    pub async fn user_vote(
        &self,
        subject: VoteSubject,
        username: &str,
    ) -> Result<VoteTag, VotesServiceError> {
        let value: Option<i32> = Vote::find()
            .select_only()
            .column(VoteColumn::Value)
            .filter(subject.ledger_filter())
            .filter(VoteColumn::Username.eq(username))
            .into_tuple()
            .one(&self.db)
            .await?;

        Ok(value
            .and_then(|v| Direction::try_from(v).ok())
            .into())
    }
}

async fn stored_score<C: ConnectionTrait>(
    conn: &C,
    subject: VoteSubject,
) -> Result<Option<i32>, DbErr> {
    match subject {
        VoteSubject::Post(id) => {
            Post::find_by_id(id)
                .select_only()
                .column(PostColumn::Votes)
                .into_tuple()
                .one(conn)
                .await
        }
        VoteSubject::Comment(id) => {
            Comment::find_by_id(id)
                .select_only()
                .column(CommentColumn::Votes)
                .into_tuple()
                .one(conn)
                .await
        }
    }
}

/// `votes = votes + delta`, evaluated by the database.
async fn adjust_score<C: ConnectionTrait>(
    conn: &C,
    subject: VoteSubject,
    delta: i32,
) -> Result<(), DbErr> {
    match subject {
        VoteSubject::Post(id) => {
            Post::update_many()
                .col_expr(PostColumn::Votes, Expr::col(PostColumn::Votes).add(delta))
                .filter(PostColumn::Id.eq(id))
                .exec(conn)
                .await?;
        }
        VoteSubject::Comment(id) => {
            Comment::update_many()
                .col_expr(CommentColumn::Votes, Expr::col(CommentColumn::Votes).add(delta))
                .filter(CommentColumn::Id.eq(id))
                .exec(conn)
                .await?;
        }
    }
    Ok(())
}

/// Tags `viewer` holds on each of `posts`. Posts without a vote are absent.
pub(crate) async fn post_tags<C: ConnectionTrait>(
    conn: &C,
    viewer: &str,
    posts: Vec<PostId>,
) -> Result<HashMap<PostId, VoteTag>, DbErr> {
    let rows: Vec<(Option<PostId>, i32)> = Vote::find()
        .select_only()
        .column(VoteColumn::PostId)
        .column(VoteColumn::Value)
        .filter(VoteColumn::Username.eq(viewer))
        .filter(VoteColumn::PostId.is_in(posts))
        .into_tuple()
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(id, value)| Some((id?, Direction::try_from(value).ok()?.into())))
        .collect())
}

/// Tags `viewer` holds on every comment under `post`.
pub(crate) async fn comment_tags<C: ConnectionTrait>(
    conn: &C,
    viewer: &str,
    post: PostId,
) -> Result<HashMap<CommentId, VoteTag>, DbErr> {
    let rows: Vec<(Option<CommentId>, i32)> = Vote::find()
        .select_only()
        .column(VoteColumn::CommentId)
        .column(VoteColumn::Value)
        .inner_join(Comment)
        .filter(VoteColumn::Username.eq(viewer))
        .filter(CommentColumn::PostId.eq(post))
        .into_tuple()
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(id, value)| Some((id?, Direction::try_from(value).ok()?.into())))
        .collect())
}
