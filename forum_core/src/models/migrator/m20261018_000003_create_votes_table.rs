use sea_orm_migration::{prelude::*, schema::*};

use super::m20261018_000001_create_posts_table::Post;
use super::m20261018_000002_create_comments_table::Comment;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .col(pk_uuid(Vote::Id))
                    .col(string_len(Vote::Username, 50))
                    .col(integer(Vote::Value))
                    .col(timestamp_with_time_zone(Vote::CreatedAt))
                    .col(uuid_null(Vote::PostId))
                    .col(uuid_null(Vote::CommentId))
                    // Exactly one subject per vote
                    .check(Expr::cust("(post_id IS NULL) <> (comment_id IS NULL)"))
                    .check(Expr::cust("value IN (-1, 1)"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-vote-post_id")
                            .from(Vote::Table, Vote::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-vote-comment_id")
                            .from(Vote::Table, Vote::CommentId)
                            .to(Comment::Table, Comment::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One standing vote per (subject, voter)
        manager
            .create_index(
                Index::create()
                    .name("idx_votes_post_id_username")
                    .table(Vote::Table)
                    .col(Vote::PostId)
                    .col(Vote::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_votes_comment_id_username")
                    .table(Vote::Table)
                    .col(Vote::CommentId)
                    .col(Vote::Username)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Vote {
    Table,
    Id,
    Username,
    Value,
    CreatedAt,
    PostId,
    CommentId,
}
