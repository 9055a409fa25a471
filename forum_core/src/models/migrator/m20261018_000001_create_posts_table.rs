use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Post::Table)
                    .col(pk_uuid(Post::Id))
                    .col(string_len(Post::Title, 200))
                    .col(text(Post::Content).default(""))
                    .col(string_len_null(Post::Url, 2048))
                    .col(string_len(Post::Author, 50))
                    .col(timestamp_with_time_zone(Post::CreatedAt))
                    .col(integer(Post::Votes).default(0))
                    .to_owned(),
            )
            .await?;

        // Recent-posts window is read newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_posts_created_at")
                    .table(Post::Table)
                    .col(Post::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Post::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Post {
    Table,
    Id,
    Title,
    Content,
    Url,
    Author,
    CreatedAt,
    Votes,
}
