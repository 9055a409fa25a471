use sea_orm_migration::prelude::*;

mod m20261018_000001_create_posts_table;
mod m20261018_000002_create_comments_table;
mod m20261018_000003_create_votes_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261018_000001_create_posts_table::Migration),
            Box::new(m20261018_000002_create_comments_table::Migration),
            Box::new(m20261018_000003_create_votes_table::Migration),
        ]
    }
}

#[cfg(test)]
use sea_orm::{Database, DbErr};

#[tokio::test]
async fn test_migrations_okay() -> Result<(), DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    let schema_manager = SchemaManager::new(&db);

    Migrator::refresh(&db).await?;

    assert!(schema_manager.has_table("post").await?);
    assert!(schema_manager.has_table("comment").await?);
    assert!(schema_manager.has_table("vote").await?);
    assert!(schema_manager.has_index("vote", "idx_votes_post_id_username").await?);

    Migrator::down(&db, None).await?;
    assert!(!schema_manager.has_table("post").await?);

    Ok(())
}
