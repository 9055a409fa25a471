use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::ForumConfig;

pub mod migrator;

pub async fn open_or_create_db(config: &ForumConfig) -> Result<DatabaseConnection, DbErr> {
    // sqlx enables foreign keys on every sqlite connection it opens
    let connection_string = format!("sqlite://{}?mode=rwc", config.database_path.display());

    let mut options = ConnectOptions::new(connection_string);
    options.sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!(path = %config.database_path.display(), "database opened");
    Ok(db)
}

pub async fn migrate_up(db: &DatabaseConnection) -> Result<(), DbErr> {
    migrator::Migrator::up(db, None).await
}
