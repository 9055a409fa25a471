use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::models::migrator::Migrator;

/// Create a fresh in-memory SQLite database with all migrations applied.
///
/// Every pooled connection to `sqlite::memory:` would open its own empty
/// database, so the pool is held to a single connection.
///
/// # Example
/// ```no_run
/// # async fn demo() {
/// let db = forum_core::test_utils::create_test_db_with_migrations().await;
/// let posts = forum_core::service::posts::PostsService::new(db);
/// # }
/// ```
pub async fn create_test_db_with_migrations() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to create in-memory database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}
