use axum::Router;
use sea_orm::DatabaseConnection;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};

pub mod api;
pub mod config;
pub mod dto;
pub mod entity;
pub mod error;
pub mod generation;
pub mod ids;
pub mod models;
pub mod service;
pub mod test_utils;
pub mod thread;
pub mod time_ago;
pub mod voting;

use api::AppState;
use config::ForumConfig;
use error::CoreError;
use service::content::ContentService;

/// Main runtime handle for the forum server.
pub struct ForumCore {
    pub config: ForumConfig,
    pub db: DatabaseConnection,
}

impl ForumCore {
    /// Opens the database, applies migrations and seeds sample content if
    /// the store is empty and seeding is enabled.
    pub async fn start(config: ForumConfig) -> Result<Self, CoreError> {
        let db = models::open_or_create_db(&config).await?;
        models::migrate_up(&db).await?;

        if config.seed_sample_content {
            ContentService::new(db.clone()).seed_if_empty().await?;
        }

        Ok(Self { config, db })
    }

    pub fn router(&self) -> Router {
        api::router(AppState::new(self.db.clone(), &self.config))
    }

    /// Serves the API on the configured address until ctrl-c or SIGTERM.
    pub async fn serve(self) -> Result<(), CoreError> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        info!(address = %self.config.bind_address, "server running");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("server shutting down");
        self.db.close().await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received ctrl-c, shutting down"),
            Err(e) => {
                warn!(error = %e, "failed to install ctrl-c handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

pub mod prelude {
    pub use super::config;
    pub use super::dto;
    pub use super::entity;
    pub use super::error;
    pub use super::ids;
    pub use super::models;
    pub use super::service;
    pub use super::voting::{Direction, VoteTag};

    pub use super::ForumCore;
}
