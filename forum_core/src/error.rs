use sea_orm::DbErr;
use thiserror::Error;

use crate::{config::ConfigError, service::content::ContentServiceError};

/// Failures while bringing the forum up or serving it.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error")]
    Config(#[from] ConfigError),

    #[error("database error")]
    Db(#[from] DbErr),

    #[error("failed to seed sample content")]
    Seed(#[from] ContentServiceError),

    #[error("server io error")]
    Io(#[from] std::io::Error),
}
