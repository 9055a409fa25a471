use anyhow::Context;
use forum_core::{config, ForumCore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::get_or_init()
        .await
        .context("failed to load configuration")?;
    info!(database = %config.database_path.display(), "configuration loaded");

    let core = ForumCore::start(config)
        .await
        .context("failed to start forum")?;
    core.serve().await.context("server error")?;

    Ok(())
}
