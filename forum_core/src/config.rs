use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

static DATA_DIR_NAME: &str = "forum";
static FORUM_DB_NAME: &str = "forum_db.sqlite";
static CONFIG_FILE_NAME: &str = "config.json";

static DATA_DIR_ENV: &str = "FORUM_DATA_DIR";
static API_KEY_ENV: &str = "FORUM_GENERATION_API_KEY";

// Directory layout
// data_dir_path
// |- forum
//    |- forum_db.sqlite
//    |- config.json

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to find a data directory on this platform")]
    NoDataDir,

    #[error("config io error")]
    Io(#[from] std::io::Error),

    #[error("malformed config file")]
    Json(#[from] serde_json::Error),
}

fn default_bind_address() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_recent_posts_limit() -> u64 {
    50
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,

    /// Server-side key. When absent, callers must supply their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 4096,
            api_key: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ForumConfig {
    pub database_path: PathBuf,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Size of the newest-first window served by the post listing.
    #[serde(default = "default_recent_posts_limit")]
    pub recent_posts_limit: u64,

    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Insert sample posts when the store is empty at startup.
    #[serde(default = "default_true")]
    pub seed_sample_content: bool,

    #[serde(default)]
    pub generation: GenerationConfig,
}

impl ForumConfig {
    /// Creates a config with defaults, storing the database inside `data_dir`.
    pub fn new(data_dir: &Path) -> Self {
        ForumConfig {
            database_path: data_dir.join(FORUM_DB_NAME),
            bind_address: default_bind_address(),
            recent_posts_limit: default_recent_posts_limit(),
            allowed_origins: default_allowed_origins(),
            seed_sample_content: true,
            generation: GenerationConfig::default(),
        }
    }
}

fn forum_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    Ok(data_dir.join(DATA_DIR_NAME))
}

/// Gets the existing config or initializes a new one if it doesn't exist
pub async fn get_or_init() -> Result<ForumConfig, ConfigError> {
    let mut config = load_or_create(&forum_dir()?).await?;

    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            config.generation.api_key = Some(key);
        }
    }

    Ok(config)
}

/// Reads `config.json` from `dir`, writing a default one first if missing.
pub async fn load_or_create(dir: &Path) -> Result<ForumConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    fs::create_dir_all(dir).await?;

    if fs::try_exists(&config_path).await? {
        let mut file = fs::File::open(&config_path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;

        Ok(serde_json::from_str(&contents)?)
    } else {
        let config = ForumConfig::new(dir);

        let json = serde_json::to_string_pretty(&config)?;
        let mut file = fs::File::create(&config_path).await?;
        file.write_all(json.as_bytes()).await?;

        Ok(config)
    }
}
