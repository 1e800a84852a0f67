use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// TMDb API key
    pub tmdb_api_key: String,

    /// TMDb API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Prefix for TMDb poster paths
    #[serde(default = "default_tmdb_image_url")]
    pub tmdb_image_url: String,

    /// Locale sent with every TMDb request
    #[serde(default = "default_tmdb_language")]
    pub tmdb_language: String,

    /// Directory holding the precomputed catalog and similarity artifacts
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Optional Redis URL; metadata is cached in-process only when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout for metadata calls
    #[serde(default = "default_metadata_timeout_secs")]
    pub metadata_timeout_secs: u64,

    /// Maximum outstanding metadata calls per enrichment pass
    #[serde(default = "default_metadata_concurrency")]
    pub metadata_concurrency: usize,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_tmdb_language() -> String {
    "en-US".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_metadata_timeout_secs() -> u64 {
    5
}

fn default_metadata_concurrency() -> usize {
    8
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        if config.metadata_concurrency == 0 {
            anyhow::bail!("METADATA_CONCURRENCY must be at least 1");
        }

        if config.metadata_timeout_secs == 0 {
            anyhow::bail!("METADATA_TIMEOUT_SECS must be at least 1");
        }

        Ok(config)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
