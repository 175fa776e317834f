//! Configuration management for the Farmdesk client
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with FARMDESK_ prefix

use std::path::PathBuf;
use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main client configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Backend API configuration
    pub api: ApiConfig,

    /// Farmer search configuration
    pub search: SearchConfig,

    /// In-memory cache lifetimes
    pub cache: CacheConfig,

    /// Boundary capture configuration
    pub capture: CaptureConfig,

    /// Map view configuration
    pub map: MapConfig,

    /// Local form drafts
    pub drafts: DraftsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend REST API
    pub base_url: String,

    /// Bearer token, takes precedence over `token_file`
    pub token: Option<String>,

    /// File holding the bearer token of the current session
    pub token_file: Option<PathBuf>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke before a search is sent
    pub debounce_ms: u64,

    /// Minimum query length
    pub min_length: usize,

    /// How long search results stay cached
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Farmer detail (farmer + farms) lifetime
    pub farmer_detail_ttl_secs: u64,

    /// Community lookup lifetime
    pub community_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaptureConfig {
    /// GPS fixes closer than this to the last accepted fix are dropped
    pub min_distance_meters: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    /// Zoom level from which farms are drawn as polygons instead of clusters
    pub polygon_zoom_threshold: u8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DraftsConfig {
    /// Directory holding draft JSON files
    pub directory: PathBuf,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("FARMDESK_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("api.base_url", "http://localhost:8000/api")?
            .set_default("api.timeout_secs", 30)?
            .set_default("search.debounce_ms", 500)?
            .set_default("search.min_length", 2)?
            .set_default("search.cache_ttl_secs", 300)?
            .set_default("cache.farmer_detail_ttl_secs", 600)?
            .set_default("cache.community_ttl_secs", 3600)?
            .set_default("capture.min_distance_meters", 2.0)?
            .set_default("map.polygon_zoom_threshold", 14)?
            .set_default("drafts.directory", ".farmdesk/drafts")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FARMDESK_ prefix)
            .add_source(
                Environment::with_prefix("FARMDESK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl CacheConfig {
    pub fn farmer_detail_ttl(&self) -> Duration {
        Duration::from_secs(self.farmer_detail_ttl_secs)
    }

    pub fn community_ttl(&self) -> Duration {
        Duration::from_secs(self.community_ttl_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            min_length: shared::MIN_SEARCH_LENGTH,
            cache_ttl_secs: 300,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            min_distance_meters: 2.0,
        }
    }
}
