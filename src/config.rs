use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub catalog: CatalogConfig,

    pub cache: CacheConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/catalog.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 6790,
            cors_allowed_origins: vec![
                "http://localhost:6790".to_string(),
                "http://127.0.0.1:6790".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Rows requested per page when sweeping a whole table (default: 1000).
    /// Must not exceed `store_row_cap`.
    pub exhaustive_page_size: u64,

    /// Upper bound on pages per sweep. A sweep that needs more fails instead of
    /// returning a partial set. `None` disables the bound.
    pub max_exhaustive_pages: Option<u32>,

    pub default_page_size: u32,

    pub max_page_size: u32,

    /// Most rows the backing store returns for one request.
    pub store_row_cap: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            exhaustive_page_size: 1000,
            max_exhaustive_pages: Some(500),
            default_page_size: 50,
            max_page_size: 100,
            store_row_cap: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Never serve or store year-scoped listings from the cache.
    pub bypass_year_filtered: bool,

    pub brands_ttl_seconds: u64,

    pub models_ttl_seconds: u64,

    pub engine_variants_ttl_seconds: u64,

    pub search_ttl_seconds: u64,

    pub compatibility_ttl_seconds: u64,

    pub enrichment_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bypass_year_filtered: false,
            brands_ttl_seconds: 60 * 60,
            models_ttl_seconds: 60 * 60,
            engine_variants_ttl_seconds: 60 * 60,
            search_ttl_seconds: 30 * 60,
            compatibility_ttl_seconds: 2 * 60 * 60,
            enrichment_ttl_seconds: 2 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            json_logs: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("vehicle-catalog").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".vehicle-catalog").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let catalog = &self.catalog;

        if catalog.store_row_cap == 0 {
            anyhow::bail!("catalog.store_row_cap must be > 0");
        }

        if catalog.exhaustive_page_size == 0 || catalog.exhaustive_page_size > catalog.store_row_cap
        {
            anyhow::bail!(
                "catalog.exhaustive_page_size must be between 1 and store_row_cap ({})",
                catalog.store_row_cap
            );
        }

        if catalog.max_exhaustive_pages == Some(0) {
            anyhow::bail!("catalog.max_exhaustive_pages must be > 0 when set");
        }

        if catalog.max_page_size == 0 || catalog.default_page_size == 0 {
            anyhow::bail!("catalog page sizes must be > 0");
        }

        if catalog.default_page_size > catalog.max_page_size {
            anyhow::bail!("catalog.default_page_size cannot exceed max_page_size");
        }

        if u64::from(catalog.max_page_size) > catalog.store_row_cap {
            anyhow::bail!("catalog.max_page_size cannot exceed store_row_cap");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("general.min_db_connections cannot exceed max_db_connections");
        }

        Ok(())
    }
}
