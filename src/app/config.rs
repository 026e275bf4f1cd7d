use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;
use url::Url;

use crate::error::{Error, Result};
use crate::platform::{AppPaths, StorageBackend, LOGIN_PATH};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
/// Single-variable override for the backend address.
pub const API_URL_ENV: &str = "STUDYABROAD_API_URL";
const ENV_PREFIX: &str = "STUDYABROAD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub ui: UIConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UIConfig {
    pub login_path: String,
    pub default_country: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            },
            storage: StorageConfig {
                // keyring has no persistent backend on every platform
                backend: StorageBackend::File,
            },
            ui: UIConfig {
                login_path: LOGIN_PATH.to_string(),
                default_country: None,
            },
        }
    }
}

impl AppConfig {
    /// Defaults, then the config file, then `STUDYABROAD_*` variables, then
    /// `STUDYABROAD_API_URL`. An explicit `api_url` beats all of them.
    pub fn load(paths: &AppPaths, config_file: Option<&Path>, api_url: Option<String>) -> Result<Self> {
        let file = config_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| paths.config_file());
        let api_url = api_url.or_else(|| std::env::var(API_URL_ENV).ok());
        Self::load_layered(&file, api_url)
    }

    pub fn load_layered(config_file: &Path, api_url: Option<String>) -> Result<Self> {
        info!("Loading configuration from: {:?}", config_file);

        let defaults = toml::to_string(&Self::default())?;
        let config = Config::builder()
            .add_source(File::from_str(&defaults, FileFormat::Toml))
            .add_source(File::from(config_file).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("api.base_url", api_url)?
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        info!("Saving configuration to: {:?}", path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.base_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::validation(format!(
                "API base URL must use http or https, got {}",
                url.scheme()
            )));
        }

        if self.api.timeout_seconds == 0 {
            return Err(Error::validation("Request timeout must be at least one second"));
        }

        if !self.ui.login_path.starts_with('/') {
            return Err(Error::validation("Login path must start with '/'"));
        }

        Ok(())
    }

    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.api.base_url)
            .map_err(|e| Error::validation(format!("Invalid API base URL '{}': {}", self.api.base_url, e)))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds)
    }
}
