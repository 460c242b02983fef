//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Flat storage settings as they appear in config files and the environment.
///
/// `use_ducket` is the discriminator: when set, only the hosted-service
/// fields may be present; otherwise only the object-store fields may be.
/// The core crate turns this into its typed backend configuration and rejects
/// anything that mixes both shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StorageSettings {
    /// Selects the hosted Ducket service instead of an S3-compatible bucket.
    #[serde(default)]
    pub use_ducket: bool,
    /// Hosted service API key.
    pub api_key: Option<String>,
    /// Hosted service base URL override.
    pub api_endpoint: Option<String>,
    /// S3 bucket name.
    pub bucket_name: Option<String>,
    /// S3 endpoint URL.
    pub endpoint: Option<String>,
    /// S3 access key ID.
    pub access_key_id: Option<String>,
    /// S3 secret access key.
    pub secret_access_key: Option<String>,
    /// S3 region (the core defaults to `auto`).
    pub region: Option<String>,
    /// Use path-style addressing instead of virtual-hosted buckets.
    #[serde(default)]
    pub force_path_style: bool,
}

impl StorageSettings {
    /// Returns `true` if any object-store field is set.
    #[must_use]
    pub fn has_object_store_fields(&self) -> bool {
        self.bucket_name.is_some()
            || self.endpoint.is_some()
            || self.access_key_id.is_some()
            || self.secret_access_key.is_some()
    }

    /// Returns `true` if any hosted-service field is set.
    #[must_use]
    pub fn has_hosted_fields(&self) -> bool {
        self.api_key.is_some() || self.api_endpoint.is_some()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "ducket=info".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("DUCKET").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
