//! Storage configuration types.

use ducket_shared::StorageSettings;
use serde::Deserialize;

use super::error::StorageError;

/// Region used when none is configured. S3-compatible services such as
/// Cloudflare R2 route on the endpoint and accept `auto`.
pub const DEFAULT_REGION: &str = "auto";

/// Base URL of the hosted Ducket service.
pub const DEFAULT_API_ENDPOINT: &str = "https://ducket.vercel.app/api/ducket";

/// Backend configuration. Exactly one shape is active per bucket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "StorageSettings")]
pub enum BucketConfig {
    /// S3-compatible bucket: Cloudflare R2, AWS S3, MinIO
    ObjectStore(ObjectStoreConfig),
    /// Hosted Ducket file service
    Hosted(HostedConfig),
}

impl BucketConfig {
    /// Get the backend name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ObjectStore(_) => "s3",
            Self::Hosted(_) => "ducket",
        }
    }

    /// Identifier of the store, used in failure reports.
    #[must_use]
    pub fn store(&self) -> &str {
        match self {
            Self::ObjectStore(config) => &config.bucket_name,
            Self::Hosted(_) => "ducket",
        }
    }
}

/// S3-compatible bucket configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectStoreConfig {
    /// Bucket name.
    pub bucket_name: String,
    /// Endpoint URL.
    pub endpoint: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Signing region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Use path-style addressing (`endpoint/bucket/key`).
    #[serde(default)]
    pub force_path_style: bool,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl ObjectStoreConfig {
    /// Create an S3-compatible configuration with the default region.
    #[must_use]
    pub fn new(
        bucket_name: impl Into<String>,
        endpoint: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            endpoint: endpoint.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: default_region(),
            force_path_style: false,
        }
    }

    /// Set the signing region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Enable or disable path-style addressing.
    #[must_use]
    pub fn with_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }
}

/// Hosted Ducket service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostedConfig {
    /// Bearer token for the API.
    pub api_key: String,
    /// API base URL.
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
}

fn default_api_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

impl HostedConfig {
    /// Create a hosted configuration against the public endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_endpoint: default_api_endpoint(),
        }
    }

    /// Point the adapter at another API base URL.
    #[must_use]
    pub fn with_api_endpoint(mut self, api_endpoint: impl Into<String>) -> Self {
        self.api_endpoint = api_endpoint.into();
        self
    }
}

impl TryFrom<StorageSettings> for BucketConfig {
    type Error = StorageError;

    fn try_from(settings: StorageSettings) -> Result<Self, Self::Error> {
        if settings.use_ducket {
            if settings.has_object_store_fields() {
                return Err(StorageError::configuration(
                    "use_ducket is set but S3 bucket settings are also present",
                ));
            }

            let mut config = HostedConfig::new(require(settings.api_key, "api_key")?);
            if let Some(api_endpoint) = settings.api_endpoint {
                config = config.with_api_endpoint(api_endpoint);
            }
            return Ok(Self::Hosted(config));
        }

        if settings.has_hosted_fields() {
            return Err(StorageError::configuration(
                "hosted service settings are present but use_ducket is not set",
            ));
        }

        Ok(Self::ObjectStore(ObjectStoreConfig {
            bucket_name: require(settings.bucket_name, "bucket_name")?,
            endpoint: require(settings.endpoint, "endpoint")?,
            access_key_id: require(settings.access_key_id, "access_key_id")?,
            secret_access_key: require(settings.secret_access_key, "secret_access_key")?,
            region: settings.region.unwrap_or_else(default_region),
            force_path_style: settings.force_path_style,
        }))
    }
}

fn require(value: Option<String>, field: &str) -> Result<String, StorageError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StorageError::configuration(format!("missing storage setting: {field}")))
}
