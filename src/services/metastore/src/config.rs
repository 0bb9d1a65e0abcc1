//! Configuration management for the EWBI metastore
//!
//! Configuration is loaded from a YAML file and overridden by environment
//! variables and CLI arguments. The inventory base URL is resolved here once and
//! injected into the inventory client; nothing else reads the process environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Inventory endpoint used when no base URL is configured
pub const DEFAULT_INVENTORY_BASE_URL: &str = "http://10.10.0.85:5000/inventory/api/v1";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Record placement settings
    pub metastore: MetastoreConfig,
    /// Inventory service settings
    pub inventory: InventoryConfig,
    /// Telemetry configuration
    pub telemetry: TelemetryConfig,
}

/// Where records are written and which role this cluster plays
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetastoreConfig {
    /// Namespace persisted records are created in
    pub namespace: String,
    /// Relation marker stamped on every record
    pub relation: String,
}

/// Inventory client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InventoryConfig {
    /// Inventory API base URL, falls back to [`DEFAULT_INVENTORY_BASE_URL`]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds
    pub request_timeout: u64,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
    /// Zone lookups allowed in flight for one enrichment
    pub max_concurrent_lookups: usize,
    /// Upper bound for a whole enrichment in seconds, 0 disables it
    pub enrichment_deadline: u64,
}

/// Telemetry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetryConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Tracing configuration
    pub tracing: TracingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format, `json` or `pretty`
    pub format: String,
}

/// Tracing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TracingConfig {
    /// Install the tracing subscriber
    pub enabled: bool,
    /// Service name
    pub service_name: String,
}

impl Default for MetastoreConfig {
    fn default() -> Self {
        Self {
            namespace: "federation".to_string(),
            relation: crate::identity::HOST_RELATION.to_string(),
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout: 10,
            connect_timeout: 5,
            max_concurrent_lookups: 1,
            enrichment_deadline: 0,
        }
    }
}

impl InventoryConfig {
    /// Configured base URL or the built-in default
    pub fn resolved_base_url(&self) -> &str {
        match self.base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => DEFAULT_INVENTORY_BASE_URL,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn enrichment_deadline(&self) -> Option<Duration> {
        (self.enrichment_deadline > 0).then(|| Duration::from_secs(self.enrichment_deadline))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "ewbi-metastore".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .context("Failed to read configuration file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse configuration file")?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `METASTORE_CONFIG_FILE` (if set) and environment variables
    pub async fn load() -> Result<Self> {
        let config = match std::env::var("METASTORE_CONFIG_FILE") {
            Ok(path) => Self::from_file(path).await?,
            Err(_) => Config::default(),
        };

        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        Config::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("INVENTORY_API_BASE_URL") {
            self.inventory.base_url = Some(base_url);
        }

        if let Some(timeout) = lookup("INVENTORY_REQUEST_TIMEOUT") {
            self.inventory.request_timeout = timeout
                .parse()
                .context("Invalid inventory request timeout")?;
        }

        if let Some(lookups) = lookup("INVENTORY_MAX_CONCURRENT_LOOKUPS") {
            self.inventory.max_concurrent_lookups = lookups
                .parse()
                .context("Invalid inventory concurrency")?;
        }

        if let Some(deadline) = lookup("INVENTORY_ENRICHMENT_DEADLINE") {
            self.inventory.enrichment_deadline = deadline
                .parse()
                .context("Invalid enrichment deadline")?;
        }

        if let Some(namespace) = lookup("METASTORE_NAMESPACE") {
            self.metastore.namespace = namespace;
        }

        if let Some(log_level) = lookup("LOG_LEVEL") {
            self.telemetry.logging.level = log_level;
        }

        if let Some(log_format) = lookup("LOG_FORMAT") {
            self.telemetry.logging.format = log_format;
        }

        self.validate()?;
        Ok(self)
    }

    /// Merge configuration with CLI arguments
    pub fn merge_with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self> {
        if let Some(base_url) = overrides.inventory_base_url {
            self.inventory.base_url = Some(base_url);
        }

        if let Some(namespace) = overrides.namespace {
            self.metastore.namespace = namespace;
        }

        if let Some(log_level) = overrides.log_level {
            self.telemetry.logging.level = log_level;
        }

        if let Some(lookups) = overrides.max_concurrent_lookups {
            self.inventory.max_concurrent_lookups = lookups;
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.metastore.namespace.is_empty() {
            return Err(anyhow::anyhow!("Metastore namespace is required"));
        }

        if self.metastore.relation.is_empty() {
            return Err(anyhow::anyhow!("Federation relation marker is required"));
        }

        let base_url = self.inventory.resolved_base_url();
        let parsed = url::Url::parse(base_url)
            .with_context(|| format!("Invalid inventory base URL: {}", base_url))?;
        if parsed.cannot_be_a_base() {
            return Err(anyhow::anyhow!(
                "Inventory base URL cannot be used as a base: {}",
                base_url
            ));
        }

        if self.inventory.request_timeout == 0 {
            return Err(anyhow::anyhow!(
                "Inventory request timeout must be greater than 0"
            ));
        }

        if self.inventory.max_concurrent_lookups == 0 {
            return Err(anyhow::anyhow!(
                "Inventory concurrency must be greater than 0"
            ));
        }

        Ok(())
    }

    /// Save configuration to a YAML file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        tokio::fs::write(path, content)
            .await
            .context("Failed to write configuration file")?;

        Ok(())
    }
}

/// Configuration overrides from CLI arguments
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub inventory_base_url: Option<String>,
    pub namespace: Option<String>,
    pub log_level: Option<String>,
    pub max_concurrent_lookups: Option<usize>,
}
