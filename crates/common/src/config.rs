//! Configuration management for the metrics interceptors.
//!
//! Settings are loaded from configuration files and environment variables.
//! Every field has a default, so an empty configuration is valid.
//!
//! ## Example Configuration
//!
//! ```toml
//! [metrics]
//! namespace = "billing"
//! latency_buckets = [0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
//!
//! [metrics.const_labels]
//! region = "eu-west-1"
//!
//! [telemetry]
//! service_name = "billing-grpc"
//! json_logging = true
//! log_level = "debug"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Environment variable selecting the environment-specific config file
pub const ENV_SELECTOR: &str = "GRPC_PROMETHEUS_ENV";

/// Prefix for configuration environment variables
pub const ENV_PREFIX: &str = "GRPC_PROMETHEUS";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Metric series configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Optional prefix prepended to every series name (`<namespace>_grpc_server_...`)
    #[serde(default)]
    pub namespace: Option<String>,

    /// Upper bounds of the latency histogram buckets, in seconds
    #[serde(default = "default_latency_buckets")]
    pub latency_buckets: Vec<f64>,

    /// Labels attached with a fixed value to every series
    #[serde(default)]
    pub const_labels: HashMap<String, String>,
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name reported in logs
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable JSON logging format
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions
fn default_latency_buckets() -> Vec<f64> {
    prometheus::DEFAULT_BUCKETS.to_vec()
}

fn default_service_name() -> String {
    "grpc-prometheus".to_string()
}

fn default_json_logging() -> bool {
    false
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            latency_buckets: default_latency_buckets(),
            const_labels: HashMap::new(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            json_logging: default_json_logging(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and configuration files.
    ///
    /// The configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/{environment}.toml (if exists, where environment is from GRPC_PROMETHEUS_ENV)
    /// 4. Environment variables (prefixed with GRPC_PROMETHEUS_, nested keys
    ///    separated by `__`, e.g. `GRPC_PROMETHEUS_METRICS__LATENCY_BUCKETS=0.1,0.5`)
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use grpc_prometheus_common::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load configuration");
    /// println!("Latency buckets: {:?}", config.metrics.latency_buckets);
    /// ```
    pub fn load() -> Result<Self> {
        let env = std::env::var(ENV_SELECTOR).unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Example: GRPC_PROMETHEUS_METRICS__NAMESPACE=billing
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("metrics.latency_buckets")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        Self::from_config(config)
    }

    /// Deserialize and validate an already assembled configuration
    pub fn from_config(config: config::Config) -> Result<Self> {
        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.metrics.validate()?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {}",
                self.telemetry.log_level,
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }
}

impl MetricsConfig {
    /// Validate metric naming and bucket layout
    pub fn validate(&self) -> Result<()> {
        if let Some(namespace) = &self.namespace {
            if !is_valid_metric_name(namespace) {
                anyhow::bail!("Invalid metric namespace '{}'", namespace);
            }
        }

        if self.latency_buckets.is_empty() {
            anyhow::bail!("At least one latency bucket is required");
        }

        if self.latency_buckets.iter().any(|b| !b.is_finite()) {
            anyhow::bail!("Latency buckets must be finite numbers");
        }

        if self.latency_buckets.windows(2).any(|w| w[0] >= w[1]) {
            anyhow::bail!("Latency buckets must be strictly increasing");
        }

        for name in self.const_labels.keys() {
            if name.contains(':') || !is_valid_metric_name(name) {
                anyhow::bail!("Invalid constant label name '{}'", name);
            }
        }

        Ok(())
    }
}

/// Prometheus metric names match `[a-zA-Z_:][a-zA-Z0-9_:]*`
fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
