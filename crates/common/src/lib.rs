//! Common utilities shared by the gRPC Prometheus crates.
//!
//! This crate provides:
//! - Configuration management (metric naming, histogram buckets, logging)
//! - Telemetry setup (tracing subscriber, Prometheus text exposition)

pub mod config;
pub mod telemetry;

// Re-export commonly used types
pub use config::{AppConfig, MetricsConfig, TelemetryConfig};
pub use telemetry::{export_metrics, init_tracing};

/// Common error type used throughout the crate
pub type Result<T> = std::result::Result<T, anyhow::Error>;
