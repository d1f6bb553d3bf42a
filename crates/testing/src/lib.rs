//! Testing utilities for the gRPC Prometheus interceptors
//!
//! This crate provides:
//! - Fixtures for metrics, registries and call descriptors
//! - Builders for method handlers of every call shape
//! - Mock continuations and behaviors that record how they were used
//! - Property-based testing strategies for method paths
//!
//! # Examples
//!
//! ```
//! use grpc_prometheus_testing::{builders::*, fixtures::*};
//!
//! let (_registry, metrics) = create_test_metrics();
//! let handler = HandlerBuilder::echo().build_unary();
//! assert!(!handler.request_streaming());
//! assert_eq!(metrics.started_total(&unary_labels("pkg.Svc", "Echo")), 0);
//! ```

pub mod builders;
pub mod fixtures;
pub mod mocks;
pub mod strategies;

// Re-export commonly used types
pub use builders::*;
pub use fixtures::*;
pub use mocks::*;

// Re-export testing dependencies for convenience
pub use proptest;
