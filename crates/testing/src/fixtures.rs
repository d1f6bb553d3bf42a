//! Test fixtures for metrics, registries and call descriptors.

use grpc_prometheus_common::config::MetricsConfig;
use grpc_prometheus_interceptors::{
    GrpcType, HandlerCallDetails, MethodLabels, ServerMetrics, ServicerContext,
};
use prometheus::Registry;
use std::sync::Arc;

pub const SAY_HELLO_PATH: &str = "/helloworld.Greeter/SayHello";
pub const GREETER_SERVICE: &str = "helloworld.Greeter";
pub const SAY_HELLO_METHOD: &str = "SayHello";

pub const HEALTH_CHECK_PATH: &str = "/grpc.health.v1.Health/Check";
pub const HEALTH_SERVICE: &str = "grpc.health.v1.Health";
pub const HEALTH_CHECK_METHOD: &str = "Check";

/// Create metrics registered in a fresh registry with the default config
pub fn create_test_metrics() -> (Registry, Arc<ServerMetrics>) {
    create_test_metrics_with(&MetricsConfig::default())
}

/// Create metrics registered in a fresh registry
pub fn create_test_metrics_with(config: &MetricsConfig) -> (Registry, Arc<ServerMetrics>) {
    let registry = Registry::new();
    let metrics = ServerMetrics::with_registry(config, &registry)
        .expect("Failed to register test metrics");
    (registry, Arc::new(metrics))
}

pub fn call_details(path: &str) -> HandlerCallDetails {
    HandlerCallDetails::new(path)
}

pub fn servicer_context(path: &str) -> ServicerContext {
    ServicerContext::new(path)
}

pub fn unary_labels(service: &str, method: &str) -> MethodLabels {
    MethodLabels::new(GrpcType::Unary, service, method)
}

pub fn say_hello_labels() -> MethodLabels {
    unary_labels(GREETER_SERVICE, SAY_HELLO_METHOD)
}

pub fn health_check_labels() -> MethodLabels {
    unary_labels(HEALTH_SERVICE, HEALTH_CHECK_METHOD)
}
