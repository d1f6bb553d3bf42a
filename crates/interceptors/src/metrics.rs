//! Server-side gRPC metric series

use crate::error::{InterceptorError, InterceptorResult};
use crate::labels::{MethodLabels, HANDLED_LABELS, METHOD_LABELS};
use grpc_prometheus_common::config::MetricsConfig;
use prometheus::core::Collector;
use prometheus::proto::Metric;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use tonic::Code;

pub const SERVER_STARTED_TOTAL: &str = "grpc_server_started_total";
pub const SERVER_HANDLED_TOTAL: &str = "grpc_server_handled_total";
pub const SERVER_MSG_RECEIVED_TOTAL: &str = "grpc_server_msg_received_total";
pub const SERVER_MSG_SENT_TOTAL: &str = "grpc_server_msg_sent_total";
pub const SERVER_HANDLED_LATENCY_SECONDS: &str = "grpc_server_handled_latency_seconds";

/// The counters and histogram recorded by the server interceptors.
///
/// Each series is addressed by a full label set; updates are atomic per
/// series so a single instance can be shared across worker threads.
#[derive(Clone)]
pub struct ServerMetrics {
    started: IntCounterVec,
    handled: IntCounterVec,
    msg_received: IntCounterVec,
    msg_sent: IntCounterVec,
    handled_latency: HistogramVec,
}

impl ServerMetrics {
    /// Build the series without registering them anywhere
    pub fn new(config: &MetricsConfig) -> InterceptorResult<Self> {
        config
            .validate()
            .map_err(|err| InterceptorError::InvalidConfig(err.to_string()))?;

        let counter = |name: &str, help: &str, labels: &[&str]| {
            IntCounterVec::new(counter_opts(config, name, help), labels)
        };

        Ok(Self {
            started: counter(
                SERVER_STARTED_TOTAL,
                "Total number of RPCs started on the server.",
                &METHOD_LABELS,
            )?,
            handled: counter(
                SERVER_HANDLED_TOTAL,
                "Total number of RPCs completed on the server, regardless of success or failure.",
                &HANDLED_LABELS,
            )?,
            msg_received: counter(
                SERVER_MSG_RECEIVED_TOTAL,
                "Total number of RPC stream messages received on the server.",
                &METHOD_LABELS,
            )?,
            msg_sent: counter(
                SERVER_MSG_SENT_TOTAL,
                "Total number of gRPC stream messages sent by the server.",
                &METHOD_LABELS,
            )?,
            handled_latency: HistogramVec::new(
                HistogramOpts::from(counter_opts(
                    config,
                    SERVER_HANDLED_LATENCY_SECONDS,
                    "Histogram of response latency (seconds) of gRPC that had been \
                     application-level handled by the server.",
                ))
                .buckets(config.latency_buckets.clone()),
                &METHOD_LABELS,
            )?,
        })
    }

    /// Build the series and register them with `registry`
    pub fn with_registry(config: &MetricsConfig, registry: &Registry) -> InterceptorResult<Self> {
        let metrics = Self::new(config)?;
        metrics.register(registry)?;
        Ok(metrics)
    }

    /// Register all series with `registry`.
    ///
    /// Fails if any of them is already registered there.
    pub fn register(&self, registry: &Registry) -> InterceptorResult<()> {
        registry.register(Box::new(self.started.clone()))?;
        registry.register(Box::new(self.handled.clone()))?;
        registry.register(Box::new(self.msg_received.clone()))?;
        registry.register(Box::new(self.msg_sent.clone()))?;
        registry.register(Box::new(self.handled_latency.clone()))?;
        Ok(())
    }

    pub fn inc_started(&self, labels: &MethodLabels) {
        self.started.with_label_values(&labels.values()).inc();
    }

    pub fn inc_msg_received(&self, labels: &MethodLabels) {
        self.msg_received.with_label_values(&labels.values()).inc();
    }

    pub fn inc_msg_sent(&self, labels: &MethodLabels) {
        self.msg_sent.with_label_values(&labels.values()).inc();
    }

    pub fn inc_handled(&self, labels: &MethodLabels, code: Code) {
        self.handled.with_label_values(&labels.with_code(code)).inc();
    }

    /// Observe a latency, negative values are recorded as zero
    pub fn observe_latency(&self, labels: &MethodLabels, seconds: f64) {
        self.handled_latency
            .with_label_values(&labels.values())
            .observe(seconds.max(0.0));
    }

    // Reads below never create a series; an unseen label set reads as zero.

    pub fn started_total(&self, labels: &MethodLabels) -> u64 {
        counter_value(&self.started, &METHOD_LABELS, &labels.values())
    }

    pub fn msg_received_total(&self, labels: &MethodLabels) -> u64 {
        counter_value(&self.msg_received, &METHOD_LABELS, &labels.values())
    }

    pub fn msg_sent_total(&self, labels: &MethodLabels) -> u64 {
        counter_value(&self.msg_sent, &METHOD_LABELS, &labels.values())
    }

    pub fn handled_total(&self, labels: &MethodLabels, code: Code) -> u64 {
        counter_value(&self.handled, &HANDLED_LABELS, &labels.with_code(code))
    }

    /// Number of latency observations for `labels`
    pub fn latency_count(&self, labels: &MethodLabels) -> u64 {
        find_series(&self.handled_latency, &METHOD_LABELS, &labels.values())
            .map_or(0, |metric| metric.get_histogram().get_sample_count())
    }

    /// Sum of latency observations for `labels`, in seconds
    pub fn latency_sum(&self, labels: &MethodLabels) -> f64 {
        find_series(&self.handled_latency, &METHOD_LABELS, &labels.values())
            .map_or(0.0, |metric| metric.get_histogram().get_sample_sum())
    }
}

fn counter_value(vec: &IntCounterVec, names: &[&str], values: &[&str]) -> u64 {
    find_series(vec, names, values).map_or(0, |metric| metric.get_counter().get_value() as u64)
}

/// Snapshot of the child series whose labels match `names`/`values`
fn find_series(collector: &impl Collector, names: &[&str], values: &[&str]) -> Option<Metric> {
    collector
        .collect()
        .iter()
        .flat_map(|family| family.get_metric())
        .find(|metric| {
            names.iter().zip(values).all(|(name, value)| {
                metric
                    .get_label()
                    .iter()
                    .any(|pair| pair.get_name() == *name && pair.get_value() == *value)
            })
        })
        .cloned()
}

fn counter_opts(config: &MetricsConfig, name: &str, help: &str) -> Opts {
    let mut opts = Opts::new(name, help).const_labels(config.const_labels.clone());
    if let Some(namespace) = &config.namespace {
        opts = opts.namespace(namespace.clone());
    }
    opts
}
