//! Metrics interceptor for gRPC requests
//!
//! Records started, received, sent and handled counts plus handling latency
//! for unary calls. Streaming calls pass through untouched.

use super::{Continuation, ServerInterceptor};
use crate::context::{HandlerCallDetails, ServicerContext};
use crate::handler::{behavior_fn, BehaviorFn, CallShape, RpcMethodHandler};
use crate::labels::{GrpcType, MethodLabels};
use crate::metrics::ServerMetrics;
use crate::routing::{split_call_details, MINIMUM_GRPC_METHOD_PATH_ITEMS};
use crate::wrapper::{wrap_rpc_behavior, BehaviorWrapper};
use std::sync::Arc;
use std::time::Instant;
use tonic::Code;
use tracing::{debug, trace, warn};

/// Metrics interceptor
#[derive(Clone)]
pub struct MetricsInterceptor {
    metrics: Arc<ServerMetrics>,
}

impl MetricsInterceptor {
    /// Create a new metrics interceptor recording into `metrics`
    pub fn new(metrics: Arc<ServerMetrics>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &Arc<ServerMetrics> {
        &self.metrics
    }
}

impl<Req, Resp> ServerInterceptor<Req, Resp> for MetricsInterceptor
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    fn intercept_service(
        &self,
        continuation: &Continuation<'_, Req, Resp>,
        details: &HandlerCallDetails,
    ) -> Option<RpcMethodHandler<Req, Resp>> {
        let handler = continuation(details)?;

        // only unary calls are instrumented
        if !handler.shape().is_unary() {
            debug!(
                method = %details.method,
                shape = ?handler.shape(),
                "Streaming call, skipping metrics"
            );
            return Some(handler);
        }

        let Some(route) = split_call_details(details, MINIMUM_GRPC_METHOD_PATH_ITEMS) else {
            warn!(method = %details.method, "Malformed gRPC method path, skipping metrics");
            return Some(handler);
        };

        let labels = MethodLabels::new(
            GrpcType::from_shape(handler.shape()),
            route.service,
            route.method,
        );

        self.metrics.inc_started(&labels);

        let recorder = HandledRecorder {
            metrics: Arc::clone(&self.metrics),
            labels,
        };

        wrap_rpc_behavior(Some(handler), &recorder)
    }
}

/// Wraps a behavior with message, outcome and latency accounting
struct HandledRecorder {
    metrics: Arc<ServerMetrics>,
    labels: MethodLabels,
}

impl BehaviorWrapper for HandledRecorder {
    fn wrap<I, O>(&self, behavior: BehaviorFn<I, O>, _shape: CallShape) -> BehaviorFn<I, O>
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        let metrics = Arc::clone(&self.metrics);
        let labels = self.labels.clone();

        behavior_fn(move |request: I, context: &ServicerContext| {
            let mut outcome = HandledGuard::start(&metrics, &labels);

            metrics.inc_msg_received(&labels);

            match behavior(request, context) {
                Ok(response) => {
                    outcome.code = context.code().unwrap_or(Code::Ok);
                    metrics.inc_msg_sent(&labels);
                    Ok(response)
                }
                Err(err) => {
                    if let Some(code) = err.code() {
                        outcome.code = code;
                    }
                    Err(err)
                }
            }
        })
    }
}

/// Records the handled count and latency when dropped, so accounting also
/// happens when the behavior unwinds.
struct HandledGuard<'a> {
    metrics: &'a ServerMetrics,
    labels: &'a MethodLabels,
    code: Code,
    start: Instant,
}

impl<'a> HandledGuard<'a> {
    fn start(metrics: &'a ServerMetrics, labels: &'a MethodLabels) -> Self {
        Self {
            metrics,
            labels,
            code: Code::Unknown,
            start: Instant::now(),
        }
    }
}

impl Drop for HandledGuard<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed().as_secs_f64();

        self.metrics.inc_handled(self.labels, self.code);
        self.metrics.observe_latency(self.labels, elapsed);

        trace!(
            grpc_service = %self.labels.grpc_service,
            grpc_method = %self.labels.grpc_method,
            grpc_code = ?self.code,
            elapsed_seconds = elapsed,
            "Recorded handled gRPC call"
        );
    }
}
