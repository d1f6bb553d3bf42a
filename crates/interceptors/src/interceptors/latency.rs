//! Latency-only interceptor for gRPC requests

use super::{Continuation, ServerInterceptor};
use crate::context::{HandlerCallDetails, ServicerContext};
use crate::handler::{behavior_fn, BehaviorFn, CallShape, RpcMethodHandler};
use crate::labels::{GrpcType, MethodLabels};
use crate::metrics::ServerMetrics;
use crate::routing::{split_call_details, MINIMUM_GRPC_METHOD_PATH_ITEMS};
use crate::wrapper::{wrap_rpc_behavior, BehaviorWrapper};
use std::sync::Arc;
use std::time::Instant;
use tracing::{trace, warn};

/// Records handling latency per service and method, for every call shape.
///
/// Latencies are always labelled `grpc_type="UNARY"`. For server-streaming
/// behaviors the measured span ends when the response stream is returned.
#[derive(Clone)]
pub struct ServiceLatencyInterceptor {
    metrics: Arc<ServerMetrics>,
}

impl ServiceLatencyInterceptor {
    pub fn new(metrics: Arc<ServerMetrics>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &Arc<ServerMetrics> {
        &self.metrics
    }
}

impl<Req, Resp> ServerInterceptor<Req, Resp> for ServiceLatencyInterceptor
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    fn intercept_service(
        &self,
        continuation: &Continuation<'_, Req, Resp>,
        details: &HandlerCallDetails,
    ) -> Option<RpcMethodHandler<Req, Resp>> {
        let Some(route) = split_call_details(details, MINIMUM_GRPC_METHOD_PATH_ITEMS) else {
            warn!(method = %details.method, "Malformed gRPC method path, skipping latency");
            return continuation(details);
        };

        let recorder = LatencyRecorder {
            metrics: Arc::clone(&self.metrics),
            labels: MethodLabels::new(GrpcType::Unary, route.service, route.method),
        };

        wrap_rpc_behavior(continuation(details), &recorder)
    }
}

struct LatencyRecorder {
    metrics: Arc<ServerMetrics>,
    labels: MethodLabels,
}

impl BehaviorWrapper for LatencyRecorder {
    fn wrap<I, O>(&self, behavior: BehaviorFn<I, O>, _shape: CallShape) -> BehaviorFn<I, O>
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        let metrics = Arc::clone(&self.metrics);
        let labels = self.labels.clone();

        behavior_fn(move |request: I, context: &ServicerContext| {
            let _timer = LatencyGuard {
                metrics: &metrics,
                labels: &labels,
                start: Instant::now(),
            };
            behavior(request, context)
        })
    }
}

/// Observes the elapsed time when dropped
struct LatencyGuard<'a> {
    metrics: &'a ServerMetrics,
    labels: &'a MethodLabels,
    start: Instant,
}

impl Drop for LatencyGuard<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed().as_secs_f64();
        self.metrics.observe_latency(self.labels, elapsed);
        trace!(
            grpc_service = %self.labels.grpc_service,
            grpc_method = %self.labels.grpc_method,
            elapsed_seconds = elapsed,
            "Recorded gRPC call latency"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Behavior;
    use grpc_prometheus_common::config::MetricsConfig;
    use tonic::Code;

    #[test]
    fn test_malformed_path_passes_through() {
        let interceptor = ServiceLatencyInterceptor::new(Arc::new(
            ServerMetrics::new(&MetricsConfig::default()).unwrap(),
        ));
        let details = HandlerCallDetails::new("/onlyservice");

        let handler: Option<RpcMethodHandler<String, String>> = interceptor.intercept_service(
            &|_: &HandlerCallDetails| {
                Some(RpcMethodHandler::unary_unary(
                    behavior_fn(|req, _| Ok(req)),
                    None,
                    None,
                ))
            },
            &details,
        );

        let context = ServicerContext::new(&details.method);
        match handler.unwrap().behavior() {
            Behavior::UnaryUnary(f) => assert_eq!(f("x".to_string(), &context).unwrap(), "x"),
            _ => panic!("expected a unary-unary behavior"),
        }

        let labels = MethodLabels::new(GrpcType::Unary, "onlyservice", "");
        assert_eq!(interceptor.metrics().latency_count(&labels), 0);
        assert_eq!(interceptor.metrics().handled_total(&labels, Code::Ok), 0);
    }
}
