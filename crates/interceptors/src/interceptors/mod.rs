//! gRPC server interceptors for metrics collection

pub mod latency;
pub mod metrics;

pub use latency::ServiceLatencyInterceptor;
pub use metrics::MetricsInterceptor;

use crate::context::HandlerCallDetails;
use crate::handler::RpcMethodHandler;

/// The next stage of the interceptor pipeline, ultimately resolving to the
/// registered handler for a call (or `None` when nothing is registered).
pub type Continuation<'a, Req, Resp> =
    dyn Fn(&HandlerCallDetails) -> Option<RpcMethodHandler<Req, Resp>> + 'a;

/// Server-side interceptor installed into the request pipeline.
///
/// Called once per incoming call; returns the handler the framework should
/// dispatch to.
pub trait ServerInterceptor<Req, Resp>: Send + Sync {
    fn intercept_service(
        &self,
        continuation: &Continuation<'_, Req, Resp>,
        details: &HandlerCallDetails,
    ) -> Option<RpcMethodHandler<Req, Resp>>;
}
