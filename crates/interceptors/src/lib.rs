//! Prometheus instrumentation for gRPC servers
//!
//! This crate provides server interceptors that wrap every incoming call
//! to record counts, outcome codes and latency, without the handler code
//! being aware of it:
//!
//! - [`MetricsInterceptor`] records started, received, sent and handled
//!   counts plus latency for unary calls.
//! - [`ServiceLatencyInterceptor`] records latency only, for every call shape.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use grpc_prometheus_common::MetricsConfig;
//! use grpc_prometheus_interceptors::{
//!     behavior_fn, HandlerCallDetails, MetricsInterceptor, RpcMethodHandler, Server,
//!     ServerMetrics,
//! };
//!
//! let registry = prometheus::Registry::new();
//! let metrics = ServerMetrics::with_registry(&MetricsConfig::default(), &registry).unwrap();
//! let metrics = Arc::new(metrics);
//!
//! let server: Server<String, String> = Server::builder()
//!     .interceptor(MetricsInterceptor::new(Arc::clone(&metrics)))
//!     .add_method(
//!         "/helloworld.Greeter/SayHello",
//!         RpcMethodHandler::unary_unary(
//!             behavior_fn(|name: String, _| Ok(format!("Hello {name}"))),
//!             None,
//!             None,
//!         ),
//!     )
//!     .build();
//!
//! let reply = server
//!     .call_unary(&HandlerCallDetails::new("/helloworld.Greeter/SayHello"), "world".to_string())
//!     .unwrap();
//! assert_eq!(reply, "Hello world");
//! ```

pub mod context;
pub mod error;
pub mod handler;
pub mod interceptors;
pub mod labels;
pub mod metrics;
pub mod routing;
pub mod server;
pub mod wrapper;

pub use context::{HandlerCallDetails, ServicerContext};
pub use error::{InterceptorError, InterceptorResult, RpcError, RpcResult};
pub use handler::{
    behavior_fn, request_deserializer, response_serializer, Behavior, BehaviorFn, CallShape,
    RequestDeserializer, RequestStream, ResponseSerializer, ResponseStream, RpcMethodHandler,
};
pub use interceptors::{
    Continuation, MetricsInterceptor, ServerInterceptor, ServiceLatencyInterceptor,
};
pub use labels::{code_to_str, GrpcType, MethodLabels};
pub use metrics::ServerMetrics;
pub use routing::{split_call_details, split_method_path, GrpcRoute};
pub use server::{InterceptorChain, MethodRegistry, Server, ServerBuilder};
pub use wrapper::{wrap_rpc_behavior, BehaviorWrapper};
