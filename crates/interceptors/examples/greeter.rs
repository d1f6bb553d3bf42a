//! Example instrumented greeter service
//!
//! Dispatches a handful of calls through both interceptors and prints the
//! resulting Prometheus exposition.
//!
//! Run with:
//! cargo run --example greeter

use grpc_prometheus_common::{export_metrics, init_tracing, AppConfig};
use grpc_prometheus_interceptors::{
    behavior_fn, request_deserializer, response_serializer, HandlerCallDetails,
    MetricsInterceptor, RpcError, RpcMethodHandler, Server, ServerMetrics, ServicerContext,
    ServiceLatencyInterceptor,
};
use prometheus::Registry;
use std::sync::Arc;
use tonic::{Code, Status};

fn say_hello() -> RpcMethodHandler<String, String> {
    RpcMethodHandler::unary_unary(
        behavior_fn(|name: String, context: &ServicerContext| {
            if name.is_empty() {
                return Err(Status::invalid_argument("name must not be empty").into());
            }
            if name == "stranger" {
                context.set_code(Code::PermissionDenied);
            }
            Ok(format!("Hello {name}"))
        }),
        Some(request_deserializer(|payload: &[u8]| {
            String::from_utf8(payload.to_vec())
                .map_err(|err| RpcError::from(Status::invalid_argument(err.to_string())))
        })),
        Some(response_serializer(|reply: &String| {
            Ok(bytes::Bytes::from(reply.clone()))
        })),
    )
}

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.telemetry)?;

    let registry = Registry::new();
    let metrics = Arc::new(ServerMetrics::with_registry(&config.metrics, &registry)?);

    let server: Server<String, String> = Server::builder()
        .interceptor(MetricsInterceptor::new(Arc::clone(&metrics)))
        .interceptor(ServiceLatencyInterceptor::new(Arc::clone(&metrics)))
        .add_method("/helloworld.Greeter/SayHello", say_hello())
        .build();

    let details = HandlerCallDetails::new("/helloworld.Greeter/SayHello");
    for name in ["world", "", "stranger"] {
        match server.call_unary(&details, name.to_string()) {
            Ok(reply) => tracing::info!(%reply, "Call succeeded"),
            Err(err) => tracing::warn!(error = %err, "Call failed"),
        }
    }

    let reply = server.call_unary_bytes(&details, b"bytes")?;
    tracing::info!(reply = %String::from_utf8_lossy(&reply), "Wire call succeeded");

    println!("{}", export_metrics(&registry)?);
    Ok(())
}
