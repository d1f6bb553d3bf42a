//! Tests for the started/received/sent/handled/latency interceptor

use grpc_prometheus_interceptors::{
    Behavior, CallShape, GrpcType, HandlerCallDetails, MethodLabels, MetricsInterceptor,
    RpcError, RpcMethodHandler, RpcResult, ServerInterceptor, ServerMetrics,
};
use grpc_prometheus_testing::{builders::*, fixtures::*, mocks::*};
use prometheus::Registry;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tonic::Code;

fn intercept(
    interceptor: &MetricsInterceptor,
    continuation: &CountingContinuation<String, String>,
    path: &str,
) -> Option<RpcMethodHandler<String, String>> {
    interceptor.intercept_service(
        &|details: &HandlerCallDetails| continuation.resolve(details),
        &call_details(path),
    )
}

fn call_unary(handler: &RpcMethodHandler<String, String>, request: &str) -> RpcResult<String> {
    let context = servicer_context(SAY_HELLO_PATH);
    match handler.behavior() {
        Behavior::UnaryUnary(f) => f(request.to_string(), &context),
        other => panic!("expected a unary-unary behavior, got {:?}", other.shape()),
    }
}

fn assert_no_series(registry: &Registry) {
    assert!(
        registry
            .gather()
            .iter()
            .all(|family| family.get_metric().is_empty()),
        "no series should have been recorded"
    );
}

fn setup() -> (Registry, Arc<ServerMetrics>, MetricsInterceptor) {
    let (registry, metrics) = create_test_metrics();
    let interceptor = MetricsInterceptor::new(Arc::clone(&metrics));
    (registry, metrics, interceptor)
}

// ============================================================================
// Successful calls
// ============================================================================

#[test]
fn test_successful_unary_call_records_everything_once() {
    // Arrange
    let (_registry, metrics, interceptor) = setup();
    let continuation = CountingContinuation::new(Some(HandlerBuilder::echo().build_unary()));

    // Act
    let handler = intercept(&interceptor, &continuation, SAY_HELLO_PATH).unwrap();
    let response = call_unary(&handler, "world").unwrap();

    // Assert
    let labels = say_hello_labels();
    assert_eq!(response, "world");
    assert_eq!(metrics.started_total(&labels), 1);
    assert_eq!(metrics.msg_received_total(&labels), 1);
    assert_eq!(metrics.msg_sent_total(&labels), 1);
    assert_eq!(metrics.handled_total(&labels, Code::Ok), 1);
    assert_eq!(metrics.handled_total(&labels, Code::Unknown), 0);
    assert_eq!(metrics.latency_count(&labels), 1);
    assert!(metrics.latency_sum(&labels) >= 0.0);
}

#[test]
fn test_request_reaches_behavior_unchanged() {
    let (_registry, _metrics, interceptor) = setup();
    let log = CallLog::new();
    let handler = HandlerBuilder::echo().with_log(log.clone()).build_unary();
    let continuation = CountingContinuation::new(Some(handler));

    let handler = intercept(&interceptor, &continuation, SAY_HELLO_PATH).unwrap();
    call_unary(&handler, "payload").unwrap();

    assert_eq!(log.entries(), vec!["payload".to_string()]);
}

#[test]
fn test_context_code_set_by_behavior_is_recorded() {
    let (_registry, metrics, interceptor) = setup();
    let handler = HandlerBuilder::setting_code(Code::AlreadyExists).build_unary();
    let continuation = CountingContinuation::new(Some(handler));

    let handler = intercept(&interceptor, &continuation, SAY_HELLO_PATH).unwrap();
    assert!(call_unary(&handler, "dup").is_ok());

    let labels = say_hello_labels();
    assert_eq!(metrics.handled_total(&labels, Code::AlreadyExists), 1);
    assert_eq!(metrics.handled_total(&labels, Code::Ok), 0);
    assert_eq!(metrics.msg_sent_total(&labels), 1);
}

// ============================================================================
// Failing calls
// ============================================================================

#[test]
fn test_status_error_is_recorded_and_propagated() {
    let (_registry, metrics, interceptor) = setup();
    let continuation = CountingContinuation::new(Some(
        HandlerBuilder::failing(Code::InvalidArgument, "name must not be empty").build_unary(),
    ));

    let handler = intercept(&interceptor, &continuation, SAY_HELLO_PATH).unwrap();
    let err = call_unary(&handler, "").unwrap_err();

    match err {
        RpcError::Status(status) => {
            assert_eq!(status.code(), Code::InvalidArgument);
            assert_eq!(status.message(), "name must not be empty");
        }
        other => panic!("expected a status error, got {other:?}"),
    }

    let labels = say_hello_labels();
    assert_eq!(metrics.started_total(&labels), 1);
    assert_eq!(metrics.msg_received_total(&labels), 1);
    assert_eq!(metrics.msg_sent_total(&labels), 0);
    assert_eq!(metrics.handled_total(&labels, Code::InvalidArgument), 1);
    assert_eq!(metrics.handled_total(&labels, Code::Ok), 0);
    assert_eq!(metrics.latency_count(&labels), 1);
}

#[test]
fn test_error_without_code_is_recorded_as_unknown() {
    let (_registry, metrics, interceptor) = setup();
    let continuation = CountingContinuation::new(Some(
        HandlerBuilder::failing_without_code("database went away").build_unary(),
    ));

    let handler = intercept(&interceptor, &continuation, SAY_HELLO_PATH).unwrap();
    let err = call_unary(&handler, "world").unwrap_err();

    assert!(matches!(err, RpcError::Internal(_)));
    assert!(err.to_string().contains("database went away"));

    let labels = say_hello_labels();
    assert_eq!(metrics.handled_total(&labels, Code::Unknown), 1);
    assert_eq!(metrics.msg_sent_total(&labels), 0);
    assert_eq!(metrics.latency_count(&labels), 1);
}

#[test]
fn test_panicking_behavior_is_still_accounted() {
    let (_registry, metrics, interceptor) = setup();
    let continuation =
        CountingContinuation::new(Some(HandlerBuilder::panicking("handler bug").build_unary()));

    let handler = intercept(&interceptor, &continuation, SAY_HELLO_PATH).unwrap();
    let result = panic::catch_unwind(AssertUnwindSafe(|| call_unary(&handler, "world")));

    assert!(result.is_err(), "the panic must propagate to the caller");

    let labels = say_hello_labels();
    assert_eq!(metrics.handled_total(&labels, Code::Unknown), 1);
    assert_eq!(metrics.msg_sent_total(&labels), 0);
    assert_eq!(metrics.latency_count(&labels), 1);
}

#[test]
fn test_every_start_has_exactly_one_handled() {
    let (_registry, metrics, interceptor) = setup();
    let builders = [
        HandlerBuilder::echo(),
        HandlerBuilder::failing(Code::NotFound, "missing"),
        HandlerBuilder::failing_without_code("boom"),
        HandlerBuilder::setting_code(Code::Cancelled),
        HandlerBuilder::echo(),
    ];

    for builder in builders {
        let continuation = CountingContinuation::new(Some(builder.build_unary()));
        let handler = intercept(&interceptor, &continuation, SAY_HELLO_PATH).unwrap();
        let _ = call_unary(&handler, "x");
    }

    let labels = say_hello_labels();
    let handled: u64 = [Code::Ok, Code::NotFound, Code::Unknown, Code::Cancelled]
        .into_iter()
        .map(|code| metrics.handled_total(&labels, code))
        .sum();

    assert_eq!(metrics.started_total(&labels), 5);
    assert_eq!(handled, 5);
    assert_eq!(metrics.handled_total(&labels, Code::Ok), 2);
    assert_eq!(metrics.msg_sent_total(&labels), 3);
    assert_eq!(metrics.latency_count(&labels), 5);
}

// ============================================================================
// Pass-through cases
// ============================================================================

#[test]
fn test_streaming_handlers_pass_through_unmodified() {
    for shape in [
        CallShape::UnaryStream,
        CallShape::StreamUnary,
        CallShape::StreamStream,
    ] {
        let (registry, _metrics, interceptor) = setup();
        let log = CallLog::new();
        let handler = HandlerBuilder::echo().with_log(log.clone()).build(shape);
        let continuation = CountingContinuation::new(Some(handler));

        let handler = intercept(&interceptor, &continuation, SAY_HELLO_PATH).unwrap();
        assert_eq!(handler.shape(), shape);

        let context = servicer_context(SAY_HELLO_PATH);
        match handler.behavior() {
            Behavior::UnaryStream(f) => {
                assert_eq!(f("a".to_string(), &context).unwrap().count(), 2);
            }
            Behavior::StreamUnary(f) => {
                assert_eq!(f(request_stream(&["a", "b"]), &context).unwrap(), "a,b");
            }
            Behavior::StreamStream(f) => {
                assert_eq!(f(request_stream(&["a"]), &context).unwrap().count(), 1);
            }
            Behavior::UnaryUnary(_) => panic!("shape must be preserved"),
        }

        assert!(!log.is_empty());
        assert_eq!(continuation.calls(), 1);
        assert_no_series(&registry);
    }
}

#[test]
fn test_absent_handler_passes_through() {
    let (registry, _metrics, interceptor) = setup();
    let continuation = CountingContinuation::absent();

    assert!(intercept(&interceptor, &continuation, SAY_HELLO_PATH).is_none());
    assert_eq!(continuation.calls(), 1);
    assert_no_series(&registry);
}

#[test]
fn test_malformed_path_passes_through() {
    let (registry, _metrics, interceptor) = setup();
    let continuation = CountingContinuation::new(Some(HandlerBuilder::echo().build_unary()));

    let handler = intercept(&interceptor, &continuation, "/onlyservice").unwrap();
    assert_eq!(call_unary(&handler, "x").unwrap(), "x");

    assert_eq!(continuation.calls(), 1);
    assert_no_series(&registry);
}

#[test]
fn test_continuation_is_resolved_once() {
    let (_registry, _metrics, interceptor) = setup();
    let continuation = CountingContinuation::new(Some(HandlerBuilder::echo().build_unary()));

    intercept(&interceptor, &continuation, SAY_HELLO_PATH).unwrap();

    assert_eq!(continuation.calls(), 1);
    assert_eq!(continuation.seen_methods(), vec![SAY_HELLO_PATH.to_string()]);
}

// ============================================================================
// Label independence
// ============================================================================

#[test]
fn test_distinct_methods_accumulate_independently() {
    let (_registry, metrics, interceptor) = setup();
    let say_hello = CountingContinuation::new(Some(HandlerBuilder::echo().build_unary()));
    let check = CountingContinuation::new(Some(
        HandlerBuilder::failing(Code::Unavailable, "draining").build_unary(),
    ));

    for _ in 0..3 {
        let handler = intercept(&interceptor, &say_hello, SAY_HELLO_PATH).unwrap();
        call_unary(&handler, "x").unwrap();
    }
    let handler = intercept(&interceptor, &check, HEALTH_CHECK_PATH).unwrap();
    call_unary(&handler, "x").unwrap_err();

    let hello = say_hello_labels();
    let health = health_check_labels();
    assert_eq!(metrics.started_total(&hello), 3);
    assert_eq!(metrics.handled_total(&hello, Code::Ok), 3);
    assert_eq!(metrics.handled_total(&hello, Code::Unavailable), 0);
    assert_eq!(metrics.started_total(&health), 1);
    assert_eq!(metrics.handled_total(&health, Code::Unavailable), 1);
    assert_eq!(metrics.handled_total(&health, Code::Ok), 0);

    // Streaming types never receive samples from this interceptor
    let streaming = MethodLabels::new(GrpcType::BidiStreaming, "helloworld.Greeter", "SayHello");
    assert_eq!(metrics.started_total(&streaming), 0);
}

#[test]
fn test_reading_counters_leaves_registry_empty() {
    let (registry, metrics, interceptor) = setup();
    let continuation = CountingContinuation::new(Some(
        HandlerBuilder::echo().build(CallShape::StreamStream),
    ));

    intercept(&interceptor, &continuation, SAY_HELLO_PATH).unwrap();

    let streaming = MethodLabels::new(GrpcType::BidiStreaming, GREETER_SERVICE, SAY_HELLO_METHOD);
    assert_eq!(metrics.started_total(&streaming), 0);
    assert_eq!(metrics.handled_total(&streaming, Code::Ok), 0);
    assert_eq!(metrics.latency_count(&streaming), 0);
    assert_no_series(&registry);
}
