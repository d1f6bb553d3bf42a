//! Service/method extraction from a gRPC method path

use crate::context::HandlerCallDetails;

/// Segments of `/<package>.<Service>/<Method>` split on `/`, the first one empty
pub const MINIMUM_GRPC_METHOD_PATH_ITEMS: usize = 3;

/// Service and method identifiers of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcRoute {
    pub service: String,
    pub method: String,
}

/// Split a method path into service and method.
///
/// Returns `None` when the path has fewer than `min_segments` segments;
/// callers then fall through to the unmodified continuation.
///
/// ```
/// use grpc_prometheus_interceptors::routing::{split_method_path, MINIMUM_GRPC_METHOD_PATH_ITEMS};
///
/// let route = split_method_path("/helloworld.Greeter/SayHello", MINIMUM_GRPC_METHOD_PATH_ITEMS).unwrap();
/// assert_eq!(route.service, "helloworld.Greeter");
/// assert_eq!(route.method, "SayHello");
///
/// assert!(split_method_path("/onlyservice", MINIMUM_GRPC_METHOD_PATH_ITEMS).is_none());
/// ```
pub fn split_method_path(path: &str, min_segments: usize) -> Option<GrpcRoute> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() < min_segments.max(MINIMUM_GRPC_METHOD_PATH_ITEMS) {
        return None;
    }

    Some(GrpcRoute {
        service: parts[1].to_string(),
        method: parts[2].to_string(),
    })
}

/// Split the method path of an incoming call
pub fn split_call_details(details: &HandlerCallDetails, min_segments: usize) -> Option<GrpcRoute> {
    split_method_path(&details.method, min_segments)
}
