//! Proptest strategies for gRPC method paths.

use proptest::prelude::*;

/// A non-empty path segment without `/`
pub fn segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.]{1,24}"
}

/// `/<service>/<method>` together with its expected parts
pub fn valid_method_path() -> impl Strategy<Value = (String, String, String)> {
    (segment(), segment()).prop_map(|(service, method)| {
        (format!("/{service}/{method}"), service, method)
    })
}

/// Paths with at most one `/`, which split into fewer than three segments
pub fn short_path() -> impl Strategy<Value = String> {
    (any::<bool>(), "[A-Za-z0-9_.]{0,24}").prop_map(|(leading_slash, rest)| {
        if leading_slash {
            format!("/{rest}")
        } else {
            rest
        }
    })
}
