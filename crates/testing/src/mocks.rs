//! Mock continuations and call logs for testing interceptors.

use grpc_prometheus_interceptors::{HandlerCallDetails, RpcMethodHandler};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Continuation returning a fixed handler and counting its invocations
pub struct CountingContinuation<Req, Resp> {
    handler: Option<RpcMethodHandler<Req, Resp>>,
    calls: AtomicUsize,
    seen_methods: RwLock<Vec<String>>,
}

impl<Req, Resp> CountingContinuation<Req, Resp> {
    pub fn new(handler: Option<RpcMethodHandler<Req, Resp>>) -> Self {
        Self {
            handler,
            calls: AtomicUsize::new(0),
            seen_methods: RwLock::new(Vec::new()),
        }
    }

    /// A continuation for calls the framework has no handler for
    pub fn absent() -> Self {
        Self::new(None)
    }

    pub fn resolve(&self, details: &HandlerCallDetails) -> Option<RpcMethodHandler<Req, Resp>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_methods.write().push(details.method.clone());
        self.handler.clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_methods(&self) -> Vec<String> {
        self.seen_methods.read().clone()
    }
}

/// Shared log of the requests a behavior received
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<RwLock<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.write().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
