//! In-process dispatcher composing interceptors with registered handlers
//!
//! Resolves the handler of an incoming call through the interceptor chain
//! and invokes it with a fresh [`ServicerContext`], the way a hosting RPC
//! server does.

use crate::context::{HandlerCallDetails, ServicerContext};
use crate::error::{RpcError, RpcResult};
use crate::handler::{Behavior, RequestStream, ResponseStream, RpcMethodHandler};
use crate::interceptors::{Continuation, ServerInterceptor};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tonic::Status;
use tracing::debug;

/// Ordered interceptors; the first one sees the call first
pub struct InterceptorChain<Req, Resp> {
    interceptors: Vec<Arc<dyn ServerInterceptor<Req, Resp>>>,
}

impl<Req, Resp> InterceptorChain<Req, Resp> {
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    pub fn push(&mut self, interceptor: Arc<dyn ServerInterceptor<Req, Resp>>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Resolve the handler for `details`.
    ///
    /// Each interceptor receives a continuation invoking the next one; the
    /// last interceptor's continuation is `terminal`.
    pub fn resolve(
        &self,
        details: &HandlerCallDetails,
        terminal: &Continuation<'_, Req, Resp>,
    ) -> Option<RpcMethodHandler<Req, Resp>> {
        self.resolve_from(0, details, terminal)
    }

    fn resolve_from(
        &self,
        index: usize,
        details: &HandlerCallDetails,
        terminal: &Continuation<'_, Req, Resp>,
    ) -> Option<RpcMethodHandler<Req, Resp>> {
        match self.interceptors.get(index) {
            Some(interceptor) => {
                let next =
                    |details: &HandlerCallDetails| self.resolve_from(index + 1, details, terminal);
                interceptor.intercept_service(&next, details)
            }
            None => terminal(details),
        }
    }
}

impl<Req, Resp> Default for InterceptorChain<Req, Resp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Resp> Clone for InterceptorChain<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            interceptors: self.interceptors.clone(),
        }
    }
}

/// Handlers keyed by full method path
pub struct MethodRegistry<Req, Resp> {
    handlers: HashMap<String, RpcMethodHandler<Req, Resp>>,
}

impl<Req, Resp> MethodRegistry<Req, Resp> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` under `path`, replacing any previous one
    pub fn register(&mut self, path: impl Into<String>, handler: RpcMethodHandler<Req, Resp>) {
        self.handlers.insert(path.into(), handler);
    }

    pub fn lookup(&self, details: &HandlerCallDetails) -> Option<RpcMethodHandler<Req, Resp>> {
        self.handlers.get(&details.method).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<Req, Resp> Default for MethodRegistry<Req, Resp> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-process RPC server
pub struct Server<Req, Resp> {
    chain: InterceptorChain<Req, Resp>,
    registry: MethodRegistry<Req, Resp>,
}

impl<Req, Resp> Server<Req, Resp> {
    pub fn builder() -> ServerBuilder<Req, Resp> {
        ServerBuilder::new()
    }

    /// Resolve the handler for a call through the interceptor chain
    pub fn resolve(&self, details: &HandlerCallDetails) -> Option<RpcMethodHandler<Req, Resp>> {
        let registry = &self.registry;
        self.chain
            .resolve(details, &|details: &HandlerCallDetails| registry.lookup(details))
    }

    /// Invoke a unary-unary method
    pub fn call_unary(&self, details: &HandlerCallDetails, request: Req) -> RpcResult<Resp> {
        let handler = self.resolve_or_unimplemented(details)?;
        let context = ServicerContext::new(&details.method);

        match handler.behavior() {
            Behavior::UnaryUnary(behavior) => behavior(request, &context),
            _ => Err(shape_mismatch(details, &handler)),
        }
    }

    /// Invoke a unary-unary method on the wire representation of its
    /// messages, using the resolved handler's own (de)serializers.
    pub fn call_unary_bytes(
        &self,
        details: &HandlerCallDetails,
        payload: &[u8],
    ) -> RpcResult<Bytes> {
        let handler = self.resolve_or_unimplemented(details)?;
        let context = ServicerContext::new(&details.method);

        let Behavior::UnaryUnary(behavior) = handler.behavior() else {
            return Err(shape_mismatch(details, &handler));
        };
        let deserializer = handler
            .request_deserializer()
            .ok_or_else(|| Status::internal("Handler has no request deserializer"))?;
        let serializer = handler
            .response_serializer()
            .ok_or_else(|| Status::internal("Handler has no response serializer"))?;

        let request = deserializer(payload)?;
        let response = behavior(request, &context)?;
        serializer(&response)
    }

    /// Invoke a unary-stream method
    pub fn call_server_streaming(
        &self,
        details: &HandlerCallDetails,
        request: Req,
    ) -> RpcResult<ResponseStream<Resp>> {
        let handler = self.resolve_or_unimplemented(details)?;
        let context = ServicerContext::new(&details.method);

        match handler.behavior() {
            Behavior::UnaryStream(behavior) => behavior(request, &context),
            _ => Err(shape_mismatch(details, &handler)),
        }
    }

    /// Invoke a stream-unary method
    pub fn call_client_streaming(
        &self,
        details: &HandlerCallDetails,
        requests: RequestStream<Req>,
    ) -> RpcResult<Resp> {
        let handler = self.resolve_or_unimplemented(details)?;
        let context = ServicerContext::new(&details.method);

        match handler.behavior() {
            Behavior::StreamUnary(behavior) => behavior(requests, &context),
            _ => Err(shape_mismatch(details, &handler)),
        }
    }

    /// Invoke a stream-stream method
    pub fn call_bidi_streaming(
        &self,
        details: &HandlerCallDetails,
        requests: RequestStream<Req>,
    ) -> RpcResult<ResponseStream<Resp>> {
        let handler = self.resolve_or_unimplemented(details)?;
        let context = ServicerContext::new(&details.method);

        match handler.behavior() {
            Behavior::StreamStream(behavior) => behavior(requests, &context),
            _ => Err(shape_mismatch(details, &handler)),
        }
    }

    fn resolve_or_unimplemented(
        &self,
        details: &HandlerCallDetails,
    ) -> RpcResult<RpcMethodHandler<Req, Resp>> {
        debug!(method = %details.method, "Dispatching gRPC call");
        self.resolve(details).ok_or_else(|| {
            RpcError::from(Status::unimplemented(format!(
                "Method not found: {}",
                details.method
            )))
        })
    }
}

fn shape_mismatch<Req, Resp>(
    details: &HandlerCallDetails,
    handler: &RpcMethodHandler<Req, Resp>,
) -> RpcError {
    RpcError::from(Status::unimplemented(format!(
        "Method {} is {:?}",
        details.method,
        handler.shape()
    )))
}

/// Builder for [`Server`]
pub struct ServerBuilder<Req, Resp> {
    chain: InterceptorChain<Req, Resp>,
    registry: MethodRegistry<Req, Resp>,
}

impl<Req, Resp> ServerBuilder<Req, Resp> {
    pub fn new() -> Self {
        Self {
            chain: InterceptorChain::new(),
            registry: MethodRegistry::new(),
        }
    }

    /// Append an interceptor; interceptors run in the order they are added
    pub fn interceptor<I>(mut self, interceptor: I) -> Self
    where
        I: ServerInterceptor<Req, Resp> + 'static,
    {
        self.chain.push(Arc::new(interceptor));
        self
    }

    pub fn add_method(
        mut self,
        path: impl Into<String>,
        handler: RpcMethodHandler<Req, Resp>,
    ) -> Self {
        self.registry.register(path, handler);
        self
    }

    pub fn build(self) -> Server<Req, Resp> {
        Server {
            chain: self.chain,
            registry: self.registry,
        }
    }
}

impl<Req, Resp> Default for ServerBuilder<Req, Resp> {
    fn default() -> Self {
        Self::new()
    }
}
