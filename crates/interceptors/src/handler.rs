//! Method handlers: the calling convention of one endpoint
//!
//! A handler binds a behavior of one of four call shapes to the request
//! deserializer and response serializer of its endpoint.

use crate::context::ServicerContext;
use crate::error::RpcResult;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// Sequence of requests read from a client stream
pub type RequestStream<Req> = Box<dyn Iterator<Item = Req> + Send>;

/// Sequence of responses written to a server stream
pub type ResponseStream<Resp> = Box<dyn Iterator<Item = Resp> + Send>;

/// A behavior taking `I` (a request or request stream) and producing `O`
/// (a response or response stream).
pub type BehaviorFn<I, O> = Arc<dyn Fn(I, &ServicerContext) -> RpcResult<O> + Send + Sync>;

pub type RequestDeserializer<Req> = Arc<dyn Fn(&[u8]) -> RpcResult<Req> + Send + Sync>;

pub type ResponseSerializer<Resp> = Arc<dyn Fn(&Resp) -> RpcResult<Bytes> + Send + Sync>;

/// Box a closure as a [`BehaviorFn`]
pub fn behavior_fn<I, O, F>(f: F) -> BehaviorFn<I, O>
where
    F: Fn(I, &ServicerContext) -> RpcResult<O> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn request_deserializer<Req, F>(f: F) -> RequestDeserializer<Req>
where
    F: Fn(&[u8]) -> RpcResult<Req> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn response_serializer<Resp, F>(f: F) -> ResponseSerializer<Resp>
where
    F: Fn(&Resp) -> RpcResult<Bytes> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Streaming shape of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallShape {
    UnaryUnary,
    UnaryStream,
    StreamUnary,
    StreamStream,
}

impl CallShape {
    pub fn from_flags(request_streaming: bool, response_streaming: bool) -> Self {
        match (request_streaming, response_streaming) {
            (false, false) => CallShape::UnaryUnary,
            (false, true) => CallShape::UnaryStream,
            (true, false) => CallShape::StreamUnary,
            (true, true) => CallShape::StreamStream,
        }
    }

    pub fn request_streaming(self) -> bool {
        matches!(self, CallShape::StreamUnary | CallShape::StreamStream)
    }

    pub fn response_streaming(self) -> bool {
        matches!(self, CallShape::UnaryStream | CallShape::StreamStream)
    }

    pub fn is_unary(self) -> bool {
        self == CallShape::UnaryUnary
    }
}

/// The behavior of a handler, one variant per call shape
pub enum Behavior<Req, Resp> {
    UnaryUnary(BehaviorFn<Req, Resp>),
    UnaryStream(BehaviorFn<Req, ResponseStream<Resp>>),
    StreamUnary(BehaviorFn<RequestStream<Req>, Resp>),
    StreamStream(BehaviorFn<RequestStream<Req>, ResponseStream<Resp>>),
}

impl<Req, Resp> Behavior<Req, Resp> {
    pub fn shape(&self) -> CallShape {
        match self {
            Behavior::UnaryUnary(_) => CallShape::UnaryUnary,
            Behavior::UnaryStream(_) => CallShape::UnaryStream,
            Behavior::StreamUnary(_) => CallShape::StreamUnary,
            Behavior::StreamStream(_) => CallShape::StreamStream,
        }
    }
}

impl<Req, Resp> Clone for Behavior<Req, Resp> {
    fn clone(&self) -> Self {
        match self {
            Behavior::UnaryUnary(f) => Behavior::UnaryUnary(Arc::clone(f)),
            Behavior::UnaryStream(f) => Behavior::UnaryStream(Arc::clone(f)),
            Behavior::StreamUnary(f) => Behavior::StreamUnary(Arc::clone(f)),
            Behavior::StreamStream(f) => Behavior::StreamStream(Arc::clone(f)),
        }
    }
}

/// Handler for one RPC method
pub struct RpcMethodHandler<Req, Resp> {
    behavior: Behavior<Req, Resp>,
    request_deserializer: Option<RequestDeserializer<Req>>,
    response_serializer: Option<ResponseSerializer<Resp>>,
}

impl<Req, Resp> RpcMethodHandler<Req, Resp> {
    pub fn unary_unary(
        behavior: BehaviorFn<Req, Resp>,
        request_deserializer: Option<RequestDeserializer<Req>>,
        response_serializer: Option<ResponseSerializer<Resp>>,
    ) -> Self {
        Self {
            behavior: Behavior::UnaryUnary(behavior),
            request_deserializer,
            response_serializer,
        }
    }

    pub fn unary_stream(
        behavior: BehaviorFn<Req, ResponseStream<Resp>>,
        request_deserializer: Option<RequestDeserializer<Req>>,
        response_serializer: Option<ResponseSerializer<Resp>>,
    ) -> Self {
        Self {
            behavior: Behavior::UnaryStream(behavior),
            request_deserializer,
            response_serializer,
        }
    }

    pub fn stream_unary(
        behavior: BehaviorFn<RequestStream<Req>, Resp>,
        request_deserializer: Option<RequestDeserializer<Req>>,
        response_serializer: Option<ResponseSerializer<Resp>>,
    ) -> Self {
        Self {
            behavior: Behavior::StreamUnary(behavior),
            request_deserializer,
            response_serializer,
        }
    }

    pub fn stream_stream(
        behavior: BehaviorFn<RequestStream<Req>, ResponseStream<Resp>>,
        request_deserializer: Option<RequestDeserializer<Req>>,
        response_serializer: Option<ResponseSerializer<Resp>>,
    ) -> Self {
        Self {
            behavior: Behavior::StreamStream(behavior),
            request_deserializer,
            response_serializer,
        }
    }

    pub fn shape(&self) -> CallShape {
        self.behavior.shape()
    }

    pub fn request_streaming(&self) -> bool {
        self.shape().request_streaming()
    }

    pub fn response_streaming(&self) -> bool {
        self.shape().response_streaming()
    }

    pub fn behavior(&self) -> &Behavior<Req, Resp> {
        &self.behavior
    }

    pub fn request_deserializer(&self) -> Option<&RequestDeserializer<Req>> {
        self.request_deserializer.as_ref()
    }

    pub fn response_serializer(&self) -> Option<&ResponseSerializer<Resp>> {
        self.response_serializer.as_ref()
    }

    /// Split the handler into its behavior and (de)serializers
    pub fn into_parts(
        self,
    ) -> (
        Behavior<Req, Resp>,
        Option<RequestDeserializer<Req>>,
        Option<ResponseSerializer<Resp>>,
    ) {
        (self.behavior, self.request_deserializer, self.response_serializer)
    }
}

impl<Req, Resp> Clone for RpcMethodHandler<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            request_deserializer: self.request_deserializer.clone(),
            response_serializer: self.response_serializer.clone(),
        }
    }
}

impl<Req, Resp> fmt::Debug for RpcMethodHandler<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcMethodHandler")
            .field("shape", &self.shape())
            .field("request_deserializer", &self.request_deserializer.is_some())
            .field("response_serializer", &self.response_serializer.is_some())
            .finish()
    }
}
