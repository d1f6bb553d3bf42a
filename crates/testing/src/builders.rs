//! Fluent builders for method handlers used in tests.
//!
//! Every handler works on `String` messages and, unless disabled, carries
//! UTF-8 (de)serializers.

use bytes::Bytes;
use grpc_prometheus_interceptors::{
    behavior_fn, request_deserializer, response_serializer, CallShape, RequestDeserializer,
    RequestStream, ResponseSerializer, ResponseStream, RpcError, RpcMethodHandler, RpcResult,
    ServicerContext,
};
use tonic::{Code, Status};

use crate::mocks::CallLog;

/// What the behavior does with a call
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Return the request (or requests) unchanged
    Echo,
    /// Set `code` on the context, then return normally
    SetCode(Code),
    /// Fail with a status carrying `code`
    Fail(Code, String),
    /// Fail with an error carrying no status code
    FailWithoutCode(String),
    /// Panic inside the behavior
    Panic(String),
}

/// Builder for `RpcMethodHandler<String, String>` test instances
#[derive(Clone)]
pub struct HandlerBuilder {
    outcome: Outcome,
    log: Option<CallLog>,
    request_deserializer: Option<RequestDeserializer<String>>,
    response_serializer: Option<ResponseSerializer<String>>,
}

impl HandlerBuilder {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            log: None,
            request_deserializer: Some(utf8_deserializer()),
            response_serializer: Some(utf8_serializer()),
        }
    }

    pub fn echo() -> Self {
        Self::new(Outcome::Echo)
    }

    pub fn failing(code: Code, message: impl Into<String>) -> Self {
        Self::new(Outcome::Fail(code, message.into()))
    }

    pub fn failing_without_code(message: impl Into<String>) -> Self {
        Self::new(Outcome::FailWithoutCode(message.into()))
    }

    pub fn setting_code(code: Code) -> Self {
        Self::new(Outcome::SetCode(code))
    }

    pub fn panicking(message: impl Into<String>) -> Self {
        Self::new(Outcome::Panic(message.into()))
    }

    /// Record every received request in `log`
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn without_serializers(mut self) -> Self {
        self.request_deserializer = None;
        self.response_serializer = None;
        self
    }

    pub fn with_request_deserializer(mut self, deserializer: RequestDeserializer<String>) -> Self {
        self.request_deserializer = Some(deserializer);
        self
    }

    pub fn with_response_serializer(mut self, serializer: ResponseSerializer<String>) -> Self {
        self.response_serializer = Some(serializer);
        self
    }

    pub fn build(self, shape: CallShape) -> RpcMethodHandler<String, String> {
        match shape {
            CallShape::UnaryUnary => self.build_unary(),
            CallShape::UnaryStream => self.build_unary_stream(),
            CallShape::StreamUnary => self.build_stream_unary(),
            CallShape::StreamStream => self.build_stream_stream(),
        }
    }

    pub fn build_unary(self) -> RpcMethodHandler<String, String> {
        let Self {
            outcome,
            log,
            request_deserializer,
            response_serializer,
        } = self;

        RpcMethodHandler::unary_unary(
            behavior_fn(move |request: String, context: &ServicerContext| {
                record(&log, &request);
                apply(&outcome, context)?;
                Ok(request)
            }),
            request_deserializer,
            response_serializer,
        )
    }

    /// Responds with the request repeated twice
    pub fn build_unary_stream(self) -> RpcMethodHandler<String, String> {
        let Self {
            outcome,
            log,
            request_deserializer,
            response_serializer,
        } = self;

        RpcMethodHandler::unary_stream(
            behavior_fn(move |request: String, context: &ServicerContext| {
                record(&log, &request);
                apply(&outcome, context)?;
                let responses: ResponseStream<String> =
                    Box::new(vec![request.clone(), request].into_iter());
                Ok(responses)
            }),
            request_deserializer,
            response_serializer,
        )
    }

    /// Responds with the requests joined by `,`
    pub fn build_stream_unary(self) -> RpcMethodHandler<String, String> {
        let Self {
            outcome,
            log,
            request_deserializer,
            response_serializer,
        } = self;

        RpcMethodHandler::stream_unary(
            behavior_fn(move |requests: RequestStream<String>, context: &ServicerContext| {
                let requests: Vec<String> = requests.collect();
                for request in &requests {
                    record(&log, request);
                }
                apply(&outcome, context)?;
                Ok(requests.join(","))
            }),
            request_deserializer,
            response_serializer,
        )
    }

    /// Echoes every request back
    pub fn build_stream_stream(self) -> RpcMethodHandler<String, String> {
        let Self {
            outcome,
            log,
            request_deserializer,
            response_serializer,
        } = self;

        RpcMethodHandler::stream_stream(
            behavior_fn(move |requests: RequestStream<String>, context: &ServicerContext| {
                let requests: Vec<String> = requests.collect();
                for request in &requests {
                    record(&log, request);
                }
                apply(&outcome, context)?;
                let responses: ResponseStream<String> = Box::new(requests.into_iter());
                Ok(responses)
            }),
            request_deserializer,
            response_serializer,
        )
    }
}

pub fn utf8_deserializer() -> RequestDeserializer<String> {
    request_deserializer(|payload: &[u8]| {
        String::from_utf8(payload.to_vec())
            .map_err(|err| RpcError::from(Status::invalid_argument(err.to_string())))
    })
}

pub fn utf8_serializer() -> ResponseSerializer<String> {
    response_serializer(|response: &String| Ok(Bytes::from(response.clone())))
}

/// Build a stream of requests from string literals
pub fn request_stream(items: &[&str]) -> RequestStream<String> {
    let items: Vec<String> = items.iter().map(|item| item.to_string()).collect();
    Box::new(items.into_iter())
}

fn record(log: &Option<CallLog>, request: &str) {
    if let Some(log) = log {
        log.record(request);
    }
}

fn apply(outcome: &Outcome, context: &ServicerContext) -> RpcResult<()> {
    match outcome {
        Outcome::Echo => Ok(()),
        Outcome::SetCode(code) => {
            context.set_code(*code);
            Ok(())
        }
        Outcome::Fail(code, message) => Err(Status::new(*code, message.clone()).into()),
        Outcome::FailWithoutCode(message) => {
            Err(RpcError::internal(anyhow::anyhow!(message.clone())))
        }
        Outcome::Panic(message) => panic!("{}", message),
    }
}
