//! Label values for the gRPC server series

use crate::handler::CallShape;
use std::fmt;
use tonic::Code;

pub const GRPC_TYPE: &str = "grpc_type";
pub const GRPC_SERVICE: &str = "grpc_service";
pub const GRPC_METHOD: &str = "grpc_method";
pub const GRPC_CODE: &str = "grpc_code";

/// Label names of the started, message and latency series
pub const METHOD_LABELS: [&str; 3] = [GRPC_TYPE, GRPC_SERVICE, GRPC_METHOD];

/// Label names of the handled series
pub const HANDLED_LABELS: [&str; 4] = [GRPC_TYPE, GRPC_SERVICE, GRPC_METHOD, GRPC_CODE];

/// Value of the `grpc_type` label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrpcType {
    Unary,
    ClientStreaming,
    ServerStreaming,
    BidiStreaming,
}

impl GrpcType {
    pub fn from_flags(request_streaming: bool, response_streaming: bool) -> Self {
        Self::from_shape(CallShape::from_flags(request_streaming, response_streaming))
    }

    pub fn from_shape(shape: CallShape) -> Self {
        match shape {
            CallShape::UnaryUnary => GrpcType::Unary,
            CallShape::UnaryStream => GrpcType::ServerStreaming,
            CallShape::StreamUnary => GrpcType::ClientStreaming,
            CallShape::StreamStream => GrpcType::BidiStreaming,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GrpcType::Unary => "UNARY",
            GrpcType::ClientStreaming => "CLIENT_STREAMING",
            GrpcType::ServerStreaming => "SERVER_STREAMING",
            GrpcType::BidiStreaming => "BIDI_STREAMING",
        }
    }
}

impl fmt::Display for GrpcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of the `grpc_code` label
pub fn code_to_str(code: Code) -> &'static str {
    match code {
        Code::Ok => "ok",
        Code::Cancelled => "cancelled",
        Code::Unknown => "unknown",
        Code::InvalidArgument => "invalid_argument",
        Code::DeadlineExceeded => "deadline_exceeded",
        Code::NotFound => "not_found",
        Code::AlreadyExists => "already_exists",
        Code::PermissionDenied => "permission_denied",
        Code::ResourceExhausted => "resource_exhausted",
        Code::FailedPrecondition => "failed_precondition",
        Code::Aborted => "aborted",
        Code::OutOfRange => "out_of_range",
        Code::Unimplemented => "unimplemented",
        Code::Internal => "internal",
        Code::Unavailable => "unavailable",
        Code::DataLoss => "data_loss",
        Code::Unauthenticated => "unauthenticated",
    }
}

/// The `{grpc_type, grpc_service, grpc_method}` label set of one method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodLabels {
    pub grpc_type: GrpcType,
    pub grpc_service: String,
    pub grpc_method: String,
}

impl MethodLabels {
    pub fn new(
        grpc_type: GrpcType,
        grpc_service: impl Into<String>,
        grpc_method: impl Into<String>,
    ) -> Self {
        Self {
            grpc_type,
            grpc_service: grpc_service.into(),
            grpc_method: grpc_method.into(),
        }
    }

    /// Values in [`METHOD_LABELS`] order
    pub fn values(&self) -> [&str; 3] {
        [
            self.grpc_type.as_str(),
            self.grpc_service.as_str(),
            self.grpc_method.as_str(),
        ]
    }

    /// Values in [`HANDLED_LABELS`] order
    pub fn with_code(&self, code: Code) -> [&str; 4] {
        [
            self.grpc_type.as_str(),
            self.grpc_service.as_str(),
            self.grpc_method.as_str(),
            code_to_str(code),
        ]
    }
}
