//! Error taxonomy for calls against a QRL node.
//!
//! Every failure lands in one of four categories so callers can tell a dead
//! connection from a schema disagreement from a node that said "no".

use qrl_common::{QrlError, ValidationError};
use thiserror::Error;
use tonic::Code;

#[derive(Error, Debug)]
pub enum RpcError {
    /// Transport could not connect or the connection dropped
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Node schema or version does not match what this client was built against
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The node answered with something this client cannot interpret
    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// The node processed the call and refused it
    #[error("Rejected by node ({code:?}): {message}")]
    Rejected { code: Code, message: String },

    /// Local validation failed; nothing was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("Refusing insecure channel to non-loopback node {0}")]
    InsecureTransport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Protocol,
    Rejected,
    Local,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Rejected => "rejected",
            ErrorCategory::Local => "local",
        }
    }
}

impl RpcError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RpcError::Network(_) | RpcError::Timeout(_) => ErrorCategory::Network,
            RpcError::SchemaMismatch(_) | RpcError::ProtocolMismatch(_) => ErrorCategory::Protocol,
            RpcError::Rejected { .. } => ErrorCategory::Rejected,
            RpcError::InvalidRequest(_)
            | RpcError::InsecureTransport(_)
            | RpcError::Config(_)
            | RpcError::Io(_) => ErrorCategory::Local,
        }
    }

    /// Whether repeating the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RpcError::Network(_) | RpcError::Timeout(_) => true,
            RpcError::Rejected { code, .. } => *code == Code::ResourceExhausted,
            _ => false,
        }
    }

    pub(crate) fn missing_field(field: &str) -> Self {
        RpcError::ProtocolMismatch(format!("response is missing '{}'", field))
    }
}

impl From<tonic::Status> for RpcError {
    fn from(status: tonic::Status) -> Self {
        let message = status.message().to_string();
        match status.code() {
            Code::Unavailable | Code::Aborted => RpcError::Network(message),
            Code::DeadlineExceeded | Code::Cancelled => RpcError::Timeout(message),
            Code::Unimplemented => RpcError::SchemaMismatch(format!("method not implemented by node: {}", message)),
            Code::DataLoss | Code::Internal if is_decode_failure(&message) => {
                RpcError::ProtocolMismatch(message)
            }
            Code::DataLoss => RpcError::ProtocolMismatch(message),
            code => RpcError::Rejected { code, message },
        }
    }
}

/// tonic reports prost decode errors as `Internal` with a fixed prefix
fn is_decode_failure(message: &str) -> bool {
    message.contains("failed to decode")
}

impl From<tonic::transport::Error> for RpcError {
    fn from(err: tonic::transport::Error) -> Self {
        RpcError::Network(error_chain(&err))
    }
}

impl From<QrlError> for RpcError {
    fn from(err: QrlError) -> Self {
        match err {
            QrlError::Validation(v) => RpcError::InvalidRequest(v),
            QrlError::Io(io) => RpcError::Io(io),
            QrlError::Config(message) => RpcError::Config(message),
        }
    }
}

/// Flattens an error and its sources; tonic's transport errors hide the cause.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

pub type Result<T> = std::result::Result<T, RpcError>;
