//! Error types for the streamcall layer.
//!
//! Failures are always attributed to a single call:
//! - [`CallError`] is what a caller observes on its [`CallStream`](crate::CallStream)
//! - [`EmitError`] is what a handler observes when sending replies
//! - [`DispatchError`] is what the dispatcher hands back to its host after
//!   the request has already been aborted
//! - [`ChannelError`] covers transport faults that belong to no call

use serde_json::Value;

use crate::wire::RequestId;

/// Errors raised by a [`Channel`](crate::Channel) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The channel (or its sending half) is closed.
    #[error("channel closed")]
    Closed,

    /// A frame could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec {
        /// Details about the codec failure.
        message: String,
    },

    /// Transport-level fault not tied to any request.
    #[error("channel fault: {message}")]
    Fault {
        /// Details about the fault.
        message: String,
    },
}

/// A failure payload raised by a handler and delivered verbatim to the caller.
///
/// The payload is an arbitrary JSON value; nothing wraps or rewrites it on
/// the way from [`Request::abort`](crate::Request::abort) to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ApplicationFailure(pub Value);

impl ApplicationFailure {
    /// Create a failure from anything convertible into a JSON value.
    pub fn new(payload: impl Into<Value>) -> Self {
        Self(payload.into())
    }

    /// Borrow the failure payload.
    pub fn payload(&self) -> &Value {
        &self.0
    }

    /// Take the failure payload.
    pub fn into_payload(self) -> Value {
        self.0
    }
}

impl From<EmitError> for ApplicationFailure {
    fn from(err: EmitError) -> Self {
        ApplicationFailure(Value::String(err.to_string()))
    }
}

/// Errors observed by a caller consuming a [`CallStream`](crate::CallStream).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CallError {
    /// A reply carried a status token that is not part of the protocol.
    #[error("illegal status: {status:?} (request {request_id})")]
    ProtocolViolation {
        /// The call that received the reply.
        request_id: RequestId,
        /// The unrecognized status token, as received.
        status: String,
    },

    /// The callee terminated the call with a failure.
    #[error("remote failure: {0}")]
    Failure(ApplicationFailure),

    /// The inbound side of the channel ended while the call was still open.
    #[error("channel closed before request {request_id} terminated")]
    ChannelClosed {
        /// The call that was left open.
        request_id: RequestId,
    },

    /// The initiating frame could not be sent.
    #[error("failed to send call: {0}")]
    Send(#[source] ChannelError),
}

impl CallError {
    /// The remote failure payload, if this is an application failure.
    pub fn failure_payload(&self) -> Option<&Value> {
        match self {
            CallError::Failure(failure) => Some(failure.payload()),
            _ => None,
        }
    }
}

impl From<ApplicationFailure> for CallError {
    fn from(failure: ApplicationFailure) -> Self {
        CallError::Failure(failure)
    }
}

/// Errors observed by a handler emitting replies on a [`Request`](crate::Request).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    /// The request already sent its terminal reply.
    #[error("request {request_id} already terminated")]
    Terminated {
        /// The terminated request.
        request_id: RequestId,
    },

    /// The message could not be converted to a wire value.
    #[error("failed to encode message: {message}")]
    Encode {
        /// Details about the encoding failure.
        message: String,
    },

    /// The channel rejected the reply.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Errors produced while dispatching one inbound call.
///
/// By the time a `DispatchError` is returned the request has already been
/// aborted with [`DispatchError::to_failure`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// The dispatch chain reached a method with no registered handler.
    #[error("no handler registered for method `{method}`")]
    HandlerNotFound {
        /// The missing method name.
        method: String,
    },

    /// The redirect chain exceeded the configured limit.
    #[error("redirect limit of {limit} exceeded")]
    RedirectLimit {
        /// The configured maximum number of redirects.
        limit: u32,
    },

    /// A handler returned a failure.
    #[error("handler failed: {0}")]
    Handler(#[from] ApplicationFailure),
}

impl DispatchError {
    /// The failure payload sent to the caller for this error.
    ///
    /// Handler failures are passed through untouched; dispatcher errors are
    /// rendered as a message string.
    pub fn to_failure(&self) -> ApplicationFailure {
        match self {
            DispatchError::Handler(failure) => failure.clone(),
            other => ApplicationFailure(Value::String(other.to_string())),
        }
    }
}
