//! Wire records exchanged over a [`Channel`](crate::Channel).
//!
//! Two record shapes travel on the channel:
//!
//! ```text
//! caller → callee   { "requestID": token, "method": string, "args": [value, ...] }
//! callee → caller   { "requestID": token, "status": ""|"success"|"failure",
//!                     "index": n, "message": value }
//! ```
//!
//! [`Frame`] is untagged so the JSON form is exactly the record above.
//! The reply `status` stays a raw JSON value on the wire; it is only interpreted
//! by the caller, which is where an unknown token becomes a protocol violation.

mod codec;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use codec::{CodecError, JsonCodec, MessageCodec};

/// Token correlating every record that belongs to one call.
///
/// Opaque: only equality and hashing are meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Wrap an existing token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-reply marker: a partial result or one of the two terminal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// More replies follow (wire token `""`).
    Continue,
    /// The call completed normally (wire token `"success"`).
    Success,
    /// The call failed; the reply message is the failure payload.
    Failure,
}

impl Status {
    /// The wire token for this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Continue => "",
            Status::Success => "success",
            Status::Failure => "failure",
        }
    }

    /// Parse a wire token, ignoring ASCII case.
    ///
    /// Returns `None` for tokens outside the protocol.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "" => Some(Status::Continue),
            "success" => Some(Status::Success),
            "failure" => Some(Status::Failure),
            _ => None,
        }
    }

    /// Interpret a raw wire status value.
    ///
    /// Falsy values (`null`, `false`, `0`, `""`, or a missing field) mean
    /// more replies follow. Strings go through [`parse`](Self::parse). Any
    /// other value is outside the protocol.
    pub fn from_wire(status: &Value) -> Option<Self> {
        match status {
            Value::Null | Value::Bool(false) => Some(Status::Continue),
            Value::Number(n) if n.as_f64() == Some(0.0) => Some(Status::Continue),
            Value::String(token) => Self::parse(token),
            _ => None,
        }
    }

    /// Whether this status ends the call.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Status::Continue)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Continue => f.write_str("continue"),
            terminal => f.write_str(terminal.as_str()),
        }
    }
}

/// Initiating record: caller → callee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallFrame {
    /// The call this record opens.
    #[serde(rename = "requestID")]
    pub request_id: RequestId,

    /// Name of the method to invoke first.
    pub method: String,

    /// Ordered call arguments.
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Reply record: callee → caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyFrame {
    /// The call this reply belongs to.
    #[serde(rename = "requestID")]
    pub request_id: RequestId,

    /// Raw status value; see [`Status::from_wire`].
    ///
    /// Kept as a JSON value so a malformed status still reaches its call
    /// instead of failing the whole frame.
    #[serde(default)]
    pub status: Value,

    /// Position of this reply in the call's sequence, starting at 0.
    pub index: u64,

    /// Partial result, failure payload, or `null` for a plain success.
    #[serde(default)]
    pub message: Value,
}

impl ReplyFrame {
    /// Build a reply carrying a protocol status.
    pub fn new(request_id: RequestId, status: Status, index: u64, message: Value) -> Self {
        Self {
            request_id,
            status: Value::String(status.as_str().to_string()),
            index,
            message,
        }
    }

    /// The parsed status, or `None` if the token is not part of the protocol.
    pub fn parsed_status(&self) -> Option<Status> {
        Status::from_wire(&self.status)
    }

    /// The status as text, for diagnostics.
    pub fn status_token(&self) -> String {
        status_token(&self.status)
    }
}

/// Render a raw status value as text: strings verbatim, anything else as JSON.
pub(crate) fn status_token(status: &Value) -> String {
    match status {
        Value::String(token) => token.clone(),
        other => other.to_string(),
    }
}

/// Any record that can travel on a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    /// An initiating record.
    Call(CallFrame),
    /// A reply record.
    Reply(ReplyFrame),
}

impl Frame {
    /// The request this frame belongs to.
    pub fn request_id(&self) -> &RequestId {
        match self {
            Frame::Call(call) => &call.request_id,
            Frame::Reply(reply) => &reply.request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_status_tokens() {
        assert_eq!(Status::Continue.as_str(), "");
        assert_eq!(Status::Success.as_str(), "success");
        assert_eq!(Status::Failure.as_str(), "failure");
        assert!(!Status::Continue.is_terminal());
        assert!(Status::Success.is_terminal());
        assert!(Status::Failure.is_terminal());
    }

    #[test]
    fn test_status_parse_ignores_case() {
        assert_eq!(Status::parse(""), Some(Status::Continue));
        assert_eq!(Status::parse("SUCCESS"), Some(Status::Success));
        assert_eq!(Status::parse("Failure"), Some(Status::Failure));
        assert_eq!(Status::parse("maybe"), None);
    }

    #[test]
    fn test_call_frame_wire_shape() {
        let frame = Frame::Call(CallFrame {
            request_id: RequestId::new("abc"),
            method: "echo".to_string(),
            args: vec![json!(1), json!("two")],
        });

        let value = serde_json::to_value(&frame).expect("serialize");
        assert_eq!(
            value,
            json!({"requestID": "abc", "method": "echo", "args": [1, "two"]})
        );
    }

    #[test]
    fn test_reply_frame_wire_shape() {
        let frame = Frame::Reply(ReplyFrame::new(
            RequestId::new("abc"),
            Status::Continue,
            3,
            json!({"x": 1}),
        ));

        let value = serde_json::to_value(&frame).expect("serialize");
        assert_eq!(
            value,
            json!({"requestID": "abc", "status": "", "index": 3, "message": {"x": 1}})
        );
    }

    #[test]
    fn test_untagged_frame_decoding() {
        let call: Frame =
            serde_json::from_str(r#"{"requestID":"r","method":"m","args":[]}"#).expect("call");
        assert!(matches!(call, Frame::Call(ref c) if c.method == "m"));

        let reply: Frame =
            serde_json::from_str(r#"{"requestID":"r","status":"success","index":0}"#)
                .expect("reply");
        match reply {
            Frame::Reply(reply) => {
                assert_eq!(reply.parsed_status(), Some(Status::Success));
                assert_eq!(reply.message, Value::Null);
            }
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_status_survives_decoding() {
        let reply: Frame =
            serde_json::from_str(r#"{"requestID":"r","status":"maybe","index":0,"message":1}"#)
                .expect("reply");
        match reply {
            Frame::Reply(reply) => {
                assert_eq!(reply.status, "maybe");
                assert_eq!(reply.parsed_status(), None);
            }
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[test]
    fn test_non_string_status_still_decodes_as_reply() {
        let reply: Frame =
            serde_json::from_str(r#"{"requestID":"r","status":7,"index":0,"message":1}"#)
                .expect("reply");
        match reply {
            Frame::Reply(reply) => {
                assert_eq!(reply.parsed_status(), None);
                assert_eq!(reply.status_token(), "7");
            }
            other => panic!("expected reply, got {other:?}"),
        }

        let reply: Frame =
            serde_json::from_str(r#"{"requestID":"r","index":1,"message":1}"#).expect("reply");
        match reply {
            Frame::Reply(reply) => {
                assert_eq!(reply.status, Value::Null);
                assert_eq!(reply.parsed_status(), Some(Status::Continue));
            }
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[test]
    fn test_status_from_wire_follows_truthiness() {
        assert_eq!(Status::from_wire(&Value::Null), Some(Status::Continue));
        assert_eq!(Status::from_wire(&json!(false)), Some(Status::Continue));
        assert_eq!(Status::from_wire(&json!(0)), Some(Status::Continue));
        assert_eq!(Status::from_wire(&json!("")), Some(Status::Continue));
        assert_eq!(Status::from_wire(&json!("Success")), Some(Status::Success));
        assert_eq!(Status::from_wire(&json!(7)), None);
        assert_eq!(Status::from_wire(&json!(true)), None);
        assert_eq!(Status::from_wire(&json!({"s": 1})), None);
    }
}
