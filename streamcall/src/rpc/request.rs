//! Request: the callee's handle on one inbound call.
//!
//! Every reply a request sends carries the next index, starting at 0 and
//! increasing by one per reply, partial or terminal. The status moves from
//! unset to `success` or `failure` exactly once; after that nothing more is
//! sent for the request.

use std::cell::Cell;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::channel::Channel;
use crate::error::{ApplicationFailure, EmitError};
use crate::wire::{CallFrame, Frame, ReplyFrame, RequestId, Status};

/// One inbound invocation, shared by every handler in its redirect chain.
///
/// Single-threaded: interior state uses `Cell`.
pub struct Request {
    request_id: RequestId,
    method: String,
    args: Vec<Value>,

    /// `None` until the request terminates.
    status: Cell<Option<Status>>,

    next_index: Cell<u64>,

    channel: Rc<dyn Channel>,
}

impl Request {
    /// Build a request from an initiating frame; replies go out on `channel`.
    pub fn new(call: CallFrame, channel: Rc<dyn Channel>) -> Self {
        Self {
            request_id: call.request_id,
            method: call.method,
            args: call.args,
            status: Cell::new(None),
            next_index: Cell::new(0),
            channel,
        }
    }

    /// The call's request identifier.
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// The method the caller invoked (not the current redirect target).
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The call arguments, in order.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Deserialize argument `index`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplicationFailure`] describing the missing or
    /// mistyped argument, ready to be propagated with `?`.
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, ApplicationFailure> {
        let value = self.args.get(index).ok_or_else(|| {
            ApplicationFailure::new(format!(
                "{}: missing argument {} (got {})",
                self.method,
                index,
                self.args.len()
            ))
        })?;
        T::deserialize(value).map_err(|e| {
            ApplicationFailure::new(format!("{}: invalid argument {}: {}", self.method, index, e))
        })
    }

    /// The terminal status, or `None` while the request is still open.
    pub fn status(&self) -> Option<Status> {
        self.status.get()
    }

    /// Whether a terminal reply has been issued.
    pub fn is_terminated(&self) -> bool {
        self.status.get().is_some()
    }

    /// Index the next reply will carry.
    pub fn next_index(&self) -> u64 {
        self.next_index.get()
    }

    /// Send a partial result.
    ///
    /// # Errors
    ///
    /// - [`EmitError::Terminated`] if the request already terminated
    /// - [`EmitError::Encode`] if `message` cannot be represented as JSON
    /// - [`EmitError::Channel`] if the channel rejected the reply
    pub fn emit<T: Serialize>(&self, message: T) -> Result<(), EmitError> {
        if self.is_terminated() {
            return Err(EmitError::Terminated {
                request_id: self.request_id.clone(),
            });
        }
        let message = serde_json::to_value(message).map_err(|e| EmitError::Encode {
            message: e.to_string(),
        })?;
        self.post(Status::Continue, message)
    }

    /// Send one value and complete the request.
    ///
    /// # Errors
    ///
    /// Same as [`emit`](Self::emit) and [`close`](Self::close).
    pub fn reply<T: Serialize>(&self, message: T) -> Result<(), EmitError> {
        self.emit(message)?;
        self.close()
    }

    /// Complete the request successfully.
    ///
    /// A no-op if the request already terminated.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::Channel`] if the terminal reply could not be
    /// sent. The request counts as terminated either way.
    pub fn close(&self) -> Result<(), EmitError> {
        if self.is_terminated() {
            return Ok(());
        }
        self.status.set(Some(Status::Success));
        self.post(Status::Success, Value::Null)
    }

    /// Fail the request with `error` as the caller-visible payload.
    ///
    /// A no-op if the request already terminated.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::Channel`] if the terminal reply could not be
    /// sent. The request counts as terminated either way.
    pub fn abort(&self, error: ApplicationFailure) -> Result<(), EmitError> {
        if self.is_terminated() {
            return Ok(());
        }
        self.status.set(Some(Status::Failure));
        self.post(Status::Failure, error.into_payload())
    }

    fn post(&self, status: Status, message: Value) -> Result<(), EmitError> {
        let index = self.next_index.get();
        self.next_index.set(index + 1);

        let reply = ReplyFrame::new(self.request_id.clone(), status, index, message);
        self.channel.send(&Frame::Reply(reply))?;

        tracing::trace!(
            request_id = %self.request_id,
            index,
            status = %status,
            "reply sent"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("args", &self.args)
            .field("status", &self.status.get())
            .field("next_index", &self.next_index.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::channel::MemoryChannel;
    use crate::error::ChannelError;

    fn request(method: &str, args: Vec<Value>) -> (Request, MemoryChannel) {
        let (callee, caller) = MemoryChannel::pair();
        let call = CallFrame {
            request_id: RequestId::new("req"),
            method: method.to_string(),
            args,
        };
        (Request::new(call, Rc::new(callee)), caller)
    }

    /// Drain every reply the request sent, after closing its channel.
    async fn sent_replies(request: &Request, peer: &MemoryChannel) -> Vec<ReplyFrame> {
        request.channel.close();
        let mut replies = Vec::new();
        while let Some(event) = peer.recv().await {
            match event.expect("frame") {
                Frame::Reply(reply) => replies.push(reply),
                other => panic!("unexpected frame {other:?}"),
            }
        }
        replies
    }

    #[test]
    fn test_accessors() {
        let (request, _peer) = request("echo", vec![json!(1), json!("two")]);
        assert_eq!(request.request_id().as_str(), "req");
        assert_eq!(request.method(), "echo");
        assert_eq!(request.args(), &[json!(1), json!("two")]);
        assert_eq!(request.status(), None);
        assert_eq!(request.next_index(), 0);
    }

    #[test]
    fn test_typed_args() {
        let (request, _peer) = request("add", vec![json!(2), json!("x")]);
        assert_eq!(request.arg::<i64>(0), Ok(2));

        let mistyped = request.arg::<i64>(1).expect_err("string is not i64");
        assert!(mistyped.to_string().contains("invalid argument 1"));

        let missing = request.arg::<i64>(5).expect_err("no such argument");
        assert!(missing.to_string().contains("missing argument 5"));
    }

    #[tokio::test]
    async fn test_emit_then_close_indexes() {
        let (request, peer) = request("echo", vec![]);

        request.emit(json!("a")).expect("emit");
        request.emit("b").expect("emit");
        request.close().expect("close");
        assert_eq!(request.status(), Some(Status::Success));
        assert_eq!(request.next_index(), 3);

        let replies = sent_replies(&request, &peer).await;
        let indexes: Vec<u64> = replies.iter().map(|r| r.index).collect();
        let statuses: Vec<&str> = replies
            .iter()
            .map(|r| r.status.as_str().unwrap_or_default())
            .collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(statuses, vec!["", "", "success"]);
        assert_eq!(replies[1].message, json!("b"));
        assert_eq!(replies[2].message, Value::Null);
    }

    #[tokio::test]
    async fn test_single_terminal_reply() {
        let (request, peer) = request("echo", vec![]);

        request.close().expect("close");
        request.abort(ApplicationFailure::new("late")).expect("no-op");
        request.close().expect("no-op");
        assert_eq!(request.status(), Some(Status::Success));

        let replies = sent_replies(&request, &peer).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].status, "success");
    }

    #[tokio::test]
    async fn test_abort_then_close() {
        let (request, peer) = request("echo", vec![]);

        request.abort(ApplicationFailure::new(json!({"code": 1}))).expect("abort");
        request.close().expect("no-op");
        request.abort(ApplicationFailure::new("again")).expect("no-op");
        assert_eq!(request.status(), Some(Status::Failure));

        let replies = sent_replies(&request, &peer).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].status, "failure");
        assert_eq!(replies[0].message, json!({"code": 1}));
    }

    #[tokio::test]
    async fn test_emit_after_terminal_is_rejected() {
        let (request, peer) = request("echo", vec![]);

        request.reply(7).expect("reply");
        assert_eq!(
            request.emit(8),
            Err(EmitError::Terminated {
                request_id: RequestId::new("req"),
            })
        );

        let replies = sent_replies(&request, &peer).await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].message, json!(7));
    }

    #[tokio::test]
    async fn test_terminal_on_closed_channel_still_terminates() {
        let (request, peer) = request("echo", vec![]);
        drop(peer);

        assert_eq!(
            request.close(),
            Err(EmitError::Channel(ChannelError::Closed))
        );
        assert!(request.is_terminated());
        assert_eq!(request.abort(ApplicationFailure::new("x")), Ok(()));
    }
}
