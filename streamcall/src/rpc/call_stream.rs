//! CallStream: the caller's lazy, in-order view of one call's replies.
//!
//! Polling the stream is what asks for reply *i*; nothing is taken from the
//! [`CorrelationRegistry`] before the consumer pulls. Items are:
//!
//! - `Some(Ok(message))` for every partial reply (status `""`, `null` or absent)
//! - `None` after a `"success"` reply; a non-null success message is yielded
//!   first, as single-shot peers put their result there
//! - `Some(Err(CallError::Failure(payload)))` for a `"failure"` reply, then `None`
//! - `Some(Err(CallError::ProtocolViolation { .. }))` for any other status, then `None`
//!
//! In every terminal case the call is deregistered.

use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::stream::{FusedStream, Stream};
use serde_json::Value;

use crate::error::{ApplicationFailure, CallError};
use crate::wire::{status_token, RequestId, Status};

use super::correlation::CorrelationRegistry;

/// Finite, non-restartable sequence of one call's partial results.
///
/// Dropping the stream before it ends does not cancel the call: the registry
/// entry stays in place and keeps buffering replies.
pub struct CallStream {
    request_id: RequestId,
    registry: Rc<CorrelationRegistry>,

    /// Index of the next reply to pull.
    index: u64,

    /// Set once the terminal item has been produced.
    done: bool,
}

impl CallStream {
    pub(crate) fn new(request_id: RequestId, registry: Rc<CorrelationRegistry>) -> Self {
        Self {
            request_id,
            registry,
            index: 0,
            done: false,
        }
    }

    /// The call's request identifier.
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Index of the next reply this stream will pull.
    pub fn next_index(&self) -> u64 {
        self.index
    }

    fn finish(&mut self) {
        self.done = true;
        self.registry.deregister(&self.request_id);
    }
}

impl Stream for CallStream {
    type Item = Result<Value, CallError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        let delivery = match this.registry.poll_reply(&this.request_id, this.index, cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Some(delivery)) => delivery,
            Poll::Ready(None) => {
                this.finish();
                tracing::debug!(
                    request_id = %this.request_id,
                    index = this.index,
                    "channel closed with call still open"
                );
                return Poll::Ready(Some(Err(CallError::ChannelClosed {
                    request_id: this.request_id.clone(),
                })));
            }
        };
        this.index += 1;

        match Status::from_wire(&delivery.status) {
            Some(Status::Continue) => Poll::Ready(Some(Ok(delivery.message))),
            Some(Status::Success) => {
                this.finish();
                tracing::trace!(
                    request_id = %this.request_id,
                    replies = this.index,
                    "call completed"
                );
                if delivery.message.is_null() {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(delivery.message)))
                }
            }
            Some(Status::Failure) => {
                this.finish();
                tracing::trace!(request_id = %this.request_id, "call failed");
                Poll::Ready(Some(Err(CallError::Failure(ApplicationFailure(
                    delivery.message,
                )))))
            }
            None => {
                this.finish();
                let status = status_token(&delivery.status);
                tracing::warn!(
                    request_id = %this.request_id,
                    status = %status,
                    "illegal reply status"
                );
                Poll::Ready(Some(Err(CallError::ProtocolViolation {
                    request_id: this.request_id.clone(),
                    status,
                })))
            }
        }
    }
}

impl FusedStream for CallStream {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

impl Drop for CallStream {
    fn drop(&mut self) {
        if !self.done {
            tracing::debug!(
                request_id = %self.request_id,
                next_index = self.index,
                "call stream dropped before terminal reply; registry entry stays open"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::wire::ReplyFrame;

    fn open(registry: &Rc<CorrelationRegistry>, id: &str) -> CallStream {
        let request_id = RequestId::new(id);
        assert!(registry.register(request_id.clone()));
        CallStream::new(request_id, Rc::clone(registry))
    }

    fn deliver(
        registry: &CorrelationRegistry,
        id: &str,
        status: Value,
        index: u64,
        message: Value,
    ) {
        registry.deliver(ReplyFrame {
            request_id: RequestId::new(id),
            status,
            index,
            message,
        });
    }

    #[tokio::test]
    async fn test_partials_then_success() {
        let registry = Rc::new(CorrelationRegistry::new());
        let stream = open(&registry, "echo");

        deliver(&registry, "echo", json!(""), 0, json!(1));
        deliver(&registry, "echo", json!(""), 1, json!(2));
        deliver(&registry, "echo", json!(""), 2, json!(3));
        deliver(&registry, "echo", json!("success"), 3, Value::Null);

        let items: Vec<_> = stream.collect().await;
        assert_eq!(items, vec![Ok(json!(1)), Ok(json!(2)), Ok(json!(3))]);
        assert_eq!(registry.open_calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_surfaced_unwrapped() {
        let registry = Rc::new(CorrelationRegistry::new());
        let mut stream = open(&registry, "f");

        deliver(&registry, "f", json!(""), 0, json!("v"));
        deliver(&registry, "f", json!("failure"), 1, json!({"error": "E"}));

        assert_eq!(stream.next().await, Some(Ok(json!("v"))));
        let err = stream.next().await.expect("item").expect_err("failure");
        assert_eq!(err.failure_payload(), Some(&json!({"error": "E"})));
        assert_eq!(stream.next().await, None);
        assert!(stream.is_terminated());
        assert_eq!(registry.open_calls(), 0);
    }

    #[tokio::test]
    async fn test_illegal_status_is_protocol_violation() {
        let registry = Rc::new(CorrelationRegistry::new());
        let mut stream = open(&registry, "m");

        deliver(&registry, "m", json!("maybe"), 0, json!(1));

        let err = stream.next().await.expect("item").expect_err("violation");
        assert_eq!(
            err,
            CallError::ProtocolViolation {
                request_id: RequestId::new("m"),
                status: "maybe".to_string(),
            }
        );
        assert_eq!(stream.next().await, None);
        assert!(!registry.contains(&RequestId::new("m")));
    }

    #[tokio::test]
    async fn test_non_string_status_is_protocol_violation() {
        let registry = Rc::new(CorrelationRegistry::new());
        let mut stream = open(&registry, "n");

        deliver(&registry, "n", Value::Null, 0, json!("partial"));
        deliver(&registry, "n", json!(7), 1, json!(1));

        assert_eq!(stream.next().await, Some(Ok(json!("partial"))));
        assert_eq!(
            stream.next().await,
            Some(Err(CallError::ProtocolViolation {
                request_id: RequestId::new("n"),
                status: "7".to_string(),
            }))
        );
        assert_eq!(stream.next().await, None);
        assert_eq!(registry.open_calls(), 0);
    }

    #[tokio::test]
    async fn test_success_payload_is_yielded_before_end() {
        let registry = Rc::new(CorrelationRegistry::new());
        let mut stream = open(&registry, "s");

        deliver(&registry, "s", json!("success"), 0, json!({"result": 3}));

        assert_eq!(stream.next().await, Some(Ok(json!({"result": 3}))));
        assert!(stream.is_terminated());
        assert_eq!(stream.next().await, None);
        assert_eq!(registry.open_calls(), 0);
    }

    #[tokio::test]
    async fn test_status_token_case_is_ignored() {
        let registry = Rc::new(CorrelationRegistry::new());
        let mut stream = open(&registry, "c");

        deliver(&registry, "c", json!("SUCCESS"), 0, Value::Null);
        assert_eq!(stream.next().await, None);
        assert_eq!(registry.open_calls(), 0);
    }

    #[tokio::test]
    async fn test_closed_registry_ends_stream() {
        let registry = Rc::new(CorrelationRegistry::new());
        let mut stream = open(&registry, "x");

        deliver(&registry, "x", json!(""), 0, json!("buffered"));
        registry.close();

        assert_eq!(stream.next().await, Some(Ok(json!("buffered"))));
        assert_eq!(
            stream.next().await,
            Some(Err(CallError::ChannelClosed {
                request_id: RequestId::new("x"),
            }))
        );
        assert_eq!(stream.next().await, None);
        assert_eq!(registry.open_calls(), 0);
    }

    #[tokio::test]
    async fn test_dropped_stream_keeps_buffering() {
        let registry = Rc::new(CorrelationRegistry::new());
        let stream = open(&registry, "leak");
        drop(stream);

        deliver(&registry, "leak", json!(""), 0, json!(1));
        deliver(&registry, "leak", json!(""), 1, json!(2));

        assert_eq!(registry.open_calls(), 1);
        assert_eq!(registry.buffered(&RequestId::new("leak")), 2);
    }

    #[tokio::test]
    async fn test_next_index_tracks_pulls() {
        let registry = Rc::new(CorrelationRegistry::new());
        let mut stream = open(&registry, "i");
        assert_eq!(stream.next_index(), 0);

        deliver(&registry, "i", json!(""), 0, json!(0));
        stream.next().await;
        assert_eq!(stream.next_index(), 1);
        assert_eq!(stream.request_id().as_str(), "i");
    }
}
