//! Caller: starts calls and routes their replies.
//!
//! A call is sent as soon as [`Caller::call`] returns. Its replies are then
//! buffered in the shared [`CorrelationRegistry`] by the listener task until
//! the [`CallStream`] pulls them. Any number of calls can be outstanding on
//! the same channel.

use std::rc::Rc;

use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::channel::Channel;
use crate::config::CallerConfig;
use crate::error::CallError;
use crate::providers::{RandomProvider, TaskProvider, ThreadRandomProvider};
use crate::wire::{CallFrame, Frame};

use super::call_stream::CallStream;
use super::correlation::CorrelationRegistry;
use super::request_id::RequestIdGenerator;

/// The calling end of a channel.
pub struct Caller {
    channel: Rc<dyn Channel>,
    registry: Rc<CorrelationRegistry>,
    ids: Box<dyn RequestIdGenerator>,
}

impl Caller {
    /// Create a caller drawing request ids from the thread-local CSPRNG.
    pub fn new(channel: Rc<dyn Channel>, config: CallerConfig) -> Self {
        Self::with_random(channel, config, ThreadRandomProvider::new())
    }

    /// Create a caller drawing request ids from `random`.
    ///
    /// Pass a [`SeededRandomProvider`](crate::SeededRandomProvider) for
    /// reproducible ids.
    pub fn with_random<R: RandomProvider>(
        channel: Rc<dyn Channel>,
        config: CallerConfig,
        random: R,
    ) -> Self {
        Self {
            channel,
            registry: Rc::new(CorrelationRegistry::new()),
            ids: config.id_strategy.generator(random),
        }
    }

    /// The registry holding this caller's open calls.
    pub fn registry(&self) -> &Rc<CorrelationRegistry> {
        &self.registry
    }

    /// Spawn the task that routes inbound replies into the registry.
    ///
    /// The task ends when the channel closes, after closing the registry.
    pub fn spawn_listener<T: TaskProvider>(&self, tasks: &T) -> JoinHandle<()> {
        let channel = Rc::clone(&self.channel);
        let registry = Rc::clone(&self.registry);
        tasks.spawn_task("caller-listener", listen(channel, registry))
    }

    /// Invoke `method` with `args`.
    ///
    /// # Errors
    ///
    /// - [`CallError::ChannelClosed`] if the listener already saw the channel close
    /// - [`CallError::Send`] if the channel rejected the call frame; nothing
    ///   stays registered in that case
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<CallStream, CallError> {
        let request_id = loop {
            let candidate = self.ids.next_id();
            if self.registry.is_closed() {
                return Err(CallError::ChannelClosed {
                    request_id: candidate,
                });
            }
            if self.registry.register(candidate.clone()) {
                break candidate;
            }
            tracing::warn!(request_id = %candidate, "request id collision, redrawing");
        };

        let frame = Frame::Call(CallFrame {
            request_id: request_id.clone(),
            method: method.to_string(),
            args,
        });
        if let Err(err) = self.channel.send(&frame) {
            self.registry.deregister(&request_id);
            return Err(CallError::Send(err));
        }

        tracing::trace!(request_id = %request_id, method, "call sent");
        Ok(CallStream::new(request_id, Rc::clone(&self.registry)))
    }

    /// Invoke `method` and gather every partial result.
    ///
    /// # Errors
    ///
    /// Anything [`call`](Self::call) or the stream produces. Partial results
    /// received before a failure are discarded.
    pub async fn collect(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>, CallError> {
        let mut stream = self.call(method, args)?;
        let mut values = Vec::new();
        while let Some(item) = stream.next().await {
            values.push(item?);
        }
        Ok(values)
    }

    /// Invoke `method` and return its last result, or `null` if it sent none.
    ///
    /// For single-shot peers that answer with one `"success"` reply, that
    /// reply's message is the result.
    ///
    /// # Errors
    ///
    /// Same as [`collect`](Self::collect).
    pub async fn call_unary(&self, method: &str, args: Vec<Value>) -> Result<Value, CallError> {
        let mut stream = self.call(method, args)?;
        let mut last = Value::Null;
        while let Some(item) = stream.next().await {
            last = item?;
        }
        Ok(last)
    }
}

/// Route replies from `channel` into `registry` until the channel closes.
async fn listen(channel: Rc<dyn Channel>, registry: Rc<CorrelationRegistry>) {
    while let Some(event) = channel.recv().await {
        match event {
            Ok(Frame::Reply(reply)) => registry.deliver(reply),
            Ok(Frame::Call(call)) => {
                tracing::warn!(
                    request_id = %call.request_id,
                    method = %call.method,
                    "call frame on a calling channel, ignoring"
                );
            }
            Err(err) => {
                tracing::error!(error = %err, "channel fault");
            }
        }
    }

    tracing::debug!(
        open_calls = registry.open_calls(),
        "caller channel closed"
    );
    registry.close();
}
