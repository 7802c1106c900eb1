//! Server: the callee-side receive loop.
//!
//! Reads frames from a channel and hands every inbound call to the
//! [`Dispatcher`] on its own local task, so a slow handler never holds up the
//! calls behind it.

use std::rc::Rc;

use tokio::task::JoinHandle;

use crate::channel::Channel;
use crate::providers::TaskProvider;
use crate::wire::Frame;

use super::dispatcher::Dispatcher;

/// Serves one channel with one dispatcher.
pub struct Server<T: TaskProvider> {
    dispatcher: Rc<Dispatcher>,
    channel: Rc<dyn Channel>,
    tasks: T,
}

impl<T: TaskProvider> Server<T> {
    /// Create a server that dispatches calls arriving on `channel`.
    pub fn new(dispatcher: Dispatcher, channel: Rc<dyn Channel>, tasks: T) -> Self {
        Self {
            dispatcher: Rc::new(dispatcher),
            channel,
            tasks,
        }
    }

    /// The dispatcher calls are routed through.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Receive until the channel closes.
    ///
    /// Dispatch tasks already spawned keep running after this returns.
    pub async fn run(&self) {
        while let Some(event) = self.channel.recv().await {
            match event {
                Ok(Frame::Call(call)) => {
                    let dispatcher = Rc::clone(&self.dispatcher);
                    let channel = Rc::clone(&self.channel);
                    let name = format!("dispatch-{}", call.request_id);
                    self.tasks.spawn_task(&name, async move {
                        let request_id = call.request_id.clone();
                        let method = call.method.clone();
                        if let Err(err) = dispatcher.dispatch(call, channel).await {
                            tracing::error!(
                                request_id = %request_id,
                                method = %method,
                                error = %err,
                                "request failed"
                            );
                        }
                    });
                }
                Ok(Frame::Reply(reply)) => {
                    tracing::warn!(
                        request_id = %reply.request_id,
                        "reply frame on a serving channel, ignoring"
                    );
                }
                Err(err) => {
                    tracing::error!(error = %err, "channel fault");
                }
            }
        }
        tracing::debug!("server channel closed");
    }

    /// Run the receive loop on a local task.
    pub fn spawn(self) -> JoinHandle<()> {
        let tasks = self.tasks.clone();
        tasks.spawn_task("server", async move { self.run().await })
    }
}
