//! Dispatcher: runs an inbound call through the redirect chain.
//!
//! ```text
//! current = request.method
//! loop:
//!     handler = methods[current]        (missing → HandlerNotFound)
//!     match handler(request):
//!         Ok(Some(next)) → current = next
//!         Ok(None)       → stop
//!         Err(failure)   → abort(failure), return error
//! finally: close()                      (no-op after abort)
//! ```
//!
//! The `finally` step is a drop guard, so it also runs when the dispatch
//! future is dropped part way through or a handler panics. In those two cases
//! the guard aborts instead of closing.

use std::rc::Rc;

use crate::channel::Channel;
use crate::config::DispatcherConfig;
use crate::error::{ApplicationFailure, DispatchError};
use crate::wire::CallFrame;

use super::method_table::MethodTable;
use super::request::Request;

/// Routes inbound calls through its own [`MethodTable`].
pub struct Dispatcher {
    methods: MethodTable,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Create a dispatcher with the default configuration.
    pub fn new(methods: MethodTable) -> Self {
        Self::with_config(methods, DispatcherConfig::default())
    }

    /// Create a dispatcher with an explicit configuration.
    pub fn with_config(methods: MethodTable, config: DispatcherConfig) -> Self {
        Self { methods, config }
    }

    /// The method table this dispatcher routes through.
    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    /// Handle one inbound call, sending its replies on `channel`.
    ///
    /// The request is terminated exactly once before this returns.
    ///
    /// # Errors
    ///
    /// Returns the [`DispatchError`] that aborted the request, so the host
    /// can report it. The caller has already been sent
    /// [`DispatchError::to_failure`].
    pub async fn dispatch(
        &self,
        call: CallFrame,
        channel: Rc<dyn Channel>,
    ) -> Result<(), DispatchError> {
        let request = Rc::new(Request::new(call, channel));
        let mut finalizer = Finalizer::new(Rc::clone(&request));

        let outcome = self.run_chain(&request).await;
        finalizer.complete();

        if let Err(err) = &outcome {
            if let Err(send_err) = request.abort(err.to_failure()) {
                tracing::warn!(
                    request_id = %request.request_id(),
                    error = %send_err,
                    "failed to send failure reply"
                );
            }
        }
        outcome
    }

    async fn run_chain(&self, request: &Rc<Request>) -> Result<(), DispatchError> {
        let mut current = request.method().to_string();
        let mut redirects: u32 = 0;

        loop {
            let handler =
                self.methods
                    .get(&current)
                    .ok_or_else(|| DispatchError::HandlerNotFound {
                        method: current.clone(),
                    })?;

            tracing::trace!(
                request_id = %request.request_id(),
                method = %current,
                "invoking handler"
            );

            let Some(next) = handler.handle(Rc::clone(request)).await? else {
                return Ok(());
            };

            redirects += 1;
            if let Some(limit) = self.config.max_redirects {
                if redirects > limit {
                    return Err(DispatchError::RedirectLimit { limit });
                }
            }

            tracing::debug!(
                request_id = %request.request_id(),
                from = %current,
                to = %next,
                "redirect"
            );
            current = next;
        }
    }
}

/// Terminates its request when dropped.
///
/// After [`complete`](Self::complete) the drop closes the request, which is a
/// no-op if it was already aborted. Dropped before completion (cancellation
/// or panic), it aborts instead.
struct Finalizer {
    request: Rc<Request>,
    completed: bool,
}

impl Finalizer {
    fn new(request: Rc<Request>) -> Self {
        Self {
            request,
            completed: false,
        }
    }

    fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for Finalizer {
    fn drop(&mut self) {
        let result = if self.completed {
            self.request.close()
        } else {
            let reason = if std::thread::panicking() {
                "handler panicked"
            } else {
                "dispatch interrupted"
            };
            tracing::warn!(
                request_id = %self.request.request_id(),
                reason,
                "request terminated before its handler chain finished"
            );
            self.request.abort(ApplicationFailure::new(reason))
        };

        if let Err(err) = result {
            tracing::warn!(
                request_id = %self.request.request_id(),
                error = %err,
                "failed to send terminal reply"
            );
        }
    }
}
