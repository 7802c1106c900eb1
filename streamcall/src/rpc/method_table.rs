//! MethodTable: method name → handler routing on the callee side.
//!
//! A handler receives the shared [`Request`] and either finishes (`Ok(None)`),
//! names the next handler to run for the same request (`Ok(Some(name))`), or
//! fails (`Err(failure)`). Redirects are what let handlers compose as
//! middleware.

use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::error::ApplicationFailure;

use super::request::Request;

/// Outcome of one handler invocation: an optional redirect target.
pub type HandlerResult = Result<Option<String>, ApplicationFailure>;

/// A named step in a dispatch chain.
///
/// Implemented for every `Fn(Rc<Request>) -> impl Future<Output = HandlerResult>`,
/// so plain async closures can be registered directly.
pub trait Handler {
    /// Run this handler against `request`.
    fn handle(&self, request: Rc<Request>) -> LocalBoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Rc<Request>) -> Fut,
    Fut: Future<Output = HandlerResult> + 'static,
{
    fn handle(&self, request: Rc<Request>) -> LocalBoxFuture<'static, HandlerResult> {
        self(request).boxed_local()
    }
}

/// Registry of handlers owned by one [`Dispatcher`](super::Dispatcher).
#[derive(Default)]
pub struct MethodTable {
    handlers: HashMap<String, Rc<dyn Handler>>,
}

impl MethodTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, returning the handler it replaced.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H) -> Option<Rc<dyn Handler>>
    where
        H: Handler + 'static,
    {
        let name = name.into();
        let previous = self.handlers.insert(name.clone(), Rc::new(handler));
        if previous.is_some() {
            tracing::debug!(method = %name, "handler replaced");
        }
        previous
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<H>(mut self, name: impl Into<String>, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.register(name, handler);
        self
    }

    /// Look up the handler for `name`.
    pub fn get(&self, name: &str) -> Option<Rc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    /// Remove the handler for `name`.
    pub fn remove(&mut self, name: &str) -> Option<Rc<dyn Handler>> {
        self.handlers.remove(name)
    }

    /// Whether a handler is registered for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered method names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
