//! # streamcall
//!
//! Streaming request/response multiplexing over one shared, ordered,
//! bidirectional message channel.
//!
//! A caller invokes a named remote method and receives zero or more partial
//! results followed by exactly one terminal success or failure. Many calls can
//! be in flight at once over the same channel; every wire record carries the
//! [`RequestId`] of the call it belongs to, and nothing else disambiguates them.
//!
//! ```text
//!  caller side                                   callee side
//! ┌──────────────────────┐    CallFrame     ┌──────────────────────────┐
//! │ Caller               │ ───────────────▶ │ Server ─▶ Dispatcher      │
//! │  • RequestIdGenerator│                  │   • MethodTable           │
//! │  • CorrelationRegistry│ ◀─────────────── │   • Request (emit/close/  │
//! │  • CallStream        │   ReplyFrame×N   │     abort, exactly once)  │
//! └──────────────────────┘                  └──────────────────────────┘
//!                       ╲      Channel      ╱
//! ```
//!
//! On the callee side handlers may *redirect* to another handler by name,
//! forming a middleware chain over the same [`Request`]. The dispatcher wraps
//! the chain in a guaranteed finalizer so every request is terminated exactly
//! once, whether handlers return, fail, or panic.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use futures::StreamExt;
//! use serde_json::json;
//! use streamcall::*;
//!
//! let (caller_end, callee_end) = MemoryChannel::pair();
//!
//! let methods = MethodTable::new().with("echo", |request: Rc<Request>| async move {
//!     for arg in request.args() {
//!         request.emit(arg)?;
//!     }
//!     HandlerResult::Ok(None)
//! });
//! Server::new(Dispatcher::new(methods), Rc::new(callee_end), TokioTaskProvider).spawn();
//!
//! let caller = Caller::new(Rc::new(caller_end), CallerConfig::default());
//! caller.spawn_listener(&TokioTaskProvider);
//!
//! let mut stream = caller.call("echo", vec![json!(1), json!(2), json!(3)])?;
//! while let Some(item) = stream.next().await {
//!     println!("{}", item?);
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

// =============================================================================
// Modules
// =============================================================================

/// Error taxonomy for both sides of a channel.
pub mod error;

/// Caller and dispatcher configuration.
pub mod config;

/// Wire records and byte codecs.
pub mod wire;

/// The channel abstraction and an in-memory implementation.
pub mod channel;

/// Task spawning and randomness providers.
pub mod providers;

/// Call multiplexing, correlation, and redirect dispatch.
pub mod rpc;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ApplicationFailure, CallError, ChannelError, DispatchError, EmitError};

pub use config::{CallerConfig, DispatcherConfig, IdStrategy};

pub use wire::{
    CallFrame, CodecError, Frame, JsonCodec, MessageCodec, ReplyFrame, RequestId, Status,
};

pub use channel::{Channel, MemoryChannel};

pub use providers::{
    RandomProvider, SeededRandomProvider, TaskProvider, ThreadRandomProvider, TokioTaskProvider,
};

pub use rpc::{
    CallStream, Caller, CompactIdGenerator, CorrelationRegistry, Delivery, Dispatcher, Handler,
    HandlerResult, MethodTable, Request, RequestIdGenerator, Server, UuidIdGenerator,
};
