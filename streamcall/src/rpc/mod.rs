//! Streaming calls with redirect dispatch.
//!
//! Caller side:
//! - **RequestIdGenerator**: tokens unique among open calls
//! - **CorrelationRegistry**: per-call, per-index slots resolving the race
//!   between reply arrival and consumer demand
//! - **Caller** / **CallStream**: issue a call, pull its replies in order
//!
//! Callee side:
//! - **Request**: one inbound call; emits indexed replies, terminates once
//! - **MethodTable**: method name → handler
//! - **Dispatcher**: runs the redirect chain under a guaranteed finalizer
//! - **Server**: receive loop spawning one dispatch per inbound call

mod call_stream;
mod caller;
mod correlation;
mod dispatcher;
mod method_table;
mod request;
mod request_id;
mod server;

pub use call_stream::CallStream;
pub use caller::Caller;
pub use correlation::{CorrelationRegistry, Delivery};
pub use dispatcher::Dispatcher;
pub use method_table::{Handler, HandlerResult, MethodTable};
pub use request::Request;
pub use request_id::{CompactIdGenerator, RequestIdGenerator, UuidIdGenerator};
pub use server::Server;
