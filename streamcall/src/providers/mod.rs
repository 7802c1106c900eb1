//! Provider abstractions for task spawning and randomness.
//!
//! The crate never reaches for ambient runtime state directly: task spawning
//! goes through a [`TaskProvider`] and request identifiers draw from a
//! [`RandomProvider`], so tests can substitute deterministic versions.

mod random;
mod task;

pub use random::{RandomProvider, SeededRandomProvider, ThreadRandomProvider};
pub use task::{TaskProvider, TokioTaskProvider};
