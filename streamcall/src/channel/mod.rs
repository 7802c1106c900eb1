//! The channel contract both sides of a connection run over.
//!
//! A channel delivers [`Frame`]s in the order they were sent by each side.
//! It never reorders or duplicates frames. Everything above it depends only
//! on that per-sender ordering.

mod memory;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::wire::Frame;

pub use memory::MemoryChannel;

/// One end of an ordered, bidirectional frame transport.
///
/// `recv` yields three kinds of events:
/// - `Some(Ok(frame))`: the next frame from the peer
/// - `Some(Err(fault))`: a channel-level fault not tied to any request;
///   the stream of frames continues afterwards
/// - `None`: the peer's sending half is gone and no more frames will arrive
#[async_trait(?Send)]
pub trait Channel {
    /// Send a frame to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the sending half is closed, or
    /// [`ChannelError::Codec`] if the frame cannot be encoded.
    fn send(&self, frame: &Frame) -> Result<(), ChannelError>;

    /// Wait for the next inbound event.
    async fn recv(&self) -> Option<Result<Frame, ChannelError>>;

    /// Close the sending half. The peer's `recv` ends once it has drained
    /// every frame already sent.
    fn close(&self);
}
