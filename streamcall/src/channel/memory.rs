//! In-process channel over unbounded tokio mpsc queues.
//!
//! Frames are encoded with a [`MessageCodec`] on send and decoded on receive,
//! so the ends exchange plain byte payloads just like a real transport would.

use std::cell::{Cell, RefCell};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::error::ChannelError;
use crate::wire::{Frame, JsonCodec, MessageCodec};

use super::Channel;

/// One end of an in-memory duplex channel.
///
/// There is no flow control: both directions are unbounded.
pub struct MemoryChannel<C: MessageCodec = JsonCodec> {
    /// Sending half; `None` once closed.
    outbound: RefCell<Option<mpsc::UnboundedSender<Vec<u8>>>>,

    /// Receiving half. Locked for the duration of a `recv`.
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,

    codec: C,

    frames_sent: Cell<u64>,
}

impl MemoryChannel<JsonCodec> {
    /// Create two connected ends using [`JsonCodec`].
    pub fn pair() -> (Self, Self) {
        Self::pair_with_codec(JsonCodec)
    }
}

impl<C: MessageCodec> MemoryChannel<C> {
    /// Create two connected ends using the given codec.
    pub fn pair_with_codec(codec: C) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();

        let a = Self {
            outbound: RefCell::new(Some(a_tx)),
            inbound: Mutex::new(a_rx),
            codec: codec.clone(),
            frames_sent: Cell::new(0),
        };
        let b = Self {
            outbound: RefCell::new(Some(b_tx)),
            inbound: Mutex::new(b_rx),
            codec,
            frames_sent: Cell::new(0),
        };
        (a, b)
    }

    /// Push raw bytes to the peer, bypassing the codec.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the sending half is closed.
    pub fn send_raw(&self, payload: Vec<u8>) -> Result<(), ChannelError> {
        let outbound = self.outbound.borrow();
        let sender = outbound.as_ref().ok_or(ChannelError::Closed)?;
        sender.send(payload).map_err(|_| ChannelError::Closed)
    }

    /// Number of frames successfully sent from this end.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.get()
    }

    /// Whether this end's sending half has been closed.
    pub fn is_closed(&self) -> bool {
        match self.outbound.borrow().as_ref() {
            Some(sender) => sender.is_closed(),
            None => true,
        }
    }
}

#[async_trait(?Send)]
impl<C: MessageCodec> Channel for MemoryChannel<C> {
    fn send(&self, frame: &Frame) -> Result<(), ChannelError> {
        let payload = self
            .codec
            .encode(frame)
            .map_err(|e| ChannelError::Codec {
                message: e.to_string(),
            })?;
        self.send_raw(payload)?;
        self.frames_sent.set(self.frames_sent.get() + 1);
        Ok(())
    }

    async fn recv(&self) -> Option<Result<Frame, ChannelError>> {
        let payload = self.inbound.lock().await.recv().await?;
        Some(
            self.codec
                .decode::<Frame>(&payload)
                .map_err(|e| ChannelError::Codec {
                    message: e.to_string(),
                }),
        )
    }

    fn close(&self) {
        if self.outbound.borrow_mut().take().is_some() {
            tracing::debug!("memory channel sending half closed");
        }
    }
}
