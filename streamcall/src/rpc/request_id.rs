//! Request identifier generation.
//!
//! Two formats are supported:
//!
//! ```text
//! Uuid     XXXXXXXX-XXXX-4XXX-YXXX-XXXXXXXXXXXX   (Y ∈ 8..B, 122 random bits)
//! Compact  0000000XXXXXXXXXXXXX                   (53 random bits, hex)
//! ```

use std::fmt::Write;

use crate::config::IdStrategy;
use crate::providers::RandomProvider;
use crate::wire::RequestId;

const VERSION_BITS: u8 = 0x40;
const VARIANT_BITS: u8 = 0x80;

/// Source of request identifiers for one caller.
pub trait RequestIdGenerator {
    /// Produce the next identifier.
    fn next_id(&self) -> RequestId;
}

/// UUID-v4-shaped identifiers assembled from four random 32-bit words.
#[derive(Clone, Debug)]
pub struct UuidIdGenerator<R: RandomProvider> {
    random: R,
}

impl<R: RandomProvider> UuidIdGenerator<R> {
    /// Create a generator drawing from `random`.
    pub fn new(random: R) -> Self {
        Self { random }
    }
}

impl<R: RandomProvider> RequestIdGenerator for UuidIdGenerator<R> {
    fn next_id(&self) -> RequestId {
        let mut bytes = [0u8; 16];
        for chunk in bytes.chunks_exact_mut(4) {
            let word: u32 = self.random.random();
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes[6] = (bytes[6] & 0x0f) | VERSION_BITS;
        bytes[8] = (bytes[8] & 0x3f) | VARIANT_BITS;

        let mut token = String::with_capacity(36);
        for (i, byte) in bytes.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                token.push('-');
            }
            // Writing to a String cannot fail.
            let _ = write!(token, "{:02X}", byte);
        }
        RequestId::new(token)
    }
}

/// 53-bit identifiers rendered as 20 zero-padded hex digits.
#[derive(Clone, Debug)]
pub struct CompactIdGenerator<R: RandomProvider> {
    random: R,
}

impl<R: RandomProvider> CompactIdGenerator<R> {
    /// Create a generator drawing from `random`.
    pub fn new(random: R) -> Self {
        Self { random }
    }
}

impl<R: RandomProvider> RequestIdGenerator for CompactIdGenerator<R> {
    fn next_id(&self) -> RequestId {
        let value: u64 = self.random.random::<u64>() >> 11;
        RequestId::new(format!("{:020x}", value))
    }
}

impl IdStrategy {
    /// Build the generator for this strategy.
    pub fn generator<R: RandomProvider>(self, random: R) -> Box<dyn RequestIdGenerator> {
        match self {
            IdStrategy::Uuid => Box::new(UuidIdGenerator::new(random)),
            IdStrategy::Compact => Box::new(CompactIdGenerator::new(random)),
        }
    }
}
