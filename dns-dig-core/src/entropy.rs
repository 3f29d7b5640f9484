//! Randomness for presentation-only fields.
//!
//! Transaction ids, byte counts, per-hop timings and synthetic WHOIS ids are
//! decoration, not data. They are drawn from an [`EntropySource`] so tests can
//! pin them down.

use rand::Rng;

/// Source of presentation randomness.
pub trait EntropySource: Send + Sync {
    /// A value in `low..high`. Returns `low` when the range is empty.
    fn in_range(&self, low: u32, high: u32) -> u32;

    /// A 16-bit DNS transaction id.
    fn transaction_id(&self) -> u16 {
        u16::try_from(self.in_range(0, u32::from(u16::MAX) + 1)).unwrap_or(u16::MAX)
    }
}

/// Thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadEntropy;

impl EntropySource for ThreadEntropy {
    fn in_range(&self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        rand::rng().random_range(low..high)
    }
}

/// Deterministic source: always the same offset into the range.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedEntropy(pub u32);

impl EntropySource for FixedEntropy {
    fn in_range(&self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        low + self.0 % (high - low)
    }
}
