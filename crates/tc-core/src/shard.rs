//! Hash-slot routing for documents
//!
//! Each slice of a collection owns a contiguous slot range; a document is
//! routed by hashing its unique key into a slot.

use crc::{Crc, CRC_16_XMODEM};
use serde::{Deserialize, Serialize};

/// Total number of hash slots
pub const TOTAL_SLOTS: u32 = 16384;

/// CRC16 calculator (XMODEM variant)
static CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Calculate slot for a document key
pub fn slot_for_key(key: &[u8]) -> u32 {
    CRC16.checksum(key) as u32 % TOTAL_SLOTS
}

/// Slot range [start, end)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRange {
    /// Start slot (inclusive)
    pub start: u32,
    /// End slot (exclusive)
    pub end: u32,
}

impl SlotRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, slot: u32) -> bool {
        slot >= self.start && slot < self.end
    }

    pub fn slot_count(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Partition the full slot space into `count` contiguous ranges.
    ///
    /// The last range absorbs the remainder.
    pub fn partition(count: u32) -> Vec<SlotRange> {
        if count == 0 {
            return Vec::new();
        }
        let per_range = TOTAL_SLOTS / count;
        (0..count)
            .map(|i| {
                let start = i * per_range;
                let end = if i == count - 1 {
                    TOTAL_SLOTS
                } else {
                    (i + 1) * per_range
                };
                SlotRange::new(start, end)
            })
            .collect()
    }
}

impl std::fmt::Display for SlotRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
