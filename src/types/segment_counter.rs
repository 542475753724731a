//! Counter for generating unique segment IDs.
//!
//! IDs are handed out sequentially starting at zero and are never reused
//! within the lifetime of a store. Only `reset` (store clear) rewinds it.

use serde::{Deserialize, Serialize};

use super::SegmentId;

/// Sequential segment ID generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCounter {
    next_id: u32,
}

impl SegmentCounter {
    /// Creates a new counter starting at 0.
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Creates a counter that continues from a persisted value.
    #[must_use]
    pub fn from_value(next_id: u32) -> Self {
        Self { next_id }
    }

    /// Generates the next segment ID, or `None` once the u32 space is exhausted.
    pub fn next_id(&mut self) -> Option<SegmentId> {
        let current = self.next_id;
        self.next_id = current.checked_add(1)?;
        Some(SegmentId(current))
    }

    /// Checks whether `count` more IDs can be handed out.
    #[must_use]
    pub fn has_room_for(&self, count: usize) -> bool {
        u32::try_from(count)
            .ok()
            .and_then(|count| self.next_id.checked_add(count))
            .is_some()
    }

    /// The value the next call to `next_id` will return.
    #[must_use]
    pub fn peek(&self) -> u32 {
        self.next_id
    }

    /// Resets the counter back to 0.
    pub fn reset(&mut self) {
        self.next_id = 0;
    }
}
