//! Identifiers for scheduled events.
//!
//! Every activation (queued or triggered) gets a fresh [`EventId`]. Deferred
//! deactivations compare against it so that a timer never touches a channel
//! that has since been cleared and re-driven by another event.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

/// Monotonic allocator for [`EventId`].
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_event: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_event(&mut self) -> EventId {
        let id = EventId(self.next_event);
        self.next_event = self.next_event.wrapping_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_event(), EventId(0));
        assert_eq!(alloc.alloc_event(), EventId(1));
        assert_eq!(alloc.alloc_event(), EventId(2));
    }
}
