//! Bounded queue of pending MTC events
//!
//! The translator pushes events tagged with an absolute sample position; the
//! scheduler peeks and pops them once per cycle. Both sides run inside the
//! same audio callback, so a single-threaded ring is sufficient.
//!
//! Capacity is fixed at construction and storage is allocated once. A push
//! onto a full queue fails with [`QueueError::Exhausted`]; unread events are
//! never overwritten.

use ringbuf::{traits::*, HeapRb};
use thiserror::Error;

/// Largest MTC message carried by a queued event
pub const MAX_PAYLOAD: usize = 16;

/// Default number of events that may be pending at once
pub const DEFAULT_QUEUE_CAPACITY: usize = 30;

/// An output message waiting for its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEvent {
    /// Absolute sample position the message targets
    pub alignment: i64,
    payload: [u8; MAX_PAYLOAD],
    size: u8,
}

impl PendingEvent {
    /// Build an event from at most [`MAX_PAYLOAD`] bytes.
    ///
    /// Longer input is truncated; no MTC message comes close.
    pub fn new(alignment: i64, bytes: &[u8]) -> Self {
        let size = bytes.len().min(MAX_PAYLOAD);
        let mut payload = [0u8; MAX_PAYLOAD];
        payload[..size].copy_from_slice(&bytes[..size]);
        Self {
            alignment,
            payload,
            size: size as u8,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.size as usize]
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }
}

/// Push onto a full queue
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("event queue exhausted ({capacity} events pending)")]
    Exhausted { capacity: usize },
}

/// Fixed-capacity FIFO of [`PendingEvent`]s
pub struct EventQueue {
    ring: HeapRb<PendingEvent>,
}

impl EventQueue {
    /// Create a queue holding at most `capacity` events (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: HeapRb::new(capacity.max(1)),
        }
    }

    /// Append an event, failing if the queue is full
    pub fn push(&mut self, event: PendingEvent) -> Result<(), QueueError> {
        self.ring.try_push(event).map_err(|_| QueueError::Exhausted {
            capacity: self.capacity(),
        })
    }

    /// Oldest pending event, left in place
    pub fn peek_front(&self) -> Option<&PendingEvent> {
        self.ring.try_peek()
    }

    /// Remove and return the oldest pending event
    pub fn pop_front(&mut self) -> Option<PendingEvent> {
        self.ring.try_pop()
    }

    /// Pending events, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &PendingEvent> + '_ {
        self.ring.iter()
    }

    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity().get()
    }

    /// Drop every pending event
    pub fn clear(&mut self) {
        self.ring.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(alignment: i64) -> PendingEvent {
        PendingEvent::new(alignment, &[0xF0, 0xF7])
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = EventQueue::new(4);
        queue.push(event(10)).unwrap();
        queue.push(event(20)).unwrap();
        queue.push(event(30)).unwrap();

        assert_eq!(queue.peek_front().map(|e| e.alignment), Some(10));
        assert_eq!(queue.pop_front().map(|e| e.alignment), Some(10));
        assert_eq!(queue.pop_front().map(|e| e.alignment), Some(20));
        assert_eq!(queue.pop_front().map(|e| e.alignment), Some(30));
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn test_push_when_full_fails_without_overwriting() {
        let mut queue = EventQueue::new(2);
        queue.push(event(1)).unwrap();
        queue.push(event(2)).unwrap();
        assert!(queue.is_full());

        let err = queue.push(event(3)).unwrap_err();
        assert_eq!(err, QueueError::Exhausted { capacity: 2 });

        // Oldest event still intact
        assert_eq!(queue.pop_front().map(|e| e.alignment), Some(1));
        assert_eq!(queue.pop_front().map(|e| e.alignment), Some(2));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_capacity_recovers_after_pop() {
        let mut queue = EventQueue::new(1);
        queue.push(event(1)).unwrap();
        assert!(queue.push(event(2)).is_err());
        queue.pop_front();
        assert!(queue.push(event(2)).is_ok());
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(EventQueue::default().capacity(), DEFAULT_QUEUE_CAPACITY);
        assert_eq!(EventQueue::new(0).capacity(), 1);
    }

    #[test]
    fn test_payload_truncated_to_max() {
        let bytes = [0xAAu8; 20];
        let ev = PendingEvent::new(0, &bytes);
        assert_eq!(ev.size(), MAX_PAYLOAD);
        assert_eq!(ev.payload(), &bytes[..MAX_PAYLOAD]);
    }

    #[test]
    fn test_iter_is_oldest_first() {
        let mut queue = EventQueue::new(3);
        for a in [5, 6, 7] {
            queue.push(event(a)).unwrap();
        }
        let order: Vec<i64> = queue.iter().map(|e| e.alignment).collect();
        assert_eq!(order, vec![5, 6, 7]);
        queue.clear();
        assert!(queue.is_empty());
    }
}
