//! Store-and-forward queue for messages that could not be delivered.
//!
//! The queue is bounded; when full, the oldest message is dropped so the
//! most recent facts survive. It serializes to a versioned JSON snapshot so
//! it can be persisted across reboots, and a snapshot written by an
//! incompatible firmware is rejected wholesale rather than half-read.

use std::collections::VecDeque;

use fabomatic_core::constants::{MAX_BUFFERED_MESSAGES, MAX_MSG_SIZE};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Version stamp of the snapshot layout.
const SNAPSHOT_MAGIC: u32 = 0x4567;

/// One message awaiting retransmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferedMsg {
    /// JSON payload, already encoded.
    pub payload: String,
    /// Topic to publish on.
    pub topic: String,
    /// Whether the original sender expected a reply.
    pub wait_for_reply: bool,
}

impl BufferedMsg {
    #[must_use]
    pub fn new(payload: String, topic: String, wait_for_reply: bool) -> Self {
        Self {
            payload,
            topic,
            wait_for_reply,
        }
    }
}

/// Bounded FIFO of undelivered messages, oldest first.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MessageBuffer {
    queue: VecDeque<BufferedMsg>,
    /// Set whenever the contents change, cleared by [`Self::mark_saved`].
    dirty: bool,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    magic: u32,
    messages: Vec<BufferedMsg>,
}

impl MessageBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, dropping the oldest one if the buffer is full.
    /// Payloads over [`MAX_MSG_SIZE`] are refused; they would not fit the
    /// transmit window anyway.
    pub fn push_back(&mut self, msg: BufferedMsg) {
        if Self::oversized(&msg) {
            return;
        }
        if self.queue.len() >= MAX_BUFFERED_MESSAGES {
            warn!(capacity = MAX_BUFFERED_MESSAGES, "buffer full, dropping oldest message");
            self.queue.pop_front();
        }
        self.queue.push_back(msg);
        self.dirty = true;
    }

    /// Re-queue a message at the front, for a message taken out with
    /// [`Self::pop_front`] whose retransmission failed.
    pub fn push_front(&mut self, msg: BufferedMsg) {
        if Self::oversized(&msg) {
            return;
        }
        if self.queue.len() >= MAX_BUFFERED_MESSAGES {
            warn!(capacity = MAX_BUFFERED_MESSAGES, "buffer full, dropping front message");
            self.queue.pop_front();
        }
        self.queue.push_front(msg);
        self.dirty = true;
    }

    fn oversized(msg: &BufferedMsg) -> bool {
        if msg.payload.len() > MAX_MSG_SIZE {
            warn!(
                size = msg.payload.len(),
                max = MAX_MSG_SIZE,
                "payload too large to buffer, dropping"
            );
            return true;
        }
        false
    }

    /// Take the oldest message for retransmission.
    pub fn pop_front(&mut self) -> Option<BufferedMsg> {
        let msg = self.queue.pop_front();
        if msg.is_some() {
            self.dirty = true;
        }
        msg
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether the contents changed since the last [`Self::mark_saved`].
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Encode the queue as a versioned snapshot.
    ///
    /// # Errors
    /// Returns a `serde_json` error if encoding fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&Snapshot {
            magic: SNAPSHOT_MAGIC,
            messages: self.queue.iter().cloned().collect(),
        })
    }

    /// Decode a snapshot, preserving message order.
    ///
    /// Returns `None` for unparseable input or a version-stamp mismatch;
    /// the caller starts with an empty buffer in that case.
    #[must_use]
    pub fn from_json(json: &str) -> Option<Self> {
        let snapshot: Snapshot = match serde_json::from_str(json) {
            Ok(s) => s,
            Err(err) => {
                warn!(%err, "unparseable buffer snapshot, discarding");
                return None;
            }
        };
        if snapshot.magic != SNAPSHOT_MAGIC {
            warn!(
                found = snapshot.magic,
                expected = SNAPSHOT_MAGIC,
                "buffer snapshot version mismatch, discarding"
            );
            return None;
        }
        Some(Self {
            queue: snapshot.messages.into(),
            dirty: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(n: usize) -> BufferedMsg {
        BufferedMsg::new(format!(r#"{{"n":{n}}}"#), "/machine/test1".into(), false)
    }

    #[test]
    fn test_fifo_order() {
        let mut buf = MessageBuffer::new();
        buf.push_back(msg(1));
        buf.push_back(msg(2));
        assert_eq!(buf.pop_front(), Some(msg(1)));
        assert_eq!(buf.pop_front(), Some(msg(2)));
        assert_eq!(buf.pop_front(), None);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut buf = MessageBuffer::new();
        for n in 0..MAX_BUFFERED_MESSAGES + 5 {
            buf.push_back(msg(n));
        }
        assert_eq!(buf.len(), MAX_BUFFERED_MESSAGES);
        // The 5 oldest messages are gone.
        assert_eq!(buf.pop_front(), Some(msg(5)));
    }

    #[test]
    fn test_oversized_payload_refused() {
        let mut buf = MessageBuffer::new();
        let big = BufferedMsg::new("x".repeat(MAX_MSG_SIZE + 1), "/machine/test1".into(), false);
        buf.push_back(big.clone());
        buf.push_front(big);
        assert!(buf.is_empty());
        assert!(!buf.is_dirty());
    }

    #[test]
    fn test_push_front_requeues() {
        let mut buf = MessageBuffer::new();
        buf.push_back(msg(1));
        buf.push_back(msg(2));
        let taken = buf.pop_front().unwrap();
        buf.push_front(taken);
        assert_eq!(buf.pop_front(), Some(msg(1)));
    }

    #[test]
    fn test_snapshot_roundtrip_preserves_order() {
        let mut buf = MessageBuffer::new();
        buf.push_front(msg(1));
        buf.push_front(msg(2));
        buf.push_front(msg(3));
        let json = buf.to_json().unwrap();
        let mut restored = MessageBuffer::from_json(&json).unwrap();
        assert_eq!(restored.pop_front(), Some(msg(3)));
        assert_eq!(restored.pop_front(), Some(msg(2)));
        assert_eq!(restored.pop_front(), Some(msg(1)));
    }

    #[test]
    fn test_snapshot_bad_magic_rejected() {
        let json = r#"{"magic":1,"messages":[]}"#;
        assert!(MessageBuffer::from_json(json).is_none());
    }

    #[test]
    fn test_snapshot_garbage_rejected() {
        assert!(MessageBuffer::from_json("{{{").is_none());
        assert!(MessageBuffer::from_json("").is_none());
    }

    #[test]
    fn test_dirty_tracking() {
        let mut buf = MessageBuffer::new();
        assert!(!buf.is_dirty());
        buf.push_back(msg(1));
        assert!(buf.is_dirty());
        buf.mark_saved();
        assert!(!buf.is_dirty());
        buf.pop_front();
        assert!(buf.is_dirty());
    }
}
