// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 folder-mcp contributors

//! Fixed-capacity, newest-first ring buffer of recent events (C12), fanned
//! out to subscribers. A panicking or lagging subscriber never affects
//! its peers — each subscriber gets its own broadcast receiver and a
//! dropped/lagged receiver only loses that subscriber's messages.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 500;

/// A single ring entry: whatever the caller emitted, plus a synthesized
/// id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: u64,
    pub timestamp_ms: u64,
    pub kind: String,
    pub folder_path: Option<std::path::PathBuf>,
    pub message: String,
}

pub struct ActivityRing {
    capacity: usize,
    next_id: Mutex<u64>,
    entries: Mutex<VecDeque<ActivityEvent>>,
    publish_tx: broadcast::Sender<ActivityEvent>,
}

impl ActivityRing {
    pub fn new(capacity: usize) -> Self {
        let (publish_tx, _rx) = broadcast::channel(capacity.max(16));
        Self {
            capacity: capacity.max(1),
            next_id: Mutex::new(0),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            publish_tx,
        }
    }

    /// `emit(input)`: synthesizes `{id, timestamp}`, unshifts it to the
    /// front, trims to capacity, and fans out to subscribers.
    pub fn emit(&self, kind: impl Into<String>, folder_path: Option<std::path::PathBuf>, message: impl Into<String>, timestamp_ms: u64) {
        let id = {
            let mut next = self.next_id.lock();
            let id = *next;
            *next += 1;
            id
        };
        let event = ActivityEvent { id, timestamp_ms, kind: kind.into(), folder_path, message: message.into() };

        {
            let mut entries = self.entries.lock();
            entries.push_front(event.clone());
            while entries.len() > self.capacity {
                entries.pop_back();
            }
        }

        let _ = self.publish_tx.send(event);
    }

    pub fn recent(&self) -> Vec<ActivityEvent> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.publish_tx.subscribe()
    }
}

impl Default for ActivityRing {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_is_newest_first_and_trims_to_capacity() {
        let ring = ActivityRing::new(2);
        ring.emit("folder:added", None, "a", 1);
        ring.emit("folder:added", None, "b", 2);
        ring.emit("folder:added", None, "c", 3);

        let recent = ring.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "c");
        assert_eq!(recent[1].message, "b");
    }

    #[tokio::test]
    async fn one_lagging_subscriber_does_not_affect_another() {
        let ring = ActivityRing::new(500);
        let mut fast = ring.subscribe();
        let mut slow = ring.subscribe();
        drop(slow); // simulate a subscriber that went away entirely

        ring.emit("queue:started", None, "go", 1);
        let got = fast.recv().await.unwrap();
        assert_eq!(got.message, "go");

        // re-subscribing after a dropped receiver must not panic the ring
        slow = ring.subscribe();
        ring.emit("queue:completed", None, "done", 2);
        assert_eq!(slow.recv().await.unwrap().message, "done");
    }
}
