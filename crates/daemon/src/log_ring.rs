// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log Ring (C2, SPEC_FULL.md §4.2): a bounded per-session buffer of
//! captured output lines with multi-subscriber fan-out.
//!
//! Each session owns one ring. Lines arrive from the Process Adapter and are
//! appended under a single lock; each live subscriber gets its own bounded
//! channel, so a slow subscriber only drops its own backlog (with a
//! synthetic gap notice) rather than blocking the writer or other
//! subscribers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use devhost_core::{Clock, LogEvent, LogLevel, LogStream};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Channel capacity for one subscriber. Chosen generously relative to
/// expected line rates; see SPEC_FULL.md §5 for the back-pressure policy.
const SUBSCRIBER_CAPACITY: usize = 1024;

struct Subscriber {
    tx: mpsc::Sender<LogEvent>,
}

pub struct LogRing<C: Clock = devhost_core::SystemClock> {
    capacity: usize,
    clock: C,
    buffer: Mutex<VecDeque<LogEvent>>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_seq: AtomicU64,
}

impl<C: Clock> LogRing<C> {
    pub fn new(capacity: usize, clock: C) -> Self {
        Self {
            capacity,
            clock,
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            subscribers: Mutex::new(Vec::new()),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Append a line of raw output, assigning it the next sequence number,
    /// and fan it out to every live subscriber.
    pub fn push_line(&self, stream: LogStream, line: String, truncated: bool) {
        let event = LogEvent {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            ts: self.clock.now(),
            stream,
            level: LogLevel::Info,
            line,
            truncated,
        };
        self.push(event);
    }

    /// Append a synthetic system event (ring-bookkeeping, not captured
    /// output) — e.g. a crash notice that the Session Supervisor emits
    /// alongside its own state transition.
    pub fn push_system(&self, line: String) {
        let event = LogEvent::system(
            self.next_seq.fetch_add(1, Ordering::SeqCst),
            self.clock.now(),
            line,
        );
        self.push(event);
    }

    fn push(&self, event: LogEvent) {
        let evicted = {
            let mut buf = self.buffer.lock();
            buf.push_back(event.clone());
            let mut evicted = 0u64;
            while buf.len() > self.capacity {
                buf.pop_front();
                evicted += 1;
            }
            evicted
        };

        let mut subs = self.subscribers.lock();

        if evicted > 0 {
            // Eviction burst: announce it once to every live subscriber so a
            // connected reader knows it missed entries, not just a resuming
            // one (see the gap emitted from `subscribe_from`).
            let gap = LogEvent::system(
                self.next_seq.fetch_add(1, Ordering::SeqCst),
                self.clock.now(),
                format!("{{\"lost\": {evicted}}}"),
            );
            subs.retain_mut(|sub| !matches!(
                sub.tx.try_send(gap.clone()),
                Err(mpsc::error::TrySendError::Closed(_))
            ));
        }

        subs.retain_mut(|sub| match sub.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                // The subscriber's channel is full: drop this event for it
                // specifically and let it know, rather than blocking the
                // writer or other subscribers.
                let lost = LogEvent::system(
                    self.next_seq.fetch_add(1, Ordering::SeqCst),
                    self.clock.now(),
                    "{\"lost\": 1}".to_string(),
                );
                let _ = sub.tx.try_send(lost);
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Snapshot of everything currently retained, in ascending `seq` order.
    pub fn tail(&self) -> Vec<LogEvent> {
        self.buffer.lock().iter().cloned().collect()
    }

    /// Subscribe for new lines going forward. If `after_seq` is given and
    /// older entries are still in the ring, those are replayed first; if
    /// the resume point has already fallen out of the ring, a `System` gap
    /// event is emitted before live events resume.
    pub fn subscribe_from(&self, after_seq: Option<u64>) -> mpsc::Receiver<LogEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let buf = self.buffer.lock();

        if let Some(after) = after_seq {
            let oldest = buf.front().map(|e| e.seq);
            if let Some(oldest) = oldest {
                if after + 1 < oldest {
                    let gap = oldest - after - 1;
                    let _ = tx.try_send(LogEvent::system(
                        oldest.saturating_sub(1),
                        self.clock.now(),
                        format!("{} log entries were dropped before this point", gap),
                    ));
                }
            }
            for event in buf.iter().filter(|e| e.seq > after) {
                let _ = tx.try_send(event.clone());
            }
        }

        self.subscribers.lock().push(Subscriber { tx });
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
#[path = "log_ring_tests.rs"]
mod tests;
