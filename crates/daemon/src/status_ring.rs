// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor-wide status event stream backing `GET /v1/events/stream`
//! (SPEC_FULL.md §4.5): every session state transition, fanned out to
//! subscribers the same way the Log Ring fans out captured lines — bounded
//! per-subscriber channels, drop-oldest-for-the-laggard, with a `system` gap
//! notice on resume past an evicted sequence.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use devhost_core::{Clock, Session};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

const SUBSCRIBER_CAPACITY: usize = 256;
const DEFAULT_CAPACITY: usize = 1_000;

/// One session-state transition, as delivered over `/v1/events/stream`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub seq: u64,
    pub ts: DateTime<Utc>,
    /// `None` marks a synthetic gap notice rather than a real transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<String>,
}

struct Subscriber {
    tx: mpsc::Sender<StatusEvent>,
}

pub struct StatusRing<C: Clock = devhost_core::SystemClock> {
    clock: C,
    buffer: Mutex<VecDeque<StatusEvent>>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_seq: AtomicU64,
}

impl<C: Clock> StatusRing<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            buffer: Mutex::new(VecDeque::with_capacity(DEFAULT_CAPACITY)),
            subscribers: Mutex::new(Vec::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, session: Session) {
        let event = StatusEvent {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            ts: self.clock.now(),
            session: Some(session),
            gap: None,
        };

        {
            let mut buf = self.buffer.lock();
            buf.push_back(event.clone());
            while buf.len() > DEFAULT_CAPACITY {
                buf.pop_front();
            }
        }

        let mut subs = self.subscribers.lock();
        subs.retain_mut(|sub| match sub.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    pub fn subscribe_from(&self, after_seq: Option<u64>) -> mpsc::Receiver<StatusEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let buf = self.buffer.lock();

        if let Some(after) = after_seq {
            let oldest = buf.front().map(|e| e.seq);
            if let Some(oldest) = oldest {
                if after + 1 < oldest {
                    let gap = oldest - after - 1;
                    let _ = tx.try_send(StatusEvent {
                        seq: oldest.saturating_sub(1),
                        ts: self.clock.now(),
                        session: None,
                        gap: Some(format!("{} status events were dropped before this point", gap)),
                    });
                }
            }
            for event in buf.iter().filter(|e| e.seq > after) {
                let _ = tx.try_send(event.clone());
            }
        }

        self.subscribers.lock().push(Subscriber { tx });
        rx
    }
}

#[cfg(test)]
#[path = "status_ring_tests.rs"]
mod tests;
