// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded per-connection outbound queue with drop-oldest overflow.
//!
//! Producers never wait: when the queue is full the oldest message is
//! discarded to make room. The single consumer (the connection writer)
//! awaits new items through a [`Notify`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

/// Result of pushing one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Admitted without displacing anything.
    Queued,
    /// Admitted after dropping the oldest queued message.
    DisplacedOldest,
    /// The queue was closed; the message was discarded.
    Closed,
}

struct Inner {
    items: VecDeque<Arc<str>>,
    closed: bool,
}

pub struct OutboundQueue {
    capacity: usize,
    inner: Mutex<Inner>,
    notify: Notify,
    dropped: AtomicU64,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn push(&self, message: Arc<str>) -> PushOutcome {
        let outcome = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.closed {
                return PushOutcome::Closed;
            }
            let outcome = if inner.items.len() >= self.capacity {
                inner.items.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                PushOutcome::DisplacedOldest
            } else {
                PushOutcome::Queued
            };
            inner.items.push_back(message);
            outcome
        };
        self.notify.notify_one();
        outcome
    }

    /// Wait for the next message. Returns `None` once the queue is closed;
    /// messages still queued at close time are discarded.
    pub async fn pop(&self) -> Option<Arc<str>> {
        loop {
            {
                let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
                if inner.closed {
                    return None;
                }
                if let Some(message) = inner.items.pop_front() {
                    return Some(message);
                }
            }
            self.notify.notified().await;
        }
    }

    /// Close the queue and wake the consumer.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.closed = true;
            inner.items.clear();
        }
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }

    /// Messages currently waiting.
    pub fn depth(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .len()
    }

    /// Messages dropped since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
