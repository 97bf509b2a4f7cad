// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded FIFO of pending messages.

use alloc::boxed::Box;
use alloc::vec::Vec;

use thiserror::Error;

use crate::message::Message;

/// Returned by [`MessageQueue::enqueue`] when the queue is full.
///
/// Carries the rejected message back to the caller.
#[derive(Debug, Error)]
#[error("message queue is full (capacity {capacity})")]
pub struct QueueFull {
    /// The message that was not enqueued.
    pub message: Message,
    /// Capacity of the queue that rejected it.
    pub capacity: usize,
}

/// Fixed-capacity ring buffer owning the messages it holds.
///
/// A full queue rejects new messages without touching its state. Dropping or
/// clearing the queue drops every queued message; [`MessageQueue::dequeue`]
/// hands ownership to the caller.
pub struct MessageQueue {
    slots: Box<[Option<Message>]>,
    first: usize,
    count: usize,
}

impl core::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MessageQueue")
            .field("capacity", &self.slots.len())
            .field("first", &self.first)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

impl MessageQueue {
    /// Smallest capacity a queue can have; smaller requests are clamped up.
    pub const MINIMAL_CAPACITY: usize = 1;

    /// Create an empty queue holding at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(Self::MINIMAL_CAPACITY);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots: slots.into_boxed_slice(),
            first: 0,
            count: 0,
        }
    }

    /// Maximum number of queued messages.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if no message is queued.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if the next [`MessageQueue::enqueue`] would be rejected.
    pub fn is_full(&self) -> bool {
        self.count >= self.slots.len()
    }

    /// Append `message` at the back.
    ///
    /// When the queue is full the message is handed back in [`QueueFull`] and the
    /// queue is left unchanged.
    pub fn enqueue(&mut self, message: Message) -> Result<(), QueueFull> {
        if self.is_full() {
            return Err(QueueFull {
                message,
                capacity: self.capacity(),
            });
        }
        let slot = (self.first + self.count) % self.slots.len();
        self.slots[slot] = Some(message);
        self.count += 1;
        Ok(())
    }

    /// The oldest message, without removing it.
    pub fn peek(&self) -> Option<&Message> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.first].as_ref()
    }

    /// Remove and return the oldest message.
    pub fn dequeue(&mut self) -> Option<Message> {
        if self.is_empty() {
            return None;
        }
        let message = self.slots[self.first].take();
        self.first = (self.first + 1) % self.slots.len();
        self.count -= 1;
        message
    }

    /// Drop every queued message.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.first = 0;
        self.count = 0;
    }

    /// Iterate queued messages from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        let cap = self.slots.len();
        (0..self.count).filter_map(move |i| self.slots[(self.first + i) % cap].as_ref())
    }
}
