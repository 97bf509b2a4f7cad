// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by the fallible registry operations.

use thiserror::Error;

use crate::types::LooperId;

/// Failure of a `try_*` operation on the [`Registry`](crate::registry::Registry).
///
/// The plain variants of these operations report the same conditions as `false`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// The looper's queue has no free slot.
    #[error("message queue of {looper:?} is full (capacity {capacity})")]
    QueueFull {
        /// Looper whose queue rejected the message.
        looper: LooperId,
        /// Capacity of that queue.
        capacity: usize,
    },

    /// The id does not refer to a live looper.
    #[error("{0:?} does not refer to a live looper")]
    UnknownLooper(LooperId),

    /// The registry already has an application looper.
    #[error("an application looper already exists: {0:?}")]
    ApplicationExists(LooperId),
}
