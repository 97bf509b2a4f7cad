// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Looper construction options.

/// Options used by [`Registry::insert_looper`](crate::registry::Registry::insert_looper)
/// and [`Registry::create_application`](crate::registry::Registry::create_application).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LooperConfig {
    /// Maximum number of pending messages. Values below
    /// [`MessageQueue::MINIMAL_CAPACITY`](crate::queue::MessageQueue::MINIMAL_CAPACITY) are clamped up.
    pub capacity: usize,
}

impl LooperConfig {
    /// Queue capacity used by [`LooperConfig::default`].
    pub const DEFAULT_CAPACITY: usize = 50;

    /// Returns a copy with the given queue capacity.
    pub const fn with_capacity(self, capacity: usize) -> Self {
        Self { capacity }
    }
}

impl Default for LooperConfig {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
        }
    }
}
