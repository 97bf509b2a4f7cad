// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types shared across the looper: handles, flow control, routes, and loop state.

/// Identifier for a handler in a [`Registry`](crate::registry::Registry).
///
/// This is a small, copyable handle that stays stable while the handler is alive and
/// becomes stale when it is removed. It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any existing `HandlerId` for that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `HandlerId`.
///
/// Stale ids never alias a different live handler because the generation must match.
/// Forwarding links, destinations, and registrations that still hold a stale id simply
/// stop resolving. Use [`Registry::is_alive`](crate::registry::Registry::is_alive) to check liveness.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct HandlerId(pub(crate) u32, pub(crate) u32);

impl HandlerId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Identifier for a looper.
///
/// A looper is also a handler: [`LooperId::handler`] returns the id under which the
/// looper itself can be addressed, chained, or registered.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct LooperId(pub(crate) HandlerId);

impl LooperId {
    /// The looper's own handler identity.
    #[inline]
    pub const fn handler(self) -> HandlerId {
        self.0
    }
}

impl From<LooperId> for HandlerId {
    fn from(id: LooperId) -> Self {
        id.0
    }
}

/// Result of [`Handler::message_received`](crate::handler::Handler::message_received).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Flow {
    /// The message was consumed; stop here.
    Handled,
    /// Pass the message on to the next handler in the chain, if any.
    Forward,
}

/// Which rule of the dispatch algorithm selected the receiver.
///
/// Returned by [`Registry::dispatch_message`](crate::registry::Registry::dispatch_message).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Route {
    /// A quit request addressed to the looper itself; `accepted` reports whether
    /// the looper agreed to terminate.
    Quit {
        /// Answer of [`Looper::quit_requested`](crate::handler::Looper::quit_requested).
        accepted: bool,
    },
    /// Delivered to the message's destination, which is registered with this looper.
    Destination(HandlerId),
    /// Delivered to the looper's default handler.
    Default(HandlerId),
    /// Delivered to the looper's own handler behavior.
    Looper,
    /// The looper id was stale; nothing was delivered.
    Dropped,
}

/// Lifecycle of a message loop.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum LoopState {
    /// Constructed, not yet running.
    #[default]
    Idle,
    /// Inside [`Registry::run`](crate::registry::Registry::run).
    Running,
    /// Terminated by [`Registry::quit`](crate::registry::Registry::quit).
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looper_id_exposes_its_handler() {
        let h = HandlerId::new(4, 2);
        let l = LooperId(h);
        assert_eq!(l.handler(), h);
        assert_eq!(HandlerId::from(l), h);
        assert_eq!(h.idx(), 4);
    }

    #[test]
    fn loop_state_starts_idle() {
        assert_eq!(LoopState::default(), LoopState::Idle);
    }
}
