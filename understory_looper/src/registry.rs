// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry: storage for handlers and loopers, forwarding links, and registration.
//!
//! ## Overview
//!
//! The [`Registry`] owns every handler and looper behavior and hands out generational
//! ids ([`HandlerId`], [`LooperId`]). All relationships between them are expressed as
//! ids, never as references:
//!
//! - `next`: the forwarding link of a handler, set with [`Registry::set_next`]. Any
//!   handler may link to any other, whether or not they share a looper.
//! - `owner`: the looper a handler is registered with. Only [`Registry::add_handler`],
//!   [`Registry::remove_handler`] and the removal operations change it, which keeps the
//!   owner link and the looper's registration list in agreement.
//!
//! Removing a handler detaches it from its owner first. Removing a looper detaches
//! every handler registered with it (the handlers stay alive) and drops its queue.
//! Ids held elsewhere become stale and stop resolving.
//!
//! Dispatch lives in [`dispatch`](crate::dispatch).

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;

use tracing::debug;

use crate::config::LooperConfig;
use crate::error::Error;
use crate::handler::{Behavior, Handler, Looper};
use crate::message::Message;
use crate::queue::MessageQueue;
use crate::types::{HandlerId, LoopState, LooperId};

/// Owner of all handlers and loopers of one thread.
pub struct Registry {
    slots: Vec<Option<Slot>>, // None for freed slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    application: Option<LooperId>,
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.slots.len();
        let alive = self.slots.iter().filter(|s| s.is_some()).count();
        let loopers = self.slots.iter().flatten().filter(|s| s.looper.is_some()).count();
        f.debug_struct("Registry")
            .field("slots_total", &total)
            .field("slots_alive", &alive)
            .field("loopers", &loopers)
            .field("free_list", &self.free_list.len())
            .field("application", &self.application)
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct Slot {
    generation: u32,
    next: Option<HandlerId>,
    owner: Option<LooperId>,
    // None while the behavior is checked out for a callback.
    pub(crate) behavior: Option<Behavior>,
    pub(crate) looper: Option<Box<LooperState>>,
}

impl Slot {
    fn new(generation: u32, behavior: Behavior) -> Self {
        Self {
            generation,
            next: None,
            owner: None,
            behavior: Some(behavior),
            looper: None,
        }
    }
}

/// Per-looper state.
pub(crate) struct LooperState {
    pub(crate) queue: MessageQueue,
    // Registration order is preserved for enumeration.
    pub(crate) handlers: Vec<HandlerId>,
    pub(crate) default_handler: Option<HandlerId>,
    pub(crate) main_handler: Option<HandlerId>,
    pub(crate) current: Option<Rc<Message>>,
    pub(crate) state: LoopState,
    // Set when `quit` ran while the looper's behavior was checked out.
    pub(crate) quit_hook_pending: bool,
}

impl LooperState {
    fn new(config: LooperConfig) -> Self {
        Self {
            queue: MessageQueue::new(config.capacity),
            handlers: Vec::new(),
            default_handler: None,
            main_handler: None,
            current: None,
            state: LoopState::Idle,
            quit_hook_pending: false,
        }
    }
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            application: None,
        }
    }

    /// Insert a handler. It starts without a `next` link and without an owner.
    pub fn insert<H: Handler>(&mut self, handler: H) -> HandlerId {
        self.alloc(Behavior::Handler(Box::new(handler)))
    }

    /// Insert a looper with an empty queue of `config.capacity` messages.
    pub fn insert_looper<L: Looper>(&mut self, config: LooperConfig, looper: L) -> LooperId {
        let id = self.alloc(Behavior::Looper(Box::new(looper)));
        if let Some(slot) = self.slot_mut(id) {
            slot.looper = Some(Box::new(LooperState::new(config)));
        }
        debug!(looper = ?id, capacity = config.capacity, "looper created");
        LooperId(id)
    }

    /// Insert the application looper.
    ///
    /// A registry has at most one application. Fails with
    /// [`Error::ApplicationExists`] while another one is alive.
    pub fn create_application<L: Looper>(
        &mut self,
        config: LooperConfig,
        looper: L,
    ) -> Result<LooperId, Error> {
        if let Some(existing) = self.application() {
            return Err(Error::ApplicationExists(existing));
        }
        let id = self.insert_looper(config, looper);
        self.application = Some(id);
        Ok(id)
    }

    /// The application looper, if one is alive.
    pub fn application(&self) -> Option<LooperId> {
        self.application.filter(|l| self.is_looper(*l))
    }

    /// Remove a handler or looper.
    ///
    /// A registered handler is first removed from its owner (which may make the owner
    /// quit, see [`Registry::set_main_handler`]). A looper additionally detaches every
    /// handler registered with it and drops its queue and current message.
    /// Returns `false` if `id` was stale.
    ///
    /// When called for a handler from inside its own callback, the behavior is dropped
    /// once the callback returns.
    pub fn remove(&mut self, id: impl Into<HandlerId>) -> bool {
        let id = id.into();
        let Some(owner) = self.slot(id).map(|s| s.owner) else {
            return false;
        };
        if let Some(owner) = owner {
            self.remove_handler(owner, id);
            // The owner's quit hook may have removed it already.
            if !self.is_alive(id) {
                return true;
            }
        }
        if let Some(state) = self.slot_mut(id).and_then(|s| s.looper.take()) {
            for h in &state.handlers {
                if let Some(slot) = self.slot_mut(*h) {
                    slot.owner = None;
                }
            }
            if self.application == Some(LooperId(id)) {
                self.application = None;
            }
            debug!(
                looper = ?id,
                detached = state.handlers.len(),
                dropped = state.queue.len(),
                "looper removed"
            );
        }
        self.slots[id.idx()] = None;
        self.free_list.push(id.idx());
        true
    }

    /// Remove a looper. Same as [`Registry::remove`] with the looper's handler id.
    pub fn remove_looper(&mut self, looper: LooperId) -> bool {
        self.is_looper(looper) && self.remove(looper)
    }

    /// Returns true if `id` refers to a live handler or looper.
    pub fn is_alive(&self, id: impl Into<HandlerId>) -> bool {
        self.slot(id.into()).is_some()
    }

    /// Returns true if `looper` refers to a live looper.
    pub fn is_looper(&self, looper: LooperId) -> bool {
        self.looper_state(looper).is_some()
    }

    /// The looper behind a handler id, if that handler is a live looper.
    pub fn as_looper(&self, id: HandlerId) -> Option<LooperId> {
        let looper = LooperId(id);
        self.is_looper(looper).then_some(looper)
    }

    /// Set or clear the forwarding link of `handler`. Returns `false` if `handler` is stale.
    ///
    /// `next` is not validated; a stale link ends the chain when it is followed.
    pub fn set_next(&mut self, handler: impl Into<HandlerId>, next: Option<HandlerId>) -> bool {
        match self.slot_mut(handler.into()) {
            Some(slot) => {
                slot.next = next;
                true
            }
            None => false,
        }
    }

    /// The forwarding link of `handler`, if it is set and still alive.
    pub fn next(&self, handler: impl Into<HandlerId>) -> Option<HandlerId> {
        self.slot(handler.into())?
            .next
            .filter(|n| self.is_alive(*n))
    }

    /// The looper `handler` is registered with.
    pub fn owner(&self, handler: impl Into<HandlerId>) -> Option<LooperId> {
        self.slot(handler.into())?.owner
    }

    /// Register `handler` with `looper`.
    ///
    /// Returns `true` if `handler` is registered with `looper` afterwards. A handler
    /// registered with a different looper is rejected; remove it there first. A looper
    /// cannot be registered with itself.
    pub fn add_handler(&mut self, looper: LooperId, handler: impl Into<HandlerId>) -> bool {
        let handler = handler.into();
        if !self.is_looper(looper) || !self.is_alive(handler) || handler == looper.handler() {
            debug!(?looper, ?handler, "add_handler ignored");
            return false;
        }
        match self.owner(handler) {
            Some(owner) if owner == looper => return true,
            Some(owner) => {
                debug!(?looper, ?handler, ?owner, "handler is registered with another looper");
                return false;
            }
            None => {}
        }
        if let Some(state) = self.looper_state_mut(looper) {
            state.handlers.push(handler);
        }
        if let Some(slot) = self.slot_mut(handler) {
            slot.owner = Some(looper);
        }
        debug!(?looper, ?handler, "handler registered");
        true
    }

    /// Unregister `handler` from `looper`.
    ///
    /// Clears the handler's owner and any default or main handler reference to it.
    /// Removing the main handler makes the looper quit. Returns `false` if the handler
    /// was not registered with `looper`.
    pub fn remove_handler(&mut self, looper: LooperId, handler: impl Into<HandlerId>) -> bool {
        let handler = handler.into();
        let Some(state) = self.looper_state_mut(looper) else {
            return false;
        };
        let Some(pos) = state.handlers.iter().position(|h| *h == handler) else {
            return false;
        };
        state.handlers.remove(pos);
        if state.default_handler == Some(handler) {
            state.default_handler = None;
        }
        let was_main = state.main_handler == Some(handler);
        if was_main {
            state.main_handler = None;
        }
        if let Some(slot) = self.slot_mut(handler) {
            slot.owner = None;
        }
        debug!(?looper, ?handler, "handler unregistered");
        if was_main {
            self.quit(looper);
        }
        true
    }

    /// Handlers registered with `looper`, in registration order.
    pub fn handlers(&self, looper: LooperId) -> impl Iterator<Item = HandlerId> + '_ {
        self.looper_state(looper)
            .into_iter()
            .flat_map(|s| s.handlers.iter().copied())
    }

    /// Set or clear the default handler of `looper`.
    ///
    /// Only a handler registered with `looper` is accepted; anything else is ignored
    /// and `false` is returned.
    pub fn set_default_handler(&mut self, looper: LooperId, handler: Option<HandlerId>) -> bool {
        if handler.is_some_and(|h| self.owner(h) != Some(looper)) {
            debug!(?looper, ?handler, "default handler must be registered with the looper");
            return false;
        }
        match self.looper_state_mut(looper) {
            Some(state) => {
                state.default_handler = handler;
                true
            }
            None => false,
        }
    }

    /// The default handler of `looper`.
    pub fn default_handler(&self, looper: LooperId) -> Option<HandlerId> {
        self.looper_state(looper)?.default_handler
    }

    /// Set or clear the main handler of `looper`.
    ///
    /// When the main handler is unregistered or removed, the looper quits without
    /// consulting [`Looper::quit_requested`]. Only a handler registered with `looper`
    /// is accepted.
    pub fn set_main_handler(&mut self, looper: LooperId, handler: Option<HandlerId>) -> bool {
        if handler.is_some_and(|h| self.owner(h) != Some(looper)) {
            debug!(?looper, ?handler, "main handler must be registered with the looper");
            return false;
        }
        match self.looper_state_mut(looper) {
            Some(state) => {
                state.main_handler = handler;
                true
            }
            None => false,
        }
    }

    /// The main handler of `looper`.
    pub fn main_handler(&self, looper: LooperId) -> Option<HandlerId> {
        self.looper_state(looper)?.main_handler
    }

    /// The pending message queue of `looper`.
    pub fn queue(&self, looper: LooperId) -> Option<&MessageQueue> {
        Some(&self.looper_state(looper)?.queue)
    }

    /// The message being dispatched by [`Registry::dispatch_next`], if any.
    pub fn current_message(&self, looper: LooperId) -> Option<&Message> {
        self.looper_state(looper)?.current.as_deref()
    }

    /// Loop state of `looper`.
    pub fn loop_state(&self, looper: LooperId) -> Option<LoopState> {
        Some(self.looper_state(looper)?.state)
    }

    /// Borrow the behavior of a handler or looper as its concrete type.
    ///
    /// Returns `None` for stale ids, for a different type, and for a handler whose
    /// callback is currently running.
    pub fn get<T: Handler>(&self, id: impl Into<HandlerId>) -> Option<&T> {
        self.slot(id.into())?
            .behavior
            .as_ref()?
            .as_any()
            .downcast_ref()
    }

    /// Mutably borrow the behavior of a handler or looper as its concrete type.
    pub fn get_mut<T: Handler>(&mut self, id: impl Into<HandlerId>) -> Option<&mut T> {
        self.slot_mut(id.into())?
            .behavior
            .as_mut()?
            .as_any_mut()
            .downcast_mut()
    }

    // --- internals ---

    fn alloc(&mut self, behavior: Behavior) -> HandlerId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(Slot::new(generation, behavior));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "HandlerId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.slots.push(Some(Slot::new(generation, behavior)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "HandlerId uses 32-bit indices by design."
            )]
            ((self.slots.len() - 1) as u32, generation)
        };
        HandlerId::new(idx, generation)
    }

    pub(crate) fn slot(&self, id: HandlerId) -> Option<&Slot> {
        let slot = self.slots.get(id.idx())?.as_ref()?;
        (slot.generation == id.1).then_some(slot)
    }

    pub(crate) fn slot_mut(&mut self, id: HandlerId) -> Option<&mut Slot> {
        let slot = self.slots.get_mut(id.idx())?.as_mut()?;
        if slot.generation != id.1 {
            return None;
        }
        Some(slot)
    }

    pub(crate) fn looper_state(&self, looper: LooperId) -> Option<&LooperState> {
        self.slot(looper.0)?.looper.as_deref()
    }

    pub(crate) fn looper_state_mut(&mut self, looper: LooperId) -> Option<&mut LooperState> {
        self.slot_mut(looper.0)?.looper.as_deref_mut()
    }

    /// Number of slots ever allocated; bounds the length of any forwarding walk.
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
