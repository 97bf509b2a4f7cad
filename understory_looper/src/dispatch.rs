// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Posting, dispatch, and the message loop.
//!
//! ## Routing
//!
//! [`Registry::dispatch_message`] picks exactly one receiver, in priority order:
//!
//! 1. A [`kind::QUIT`] message addressed to the looper itself asks
//!    [`Looper::quit_requested`](crate::handler::Looper::quit_requested); on consent the
//!    looper quits and [`Looper::quit`](crate::handler::Looper::quit) runs, once per
//!    accepted message. The message is not routed further.
//! 2. A destination registered with this looper receives it.
//! 3. Otherwise the looper's default handler, if set.
//! 4. Otherwise the looper's own behavior.
//!
//! A destination registered with another looper, or a stale destination, falls through
//! to rule 3. Starting at the receiver, delivery follows `next` links while handlers
//! return [`Flow::Forward`]. Links may cross loopers and may form cycles; a walk never
//! takes more hops than there are slots in the registry.
//!
//! ## Reentrancy
//!
//! Callbacks get a [`Context`] and may post, register, remove, and even dispatch. A
//! handler whose callback is running is checked out of the registry, so a nested
//! delivery to it is skipped (and the walk continues at its `next`).

use alloc::rc::Rc;

use tracing::{debug, info, trace, warn};

use crate::error::Error;
use crate::handler::{Behavior, Context};
use crate::kind;
use crate::message::Message;
use crate::registry::Registry;
use crate::types::{Flow, HandlerId, LoopState, LooperId, Route};

/// Source of external events for [`Registry::run`].
///
/// Each turn of the loop calls [`EventSource::pump`] once before dispatching the next
/// queued message. A platform backend translates its native events into messages and
/// posts them to the looper.
pub trait EventSource {
    /// Move pending external events into the registry.
    ///
    /// Return `false` once the source is exhausted. The loop then keeps dispatching
    /// until the queue is drained.
    fn pump(&mut self, registry: &mut Registry, looper: LooperId) -> bool;
}

impl<F> EventSource for F
where
    F: FnMut(&mut Registry, LooperId) -> bool,
{
    fn pump(&mut self, registry: &mut Registry, looper: LooperId) -> bool {
        self(registry, looper)
    }
}

/// An [`EventSource`] without external events: [`Registry::run`] drains the queue
/// and returns.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoEvents;

impl EventSource for NoEvents {
    fn pump(&mut self, _registry: &mut Registry, _looper: LooperId) -> bool {
        false
    }
}

impl Registry {
    /// Post a copy of `message` to `looper`, addressed to `destination`.
    ///
    /// Returns `false`, without copying, when the queue is full or `looper` is stale.
    /// The caller keeps `message`; the queued copy is independent of it and carries
    /// `destination` (or none).
    pub fn post_message(
        &mut self,
        looper: LooperId,
        message: &Message,
        destination: Option<HandlerId>,
    ) -> bool {
        self.try_post_message(looper, message, destination).is_ok()
    }

    /// Post an empty message of kind `what`. See [`Registry::post_message`].
    pub fn post(&mut self, looper: LooperId, what: u32, destination: Option<HandlerId>) -> bool {
        self.try_post(looper, what, destination).is_ok()
    }

    /// Like [`Registry::post_message`], reporting why the message was not queued.
    pub fn try_post_message(
        &mut self,
        looper: LooperId,
        message: &Message,
        destination: Option<HandlerId>,
    ) -> Result<(), Error> {
        self.check_room(looper)?;
        let mut copy = message.clone();
        copy.set_handler(destination);
        self.enqueue(looper, copy)
    }

    /// Like [`Registry::post`], reporting why the message was not queued.
    pub fn try_post(
        &mut self,
        looper: LooperId,
        what: u32,
        destination: Option<HandlerId>,
    ) -> Result<(), Error> {
        self.check_room(looper)?;
        let mut message = Message::new(what);
        message.set_handler(destination);
        self.enqueue(looper, message)
    }

    /// Route `message` through `looper` and deliver it. See the [module docs](self).
    ///
    /// The message is borrowed; this does not touch the queue or the current message.
    pub fn dispatch_message(&mut self, looper: LooperId, message: &Message) -> Route {
        if !self.is_looper(looper) {
            debug!(?looper, what = message.what, "dispatch to stale looper dropped");
            return Route::Dropped;
        }
        let destination = message.handler();
        // Comparison, not assignment: any other kind addressed to the looper routes normally.
        if message.what == kind::QUIT && destination == Some(looper.handler()) {
            let accepted = self.ask_quit(looper);
            if accepted {
                // Every accepted request runs the hook; only the state change is one-shot.
                if !self.quit(looper) {
                    self.call_quit_hook(looper);
                }
            } else {
                debug!(?looper, "quit request declined");
            }
            return Route::Quit { accepted };
        }
        let route = if let Some(dest) = destination.filter(|d| self.owner(*d) == Some(looper)) {
            Route::Destination(dest)
        } else if let Some(default) = self.default_handler(looper) {
            Route::Default(default)
        } else {
            Route::Looper
        };
        let receiver = match route {
            Route::Destination(h) | Route::Default(h) => h,
            _ => looper.handler(),
        };
        trace!(?looper, what = message.what, ?route, "dispatch");
        self.deliver(looper, receiver, message);
        route
    }

    /// Dequeue and dispatch the oldest message of `looper`.
    ///
    /// While it is dispatched the message is the looper's current message; afterwards
    /// it is dropped and the previous current message (if this call is nested in
    /// another dispatch) is restored. Returns `false` if the queue was empty.
    pub fn dispatch_next(&mut self, looper: LooperId) -> bool {
        let Some(state) = self.looper_state_mut(looper) else {
            return false;
        };
        let Some(message) = state.queue.dequeue() else {
            return false;
        };
        let message = Rc::new(message);
        let previous = state.current.replace(Rc::clone(&message));
        self.dispatch_message(looper, &message);
        if let Some(state) = self.looper_state_mut(looper) {
            state.current = previous;
        }
        true
    }

    /// Terminate `looper`.
    ///
    /// Marks its state [`LoopState::Quit`] and calls
    /// [`Looper::quit`](crate::handler::Looper::quit). Returns `false`, without calling
    /// the hook, if the looper is stale or has already quit. Pending messages stay queued.
    pub fn quit(&mut self, looper: LooperId) -> bool {
        let Some(state) = self.looper_state_mut(looper) else {
            return false;
        };
        if state.state == LoopState::Quit {
            return false;
        }
        state.state = LoopState::Quit;
        info!(?looper, pending = state.queue.len(), "looper quit");
        self.call_quit_hook(looper);
        true
    }

    /// Run the message loop of `looper`.
    ///
    /// Each turn pumps `source` once and dispatches one queued message. The loop ends
    /// when the looper quits, returning [`LoopState::Quit`], or when the source is
    /// exhausted and the queue is empty, returning [`LoopState::Idle`]. A looper that
    /// has already quit returns immediately. Fails with [`Error::UnknownLooper`] if
    /// `looper` is stale or is removed while running.
    pub fn run<S>(&mut self, looper: LooperId, source: &mut S) -> Result<LoopState, Error>
    where
        S: EventSource + ?Sized,
    {
        let state = self
            .looper_state_mut(looper)
            .ok_or(Error::UnknownLooper(looper))?;
        if state.state == LoopState::Quit {
            return Ok(LoopState::Quit);
        }
        state.state = LoopState::Running;
        debug!(?looper, "loop running");
        loop {
            let pumped = source.pump(self, looper);
            let dispatched = self.dispatch_next(looper);
            match self.loop_state(looper) {
                None => return Err(Error::UnknownLooper(looper)),
                Some(LoopState::Quit) => return Ok(LoopState::Quit),
                Some(_) => {}
            }
            if !pumped && !dispatched {
                break;
            }
        }
        if let Some(state) = self.looper_state_mut(looper) {
            state.state = LoopState::Idle;
        }
        debug!(?looper, "loop idle");
        Ok(LoopState::Idle)
    }

    // --- internals ---

    fn check_room(&self, looper: LooperId) -> Result<(), Error> {
        let Some(queue) = self.queue(looper) else {
            debug!(?looper, "post to stale looper rejected");
            return Err(Error::UnknownLooper(looper));
        };
        if queue.is_full() {
            debug!(?looper, capacity = queue.capacity(), "post rejected: queue full");
            return Err(Error::QueueFull {
                looper,
                capacity: queue.capacity(),
            });
        }
        Ok(())
    }

    fn enqueue(&mut self, looper: LooperId, message: Message) -> Result<(), Error> {
        let state = self
            .looper_state_mut(looper)
            .ok_or(Error::UnknownLooper(looper))?;
        let what = message.what;
        let destination = message.handler();
        state
            .queue
            .enqueue(message)
            .map_err(|full| Error::QueueFull {
                looper,
                capacity: full.capacity,
            })?;
        trace!(?looper, what, ?destination, queued = state.queue.len(), "post");
        Ok(())
    }

    /// Walk the forwarding chain starting at `start`.
    fn deliver(&mut self, looper: LooperId, start: HandlerId, message: &Message) {
        let limit = self.slot_count();
        let mut hops = 0_usize;
        let mut current = Some(start);
        while let Some(id) = current {
            if hops == limit {
                warn!(?looper, what = message.what, ?start, hops, "forwarding cycle cut");
                return;
            }
            hops += 1;
            let Some(mut behavior) = self.checkout(id) else {
                if !self.is_alive(id) {
                    return;
                }
                warn!(handler = ?id, what = message.what, "reentrant delivery skipped");
                current = self.next(id);
                continue;
            };
            let flow = {
                let mut cx = Context::new(self, looper, id);
                behavior.as_handler_mut().message_received(message, &mut cx)
            };
            self.checkin(id, behavior);
            current = match flow {
                Flow::Handled => None,
                Flow::Forward => self.next(id),
            };
        }
    }

    fn ask_quit(&mut self, looper: LooperId) -> bool {
        let id = looper.handler();
        let Some(mut behavior) = self.checkout(id) else {
            warn!(?looper, "quit request while the looper is busy ignored");
            return false;
        };
        let accepted = match behavior.as_looper_mut() {
            Some(l) => {
                let mut cx = Context::new(self, looper, id);
                l.quit_requested(&mut cx)
            }
            None => true,
        };
        self.checkin(id, behavior);
        accepted
    }

    fn call_quit_hook(&mut self, looper: LooperId) {
        let id = looper.handler();
        let Some(mut behavior) = self.checkout(id) else {
            // Runs on checkin.
            if let Some(state) = self.looper_state_mut(looper) {
                state.quit_hook_pending = true;
            }
            return;
        };
        if let Some(state) = self.looper_state_mut(looper) {
            state.quit_hook_pending = false;
        }
        if let Some(l) = behavior.as_looper_mut() {
            let mut cx = Context::new(self, looper, id);
            l.quit(&mut cx);
        }
        self.checkin(id, behavior);
    }

    fn checkout(&mut self, id: HandlerId) -> Option<Behavior> {
        self.slot_mut(id)?.behavior.take()
    }

    /// Return a checked-out behavior. Drops it if its slot was removed meanwhile.
    fn checkin(&mut self, id: HandlerId, behavior: Behavior) {
        let Some(slot) = self.slot_mut(id) else {
            debug!(handler = ?id, "handler removed during its callback dropped");
            return;
        };
        slot.behavior = Some(behavior);
        let pending = slot.looper.as_ref().is_some_and(|s| s.quit_hook_pending);
        if pending {
            self.call_quit_hook(LooperId(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LooperConfig;
    use crate::handler::{Handler, Looper, PlainLooper, handler_fn};
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    type Log = Rc<RefCell<Vec<(&'static str, u32)>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
        flow: Flow,
    }

    impl Handler for Recorder {
        fn message_received(&mut self, message: &Message, _cx: &mut Context<'_>) -> Flow {
            self.log.borrow_mut().push((self.name, message.what));
            self.flow
        }
    }

    struct TestLooper {
        log: Log,
        accept_quit: bool,
        quits: Rc<Cell<u32>>,
    }

    impl Handler for TestLooper {
        fn message_received(&mut self, message: &Message, _cx: &mut Context<'_>) -> Flow {
            self.log.borrow_mut().push(("looper", message.what));
            Flow::Handled
        }
    }

    impl Looper for TestLooper {
        fn quit_requested(&mut self, _cx: &mut Context<'_>) -> bool {
            self.accept_quit
        }

        fn quit(&mut self, _cx: &mut Context<'_>) {
            self.quits.set(self.quits.get() + 1);
        }
    }

    struct Fixture {
        reg: Registry,
        looper: LooperId,
        log: Log,
        quits: Rc<Cell<u32>>,
    }

    impl Fixture {
        fn new(capacity: usize, accept_quit: bool) -> Self {
            let log = Log::default();
            let quits = Rc::new(Cell::new(0));
            let mut reg = Registry::new();
            let looper = reg.insert_looper(
                LooperConfig::default().with_capacity(capacity),
                TestLooper {
                    log: log.clone(),
                    accept_quit,
                    quits: quits.clone(),
                },
            );
            Self {
                reg,
                looper,
                log,
                quits,
            }
        }

        fn recorder(&mut self, name: &'static str, flow: Flow) -> HandlerId {
            self.reg.insert(Recorder {
                name,
                log: self.log.clone(),
                flow,
            })
        }

        fn registered(&mut self, name: &'static str, flow: Flow) -> HandlerId {
            let h = self.recorder(name, flow);
            assert!(self.reg.add_handler(self.looper, h));
            h
        }

        fn take_log(&self) -> Vec<(&'static str, u32)> {
            core::mem::take(&mut *self.log.borrow_mut())
        }
    }

    const PING: u32 = kind::USER + 1;

    #[test]
    fn destination_then_default_then_looper() {
        let mut fx = Fixture::new(8, true);
        let h = fx.registered("h", Flow::Handled);
        let d = fx.registered("d", Flow::Handled);

        let looper = fx.looper;
        assert_eq!(fx.reg.dispatch_message(looper, &Message::new(PING)), Route::Looper);

        fx.reg.set_default_handler(looper, Some(d));
        let to_h = Message::with_handler(PING, h);
        assert_eq!(fx.reg.dispatch_message(looper, &to_h), Route::Destination(h));
        assert_eq!(
            fx.reg.dispatch_message(looper, &Message::new(PING)),
            Route::Default(d)
        );
        assert_eq!(fx.take_log(), [("looper", PING), ("h", PING), ("d", PING)]);
    }

    #[test]
    fn foreign_or_stale_destination_falls_through() {
        let mut fx = Fixture::new(8, true);
        let other = fx.reg.insert_looper(LooperConfig::default(), PlainLooper);
        let foreign = fx.recorder("foreign", Flow::Handled);
        fx.reg.add_handler(other, foreign);
        let unowned = fx.recorder("unowned", Flow::Handled);
        let gone = fx.registered("gone", Flow::Handled);
        fx.reg.remove(gone);

        let looper = fx.looper;
        for dest in [foreign, unowned, gone] {
            let m = Message::with_handler(PING, dest);
            assert_eq!(fx.reg.dispatch_message(looper, &m), Route::Looper);
        }
        assert_eq!(fx.take_log(), [("looper", PING); 3]);
    }

    #[test]
    fn non_quit_message_addressed_to_looper_reaches_it() {
        // The quit rule must compare the kind; treating every message addressed to the
        // looper as a quit request would swallow this one.
        let mut fx = Fixture::new(8, true);
        let looper = fx.looper;
        let m = Message::with_handler(PING, looper.handler());
        assert_eq!(fx.reg.dispatch_message(looper, &m), Route::Looper);
        assert_eq!(fx.take_log(), [("looper", PING)]);
        assert_eq!(fx.reg.loop_state(looper), Some(LoopState::Idle));
        assert_eq!(fx.quits.get(), 0);
    }

    #[test]
    fn quit_gate_honors_veto() {
        let mut fx = Fixture::new(8, false);
        let looper = fx.looper;
        let quit = Message::with_handler(kind::QUIT, looper.handler());
        assert_eq!(
            fx.reg.dispatch_message(looper, &quit),
            Route::Quit { accepted: false }
        );
        assert_eq!(fx.reg.loop_state(looper), Some(LoopState::Idle));
        assert_eq!(fx.quits.get(), 0);
        assert!(fx.take_log().is_empty(), "quit requests are not routed further");
    }

    #[test]
    fn accepted_quit_runs_hook_per_message() {
        let mut fx = Fixture::new(8, true);
        let looper = fx.looper;
        let quit = Message::with_handler(kind::QUIT, looper.handler());
        assert_eq!(
            fx.reg.dispatch_message(looper, &quit),
            Route::Quit { accepted: true }
        );
        assert_eq!(fx.reg.loop_state(looper), Some(LoopState::Quit));
        assert_eq!(fx.quits.get(), 1);

        // A second accepted request runs the hook again; the state stays Quit.
        assert_eq!(
            fx.reg.dispatch_message(looper, &quit),
            Route::Quit { accepted: true }
        );
        assert_eq!(fx.quits.get(), 2);
        assert_eq!(fx.reg.loop_state(looper), Some(LoopState::Quit));

        // A direct quit on a finished looper does nothing.
        assert!(!fx.reg.quit(looper));
        assert_eq!(fx.quits.get(), 2);
    }

    #[test]
    fn removing_looper_during_dispatch_drops_its_messages() {
        let mut reg = Registry::new();
        let looper = reg.insert_looper(LooperConfig::default(), PlainLooper);
        let calls = Rc::new(Cell::new(0_u32));
        let counter = calls.clone();
        let h = reg.insert(handler_fn(move |_m, cx| {
            counter.set(counter.get() + 1);
            assert!(cx.current_message().is_some());
            let looper = cx.looper();
            assert!(cx.registry().remove(looper));
            assert!(cx.current_message().is_none());
            Flow::Handled
        }));
        let bystander = reg.insert(Recorder {
            name: "bystander",
            log: Log::default(),
            flow: Flow::Handled,
        });
        reg.add_handler(looper, h);
        reg.add_handler(looper, bystander);
        for what in [PING, PING + 1, PING + 2] {
            assert!(reg.post(looper, what, Some(h)));
        }

        assert!(reg.dispatch_next(looper));
        assert_eq!(calls.get(), 1);
        assert!(!reg.is_looper(looper));
        assert!(reg.current_message(looper).is_none());
        assert!(reg.queue(looper).is_none());
        assert!(!reg.dispatch_next(looper), "queued messages went with the looper");
        assert_eq!(calls.get(), 1);

        for handler in [h, bystander] {
            assert!(reg.is_alive(handler));
            assert_eq!(reg.owner(handler), None);
        }
    }

    #[test]
    fn unaddressed_quit_is_an_ordinary_message() {
        let mut fx = Fixture::new(8, true);
        let looper = fx.looper;
        assert_eq!(
            fx.reg.dispatch_message(looper, &Message::new(kind::QUIT)),
            Route::Looper
        );
        assert_eq!(fx.reg.loop_state(looper), Some(LoopState::Idle));
        assert_eq!(fx.take_log(), [("looper", kind::QUIT)]);
    }

    #[test]
    fn capacity_one_boundary() {
        let mut fx = Fixture::new(1, true);
        let looper = fx.looper;
        assert!(fx.reg.post(looper, PING, None));
        assert!(!fx.reg.post(looper, PING + 1, None));
        assert_eq!(
            fx.reg.try_post(looper, PING + 2, None),
            Err(Error::QueueFull {
                looper,
                capacity: 1
            })
        );
        let queue = fx.reg.queue(looper).unwrap();
        assert_eq!(queue.len(), 1, "rejected posts must not change the count");
        assert_eq!(queue.peek().map(|m| m.what), Some(PING));

        assert!(fx.reg.dispatch_next(looper));
        assert!(fx.reg.post(looper, PING + 3, None));
    }

    #[test]
    fn posted_copy_is_independent() {
        let mut fx = Fixture::new(4, true);
        let h = fx.registered("h", Flow::Handled);
        let looper = fx.looper;

        let mut original = Message::new(PING);
        original.add_int("n", 1);
        assert!(fx.reg.post_message(looper, &original, Some(h)));
        original.replace_value("n", 2_i32);
        original.add_string("extra", "x");

        assert_eq!(original.handler(), None, "the caller's message is not stamped");
        let queued = fx.reg.queue(looper).unwrap().peek().unwrap();
        assert_eq!(queued.handler(), Some(h));
        assert_eq!(queued.find_int("n"), Some(1));
        assert_eq!(queued.count(), 1);
    }

    #[test]
    fn post_to_stale_looper_fails() {
        let mut fx = Fixture::new(4, true);
        let looper = fx.looper;
        fx.reg.remove(looper);
        assert!(!fx.reg.post(looper, PING, None));
        assert_eq!(
            fx.reg.try_post_message(looper, &Message::new(PING), None),
            Err(Error::UnknownLooper(looper))
        );
        assert_eq!(fx.reg.dispatch_message(looper, &Message::new(PING)), Route::Dropped);
        assert!(!fx.reg.dispatch_next(looper));
    }

    #[test]
    fn chain_forwards_until_handled() {
        let mut fx = Fixture::new(4, true);
        let a = fx.registered("a", Flow::Forward);
        let other = fx.reg.insert_looper(LooperConfig::default(), PlainLooper);
        let b = fx.recorder("b", Flow::Handled);
        fx.reg.add_handler(other, b);
        let c = fx.recorder("c", Flow::Handled);
        fx.reg.set_next(a, Some(b));
        fx.reg.set_next(b, Some(c));

        let looper = fx.looper;
        fx.reg.dispatch_message(looper, &Message::with_handler(PING, a));
        assert_eq!(fx.take_log(), [("a", PING), ("b", PING)]);
    }

    #[test]
    fn forwarding_cycle_terminates() {
        let mut fx = Fixture::new(4, true);
        let a = fx.registered("a", Flow::Forward);
        let b = fx.recorder("b", Flow::Forward);
        fx.reg.set_next(a, Some(b));
        fx.reg.set_next(b, Some(a));

        let looper = fx.looper;
        fx.reg.dispatch_message(looper, &Message::with_handler(PING, a));
        let log = fx.take_log();
        assert!(!log.is_empty());
        assert!(log.len() <= fx.reg.slot_count());
        assert_eq!(log[0], ("a", PING));
    }

    #[test]
    fn dispatch_next_is_fifo_and_exposes_current_message() {
        let mut reg = Registry::new();
        let looper = reg.insert_looper(LooperConfig::default(), PlainLooper);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let h = reg.insert(handler_fn(move |m, cx| {
            let current = cx.current_message().map(|c| c.what);
            sink.borrow_mut().push((m.what, current));
            Flow::Handled
        }));
        reg.add_handler(looper, h);
        reg.set_default_handler(looper, Some(h));

        for what in [1, 2, 3] {
            reg.post(looper, what, None);
        }
        while reg.dispatch_next(looper) {}
        assert_eq!(*seen.borrow(), [(1, Some(1)), (2, Some(2)), (3, Some(3))]);
        assert!(reg.current_message(looper).is_none());

        // Direct dispatch has no current message.
        reg.dispatch_message(looper, &Message::new(4));
        assert_eq!(seen.borrow().last(), Some(&(4, None)));
    }

    #[test]
    fn handlers_can_post_from_callbacks() {
        let mut reg = Registry::new();
        let looper = reg.insert_looper(LooperConfig::default(), PlainLooper);
        let count = Rc::new(Cell::new(0_u32));
        let counter = count.clone();
        let h = reg.insert(handler_fn(move |m, cx| {
            counter.set(counter.get() + 1);
            if m.what < 3 {
                let me = cx.handler();
                assert!(cx.post(m.what + 1, Some(me)));
            }
            Flow::Handled
        }));
        reg.add_handler(looper, h);
        reg.post(looper, 0, Some(h));
        let mut turns = 0;
        while reg.dispatch_next(looper) {
            turns += 1;
        }
        assert_eq!(turns, 4);
        assert_eq!(count.get(), 4);
    }

    #[test]
    fn reentrant_delivery_to_busy_handler_is_skipped() {
        let mut reg = Registry::new();
        let looper = reg.insert_looper(LooperConfig::default(), PlainLooper);
        let calls = Rc::new(Cell::new(0_u32));
        let c = calls.clone();
        let h = reg.insert(handler_fn(move |m, cx| {
            c.set(c.get() + 1);
            let looper = cx.looper();
            let _ = cx.registry().dispatch_message(looper, m);
            Flow::Handled
        }));
        reg.add_handler(looper, h);
        reg.dispatch_message(looper, &Message::with_handler(PING, h));
        assert_eq!(calls.get(), 1);
        assert!(reg.is_alive(h));
    }

    #[test]
    fn handler_removing_itself_is_dropped_after_callback() {
        let mut reg = Registry::new();
        let looper = reg.insert_looper(LooperConfig::default(), PlainLooper);
        let h = reg.insert(handler_fn(|_m, cx| {
            let me = cx.handler();
            assert!(cx.registry().remove(me));
            Flow::Handled
        }));
        reg.add_handler(looper, h);
        reg.dispatch_message(looper, &Message::with_handler(PING, h));
        assert!(!reg.is_alive(h));
        assert_eq!(reg.handlers(looper).count(), 0);
    }

    #[test]
    fn removing_main_handler_quits_without_asking() {
        let mut fx = Fixture::new(4, false);
        let main = fx.registered("main", Flow::Handled);
        let looper = fx.looper;
        assert!(fx.reg.set_main_handler(looper, Some(main)));
        assert!(fx.reg.remove(main));
        assert_eq!(fx.reg.main_handler(looper), None);
        assert_eq!(fx.reg.loop_state(looper), Some(LoopState::Quit));
        assert_eq!(fx.quits.get(), 1);
    }

    #[test]
    fn quit_from_own_callback_runs_hook_after_it_returns() {
        struct SelfQuitting(Rc<Cell<u32>>);
        impl Handler for SelfQuitting {
            fn message_received(&mut self, _m: &Message, cx: &mut Context<'_>) -> Flow {
                let looper = cx.looper();
                assert!(cx.registry().quit(looper));
                assert_eq!(self.0.get(), 0, "hook waits for the callback");
                Flow::Handled
            }
        }
        impl Looper for SelfQuitting {
            fn quit(&mut self, _cx: &mut Context<'_>) {
                self.0.set(self.0.get() + 1);
            }
        }

        let quits = Rc::new(Cell::new(0));
        let mut reg = Registry::new();
        let looper = reg.insert_looper(LooperConfig::default(), SelfQuitting(quits.clone()));
        reg.dispatch_message(looper, &Message::new(PING));
        assert_eq!(quits.get(), 1);
        assert_eq!(reg.loop_state(looper), Some(LoopState::Quit));
    }

    #[test]
    fn run_drains_then_idles() {
        let mut fx = Fixture::new(8, true);
        let looper = fx.looper;
        let mut batches = [PING, PING + 1, PING + 2].into_iter();
        let mut source = |reg: &mut Registry, l: LooperId| match batches.next() {
            Some(what) => reg.post(l, what, None),
            None => false,
        };
        assert_eq!(fx.reg.run(looper, &mut source), Ok(LoopState::Idle));
        assert_eq!(
            fx.take_log(),
            [("looper", PING), ("looper", PING + 1), ("looper", PING + 2)]
        );
        assert_eq!(fx.reg.loop_state(looper), Some(LoopState::Idle));
    }

    #[test]
    fn run_stops_on_quit() {
        let mut fx = Fixture::new(8, true);
        let looper = fx.looper;
        fx.reg.post(looper, PING, None);
        fx.reg.post(looper, kind::QUIT, Some(looper.handler()));
        fx.reg.post(looper, PING + 1, None);
        assert_eq!(fx.reg.run(looper, &mut NoEvents), Ok(LoopState::Quit));
        assert_eq!(fx.take_log(), [("looper", PING)]);
        assert_eq!(fx.quits.get(), 1);
        assert_eq!(fx.reg.queue(looper).map(|q| q.len()), Some(1));

        // Already quit.
        assert_eq!(fx.reg.run(looper, &mut NoEvents), Ok(LoopState::Quit));
    }

    #[test]
    fn run_on_stale_looper_fails() {
        let mut fx = Fixture::new(8, true);
        let looper = fx.looper;
        fx.reg.remove(looper);
        assert_eq!(
            fx.reg.run(looper, &mut NoEvents),
            Err(Error::UnknownLooper(looper))
        );
    }
}
