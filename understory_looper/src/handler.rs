// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handler and looper behavior, and the context passed to callbacks.
//!
//! ## Overview
//!
//! A [`Handler`] reacts to messages. Returning [`Flow::Forward`] from
//! [`Handler::message_received`] passes the message on to the handler's `next`
//! link, which forms a chain of responsibility. The default implementation forwards
//! everything, so a handler only needs to match the kinds it understands:
//!
//! ```
//! use understory_looper::handler::{Context, Handler};
//! use understory_looper::kind;
//! use understory_looper::message::Message;
//! use understory_looper::types::Flow;
//!
//! #[derive(Default)]
//! struct Counter {
//!     clicks: u32,
//! }
//!
//! impl Handler for Counter {
//!     fn message_received(&mut self, message: &Message, _cx: &mut Context<'_>) -> Flow {
//!         match message.what {
//!             kind::MOUSE_DOWN => {
//!                 self.clicks += 1;
//!                 Flow::Handled
//!             }
//!             _ => Flow::Forward,
//!         }
//!     }
//! }
//! ```
//!
//! A [`Looper`] is a handler that additionally owns a queue and a set of registered
//! handlers; its trait only adds the quit hooks. The queue and registrations live in
//! the [`Registry`].

use core::any::Any;

use alloc::boxed::Box;

use crate::message::Message;
use crate::registry::Registry;
use crate::types::{Flow, HandlerId, LooperId};

/// Behavior of a message receiver.
pub trait Handler: Any {
    /// Handle `message`.
    ///
    /// Return [`Flow::Handled`] to consume the message or [`Flow::Forward`] to pass it
    /// to the next handler in the chain. The default forwards.
    fn message_received(&mut self, message: &Message, cx: &mut Context<'_>) -> Flow {
        let _ = (message, cx);
        Flow::Forward
    }
}

/// Behavior of a looper.
///
/// The looper receives messages that are addressed to no registered handler when no
/// default handler is set, through [`Handler::message_received`].
pub trait Looper: Handler {
    /// Asked when a [`kind::QUIT`](crate::kind::QUIT) message addressed to this looper
    /// is dispatched. Return `false` to veto termination. The default accepts.
    fn quit_requested(&mut self, cx: &mut Context<'_>) -> bool {
        let _ = cx;
        true
    }

    /// Called once when the looper terminates. The registry has already marked the
    /// loop as [`LoopState::Quit`](crate::types::LoopState::Quit).
    fn quit(&mut self, cx: &mut Context<'_>) {
        let _ = cx;
    }
}

/// A looper with default behavior: forwards everything and accepts every quit request.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainLooper;

impl Handler for PlainLooper {}
impl Looper for PlainLooper {}

/// Handler backed by a closure. See [`handler_fn`].
pub struct FnHandler<F>(F);

impl<F> core::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

impl<F> Handler for FnHandler<F>
where
    F: FnMut(&Message, &mut Context<'_>) -> Flow + 'static,
{
    fn message_received(&mut self, message: &Message, cx: &mut Context<'_>) -> Flow {
        (self.0)(message, cx)
    }
}

/// Wrap a closure as a [`Handler`].
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: FnMut(&Message, &mut Context<'_>) -> Flow + 'static,
{
    FnHandler(f)
}

/// Boxed behavior stored in a registry slot.
pub(crate) enum Behavior {
    Handler(Box<dyn Handler>),
    Looper(Box<dyn Looper>),
}

impl Behavior {
    pub(crate) fn as_handler_mut(&mut self) -> &mut dyn Handler {
        match self {
            Self::Handler(h) => &mut **h,
            Self::Looper(l) => &mut **l,
        }
    }

    pub(crate) fn as_any(&self) -> &dyn Any {
        match self {
            Self::Handler(h) => &**h,
            Self::Looper(l) => &**l,
        }
    }

    pub(crate) fn as_any_mut(&mut self) -> &mut dyn Any {
        match self {
            Self::Handler(h) => &mut **h,
            Self::Looper(l) => &mut **l,
        }
    }

    pub(crate) fn as_looper_mut(&mut self) -> Option<&mut dyn Looper> {
        match self {
            Self::Handler(_) => None,
            Self::Looper(l) => Some(&mut **l),
        }
    }
}

/// Access to the registry from inside a callback.
///
/// While a handler's callback runs, that handler is checked out of the registry:
/// messages delivered to it reentrantly are skipped, and [`Registry::get`] does not
/// see it. Everything else, including posting, registering and removing handlers,
/// and dispatching other messages, is available through [`Context::registry`].
pub struct Context<'a> {
    registry: &'a mut Registry,
    looper: LooperId,
    handler: HandlerId,
}

impl core::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context")
            .field("looper", &self.looper)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

impl<'a> Context<'a> {
    pub(crate) fn new(registry: &'a mut Registry, looper: LooperId, handler: HandlerId) -> Self {
        Self {
            registry,
            looper,
            handler,
        }
    }

    /// The looper dispatching the message.
    pub fn looper(&self) -> LooperId {
        self.looper
    }

    /// The handler being called.
    pub fn handler(&self) -> HandlerId {
        self.handler
    }

    /// The message the looper is currently processing, if the call came from
    /// [`Registry::dispatch_next`].
    pub fn current_message(&self) -> Option<&Message> {
        self.registry.current_message(self.looper)
    }

    /// The registry.
    pub fn registry(&mut self) -> &mut Registry {
        &mut *self.registry
    }

    /// Post a copy of `message` to the dispatching looper. See [`Registry::post_message`].
    pub fn post_message(&mut self, message: &Message, destination: Option<HandlerId>) -> bool {
        self.registry.post_message(self.looper, message, destination)
    }

    /// Post an empty message of kind `what` to the dispatching looper. See [`Registry::post`].
    pub fn post(&mut self, what: u32, destination: Option<HandlerId>) -> bool {
        self.registry.post(self.looper, what, destination)
    }
}
