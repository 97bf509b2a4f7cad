// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_looper --heading-base-level=0

//! Understory Looper: a single-threaded message loop for UI toolkits.
//!
//! ## Overview
//!
//! This crate provides the message-passing and dispatch core a toolkit builds its
//! windows and views on:
//!
//! - [`Message`](crate::message::Message): a kind code plus named, typed entries. A
//!   name may hold several values.
//! - [`MessageQueue`](crate::queue::MessageQueue): a bounded FIFO that rejects once full.
//! - [`Handler`](crate::handler::Handler): a receiver that handles a message or forwards
//!   it along its `next` link.
//! - [`Looper`](crate::handler::Looper): a handler that owns a queue and a set of
//!   registered handlers, and dispatches its messages one at a time.
//!
//! Handlers and loopers live in a [`Registry`](crate::registry::Registry) and are
//! addressed by generational ids. Links between them (forwarding, ownership, default
//! and main handler) are ids, so removing something never leaves a dangling reference.
//!
//! ## Dispatch
//!
//! [`Registry::dispatch_message`](crate::registry::Registry::dispatch_message) picks
//! one receiver: a quit request addressed to the looper goes to the quit gate; else a
//! destination registered with the looper; else the looper's default handler; else the
//! looper itself. From there the message walks the forwarding chain until a handler
//! returns [`Flow::Handled`](crate::types::Flow::Handled). See [`dispatch`] for details.
//!
//! Posting copies the message, so the caller keeps its own. The looper owns queued
//! messages until [`dispatch_next`](crate::registry::Registry::dispatch_next) releases
//! them.
//!
//! ## Example
//!
//! ```
//! use understory_looper::config::LooperConfig;
//! use understory_looper::handler::{Context, Handler, PlainLooper};
//! use understory_looper::kind;
//! use understory_looper::message::Message;
//! use understory_looper::registry::Registry;
//! use understory_looper::types::{Flow, LoopState};
//!
//! const SAVE: u32 = kind::USER + 1;
//!
//! #[derive(Default)]
//! struct Document {
//!     saved: Vec<String>,
//! }
//!
//! impl Handler for Document {
//!     fn message_received(&mut self, message: &Message, cx: &mut Context<'_>) -> Flow {
//!         match message.what {
//!             SAVE => {
//!                 let path = message.find_string("path").unwrap_or("untitled");
//!                 self.saved.push(path.to_string());
//!                 // Done: ask our looper to stop.
//!                 let looper = cx.looper();
//!                 cx.post(kind::QUIT, Some(looper.handler()));
//!                 Flow::Handled
//!             }
//!             _ => Flow::Forward,
//!         }
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! let app = registry
//!     .create_application(LooperConfig::default(), PlainLooper)
//!     .unwrap();
//! let doc = registry.insert(Document::default());
//! assert!(registry.add_handler(app, doc));
//!
//! let mut save = Message::new(SAVE);
//! save.add_string("path", "notes.txt");
//! assert!(registry.post_message(app, &save, Some(doc)));
//!
//! let state = registry
//!     .run(app, &mut understory_looper::dispatch::NoEvents)
//!     .unwrap();
//! assert_eq!(state, LoopState::Quit);
//! assert_eq!(registry.get::<Document>(doc).unwrap().saved, ["notes.txt"]);
//! ```
//!
//! ## Features
//!
//! - `std` (default): forwards to `kurbo`, `tracing` and `thiserror`.
//! - `libm`: `no_std` float support for `kurbo`.
//!
//! The crate logs through [`tracing`]: `trace` for posting and routing, `debug` for
//! registration changes and rejected calls, `warn` for cut forwarding cycles and
//! skipped reentrant deliveries, and `info` when a looper quits.

#![no_std]

extern crate alloc;

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler;
pub mod kind;
pub mod message;
pub mod queue;
pub mod registry;
pub mod types;
pub mod value;

pub use config::LooperConfig;
pub use dispatch::{EventSource, NoEvents};
pub use error::Error;
pub use event::{Buttons, Event, KeyState};
pub use handler::{Context, Handler, Looper, PlainLooper, handler_fn};
pub use message::Message;
pub use queue::MessageQueue;
pub use registry::Registry;
pub use types::{Flow, HandlerId, LoopState, LooperId, Route};
pub use value::{TypeCode, Value};
