// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handler chains, default handlers, and the quit gate.
//!
//! A button forwards what it does not understand to its parent view, which forwards to
//! the window. Unaddressed messages go to the default handler. The looper vetoes the
//! first quit request and accepts the second.
//!
//! Run:
//! - `cargo run -p understory_demos --example handler_chain`

use tracing_subscriber::EnvFilter;
use understory_looper::{
    Context, Flow, Handler, Looper, LooperConfig, Message, NoEvents, Registry, handler_fn, kind,
};

const CLICKED: u32 = kind::USER + 1;
const SAVE: u32 = kind::USER + 2;
const ABOUT: u32 = kind::USER + 3;

/// Prints every message and handles only the kinds it knows.
struct Node {
    name: &'static str,
    handles: &'static [u32],
}

impl Handler for Node {
    fn message_received(&mut self, message: &Message, _cx: &mut Context<'_>) -> Flow {
        if self.handles.contains(&message.what) {
            println!("  {} handles {:#06x}", self.name, message.what);
            Flow::Handled
        } else {
            println!("  {} forwards {:#06x}", self.name, message.what);
            Flow::Forward
        }
    }
}

/// Looper that asks twice before quitting.
#[derive(Default)]
struct Stubborn {
    asked: u32,
}

impl Handler for Stubborn {}

impl Looper for Stubborn {
    fn quit_requested(&mut self, _cx: &mut Context<'_>) -> bool {
        self.asked += 1;
        println!("  quit requested ({})", self.asked);
        self.asked > 1
    }

    fn quit(&mut self, _cx: &mut Context<'_>) {
        println!("  quitting");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut registry = Registry::new();
    let looper = registry.insert_looper(LooperConfig::default().with_capacity(8), Stubborn::default());

    let window = registry.insert(Node {
        name: "window",
        handles: &[SAVE],
    });
    let view = registry.insert(Node {
        name: "view",
        handles: &[],
    });
    let button = registry.insert(Node {
        name: "button",
        handles: &[CLICKED],
    });
    registry.set_next(button, Some(view));
    registry.set_next(view, Some(window));
    for h in [window, view, button] {
        registry.add_handler(looper, h);
    }

    let menu = registry.insert(handler_fn(|message, cx| {
        println!("  menu handles {:#06x}", message.what);
        if message.what == ABOUT {
            // Answer by posting a follow-up to ourselves.
            let me = cx.handler();
            cx.post(CLICKED, Some(me));
        }
        Flow::Handled
    }));
    registry.add_handler(looper, menu);
    registry.set_default_handler(looper, Some(menu));

    registry.post(looper, CLICKED, Some(button));
    registry.post(looper, SAVE, Some(button));
    registry.post(looper, kind::COMMAND, Some(button));
    registry.post(looper, ABOUT, None);

    let quit = Message::with_handler(kind::QUIT, looper.handler());
    registry.post_message(looper, &quit, Some(looper.handler()));
    registry.post_message(looper, &quit, Some(looper.handler()));

    while let Some(next) = registry.queue(looper).and_then(|q| q.peek()).map(|m| m.what) {
        println!("dispatch {next:#06x}:");
        registry.dispatch_next(looper);
    }

    let state = registry.run(looper, &mut NoEvents);
    println!("final state: {state:?}");
}
