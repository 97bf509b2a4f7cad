// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Looper basics.
//!
//! A scripted "platform" feeds framework events into the application looper. A window
//! handler decodes them, and closing the window (the application's main handler)
//! ends the loop.
//!
//! Run:
//! - `cargo run -p understory_demos --example looper_basics`
//! - `RUST_LOG=understory_looper=trace cargo run -p understory_demos --example looper_basics`

use kurbo::Point;
use tracing_subscriber::EnvFilter;
use understory_looper::{
    Buttons, Context, Event, Flow, Handler, HandlerId, KeyState, LoopState, LooperConfig,
    LooperId, Message, PlainLooper, Registry,
};

#[derive(Default)]
struct Window {
    clicks: Vec<Point>,
    typed: String,
}

impl Handler for Window {
    fn message_received(&mut self, message: &Message, cx: &mut Context<'_>) -> Flow {
        let Some(event) = Event::from_message(message) else {
            return Flow::Forward;
        };
        match event {
            Event::MouseDown { button, keys, .. } => {
                let at = event.position().unwrap_or_default();
                println!("  mouse down {button:?} at {at:?} holding {keys:?}");
                self.clicks.push(at);
            }
            Event::KeyPressed { ch } => {
                if let Some(c) = u32::try_from(ch).ok().and_then(char::from_u32) {
                    self.typed.push(c);
                }
            }
            Event::Resized { .. } => {
                println!("  resized to {:?}", event.size().unwrap_or_default());
            }
            Event::WindowClose => {
                println!(
                    "  close requested after {} click(s), typed {:?}",
                    self.clicks.len(),
                    self.typed
                );
                let me = cx.handler();
                cx.registry().remove(me);
            }
            other => {
                println!("  ignored {other:?}");
                return Flow::Forward;
            }
        }
        Flow::Handled
    }
}

/// Replays a fixed script, one event per turn, addressed to the window.
struct Script {
    window: HandlerId,
    events: std::vec::IntoIter<Event>,
}

impl understory_looper::EventSource for Script {
    fn pump(&mut self, registry: &mut Registry, looper: LooperId) -> bool {
        match self.events.next() {
            Some(event) => {
                let posted = registry.post_message(looper, &event.to_message(), Some(self.window));
                if !posted {
                    tracing::warn!(?event, "event dropped");
                }
                true
            }
            None => false,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut registry = Registry::new();
    let app = registry
        .create_application(LooperConfig::default(), PlainLooper)
        .expect("first application");
    let window = registry.insert(Window::default());
    registry.add_handler(app, window);
    registry.set_main_handler(app, Some(window));

    let mut script = Script {
        window,
        events: vec![
            Event::Resized {
                width: 800,
                height: 600,
            },
            Event::MouseDown {
                x: 12,
                y: 34,
                button: Buttons::LEFT,
                keys: KeyState::LEFT_BUTTON | KeyState::SHIFT,
            },
            Event::KeyPressed { ch: 'h' as i32 },
            Event::KeyPressed { ch: 'i' as i32 },
            Event::Pulse { timer: 1 },
            Event::WindowClose,
            // Never dispatched: the loop ends when the window closes.
            Event::Draw,
        ]
        .into_iter(),
    };

    println!("running");
    let state = registry.run(app, &mut script).expect("application is alive");
    assert_eq!(state, LoopState::Quit);
    println!("loop ended in {state:?}");
    println!("window alive after close: {}", registry.is_alive(window));
}
