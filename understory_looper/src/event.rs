// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Framework events and their message encoding.
//!
//! Platform backends describe input and window notifications as [`Event`]s and post
//! them with [`Event::to_message`]. Handlers decode with [`Event::from_message`]:
//!
//! ```
//! use understory_looper::event::{Buttons, Event, KeyState};
//! use understory_looper::kind;
//!
//! let down = Event::MouseDown {
//!     x: 10,
//!     y: 20,
//!     button: Buttons::LEFT,
//!     keys: KeyState::LEFT_BUTTON | KeyState::SHIFT,
//! };
//! let message = down.to_message();
//! assert_eq!(message.what, kind::MOUSE_DOWN);
//! assert_eq!(message.find_int("xpos"), Some(10));
//! assert_eq!(Event::from_message(&message), Some(down));
//! ```
//!
//! Fields are `int` or `bool` entries. A missing field decodes as zero or `false`.

use kurbo::{Point, Size};

use crate::kind;
use crate::message::Message;

bitflags::bitflags! {
    /// Mouse button that changed state.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Buttons: u32 {
        /// Primary button.
        const LEFT   = 0b0001;
        /// Secondary button.
        const RIGHT  = 0b0010;
        /// Middle button.
        const MIDDLE = 0b0100;
    }
}

bitflags::bitflags! {
    /// Buttons and modifier keys held while a mouse event occurred.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct KeyState: u32 {
        /// Primary button held.
        const LEFT_BUTTON   = 0b00_0001;
        /// Secondary button held.
        const RIGHT_BUTTON  = 0b00_0010;
        /// Middle button held.
        const MIDDLE_BUTTON = 0b00_0100;
        /// Shift held.
        const SHIFT         = 0b00_1000;
        /// Control held.
        const CONTROL       = 0b01_0000;
        /// Alt held.
        const ALT           = 0b10_0000;
    }
}

/// A framework notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Button pressed at (`x`, `y`).
    MouseDown {
        /// Horizontal position.
        x: i32,
        /// Vertical position.
        y: i32,
        /// Button pressed.
        button: Buttons,
        /// Buttons and modifiers held.
        keys: KeyState,
    },
    /// Button released at (`x`, `y`).
    MouseUp {
        /// Horizontal position.
        x: i32,
        /// Vertical position.
        y: i32,
        /// Button released.
        button: Buttons,
        /// Buttons and modifiers held.
        keys: KeyState,
    },
    /// Pointer moved to (`x`, `y`).
    MouseMoved {
        /// Horizontal position.
        x: i32,
        /// Vertical position.
        y: i32,
        /// Buttons and modifiers held.
        keys: KeyState,
    },
    /// Button double-clicked at (`x`, `y`).
    MouseDoubleClick {
        /// Horizontal position.
        x: i32,
        /// Vertical position.
        y: i32,
        /// Button clicked.
        button: Buttons,
        /// Buttons and modifiers held.
        keys: KeyState,
    },
    /// Virtual key pressed.
    KeyDown {
        /// Platform key code.
        key: i32,
    },
    /// Virtual key released.
    KeyUp {
        /// Platform key code.
        key: i32,
    },
    /// Character typed.
    KeyPressed {
        /// Character code.
        ch: i32,
    },
    /// Timer fired.
    Pulse {
        /// Timer id.
        timer: i32,
    },
    /// Repaint requested.
    Draw,
    /// Focus gained or lost.
    FocusChanged {
        /// Whether the view now has focus.
        focused: bool,
    },
    /// View resized.
    Resized {
        /// New width.
        width: i32,
        /// New height.
        height: i32,
    },
    /// View moved to (`x`, `y`).
    Moved {
        /// New horizontal position.
        x: i32,
        /// New vertical position.
        y: i32,
    },
    /// View shown or hidden.
    VisibilityChanged {
        /// Whether the view is now visible.
        show: bool,
    },
    /// View enabled or disabled.
    Enabled {
        /// Whether the view is now enabled.
        enabled: bool,
    },
    /// Window activated or deactivated.
    WindowActivated {
        /// Whether the window is now active.
        active: bool,
    },
    /// Window close requested.
    WindowClose,
    /// Menu or control command.
    Command {
        /// Command id.
        cmd: i32,
    },
}

impl Event {
    /// Message kind used for this event.
    pub fn kind(&self) -> u32 {
        match self {
            Self::MouseDown { .. } => kind::MOUSE_DOWN,
            Self::MouseUp { .. } => kind::MOUSE_UP,
            Self::MouseMoved { .. } => kind::MOUSE_MOVED,
            Self::MouseDoubleClick { .. } => kind::MOUSE_DOUBLECLICK,
            Self::KeyDown { .. } => kind::KEY_DOWN,
            Self::KeyUp { .. } => kind::KEY_UP,
            Self::KeyPressed { .. } => kind::KEY_PRESSED,
            Self::Pulse { .. } => kind::PULSE,
            Self::Draw => kind::VIEW_DRAW,
            Self::FocusChanged { .. } => kind::VIEW_FOCUS_CHANGED,
            Self::Resized { .. } => kind::VIEW_RESIZED,
            Self::Moved { .. } => kind::VIEW_MOVED,
            Self::VisibilityChanged { .. } => kind::VIEW_VISIBILITY_CHANGED,
            Self::Enabled { .. } => kind::VIEW_ENABLED,
            Self::WindowActivated { .. } => kind::WINDOW_ACTIVATED,
            Self::WindowClose => kind::WINDOW_CLOSE,
            Self::Command { .. } => kind::COMMAND,
        }
    }

    /// Pointer or view position carried by the event.
    pub fn position(&self) -> Option<Point> {
        match *self {
            Self::MouseDown { x, y, .. }
            | Self::MouseUp { x, y, .. }
            | Self::MouseMoved { x, y, .. }
            | Self::MouseDoubleClick { x, y, .. }
            | Self::Moved { x, y } => Some(Point::new(x.into(), y.into())),
            _ => None,
        }
    }

    /// New size carried by [`Event::Resized`].
    pub fn size(&self) -> Option<Size> {
        match *self {
            Self::Resized { width, height } => Some(Size::new(width.into(), height.into())),
            _ => None,
        }
    }

    /// Encode as a message without destination.
    ///
    /// Mouse events write `button` before `keys`, `xpos` and `ypos`; moves carry no
    /// `button`.
    pub fn to_message(&self) -> Message {
        let mut m = Message::new(self.kind());
        match *self {
            Self::MouseDown { x, y, button, keys }
            | Self::MouseUp { x, y, button, keys }
            | Self::MouseDoubleClick { x, y, button, keys } => {
                m.add_int("button", button.bits().cast_signed());
                put_pointer(&mut m, x, y, keys);
            }
            Self::MouseMoved { x, y, keys } => put_pointer(&mut m, x, y, keys),
            Self::KeyDown { key } | Self::KeyUp { key } => m.add_int("key", key),
            Self::KeyPressed { ch } => m.add_int("char", ch),
            Self::Pulse { timer } => m.add_int("timer", timer),
            Self::FocusChanged { focused } => m.add_bool("focused", focused),
            Self::Resized { width, height } => {
                m.add_int("width", width);
                m.add_int("height", height);
            }
            Self::Moved { x, y } => {
                m.add_int("xpos", x);
                m.add_int("ypos", y);
            }
            Self::VisibilityChanged { show } => m.add_bool("show", show),
            Self::Enabled { enabled } => m.add_bool("enabled", enabled),
            Self::WindowActivated { active } => m.add_bool("active", active),
            Self::Command { cmd } => m.add_int("cmd", cmd),
            Self::Draw | Self::WindowClose => {}
        }
        m
    }

    /// Decode a framework message. Returns `None` for other kinds, including
    /// [`kind::MOUSE_WHEEL`], which carries no framework payload.
    pub fn from_message(message: &Message) -> Option<Self> {
        let int = |name| message.find_int(name).unwrap_or(0);
        let flag = |name| message.find_bool(name).unwrap_or(false);
        let button = || Buttons::from_bits_truncate(int("button").cast_unsigned());
        let keys = || KeyState::from_bits_truncate(int("keys").cast_unsigned());
        let event = match message.what {
            kind::MOUSE_DOWN => Self::MouseDown {
                x: int("xpos"),
                y: int("ypos"),
                button: button(),
                keys: keys(),
            },
            kind::MOUSE_UP => Self::MouseUp {
                x: int("xpos"),
                y: int("ypos"),
                button: button(),
                keys: keys(),
            },
            kind::MOUSE_MOVED => Self::MouseMoved {
                x: int("xpos"),
                y: int("ypos"),
                keys: keys(),
            },
            kind::MOUSE_DOUBLECLICK => Self::MouseDoubleClick {
                x: int("xpos"),
                y: int("ypos"),
                button: button(),
                keys: keys(),
            },
            kind::KEY_DOWN => Self::KeyDown { key: int("key") },
            kind::KEY_UP => Self::KeyUp { key: int("key") },
            kind::KEY_PRESSED => Self::KeyPressed { ch: int("char") },
            kind::PULSE => Self::Pulse {
                timer: int("timer"),
            },
            kind::VIEW_DRAW => Self::Draw,
            kind::VIEW_FOCUS_CHANGED => Self::FocusChanged {
                focused: flag("focused"),
            },
            kind::VIEW_RESIZED => Self::Resized {
                width: int("width"),
                height: int("height"),
            },
            kind::VIEW_MOVED => Self::Moved {
                x: int("xpos"),
                y: int("ypos"),
            },
            kind::VIEW_VISIBILITY_CHANGED => Self::VisibilityChanged { show: flag("show") },
            kind::VIEW_ENABLED => Self::Enabled {
                enabled: flag("enabled"),
            },
            kind::WINDOW_ACTIVATED => Self::WindowActivated {
                active: flag("active"),
            },
            kind::WINDOW_CLOSE => Self::WindowClose,
            kind::COMMAND => Self::Command { cmd: int("cmd") },
            _ => return None,
        };
        Some(event)
    }
}

fn put_pointer(m: &mut Message, x: i32, y: i32, keys: KeyState) {
    m.add_int("keys", keys.bits().cast_signed());
    m.add_int("xpos", x);
    m.add_int("ypos", y);
}
