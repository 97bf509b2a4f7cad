// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Message kinds.
//!
//! Kinds below [`USER`] are reserved for the framework (input, view, window and
//! system notifications). Applications define their own kinds as `USER + n`.
//! [`UNKNOWN`] marks an empty or cleared message.

/// Mouse button pressed.
pub const MOUSE_DOWN: u32 = 0x0010;
/// Mouse button released.
pub const MOUSE_UP: u32 = 0x0011;
/// Pointer moved.
pub const MOUSE_MOVED: u32 = 0x0012;
/// Mouse button double-clicked.
pub const MOUSE_DOUBLECLICK: u32 = 0x0013;
/// Mouse wheel rotated.
pub const MOUSE_WHEEL: u32 = 0x0014;

/// Key pressed down.
pub const KEY_DOWN: u32 = 0x0020;
/// Key released.
pub const KEY_UP: u32 = 0x0021;
/// Character produced by a key press.
pub const KEY_PRESSED: u32 = 0x0022;

/// Timer tick.
pub const PULSE: u32 = 0x0030;

/// View needs to be drawn.
pub const VIEW_DRAW: u32 = 0x0040;
/// View gained or lost focus.
pub const VIEW_FOCUS_CHANGED: u32 = 0x0041;
/// View was resized.
pub const VIEW_RESIZED: u32 = 0x0042;
/// View was moved.
pub const VIEW_MOVED: u32 = 0x0043;
/// View was shown or hidden.
pub const VIEW_VISIBILITY_CHANGED: u32 = 0x0044;
/// View was enabled or disabled.
pub const VIEW_ENABLED: u32 = 0x0045;

/// Window was activated or deactivated.
pub const WINDOW_ACTIVATED: u32 = 0x0050;
/// Window close was requested.
pub const WINDOW_CLOSE: u32 = 0x0051;

/// Request to terminate a looper. Only honored when addressed to the looper itself.
pub const QUIT: u32 = 0x0060;

/// Generic system notification.
pub const SYSTEM: u32 = 0x0090;
/// Menu or control command.
pub const COMMAND: u32 = 0x0091;

/// First application-defined kind.
pub const USER: u32 = 0x1000;

/// Kind of an empty or cleared message.
pub const UNKNOWN: u32 = 0xFFFF;

/// Returns true if `what` lies in the framework-reserved range.
#[inline]
pub const fn is_reserved(what: u32) -> bool {
    what < USER
}
