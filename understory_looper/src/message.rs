// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Messages: a kind tag, an optional destination, and an ordered bag of named values.
//!
//! ## Overview
//!
//! A [`Message`] is a plain value. Cloning deep-copies every entry; dropping releases
//! them. Entry names need not be unique: adding a name twice stores two entries, which
//! is how multi-valued properties are expressed. Insertion order is preserved.
//!
//! Lookups by name always consider the *first* entry with that name:
//!
//! - [`Message::find_data`] returns it if its type matches (or if [`TypeCode::ANY`] was requested).
//! - [`Message::replace_data`] overwrites its payload and type in place.
//! - [`Message::remove_name`] is the exception and removes every entry with that name.
//!
//! ## Example
//!
//! ```
//! use understory_looper::kind;
//! use understory_looper::message::Message;
//!
//! let mut m = Message::new(kind::USER + 1);
//! m.add_int("row", 3);
//! m.add_int("row", 4);
//! m.add_string("label", "ok");
//!
//! assert_eq!(m.count(), 3);
//! assert_eq!(m.find_int("row"), Some(3));
//! assert_eq!(m.find_all("row").count(), 2);
//! assert_eq!(m.find_string("label"), Some("ok"));
//!
//! assert!(m.remove_name("row"));
//! assert_eq!(m.find_int("row"), None);
//! ```

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Point, Rect, Size};

use crate::kind;
use crate::types::HandlerId;
use crate::value::{TypeCode, Value};

/// A named entry of a [`Message`].
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    name: String,
    value: Value,
}

impl Entry {
    /// Entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Type tag of the stored value.
    pub fn type_code(&self) -> TypeCode {
        self.value.type_code()
    }

    /// Payload length in bytes.
    pub fn byte_len(&self) -> usize {
        self.value.byte_len()
    }
}

/// Unit of communication between handlers.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// Kind of the message. See [`kind`](crate::kind) for the reserved values.
    pub what: u32,
    handler: Option<HandlerId>,
    entries: Vec<Entry>,
}

impl Default for Message {
    fn default() -> Self {
        Self::new(kind::UNKNOWN)
    }
}

impl Message {
    /// Create an empty message of the given kind.
    pub fn new(what: u32) -> Self {
        Self {
            what,
            handler: None,
            entries: Vec::new(),
        }
    }

    /// Create an empty message of the given kind addressed to `handler`.
    pub fn with_handler(what: u32, handler: HandlerId) -> Self {
        Self {
            handler: Some(handler),
            ..Self::new(what)
        }
    }

    /// Destination handler, if any.
    pub fn handler(&self) -> Option<HandlerId> {
        self.handler
    }

    /// Set or clear the destination handler.
    pub fn set_handler(&mut self, handler: Option<HandlerId>) {
        self.handler = handler;
    }

    /// Returns true for application-range kinds (`what >= USER`).
    ///
    /// Framework kinds report `false`.
    pub fn is_system(&self) -> bool {
        self.what >= kind::USER
    }

    /// Number of entries, duplicates included.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Iterate entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.entries.iter()
    }

    /// Append an entry, even if `name` is already present.
    pub fn add_value(&mut self, name: &str, value: impl Into<Value>) {
        self.entries.push(Entry {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Append an opaque blob tagged with `type_code`. The bytes are copied.
    pub fn add_data(&mut self, name: &str, type_code: TypeCode, bytes: &[u8]) {
        self.add_value(
            name,
            Value::Data {
                type_code,
                bytes: bytes.to_vec(),
            },
        );
    }

    /// Append a boolean.
    pub fn add_bool(&mut self, name: &str, b: bool) {
        self.add_value(name, Value::Bool(b));
    }

    /// Append a one byte character.
    pub fn add_char(&mut self, name: &str, c: u8) {
        self.add_value(name, Value::Char(c));
    }

    /// Append a 16-bit integer.
    pub fn add_short(&mut self, name: &str, x: i16) {
        self.add_value(name, Value::Short(x));
    }

    /// Append a 32-bit integer.
    pub fn add_int(&mut self, name: &str, x: i32) {
        self.add_value(name, Value::Int(x));
    }

    /// Append a 64-bit integer.
    pub fn add_long(&mut self, name: &str, x: i64) {
        self.add_value(name, Value::Long(x));
    }

    /// Append a 32-bit float.
    pub fn add_float(&mut self, name: &str, x: f32) {
        self.add_value(name, Value::Float(x));
    }

    /// Append a 64-bit float.
    pub fn add_double(&mut self, name: &str, x: f64) {
        self.add_value(name, Value::Double(x));
    }

    /// Append an address-sized token. Only the token is stored.
    pub fn add_pointer(&mut self, name: &str, p: usize) {
        self.add_value(name, Value::Pointer(p));
    }

    /// Append a copy of `s`.
    pub fn add_string(&mut self, name: &str, s: &str) {
        self.add_value(name, Value::String(s.into()));
    }

    /// Append a point.
    pub fn add_point(&mut self, name: &str, p: Point) {
        self.add_value(name, Value::Point(p));
    }

    /// Append a size.
    pub fn add_size(&mut self, name: &str, s: Size) {
        self.add_value(name, Value::Size(s));
    }

    /// Append a rectangle.
    pub fn add_rect(&mut self, name: &str, r: Rect) {
        self.add_value(name, Value::Rect(r));
    }

    /// Replace the first entry named `name` with `value`, whatever its stored type.
    ///
    /// Returns `false` if no entry has that name. Later entries sharing the name are
    /// left untouched.
    pub fn replace_value(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.locate(name) {
            Some(i) => {
                self.entries[i].value = value.into();
                true
            }
            None => false,
        }
    }

    /// Replace the first entry named `name` with an opaque blob.
    ///
    /// See [`Message::replace_value`].
    pub fn replace_data(&mut self, name: &str, type_code: TypeCode, bytes: &[u8]) -> bool {
        self.replace_value(
            name,
            Value::Data {
                type_code,
                bytes: bytes.to_vec(),
            },
        )
    }

    /// Look up the first entry named `name`.
    ///
    /// With [`TypeCode::ANY`] any stored type matches; otherwise the tag must match
    /// exactly. Only the first entry with that name is examined.
    pub fn find_data(&self, name: &str, type_code: TypeCode) -> Option<&Value> {
        let entry = &self.entries[self.locate(name)?];
        type_code
            .accepts(entry.value.type_code())
            .then_some(&entry.value)
    }

    /// Iterate every value stored under `name`, in insertion order.
    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.name == name)
            .map(|e| &e.value)
    }

    /// Read the first entry named `name` as a boolean.
    pub fn find_bool(&self, name: &str) -> Option<bool> {
        self.find_data(name, TypeCode::BOOL)?.as_bool()
    }

    /// Read the first entry named `name` as a character.
    pub fn find_char(&self, name: &str) -> Option<u8> {
        self.find_data(name, TypeCode::CHAR)?.as_char()
    }

    /// Read the first entry named `name` as a 16-bit integer.
    pub fn find_short(&self, name: &str) -> Option<i16> {
        self.find_data(name, TypeCode::SHORT)?.as_short()
    }

    /// Read the first entry named `name` as a 32-bit integer.
    pub fn find_int(&self, name: &str) -> Option<i32> {
        self.find_data(name, TypeCode::INT)?.as_int()
    }

    /// Read the first entry named `name` as a 64-bit integer.
    pub fn find_long(&self, name: &str) -> Option<i64> {
        self.find_data(name, TypeCode::LONG)?.as_long()
    }

    /// Read the first entry named `name` as a 32-bit float.
    pub fn find_float(&self, name: &str) -> Option<f32> {
        self.find_data(name, TypeCode::FLOAT)?.as_float()
    }

    /// Read the first entry named `name` as a 64-bit float.
    pub fn find_double(&self, name: &str) -> Option<f64> {
        self.find_data(name, TypeCode::DOUBLE)?.as_double()
    }

    /// Read the first entry named `name` as an address-sized token.
    pub fn find_pointer(&self, name: &str) -> Option<usize> {
        self.find_data(name, TypeCode::POINTER)?.as_pointer()
    }

    /// Read the first entry named `name` as a string.
    pub fn find_string(&self, name: &str) -> Option<&str> {
        self.find_data(name, TypeCode::STRING)?.as_str()
    }

    /// Read the first entry named `name` as a point.
    pub fn find_point(&self, name: &str) -> Option<Point> {
        self.find_data(name, TypeCode::POINT)?.as_point()
    }

    /// Read the first entry named `name` as a size.
    pub fn find_size(&self, name: &str) -> Option<Size> {
        self.find_data(name, TypeCode::SIZE)?.as_size()
    }

    /// Read the first entry named `name` as a rectangle.
    pub fn find_rect(&self, name: &str) -> Option<Rect> {
        self.find_data(name, TypeCode::RECT)?.as_rect()
    }

    /// Remove every entry named `name`. Returns true if anything was removed.
    pub fn remove_name(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        self.entries.len() != before
    }

    /// Reset to an empty [`kind::UNKNOWN`] message without a destination.
    pub fn clear(&mut self) {
        self.what = kind::UNKNOWN;
        self.handler = None;
        self.entries.clear();
    }

    fn locate(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }
}
