// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed payloads stored in a [`Message`](crate::message::Message).
//!
//! ## Overview
//!
//! Every entry of a message carries a [`Value`]. The common scalar and geometry
//! types have their own variants; anything else is stored as an opaque
//! [`Value::Data`] blob tagged with a writer-chosen [`TypeCode`].
//!
//! Readers ask for a type code. A blob written with one of the standard codes is
//! decoded on read when its length equals the natural width of that type, so
//! `add_data(name, TypeCode::INT, &7_i32.to_ne_bytes())` reads back through
//! [`Value::as_int`]. No other runtime checks are performed.

use alloc::string::String;
use alloc::vec::Vec;
use core::mem::size_of;

use kurbo::{Point, Rect, Size};

/// Type tag of a message entry.
///
/// The standard codes mirror the typed writers on
/// [`Message`](crate::message::Message). Applications may use any other value for
/// their own blobs. [`TypeCode::ANY`] is a lookup wildcard and is never stored by the
/// typed writers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TypeCode(pub u32);

impl TypeCode {
    /// One byte character.
    pub const CHAR: Self = Self(0x0000);
    /// 16-bit signed integer.
    pub const SHORT: Self = Self(0x0001);
    /// 32-bit signed integer.
    pub const INT: Self = Self(0x0002);
    /// 64-bit signed integer.
    pub const LONG: Self = Self(0x0003);
    /// Boolean, one byte.
    pub const BOOL: Self = Self(0x0004);
    /// 32-bit float.
    pub const FLOAT: Self = Self(0x0005);
    /// 64-bit float.
    pub const DOUBLE: Self = Self(0x0006);
    /// Two `f64` coordinates.
    pub const POINT: Self = Self(0x0007);
    /// Width and height as `f64`.
    pub const SIZE: Self = Self(0x0008);
    /// Four `f64` edges.
    pub const RECT: Self = Self(0x0009);
    /// Opaque address-sized token.
    pub const POINTER: Self = Self(0x000A);
    /// NUL-terminated UTF-8 string.
    pub const STRING: Self = Self(0x000B);
    /// Matches every stored type on lookup.
    pub const ANY: Self = Self(0x00FF);

    /// Returns true if a lookup for `self` accepts an entry stored as `stored`.
    #[inline]
    pub const fn accepts(self, stored: Self) -> bool {
        self.0 == Self::ANY.0 || self.0 == stored.0
    }
}

/// A single entry payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// One byte character.
    Char(u8),
    /// 16-bit integer.
    Short(i16),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Opaque address-sized token. Only the token is copied, never what it refers to.
    Pointer(usize),
    /// Owned string.
    String(String),
    /// Point.
    Point(Point),
    /// Size.
    Size(Size),
    /// Rectangle.
    Rect(Rect),
    /// Opaque bytes tagged by the writer.
    Data {
        /// Tag supplied by the writer.
        type_code: TypeCode,
        /// Owned copy of the payload.
        bytes: Vec<u8>,
    },
}

impl Value {
    /// Type tag of the stored value.
    pub fn type_code(&self) -> TypeCode {
        match self {
            Self::Bool(_) => TypeCode::BOOL,
            Self::Char(_) => TypeCode::CHAR,
            Self::Short(_) => TypeCode::SHORT,
            Self::Int(_) => TypeCode::INT,
            Self::Long(_) => TypeCode::LONG,
            Self::Float(_) => TypeCode::FLOAT,
            Self::Double(_) => TypeCode::DOUBLE,
            Self::Pointer(_) => TypeCode::POINTER,
            Self::String(_) => TypeCode::STRING,
            Self::Point(_) => TypeCode::POINT,
            Self::Size(_) => TypeCode::SIZE,
            Self::Rect(_) => TypeCode::RECT,
            Self::Data { type_code, .. } => *type_code,
        }
    }

    /// Payload length in bytes. Strings count their terminator.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Bool(_) | Self::Char(_) => 1,
            Self::Short(_) => size_of::<i16>(),
            Self::Int(_) => size_of::<i32>(),
            Self::Long(_) => size_of::<i64>(),
            Self::Float(_) => size_of::<f32>(),
            Self::Double(_) => size_of::<f64>(),
            Self::Pointer(_) => size_of::<usize>(),
            Self::String(s) => s.len() + 1,
            Self::Point(_) | Self::Size(_) => 2 * size_of::<f64>(),
            Self::Rect(_) => 4 * size_of::<f64>(),
            Self::Data { bytes, .. } => bytes.len(),
        }
    }

    /// Native-endian byte image of the payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bool(b) => alloc::vec![u8::from(*b)],
            Self::Char(c) => alloc::vec![*c],
            Self::Short(x) => x.to_ne_bytes().to_vec(),
            Self::Int(x) => x.to_ne_bytes().to_vec(),
            Self::Long(x) => x.to_ne_bytes().to_vec(),
            Self::Float(x) => x.to_ne_bytes().to_vec(),
            Self::Double(x) => x.to_ne_bytes().to_vec(),
            Self::Pointer(p) => p.to_ne_bytes().to_vec(),
            Self::String(s) => {
                let mut out = Vec::with_capacity(s.len() + 1);
                out.extend_from_slice(s.as_bytes());
                out.push(0);
                out
            }
            Self::Point(p) => f64s(&[p.x, p.y]),
            Self::Size(s) => f64s(&[s.width, s.height]),
            Self::Rect(r) => f64s(&[r.x0, r.y0, r.x1, r.y1]),
            Self::Data { bytes, .. } => bytes.clone(),
        }
    }

    /// Reads a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => self.blob::<1>(TypeCode::BOOL).map(|[b]| b != 0),
        }
    }

    /// Reads a one byte character.
    pub fn as_char(&self) -> Option<u8> {
        match self {
            Self::Char(c) => Some(*c),
            _ => self.blob::<1>(TypeCode::CHAR).map(|[c]| c),
        }
    }

    /// Reads a 16-bit integer.
    pub fn as_short(&self) -> Option<i16> {
        match self {
            Self::Short(x) => Some(*x),
            _ => self.blob(TypeCode::SHORT).map(i16::from_ne_bytes),
        }
    }

    /// Reads a 32-bit integer.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(x) => Some(*x),
            _ => self.blob(TypeCode::INT).map(i32::from_ne_bytes),
        }
    }

    /// Reads a 64-bit integer.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(x) => Some(*x),
            _ => self.blob(TypeCode::LONG).map(i64::from_ne_bytes),
        }
    }

    /// Reads a 32-bit float.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(x) => Some(*x),
            _ => self.blob(TypeCode::FLOAT).map(f32::from_ne_bytes),
        }
    }

    /// Reads a 64-bit float.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(x) => Some(*x),
            _ => self.blob(TypeCode::DOUBLE).map(f64::from_ne_bytes),
        }
    }

    /// Reads an address-sized token.
    pub fn as_pointer(&self) -> Option<usize> {
        match self {
            Self::Pointer(p) => Some(*p),
            _ => self.blob(TypeCode::POINTER).map(usize::from_ne_bytes),
        }
    }

    /// Reads a string.
    ///
    /// A blob tagged [`TypeCode::STRING`] must be valid UTF-8 and is cut at its
    /// first NUL byte.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Data { type_code, bytes } if *type_code == TypeCode::STRING => {
                let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
                core::str::from_utf8(&bytes[..end]).ok()
            }
            _ => None,
        }
    }

    /// Reads a point.
    pub fn as_point(&self) -> Option<Point> {
        match self {
            Self::Point(p) => Some(*p),
            _ => self
                .blob::<16>(TypeCode::POINT)
                .map(|b| Point::new(f64_at(&b, 0), f64_at(&b, 1))),
        }
    }

    /// Reads a size.
    pub fn as_size(&self) -> Option<Size> {
        match self {
            Self::Size(s) => Some(*s),
            _ => self
                .blob::<16>(TypeCode::SIZE)
                .map(|b| Size::new(f64_at(&b, 0), f64_at(&b, 1))),
        }
    }

    /// Reads a rectangle.
    pub fn as_rect(&self) -> Option<Rect> {
        match self {
            Self::Rect(r) => Some(*r),
            _ => self.blob::<32>(TypeCode::RECT).map(|b| {
                Rect::new(f64_at(&b, 0), f64_at(&b, 1), f64_at(&b, 2), f64_at(&b, 3))
            }),
        }
    }

    /// Raw bytes of a [`Value::Data`] entry with the given tag and exactly `N` bytes.
    fn blob<const N: usize>(&self, code: TypeCode) -> Option<[u8; N]> {
        match self {
            Self::Data { type_code, bytes } if *type_code == code => {
                <[u8; N]>::try_from(bytes.as_slice()).ok()
            }
            _ => None,
        }
    }
}

fn f64s(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn f64_at(bytes: &[u8], i: usize) -> f64 {
    let mut word = [0_u8; 8];
    word.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
    f64::from_ne_bytes(word)
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Point> for Value {
    fn from(v: Point) -> Self {
        Self::Point(v)
    }
}

impl From<Size> for Value {
    fn from(v: Size) -> Self {
        Self::Size(v)
    }
}

impl From<Rect> for Value {
    fn from(v: Rect) -> Self {
        Self::Rect(v)
    }
}
