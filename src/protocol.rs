//! Register codec for the EVSE Modbus register layout.
//!
//! The functions in this module are pure transforms between raw 16-bit
//! register words and the typed values exposed by the gateway. They perform
//! no I/O and report no errors: quantities and lengths are guaranteed by the
//! static register tables in [`crate::register_map`].
//!
//! 32-bit values (long integers and IEEE-754 floats) span two consecutive
//! registers with the high word first. Strings are packed two ASCII
//! characters per register, first character in the high byte.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Identity mapping of a single 16-bit register.
pub fn decode_integer(word: u16) -> u16 {
    word
}

/// Inverse of [`decode_integer`].
pub fn encode_integer(value: u16) -> u16 {
    value
}

/// Combines two consecutive registers (high word first) into one unsigned 32-bit integer.
pub fn decode_long(words: [u16; 2]) -> u32 {
    (u32::from(words[0]) << 16) | u32::from(words[1])
}

/// Splits an unsigned 32-bit integer into two registers, high word first.
pub fn encode_long(value: u32) -> [u16; 2] {
    [(value >> 16) as u16, value as u16]
}

/// Reinterprets two consecutive registers as an IEEE-754 single precision float.
pub fn decode_float(words: [u16; 2]) -> f32 {
    f32::from_bits(decode_long(words))
}

/// Encodes a float into the two registers expected by the device.
pub fn encode_float(value: f32) -> [u16; 2] {
    encode_long(value.to_bits())
}

/// Decodes `length` characters of packed ASCII from `words`.
///
/// Each byte maps to one character. NUL and whitespace padding is stripped
/// from both ends of the result.
pub fn decode_string(words: &[u16], length: usize) -> String {
    let text: String = words
        .iter()
        .flat_map(|word| word.to_be_bytes())
        .take(length)
        .map(char::from)
        .collect();
    text.trim_matches(|c: char| c == '\0' || c.is_ascii_whitespace())
        .to_string()
}

/// Number of registers occupied by a string of `length` characters.
pub const fn string_quantity(length: u16) -> u16 {
    length.div_ceil(2)
}

/// How the words at a register address are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// One register, unsigned 16-bit.
    Integer,
    /// Two registers, unsigned 32-bit.
    Long,
    /// Two registers, IEEE-754 single precision.
    Float,
    /// Packed ASCII string of `length` characters.
    Text { length: u16 },
}

impl Encoding {
    /// Number of consecutive registers this encoding spans.
    pub const fn quantity(&self) -> u16 {
        match self {
            Encoding::Integer => 1,
            Encoding::Long | Encoding::Float => 2,
            Encoding::Text { length } => string_quantity(*length),
        }
    }
}

/// A statically known register location together with its encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterRef {
    pub address: u16,
    pub encoding: Encoding,
}

impl RegisterRef {
    pub const fn integer(address: u16) -> Self {
        Self {
            address,
            encoding: Encoding::Integer,
        }
    }

    pub const fn long(address: u16) -> Self {
        Self {
            address,
            encoding: Encoding::Long,
        }
    }

    pub const fn float(address: u16) -> Self {
        Self {
            address,
            encoding: Encoding::Float,
        }
    }

    /// A string of `registers` registers, i.e. twice as many characters.
    pub const fn text(address: u16, registers: u16) -> Self {
        Self {
            address,
            encoding: Encoding::Text {
                length: registers * 2,
            },
        }
    }

    /// First address after the last register covered by this reference.
    pub const fn end(&self) -> u16 {
        self.address + self.encoding.quantity()
    }
}

/// A named field of a resource group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub register: RegisterRef,
}

impl Field {
    pub const fn new(name: &'static str, register: RegisterRef) -> Self {
        Self { name, register }
    }
}

/// A decoded register value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(u16),
    Long(u32),
    Float(f32),
    Text(String),
}

impl Value {
    /// Decodes `words` read from a register with the given `encoding`.
    ///
    /// `words` must hold exactly `encoding.quantity()` registers.
    pub fn decode(encoding: &Encoding, words: &[u16]) -> Self {
        match *encoding {
            Encoding::Integer => Value::Integer(decode_integer(words[0])),
            Encoding::Long => Value::Long(decode_long([words[0], words[1]])),
            Encoding::Float => Value::Float(decode_float([words[0], words[1]])),
            Encoding::Text { length } => Value::Text(decode_string(words, length as usize)),
        }
    }
}

/// Ordered set of decoded fields of one resource group.
///
/// Serializes as a JSON object, keeping the field order of the register table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    fields: Vec<(&'static str, Value)>,
}

impl Aggregate {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: &'static str, value: Value) {
        self.fields.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }
}

impl Serialize for Aggregate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
