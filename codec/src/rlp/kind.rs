//! Typed leaf codecs.
//!
//! A [`Kind`] converts one [`Value`] to the byte string stored in an RLP
//! leaf and back. Every kind enforces a canonical form: decode rejects any
//! byte string that encode would never have produced.

use core::fmt;
use std::collections::BTreeMap;

use num_bigint::BigUint;
use num_traits::{Num, Zero};
use thor_tx_common::{parse_hex, to_hex, CodecError};

/// Named field values of a decoded or to-be-encoded struct.
pub type Record = BTreeMap<String, Value>;

/// A dynamically typed value flowing through the schema layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Non-negative integer.
    Numeric(BigUint),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Text: `0x`-prefixed hex for blob kinds, or decimal/hex for numerics.
    String(String),
    /// Absent optional value.
    Null,
    /// Sequence of values (list fields).
    List(Vec<Value>),
    /// Nested struct (items of a list field).
    Struct(Record),
}

impl Value {
    /// Wraps an integer.
    pub fn numeric(n: impl Into<BigUint>) -> Self {
        Value::Numeric(n.into())
    }

    /// Renders bytes as a `0x`-prefixed hex string value.
    pub fn hex(bytes: &[u8]) -> Self {
        Value::String(to_hex(bytes))
    }

    /// Renders optional bytes as hex, or [`Value::Null`].
    pub fn optional_hex(bytes: Option<&[u8]>) -> Self {
        bytes.map_or(Value::Null, Value::hex)
    }

    pub fn as_numeric(&self) -> Option<&BigUint> {
        match self {
            Value::Numeric(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Record> {
        match self {
            Value::Struct(record) => Some(record),
            _ => None,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short rendering used in error messages.
    fn describe(&self) -> String {
        match self {
            Value::Numeric(n) => n.to_string(),
            Value::Bytes(b) => to_hex(b),
            Value::String(s) => format!("{s:?}"),
            Value::Null => "null".to_owned(),
            Value::List(items) => format!("list of {}", items.len()),
            Value::Struct(record) => format!("struct of {}", record.len()),
        }
    }
}

/// Leaf codec selected when a profile is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Non-negative integer as minimal big-endian bytes, at most `max_bytes`.
    Numeric { max_bytes: usize },
    /// Raw bytes, untransformed.
    Buffer,
    /// Variable-length hex string.
    HexBlob,
    /// Hex string of exactly `bytes` bytes.
    FixedHexBlob { bytes: usize },
    /// `null` as the empty string, otherwise exactly `bytes` bytes.
    OptionalFixedHexBlob { bytes: usize },
    /// `bytes`-byte value stored with leading zero bytes trimmed.
    CompactFixedHexBlob { bytes: usize },
}

impl Kind {
    /// # Panics
    ///
    /// Panics if `max_bytes` is zero.
    pub const fn numeric(max_bytes: usize) -> Self {
        assert!(max_bytes > 0, "numeric kind needs a positive byte width");
        Kind::Numeric { max_bytes }
    }

    /// # Panics
    ///
    /// Panics if `bytes` is zero.
    pub const fn fixed_hex_blob(bytes: usize) -> Self {
        assert!(bytes > 0, "fixed blob kind needs a positive byte width");
        Kind::FixedHexBlob { bytes }
    }

    /// # Panics
    ///
    /// Panics if `bytes` is zero.
    pub const fn optional_fixed_hex_blob(bytes: usize) -> Self {
        assert!(bytes > 0, "fixed blob kind needs a positive byte width");
        Kind::OptionalFixedHexBlob { bytes }
    }

    /// # Panics
    ///
    /// Panics if `bytes` is zero.
    pub const fn compact_fixed_hex_blob(bytes: usize) -> Self {
        assert!(bytes > 0, "fixed blob kind needs a positive byte width");
        Kind::CompactFixedHexBlob { bytes }
    }

    /// Converts `value` into the byte string stored in the RLP leaf.
    pub fn encode(&self, value: &Value, context: &str) -> Result<Vec<u8>, CodecError> {
        match *self {
            Kind::Numeric { max_bytes } => {
                let n = numeric_from_value(value, context)?;
                let bytes = if n.is_zero() {
                    Vec::new()
                } else {
                    n.to_bytes_be()
                };
                if bytes.len() > max_bytes {
                    return Err(CodecError::field_encoding(
                        context,
                        value.describe(),
                        format!("exceeds {max_bytes} bytes"),
                    ));
                }
                Ok(bytes)
            }
            Kind::Buffer => value.as_bytes().map(<[u8]>::to_vec).ok_or_else(|| {
                CodecError::field_encoding(context, value.describe(), "expected raw bytes")
            }),
            Kind::HexBlob => match value {
                // "" and "0x" both stand for no data
                Value::String(text) if text.is_empty() => Ok(Vec::new()),
                _ => hex_from_value(value, context),
            },
            Kind::FixedHexBlob { bytes } => {
                let data = hex_from_value(value, context)?;
                expect_len(&data, bytes, value, context)?;
                Ok(data)
            }
            Kind::OptionalFixedHexBlob { bytes } => {
                if value.is_null() {
                    return Ok(Vec::new());
                }
                let data = hex_from_value(value, context)?;
                expect_len(&data, bytes, value, context)?;
                Ok(data)
            }
            Kind::CompactFixedHexBlob { bytes } => {
                let data = hex_from_value(value, context)?;
                expect_len(&data, bytes, value, context)?;
                let start = data.iter().position(|&b| b != 0).unwrap_or(data.len());
                Ok(data[start..].to_vec())
            }
        }
    }

    /// Converts an RLP leaf back into a value, enforcing canonical form.
    pub fn decode(&self, data: &[u8], context: &str) -> Result<Value, CodecError> {
        match *self {
            Kind::Numeric { max_bytes } => {
                if data.first() == Some(&0) {
                    return Err(CodecError::field_decoding(
                        context,
                        data,
                        "non-canonical numeric (leading zero)",
                    ));
                }
                if data.len() > max_bytes {
                    return Err(CodecError::field_decoding(
                        context,
                        data,
                        format!("exceeds {max_bytes} bytes"),
                    ));
                }
                Ok(Value::Numeric(BigUint::from_bytes_be(data)))
            }
            Kind::Buffer => Ok(Value::Bytes(data.to_vec())),
            Kind::HexBlob => Ok(Value::hex(data)),
            Kind::FixedHexBlob { bytes } => {
                decoded_len(data, bytes, context)?;
                Ok(Value::hex(data))
            }
            Kind::OptionalFixedHexBlob { bytes } => {
                if data.is_empty() {
                    return Ok(Value::Null);
                }
                decoded_len(data, bytes, context)?;
                Ok(Value::hex(data))
            }
            Kind::CompactFixedHexBlob { bytes } => {
                if data.first() == Some(&0) {
                    return Err(CodecError::field_decoding(
                        context,
                        data,
                        "non-canonical compact blob (leading zero)",
                    ));
                }
                if data.len() > bytes {
                    return Err(CodecError::field_decoding(
                        context,
                        data,
                        format!("exceeds {bytes} bytes"),
                    ));
                }
                let mut padded = vec![0u8; bytes - data.len()];
                padded.extend_from_slice(data);
                Ok(Value::hex(&padded))
            }
        }
    }

    /// Checks that `value` satisfies this kind without keeping the bytes.
    pub fn validate(&self, value: &Value, context: &str) -> Result<(), CodecError> {
        self.encode(value, context).map(drop)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Numeric { max_bytes } => write!(f, "numeric({max_bytes})"),
            Kind::Buffer => f.write_str("buffer"),
            Kind::HexBlob => f.write_str("hex blob"),
            Kind::FixedHexBlob { bytes } => write!(f, "fixed hex blob({bytes})"),
            Kind::OptionalFixedHexBlob { bytes } => write!(f, "optional fixed hex blob({bytes})"),
            Kind::CompactFixedHexBlob { bytes } => write!(f, "compact fixed hex blob({bytes})"),
        }
    }
}

/// Accepts an integer, or text in decimal or `0x` hex.
fn numeric_from_value(value: &Value, context: &str) -> Result<BigUint, CodecError> {
    match value {
        Value::Numeric(n) => Ok(n.clone()),
        Value::String(text) => {
            let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                Some(digits) if !digits.is_empty() => BigUint::from_str_radix(digits, 16).ok(),
                Some(_) => None,
                None if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) => {
                    BigUint::from_str_radix(text, 10).ok()
                }
                None => None,
            };
            parsed.ok_or_else(|| {
                CodecError::field_encoding(context, value.describe(), "not a non-negative integer")
            })
        }
        other => Err(CodecError::field_encoding(
            context,
            other.describe(),
            "expected a number",
        )),
    }
}

fn hex_from_value(value: &Value, context: &str) -> Result<Vec<u8>, CodecError> {
    match value {
        Value::String(text) => parse_hex(context, text),
        other => Err(CodecError::field_encoding(
            context,
            other.describe(),
            "expected a hex string",
        )),
    }
}

fn expect_len(data: &[u8], expected: usize, value: &Value, context: &str) -> Result<(), CodecError> {
    if data.len() != expected {
        return Err(CodecError::field_encoding(
            context,
            value.describe(),
            format!("expected {expected} bytes, got {}", data.len()),
        ));
    }
    Ok(())
}

fn decoded_len(data: &[u8], expected: usize, context: &str) -> Result<(), CodecError> {
    if data.len() != expected {
        return Err(CodecError::field_decoding(
            context,
            data,
            format!("expected {expected} bytes, got {}", data.len()),
        ));
    }
    Ok(())
}
