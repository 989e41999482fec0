//! RLP (Recursive Length Prefix) core and the schema layer built on it.
//!
//! The core in this file is untyped: it turns a tree of byte strings and
//! lists into canonical bytes and back. [`kind`] adds typed leaf codecs and
//! [`profile`] maps ordered field schemas onto item trees.
//!
//! # Encoding rules
//!
//! - Single byte [0x00, 0x7f]: itself
//! - String [0x80, 0xb7]: 0x80 + len, then data
//! - String [0xb8, 0xbf]: 0xb7 + len_of_len, then len, then data
//! - List [0xc0, 0xf7]: 0xc0 + len, then items
//! - List [0xf8, 0xff]: 0xf7 + len_of_len, then len, then items
//!
//! # Security
//!
//! - Validates all length fields before access
//! - Rejects non-canonical encodings
//! - Bounded recursion depth (16 by default)
//! - Allocation bounded by the declared lengths, which are checked against
//!   the remaining input first

pub mod kind;
pub mod profile;

use thiserror::Error;
use thor_tx_common::{CodecError, MAX_RLP_DEPTH};

/// RLP decoding errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RlpError {
    /// Input is empty when data expected.
    #[error("empty input")]
    EmptyInput,
    /// Input too short for declared length.
    #[error("input shorter than declared length")]
    UnexpectedEof,
    /// Non-canonical encoding (leading zeros in length, long form for short payload).
    #[error("non-canonical length prefix")]
    NonCanonical,
    /// Single byte should be encoded as itself.
    #[error("single byte below 0x80 wrapped in a string prefix")]
    SingleByteMismatch,
    /// Length field is too large.
    #[error("length field overflows")]
    LengthOverflow,
    /// Exceeded maximum nesting depth.
    #[error("nesting deeper than allowed")]
    TooDeep,
    /// Expected list but got string.
    #[error("expected a list, found a byte string")]
    ExpectedList,
    /// Expected string but got list.
    #[error("expected a byte string, found a list")]
    ExpectedString,
    /// Extra data after RLP item.
    #[error("trailing bytes after top-level item")]
    TrailingData,
}

impl RlpError {
    /// Lifts this error into the codec error space at `context`.
    pub fn at(self, context: impl Into<String>) -> CodecError {
        CodecError::encoding(context, self.to_string())
    }
}

impl From<RlpError> for CodecError {
    fn from(e: RlpError) -> Self {
        e.at("rlp")
    }
}

/// An RLP item: a byte string or a list of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpItem {
    /// A byte string (may be empty).
    Bytes(Vec<u8>),
    /// A list of items.
    List(Vec<RlpItem>),
}

impl RlpItem {
    /// Returns true if this is a byte string item.
    #[inline]
    pub fn is_bytes(&self) -> bool {
        matches!(self, RlpItem::Bytes(_))
    }

    /// Returns true if this is a list item.
    #[inline]
    pub fn is_list(&self) -> bool {
        matches!(self, RlpItem::List(_))
    }

    /// Returns the string data if this is a byte string item.
    pub fn as_bytes(&self) -> Result<&[u8], RlpError> {
        match self {
            RlpItem::Bytes(data) => Ok(data),
            RlpItem::List(_) => Err(RlpError::ExpectedString),
        }
    }

    /// Returns the list items if this is a list item.
    pub fn as_list(&self) -> Result<&[RlpItem], RlpError> {
        match self {
            RlpItem::List(items) => Ok(items),
            RlpItem::Bytes(_) => Err(RlpError::ExpectedList),
        }
    }

    /// Consumes the item, returning its children if it is a list.
    pub fn into_list(self) -> Result<Vec<RlpItem>, RlpError> {
        match self {
            RlpItem::List(items) => Ok(items),
            RlpItem::Bytes(_) => Err(RlpError::ExpectedList),
        }
    }
}

impl From<Vec<u8>> for RlpItem {
    fn from(data: Vec<u8>) -> Self {
        RlpItem::Bytes(data)
    }
}

impl From<&[u8]> for RlpItem {
    fn from(data: &[u8]) -> Self {
        RlpItem::Bytes(data.to_vec())
    }
}

impl From<Vec<RlpItem>> for RlpItem {
    fn from(items: Vec<RlpItem>) -> Self {
        RlpItem::List(items)
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decodes one RLP item from the front of `input`, returning the remainder.
pub fn decode(input: &[u8]) -> Result<(RlpItem, &[u8]), RlpError> {
    decode_internal(input, 0, MAX_RLP_DEPTH)
}

/// Decodes a complete RLP item, rejecting trailing data.
pub fn decode_exact(input: &[u8]) -> Result<RlpItem, RlpError> {
    decode_exact_with_depth(input, MAX_RLP_DEPTH)
}

/// Decodes a complete RLP item with a caller-chosen nesting bound.
pub fn decode_exact_with_depth(input: &[u8], max_depth: usize) -> Result<RlpItem, RlpError> {
    let (item, rest) = decode_internal(input, 0, max_depth)?;
    if !rest.is_empty() {
        return Err(RlpError::TrailingData);
    }
    Ok(item)
}

/// Internal decode with depth tracking.
fn decode_internal(
    input: &[u8],
    depth: usize,
    max_depth: usize,
) -> Result<(RlpItem, &[u8]), RlpError> {
    if depth > max_depth {
        return Err(RlpError::TooDeep);
    }

    let (&first, _) = input.split_first().ok_or(RlpError::EmptyInput)?;

    match first {
        // Single byte
        0x00..=0x7f => Ok((RlpItem::Bytes(vec![first]), &input[1..])),

        // Short string (0-55 bytes)
        0x80..=0xb7 => {
            let len = (first - 0x80) as usize;
            let (data, rest) = take(&input[1..], len)?;

            if len == 1 && data[0] < 0x80 {
                return Err(RlpError::SingleByteMismatch);
            }

            Ok((RlpItem::Bytes(data.to_vec()), rest))
        }

        // Long string (56+ bytes)
        0xb8..=0xbf => {
            let (len, body) = long_length(&input[1..], (first - 0xb7) as usize)?;
            let (data, rest) = take(body, len)?;
            Ok((RlpItem::Bytes(data.to_vec()), rest))
        }

        // Short list (0-55 bytes total)
        0xc0..=0xf7 => {
            let len = (first - 0xc0) as usize;
            let (payload, rest) = take(&input[1..], len)?;
            let items = decode_list_items(payload, depth + 1, max_depth)?;
            Ok((RlpItem::List(items), rest))
        }

        // Long list (56+ bytes total)
        0xf8..=0xff => {
            let (len, body) = long_length(&input[1..], (first - 0xf7) as usize)?;
            let (payload, rest) = take(body, len)?;
            let items = decode_list_items(payload, depth + 1, max_depth)?;
            Ok((RlpItem::List(items), rest))
        }
    }
}

/// Splits `len` bytes off the front of `input`.
fn take(input: &[u8], len: usize) -> Result<(&[u8], &[u8]), RlpError> {
    if input.len() < len {
        return Err(RlpError::UnexpectedEof);
    }
    Ok(input.split_at(len))
}

/// Reads a long-form length field of `len_of_len` bytes.
fn long_length(input: &[u8], len_of_len: usize) -> Result<(usize, &[u8]), RlpError> {
    let (len_bytes, rest) = take(input, len_of_len)?;

    // Leading zero in the length itself
    if len_bytes[0] == 0 {
        return Err(RlpError::NonCanonical);
    }

    let len = decode_length(len_bytes)?;

    // Lengths below 56 must use the short form
    if len < 56 {
        return Err(RlpError::NonCanonical);
    }

    Ok((len, rest))
}

/// Decodes a big-endian length value.
fn decode_length(bytes: &[u8]) -> Result<usize, RlpError> {
    if bytes.len() > core::mem::size_of::<usize>() {
        return Err(RlpError::LengthOverflow);
    }

    let mut len = 0usize;
    for &byte in bytes {
        len = len.checked_shl(8).ok_or(RlpError::LengthOverflow)?;
        len = len.checked_add(byte as usize).ok_or(RlpError::LengthOverflow)?;
    }

    Ok(len)
}

/// Decodes all items in a list payload.
fn decode_list_items(
    mut data: &[u8],
    depth: usize,
    max_depth: usize,
) -> Result<Vec<RlpItem>, RlpError> {
    let mut items = Vec::new();

    while !data.is_empty() {
        let (item, rest) = decode_internal(data, depth, max_depth)?;
        items.push(item);
        data = rest;
    }

    Ok(items)
}

// =============================================================================
// Encoding
// =============================================================================

/// Encodes an item tree as canonical RLP.
pub fn encode(item: &RlpItem) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(item, &mut out);
    out
}

fn encode_into(item: &RlpItem, out: &mut Vec<u8>) {
    match item {
        RlpItem::Bytes(data) => out.extend_from_slice(&encode_bytes(data)),
        RlpItem::List(items) => {
            let mut payload = Vec::new();
            for child in items {
                encode_into(child, &mut payload);
            }
            out.extend_from_slice(&encode_list(&payload));
        }
    }
}

/// Encodes a byte slice as RLP.
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }
    with_prefix(0x80, 0xb7, data)
}

/// Encodes a list of already-encoded items as RLP.
pub fn encode_list(payload: &[u8]) -> Vec<u8> {
    with_prefix(0xc0, 0xf7, payload)
}

fn with_prefix(short_base: u8, long_base: u8, payload: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(payload.len() + 9);
    if payload.len() <= 55 {
        result.push(short_base + payload.len() as u8);
    } else {
        let len_bytes = encode_length_bytes(payload.len());
        result.push(long_base + len_bytes.len() as u8);
        result.extend_from_slice(&len_bytes);
    }
    result.extend_from_slice(payload);
    result
}

/// Encodes a length as minimal big-endian bytes.
fn encode_length_bytes(len: usize) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}
