//! Core value types shared by the codec and its callers.
//!
//! Hex renderings are lowercase and `0x`-prefixed. Parsing accepts either
//! case but always requires the prefix.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CodecError;

/// Length in bytes of a single secp256k1 signature (`r ‖ s ‖ v`).
pub const SIGNATURE_LENGTH: usize = 65;

/// Length in bytes of an account address.
pub const ADDRESS_LENGTH: usize = 20;

/// Length in bytes of a block reference.
pub const BLOCK_REF_LENGTH: usize = 8;

/// Wire prefix marking a dynamic-fee transaction.
pub const DYNAMIC_FEE_PREFIX: u8 = 0x51;

/// Byte stored in `reserved` to flag a transaction as intended to be sponsored.
pub const SPONSORSHIP_FLAG: u8 = 0x01;

/// Maximum accepted encoded transaction size (64KB).
pub const MAX_TX_SIZE: usize = 65536;

/// Maximum RLP nesting depth.
pub const MAX_RLP_DEPTH: usize = 16;

/// BLAKE2b-256 digest (32 bytes).
pub type Hash256 = [u8; 32];

// =============================================================================
// Hex helpers
// =============================================================================

/// Renders bytes as a lowercase `0x`-prefixed hex string.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parses a `0x`-prefixed hex string with an even number of digits.
pub fn parse_hex(context: &str, text: &str) -> Result<Vec<u8>, CodecError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .ok_or_else(|| CodecError::field_encoding(context, text, "missing 0x prefix"))?;
    if digits.len() % 2 != 0 {
        return Err(CodecError::field_encoding(
            context,
            text,
            "odd number of hex digits",
        ));
    }
    hex::decode(digits)
        .map_err(|e| CodecError::field_encoding(context, text, format!("not hex: {e}")))
}

/// Parses a `0x`-prefixed hex string of exactly `N` bytes.
pub fn parse_fixed_hex<const N: usize>(context: &str, text: &str) -> Result<[u8; N], CodecError> {
    let bytes = parse_hex(context, text)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        CodecError::field_encoding(
            context,
            text,
            format!("expected {N} bytes, got {}", bytes.len()),
        )
    })
}

// =============================================================================
// Address
// =============================================================================

/// Account address (20 bytes).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; ADDRESS_LENGTH]);

impl Address {
    /// Creates an address from its raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a slice of exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; ADDRESS_LENGTH]>::try_from(bytes).ok().map(Self)
    }

    /// Returns the raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed_hex::<ADDRESS_LENGTH>("address", s).map(Self)
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Block reference
// =============================================================================

/// Reference to a recent block (8 bytes): the first four bytes are the block
/// number, the rest is a prefix of the block id.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BlockRef(pub [u8; BLOCK_REF_LENGTH]);

impl BlockRef {
    /// Creates a block reference from its raw bytes.
    pub const fn new(bytes: [u8; BLOCK_REF_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Builds a block reference from a block number, leaving the id part zeroed.
    pub fn from_number(number: u32) -> Self {
        let mut bytes = [0u8; BLOCK_REF_LENGTH];
        bytes[..4].copy_from_slice(&number.to_be_bytes());
        Self(bytes)
    }

    /// Returns the block number encoded in the first four bytes.
    pub fn number(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Returns the raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; BLOCK_REF_LENGTH] {
        &self.0
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hex(&self.0))
    }
}

impl fmt::Debug for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockRef({self})")
    }
}

impl FromStr for BlockRef {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed_hex::<BLOCK_REF_LENGTH>("blockRef", s).map(Self)
    }
}

// =============================================================================
// Signature
// =============================================================================

/// secp256k1 signature components as carried on the wire.
///
/// `v` is the raw recovery id (0 or 1), not an Ethereum-style offset value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signature {
    /// R component (32 bytes, big-endian).
    pub r: [u8; 32],
    /// S component (32 bytes, big-endian, low-S normalized).
    pub s: [u8; 32],
    /// Recovery identifier.
    pub v: u8,
}

impl Signature {
    /// Returns the signature as a 65-byte array (r || s || v).
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[0..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    /// Creates a signature from a 65-byte array (r || s || v).
    pub fn from_bytes(bytes: &[u8; SIGNATURE_LENGTH]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[0..32]);
        s.copy_from_slice(&bytes[32..64]);
        Self { r, s, v: bytes[64] }
    }

    /// Creates a signature from a slice, which must be exactly 65 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <&[u8; SIGNATURE_LENGTH]>::try_from(bytes)
            .ok()
            .map(Self::from_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_address_roundtrip_text() {
        let addr: Address = "0x7567D83b7b8d80ADdCb281A71d54Fc7B3364ffed".parse().unwrap();
        assert_eq!(addr.0, hex!("7567d83b7b8d80addcb281a71d54fc7b3364ffed"));
        assert_eq!(
            addr.to_string(),
            "0x7567d83b7b8d80addcb281a71d54fc7b3364ffed"
        );
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert!("0x7567d83b".parse::<Address>().is_err());
        assert!("7567d83b7b8d80addcb281a71d54fc7b3364ffed".parse::<Address>().is_err());
    }

    #[test]
    fn test_address_serde_as_string() {
        let addr = Address::new([0x11; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x1111111111111111111111111111111111111111\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_block_ref_number() {
        let block_ref = BlockRef::from_number(0x00aa_bbcc);
        assert_eq!(block_ref.number(), 0x00aa_bbcc);
        assert_eq!(block_ref.to_string(), "0x00aabbcc00000000");
    }

    #[test]
    fn test_parse_hex_rules() {
        assert_eq!(parse_hex("data", "0x").unwrap(), Vec::<u8>::new());
        assert_eq!(parse_hex("data", "0xABcd").unwrap(), vec![0xab, 0xcd]);
        assert!(parse_hex("data", "0xabc").is_err());
        assert!(parse_hex("data", "abcd").is_err());
        assert!(parse_hex("data", "0xzz").is_err());
    }

    #[test]
    fn test_signature_bytes_layout() {
        let mut raw = [0u8; SIGNATURE_LENGTH];
        raw[0] = 0xaa;
        raw[32] = 0xbb;
        raw[64] = 1;
        let sig = Signature::from_bytes(&raw);
        assert_eq!(sig.r[0], 0xaa);
        assert_eq!(sig.s[0], 0xbb);
        assert_eq!(sig.v, 1);
        assert_eq!(sig.to_bytes(), raw);
        assert!(Signature::from_slice(&raw[..64]).is_none());
    }
}
