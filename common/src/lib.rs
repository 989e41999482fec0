//! Common types for the Thor transaction codec.
//!
//! This crate provides the value types and the error type shared by the
//! codec and by code that builds or consumes transactions.
//!
//! # Security Note
//!
//! Values of these types frequently originate from the network. Parsing
//! validates shape (hex digits, byte lengths) but carries no semantic
//! checks; those belong to the codec.

pub mod error;
pub mod types;

pub use error::CodecError;
pub use types::*;
