//! Transaction wire format.
//!
//! This module provides:
//! - The typed request model (legacy and dynamic-fee, any signature state)
//! - The body schemas and their mapping onto typed requests
//! - The codec selecting a schema on encode and decode
//! - A JSON view of requests

mod body;
pub mod codec;
pub mod json;
pub mod model;
pub mod profiles;

pub use codec::{split_signature, TransactionCodec};
pub use json::{ClauseJson, ReservedJson, TransactionRequestJson};
pub use model::{Clause, Fee, Reserved, TransactionBody, TransactionRequest};
