//! Canonical RLP codec and transaction wire format for VeChain Thor.
//!
//! Layers, leaves first:
//! - [`rlp::kind`]: typed leaf codecs
//! - [`rlp`]: untyped canonical RLP
//! - [`rlp::profile`]: ordered field schemas over RLP
//! - [`transaction`]: body schemas and the transaction codec
//!
//! [`crypto`] holds the hash/recover primitives behind [`TxCrypto`], and
//! [`signer`] signs requests as origin or gas payer.
//!
//! Every operation is a pure function of its input; codecs and profiles
//! can be shared freely across threads.

pub mod config;
pub mod crypto;
pub mod rlp;
pub mod signer;
pub mod transaction;

pub use config::CodecConfig;
pub use crypto::{Blake2bSecp256k1, TxCrypto};
pub use signer::PrivateKeySigner;
pub use thor_tx_common::{Address, BlockRef, CodecError, Hash256};
pub use transaction::{
    Clause, Fee, Reserved, TransactionBody, TransactionCodec, TransactionRequest,
    TransactionRequestJson,
};

/// Encodes `tx` with the default codec.
pub fn encode(tx: &TransactionRequest) -> Result<Vec<u8>, CodecError> {
    TransactionCodec::new().encode(tx)
}

/// Decodes bytes with the default codec.
pub fn decode(encoded: &[u8]) -> Result<TransactionRequest, CodecError> {
    TransactionCodec::new().decode(encoded)
}
