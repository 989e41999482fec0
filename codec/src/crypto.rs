//! Cryptographic primitives used by the transaction codec.
//!
//! The codec only needs two operations: a 256-bit hash over byte strings
//! and recovery of a signer address from a hash and a 65-byte signature.
//! They sit behind [`TxCrypto`] so the codec logic does not depend on a
//! particular backend.
//!
//! # Security
//!
//! - Recovery accepts recovery ids 0 and 1 only; high-S signatures are
//!   recovered through their low-S twin
//! - Private keys never pass through this trait

use k256::{
    ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
    PublicKey,
};
use thor_tx_common::{Address, CodecError, Hash256, Signature, SIGNATURE_LENGTH};
use tiny_keccak::{Hasher as KeccakHasher, Keccak};

/// Hash and signer recovery as consumed by the codec.
pub trait TxCrypto: Send + Sync {
    /// Hashes the concatenation of `parts`.
    fn hash(&self, parts: &[&[u8]]) -> Hash256;

    /// Recovers the address that produced `signature` over `hash`.
    fn recover_address(
        &self,
        hash: &Hash256,
        signature: &[u8; SIGNATURE_LENGTH],
    ) -> Result<Address, CodecError>;
}

/// BLAKE2b-256 hashing with secp256k1 recovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake2bSecp256k1;

impl TxCrypto for Blake2bSecp256k1 {
    fn hash(&self, parts: &[&[u8]]) -> Hash256 {
        blake2b256(parts)
    }

    fn recover_address(
        &self,
        hash: &Hash256,
        signature: &[u8; SIGNATURE_LENGTH],
    ) -> Result<Address, CodecError> {
        recover_address(hash, signature)
    }
}

// =============================================================================
// Hashing
// =============================================================================

/// BLAKE2b with a 32-byte digest over the concatenation of `parts`.
pub fn blake2b256(parts: &[&[u8]]) -> Hash256 {
    let mut state = blake2b_simd::Params::new().hash_length(32).to_state();
    for part in parts {
        state.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(state.finalize().as_bytes());
    output
}

/// Keccak256, used only to derive addresses from public keys.
pub fn keccak256(data: &[u8]) -> Hash256 {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

// =============================================================================
// Keys and addresses
// =============================================================================

/// Address = keccak256(pubkey[1..])[12..32]
/// (skip the 0x04 prefix of the uncompressed key, keep the last 20 bytes)
pub fn public_key_to_address(pubkey: &PublicKey) -> Address {
    let encoded = pubkey.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Address::new(address)
}

/// Address of the key that signs with `signing_key`.
pub fn signing_key_address(signing_key: &SigningKey) -> Address {
    public_key_to_address(&PublicKey::from(signing_key.verifying_key()))
}

// =============================================================================
// Signing and recovery
// =============================================================================

/// Signs a prehashed message, producing `r || s || v` with `v` in {0, 1}.
///
/// k256 always produces low-S signatures.
pub fn sign_hash(signing_key: &SigningKey, hash: &Hash256) -> Result<Signature, CodecError> {
    let (sig, recid) = signing_key
        .sign_prehash_recoverable(hash)
        .map_err(|e| CodecError::signature("sign", e.to_string()))?;

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&sig.r().to_bytes());
    s.copy_from_slice(&sig.s().to_bytes());

    Ok(Signature {
        r,
        s,
        v: recid.to_byte(),
    })
}

/// Recovers the signer address from a prehashed message and `r || s || v`.
pub fn recover_address(
    hash: &Hash256,
    signature: &[u8; SIGNATURE_LENGTH],
) -> Result<Address, CodecError> {
    let parsed = Signature::from_bytes(signature);
    let recid = RecoveryId::from_byte(parsed.v)
        .filter(|id| !id.is_x_reduced())
        .ok_or_else(|| CodecError::signature("recover", format!("invalid recovery id {}", parsed.v)))?;

    let sig = K256Signature::from_slice(&signature[..64])
        .map_err(|e| CodecError::signature("recover", e.to_string()))?;
    // A high-S signature recovers as its low-S twin with flipped y parity
    let (sig, recid) = match sig.normalize_s() {
        Some(low) => (low, RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced())),
        None => (sig, recid),
    };

    let key = VerifyingKey::recover_from_prehash(hash, &sig, recid)
        .map_err(|e| CodecError::signature("recover", e.to_string()))?;
    Ok(public_key_to_address(&PublicKey::from(&key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn test_key() -> SigningKey {
        SigningKey::from_slice(&hex!(
            "7582be841ca040aa940fff6c05773129e135623e41acce3e0b8ba520dc1ae26a"
        ))
        .unwrap()
    }

    #[test]
    fn test_blake2b256_empty() {
        assert_eq!(
            blake2b256(&[]),
            hex!("0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8")
        );
    }

    #[test]
    fn test_blake2b256_concatenates_parts() {
        assert_eq!(
            blake2b256(&[b"ab".as_slice(), b"cd".as_slice()]),
            blake2b256(&[b"abcd".as_slice()])
        );
        assert_ne!(blake2b256(&[b"abcd".as_slice()]), blake2b256(&[b"abce".as_slice()]));
    }

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            keccak256(b""),
            hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }

    #[test]
    fn test_sign_then_recover() {
        let key = test_key();
        let hash = blake2b256(&[b"thor".as_slice()]);
        let sig = sign_hash(&key, &hash).unwrap();
        assert!(sig.v <= 1);
        let recovered = recover_address(&hash, &sig.to_bytes()).unwrap();
        assert_eq!(recovered, signing_key_address(&key));
    }

    #[test]
    fn test_recover_other_hash_gives_other_address() {
        let key = test_key();
        let sig = sign_hash(&key, &blake2b256(&[b"one".as_slice()])).unwrap();
        let other = recover_address(&blake2b256(&[b"two".as_slice()]), &sig.to_bytes());
        // Either recovery fails or it yields someone else
        if let Ok(addr) = other {
            assert_ne!(addr, signing_key_address(&key));
        }
    }

    #[test]
    fn test_recover_rejects_bad_recovery_id() {
        let key = test_key();
        let hash = blake2b256(&[b"thor".as_slice()]);
        let mut raw = sign_hash(&key, &hash).unwrap().to_bytes();
        raw[64] = 27;
        let err = recover_address(&hash, &raw).unwrap_err();
        assert!(matches!(err, CodecError::InvalidSignature { .. }));
    }

    #[test]
    fn test_recover_accepts_high_s() {
        let key = test_key();
        let hash = blake2b256(&[b"thor".as_slice()]);
        let raw = sign_hash(&key, &hash).unwrap().to_bytes();
        let high = high_s_twin(&raw);
        assert_ne!(high, raw);
        assert_eq!(recover_address(&hash, &high).unwrap(), signing_key_address(&key));
    }

    /// Same signature with `s` replaced by `n - s` and the parity flipped.
    fn high_s_twin(raw: &[u8; SIGNATURE_LENGTH]) -> [u8; SIGNATURE_LENGTH] {
        let sig = K256Signature::from_slice(&raw[..64]).unwrap();
        let high_s = -*sig.s();
        let mut out = *raw;
        out[32..64].copy_from_slice(&high_s.to_bytes());
        out[64] ^= 1;
        out
    }

    #[test]
    fn test_recover_rejects_zero_signature() {
        let hash = blake2b256(&[b"thor".as_slice()]);
        assert!(recover_address(&hash, &[0u8; SIGNATURE_LENGTH]).is_err());
    }

    #[test]
    fn test_trait_object_dispatch() {
        let crypto: &dyn TxCrypto = &Blake2bSecp256k1;
        assert_eq!(crypto.hash(&[b"x".as_slice()]), blake2b256(&[b"x".as_slice()]));
    }
}
