//! Private-key signer for transaction requests.
//!
//! Signing follows the sponsorship protocol:
//! - the origin signs the signing hash of the body;
//! - the gas payer signs `hash(signing_hash ‖ beggar)`, where the beggar is
//!   the origin asking for sponsorship;
//! - once the signatures the sponsorship flag requires are present, they are
//!   joined into the full signature.
//!
//! # Security
//!
//! - Key material passed as hex is held in a zeroizing buffer
//! - `SigningKey` zeroizes its scalar on drop
//! - Nothing here logs keys or signatures

use k256::ecdsa::SigningKey;
use log::debug;
use thor_tx_common::{Address, CodecError};
use zeroize::Zeroizing;

use crate::crypto::{sign_hash, signing_key_address, TxCrypto};
use crate::transaction::{TransactionCodec, TransactionRequest};

/// Signs requests with a single secp256k1 key.
pub struct PrivateKeySigner {
    key: SigningKey,
    address: Address,
}

impl PrivateKeySigner {
    /// Creates a signer from a 32-byte secret scalar.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, CodecError> {
        let key = SigningKey::from_slice(secret)
            .map_err(|_| CodecError::signature("signer", "invalid private key"))?;
        let address = signing_key_address(&key);
        Ok(Self { key, address })
    }

    /// Creates a signer from a `0x`-prefixed hex secret.
    pub fn from_hex(secret: &str) -> Result<Self, CodecError> {
        let digits = secret.strip_prefix("0x").unwrap_or(secret);
        let bytes = Zeroizing::new(
            hex::decode(digits).map_err(|_| CodecError::signature("signer", "invalid private key"))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Address derived from the key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs `tx` in whichever role this key plays.
    ///
    /// With a beggar set to another address this key signs as gas payer,
    /// otherwise as origin. The full signature is assembled when complete.
    pub fn sign<C: TxCrypto>(
        &self,
        codec: &TransactionCodec<C>,
        tx: &TransactionRequest,
    ) -> Result<TransactionRequest, CodecError> {
        let partial = match tx.beggar {
            Some(beggar) if beggar != self.address => self.sign_as_gas_payer(codec, tx)?,
            _ => self.sign_as_origin(codec, tx)?,
        };
        codec.finalize_signatures(partial)
    }

    /// Adds the origin signature; sponsored requests also record the beggar.
    pub fn sign_as_origin<C: TxCrypto>(
        &self,
        codec: &TransactionCodec<C>,
        tx: &TransactionRequest,
    ) -> Result<TransactionRequest, CodecError> {
        ensure_unsigned(tx)?;
        if let Some(beggar) = tx.beggar {
            if beggar != self.address {
                return Err(CodecError::transaction(format!(
                    "beggar {beggar} is not the signing origin {}",
                    self.address
                )));
            }
        }

        let hash = codec.signing_hash(tx)?;
        let signature = sign_hash(&self.key, &hash)?;

        let mut signed = tx.clone();
        signed.origin_signature = Some(signature.to_bytes());
        if tx.is_intended_to_be_sponsored() {
            signed.beggar = Some(self.address);
        }
        debug!("signed as origin {}", self.address);
        Ok(signed)
    }

    /// Adds the gas-payer signature for the request's beggar.
    pub fn sign_as_gas_payer<C: TxCrypto>(
        &self,
        codec: &TransactionCodec<C>,
        tx: &TransactionRequest,
    ) -> Result<TransactionRequest, CodecError> {
        ensure_unsigned(tx)?;
        if !tx.is_intended_to_be_sponsored() {
            return Err(CodecError::transaction(
                "request is not intended to be sponsored",
            ));
        }
        let beggar = tx
            .beggar
            .ok_or_else(|| CodecError::transaction("gas payer needs the beggar address"))?;

        let hash = codec.gas_payer_signing_hash(tx, &beggar)?;
        let signature = sign_hash(&self.key, &hash)?;

        let mut signed = tx.clone();
        signed.gas_payer_signature = Some(signature.to_bytes());
        debug!("signed as gas payer {} for {beggar}", self.address);
        Ok(signed)
    }
}

impl core::fmt::Debug for PrivateKeySigner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrivateKeySigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

fn ensure_unsigned(tx: &TransactionRequest) -> Result<(), CodecError> {
    if tx.signature.is_some() {
        return Err(CodecError::transaction("request is already signed"));
    }
    Ok(())
}
