//! Transaction codec: profile selection, signature split and signer recovery.
//!
//! # Decode
//!
//! 1. A leading `0x51` marks a dynamic-fee transaction and is stripped.
//! 2. The top-level item count selects the profile: `u` items is unsigned,
//!    `u + 1` signed, `u + 3` unsigned with partial sponsorship state.
//!    Anything else is rejected.
//! 3. A signed request has its signature split into origin and gas-payer
//!    parts, and both signers are recovered.
//!
//! # Security
//!
//! Decode input is untrusted. Nothing is partially accepted: any kind,
//! structure, or signature failure rejects the whole request.

use log::{debug, warn};
use thor_tx_common::{Address, CodecError, Hash256, DYNAMIC_FEE_PREFIX, SIGNATURE_LENGTH};

use super::body::{
    add_partial_state, add_signature, apply_partial_state, body_to_record, record_signature,
    record_to_body,
};
use super::model::TransactionRequest;
use super::profiles::{profiles, Shape, TX_PROFILE_NAME};
use crate::config::CodecConfig;
use crate::crypto::{Blake2bSecp256k1, TxCrypto};
use crate::rlp::profile::Profiler;

/// Encodes and decodes transaction requests.
#[derive(Debug, Clone)]
pub struct TransactionCodec<C = Blake2bSecp256k1> {
    config: CodecConfig,
    profiler: Profiler,
    crypto: C,
}

impl TransactionCodec {
    /// Codec with default limits and BLAKE2b/secp256k1 primitives.
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    pub fn with_config(config: CodecConfig) -> Self {
        Self::with_crypto(config, Blake2bSecp256k1)
    }
}

impl Default for TransactionCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: TxCrypto> TransactionCodec<C> {
    /// Codec using custom hash/recover primitives.
    pub fn with_crypto(config: CodecConfig, crypto: C) -> Self {
        Self {
            config,
            profiler: Profiler::with_max_depth(config.max_depth),
            crypto,
        }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn crypto(&self) -> &C {
        &self.crypto
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encodes `tx` for broadcast or storage.
    ///
    /// The profile follows the signature state: the signed profile when a
    /// full signature is present, the with-state profile when only partial
    /// sponsorship state is, the to-hash profile otherwise.
    pub fn encode(&self, tx: &TransactionRequest) -> Result<Vec<u8>, CodecError> {
        tx.body.validate()?;
        let set = profiles(tx.is_dynamic_fee());
        let mut record = body_to_record(&tx.body)?;

        let profile = if let Some(signature) = &tx.signature {
            if signature.len() != tx.expected_signature_len() {
                return Err(CodecError::transaction(format!(
                    "signature is {} bytes, expected {}",
                    signature.len(),
                    tx.expected_signature_len()
                )));
            }
            add_signature(&mut record, signature);
            &set.signed
        } else if tx.has_partial_state() {
            if !tx.is_intended_to_be_sponsored() {
                return Err(CodecError::transaction(
                    "sponsorship state on a request not intended to be sponsored",
                ));
            }
            add_partial_state(&mut record, tx);
            &set.with_state
        } else {
            &set.to_hash
        };

        let encoded = self.profiler.object_to_encoded(profile, &record)?;
        Ok(self.with_prefix(tx, encoded))
    }

    /// Encodes the signing form of `tx`: no signature material, prefix included.
    pub fn encode_to_hash(&self, tx: &TransactionRequest) -> Result<Vec<u8>, CodecError> {
        tx.body.validate()?;
        let record = body_to_record(&tx.body)?;
        let encoded = self
            .profiler
            .object_to_encoded(&profiles(tx.is_dynamic_fee()).to_hash, &record)?;
        Ok(self.with_prefix(tx, encoded))
    }

    fn with_prefix(&self, tx: &TransactionRequest, encoded: Vec<u8>) -> Vec<u8> {
        if !tx.is_dynamic_fee() {
            return encoded;
        }
        let mut out = Vec::with_capacity(encoded.len() + 1);
        out.push(DYNAMIC_FEE_PREFIX);
        out.extend_from_slice(&encoded);
        out
    }

    // =========================================================================
    // Hashes
    // =========================================================================

    /// Hash signed by the origin.
    pub fn signing_hash(&self, tx: &TransactionRequest) -> Result<Hash256, CodecError> {
        Ok(self.crypto.hash(&[self.encode_to_hash(tx)?.as_slice()]))
    }

    /// Hash signed by the gas payer on behalf of `origin`.
    pub fn gas_payer_signing_hash(
        &self,
        tx: &TransactionRequest,
        origin: &Address,
    ) -> Result<Hash256, CodecError> {
        let origin_hash = self.signing_hash(tx)?;
        Ok(self.crypto.hash(&[origin_hash.as_slice(), origin.as_bytes()]))
    }

    /// Transaction id, defined once the origin is known.
    pub fn id(&self, tx: &TransactionRequest) -> Result<Hash256, CodecError> {
        let origin = tx
            .origin
            .ok_or_else(|| CodecError::transaction("id needs a signed request"))?;
        let signing_hash = self.signing_hash(tx)?;
        Ok(self.crypto.hash(&[signing_hash.as_slice(), origin.as_bytes()]))
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Decodes bytes received from the network.
    pub fn decode(&self, encoded: &[u8]) -> Result<TransactionRequest, CodecError> {
        self.decode_inner(encoded).map_err(|e| {
            warn!("rejected encoded transaction ({} bytes): {e}", encoded.len());
            e
        })
    }

    fn decode_inner(&self, encoded: &[u8]) -> Result<TransactionRequest, CodecError> {
        if encoded.len() > self.config.max_encoded_len {
            return Err(CodecError::encoding(
                TX_PROFILE_NAME,
                format!(
                    "encoded transaction of {} bytes exceeds {}",
                    encoded.len(),
                    self.config.max_encoded_len
                ),
            ));
        }

        let (dynamic_fee, payload) = match encoded.split_first() {
            Some((&DYNAMIC_FEE_PREFIX, rest)) => (true, rest),
            _ => (false, encoded),
        };

        let set = profiles(dynamic_fee);
        let items = self.profiler.top_level_items(payload, TX_PROFILE_NAME)?;
        let (profile, shape) = set.by_item_count(items.len()).ok_or_else(|| {
            CodecError::encoding(TX_PROFILE_NAME, "invalid encoded transaction request")
        })?;
        debug!(
            "decoding {} transaction, {} items, shape {shape:?}",
            if dynamic_fee { "dynamic-fee" } else { "legacy" },
            items.len()
        );

        let record = self.profiler.items_to_object(profile, items)?;
        let body = record_to_body(&record, dynamic_fee)?;
        body.validate()?;
        let mut tx = TransactionRequest::new(body);

        match shape {
            Shape::Unsigned => {}
            Shape::WithState => {
                if !tx.is_intended_to_be_sponsored() {
                    return Err(CodecError::encoding(
                        TX_PROFILE_NAME,
                        "sponsorship state on a request not intended to be sponsored",
                    ));
                }
                apply_partial_state(&record, &mut tx)?;
            }
            Shape::Signed => {
                let signature = record_signature(&record)?;
                if signature.len() != tx.expected_signature_len() {
                    return Err(CodecError::field_decoding(
                        "tx.signature",
                        &signature,
                        format!(
                            "expected {} bytes for this sponsorship flag",
                            tx.expected_signature_len()
                        ),
                    ));
                }
                tx.signature = Some(signature);
                tx = self.recover_signers(tx)?;
            }
        }

        Ok(tx)
    }

    // =========================================================================
    // Signatures
    // =========================================================================

    /// Splits the full signature and recovers origin and gas payer.
    fn recover_signers(&self, mut tx: TransactionRequest) -> Result<TransactionRequest, CodecError> {
        let signature = tx
            .signature
            .as_deref()
            .ok_or_else(|| CodecError::transaction("request has no signature"))?;
        let (origin_sig, gas_payer_sig) = split_signature(signature)?;

        let origin_hash = self.signing_hash(&tx)?;
        let origin = self
            .crypto
            .recover_address(&origin_hash, &origin_sig)
            .map_err(|e| relabel(e, "tx.signature.origin"))?;

        if let Some(gas_payer_sig) = gas_payer_sig {
            let gas_payer_hash = self
                .crypto
                .hash(&[origin_hash.as_slice(), origin.as_bytes()]);
            let gas_payer = self
                .crypto
                .recover_address(&gas_payer_hash, &gas_payer_sig)
                .map_err(|e| relabel(e, "tx.signature.gasPayer"))?;
            tx.gas_payer = Some(gas_payer);
            tx.gas_payer_signature = Some(gas_payer_sig);
            tx.beggar = Some(origin);
        }

        tx.origin_signature = Some(origin_sig);
        tx.origin = Some(origin);
        Ok(tx)
    }

    /// Assembles the full signature once the partial signatures are complete.
    ///
    /// A plain request needs the origin signature; a sponsored one needs both.
    /// Incomplete requests are returned unchanged.
    pub fn finalize_signatures(
        &self,
        mut tx: TransactionRequest,
    ) -> Result<TransactionRequest, CodecError> {
        if tx.signature.is_some() {
            return Ok(tx);
        }
        let full = match (tx.origin_signature, tx.gas_payer_signature) {
            (Some(origin), None) if !tx.is_intended_to_be_sponsored() => origin.to_vec(),
            (Some(origin), Some(gas_payer)) if tx.is_intended_to_be_sponsored() => {
                [origin, gas_payer].concat()
            }
            _ => return Ok(tx),
        };
        let beggar = tx.beggar;
        tx.signature = Some(full);
        let tx = self.recover_signers(tx)?;

        if beggar.is_some() && beggar != tx.origin {
            return Err(CodecError::signature(
                "tx.signature.origin",
                "origin signature does not belong to the beggar",
            ));
        }
        Ok(tx)
    }
}

/// Splits `origin (65) ‖ gas payer (65)` or a lone origin signature.
pub fn split_signature(
    signature: &[u8],
) -> Result<([u8; SIGNATURE_LENGTH], Option<[u8; SIGNATURE_LENGTH]>), CodecError> {
    let invalid = || {
        CodecError::field_decoding(
            "tx.signature",
            signature,
            format!("expected {SIGNATURE_LENGTH} or {} bytes", SIGNATURE_LENGTH * 2),
        )
    };
    match signature.len() {
        SIGNATURE_LENGTH => {
            let origin = <[u8; SIGNATURE_LENGTH]>::try_from(signature).map_err(|_| invalid())?;
            Ok((origin, None))
        }
        len if len == SIGNATURE_LENGTH * 2 => {
            let (head, tail) = signature.split_at(SIGNATURE_LENGTH);
            let origin = <[u8; SIGNATURE_LENGTH]>::try_from(head).map_err(|_| invalid())?;
            let gas_payer = <[u8; SIGNATURE_LENGTH]>::try_from(tail).map_err(|_| invalid())?;
            Ok((origin, Some(gas_payer)))
        }
        _ => Err(invalid()),
    }
}

fn relabel(error: CodecError, context: &str) -> CodecError {
    match error {
        CodecError::InvalidSignature { reason, .. } => CodecError::signature(context, reason),
        other => other,
    }
}
