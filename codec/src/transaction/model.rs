//! Typed transaction request.

use num_bigint::BigUint;
use num_traits::Zero;
use thor_tx_common::{Address, BlockRef, CodecError, Hash256, SIGNATURE_LENGTH, SPONSORSHIP_FLAG};

/// One action of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// Recipient, or `None` for contract creation.
    pub to: Option<Address>,
    /// Amount transferred, in wei.
    pub value: BigUint,
    /// Call data or deployment bytecode.
    pub data: Vec<u8>,
}

impl Clause {
    /// Plain value transfer.
    pub fn transfer(to: Address, value: impl Into<BigUint>) -> Self {
        Self {
            to: Some(to),
            value: value.into(),
            data: Vec::new(),
        }
    }

    /// Contract deployment carrying `bytecode`.
    pub fn deploy(bytecode: Vec<u8>) -> Self {
        Self {
            to: None,
            value: BigUint::zero(),
            data: bytecode,
        }
    }

    /// Contract call with no value attached.
    pub fn call(to: Address, data: Vec<u8>) -> Self {
        Self {
            to: Some(to),
            value: BigUint::zero(),
            data,
        }
    }

    #[inline]
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}

/// Fee model of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fee {
    /// Base gas price scaled by a one-byte coefficient.
    Legacy { gas_price_coef: u8 },
    /// Dynamic fee, marked on the wire by the `0x51` prefix.
    DynamicFee {
        max_priority_fee_per_gas: BigUint,
        max_fee_per_gas: BigUint,
    },
}

/// The `reserved` field: a feature bit set followed by opaque buffers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reserved {
    /// Bit 0 flags the transaction as intended to be sponsored.
    pub features: u32,
    /// Trailing buffers carried verbatim.
    pub unused: Vec<Vec<u8>>,
}

impl Reserved {
    /// Reserved field of a request intended to be sponsored.
    pub fn sponsored() -> Self {
        Self {
            features: u32::from(SPONSORSHIP_FLAG),
            unused: Vec::new(),
        }
    }

    #[inline]
    pub fn is_sponsorship_requested(&self) -> bool {
        self.features & u32::from(SPONSORSHIP_FLAG) != 0
    }
}

/// Fields covered by the signing hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBody {
    pub chain_tag: u8,
    pub block_ref: BlockRef,
    /// Number of blocks after `block_ref` during which the transaction is valid.
    pub expiration: u32,
    pub clauses: Vec<Clause>,
    pub fee: Fee,
    pub gas: u64,
    /// Transaction that must be executed before this one.
    pub depends_on: Option<Hash256>,
    pub nonce: u64,
    pub reserved: Reserved,
}

impl TransactionBody {
    /// Checks the invariants the wire format cannot express.
    pub fn validate(&self) -> Result<(), CodecError> {
        if let Fee::DynamicFee {
            max_fee_per_gas, ..
        } = &self.fee
        {
            if max_fee_per_gas.is_zero() {
                return Err(CodecError::transaction(
                    "dynamic-fee transaction needs maxFeePerGas > 0",
                ));
            }
        }
        Ok(())
    }
}

/// A transaction body plus whatever signature state it has reached.
///
/// One type covers every shape: unsigned, partially signed for sponsorship,
/// signed by the origin, and signed by both origin and gas payer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub body: TransactionBody,
    /// Address asking a gas payer to sponsor the transaction.
    pub beggar: Option<Address>,
    pub origin_signature: Option<[u8; SIGNATURE_LENGTH]>,
    pub gas_payer_signature: Option<[u8; SIGNATURE_LENGTH]>,
    /// Full signature: origin (65 bytes), or origin ‖ gas payer (130 bytes).
    pub signature: Option<Vec<u8>>,
    /// Recovered signer, set on decode and after signing.
    pub origin: Option<Address>,
    /// Recovered sponsor, set on decode and after signing.
    pub gas_payer: Option<Address>,
}

impl TransactionRequest {
    /// Creates an unsigned request.
    pub fn new(body: TransactionBody) -> Self {
        Self {
            body,
            beggar: None,
            origin_signature: None,
            gas_payer_signature: None,
            signature: None,
            origin: None,
            gas_payer: None,
        }
    }

    /// Records the address that will sign as origin of a sponsored request.
    pub fn with_beggar(mut self, beggar: Address) -> Self {
        self.beggar = Some(beggar);
        self
    }

    #[inline]
    pub fn is_dynamic_fee(&self) -> bool {
        matches!(self.body.fee, Fee::DynamicFee { .. })
    }

    #[inline]
    pub fn is_intended_to_be_sponsored(&self) -> bool {
        self.body.reserved.is_sponsorship_requested()
    }

    /// Returns true once the full signature matches the sponsorship flag.
    pub fn is_signed(&self) -> bool {
        match &self.signature {
            Some(sig) => sig.len() == self.expected_signature_len(),
            None => false,
        }
    }

    /// Returns true for a request fully signed by both origin and gas payer.
    pub fn is_sponsored(&self) -> bool {
        self.is_intended_to_be_sponsored() && self.is_signed()
    }

    /// Returns true if partial sponsorship state is present without a full signature.
    pub fn has_partial_state(&self) -> bool {
        self.signature.is_none()
            && (self.beggar.is_some()
                || self.origin_signature.is_some()
                || self.gas_payer_signature.is_some())
    }

    /// Signature length required by the sponsorship flag.
    pub fn expected_signature_len(&self) -> usize {
        if self.is_intended_to_be_sponsored() {
            SIGNATURE_LENGTH * 2
        } else {
            SIGNATURE_LENGTH
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(fee: Fee, reserved: Reserved) -> TransactionBody {
        TransactionBody {
            chain_tag: 0x27,
            block_ref: BlockRef::from_number(1),
            expiration: 32,
            clauses: vec![Clause::transfer(Address::new([0x11; 20]), 1u32)],
            fee,
            gas: 21000,
            depends_on: None,
            nonce: 1,
            reserved,
        }
    }

    #[test]
    fn test_clause_helpers() {
        assert!(Clause::deploy(vec![0x60, 0x60]).is_contract_creation());
        let call = Clause::call(Address::new([1; 20]), vec![0xa9, 0x05, 0x9c, 0xbb]);
        assert!(!call.is_contract_creation());
        assert!(call.value.is_zero());
    }

    #[test]
    fn test_signed_tracks_sponsorship() {
        let mut tx = TransactionRequest::new(body(Fee::Legacy { gas_price_coef: 0 }, Reserved::default()));
        assert!(!tx.is_signed());
        tx.signature = Some(vec![0; 65]);
        assert!(tx.is_signed());
        assert!(!tx.is_sponsored());

        tx.body.reserved = Reserved::sponsored();
        assert!(!tx.is_signed());
        tx.signature = Some(vec![0; 130]);
        assert!(tx.is_signed());
        assert!(tx.is_sponsored());
    }

    #[test]
    fn test_partial_state() {
        let tx = TransactionRequest::new(body(Fee::Legacy { gas_price_coef: 0 }, Reserved::sponsored()));
        assert!(!tx.has_partial_state());
        let tx = tx.with_beggar(Address::new([2; 20]));
        assert!(tx.has_partial_state());
    }

    #[test]
    fn test_dynamic_fee_needs_max_fee() {
        let zero = body(
            Fee::DynamicFee {
                max_priority_fee_per_gas: BigUint::zero(),
                max_fee_per_gas: BigUint::zero(),
            },
            Reserved::default(),
        );
        assert!(matches!(
            zero.validate(),
            Err(CodecError::InvalidTransaction { .. })
        ));
        let ok = body(
            Fee::DynamicFee {
                max_priority_fee_per_gas: BigUint::zero(),
                max_fee_per_gas: BigUint::from(1u32),
            },
            Reserved::default(),
        );
        assert!(ok.validate().is_ok());
        assert!(TransactionRequest::new(ok).is_dynamic_fee());
    }

    #[test]
    fn test_features_bit_zero_is_sponsorship() {
        let reserved = Reserved {
            features: 0b10,
            unused: vec![],
        };
        assert!(!reserved.is_sponsorship_requested());
        let reserved = Reserved {
            features: 0b11,
            unused: vec![],
        };
        assert!(reserved.is_sponsorship_requested());
    }
}
