//! Property-based tests for transaction encoding/decoding.

use num_bigint::BigUint;
use proptest::prelude::*;
use thor_tx_codec::rlp::{self, RlpItem};
use thor_tx_codec::{
    Address, BlockRef, Clause, Fee, PrivateKeySigner, Reserved, TransactionBody, TransactionCodec,
    TransactionRequest,
};

// ============================================================================
// Strategies for generating random transaction data
// ============================================================================

fn arb_address() -> impl Strategy<Value = Address> {
    prop::array::uniform20(any::<u8>()).prop_map(Address::new)
}

fn arb_u256() -> impl Strategy<Value = BigUint> {
    prop::array::uniform32(any::<u8>()).prop_map(|bytes| BigUint::from_bytes_be(&bytes))
}

fn arb_clause() -> impl Strategy<Value = Clause> {
    (
        prop::option::of(arb_address()),
        arb_u256(),
        prop::collection::vec(any::<u8>(), 0..128),
    )
        .prop_map(|(to, value, data)| Clause { to, value, data })
}

fn arb_fee() -> impl Strategy<Value = Fee> {
    prop_oneof![
        any::<u8>().prop_map(|gas_price_coef| Fee::Legacy { gas_price_coef }),
        (arb_u256(), arb_u256().prop_filter("max fee must be positive", |n| n.bits() > 0)).prop_map(
            |(max_priority_fee_per_gas, max_fee_per_gas)| Fee::DynamicFee {
                max_priority_fee_per_gas,
                max_fee_per_gas,
            }
        ),
    ]
}

fn arb_reserved() -> impl Strategy<Value = Reserved> {
    (
        any::<u32>(),
        prop::collection::vec(prop::collection::vec(any::<u8>(), 1..8), 0..3),
    )
        .prop_map(|(features, unused)| Reserved { features, unused })
}

fn arb_body() -> impl Strategy<Value = TransactionBody> {
    (
        any::<u8>(),                                  // chain_tag
        prop::array::uniform8(any::<u8>()),           // block_ref
        any::<u32>(),                                 // expiration
        prop::collection::vec(arb_clause(), 0..4),    // clauses
        arb_fee(),
        any::<u64>(),                                 // gas
        prop::option::of(prop::array::uniform32(any::<u8>())), // depends_on
        any::<u64>(),                                 // nonce
        arb_reserved(),
    )
        .prop_map(
            |(chain_tag, block_ref, expiration, clauses, fee, gas, depends_on, nonce, reserved)| {
                TransactionBody {
                    chain_tag,
                    block_ref: BlockRef::new(block_ref),
                    expiration,
                    clauses,
                    fee,
                    gas,
                    depends_on,
                    nonce,
                    reserved,
                }
            },
        )
}

fn arb_signer() -> impl Strategy<Value = PrivateKeySigner> {
    prop::array::uniform32(any::<u8>())
        .prop_filter_map("not a valid secp256k1 scalar", |bytes| {
            PrivateKeySigner::from_bytes(&bytes).ok()
        })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: decode never panics on arbitrary input
    #[test]
    fn prop_decode_arbitrary_bytes(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = TransactionCodec::new().decode(&data);
    }

    /// Property: decode never panics on arbitrary input behind the dynamic-fee prefix
    #[test]
    fn prop_decode_arbitrary_prefixed(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut prefixed = vec![0x51];
        prefixed.extend_from_slice(&data);
        let _ = TransactionCodec::new().decode(&prefixed);
    }

    /// Property: every accepted RLP input re-encodes to the same bytes
    #[test]
    fn prop_rlp_decode_is_canonical(data in prop::collection::vec(any::<u8>(), 0..256)) {
        if let Ok(item) = rlp::decode_exact(&data) {
            prop_assert_eq!(rlp::encode(&item), data);
        }
    }

    /// Property: unsigned requests survive encode then decode
    #[test]
    fn prop_unsigned_roundtrip(body in arb_body()) {
        let codec = TransactionCodec::new();
        let tx = TransactionRequest::new(body);
        let encoded = codec.encode(&tx).unwrap();
        prop_assert_eq!(encoded[0] == 0x51, tx.is_dynamic_fee());
        prop_assert_eq!(codec.decode(&encoded).unwrap(), tx);
    }

    /// Property: a signed request decodes to its signer
    #[test]
    fn prop_signed_roundtrip(mut body in arb_body(), signer in arb_signer()) {
        body.reserved.features &= !1;
        let codec = TransactionCodec::new();
        let signed = signer.sign(&codec, &TransactionRequest::new(body)).unwrap();
        let decoded = codec.decode(&codec.encode(&signed).unwrap()).unwrap();
        prop_assert_eq!(decoded.origin, Some(signer.address()));
        prop_assert_eq!(decoded, signed);
    }

    /// Property: a sponsored request decodes to both signers
    #[test]
    fn prop_sponsored_roundtrip(
        mut body in arb_body(),
        origin in arb_signer(),
        gas_payer in arb_signer(),
    ) {
        body.reserved.features |= 1;
        let codec = TransactionCodec::new();
        let half = origin.sign(&codec, &TransactionRequest::new(body)).unwrap();
        let full = gas_payer.sign(&codec, &half).unwrap();
        let decoded = codec.decode(&codec.encode(&full).unwrap()).unwrap();
        prop_assert!(decoded.is_sponsored());
        prop_assert_eq!(decoded.origin, Some(origin.address()));
        prop_assert_eq!(decoded.gas_payer, Some(gas_payer.address()));
    }

    /// Property: the top-level item count decides acceptance
    #[test]
    fn prop_unknown_item_count_rejected(count in 0usize..20) {
        prop_assume!(![9, 10, 12].contains(&count));
        let encoded = rlp::encode(&RlpItem::List(vec![RlpItem::Bytes(vec![]); count]));
        prop_assert!(TransactionCodec::new().decode(&encoded).is_err());
    }
}
