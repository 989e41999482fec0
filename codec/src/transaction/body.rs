//! Mapping between typed requests and profile records.

use num_bigint::BigUint;
use num_traits::ToPrimitive;
use thor_tx_common::{parse_fixed_hex, parse_hex, Address, BlockRef, CodecError, SIGNATURE_LENGTH};

use super::model::{Clause, Fee, Reserved, TransactionBody, TransactionRequest};
use crate::rlp::kind::{Kind, Record, Value};

/// Width of the features number at the head of `reserved`.
const FEATURES_KIND: Kind = Kind::numeric(4);

const RESERVED_CONTEXT: &str = "tx.reserved";

// =============================================================================
// Typed -> record
// =============================================================================

/// Builds the to-hash record of `body`.
pub fn body_to_record(body: &TransactionBody) -> Result<Record, CodecError> {
    let mut record = Record::new();
    record.insert("chainTag".into(), Value::numeric(body.chain_tag));
    record.insert("blockRef".into(), Value::hex(body.block_ref.as_bytes()));
    record.insert("expiration".into(), Value::numeric(body.expiration));
    record.insert(
        "clauses".into(),
        Value::List(body.clauses.iter().map(clause_to_value).collect()),
    );
    match &body.fee {
        Fee::Legacy { gas_price_coef } => {
            record.insert("gasPriceCoef".into(), Value::numeric(*gas_price_coef));
        }
        Fee::DynamicFee {
            max_priority_fee_per_gas,
            max_fee_per_gas,
        } => {
            record.insert(
                "maxPriorityFeePerGas".into(),
                Value::Numeric(max_priority_fee_per_gas.clone()),
            );
            record.insert("maxFeePerGas".into(), Value::Numeric(max_fee_per_gas.clone()));
        }
    }
    record.insert("gas".into(), Value::numeric(body.gas));
    record.insert(
        "dependsOn".into(),
        Value::optional_hex(body.depends_on.as_ref().map(|h| &h[..])),
    );
    record.insert("nonce".into(), Value::numeric(body.nonce));
    record.insert("reserved".into(), encode_reserved(&body.reserved)?);
    Ok(record)
}

/// Adds the full signature to a to-hash record.
pub fn add_signature(record: &mut Record, signature: &[u8]) {
    record.insert("signature".into(), Value::Bytes(signature.to_vec()));
}

/// Adds partial sponsorship state to a to-hash record.
pub fn add_partial_state(record: &mut Record, tx: &TransactionRequest) {
    record.insert(
        "beggar".into(),
        Value::optional_hex(tx.beggar.as_ref().map(|a| &a.as_bytes()[..])),
    );
    record.insert(
        "originSignature".into(),
        Value::Bytes(tx.origin_signature.map(|s| s.to_vec()).unwrap_or_default()),
    );
    record.insert(
        "gasPayerSignature".into(),
        Value::Bytes(tx.gas_payer_signature.map(|s| s.to_vec()).unwrap_or_default()),
    );
}

fn clause_to_value(clause: &Clause) -> Value {
    let mut record = Record::new();
    record.insert(
        "to".into(),
        Value::optional_hex(clause.to.as_ref().map(|a| &a.as_bytes()[..])),
    );
    record.insert("value".into(), Value::Numeric(clause.value.clone()));
    record.insert("data".into(), Value::hex(&clause.data));
    Value::Struct(record)
}

/// `[features, ...unused]` with trailing empty buffers trimmed.
fn encode_reserved(reserved: &Reserved) -> Result<Value, CodecError> {
    let mut items = Vec::with_capacity(1 + reserved.unused.len());
    items.push(FEATURES_KIND.encode(&Value::numeric(reserved.features), RESERVED_CONTEXT)?);
    items.extend(reserved.unused.iter().cloned());
    while items.last().is_some_and(Vec::is_empty) {
        items.pop();
    }
    Ok(Value::List(items.into_iter().map(Value::Bytes).collect()))
}

// =============================================================================
// Record -> typed
// =============================================================================

/// Rebuilds a body from a record decoded with one of the `dynamic_fee` profiles.
pub fn record_to_body(record: &Record, dynamic_fee: bool) -> Result<TransactionBody, CodecError> {
    let fee = if dynamic_fee {
        Fee::DynamicFee {
            max_priority_fee_per_gas: numeric(record, "maxPriorityFeePerGas")?.clone(),
            max_fee_per_gas: numeric(record, "maxFeePerGas")?.clone(),
        }
    } else {
        Fee::Legacy {
            gas_price_coef: narrow(record, "gasPriceCoef", BigUint::to_u8)?,
        }
    };

    let clauses = field(record, "clauses")?
        .as_list()
        .ok_or_else(|| shape_error("clauses", "expected a list"))?
        .iter()
        .enumerate()
        .map(|(i, v)| value_to_clause(v, i))
        .collect::<Result<Vec<_>, _>>()?;

    let depends_on = match field(record, "dependsOn")? {
        Value::Null => None,
        v => Some(parse_fixed_hex::<32>("tx.dependsOn", text(v, "dependsOn")?)?),
    };

    let reserved_items = field(record, "reserved")?
        .as_list()
        .ok_or_else(|| shape_error("reserved", "expected a list"))?;

    Ok(TransactionBody {
        chain_tag: narrow(record, "chainTag", BigUint::to_u8)?,
        block_ref: BlockRef::new(parse_fixed_hex::<8>(
            "tx.blockRef",
            text(field(record, "blockRef")?, "blockRef")?,
        )?),
        expiration: narrow(record, "expiration", BigUint::to_u32)?,
        clauses,
        fee,
        gas: narrow(record, "gas", BigUint::to_u64)?,
        depends_on,
        nonce: narrow(record, "nonce", BigUint::to_u64)?,
        reserved: decode_reserved(reserved_items)?,
    })
}

/// Reads the `signature` field of a signed record.
pub fn record_signature(record: &Record) -> Result<Vec<u8>, CodecError> {
    field(record, "signature")?
        .as_bytes()
        .map(<[u8]>::to_vec)
        .ok_or_else(|| shape_error("signature", "expected bytes"))
}

/// Reads `beggar`, `originSignature` and `gasPayerSignature` into `tx`.
pub fn apply_partial_state(record: &Record, tx: &mut TransactionRequest) -> Result<(), CodecError> {
    tx.beggar = match field(record, "beggar")? {
        Value::Null => None,
        v => Some(text(v, "beggar")?.parse::<Address>()?),
    };
    tx.origin_signature = optional_signature(record, "originSignature")?;
    tx.gas_payer_signature = optional_signature(record, "gasPayerSignature")?;
    Ok(())
}

fn optional_signature(
    record: &Record,
    name: &str,
) -> Result<Option<[u8; SIGNATURE_LENGTH]>, CodecError> {
    let raw = field(record, name)?
        .as_bytes()
        .ok_or_else(|| shape_error(name, "expected bytes"))?;
    if raw.is_empty() {
        return Ok(None);
    }
    <[u8; SIGNATURE_LENGTH]>::try_from(raw).map(Some).map_err(|_| {
        CodecError::field_decoding(
            format!("tx.{name}"),
            raw,
            format!("expected {SIGNATURE_LENGTH} bytes"),
        )
    })
}

fn value_to_clause(value: &Value, index: usize) -> Result<Clause, CodecError> {
    let context = format!("tx.clauses.#{index}");
    let record = value
        .as_struct()
        .ok_or_else(|| CodecError::encoding(&context, "expected a struct"))?;
    let get = |name: &str| {
        record
            .get(name)
            .ok_or_else(|| CodecError::encoding(format!("{context}.{name}"), "missing field"))
    };

    let to = match get("to")? {
        Value::Null => None,
        Value::String(s) => Some(s.parse::<Address>()?),
        _ => return Err(CodecError::encoding(format!("{context}.to"), "expected hex")),
    };
    let value = get("value")?
        .as_numeric()
        .cloned()
        .ok_or_else(|| CodecError::encoding(format!("{context}.value"), "expected a number"))?;
    let data = match get("data")? {
        Value::String(s) => parse_hex(&format!("{context}.data"), s)?,
        _ => return Err(CodecError::encoding(format!("{context}.data"), "expected hex")),
    };

    Ok(Clause { to, value, data })
}

fn decode_reserved(items: &[Value]) -> Result<Reserved, CodecError> {
    let buffers = items
        .iter()
        .map(|v| v.as_bytes().ok_or_else(|| shape_error("reserved", "expected bytes")))
        .collect::<Result<Vec<_>, _>>()?;

    let Some((features, unused)) = buffers.split_first() else {
        return Ok(Reserved::default());
    };
    if buffers.last().is_some_and(|b| b.is_empty()) {
        return Err(CodecError::encoding(
            RESERVED_CONTEXT,
            "invalid reserved field: fields must be properly trimmed",
        ));
    }

    let features = FEATURES_KIND
        .decode(features, RESERVED_CONTEXT)?
        .as_numeric()
        .and_then(ToPrimitive::to_u32)
        .ok_or_else(|| shape_error("reserved", "features out of range"))?;

    Ok(Reserved {
        features,
        unused: unused.iter().map(|b| b.to_vec()).collect(),
    })
}

// =============================================================================
// Record access
// =============================================================================

fn field<'a>(record: &'a Record, name: &str) -> Result<&'a Value, CodecError> {
    record
        .get(name)
        .ok_or_else(|| shape_error(name, "missing field"))
}

fn numeric<'a>(record: &'a Record, name: &str) -> Result<&'a BigUint, CodecError> {
    field(record, name)?
        .as_numeric()
        .ok_or_else(|| shape_error(name, "expected a number"))
}

/// Numeric kinds already bound the width, so narrowing only fails on a
/// profile/type mismatch.
fn narrow<T>(record: &Record, name: &str, convert: fn(&BigUint) -> Option<T>) -> Result<T, CodecError> {
    convert(numeric(record, name)?).ok_or_else(|| shape_error(name, "out of range"))
}

fn text<'a>(value: &'a Value, name: &str) -> Result<&'a str, CodecError> {
    value.as_str().ok_or_else(|| shape_error(name, "expected hex"))
}

fn shape_error(name: &str, reason: &str) -> CodecError {
    CodecError::encoding(format!("tx.{name}"), reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Zero;

    fn sample_body() -> TransactionBody {
        TransactionBody {
            chain_tag: 1,
            block_ref: BlockRef::new([0, 0, 0, 0, 0xaa, 0xbb, 0xcc, 0xdd]),
            expiration: 32,
            clauses: vec![
                Clause {
                    to: Some(Address::new([0x75; 20])),
                    value: BigUint::from(10000u32),
                    data: vec![0, 0, 0, 0x60, 0x60, 0x60],
                },
                Clause::deploy(vec![0x60, 0x80]),
            ],
            fee: Fee::Legacy { gas_price_coef: 128 },
            gas: 21000,
            depends_on: Some([0x42; 32]),
            nonce: 12345678,
            reserved: Reserved::default(),
        }
    }

    #[test]
    fn test_record_roundtrip() {
        let body = sample_body();
        let record = body_to_record(&body).unwrap();
        assert_eq!(record_to_body(&record, false).unwrap(), body);
    }

    #[test]
    fn test_dynamic_fee_record() {
        let mut body = sample_body();
        body.fee = Fee::DynamicFee {
            max_priority_fee_per_gas: BigUint::zero(),
            max_fee_per_gas: BigUint::from(20000u32),
        };
        let record = body_to_record(&body).unwrap();
        assert!(!record.contains_key("gasPriceCoef"));
        assert_eq!(record_to_body(&record, true).unwrap(), body);
    }

    #[test]
    fn test_reserved_encoding_trims() {
        assert_eq!(encode_reserved(&Reserved::default()).unwrap(), Value::List(vec![]));
        assert_eq!(
            encode_reserved(&Reserved::sponsored()).unwrap(),
            Value::List(vec![Value::Bytes(vec![0x01])])
        );
        let with_unused = Reserved {
            features: 0,
            unused: vec![vec![0xaa], vec![]],
        };
        assert_eq!(
            encode_reserved(&with_unused).unwrap(),
            Value::List(vec![Value::Bytes(vec![]), Value::Bytes(vec![0xaa])])
        );
    }

    #[test]
    fn test_reserved_decoding() {
        assert_eq!(decode_reserved(&[]).unwrap(), Reserved::default());
        assert_eq!(
            decode_reserved(&[Value::Bytes(vec![0x01])]).unwrap(),
            Reserved::sponsored()
        );
        let decoded = decode_reserved(&[Value::Bytes(vec![]), Value::Bytes(vec![0xaa])]).unwrap();
        assert_eq!(decoded.features, 0);
        assert_eq!(decoded.unused, vec![vec![0xaa]]);
    }

    #[test]
    fn test_reserved_rejects_untrimmed() {
        let err = decode_reserved(&[Value::Bytes(vec![0x01]), Value::Bytes(vec![])]).unwrap_err();
        assert_eq!(err.context(), Some("tx.reserved"));
        assert!(decode_reserved(&[Value::Bytes(vec![])]).is_err());
    }

    #[test]
    fn test_reserved_rejects_non_canonical_features() {
        assert!(decode_reserved(&[Value::Bytes(vec![0x00, 0x01])]).is_err());
        assert!(decode_reserved(&[Value::Bytes(vec![1, 2, 3, 4, 5])]).is_err());
    }

    #[test]
    fn test_partial_state_signature_length() {
        let mut record = Record::new();
        record.insert("beggar".into(), Value::Null);
        record.insert("originSignature".into(), Value::Bytes(vec![1; 64]));
        record.insert("gasPayerSignature".into(), Value::Bytes(vec![]));
        let mut tx = TransactionRequest::new(sample_body());
        let err = apply_partial_state(&record, &mut tx).unwrap_err();
        assert!(matches!(err, CodecError::InvalidFieldDecoding { .. }));

        record.insert("originSignature".into(), Value::Bytes(vec![1; 65]));
        apply_partial_state(&record, &mut tx).unwrap();
        assert_eq!(tx.origin_signature, Some([1; 65]));
        assert!(tx.gas_payer_signature.is_none());
    }
}
