//! JSON view of a transaction request.
//!
//! Numbers that fit a JSON number stay numbers; 256-bit quantities and the
//! nonce are `0x`-prefixed hex quantities, byte strings are `0x` hex.

use num_bigint::BigUint;
use num_traits::{Num, Zero};
use serde::{Deserialize, Serialize};
use thor_tx_common::{parse_fixed_hex, parse_hex, to_hex, Address, BlockRef, CodecError};

use super::codec::split_signature;
use super::model::{Clause, Fee, Reserved, TransactionBody, TransactionRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClauseJson {
    pub to: Option<Address>,
    pub value: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservedJson {
    #[serde(default)]
    pub features: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unused: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequestJson {
    pub block_ref: String,
    pub chain_tag: u8,
    pub clauses: Vec<ClauseJson>,
    pub depends_on: Option<String>,
    pub expiration: u32,
    pub gas: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price_coef: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<ReservedJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Renders a quantity as `0x` hex without leading zeros (`0x0` for zero).
pub fn to_quantity(n: &BigUint) -> String {
    format!("0x{}", n.to_str_radix(16))
}

/// Parses a `0x` hex quantity or a decimal string.
pub fn parse_quantity(context: &str, text: &str) -> Result<BigUint, CodecError> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) if !digits.is_empty() => BigUint::from_str_radix(digits, 16).ok(),
        Some(_) => None,
        None if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) => {
            BigUint::from_str_radix(text, 10).ok()
        }
        None => None,
    };
    parsed.ok_or_else(|| CodecError::field_encoding(context, text, "not a quantity"))
}

impl From<&TransactionRequest> for TransactionRequestJson {
    fn from(tx: &TransactionRequest) -> Self {
        let body = &tx.body;
        let (gas_price_coef, max_fee_per_gas, max_priority_fee_per_gas) = match &body.fee {
            Fee::Legacy { gas_price_coef } => (Some(*gas_price_coef), None, None),
            Fee::DynamicFee {
                max_priority_fee_per_gas,
                max_fee_per_gas,
            } => (
                None,
                Some(to_quantity(max_fee_per_gas)),
                Some(to_quantity(max_priority_fee_per_gas)),
            ),
        };
        let reserved = (body.reserved != Reserved::default()).then(|| ReservedJson {
            features: body.reserved.features,
            unused: body.reserved.unused.iter().map(|b| to_hex(b)).collect(),
        });

        Self {
            block_ref: body.block_ref.to_string(),
            chain_tag: body.chain_tag,
            clauses: body
                .clauses
                .iter()
                .map(|c| ClauseJson {
                    to: c.to,
                    value: to_quantity(&c.value),
                    data: to_hex(&c.data),
                })
                .collect(),
            depends_on: body.depends_on.as_ref().map(|h| to_hex(h)),
            expiration: body.expiration,
            gas: body.gas,
            gas_price_coef,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            nonce: to_quantity(&BigUint::from(body.nonce)),
            reserved,
            signature: tx
                .signature
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(to_hex),
        }
    }
}

impl TryFrom<TransactionRequestJson> for TransactionRequest {
    type Error = CodecError;

    /// Signers are not recovered here; decode the encoded form to get them.
    fn try_from(json: TransactionRequestJson) -> Result<Self, Self::Error> {
        let fee = match (
            json.gas_price_coef,
            json.max_fee_per_gas.as_deref(),
            json.max_priority_fee_per_gas.as_deref(),
        ) {
            (Some(gas_price_coef), None, None) => Fee::Legacy { gas_price_coef },
            (None, Some(max_fee), priority) => Fee::DynamicFee {
                max_fee_per_gas: parse_quantity("maxFeePerGas", max_fee)?,
                max_priority_fee_per_gas: match priority {
                    Some(p) => parse_quantity("maxPriorityFeePerGas", p)?,
                    None => BigUint::zero(),
                },
            },
            _ => {
                return Err(CodecError::transaction(
                    "either gasPriceCoef or maxFeePerGas/maxPriorityFeePerGas must be set",
                ))
            }
        };

        let clauses = json
            .clauses
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Ok(Clause {
                    to: c.to,
                    value: parse_quantity(&format!("clauses.#{i}.value"), &c.value)?,
                    data: parse_hex(&format!("clauses.#{i}.data"), &c.data)?,
                })
            })
            .collect::<Result<Vec<_>, CodecError>>()?;

        let reserved = match json.reserved {
            Some(r) => Reserved {
                features: r.features,
                unused: r
                    .unused
                    .iter()
                    .map(|u| parse_hex("reserved.unused", u))
                    .collect::<Result<_, _>>()?,
            },
            None => Reserved::default(),
        };

        let nonce = parse_quantity("nonce", &json.nonce)?;
        let nonce = u64::try_from(&nonce)
            .map_err(|_| CodecError::field_encoding("nonce", &json.nonce, "exceeds 8 bytes"))?;

        let body = TransactionBody {
            chain_tag: json.chain_tag,
            block_ref: json.block_ref.parse::<BlockRef>()?,
            expiration: json.expiration,
            clauses,
            fee,
            gas: json.gas,
            depends_on: json
                .depends_on
                .as_deref()
                .map(|d| parse_fixed_hex::<32>("dependsOn", d))
                .transpose()?,
            nonce,
            reserved,
        };
        body.validate()?;

        let mut tx = TransactionRequest::new(body);
        if let Some(signature) = json.signature {
            let raw = parse_hex("signature", &signature)?;
            let (origin, gas_payer) = split_signature(&raw)?;
            tx.origin_signature = Some(origin);
            tx.gas_payer_signature = gas_payer;
            tx.signature = Some(raw);
        }
        Ok(tx)
    }
}
