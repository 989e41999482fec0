//! Wire schemas of the transaction body.
//!
//! Field order is the wire order. Legacy and dynamic-fee bodies differ only
//! in the fee fields; each has a to-hash profile and two derived ones that
//! append signature material.

use lazy_static::lazy_static;

use crate::rlp::kind::Kind;
use crate::rlp::profile::{Field, Profile};

/// Name used as the root of every field path in errors.
pub const TX_PROFILE_NAME: &str = "tx";

/// The three profiles of one fee model.
#[derive(Debug)]
pub struct TxProfiles {
    /// Body without signature material; its encoding is what gets hashed.
    pub to_hash: Profile,
    /// `to_hash` + `signature`.
    pub signed: Profile,
    /// `to_hash` + `beggar`, `originSignature`, `gasPayerSignature`.
    pub with_state: Profile,
}

impl TxProfiles {
    fn new(fee_fields: Vec<Field>) -> Self {
        let mut fields = vec![
            Field::leaf("chainTag", Kind::numeric(1)),
            Field::leaf("blockRef", Kind::compact_fixed_hex_blob(8)),
            Field::leaf("expiration", Kind::numeric(4)),
            Field::struct_list("clauses", clause_profile()),
        ];
        fields.extend(fee_fields);
        fields.extend([
            Field::leaf("gas", Kind::numeric(8)),
            Field::leaf("dependsOn", Kind::optional_fixed_hex_blob(32)),
            Field::leaf("nonce", Kind::numeric(8)),
            Field::list("reserved", Kind::Buffer),
        ]);

        let to_hash = Profile::new(TX_PROFILE_NAME, fields);
        let signed = to_hash.extended(TX_PROFILE_NAME, vec![Field::leaf("signature", Kind::Buffer)]);
        let with_state = to_hash.extended(
            TX_PROFILE_NAME,
            vec![
                Field::leaf("beggar", Kind::optional_fixed_hex_blob(20)),
                Field::leaf("originSignature", Kind::Buffer),
                Field::leaf("gasPayerSignature", Kind::Buffer),
            ],
        );

        Self {
            to_hash,
            signed,
            with_state,
        }
    }

    /// Selects a profile from a decoded top-level item count.
    pub fn by_item_count(&self, count: usize) -> Option<(&Profile, Shape)> {
        if count == self.to_hash.field_count() {
            Some((&self.to_hash, Shape::Unsigned))
        } else if count == self.signed.field_count() {
            Some((&self.signed, Shape::Signed))
        } else if count == self.with_state.field_count() {
            Some((&self.with_state, Shape::WithState))
        } else {
            None
        }
    }
}

/// Which profile an encoding uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Unsigned,
    Signed,
    WithState,
}

fn clause_profile() -> Profile {
    Profile::new(
        "clause",
        vec![
            Field::leaf("to", Kind::optional_fixed_hex_blob(20)),
            Field::leaf("value", Kind::numeric(32)),
            Field::leaf("data", Kind::HexBlob),
        ],
    )
}

lazy_static! {
    /// Profiles of `gasPriceCoef` transactions.
    pub static ref LEGACY: TxProfiles =
        TxProfiles::new(vec![Field::leaf("gasPriceCoef", Kind::numeric(1))]);

    /// Profiles of `0x51`-prefixed transactions.
    pub static ref DYNAMIC_FEE: TxProfiles = TxProfiles::new(vec![
        Field::leaf("maxPriorityFeePerGas", Kind::numeric(32)),
        Field::leaf("maxFeePerGas", Kind::numeric(32)),
    ]);
}

/// Profiles for the given fee model.
pub fn profiles(dynamic_fee: bool) -> &'static TxProfiles {
    if dynamic_fee {
        &DYNAMIC_FEE
    } else {
        &LEGACY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(profile: &Profile) -> Vec<&str> {
        profile.fields().iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_legacy_field_order() {
        assert_eq!(
            names(&LEGACY.to_hash),
            [
                "chainTag",
                "blockRef",
                "expiration",
                "clauses",
                "gasPriceCoef",
                "gas",
                "dependsOn",
                "nonce",
                "reserved"
            ]
        );
    }

    #[test]
    fn test_dynamic_fee_field_order() {
        assert_eq!(
            names(&DYNAMIC_FEE.to_hash)[4..6],
            ["maxPriorityFeePerGas", "maxFeePerGas"]
        );
        assert_eq!(DYNAMIC_FEE.to_hash.field_count(), 10);
    }

    #[test]
    fn test_derived_profiles_append() {
        let u = LEGACY.to_hash.field_count();
        assert_eq!(LEGACY.signed.field_count(), u + 1);
        assert_eq!(LEGACY.with_state.field_count(), u + 3);
        assert_eq!(names(&LEGACY.signed)[u], "signature");
        assert_eq!(names(&LEGACY.with_state)[u..], ["beggar", "originSignature", "gasPayerSignature"]);
    }

    #[test]
    fn test_selection_by_count() {
        assert_eq!(LEGACY.by_item_count(9).map(|(_, s)| s), Some(Shape::Unsigned));
        assert_eq!(LEGACY.by_item_count(10).map(|(_, s)| s), Some(Shape::Signed));
        assert_eq!(LEGACY.by_item_count(12).map(|(_, s)| s), Some(Shape::WithState));
        assert!(LEGACY.by_item_count(11).is_none());
        assert_eq!(DYNAMIC_FEE.by_item_count(10).map(|(_, s)| s), Some(Shape::Unsigned));
    }
}
