//! Schema engine mapping ordered field lists onto RLP item trees.
//!
//! A [`Profile`] is an ordered list of named fields. The field order is the
//! wire order: it is never inferred from content, so encode and decode are
//! inverse over every record the profile accepts.

use log::trace;
use thor_tx_common::{CodecError, MAX_RLP_DEPTH};

use super::kind::{Kind, Record, Value};
use super::{decode_exact_with_depth, encode, RlpItem};

/// Shape of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A single leaf value.
    Leaf(Kind),
    /// A list whose items all have the inner shape.
    List(Box<FieldKind>),
    /// A nested struct, stored as a list of its fields.
    Struct(Profile),
}

/// A named field of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn leaf(name: &str, kind: Kind) -> Self {
        Self {
            name: name.to_owned(),
            kind: FieldKind::Leaf(kind),
        }
    }

    /// A list of leaves, e.g. `reserved`.
    pub fn list(name: &str, item: Kind) -> Self {
        Self {
            name: name.to_owned(),
            kind: FieldKind::List(Box::new(FieldKind::Leaf(item))),
        }
    }

    /// A list of structs, e.g. `clauses`.
    pub fn struct_list(name: &str, item: Profile) -> Self {
        Self {
            name: name.to_owned(),
            kind: FieldKind::List(Box::new(FieldKind::Struct(item))),
        }
    }
}

/// Ordered, named field schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    fields: Vec<Field>,
}

impl Profile {
    /// # Panics
    ///
    /// Panics on duplicate field names.
    pub fn new(name: &str, fields: Vec<Field>) -> Self {
        for (i, field) in fields.iter().enumerate() {
            assert!(
                !fields[..i].iter().any(|f| f.name == field.name),
                "duplicate field `{}` in profile `{name}`",
                field.name
            );
        }
        Self {
            name: name.to_owned(),
            fields,
        }
    }

    /// Derives a profile with `extra` fields appended after the existing ones.
    pub fn extended(&self, name: &str, extra: Vec<Field>) -> Self {
        let mut fields = self.fields.clone();
        fields.extend(extra);
        Self::new(name, fields)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of top-level items an encoding of this profile carries.
    #[inline]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// Runs profiles against records and bytes.
#[derive(Debug, Clone, Copy)]
pub struct Profiler {
    max_depth: usize,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Profiler {
    pub const fn new() -> Self {
        Self {
            max_depth: MAX_RLP_DEPTH,
        }
    }

    /// Uses a custom RLP nesting bound when decoding.
    pub const fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Encodes `object` field by field in profile order.
    pub fn object_to_encoded(&self, profile: &Profile, object: &Record) -> Result<Vec<u8>, CodecError> {
        let item = struct_to_item(profile, object, profile.name())?;
        Ok(encode(&item))
    }

    /// Decodes `data` and maps its items onto the profile's fields.
    ///
    /// Fails with [`CodecError::InvalidEncoding`] when the top-level item
    /// count differs from the profile's field count.
    pub fn encoded_to_object(&self, profile: &Profile, data: &[u8]) -> Result<Record, CodecError> {
        let item = decode_exact_with_depth(data, self.max_depth).map_err(|e| e.at(profile.name()))?;
        item_to_struct(profile, &item, profile.name())
    }

    /// Decodes `data` to its top-level items without applying a profile.
    pub fn top_level_items(&self, data: &[u8], context: &str) -> Result<Vec<RlpItem>, CodecError> {
        decode_exact_with_depth(data, self.max_depth)
            .and_then(RlpItem::into_list)
            .map_err(|e| e.at(context))
    }

    /// Maps already decoded top-level items onto a profile.
    pub fn items_to_object(&self, profile: &Profile, items: Vec<RlpItem>) -> Result<Record, CodecError> {
        item_to_struct(profile, &RlpItem::List(items), profile.name())
    }
}

fn struct_to_item(profile: &Profile, object: &Record, context: &str) -> Result<RlpItem, CodecError> {
    let mut items = Vec::with_capacity(profile.field_count());
    for field in profile.fields() {
        let path = format!("{context}.{}", field.name);
        let value = object.get(&field.name).unwrap_or(&Value::Null);
        items.push(field_to_item(&field.kind, value, &path)?);
    }
    Ok(RlpItem::List(items))
}

fn field_to_item(kind: &FieldKind, value: &Value, path: &str) -> Result<RlpItem, CodecError> {
    match kind {
        FieldKind::Leaf(kind) => kind.encode(value, path).map(RlpItem::Bytes),
        FieldKind::List(inner) => {
            let values = value.as_list().ok_or_else(|| {
                CodecError::field_encoding(path, format!("{value:?}"), "expected a list")
            })?;
            values
                .iter()
                .enumerate()
                .map(|(i, v)| field_to_item(inner, v, &format!("{path}.#{i}")))
                .collect::<Result<Vec<_>, _>>()
                .map(RlpItem::List)
        }
        FieldKind::Struct(profile) => {
            let record = value.as_struct().ok_or_else(|| {
                CodecError::field_encoding(path, format!("{value:?}"), "expected a struct")
            })?;
            struct_to_item(profile, record, path)
        }
    }
}

fn item_to_struct(profile: &Profile, item: &RlpItem, context: &str) -> Result<Record, CodecError> {
    let items = item.as_list().map_err(|e| e.at(context))?;
    if items.len() != profile.field_count() {
        return Err(CodecError::encoding(
            context,
            format!(
                "profile mismatch: expected {} items, found {}",
                profile.field_count(),
                items.len()
            ),
        ));
    }

    let mut record = Record::new();
    for (field, item) in profile.fields().iter().zip(items) {
        let path = format!("{context}.{}", field.name);
        let value = item_to_field(&field.kind, item, &path)?;
        trace!("decoded {path}");
        record.insert(field.name.clone(), value);
    }
    Ok(record)
}

fn item_to_field(kind: &FieldKind, item: &RlpItem, path: &str) -> Result<Value, CodecError> {
    match kind {
        FieldKind::Leaf(kind) => {
            let data = item.as_bytes().map_err(|e| e.at(path))?;
            kind.decode(data, path)
        }
        FieldKind::List(inner) => {
            let items = item.as_list().map_err(|e| e.at(path))?;
            items
                .iter()
                .enumerate()
                .map(|(i, it)| item_to_field(inner, it, &format!("{path}.#{i}")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        FieldKind::Struct(profile) => item_to_struct(profile, item, path).map(Value::Struct),
    }
}
