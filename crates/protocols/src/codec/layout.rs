//! Fixed-order field tables for ABI tuples.
//!
//! A [`TupleLayout`] names every position of a contract return tuple. Decoding
//! checks arity and member types against the table before any field is read,
//! so a contract version that reorders or adds fields fails loudly.

use super::abi::{self, AbiType, AbiValue};
use crate::error::{DecodeError, ValidationError};
use dualstake_domain::Address;

/// Type of one tuple position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Uint64,
    Bool,
    String,
    Address,
}

impl FieldKind {
    fn abi_type(self) -> AbiType {
        match self {
            FieldKind::Uint64 => AbiType::Uint64,
            FieldKind::Bool => AbiType::Bool,
            FieldKind::String => AbiType::String,
            FieldKind::Address => AbiType::Address,
        }
    }

    fn label(self) -> &'static str {
        match self {
            FieldKind::Uint64 => "uint64",
            FieldKind::Bool => "bool",
            FieldKind::String => "string",
            FieldKind::Address => "address",
        }
    }
}

/// A named tuple position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Positional layout of a contract tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupleLayout {
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl TupleLayout {
    /// ABI types of every position, in order.
    #[must_use]
    pub fn abi_types(&self) -> Vec<AbiType> {
        self.fields.iter().map(|f| f.kind.abi_type()).collect()
    }

    /// Tuple type string, e.g. `(uint64,bool)`.
    #[must_use]
    pub fn signature(&self) -> String {
        AbiType::Tuple(self.abi_types()).signature()
    }

    /// Decodes an encoded tuple into a record keyed by this layout.
    ///
    /// # Errors
    /// Any [`DecodeError`] from the tuple codec, or a type mismatch.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedRecord<'_>, DecodeError> {
        let values = abi::decode_tuple(&self.abi_types(), bytes, self.name)?;
        self.from_values(values)
    }

    /// Binds already-decoded values to this layout.
    ///
    /// # Errors
    /// [`DecodeError::Arity`] when the value count differs from the field
    /// count, [`DecodeError::FieldType`] when a value has the wrong type.
    pub fn from_values(&self, values: Vec<AbiValue>) -> Result<DecodedRecord<'_>, DecodeError> {
        if values.len() != self.fields.len() {
            return Err(DecodeError::Arity {
                layout: self.name,
                expected: self.fields.len(),
                found: values.len(),
            });
        }
        for (field, value) in self.fields.iter().zip(&values) {
            if value.abi_type() != field.kind.abi_type() {
                return Err(DecodeError::FieldType {
                    layout: self.name,
                    field: field.name,
                    expected: field.kind.label(),
                });
            }
        }
        Ok(DecodedRecord {
            layout: self,
            values,
        })
    }

    /// Encodes values in this layout's order.
    ///
    /// # Errors
    /// [`ValidationError::TooLong`] when a dynamic member overflows.
    pub fn encode(&self, values: &[AbiValue]) -> Result<Vec<u8>, ValidationError> {
        abi::encode_tuple(values)
    }
}

/// Tuple values bound to their layout, read by field name.
#[derive(Debug, Clone)]
pub struct DecodedRecord<'a> {
    layout: &'a TupleLayout,
    values: Vec<AbiValue>,
}

impl DecodedRecord<'_> {
    fn get(&self, name: &'static str) -> Result<&AbiValue, DecodeError> {
        self.layout
            .fields
            .iter()
            .position(|f| f.name == name)
            .map(|i| &self.values[i])
            .ok_or(DecodeError::UnknownField {
                layout: self.layout.name,
                field: name,
            })
    }

    fn mismatch(&self, field: &'static str, expected: &'static str) -> DecodeError {
        DecodeError::FieldType {
            layout: self.layout.name,
            field,
            expected,
        }
    }

    /// # Errors
    /// Unknown field or non-uint64 value.
    pub fn uint(&self, name: &'static str) -> Result<u64, DecodeError> {
        match self.get(name)? {
            AbiValue::Uint64(v) => Ok(*v),
            _ => Err(self.mismatch(name, "uint64")),
        }
    }

    /// # Errors
    /// Unknown field or non-bool value.
    pub fn boolean(&self, name: &'static str) -> Result<bool, DecodeError> {
        match self.get(name)? {
            AbiValue::Bool(v) => Ok(*v),
            _ => Err(self.mismatch(name, "bool")),
        }
    }

    /// # Errors
    /// Unknown field or non-string value.
    pub fn string(&self, name: &'static str) -> Result<String, DecodeError> {
        match self.get(name)? {
            AbiValue::String(v) => Ok(v.clone()),
            _ => Err(self.mismatch(name, "string")),
        }
    }

    /// # Errors
    /// Unknown field or non-address value.
    pub fn address(&self, name: &'static str) -> Result<Address, DecodeError> {
        match self.get(name)? {
            AbiValue::Address(v) => Ok(*v),
            _ => Err(self.mismatch(name, "address")),
        }
    }

    /// Reads a uint64 field that must fit in a `u8`.
    ///
    /// # Errors
    /// [`DecodeError::OutOfRange`] when the value exceeds 255.
    pub fn uint_u8(&self, name: &'static str) -> Result<u8, DecodeError> {
        let value = self.uint(name)?;
        u8::try_from(value).map_err(|_| DecodeError::OutOfRange {
            field: name,
            value,
            target: "u8",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIR: TupleLayout = TupleLayout {
        name: "Pair",
        fields: &[
            Field::new("amount", FieldKind::Uint64),
            Field::new("label", FieldKind::String),
            Field::new("flag", FieldKind::Bool),
        ],
    };

    fn pair_values() -> Vec<AbiValue> {
        vec![
            AbiValue::Uint64(42),
            AbiValue::String("x".to_string()),
            AbiValue::Bool(true),
        ]
    }

    #[test]
    fn test_signature() {
        assert_eq!(PAIR.signature(), "(uint64,string,bool)");
    }

    #[test]
    fn test_decode_by_name() {
        let bytes = PAIR.encode(&pair_values()).unwrap();
        let record = PAIR.decode(&bytes).unwrap();
        assert_eq!(record.uint("amount").unwrap(), 42);
        assert_eq!(record.string("label").unwrap(), "x");
        assert!(record.boolean("flag").unwrap());
    }

    #[test]
    fn test_arity_mismatch_is_rejected() {
        let mut values = pair_values();
        values.pop();
        let err = PAIR.from_values(values).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Arity {
                layout: "Pair",
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_reordered_values_are_rejected() {
        let values = vec![
            AbiValue::String("x".to_string()),
            AbiValue::Uint64(42),
            AbiValue::Bool(true),
        ];
        assert!(matches!(
            PAIR.from_values(values),
            Err(DecodeError::FieldType { field: "amount", .. })
        ));
    }

    #[test]
    fn test_unknown_field_and_wrong_getter() {
        let record = PAIR.from_values(pair_values()).unwrap();
        assert!(matches!(
            record.uint("missing"),
            Err(DecodeError::UnknownField { .. })
        ));
        assert!(matches!(
            record.boolean("amount"),
            Err(DecodeError::FieldType { .. })
        ));
    }

    #[test]
    fn test_u8_narrowing() {
        let record = PAIR
            .from_values(vec![
                AbiValue::Uint64(256),
                AbiValue::String(String::new()),
                AbiValue::Bool(false),
            ])
            .unwrap();
        assert!(matches!(
            record.uint_u8("amount"),
            Err(DecodeError::OutOfRange { value: 256, .. })
        ));
    }
}
