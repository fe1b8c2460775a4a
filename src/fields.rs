use std::cmp::Ordering;

use crate::types::{Type, STRING_SIZE};

/// Tagged variant over the closed set of field values. Equality and
/// ordering are defined per type (spec §3); comparing across types always
/// yields `None` from `partial_cmp`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum FieldVal {
    IntField(IntField),
    StringField(StringField),
}

impl FieldVal {
    pub fn get_type(&self) -> Type {
        match self {
            FieldVal::IntField(_) => Type::IntType,
            FieldVal::StringField(_) => Type::StringType,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            FieldVal::IntField(f) => f.serialize(),
            FieldVal::StringField(f) => f.serialize(),
        }
    }

    // Extracts the inner IntField
    pub fn into_int(self) -> Option<IntField> {
        match self {
            FieldVal::IntField(int_field) => Some(int_field),
            _ => None,
        }
    }

    // Extracts the inner StringField
    pub fn into_string(self) -> Option<StringField> {
        match self {
            FieldVal::StringField(string_field) => Some(string_field),
            _ => None,
        }
    }
}

impl PartialOrd for FieldVal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (FieldVal::IntField(a), FieldVal::IntField(b)) => a.value.partial_cmp(&b.value),
            (FieldVal::StringField(a), FieldVal::StringField(b)) => a.value.partial_cmp(&b.value),
            _ => None,
        }
    }
}

// Trait for different types of fields
pub trait Field {
    // Get the type of the field
    fn get_type(&self) -> Type;
    // Serialize the field into bytes
    fn serialize(&self) -> Vec<u8>;
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct IntField {
    value: i32,
}

impl IntField {
    pub fn new(value: i32) -> Self {
        IntField { value }
    }
    pub fn get_value(&self) -> i32 {
        self.value
    }
}

impl Field for IntField {
    fn get_type(&self) -> Type {
        Type::IntType
    }
    fn serialize(&self) -> Vec<u8> {
        self.value.to_be_bytes().to_vec()
    }
}

/// A fixed-maximum-length UTF-8 string field. The on-disk length prefix is
/// derived from `value` at serialization time, so there is exactly one way
/// to encode a given string instead of a separately tracked `len` that
/// could drift from it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct StringField {
    value: String,
}

impl StringField {
    /// Truncates `value` to `STRING_SIZE` bytes (on a char boundary) if it
    /// doesn't already fit the schema-wide maximum.
    pub fn new(value: String) -> Self {
        if value.len() <= STRING_SIZE {
            return StringField { value };
        }
        let mut end = STRING_SIZE;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        StringField {
            value: value[..end].to_string(),
        }
    }

    pub fn get_value(&self) -> String {
        self.value.clone()
    }
}

impl Field for StringField {
    fn get_type(&self) -> Type {
        Type::StringType
    }

    fn serialize(&self) -> Vec<u8> {
        let str_bytes = self.value.as_bytes();
        let mut bytes = vec![0; STRING_SIZE + 4];
        bytes[0..4].copy_from_slice(&(str_bytes.len() as u32).to_be_bytes());
        bytes[4..4 + str_bytes.len()].copy_from_slice(str_bytes);
        bytes
    }
}
