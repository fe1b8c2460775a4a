use crate::error::{DbError, DbResult};
use crate::fields::{FieldVal, IntField, StringField};

/// Maximum number of UTF-8 bytes a STRING field may carry; declared here
/// rather than per-schema for simplicity (the teaching engine has one
/// global string width, unlike production engines with per-column limits).
pub const STRING_SIZE: usize = 256;

/// The closed set of field types. Each has a fixed serialized length known
/// from the type alone, which is what makes tuples fixed-width.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Type {
    IntType,
    StringType,
}

impl Type {
    /// Size in bytes of a field of this type once serialized.
    pub fn get_len(&self) -> usize {
        match self {
            Type::IntType => 4,
            Type::StringType => STRING_SIZE + 4,
        }
    }

    /// Parse a field value out of the front of `bytes`. The slice may be
    /// longer than the field; only `get_len()` bytes are consumed.
    pub fn parse(&self, bytes: &[u8]) -> DbResult<FieldVal> {
        match self {
            Type::IntType => {
                if bytes.len() < 4 {
                    return Err(DbError::InvalidArgument(
                        "not enough bytes for an int field".to_string(),
                    ));
                }
                let mut int_bytes = [0; 4];
                int_bytes.copy_from_slice(&bytes[..4]);
                Ok(FieldVal::IntField(IntField::new(i32::from_be_bytes(
                    int_bytes,
                ))))
            }
            Type::StringType => {
                if bytes.len() < 4 {
                    return Err(DbError::InvalidArgument(
                        "not enough bytes for a string field length prefix".to_string(),
                    ));
                }
                let mut len_bytes = [0; 4];
                len_bytes.copy_from_slice(&bytes[..4]);
                let len = u32::from_be_bytes(len_bytes) as usize;
                if len > STRING_SIZE || bytes.len() < 4 + len {
                    return Err(DbError::InvalidArgument(
                        "string field length out of bounds".to_string(),
                    ));
                }
                let string_bytes = bytes[4..4 + len].to_vec();
                let value = String::from_utf8(string_bytes)
                    .map_err(|e| DbError::InvalidArgument(e.to_string()))?;
                Ok(FieldVal::StringField(StringField::new(value)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_round_trips() {
        let field = FieldVal::IntField(IntField::new(-7));
        let bytes = field.serialize();
        assert_eq!(Type::IntType.parse(&bytes).unwrap(), field);
    }

    #[test]
    fn string_round_trips() {
        let field = FieldVal::StringField(StringField::new("hello".to_string()));
        let bytes = field.serialize();
        assert_eq!(Type::StringType.parse(&bytes).unwrap(), field);
    }

    #[test]
    fn type_lengths() {
        assert_eq!(Type::IntType.get_len(), 4);
        assert_eq!(Type::StringType.get_len(), STRING_SIZE + 4);
    }
}
