use std::fmt::{Display, Formatter};

use crate::error::{DbError, DbResult};
use crate::fields::FieldVal;
use crate::page_id::RecordId;
use crate::types::Type;

/// An ordered sequence of `(Type, name)` pairs describing a tuple's shape.
/// Two schemas are equal iff their arities and types match pairwise; field
/// names are not part of equality (spec §3).
#[derive(Debug, Clone)]
pub struct TupleDesc {
    types: Vec<Type>,
    fields: Vec<String>,
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
    }
}
impl Eq for TupleDesc {}

impl TupleDesc {
    pub fn new(types: Vec<Type>, fields: Vec<String>) -> Self {
        TupleDesc { types, fields }
    }

    /// Concatenates two schemas: `|merge(a,b)| = |a|+|b|`, with `a`'s
    /// fields first.
    pub fn merge(td1: &TupleDesc, td2: &TupleDesc) -> TupleDesc {
        let mut types = td1.types.clone();
        types.extend(td2.types.clone());
        let mut field_names = td1.fields.clone();
        field_names.extend(td2.fields.clone());
        TupleDesc::new(types, field_names)
    }

    pub fn arity(&self) -> usize {
        self.types.len()
    }

    // Returns the (possibly null) name of the field at the given index.
    pub fn get_field_name(&self, i: usize) -> Option<&String> {
        self.fields.get(i)
    }

    // Returns the index of the first field with the given name.
    pub fn name_to_id(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|n| n == name)
    }

    // Returns the type of the ith field of this TupleDesc.
    pub fn get_field_type(&self, i: usize) -> Option<&Type> {
        self.types.get(i)
    }

    // Return the size (in bytes) of tuples corresponding to this TupleDesc.
    pub fn get_size(&self) -> usize {
        self.types.iter().fold(0, |acc, t| acc + t.get_len())
    }
}

/// A schema reference, a mutable row of (possibly unset) field slots, and
/// an optional location on disk. Fields start out unset (`None`) until a
/// caller or `deserialize` assigns them.
#[derive(Debug, Clone)]
pub struct Tuple {
    fields: Vec<Option<FieldVal>>,
    td: TupleDesc,
    rid: Option<RecordId>,
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.td == other.td && self.fields == other.fields
    }
}

impl Display for Tuple {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i != 0 {
                write!(f, "\t")?;
            }
            match field {
                Some(FieldVal::IntField(v)) => write!(f, "{}", v.get_value())?,
                Some(FieldVal::StringField(v)) => write!(f, "{}", v.get_value())?,
                None => write!(f, "NULL")?,
            }
        }
        writeln!(f)
    }
}

impl Tuple {
    /// Builds a tuple with every slot unset. Use `set_field` to populate it.
    pub fn new_empty(td: &TupleDesc) -> Self {
        Tuple {
            fields: vec![None; td.arity()],
            td: td.clone(),
            rid: None,
        }
    }

    /// Builds a fully-populated tuple from field values in schema order.
    pub fn new(fields: Vec<FieldVal>, td: &TupleDesc) -> Self {
        Tuple {
            fields: fields.into_iter().map(Some).collect(),
            td: td.clone(),
            rid: None,
        }
    }

    pub fn get_tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    pub fn get_record_id(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn set_record_id(&mut self, rid: RecordId) {
        self.rid = Some(rid);
    }

    pub fn clear_record_id(&mut self) {
        self.rid = None;
    }

    pub fn get_field(&self, i: usize) -> Option<&FieldVal> {
        self.fields.get(i).and_then(|f| f.as_ref())
    }

    /// Sets field `i`. Fails with `InvalidArgument` if `field`'s type
    /// doesn't match the schema's declared type at that index.
    pub fn set_field(&mut self, i: usize, field: FieldVal) -> DbResult<()> {
        let expected = self
            .td
            .get_field_type(i)
            .ok_or_else(|| DbError::InvalidArgument(format!("field index {} out of range", i)))?;
        if *expected != field.get_type() {
            return Err(DbError::InvalidArgument(format!(
                "field {} expects {:?} but got {:?}",
                i,
                expected,
                field.get_type()
            )));
        }
        self.fields[i] = Some(field);
        Ok(())
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = vec![];
        for (i, field) in self.fields.iter().enumerate() {
            match field {
                Some(f) => bytes.extend(f.serialize()),
                None => bytes.extend(vec![0; self.td.get_field_type(i).unwrap().get_len()]),
            }
        }
        bytes
    }

    pub fn deserialize(bytes: &[u8], td: &TupleDesc) -> DbResult<Self> {
        let mut offset = 0;
        let mut fields = vec![];
        for t in td.types.iter() {
            let field = t.parse(&bytes[offset..])?;
            offset += t.get_len();
            fields.push(field);
        }
        Ok(Tuple::new(fields, td))
    }

    pub fn get_fields(&self) -> Vec<Option<FieldVal>> {
        self.fields.clone()
    }
}
