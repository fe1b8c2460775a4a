use std::cmp::Ordering;

use crate::error::{DbError, DbResult};
use crate::fields::FieldVal;
use crate::tuple::Tuple;

/// Comparison operators usable by both `Predicate` (tuple field vs.
/// constant) and `JoinPredicate` (field vs. field across two tuples).
/// Comparing fields of different types is never true except under
/// `NotEquals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
}

impl CompareOp {
    fn evaluate(&self, a: &FieldVal, b: &FieldVal) -> bool {
        match self {
            CompareOp::Equals => a == b,
            CompareOp::NotEquals => a != b,
            _ => match a.partial_cmp(b) {
                Some(Ordering::Less) => matches!(self, CompareOp::LessThan | CompareOp::LessThanOrEq),
                Some(Ordering::Equal) => {
                    matches!(self, CompareOp::LessThanOrEq | CompareOp::GreaterThanOrEq)
                }
                Some(Ordering::Greater) => {
                    matches!(self, CompareOp::GreaterThan | CompareOp::GreaterThanOrEq)
                }
                None => false,
            },
        }
    }
}

/// Filters a single tuple against one of its fields compared to a constant.
pub struct Predicate {
    field: usize,
    op: CompareOp,
    operand: FieldVal,
}

impl Predicate {
    pub fn new(field: usize, op: CompareOp, operand: FieldVal) -> Self {
        Predicate { field, op, operand }
    }

    pub fn filter(&self, t: &Tuple) -> DbResult<bool> {
        let field = t
            .get_field(self.field)
            .ok_or_else(|| DbError::InvalidArgument(format!("field index {} out of range", self.field)))?;
        Ok(self.op.evaluate(field, &self.operand))
    }
}

/// Filters a pair of tuples (left from the outer child, right from the
/// inner) by comparing one field from each.
pub struct JoinPredicate {
    left_field: usize,
    op: CompareOp,
    right_field: usize,
}

impl JoinPredicate {
    pub fn new(left_field: usize, op: CompareOp, right_field: usize) -> Self {
        JoinPredicate {
            left_field,
            op,
            right_field,
        }
    }

    pub fn filter(&self, left: &Tuple, right: &Tuple) -> DbResult<bool> {
        let l = left
            .get_field(self.left_field)
            .ok_or_else(|| DbError::InvalidArgument(format!("left field index {} out of range", self.left_field)))?;
        let r = right
            .get_field(self.right_field)
            .ok_or_else(|| DbError::InvalidArgument(format!("right field index {} out of range", self.right_field)))?;
        Ok(self.op.evaluate(l, r))
    }
}
