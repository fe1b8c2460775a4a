mod aggregate;
mod delete;
mod filter;
mod insert;
mod join;
mod predicate;
mod seq_scan;

pub use aggregate::{Aggregate, AggregateOp, NO_GROUPING};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use join::Join;
pub use predicate::{CompareOp, JoinPredicate, Predicate};
pub use seq_scan::SeqScan;

use crate::error::{DbError, DbResult};
use crate::tuple::{Tuple, TupleDesc};

/// One-tuple lookahead buffer shared by every concrete operator instead of
/// a base-class "do I have another tuple?" cache. Each operator fills it
/// by pulling from its own source when empty, then reads it via
/// `has_next`/`take`.
#[derive(Default)]
struct Lookahead {
    pending: Option<Tuple>,
}

impl Lookahead {
    fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    fn set(&mut self, t: Tuple) {
        self.pending = Some(t);
    }

    fn has_next(&self) -> bool {
        self.pending.is_some()
    }

    fn take(&mut self) -> DbResult<Tuple> {
        self.pending
            .take()
            .ok_or_else(|| DbError::InvalidState("next() with no tuple available".to_string()))
    }

    fn clear(&mut self) {
        self.pending = None;
    }
}

/// The pull-iterator contract every relational operator implements.
/// `next()` is only valid to call after `has_next()` has returned `true`
/// (or immediately after `open()`, before the first `has_next()`); calling
/// it on a never-opened or closed operator fails with `InvalidState`.
pub trait Operator {
    fn open(&mut self) -> DbResult<()>;
    fn has_next(&mut self) -> DbResult<bool>;
    fn next(&mut self) -> DbResult<Tuple>;
    fn rewind(&mut self) -> DbResult<()>;
    fn close(&mut self);
    fn tuple_desc(&self) -> &TupleDesc;
    fn children(&self) -> Vec<&dyn Operator>;
    fn set_children(&mut self, children: Vec<Box<dyn Operator>>) -> DbResult<()>;
}

/// Open/closed bookkeeping shared by every concrete operator, composed in
/// rather than provided by a base class: each operator owns one of these
/// and delegates its state checks to it.
#[derive(Default)]
struct IterState {
    ever_opened: bool,
    closed: bool,
}

impl IterState {
    fn mark_open(&mut self) {
        self.ever_opened = true;
        self.closed = false;
    }

    fn mark_closed(&mut self) {
        self.closed = true;
    }

    fn require_open(&self) -> DbResult<()> {
        if !self.ever_opened || self.closed {
            return Err(DbError::InvalidState("operator is not open".to_string()));
        }
        Ok(())
    }

    fn require_ever_opened(&self) -> DbResult<()> {
        if !self.ever_opened {
            return Err(DbError::InvalidState("rewind before first open".to_string()));
        }
        Ok(())
    }
}
