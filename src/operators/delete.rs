use std::sync::Arc;

use super::{IterState, Operator};
use crate::buffer_pool::BufferPool;
use crate::error::{DbError, DbResult};
use crate::fields::{FieldVal, IntField};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::types::Type;

/// Single-shot operator, symmetric to `Insert`: drains `child` and deletes
/// every tuple it produces (by record id) via the buffer pool, yielding one
/// `(rowsAffected: INT)` tuple.
pub struct Delete {
    tid: TransactionId,
    buffer_pool: Arc<BufferPool>,
    child: Box<dyn Operator>,
    td: TupleDesc,
    state: IterState,
    done: bool,
}

impl Delete {
    pub fn new(tid: TransactionId, buffer_pool: Arc<BufferPool>, child: Box<dyn Operator>) -> Self {
        Delete {
            tid,
            buffer_pool,
            child,
            td: TupleDesc::new(vec![Type::IntType], vec!["rowsAffected".to_string()]),
            state: IterState::default(),
            done: false,
        }
    }
}

impl Operator for Delete {
    fn open(&mut self) -> DbResult<()> {
        self.child.open()?;
        self.done = false;
        self.state.mark_open();
        Ok(())
    }

    fn has_next(&mut self) -> DbResult<bool> {
        self.state.require_open()?;
        Ok(!self.done)
    }

    fn next(&mut self) -> DbResult<Tuple> {
        self.state.require_open()?;
        if self.done {
            return Err(DbError::InvalidState("Delete has already produced its result".to_string()));
        }
        let mut count = 0i32;
        while self.child.has_next()? {
            let mut t = self.child.next()?;
            self.buffer_pool.delete_tuple(self.tid, &mut t)?;
            count += 1;
        }
        self.done = true;
        Ok(Tuple::new(vec![FieldVal::IntField(IntField::new(count))], &self.td))
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.state.require_ever_opened()?;
        self.done = false;
        self.child.rewind()
    }

    fn close(&mut self) {
        self.state.mark_closed();
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    fn children(&self) -> Vec<&dyn Operator> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn Operator>>) -> DbResult<()> {
        if children.len() != 1 {
            return Err(DbError::InvalidArgument("Delete takes exactly one child".to_string()));
        }
        self.close();
        self.child = children.remove(0);
        Ok(())
    }
}
