use std::sync::Arc;

use super::{IterState, Operator};
use crate::buffer_pool::BufferPool;
use crate::error::{DbError, DbResult};
use crate::fields::{FieldVal, IntField};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};
use crate::types::Type;

/// Single-shot operator: on its first `next()` call, drains `child`
/// completely, inserting every tuple it produces into `table_id` via the
/// buffer pool, then yields one `(rowsAffected: INT)` tuple. Every call
/// after that yields nothing, matching a statement that can run once.
pub struct Insert {
    tid: TransactionId,
    buffer_pool: Arc<BufferPool>,
    table_id: usize,
    child: Box<dyn Operator>,
    td: TupleDesc,
    state: IterState,
    done: bool,
}

impl Insert {
    pub fn new(tid: TransactionId, buffer_pool: Arc<BufferPool>, table_id: usize, child: Box<dyn Operator>) -> Self {
        Insert {
            tid,
            buffer_pool,
            table_id,
            child,
            td: TupleDesc::new(vec![Type::IntType], vec!["rowsAffected".to_string()]),
            state: IterState::default(),
            done: false,
        }
    }
}

impl Operator for Insert {
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
            return Err(DbError::InvalidState("Insert has already produced its result".to_string()));
        }
        let mut count = 0i32;
        while self.child.has_next()? {
            let t = self.child.next()?;
            self.buffer_pool.insert_tuple(self.tid, self.table_id, t)?;
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
            return Err(DbError::InvalidArgument("Insert takes exactly one child".to_string()));
        }
        self.close();
        self.child = children.remove(0);
        Ok(())
    }
}
