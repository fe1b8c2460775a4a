use super::{IterState, Lookahead, Operator, Predicate};
use crate::error::{DbError, DbResult};
use crate::tuple::{Tuple, TupleDesc};

/// Streams its child's tuples, passing through only those for which the
/// predicate holds. Schema is unchanged from the child.
pub struct Filter {
    pred: Predicate,
    child: Box<dyn Operator>,
    state: IterState,
    lookahead: Lookahead,
}

impl Filter {
    pub fn new(pred: Predicate, child: Box<dyn Operator>) -> Self {
        Filter {
            pred,
            child,
            state: IterState::default(),
            lookahead: Lookahead::default(),
        }
    }

    fn fill(&mut self) -> DbResult<()> {
        if !self.lookahead.is_empty() {
            return Ok(());
        }
        while self.child.has_next()? {
            let t = self.child.next()?;
            if self.pred.filter(&t)? {
                self.lookahead.set(t);
                break;
            }
        }
        Ok(())
    }
}

impl Operator for Filter {
    fn open(&mut self) -> DbResult<()> {
        self.child.open()?;
        self.state.mark_open();
        Ok(())
    }

    fn has_next(&mut self) -> DbResult<bool> {
        self.state.require_open()?;
        self.fill()?;
        Ok(self.lookahead.has_next())
    }

    fn next(&mut self) -> DbResult<Tuple> {
        self.state.require_open()?;
        self.fill()?;
        self.lookahead.take()
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.state.require_ever_opened()?;
        self.lookahead.clear();
        self.child.rewind()
    }

    fn close(&mut self) {
        self.state.mark_closed();
        self.lookahead.clear();
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        self.child.tuple_desc()
    }

    fn children(&self) -> Vec<&dyn Operator> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn Operator>>) -> DbResult<()> {
        if children.len() != 1 {
            return Err(DbError::InvalidArgument("Filter takes exactly one child".to_string()));
        }
        self.close();
        self.child = children.remove(0);
        Ok(())
    }
}
