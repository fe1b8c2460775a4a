use super::{IterState, JoinPredicate, Lookahead, Operator};
use crate::error::{DbError, DbResult};
use crate::tuple::{Tuple, TupleDesc};

/// Naive nested-loop join: for each outer (left) tuple, rewinds the inner
/// (right) child and scans it fully. Output schema is `merge(left, right)`.
pub struct Join {
    pred: JoinPredicate,
    left: Box<dyn Operator>,
    right: Box<dyn Operator>,
    td: TupleDesc,
    state: IterState,
    lookahead: Lookahead,
    current_left: Option<Tuple>,
}

impl Join {
    pub fn new(pred: JoinPredicate, left: Box<dyn Operator>, right: Box<dyn Operator>) -> Self {
        let td = TupleDesc::merge(left.tuple_desc(), right.tuple_desc());
        Join {
            pred,
            left,
            right,
            td,
            state: IterState::default(),
            lookahead: Lookahead::default(),
            current_left: None,
        }
    }

    /// Advances the outer tuple, rewinding the inner child for it.
    fn advance_outer(&mut self) -> DbResult<bool> {
        if !self.left.has_next()? {
            self.current_left = None;
            return Ok(false);
        }
        self.current_left = Some(self.left.next()?);
        self.right.rewind()?;
        Ok(true)
    }

    fn fill(&mut self) -> DbResult<()> {
        if !self.lookahead.is_empty() {
            return Ok(());
        }
        loop {
            if self.current_left.is_none() && !self.advance_outer()? {
                return Ok(());
            }
            let left = self.current_left.clone().unwrap();
            loop {
                if !self.right.has_next()? {
                    break;
                }
                let right = self.right.next()?;
                if self.pred.filter(&left, &right)? {
                    let mut merged_fields = left.get_fields();
                    merged_fields.extend(right.get_fields());
                    let mut merged = Tuple::new_empty(&self.td);
                    for (i, f) in merged_fields.into_iter().enumerate() {
                        if let Some(f) = f {
                            merged.set_field(i, f)?;
                        }
                    }
                    self.lookahead.set(merged);
                    return Ok(());
                }
            }
            if !self.advance_outer()? {
                return Ok(());
            }
        }
    }
}

impl Operator for Join {
    fn open(&mut self) -> DbResult<()> {
        self.left.open()?;
        self.right.open()?;
        self.current_left = None;
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
        self.current_left = None;
        self.left.rewind()
    }

    fn close(&mut self) {
        self.state.mark_closed();
        self.lookahead.clear();
        self.current_left = None;
        self.left.close();
        self.right.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    fn children(&self) -> Vec<&dyn Operator> {
        vec![self.left.as_ref(), self.right.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn Operator>>) -> DbResult<()> {
        if children.len() != 2 {
            return Err(DbError::InvalidArgument("Join takes exactly two children".to_string()));
        }
        self.close();
        self.right = children.remove(1);
        self.left = children.remove(0);
        self.td = TupleDesc::merge(self.left.tuple_desc(), self.right.tuple_desc());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldVal, IntField};
    use crate::operators::CompareOp;
    use crate::types::Type;

    struct VecScan {
        td: TupleDesc,
        rows: Vec<Tuple>,
        pos: usize,
    }

    impl VecScan {
        fn new(values: Vec<i32>) -> Self {
            let td = TupleDesc::new(vec![Type::IntType], vec!["a".into()]);
            let rows = values
                .into_iter()
                .map(|v| Tuple::new(vec![FieldVal::IntField(IntField::new(v))], &td))
                .collect();
            VecScan { td, rows, pos: 0 }
        }
    }

    impl Operator for VecScan {
        fn open(&mut self) -> DbResult<()> {
            self.pos = 0;
            Ok(())
        }
        fn has_next(&mut self) -> DbResult<bool> {
            Ok(self.pos < self.rows.len())
        }
        fn next(&mut self) -> DbResult<Tuple> {
            let t = self.rows[self.pos].clone();
            self.pos += 1;
            Ok(t)
        }
        fn rewind(&mut self) -> DbResult<()> {
            self.pos = 0;
            Ok(())
        }
        fn close(&mut self) {}
        fn tuple_desc(&self) -> &TupleDesc {
            &self.td
        }
        fn children(&self) -> Vec<&dyn Operator> {
            vec![]
        }
        fn set_children(&mut self, _children: Vec<Box<dyn Operator>>) -> DbResult<()> {
            Ok(())
        }
    }

    #[test]
    fn equi_join_pairs_matching_rows() {
        let left = Box::new(VecScan::new(vec![1, 2, 3]));
        let right = Box::new(VecScan::new(vec![2, 3, 4]));
        let pred = JoinPredicate::new(0, CompareOp::Equals, 0);
        let mut join = Join::new(pred, left, right);
        join.open().unwrap();
        let mut results = vec![];
        while join.has_next().unwrap() {
            let t = join.next().unwrap();
            let l = t.get_field(0).unwrap().clone().into_int().unwrap().get_value();
            let r = t.get_field(1).unwrap().clone().into_int().unwrap().get_value();
            results.push((l, r));
        }
        assert_eq!(results, vec![(2, 2), (3, 3)]);
        assert_eq!(join.tuple_desc().arity(), 2);
    }

    #[test]
    fn no_matches_yields_no_rows() {
        let left = Box::new(VecScan::new(vec![1]));
        let right = Box::new(VecScan::new(vec![2]));
        let pred = JoinPredicate::new(0, CompareOp::Equals, 0);
        let mut join = Join::new(pred, left, right);
        join.open().unwrap();
        assert!(!join.has_next().unwrap());
    }
}
