use super::{IterState, Operator};
use crate::error::{DbError, DbResult};
use crate::fields::FieldVal;
use crate::tuple::{Tuple, TupleDesc};
use crate::types::Type;

/// Sentinel group key meaning "no grouping": every input tuple falls into
/// one group.
pub const NO_GROUPING: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
    ScAvg,
    SumCount,
}

impl AggregateOp {
    fn name(&self) -> &'static str {
        match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
            AggregateOp::ScAvg => "sc_avg",
            AggregateOp::SumCount => "sum_count",
        }
    }
}

struct Accumulator {
    running: i32,
    count: i32,
    started: bool,
}

impl Accumulator {
    fn new() -> Self {
        Accumulator {
            running: 0,
            count: 0,
            started: false,
        }
    }

    fn update(&mut self, op: AggregateOp, value: i32) {
        self.count += 1;
        if !self.started {
            self.running = value;
            self.started = true;
            return;
        }
        self.running = match op {
            AggregateOp::Min => self.running.min(value),
            AggregateOp::Max => self.running.max(value),
            AggregateOp::Sum | AggregateOp::Avg | AggregateOp::ScAvg | AggregateOp::SumCount => {
                self.running + value
            }
            AggregateOp::Count => self.running,
        };
    }

    fn finalize(&self, op: AggregateOp) -> i32 {
        match op {
            AggregateOp::Avg => {
                if self.count == 0 {
                    0
                } else {
                    self.running / self.count
                }
            }
            AggregateOp::Count => self.count,
            _ => self.running,
        }
    }
}

/// Fully materializes its child on the first `open`, grouping by `gField`
/// (or a single implicit group when `gField == NO_GROUPING`) and folding
/// `aField` through `op`.
pub struct Aggregate {
    child: Box<dyn Operator>,
    a_field: usize,
    g_field: usize,
    op: AggregateOp,
    td: TupleDesc,
    state: IterState,
    results: Vec<Tuple>,
    pos: usize,
}

impl Aggregate {
    pub fn new(child: Box<dyn Operator>, a_field: usize, g_field: usize, op: AggregateOp) -> DbResult<Self> {
        let child_td = child.tuple_desc();
        let a_type = *child_td
            .get_field_type(a_field)
            .ok_or_else(|| DbError::InvalidArgument(format!("aggregate field index {} out of range", a_field)))?;
        if a_type == Type::StringType && op != AggregateOp::Count {
            return Err(DbError::InvalidArgument(
                "STRING fields may only be aggregated with COUNT".to_string(),
            ));
        }
        let agg_name = format!(
            "{}({})",
            op.name(),
            child_td.get_field_name(a_field).cloned().unwrap_or_default()
        );
        let td = if g_field == NO_GROUPING {
            TupleDesc::new(vec![Type::IntType], vec![agg_name])
        } else {
            let g_type = *child_td
                .get_field_type(g_field)
                .ok_or_else(|| DbError::InvalidArgument(format!("group field index {} out of range", g_field)))?;
            let g_name = child_td.get_field_name(g_field).cloned().unwrap_or_default();
            TupleDesc::new(vec![g_type, Type::IntType], vec![g_name, agg_name])
        };
        Ok(Aggregate {
            child,
            a_field,
            g_field,
            op,
            td,
            state: IterState::default(),
            results: vec![],
            pos: 0,
        })
    }

    fn materialize(&mut self) -> DbResult<()> {
        // `FieldVal` has no `Hash` impl, so groups are kept as an
        // insertion-ordered association list rather than a HashMap; group
        // counts in this engine are small enough that linear lookup is fine.
        let mut groups: Vec<(Option<FieldVal>, Accumulator)> = vec![];
        let mut any_input = false;

        while self.child.has_next()? {
            any_input = true;
            let t = self.child.next()?;
            let key = if self.g_field == NO_GROUPING {
                None
            } else {
                t.get_field(self.g_field).cloned()
            };
            let value = match t.get_field(self.a_field) {
                Some(FieldVal::IntField(v)) => v.get_value(),
                Some(FieldVal::StringField(_)) => 0,
                None => 0,
            };
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, acc)) => acc.update(self.op, value),
                None => {
                    let mut acc = Accumulator::new();
                    acc.update(self.op, value);
                    groups.push((key, acc));
                }
            }
        }

        let mut results = vec![];
        if self.g_field == NO_GROUPING {
            if any_input {
                let (_, acc) = &groups[0];
                results.push(self.finalized_tuple(None, acc.finalize(self.op))?);
            } else if self.op == AggregateOp::Count {
                results.push(self.finalized_tuple(None, 0)?);
            } else {
                // Leave the aggregate field unset: a null result for an
                // empty no-grouping non-COUNT aggregate.
                results.push(Tuple::new_empty(&self.td));
            }
        } else {
            for (key, acc) in groups {
                results.push(self.finalized_tuple(key, acc.finalize(self.op))?);
            }
        }

        self.results = results;
        self.pos = 0;
        Ok(())
    }

    fn finalized_tuple(&self, key: Option<FieldVal>, value: i32) -> DbResult<Tuple> {
        let mut t = Tuple::new_empty(&self.td);
        if let Some(k) = key {
            t.set_field(0, k)?;
            t.set_field(1, FieldVal::IntField(crate::fields::IntField::new(value)))?;
        } else {
            t.set_field(0, FieldVal::IntField(crate::fields::IntField::new(value)))?;
        }
        Ok(t)
    }
}

impl Operator for Aggregate {
    fn open(&mut self) -> DbResult<()> {
        self.child.open()?;
        self.materialize()?;
        self.state.mark_open();
        Ok(())
    }

    fn has_next(&mut self) -> DbResult<bool> {
        self.state.require_open()?;
        Ok(self.pos < self.results.len())
    }

    fn next(&mut self) -> DbResult<Tuple> {
        self.state.require_open()?;
        let t = self
            .results
            .get(self.pos)
            .cloned()
            .ok_or_else(|| DbError::InvalidState("next() with no tuple available".to_string()))?;
        self.pos += 1;
        Ok(t)
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.state.require_ever_opened()?;
        self.pos = 0;
        Ok(())
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
            return Err(DbError::InvalidArgument("Aggregate takes exactly one child".to_string()));
        }
        self.close();
        self.child = children.remove(0);
        Ok(())
    }
}
