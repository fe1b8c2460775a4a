use std::sync::Arc;

use super::{IterState, Lookahead, Operator};
use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::error::{DbError, DbResult};
use crate::heap_file::{HeapFile, HeapFileIterator};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};

/// Leaf operator: projects a table's HeapFile iterator, renaming every
/// field to `alias.originalName`. Field types are unchanged.
pub struct SeqScan {
    tid: TransactionId,
    table_id: usize,
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
    td: TupleDesc,
    state: IterState,
    lookahead: Lookahead,
    file: Option<Arc<HeapFile>>,
    iter: Option<HeapFileIterator>,
}

impl SeqScan {
    pub fn new(
        tid: TransactionId,
        table_id: usize,
        alias: &str,
        catalog: Arc<Catalog>,
        buffer_pool: Arc<BufferPool>,
    ) -> DbResult<Self> {
        let base = catalog.schema_of(table_id)?;
        let names: Vec<String> = (0..base.arity())
            .map(|i| format!("{}.{}", alias, base.get_field_name(i).cloned().unwrap_or_default()))
            .collect();
        let types = (0..base.arity()).map(|i| *base.get_field_type(i).unwrap()).collect();
        Ok(SeqScan {
            tid,
            table_id,
            catalog,
            buffer_pool,
            td: TupleDesc::new(types, names),
            state: IterState::default(),
            lookahead: Lookahead::default(),
            file: None,
            iter: None,
        })
    }

    fn fill(&mut self) -> DbResult<()> {
        if !self.lookahead.is_empty() {
            return Ok(());
        }
        if let Some(iter) = self.iter.as_mut() {
            if let Some(t) = iter.next().transpose()? {
                self.lookahead.set(t);
            }
        }
        Ok(())
    }
}

impl Operator for SeqScan {
    fn open(&mut self) -> DbResult<()> {
        let file = self.catalog.file_of(self.table_id)?;
        self.iter = Some(file.iterator(self.tid, Arc::clone(&self.buffer_pool)));
        self.file = Some(file);
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
        if let Some(iter) = self.iter.as_mut() {
            iter.rewind();
        }
        Ok(())
    }

    fn close(&mut self) {
        self.state.mark_closed();
        self.lookahead.clear();
        self.iter = None;
        self.file = None;
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    fn children(&self) -> Vec<&dyn Operator> {
        vec![]
    }

    fn set_children(&mut self, children: Vec<Box<dyn Operator>>) -> DbResult<()> {
        if !children.is_empty() {
            return Err(DbError::InvalidArgument("SeqScan takes no children".to_string()));
        }
        self.close();
        Ok(())
    }
}
