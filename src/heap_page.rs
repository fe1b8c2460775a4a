use crate::error::{DbError, DbResult};
use crate::page_id::{PageId, RecordId};
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};

/// The mode a caller wants a page locked in.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Copy)]
pub enum Permission {
    Read,
    Write,
}

/// Slotted-page format over a fixed-size byte block: a bitmap header
/// (1 bit per slot, LSB-first within each byte, set iff occupied) followed
/// by `num_slots * tuple_size` bytes of payload, zero-padded to
/// `page_size` (spec §3).
#[derive(Debug, Clone)]
pub struct HeapPage {
    pid: PageId,
    td: TupleDesc,
    page_size: usize,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    num_slots: usize,
    before_image: Vec<u8>,
    dirtied_by: Option<TransactionId>,
}

impl PartialEq for HeapPage {
    fn eq(&self, other: &Self) -> bool {
        self.pid == other.pid && self.td == other.td && self.get_page_data() == other.get_page_data()
    }
}

impl HeapPage {
    /// `num_slots = floor(page_size * 8 / (tuple_size * 8 + 1))`, per spec
    /// §3's HeapPage layout.
    pub fn num_slots_for(page_size: usize, tuple_size: usize) -> usize {
        (page_size * 8) / (tuple_size * 8 + 1)
    }

    fn header_bytes_for(num_slots: usize) -> usize {
        (num_slots + 7) / 8
    }

    pub fn new(pid: PageId, data: &[u8], td: TupleDesc, page_size: usize) -> DbResult<Self> {
        if data.len() != page_size {
            return Err(DbError::InvalidArgument(format!(
                "page data is {} bytes, expected {}",
                data.len(),
                page_size
            )));
        }
        let num_slots = Self::num_slots_for(page_size, td.get_size());
        let header_size = Self::header_bytes_for(num_slots);
        let header = data[..header_size].to_vec();

        let mut tuples = Vec::with_capacity(num_slots);
        for i in 0..num_slots {
            if Self::get_slot(&header, i) {
                let start = header_size + i * td.get_size();
                let end = start + td.get_size();
                let mut tuple = Tuple::deserialize(&data[start..end], &td)?;
                tuple.set_record_id(RecordId::new(pid, i));
                tuples.push(Some(tuple));
            } else {
                tuples.push(None);
            }
        }

        Ok(HeapPage {
            pid,
            td,
            page_size,
            header,
            tuples,
            num_slots,
            before_image: data.to_vec(),
            dirtied_by: None,
        })
    }

    /// An all-zero page of the given shape, as produced by
    /// `HeapFile::add_page` before anything has been written to it.
    pub fn empty_data(page_size: usize) -> Vec<u8> {
        vec![0; page_size]
    }

    pub fn get_id(&self) -> PageId {
        self.pid
    }

    pub fn get_tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    /// The page's bytes as of the last `set_before_image` call (or as
    /// loaded from disk, if never called) reconstructed as a `HeapPage`.
    /// Used by the buffer pool to roll back an aborted transaction's
    /// still-resident dirty page without a disk round trip.
    pub fn get_before_image(&self) -> DbResult<HeapPage> {
        HeapPage::new(self.pid, &self.before_image, self.td.clone(), self.page_size)
    }

    pub fn set_before_image(&mut self) {
        self.before_image = self.get_page_data();
    }

    pub fn get_page_data(&self) -> Vec<u8> {
        let mut data = self.header.clone();
        for i in 0..self.num_slots {
            match &self.tuples[i] {
                Some(t) => data.extend(t.serialize()),
                None => data.extend(vec![0; self.td.get_size()]),
            }
        }
        data.extend(vec![0; self.page_size - data.len()]);
        data
    }

    fn get_slot(header: &[u8], i: usize) -> bool {
        let idx = i / 8;
        let bit = i % 8;
        if idx >= header.len() {
            return false;
        }
        header[idx] & (1 << bit) != 0
    }

    fn set_slot(header: &mut [u8], i: usize, value: bool) {
        let idx = i / 8;
        let bit = i % 8;
        if value {
            header[idx] |= 1 << bit;
        } else {
            header[idx] &= !(1 << bit);
        }
    }

    /// Inserts `t` into the first empty slot, stamping its schema and
    /// record id. Fails with `Internal` if the page has no room, or
    /// `InvalidArgument` if `t`'s schema doesn't match the page's.
    pub fn insert_tuple(&mut self, mut t: Tuple) -> DbResult<()> {
        if t.get_tuple_desc() != &self.td {
            return Err(DbError::InvalidArgument(
                "tuple schema does not match page schema".to_string(),
            ));
        }
        for i in 0..self.num_slots {
            if !Self::get_slot(&self.header, i) {
                t.set_record_id(RecordId::new(self.pid, i));
                self.tuples[i] = Some(t);
                Self::set_slot(&mut self.header, i, true);
                return Ok(());
            }
        }
        Err(DbError::Internal("page is full".to_string()))
    }

    /// Removes the tuple named by `t`'s own record id and clears it on
    /// `t` (spec §3: a deleted tuple's RecordId is cleared). Fails if the
    /// tuple isn't on this page, or its slot is already empty.
    pub fn delete_tuple(&mut self, t: &mut Tuple) -> DbResult<()> {
        let rid = t
            .get_record_id()
            .ok_or_else(|| DbError::Internal("tuple has no record id".to_string()))?;
        if rid.get_page_id() != self.pid {
            return Err(DbError::Internal("tuple not on this page".to_string()));
        }
        let slot = rid.get_slot();
        if slot >= self.num_slots || !Self::get_slot(&self.header, slot) {
            return Err(DbError::Internal("tuple slot already empty".to_string()));
        }
        self.tuples[slot] = None;
        Self::set_slot(&mut self.header, slot, false);
        t.clear_record_id();
        Ok(())
    }

    pub fn get_num_empty_slots(&self) -> usize {
        (0..self.num_slots)
            .filter(|&i| !Self::get_slot(&self.header, i))
            .count()
    }

    pub fn is_slot_used(&self, i: usize) -> bool {
        Self::get_slot(&self.header, i)
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        self.dirtied_by = if dirty { Some(tid) } else { None };
    }

    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtied_by.is_some()
    }

    pub fn iter(&self) -> HeapPageIterator {
        HeapPageIterator {
            page: self,
            index: 0,
        }
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }
}

/// Lazy sequence of occupied tuples in ascending slot order.
pub struct HeapPageIterator<'a> {
    page: &'a HeapPage,
    index: usize,
}

impl<'a> Iterator for HeapPageIterator<'a> {
    type Item = &'a Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.page.num_slots {
            let i = self.index;
            self.index += 1;
            if let Some(t) = &self.page.tuples[i] {
                return Some(t);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldVal, IntField};
    use crate::types::Type;

    fn desc() -> TupleDesc {
        TupleDesc::new(vec![Type::IntType, Type::IntType], vec!["a".into(), "b".into()])
    }

    #[test]
    fn round_trips_through_page_data() {
        let td = desc();
        let page_size = 4096;
        let data = HeapPage::empty_data(page_size);
        let mut page = HeapPage::new(PageId::new(1, 0), &data, td.clone(), page_size).unwrap();
        page.insert_tuple(Tuple::new(
            vec![FieldVal::IntField(IntField::new(1)), FieldVal::IntField(IntField::new(2))],
            &td,
        ))
        .unwrap();
        let bytes = page.get_page_data();
        let page2 = HeapPage::new(PageId::new(1, 0), &bytes, td, page_size).unwrap();
        assert_eq!(page, page2);
    }

    #[test]
    fn empty_plus_used_slots_equals_num_slots() {
        let td = desc();
        let page_size = 4096;
        let data = HeapPage::empty_data(page_size);
        let mut page = HeapPage::new(PageId::new(1, 0), &data, td.clone(), page_size).unwrap();
        page.insert_tuple(Tuple::new(
            vec![FieldVal::IntField(IntField::new(1)), FieldVal::IntField(IntField::new(2))],
            &td,
        ))
        .unwrap();
        let used = (0..page.num_slots()).filter(|&i| page.is_slot_used(i)).count();
        assert_eq!(page.get_num_empty_slots() + used, page.num_slots());
    }

    #[test]
    fn insert_then_iterate_in_slot_order() {
        let td = desc();
        let page_size = 4096;
        let data = HeapPage::empty_data(page_size);
        let mut page = HeapPage::new(PageId::new(1, 0), &data, td.clone(), page_size).unwrap();
        for i in 0..3 {
            page.insert_tuple(Tuple::new(
                vec![FieldVal::IntField(IntField::new(i)), FieldVal::IntField(IntField::new(i))],
                &td,
            ))
            .unwrap();
        }
        let values: Vec<i32> = page
            .iter()
            .map(|t| t.get_field(0).unwrap().clone().into_int().unwrap().get_value())
            .collect();
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[test]
    fn delete_clears_slot_and_record_id() {
        let td = desc();
        let page_size = 4096;
        let data = HeapPage::empty_data(page_size);
        let mut page = HeapPage::new(PageId::new(1, 0), &data, td.clone(), page_size).unwrap();
        page.insert_tuple(Tuple::new(
            vec![FieldVal::IntField(IntField::new(1)), FieldVal::IntField(IntField::new(2))],
            &td,
        ))
        .unwrap();
        let mut t = page.iter().next().unwrap().clone();
        page.delete_tuple(&mut t).unwrap();
        assert_eq!(page.get_num_empty_slots(), page.num_slots());
        assert!(t.get_record_id().is_none());
        assert!(page.delete_tuple(&mut t).is_err());
    }

    #[test]
    fn full_page_rejects_insert() {
        let td = desc();
        let page_size = 4096;
        let data = HeapPage::empty_data(page_size);
        let mut page = HeapPage::new(PageId::new(1, 0), &data, td.clone(), page_size).unwrap();
        let n = page.num_slots();
        for i in 0..n {
            page.insert_tuple(Tuple::new(
                vec![
                    FieldVal::IntField(IntField::new(i as i32)),
                    FieldVal::IntField(IntField::new(i as i32)),
                ],
                &td,
            ))
            .unwrap();
        }
        let err = page
            .insert_tuple(Tuple::new(
                vec![FieldVal::IntField(IntField::new(0)), FieldVal::IntField(IntField::new(0))],
                &td,
            ))
            .unwrap_err();
        assert!(matches!(err, DbError::Internal(_)));
    }
}
