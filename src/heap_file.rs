use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, RwLock};

use crate::buffer_pool::BufferPool;
use crate::error::DbResult;
use crate::heap_page::{HeapPage, Permission};
use crate::page_id::PageId;
use crate::transaction::TransactionId;
use crate::tuple::{Tuple, TupleDesc};

/// One table's storage: a flat OS file whose length is always a multiple
/// of `page_size`, addressed by page number.
pub struct HeapFile {
    file: Mutex<File>,
    td: TupleDesc,
    table_id: usize,
    page_size: usize,
}

impl HeapFile {
    pub fn new(file: File, td: TupleDesc, table_id: usize, page_size: usize) -> Self {
        HeapFile {
            file: Mutex::new(file),
            td,
            table_id,
            page_size,
        }
    }

    pub fn get_id(&self) -> usize {
        self.table_id
    }

    pub fn get_tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    pub fn num_pages(&self) -> DbResult<usize> {
        let file = self.file.lock().unwrap();
        let len = file.metadata()?.len() as usize;
        Ok((len + self.page_size - 1) / self.page_size.max(1))
    }

    /// Reads page `pid` from disk. `pid` must name a page within the
    /// file's current extent.
    pub fn read_page(&self, pid: PageId) -> DbResult<HeapPage> {
        let mut data = vec![0; self.page_size];
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((pid.get_page_number() * self.page_size) as u64))?;
        file.read_exact(&mut data)?;
        HeapPage::new(pid, &data, self.td.clone(), self.page_size)
    }

    pub fn write_page(&self, page: &HeapPage) -> DbResult<()> {
        let pid = page.get_id();
        let data = page.get_page_data();
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((pid.get_page_number() * self.page_size) as u64))?;
        file.write_all(&data)?;
        Ok(())
    }

    /// Appends a zero-filled page and returns its page number. Serialized
    /// by the file's own mutex so concurrent appends never overlap.
    pub fn add_page(&self) -> DbResult<usize> {
        let mut file = self.file.lock().unwrap();
        let page_no = (file.metadata()?.len() as usize) / self.page_size;
        file.seek(SeekFrom::Start((page_no * self.page_size) as u64))?;
        file.write_all(&HeapPage::empty_data(self.page_size))?;
        Ok(page_no)
    }

    /// Scans pages from 0 for one with a free slot, releasing each
    /// fully-probed non-candidate page's SHARED lock immediately (this
    /// relaxes strict two-phase locking only for pages the transaction
    /// never modifies). Appends a new page if none has room. Inserts
    /// under an EXCLUSIVE lock on the chosen page and returns it.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        tuple: Tuple,
        bp: &BufferPool,
    ) -> DbResult<Arc<RwLock<HeapPage>>> {
        let mut page_no = 0;
        loop {
            let num_pages = self.num_pages()?;
            if page_no >= num_pages {
                self.add_page()?;
            }
            let pid = PageId::new(self.table_id, page_no);
            let has_room = {
                let page = bp.get_page(tid, pid, Permission::Read)?;
                let has_room = page.read().unwrap().get_num_empty_slots() > 0;
                if !has_room {
                    bp.release_page(tid, pid);
                }
                has_room
            };
            if has_room {
                let page = bp.get_page(tid, pid, Permission::Write)?;
                {
                    let mut page = page.write().unwrap();
                    page.insert_tuple(tuple)?;
                    page.mark_dirty(true, tid);
                }
                return Ok(page);
            }
            page_no += 1;
        }
    }

    /// Deletes `tuple` from the page named by its own record id.
    pub fn delete_tuple(
        &self,
        tid: TransactionId,
        tuple: &mut Tuple,
        bp: &BufferPool,
    ) -> DbResult<Arc<RwLock<HeapPage>>> {
        let rid = tuple
            .get_record_id()
            .ok_or_else(|| crate::error::DbError::InvalidArgument("tuple has no record id".to_string()))?;
        let page = bp.get_page(tid, rid.get_page_id(), Permission::Write)?;
        {
            let mut page = page.write().unwrap();
            page.delete_tuple(tuple)?;
            page.mark_dirty(true, tid);
        }
        Ok(page)
    }

    pub fn iterator(self: &Arc<Self>, tid: TransactionId, bp: Arc<BufferPool>) -> HeapFileIterator {
        HeapFileIterator {
            heap_file: Arc::clone(self),
            bp,
            tid,
            page_index: 0,
            occupied_index: 0,
            current_page: None,
        }
    }
}

/// Lazy, restartable sequence of tuples across all pages in page order.
/// Owns `Arc` handles rather than borrowing, so it can live inside an
/// operator without threading lifetimes through the operator tree.
pub struct HeapFileIterator {
    heap_file: Arc<HeapFile>,
    bp: Arc<BufferPool>,
    tid: TransactionId,
    page_index: usize,
    occupied_index: usize,
    current_page: Option<Arc<RwLock<HeapPage>>>,
}

impl HeapFileIterator {
    pub fn rewind(&mut self) {
        self.page_index = 0;
        self.occupied_index = 0;
        self.current_page = None;
    }
}

impl Iterator for HeapFileIterator {
    type Item = DbResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_page.is_none() {
                let num_pages = match self.heap_file.num_pages() {
                    Ok(n) => n,
                    Err(e) => return Some(Err(e)),
                };
                if self.page_index >= num_pages {
                    return None;
                }
                let pid = PageId::new(self.heap_file.table_id, self.page_index);
                match self.bp.get_page(self.tid, pid, Permission::Read) {
                    Ok(page) => self.current_page = Some(page),
                    Err(e) => return Some(Err(e)),
                }
                self.occupied_index = 0;
            }

            let page = self.current_page.as_ref().unwrap();
            let page_read = page.read().unwrap();
            if let Some(tuple) = page_read.iter().nth(self.occupied_index) {
                self.occupied_index += 1;
                return Some(Ok(tuple.clone()));
            }
            drop(page_read);
            self.current_page = None;
            self.page_index += 1;
        }
    }
}
