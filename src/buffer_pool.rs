use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use log::debug;

use crate::catalog::Catalog;
use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::heap_page::{HeapPage, Permission};
use crate::lock_manager::LockManager;
use crate::page_id::PageId;
use crate::transaction::TransactionId;
use crate::tuple::Tuple;

struct PageCache {
    pages: HashMap<PageId, Arc<RwLock<HeapPage>>>,
    /// Least-recently-used order, front = least recent.
    lru: VecDeque<PageId>,
}

impl PageCache {
    fn touch(&mut self, pid: PageId) {
        self.lru.retain(|p| *p != pid);
        self.lru.push_back(pid);
    }
}

/// Bounded page cache and the exclusive gateway to on-disk pages. Every
/// tuple read or write flows through here: it acquires the matching page
/// lock, serves from cache or loads via the catalog's `HeapFile`, and
/// evicts under a strict NO-STEAL policy (never write back a page dirtied
/// by a transaction that hasn't committed).
pub struct BufferPool {
    catalog: Arc<Catalog>,
    max_pages: usize,
    cache: Mutex<PageCache>,
    lock_manager: LockManager,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>, config: &DbConfig) -> Self {
        BufferPool {
            catalog,
            max_pages: config.max_pages,
            cache: Mutex::new(PageCache {
                pages: HashMap::new(),
                lru: VecDeque::new(),
            }),
            lock_manager: LockManager::new(config.lock_timeout_min_ms, config.lock_timeout_max_ms),
        }
    }

    pub fn get_page(&self, tid: TransactionId, pid: PageId, perm: Permission) -> DbResult<Arc<RwLock<HeapPage>>> {
        self.lock_manager.acquire(tid, pid, perm == Permission::Write)?;

        let mut cache = self.cache.lock().unwrap();
        if let Some(page) = cache.pages.get(&pid) {
            let page = Arc::clone(page);
            cache.touch(pid);
            return Ok(page);
        }

        if cache.pages.len() >= self.max_pages {
            self.evict_one(&mut cache)?;
        }

        let file = self.catalog.file_of(pid.get_table_id())?;
        let page = file.read_page(pid)?;
        cache.pages.insert(pid, Arc::new(RwLock::new(page)));
        cache.touch(pid);
        Ok(Arc::clone(cache.pages.get(&pid).unwrap()))
    }

    /// Evicts the least-recently-used clean page. Fails with `Internal`
    /// if every resident page is dirty: writing one back would violate
    /// NO-STEAL.
    fn evict_one(&self, cache: &mut PageCache) -> DbResult<()> {
        let victim = cache
            .lru
            .iter()
            .find(|pid| !cache.pages.get(pid).unwrap().read().unwrap().is_dirty())
            .copied();
        match victim {
            Some(pid) => {
                cache.pages.remove(&pid);
                cache.lru.retain(|p| *p != pid);
                debug!("evicted page {:?}", pid);
                Ok(())
            }
            None => Err(DbError::Internal(
                "no clean page available to evict under NO-STEAL".to_string(),
            )),
        }
    }

    pub fn add_empty_page(&self, tid: TransactionId, table_id: usize) -> DbResult<Arc<RwLock<HeapPage>>> {
        let file = self.catalog.file_of(table_id)?;
        let page_no = file.add_page()?;
        let pid = PageId::new(table_id, page_no);
        self.get_page(tid, pid, Permission::Write)
    }

    pub fn insert_tuple(&self, tid: TransactionId, table_id: usize, tuple: Tuple) -> DbResult<()> {
        let file = self.catalog.file_of(table_id)?;
        file.insert_tuple(tid, tuple, self)?;
        Ok(())
    }

    pub fn delete_tuple(&self, tid: TransactionId, tuple: &mut Tuple) -> DbResult<()> {
        let rid = tuple
            .get_record_id()
            .ok_or_else(|| DbError::InvalidArgument("tuple has no record id".to_string()))?;
        let file = self.catalog.file_of(rid.get_page_id().get_table_id())?;
        file.delete_tuple(tid, tuple, self)?;
        Ok(())
    }

    /// On commit, flushes every page `tid` dirtied and clears its dirty
    /// mark. On abort, discards every page `tid` dirtied so the next read
    /// re-loads the pre-transaction bytes from disk. Either way, releases
    /// all of `tid`'s locks.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> DbResult<()> {
        let locked_pages = self.lock_manager.locked_pages(tid);
        let mut cache = self.cache.lock().unwrap();
        for pid in locked_pages {
            if let Some(page) = cache.pages.get(&pid).cloned() {
                let mut page = page.write().unwrap();
                if page.dirtied_by() == Some(tid) {
                    if commit {
                        let file = self.catalog.file_of(pid.get_table_id())?;
                        file.write_page(&page)?;
                        page.mark_dirty(false, tid);
                        page.set_before_image();
                    } else {
                        drop(page);
                        cache.pages.remove(&pid);
                        cache.lru.retain(|p| *p != pid);
                    }
                }
            }
        }
        drop(cache);
        self.lock_manager.release_all(tid);
        Ok(())
    }

    /// Writes every dirty page to disk, regardless of owning transaction.
    /// Used for shutdown and test teardown, not part of the transactional
    /// contract.
    pub fn flush_all_pages(&self) -> DbResult<()> {
        let cache = self.cache.lock().unwrap();
        for (pid, page) in cache.pages.iter() {
            let mut page = page.write().unwrap();
            if page.is_dirty() {
                let file = self.catalog.file_of(pid.get_table_id())?;
                file.write_page(&page)?;
                page.mark_dirty(false, TransactionId::new());
                page.set_before_image();
            }
        }
        Ok(())
    }

    pub fn discard_page(&self, pid: PageId) {
        let mut cache = self.cache.lock().unwrap();
        cache.pages.remove(&pid);
        cache.lru.retain(|p| *p != pid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> Option<Permission> {
        self.lock_manager.holds(tid, pid)
    }

    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid);
    }

    pub fn num_cached_pages(&self) -> usize {
        self.cache.lock().unwrap().pages.len()
    }
}
