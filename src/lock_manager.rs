use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::error::{DbError, DbResult};
use crate::heap_page::Permission;
use crate::page_id::PageId;
use crate::transaction::TransactionId;

#[derive(Default)]
struct PageLockState {
    readers: HashSet<TransactionId>,
    writer: Option<TransactionId>,
    writers_waiting: usize,
}

struct PageLock {
    state: Mutex<PageLockState>,
    no_readers: Condvar,
    no_writers: Condvar,
}

impl PageLock {
    fn new() -> Self {
        PageLock {
            state: Mutex::new(PageLockState::default()),
            no_readers: Condvar::new(),
            no_writers: Condvar::new(),
        }
    }
}

/// Page-granularity two-phase lock manager. Each page gets its own mutex
/// and pair of condition variables rather than a single global
/// readers-writer lock, so that an upgrade (shared -> exclusive) and
/// writer-priority signalling can both be expressed precisely.
pub struct LockManager {
    pages: Mutex<HashMap<PageId, Arc<PageLock>>>,
    held_by_tid: Mutex<HashMap<TransactionId, HashSet<PageId>>>,
    timeout_min_ms: u64,
    timeout_max_ms: u64,
}

impl LockManager {
    pub fn new(timeout_min_ms: u64, timeout_max_ms: u64) -> Self {
        LockManager {
            pages: Mutex::new(HashMap::new()),
            held_by_tid: Mutex::new(HashMap::new()),
            timeout_min_ms,
            timeout_max_ms,
        }
    }

    fn page_lock(&self, pid: PageId) -> Arc<PageLock> {
        let mut pages = self.pages.lock().unwrap();
        Arc::clone(pages.entry(pid).or_insert_with(|| Arc::new(PageLock::new())))
    }

    fn record_held(&self, tid: TransactionId, pid: PageId) {
        let mut held = self.held_by_tid.lock().unwrap();
        held.entry(tid).or_insert_with(HashSet::new).insert(pid);
    }

    fn forget_held(&self, tid: TransactionId, pid: PageId) {
        let mut held = self.held_by_tid.lock().unwrap();
        if let Some(pages) = held.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                held.remove(&tid);
            }
        }
    }

    fn random_timeout(&self) -> Duration {
        let millis = if self.timeout_min_ms >= self.timeout_max_ms {
            self.timeout_min_ms
        } else {
            rand::thread_rng().gen_range(self.timeout_min_ms..=self.timeout_max_ms)
        };
        Duration::from_millis(millis)
    }

    /// Blocks until `tid` holds `mode` on `pid`, or fails with
    /// `TransactionAborted` once this attempt's randomized timeout
    /// elapses without the lock becoming grantable.
    pub fn acquire(&self, tid: TransactionId, pid: PageId, exclusive: bool) -> DbResult<()> {
        let page_lock = self.page_lock(pid);
        let deadline = Instant::now() + self.random_timeout();

        let mut state = page_lock.state.lock().unwrap();
        let mut counted_as_waiting_writer = false;

        loop {
            if exclusive {
                let grantable = state.writer.is_none()
                    && (state.readers.is_empty()
                        || (state.readers.len() == 1 && state.readers.contains(&tid)));
                if grantable {
                    state.readers.remove(&tid);
                    state.writer = Some(tid);
                    if counted_as_waiting_writer {
                        state.writers_waiting -= 1;
                    }
                    break;
                }
                if !counted_as_waiting_writer {
                    state.writers_waiting += 1;
                    counted_as_waiting_writer = true;
                }
                let now = Instant::now();
                if now >= deadline {
                    state.writers_waiting -= 1;
                    return Err(DbError::TransactionAborted(tid));
                }
                let (guard, result) = page_lock.no_readers.wait_timeout(state, deadline - now).unwrap();
                state = guard;
                if result.timed_out() {
                    let grantable_now = state.writer.is_none()
                        && (state.readers.is_empty()
                            || (state.readers.len() == 1 && state.readers.contains(&tid)));
                    if !grantable_now {
                        state.writers_waiting -= 1;
                        return Err(DbError::TransactionAborted(tid));
                    }
                }
            } else {
                let grantable = state.readers.contains(&tid)
                    || state.writer == Some(tid)
                    || (state.writer.is_none() && state.writers_waiting == 0);
                if grantable {
                    state.readers.insert(tid);
                    break;
                }
                let now = Instant::now();
                if now >= deadline {
                    return Err(DbError::TransactionAborted(tid));
                }
                let (guard, result) = page_lock.no_writers.wait_timeout(state, deadline - now).unwrap();
                state = guard;
                if result.timed_out() {
                    let grantable_now = state.readers.contains(&tid)
                        || state.writer == Some(tid)
                        || (state.writer.is_none() && state.writers_waiting == 0);
                    if !grantable_now {
                        return Err(DbError::TransactionAborted(tid));
                    }
                }
            }
        }
        drop(state);
        self.record_held(tid, pid);
        Ok(())
    }

    /// Releases any mode `tid` holds on `pid`. No-op if it holds none.
    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let page_lock = {
            let pages = self.pages.lock().unwrap();
            match pages.get(&pid) {
                Some(p) => Arc::clone(p),
                None => return,
            }
        };
        {
            let mut state = page_lock.state.lock().unwrap();
            if state.writer == Some(tid) {
                state.writer = None;
                page_lock.no_readers.notify_all();
                page_lock.no_writers.notify_all();
            } else if state.readers.remove(&tid) {
                if state.readers.len() <= 1 {
                    page_lock.no_readers.notify_all();
                }
            }
        }
        self.forget_held(tid, pid);
    }

    pub fn release_all(&self, tid: TransactionId) {
        let pages: Vec<PageId> = {
            let held = self.held_by_tid.lock().unwrap();
            held.get(&tid).map(|p| p.iter().copied().collect()).unwrap_or_default()
        };
        for pid in pages {
            self.release(tid, pid);
        }
    }

    pub fn holds(&self, tid: TransactionId, pid: PageId) -> Option<Permission> {
        let pages = self.pages.lock().unwrap();
        let page_lock = pages.get(&pid)?;
        let state = page_lock.state.lock().unwrap();
        if state.writer == Some(tid) {
            Some(Permission::Write)
        } else if state.readers.contains(&tid) {
            Some(Permission::Read)
        } else {
            None
        }
    }

    pub fn is_exclusively_locked(&self, pid: PageId) -> bool {
        let pages = self.pages.lock().unwrap();
        match pages.get(&pid) {
            Some(page_lock) => page_lock.state.lock().unwrap().writer.is_some(),
            None => false,
        }
    }

    pub fn locked_pages(&self, tid: TransactionId) -> HashSet<PageId> {
        let held = self.held_by_tid.lock().unwrap();
        held.get(&tid).cloned().unwrap_or_default()
    }
}
