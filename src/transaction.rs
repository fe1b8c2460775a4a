use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque, process-unique transaction identifier. Value equality suffices;
/// the ordering derived below is used only to break upgrade ties in the
/// lock manager, not exposed as a semantic guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId {
    tid: u64,
}

impl TransactionId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let tid = COUNTER.fetch_add(1, Ordering::SeqCst);
        TransactionId { tid }
    }

    pub fn get_tid(&self) -> u64 {
        self.tid
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_increments() {
        let tid1 = TransactionId::new();
        let tid2 = TransactionId::new();
        assert_ne!(tid1, tid2);
        assert!(tid2.get_tid() > tid1.get_tid());
    }
}
