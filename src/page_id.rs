/// Value-typed identifier for a page: which table it belongs to, and its
/// 0-based offset within that table's heap file.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Copy)]
pub struct PageId {
    table_id: usize,
    page_number: usize,
}

impl PageId {
    pub fn new(table_id: usize, page_number: usize) -> Self {
        PageId {
            table_id,
            page_number,
        }
    }

    pub fn get_table_id(&self) -> usize {
        self.table_id
    }

    pub fn get_page_number(&self) -> usize {
        self.page_number
    }
}

/// Reference to a tuple's slot on a particular page. Stable for the
/// lifetime of the tuple on disk; cleared when the tuple is deleted.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct RecordId {
    pid: PageId,
    slot: usize,
}

impl RecordId {
    pub fn new(pid: PageId, slot: usize) -> Self {
        RecordId { pid, slot }
    }

    pub fn get_page_id(&self) -> PageId {
        self.pid
    }

    pub fn get_slot(&self) -> usize {
        self.slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_id_equality_ignores_nothing_but_its_fields() {
        let a = PageId::new(1, 2);
        let b = PageId::new(1, 2);
        let c = PageId::new(1, 3);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn record_id_carries_page_and_slot() {
        let rid = RecordId::new(PageId::new(7, 0), 3);
        assert_eq!(rid.get_page_id(), PageId::new(7, 0));
        assert_eq!(rid.get_slot(), 3);
    }
}
