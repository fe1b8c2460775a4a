/// Tunable knobs for the storage core, threaded explicitly through
/// `Database::new` instead of living as free-floating constants so tests
/// can build small, isolated instances (e.g. a two-page buffer pool to
/// force eviction) without touching global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbConfig {
    /// Size in bytes of one on-disk page / cache slot.
    pub page_size: usize,
    /// Maximum number of pages the buffer pool holds resident at once.
    pub max_pages: usize,
    /// Lower bound, in milliseconds, of the randomized per-attempt lock
    /// acquisition timeout.
    pub lock_timeout_min_ms: u64,
    /// Upper bound, in milliseconds, of the randomized per-attempt lock
    /// acquisition timeout.
    pub lock_timeout_max_ms: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            page_size: 4096,
            max_pages: 50,
            lock_timeout_min_ms: 100,
            lock_timeout_max_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let cfg = DbConfig::default();
        assert!(cfg.lock_timeout_min_ms < cfg.lock_timeout_max_ms);
        assert!(cfg.page_size > 0);
        assert!(cfg.max_pages > 0);
    }
}
