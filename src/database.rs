use std::path::Path;
use std::sync::Arc;

use crate::buffer_pool::BufferPool;
use crate::catalog::Catalog;
use crate::config::DbConfig;
use crate::error::DbResult;

/// The explicit storage environment: a catalog and the buffer pool built
/// over it. Threaded through construction rather than reached via a
/// global singleton, so tests can build small, isolated instances (e.g. a
/// two-page buffer pool to force eviction) without sharing state.
pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
    config: DbConfig,
}

impl Database {
    pub fn new(config: DbConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::new(Arc::clone(&catalog), &config));
        Database {
            catalog,
            buffer_pool,
            config,
        }
    }

    pub fn get_catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn get_buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn load_schema(&self, schema_file: &Path) -> DbResult<()> {
        self.catalog.load_schema(schema_file, self.config.page_size)
    }
}
