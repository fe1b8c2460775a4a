use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{DbError, DbResult};
use crate::heap_file::HeapFile;
use crate::tuple::TupleDesc;
use crate::types::Type;

struct Entry {
    file: Arc<HeapFile>,
    name: String,
    primary_key: Option<String>,
}

/// Process-scoped registry mapping table id to its backing file, name, and
/// optional primary key. Table ids are assigned on first registration and
/// memoized by the table's absolute data-file path, so reopening the same
/// file always yields the same id instead of depending on a hash of its
/// path (which can collide).
pub struct Catalog {
    by_id: RwLock<HashMap<usize, Entry>>,
    by_name: RwLock<HashMap<String, usize>>,
    path_to_id: RwLock<HashMap<PathBuf, usize>>,
    next_id: AtomicUsize,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            by_id: RwLock::new(HashMap::new()),
            by_name: RwLock::new(HashMap::new()),
            path_to_id: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    fn id_for_path(&self, path: &Path) -> DbResult<usize> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut path_to_id = self.path_to_id.write().unwrap();
        if let Some(&id) = path_to_id.get(&canonical) {
            return Ok(id);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        path_to_id.insert(canonical, id);
        Ok(id)
    }

    /// Registers `file` under `name`, overwriting any prior entry with the
    /// same name (last writer wins).
    pub fn add_table(&self, file: Arc<HeapFile>, name: String, primary_key: Option<String>) {
        let id = file.get_id();
        let mut by_id = self.by_id.write().unwrap();
        let mut by_name = self.by_name.write().unwrap();
        if let Some(old_id) = by_name.insert(name.clone(), id) {
            if old_id != id {
                by_id.remove(&old_id);
            }
        }
        by_id.insert(
            id,
            Entry {
                file,
                name,
                primary_key,
            },
        );
    }

    /// Opens (creating if necessary) `path` as a heap file with schema
    /// `td`, assigns it a stable table id memoized by `path`, and
    /// registers it under `name`.
    pub fn register_file(
        &self,
        path: &Path,
        name: String,
        td: TupleDesc,
        primary_key: Option<String>,
        page_size: usize,
    ) -> DbResult<usize> {
        let id = self.id_for_path(path)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let heap_file = Arc::new(HeapFile::new(file, td, id, page_size));
        self.add_table(heap_file, name, primary_key);
        Ok(id)
    }

    pub fn table_id_by_name(&self, name: &str) -> DbResult<usize> {
        self.by_name
            .read()
            .unwrap()
            .get(name)
            .copied()
            .ok_or_else(|| DbError::NotFound(format!("table '{}'", name)))
    }

    pub fn name_of(&self, table_id: usize) -> DbResult<String> {
        self.by_id
            .read()
            .unwrap()
            .get(&table_id)
            .map(|e| e.name.clone())
            .ok_or_else(|| DbError::NotFound(format!("table id {}", table_id)))
    }

    pub fn file_of(&self, table_id: usize) -> DbResult<Arc<HeapFile>> {
        self.by_id
            .read()
            .unwrap()
            .get(&table_id)
            .map(|e| Arc::clone(&e.file))
            .ok_or_else(|| DbError::NotFound(format!("table id {}", table_id)))
    }

    pub fn schema_of(&self, table_id: usize) -> DbResult<TupleDesc> {
        self.file_of(table_id).map(|f| f.get_tuple_desc().clone())
    }

    pub fn primary_key_of(&self, table_id: usize) -> DbResult<Option<String>> {
        self.by_id
            .read()
            .unwrap()
            .get(&table_id)
            .map(|e| e.primary_key.clone())
            .ok_or_else(|| DbError::NotFound(format!("table id {}", table_id)))
    }

    /// Loads a schema file formatted as one table per line:
    /// `name (field1 type1[, fieldN typeN[ pk]]*)`, `type` being `int` or
    /// `string` (case-insensitive), with an optional trailing `pk` marker
    /// on the primary-key field. Data files are resolved as
    /// `dirname(schema_file)/name.dat`.
    pub fn load_schema(&self, schema_file: &Path, page_size: usize) -> DbResult<()> {
        let contents = std::fs::read_to_string(schema_file)?;
        let base_dir = schema_file.parent().unwrap_or_else(|| Path::new("."));
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.load_schema_line(line, base_dir, page_size)?;
        }
        Ok(())
    }

    fn load_schema_line(&self, line: &str, base_dir: &Path, page_size: usize) -> DbResult<()> {
        let open_paren = line
            .find('(')
            .ok_or_else(|| DbError::InvalidArgument(format!("malformed schema line: {}", line)))?;
        let close_paren = line
            .rfind(')')
            .ok_or_else(|| DbError::InvalidArgument(format!("malformed schema line: {}", line)))?;
        let name = line[..open_paren].trim().to_string();
        let body = &line[open_paren + 1..close_paren];

        let mut field_names = vec![];
        let mut field_types = vec![];
        let mut primary_key = None;
        for field in body.split(',') {
            let parts: Vec<&str> = field.split_whitespace().collect();
            if parts.len() < 2 {
                return Err(DbError::InvalidArgument(format!(
                    "malformed field spec: {}",
                    field
                )));
            }
            let field_name = parts[0].to_string();
            let field_type = match parts[1].to_lowercase().as_str() {
                "int" => Type::IntType,
                "string" => Type::StringType,
                other => return Err(DbError::InvalidArgument(format!("invalid field type: {}", other))),
            };
            if parts.len() > 2 && parts[2].eq_ignore_ascii_case("pk") {
                primary_key = Some(field_name.clone());
            }
            field_names.push(field_name);
            field_types.push(field_type);
        }

        let td = TupleDesc::new(field_types, field_names);
        let path = base_dir.join(format!("{}.dat", name));
        self.register_file(&path, name, td, primary_key, page_size)?;
        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
