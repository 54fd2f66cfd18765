//! File-backed table store: one `<table>.json` array file per table.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;

use super::{Result, TableStore};

/// Stores each table as a pretty-printed JSON array in `<dir>/<table>.json`.
///
/// Writes go through a `.tmp` file followed by a rename so a crash mid-write
/// never leaves a truncated table behind. A process-wide mutex serializes
/// read-modify-write sequences; the backend is single-process so this is the
/// only contention that exists.
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.json", table))
    }

    fn read_table(&self, table: &str) -> Result<Vec<Value>> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<Value> = serde_json::from_str(&content)?;
        Ok(records)
    }

    fn write_table(&self, table: &str, records: &[Value]) -> Result<()> {
        let path = self.table_path(table);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

impl TableStore for JsonFileStore {
    fn load(&self, table: &str) -> Result<Vec<Value>> {
        self.read_table(table)
    }

    fn append(&self, table: &str, record: Value) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = self.read_table(table)?;
        records.push(record);
        self.write_table(table, &records)
    }

    fn append_many(&self, table: &str, new_records: Vec<Value>) -> Result<()> {
        if new_records.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = self.read_table(table)?;
        records.extend(new_records);
        self.write_table(table, &records)
    }

    fn overwrite(&self, table: &str, records: Vec<Value>) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.write_table(table, &records)
    }
}
