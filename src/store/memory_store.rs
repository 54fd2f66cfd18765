//! In-memory table store used by unit tests and the dispatcher tests.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::{Result, TableStore};

/// Table store backed by a mutex-guarded map. Same observable semantics as
/// `JsonFileStore`, minus the filesystem.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemoryStore {
    fn load(&self, table: &str) -> Result<Vec<Value>> {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        Ok(tables.get(table).cloned().unwrap_or_default())
    }

    fn append(&self, table: &str, record: Value) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.entry(table.to_string()).or_default().push(record);
        Ok(())
    }

    fn append_many(&self, table: &str, records: Vec<Value>) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.entry(table.to_string()).or_default().extend(records);
        Ok(())
    }

    fn overwrite(&self, table: &str, records: Vec<Value>) -> Result<()> {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.insert(table.to_string(), records);
        Ok(())
    }
}
