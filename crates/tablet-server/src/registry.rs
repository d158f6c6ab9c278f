//! The process-wide `db -> tid -> pid -> partition` map (spec §4.E Tablet
//! Server). Structural changes (`CreateTable`) take a write lock; lookups
//! (`Insert`, `Query`, `GetTableSchema`) take a read lock, matching the
//! teacher's datastore locking strategy of a short exclusive section for
//! structure and shared access for data.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tablet_engine::{EngineError, MemPartition, PartitionStore};
use tablet_row::Schema;

struct TableEntry {
    tid: u32,
    schema: Arc<Schema>,
    partitions: HashMap<u32, Arc<MemPartition>>,
}

#[derive(Default)]
pub struct Registry {
    // db -> table name -> entry
    tables: RwLock<HashMap<String, HashMap<String, TableEntry>>>,
}

#[derive(Debug)]
pub enum RegistryError {
    TableExists,
    TableNotFound,
    NoPartitions,
}

impl Registry {
    pub fn create_table(&self, db: &str, table: &str, tid: u32, pids: &[u32], schema: Schema) -> Result<(), RegistryError> {
        if pids.is_empty() {
            return Err(RegistryError::NoPartitions);
        }
        let mut tables = self.tables.write();
        let db_tables = tables.entry(db.to_string()).or_default();
        if db_tables.contains_key(table) {
            return Err(RegistryError::TableExists);
        }
        let schema = Arc::new(schema);
        let partitions = pids.iter().map(|&pid| (pid, Arc::new(MemPartition::new((*schema).clone())))).collect();
        db_tables.insert(table.to_string(), TableEntry { tid, schema, partitions });
        Ok(())
    }

    pub fn schema(&self, db: &str, table: &str) -> Result<Arc<Schema>, RegistryError> {
        let tables = self.tables.read();
        tables
            .get(db)
            .and_then(|t| t.get(table))
            .map(|e| e.schema.clone())
            .ok_or(RegistryError::TableNotFound)
    }

    /// Routes `key` to one of the table's partitions with a simple
    /// modulo hash over its sorted pids, then appends `row` to it.
    pub fn insert(&self, db: &str, table: &str, key: u32, row: Vec<u8>) -> Result<(), RegistryError> {
        let tables = self.tables.read();
        let entry = tables.get(db).and_then(|t| t.get(table)).ok_or(RegistryError::TableNotFound)?;
        let mut pids: Vec<&u32> = entry.partitions.keys().collect();
        pids.sort();
        let pid = *pids[(key as usize) % pids.len()];
        entry.partitions[&pid].put(row).map_err(|_| RegistryError::NoPartitions)?;
        Ok(())
    }

    /// A `PartitionStore` view over every partition of a table, unioned,
    /// for `Query` to scan across.
    pub fn table_view(&self, db: &str, table: &str) -> Result<TableView, RegistryError> {
        let tables = self.tables.read();
        let entry = tables.get(db).and_then(|t| t.get(table)).ok_or(RegistryError::TableNotFound)?;
        Ok(TableView { schema: entry.schema.clone(), partitions: entry.partitions.values().cloned().collect() })
    }
}

pub struct TableView {
    schema: Arc<Schema>,
    partitions: Vec<Arc<MemPartition>>,
}

impl PartitionStore for TableView {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn full_scan(&self) -> Vec<Vec<u8>> {
        self.partitions.iter().flat_map(|p| p.full_scan()).collect()
    }

    fn keyed_scan(&self, key_col: usize, key: &tablet_engine::RowValue) -> Vec<Vec<u8>> {
        self.partitions.iter().flat_map(|p| p.keyed_scan(key_col, key)).collect()
    }

    fn put(&self, _row: Vec<u8>) -> Result<(), EngineError> {
        Err(EngineError::PutFailed("a table view spanning multiple partitions cannot be written to directly".to_string()))
    }
}
