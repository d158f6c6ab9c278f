//! The physical storage table is an external collaborator (spec
//! Non-goals). `PartitionStore` is the seam the engine talks to it
//! through; `MemPartition` is an in-memory implementation good enough to
//! drive the engine and the tablet server end to end.

use tablet_row::Schema;

use crate::error::EngineError;
use crate::value::RowValue;

/// A trait object over a single partition's physical rows. Every method
/// returns owned bytes so the store can be backed by anything from a
/// `Vec` to a memory-mapped file without the engine caring.
pub trait PartitionStore: Send + Sync {
    fn schema(&self) -> &Schema;

    /// All rows currently stored, in insertion order.
    fn full_scan(&self) -> Vec<Vec<u8>>;

    /// Rows whose value at `key_col` equals `key`, in insertion order.
    fn keyed_scan(&self, key_col: usize, key: &RowValue) -> Vec<Vec<u8>>;

    fn put(&self, row: Vec<u8>) -> Result<(), EngineError>;
}

/// A `Vec<u8>`-backed partition guarded by a lock, matching the registry's
/// read-mostly access pattern (§5): writers append, readers clone.
pub struct MemPartition {
    schema: Schema,
    rows: parking_lot::RwLock<Vec<Vec<u8>>>,
}

impl MemPartition {
    pub fn new(schema: Schema) -> Self {
        MemPartition { schema, rows: parking_lot::RwLock::new(Vec::new()) }
    }
}

impl PartitionStore for MemPartition {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn full_scan(&self) -> Vec<Vec<u8>> {
        self.rows.read().clone()
    }

    fn keyed_scan(&self, key_col: usize, key: &RowValue) -> Vec<Vec<u8>> {
        self.rows
            .read()
            .iter()
            .filter(|bytes| {
                let Ok(view) = tablet_row::RowView::new(&self.schema, bytes) else { return false };
                let Some(col) = self.schema.column(key_col) else { return false };
                RowValue::read(&view, key_col, col.ty).as_ref() == Some(key)
            })
            .cloned()
            .collect()
    }

    fn put(&self, row: Vec<u8>) -> Result<(), EngineError> {
        if tablet_row::RowView::new(&self.schema, &row).is_err() {
            return Err(EngineError::PutFailed("row does not match partition schema".to_string()));
        }
        self.rows.write().push(row);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablet_row::{ColumnDef, ColumnType, RowBuilder};

    fn schema() -> Schema {
        Schema::new(vec![ColumnDef::new("k", ColumnType::I32), ColumnDef::new("v", ColumnType::I32)]).unwrap()
    }

    fn row(k: i32, v: i32) -> Vec<u8> {
        let schema = schema();
        let mut b = RowBuilder::new(&schema);
        let total = b.cal_total_length(0);
        b.set_buffer(vec![0u8; total as usize]).unwrap();
        b.append_i32(k).unwrap();
        b.append_i32(v).unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn keyed_scan_filters_by_column_value() {
        let store = MemPartition::new(schema());
        store.put(row(1, 10)).unwrap();
        store.put(row(2, 20)).unwrap();
        store.put(row(1, 11)).unwrap();

        let matches = store.keyed_scan(0, &RowValue::I32(1));
        assert_eq!(matches.len(), 2);
        assert_eq!(store.full_scan().len(), 3);
    }
}
