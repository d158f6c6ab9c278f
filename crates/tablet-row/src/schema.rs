use thiserror::Error;

/// Fixed byte layout constants for the row header.
///
/// `fversion:u8`, `sversion:u8`, then a little-endian `u32` holding the
/// total row size (including this header). The `total_size` field sits
/// at byte offset [`VERSION_LENGTH`].
pub const VERSION_LENGTH: usize = 2;
pub const HEADER_LENGTH: usize = VERSION_LENGTH + 4;
pub const FVERSION: u8 = 1;
pub const SVERSION: u8 = 1;

/// The primitive column types a [`Schema`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// Microsecond (or implementation-defined) epoch timestamp, stored as `i64`.
    Timestamp,
    /// Packed `(year << 9) | (month << 5) | day`, stored in the field's
    /// full native width (`i64`) alongside `timestamp`.
    Date,
    Varchar,
}

impl ColumnType {
    /// Byte width in the fixed-field area, or `None` for `Varchar`, whose
    /// bytes live in the indirect string heap instead.
    pub fn fixed_width(self) -> Option<usize> {
        use ColumnType::*;
        match self {
            Bool => Some(1),
            I16 => Some(2),
            I32 | F32 => Some(4),
            I64 | F64 | Timestamp | Date => Some(8),
            Varchar => None,
        }
    }

    pub fn is_varchar(self) -> bool {
        matches!(self, ColumnType::Varchar)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ColumnType::Bool => "bool",
            ColumnType::I16 => "i16",
            ColumnType::I32 => "i32",
            ColumnType::I64 => "i64",
            ColumnType::F32 => "f32",
            ColumnType::F64 => "f64",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Varchar => "varchar",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self { name: name.into(), ty }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema has no columns")]
    Empty,
    #[error("duplicate column name `{0}`")]
    DuplicateName(String),
}

/// An ordered, fixed set of column definitions. Column order is
/// significant: it determines every offset in the encoded row.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self, SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut seen = std::collections::HashSet::with_capacity(columns.len());
        for c in &columns {
            if !seen.insert(c.name.as_str()) {
                return Err(SchemaError::DuplicateName(c.name.clone()));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, idx: usize) -> Option<&ColumnDef> {
        self.columns.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn bitmap_bytes(&self) -> usize {
        (self.columns.len() + 7) / 8
    }
}
