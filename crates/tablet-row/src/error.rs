use crate::schema::ColumnType;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowCodecError {
    #[error("schema has no columns")]
    EmptySchema,
    #[error("row buffer too short: need at least {needed} bytes, got {got}")]
    BufferTooSmall { needed: u32, got: u32 },
    #[error("row size {0} does not fit in a 4-byte string-offset address")]
    RowTooLarge(u32),
    #[error("row is shorter than the header: {0} bytes")]
    RowTooShort(usize),
    #[error("row header total_size={header} does not match buffer length={actual}")]
    SizeMismatch { header: u32, actual: u32 },
    #[error("builder has no buffer attached yet")]
    BufferNotSet,
    #[error("column index {0} is out of range")]
    ColumnOutOfRange(usize),
    #[error("column {index}: expected type {expected}, found {found}")]
    TypeMismatch {
        index: usize,
        expected: ColumnType,
        found: ColumnType,
    },
    #[error("string write at cursor={cursor} len={len} overflows row of size={size}")]
    StringOverflow { cursor: u32, len: u32, size: u32 },
    #[error("row builder appended {appended} of {expected} declared columns")]
    IncompleteRow { appended: usize, expected: usize },
    #[error("string offsets are corrupt: start={start} end={end}")]
    CorruptStringOffsets { start: u32, end: u32 },
    #[error("column {0} is not an integer type")]
    NotInteger(usize),
    #[error("composite row has no component row pointers")]
    EmptyComposite,
    #[error("composite row component {0} is out of range")]
    ComponentOutOfRange(usize),
}
