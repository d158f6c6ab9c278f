//! An owned, typed scalar value. Where [`tablet_row::RowView`] hands back
//! borrowed slices tied to a row's lifetime, `RowValue` is what the engine
//! passes around once it has left the row it was read from: partition/order
//! keys, UDF call arguments, and windowed aggregate inputs.

use std::fmt;

use tablet_irgen::RtValue;
use tablet_row::{ColumnType, RowView};

#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Timestamp(i64),
    Date(i32),
    Varchar(Vec<u8>),
    Null,
}

impl RowValue {
    /// Reads column `idx` out of `view` into an owned value. Mirrors
    /// `RowView::get_as_string`'s column-type dispatch but keeps the typed
    /// value rather than rendering it to text.
    pub fn read(view: &RowView<'_>, idx: usize, ty: ColumnType) -> Option<Self> {
        let v = match ty {
            ColumnType::Bool => view.get_bool(idx).ok()?.map(RowValue::Bool),
            ColumnType::I16 => view.get_i16(idx).ok()?.map(RowValue::I16),
            ColumnType::I32 => view.get_i32(idx).ok()?.map(RowValue::I32),
            ColumnType::I64 => view.get_i64(idx).ok()?.map(RowValue::I64),
            ColumnType::F32 => view.get_f32(idx).ok()?.map(RowValue::F32),
            ColumnType::F64 => view.get_f64(idx).ok()?.map(RowValue::F64),
            ColumnType::Timestamp => view.get_timestamp(idx).ok()?.map(RowValue::Timestamp),
            ColumnType::Date => view.get_date(idx).ok()?.map(RowValue::Date),
            ColumnType::Varchar => view.get_string(idx).ok()?.map(|s| RowValue::Varchar(s.to_vec())),
        };
        Some(v.unwrap_or(RowValue::Null))
    }

    pub fn to_rt(&self) -> RtValue {
        match self {
            RowValue::Bool(v) => RtValue::Bool(*v),
            RowValue::I16(v) => RtValue::I16(*v),
            RowValue::I32(v) => RtValue::I32(*v),
            RowValue::I64(v) => RtValue::I64(*v),
            RowValue::F32(v) => RtValue::F32(*v),
            RowValue::F64(v) => RtValue::F64(*v),
            RowValue::Timestamp(v) => RtValue::I64(*v),
            RowValue::Date(v) => RtValue::I32(*v),
            RowValue::Varchar(_) | RowValue::Null => RtValue::I64(0),
        }
    }
}

impl fmt::Display for RowValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValue::Bool(v) => write!(f, "{v}"),
            RowValue::I16(v) => write!(f, "{v}"),
            RowValue::I32(v) => write!(f, "{v}"),
            RowValue::I64(v) => write!(f, "{v}"),
            RowValue::F32(v) => write!(f, "{v}"),
            RowValue::F64(v) => write!(f, "{v}"),
            RowValue::Timestamp(v) => write!(f, "{v}"),
            RowValue::Date(v) => write!(f, "{v}"),
            RowValue::Varchar(v) => write!(f, "{}", String::from_utf8_lossy(v)),
            RowValue::Null => write!(f, "NULL"),
        }
    }
}

impl PartialOrd for RowValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        use RowValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a.partial_cmp(b),
            (I16(a), I16(b)) => a.partial_cmp(b),
            (I32(a), I32(b)) => a.partial_cmp(b),
            (I64(a), I64(b)) => a.partial_cmp(b),
            (F32(a), F32(b)) => a.partial_cmp(b),
            (F64(a), F64(b)) => a.partial_cmp(b),
            (Timestamp(a), Timestamp(b)) => a.partial_cmp(b),
            (Date(a), Date(b)) => a.partial_cmp(b),
            (Varchar(a), Varchar(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}
