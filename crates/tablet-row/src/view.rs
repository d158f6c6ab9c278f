use crate::error::RowCodecError;
use crate::layout::{self, Layout};
use crate::schema::{ColumnType, Schema, HEADER_LENGTH, VERSION_LENGTH};

/// A random-access reader over an immutable row byte slice plus a schema
/// reference. Typed getters return `Ok(None)` for a declared-NULL column
/// and `Err` for a schema/type mismatch or a structurally invalid row.
pub struct RowView<'a> {
    schema: &'a Schema,
    layout: Layout,
    buf: &'a [u8],
    size: u32,
    addr_len: u8,
}

impl<'a> RowView<'a> {
    pub fn new(schema: &'a Schema, buf: &'a [u8]) -> Result<Self, RowCodecError> {
        let layout = Layout::compute(schema);
        let mut view = RowView { schema, layout, buf, size: 0, addr_len: 0 };
        view.reset(buf)?;
        Ok(view)
    }

    pub fn reset(&mut self, buf: &'a [u8]) -> Result<(), RowCodecError> {
        if self.schema.is_empty() {
            return Err(RowCodecError::EmptySchema);
        }
        if buf.len() <= HEADER_LENGTH {
            return Err(RowCodecError::RowTooShort(buf.len()));
        }
        let header_total =
            u32::from_le_bytes(buf[VERSION_LENGTH..VERSION_LENGTH + 4].try_into().unwrap());
        if header_total as usize != buf.len() {
            return Err(RowCodecError::SizeMismatch { header: header_total, actual: buf.len() as u32 });
        }
        self.addr_len = layout::addr_len_for(header_total as usize).ok_or(RowCodecError::RowTooLarge(header_total))?;
        self.buf = buf;
        self.size = header_total;
        Ok(())
    }

    pub fn total_size(&self) -> u32 {
        self.size
    }

    fn is_null(&self, idx: usize) -> bool {
        let byte = self.buf[HEADER_LENGTH + (idx >> 3)];
        byte & (1 << (idx & 7)) != 0
    }

    fn check(&self, idx: usize, ty: ColumnType) -> Result<(), RowCodecError> {
        let col = self.schema.column(idx).ok_or(RowCodecError::ColumnOutOfRange(idx))?;
        if col.ty != ty {
            return Err(RowCodecError::TypeMismatch { index: idx, expected: col.ty, found: ty });
        }
        Ok(())
    }

    fn read_fixed<const N: usize>(&self, idx: usize, ty: ColumnType) -> Result<Option<[u8; N]>, RowCodecError> {
        self.check(idx, ty)?;
        if self.is_null(idx) {
            return Ok(None);
        }
        let off = self.layout.fixed_offsets[idx];
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[off..off + N]);
        Ok(Some(out))
    }

    pub fn get_bool(&self, idx: usize) -> Result<Option<bool>, RowCodecError> {
        Ok(self.read_fixed::<1>(idx, ColumnType::Bool)?.map(|b| b[0] != 0))
    }

    pub fn get_i16(&self, idx: usize) -> Result<Option<i16>, RowCodecError> {
        Ok(self.read_fixed::<2>(idx, ColumnType::I16)?.map(i16::from_le_bytes))
    }

    pub fn get_i32(&self, idx: usize) -> Result<Option<i32>, RowCodecError> {
        Ok(self.read_fixed::<4>(idx, ColumnType::I32)?.map(i32::from_le_bytes))
    }

    pub fn get_i64(&self, idx: usize) -> Result<Option<i64>, RowCodecError> {
        Ok(self.read_fixed::<8>(idx, ColumnType::I64)?.map(i64::from_le_bytes))
    }

    pub fn get_f32(&self, idx: usize) -> Result<Option<f32>, RowCodecError> {
        Ok(self.read_fixed::<4>(idx, ColumnType::F32)?.map(f32::from_le_bytes))
    }

    pub fn get_f64(&self, idx: usize) -> Result<Option<f64>, RowCodecError> {
        Ok(self.read_fixed::<8>(idx, ColumnType::F64)?.map(f64::from_le_bytes))
    }

    pub fn get_timestamp(&self, idx: usize) -> Result<Option<i64>, RowCodecError> {
        Ok(self.read_fixed::<8>(idx, ColumnType::Timestamp)?.map(i64::from_le_bytes))
    }

    pub fn get_date(&self, idx: usize) -> Result<Option<i32>, RowCodecError> {
        Ok(self.read_fixed::<8>(idx, ColumnType::Date)?.map(i64::from_le_bytes).map(|v| v as i32))
    }

    /// Widens any integer-family column (`i16`/`i32`/`i64`/`timestamp`) to
    /// `i64`. Unlike the reference implementation this always propagates
    /// the inner getter's status rather than discarding it for the
    /// `i32`/`i64` arms.
    pub fn get_integer(&self, idx: usize) -> Result<Option<i64>, RowCodecError> {
        let col = self.schema.column(idx).ok_or(RowCodecError::ColumnOutOfRange(idx))?;
        match col.ty {
            ColumnType::I16 => self.get_i16(idx).map(|v| v.map(i64::from)),
            ColumnType::I32 => self.get_i32(idx).map(|v| v.map(i64::from)),
            ColumnType::I64 => self.get_i64(idx),
            ColumnType::Timestamp => self.get_timestamp(idx),
            _ => Err(RowCodecError::NotInteger(idx)),
        }
    }

    fn read_str_offset(&self, slot: usize) -> u32 {
        match self.addr_len {
            1 => self.buf[slot] as u32,
            2 => u16::from_le_bytes(self.buf[slot..slot + 2].try_into().unwrap()) as u32,
            3 => {
                (self.buf[slot] as u32) << 16 | (self.buf[slot + 1] as u32) << 8 | self.buf[slot + 2] as u32
            }
            4 => u32::from_le_bytes(self.buf[slot..slot + 4].try_into().unwrap()),
            _ => unreachable!("addr_len is always in 1..=4"),
        }
    }

    pub fn get_string(&self, idx: usize) -> Result<Option<&'a [u8]>, RowCodecError> {
        self.check(idx, ColumnType::Varchar)?;
        if self.is_null(idx) {
            return Ok(None);
        }
        let rank = self.layout.varchar_rank[idx].expect("varchar column has a rank");
        let slot_of = |r: u32| self.layout.string_table_start + self.addr_len as usize * r as usize;
        let start = self.read_str_offset(slot_of(rank));
        let end = if rank + 1 < self.layout.n_strings {
            self.read_str_offset(slot_of(rank + 1))
        } else {
            self.size
        };
        if start > end || end as usize > self.buf.len() {
            return Err(RowCodecError::CorruptStringOffsets { start, end });
        }
        Ok(Some(&self.buf[start as usize..end as usize]))
    }

    /// Renders any column as text: `"NULL"` for a null value, `"NA"` for
    /// an invalid index or row.
    pub fn get_as_string(&self, idx: usize) -> String {
        let Some(col) = self.schema.column(idx) else {
            return "NA".to_string();
        };
        let rendered = match col.ty {
            ColumnType::Bool => self.get_bool(idx).map(|o| o.map(|v| v.to_string())),
            ColumnType::I16 => self.get_i16(idx).map(|o| o.map(|v| v.to_string())),
            ColumnType::I32 => self.get_i32(idx).map(|o| o.map(|v| v.to_string())),
            ColumnType::I64 => self.get_i64(idx).map(|o| o.map(|v| v.to_string())),
            ColumnType::F32 => self.get_f32(idx).map(|o| o.map(|v| v.to_string())),
            ColumnType::F64 => self.get_f64(idx).map(|o| o.map(|v| v.to_string())),
            ColumnType::Timestamp => self.get_timestamp(idx).map(|o| o.map(|v| v.to_string())),
            ColumnType::Date => self.get_date(idx).map(|o| o.map(|v| v.to_string())),
            ColumnType::Varchar => self
                .get_string(idx)
                .map(|o| o.map(|v| String::from_utf8_lossy(v).into_owned())),
        };
        match rendered {
            Ok(Some(s)) => s,
            Ok(None) => "NULL".to_string(),
            Err(_) => "NA".to_string(),
        }
    }

    pub fn get_row_string(&self) -> String {
        (0..self.schema.len())
            .map(|i| self.get_as_string(i))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Debug for RowView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowView").field("row", &self.get_row_string()).finish()
    }
}
