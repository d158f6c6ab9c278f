use crate::schema::{Schema, HEADER_LENGTH};

/// The fixed-offset layout derived from a [`Schema`]. Both the builder and
/// the view compute this once from the schema alone, so a row produced by
/// one process is always addressable by any other process holding the
/// same schema.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    /// Offset of each non-varchar column in the fixed-field area.
    /// Entries for varchar columns are unused (`0`).
    pub fixed_offsets: Vec<usize>,
    /// Rank among varchar columns, in schema order, or `None` for
    /// non-varchar columns.
    pub varchar_rank: Vec<Option<u32>>,
    /// Byte offset at which the string-offset table begins.
    pub string_table_start: usize,
    pub n_strings: u32,
}

impl Layout {
    pub fn compute(schema: &Schema) -> Self {
        let mut offset = HEADER_LENGTH + schema.bitmap_bytes();
        let mut fixed_offsets = Vec::with_capacity(schema.len());
        let mut varchar_rank = Vec::with_capacity(schema.len());
        let mut n_strings = 0u32;
        for col in schema.columns() {
            if col.ty.is_varchar() {
                fixed_offsets.push(0);
                varchar_rank.push(Some(n_strings));
                n_strings += 1;
            } else {
                fixed_offsets.push(offset);
                varchar_rank.push(None);
                offset += col.ty.fixed_width().expect("checked non-varchar above");
            }
        }
        Layout {
            fixed_offsets,
            varchar_rank,
            string_table_start: offset,
            n_strings,
        }
    }
}

/// Smallest string-offset-table entry width in `{1, 2, 3, 4}` bytes such
/// that `total` fits, or `None` if it exceeds even 4 bytes.
pub fn addr_len_for(total: usize) -> Option<u8> {
    if total <= u8::MAX as usize {
        Some(1)
    } else if total <= u16::MAX as usize {
        Some(2)
    } else if total <= 0x00FF_FFFF {
        Some(3)
    } else if total <= u32::MAX as usize {
        Some(4)
    } else {
        None
    }
}

/// Smallest `total` such that `total >= string_table_start + sum_string_bytes
/// + addr_len_for(total) * n_strings`, trying `addr_len` in `1..=4`.
/// Returns `0` for an empty schema or if no width fits.
pub(crate) fn cal_total_length(schema: &Schema, layout: &Layout, sum_string_bytes: u32) -> u32 {
    if schema.is_empty() {
        return 0;
    }
    let base = layout.string_table_start as u64 + sum_string_bytes as u64;
    for width in 1u64..=4 {
        let total = base + layout.n_strings as u64 * width;
        let fits = match width {
            1 => total <= u8::MAX as u64,
            2 => total <= u16::MAX as u64,
            3 => total <= 0x00FF_FFFF,
            4 => total <= u32::MAX as u64,
            _ => unreachable!(),
        };
        if fits {
            return total as u32;
        }
    }
    0
}
