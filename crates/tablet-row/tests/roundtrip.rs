use tablet_row::{addr_len_for, ColumnDef, ColumnType, CompositeRow, RowBuilder, RowView, Schema};

fn t1_schema() -> Schema {
    Schema::new(vec![
        ColumnDef::new("col0", ColumnType::Varchar),
        ColumnDef::new("col1", ColumnType::I32),
        ColumnDef::new("col2", ColumnType::I16),
        ColumnDef::new("col3", ColumnType::F32),
        ColumnDef::new("col4", ColumnType::F64),
        ColumnDef::new("col5", ColumnType::I64),
        ColumnDef::new("col6", ColumnType::Varchar),
    ])
    .unwrap()
}

fn encode_t1_row(schema: &Schema, col0: &str, col1: i32, col2: i16, col3: f32, col4: f64, col5: i64, col6: &str) -> Vec<u8> {
    let mut b = RowBuilder::new(schema);
    let total = b.cal_total_length((col0.len() + col6.len()) as u32);
    b.set_buffer(vec![0u8; total as usize]).unwrap();
    b.append_string(col0.as_bytes()).unwrap();
    b.append_i32(col1).unwrap();
    b.append_i16(col2).unwrap();
    b.append_f32(col3).unwrap();
    b.append_f64(col4).unwrap();
    b.append_i64(col5).unwrap();
    b.append_string(col6.as_bytes()).unwrap();
    b.finish().unwrap()
}

#[test]
fn simple_select_like_roundtrip() {
    let schema = t1_schema();
    let row = encode_t1_row(&schema, "0", 32, 16, 2.1, 3.1, 64, "1");
    let view = RowView::new(&schema, &row).unwrap();
    assert_eq!(view.total_size() as usize, row.len());
    assert_eq!(view.get_string(0).unwrap().unwrap(), b"0");
    assert_eq!(view.get_i32(1).unwrap().unwrap(), 32);
    assert_eq!(view.get_i16(2).unwrap().unwrap(), 16);
    assert_eq!(view.get_f32(3).unwrap().unwrap(), 2.1_f32);
    assert_eq!(view.get_f64(4).unwrap().unwrap(), 3.1_f64);
    assert_eq!(view.get_i64(5).unwrap().unwrap(), 64);
    assert_eq!(view.get_string(6).unwrap().unwrap(), b"1");
}

#[test]
fn null_varchar_has_zero_length() {
    let schema = Schema::new(vec![
        ColumnDef::new("a", ColumnType::Varchar),
        ColumnDef::new("b", ColumnType::I32),
    ])
    .unwrap();
    let mut b = RowBuilder::new(&schema);
    let total = b.cal_total_length(0);
    b.set_buffer(vec![0u8; total as usize]).unwrap();
    b.append_null().unwrap();
    b.append_i32(7).unwrap();
    let row = b.finish().unwrap();

    let view = RowView::new(&schema, &row).unwrap();
    assert_eq!(view.get_string(0).unwrap(), None);
    assert_eq!(view.get_i32(1).unwrap(), Some(7));
}

#[test]
fn null_fixed_column_ignores_underlying_bytes() {
    let schema = Schema::new(vec![ColumnDef::new("a", ColumnType::I32)]).unwrap();
    let mut b = RowBuilder::new(&schema);
    let total = b.cal_total_length(0);
    let mut buf = vec![0u8; total as usize];
    // Poison the fixed field's bytes before handing the buffer to the builder.
    for byte in buf.iter_mut() {
        *byte = 0xAA;
    }
    b.set_buffer(buf).unwrap();
    b.append_null().unwrap();
    let row = b.finish().unwrap();

    let view = RowView::new(&schema, &row).unwrap();
    assert_eq!(view.get_i32(0).unwrap(), None);
}

#[test]
fn strings_at_capacity_and_empty_strings_round_trip() {
    let schema = Schema::new(vec![
        ColumnDef::new("a", ColumnType::Varchar),
        ColumnDef::new("b", ColumnType::Varchar),
    ])
    .unwrap();
    let long = "x".repeat(500);
    let mut b = RowBuilder::new(&schema);
    let total = b.cal_total_length(long.len() as u32);
    b.set_buffer(vec![0u8; total as usize]).unwrap();
    b.append_string(long.as_bytes()).unwrap();
    b.append_string(b"").unwrap();
    let row = b.finish().unwrap();
    assert_eq!(row.len(), total as usize);

    let view = RowView::new(&schema, &row).unwrap();
    assert_eq!(view.get_string(0).unwrap().unwrap(), long.as_bytes());
    assert_eq!(view.get_string(1).unwrap().unwrap(), b"");
}

#[test]
fn width_selection_matches_addr_len_boundaries() {
    assert_eq!(addr_len_for(255), Some(1));
    assert_eq!(addr_len_for(256), Some(2));
    assert_eq!(addr_len_for(u16::MAX as usize), Some(2));
    assert_eq!(addr_len_for(u16::MAX as usize + 1), Some(3));
    assert_eq!(addr_len_for(0x00FF_FFFF), Some(3));
    assert_eq!(addr_len_for(0x0100_0000), Some(4));
    assert_eq!(addr_len_for(u32::MAX as usize), Some(4));
    assert_eq!(addr_len_for(u32::MAX as usize + 1), None);
}

#[test]
fn cal_total_length_picks_minimum_width_boundary() {
    // One varchar column: string_table_start = HEADER_LENGTH(6) + bitmap(1) + 0 fixed = 7.
    // At 255 bytes total the 1-byte offset table must fit: 7 + sum + 1*1 <= 255 => sum <= 247.
    // One byte more of string payload no longer fits a 1-byte table, so the
    // builder jumps straight to the 2-byte table (addr_len=2): 7 + 248 + 1*2 = 257.
    let schema = Schema::new(vec![ColumnDef::new("a", ColumnType::Varchar)]).unwrap();
    let b = RowBuilder::new(&schema);
    assert_eq!(b.cal_total_length(247), 255);
    assert_eq!(b.cal_total_length(248), 257);
}

#[test]
fn cal_total_length_zero_for_empty_or_overflowing() {
    let schema = Schema::new(vec![ColumnDef::new("a", ColumnType::Varchar)]).unwrap();
    let b = RowBuilder::new(&schema);
    assert_eq!(b.cal_total_length(u32::MAX), 0);
}

#[test]
fn type_mismatch_is_rejected() {
    let schema = Schema::new(vec![ColumnDef::new("a", ColumnType::I32)]).unwrap();
    let mut b = RowBuilder::new(&schema);
    let total = b.cal_total_length(0);
    b.set_buffer(vec![0u8; total as usize]).unwrap();
    assert!(b.append_i16(1).is_err());
}

#[test]
fn composite_row_decodes_each_component_independently() {
    let schema_a = t1_schema();
    let schema_b = Schema::new(vec![ColumnDef::new("x", ColumnType::Bool)]).unwrap();

    let row_a1 = encode_t1_row(&schema_a, "0", 32, 16, 2.1, 3.1, 64, "1");
    let row_a2 = encode_t1_row(&schema_a, "2", 33, 17, 2.2, 3.2, 65, "3");
    let mut bb = RowBuilder::new(&schema_b);
    let total = bb.cal_total_length(0);
    bb.set_buffer(vec![0u8; total as usize]).unwrap();
    bb.append_bool(true).unwrap();
    let row_b = bb.finish().unwrap();

    let composite = CompositeRow::new(vec![
        (&schema_a, row_a1.as_slice()),
        (&schema_a, row_a2.as_slice()),
        (&schema_b, row_b.as_slice()),
    ])
    .unwrap();

    assert_eq!(composite.len(), 3);
    assert_eq!(composite.view(0).unwrap().get_row_string(), "0, 32, 16, 2.1, 3.1, 64, 1");
    assert_eq!(composite.view(2).unwrap().get_row_string(), "true");
}

#[test]
fn get_integer_widens_and_propagates_null_for_every_width() {
    let schema = Schema::new(vec![
        ColumnDef::new("a", ColumnType::I16),
        ColumnDef::new("b", ColumnType::I32),
        ColumnDef::new("c", ColumnType::I64),
    ])
    .unwrap();
    let mut b = RowBuilder::new(&schema);
    let total = b.cal_total_length(0);
    b.set_buffer(vec![0u8; total as usize]).unwrap();
    b.append_i16(7).unwrap();
    b.append_null().unwrap();
    b.append_i64(9).unwrap();
    let row = b.finish().unwrap();

    let view = RowView::new(&schema, &row).unwrap();
    assert_eq!(view.get_integer(0).unwrap(), Some(7));
    assert_eq!(view.get_integer(1).unwrap(), None);
    assert_eq!(view.get_integer(2).unwrap(), Some(9));
}

#[test]
fn get_as_string_reports_na_for_bad_index() {
    let schema = Schema::new(vec![ColumnDef::new("a", ColumnType::I32)]).unwrap();
    let mut b = RowBuilder::new(&schema);
    let total = b.cal_total_length(0);
    b.set_buffer(vec![0u8; total as usize]).unwrap();
    b.append_i32(1).unwrap();
    let row = b.finish().unwrap();
    let view = RowView::new(&schema, &row).unwrap();
    assert_eq!(view.get_as_string(5), "NA");
}
