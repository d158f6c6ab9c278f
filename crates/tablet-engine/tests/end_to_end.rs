use tablet_engine::{Engine, MemPartition, MiniParser, PartitionStore, RowValue};
use tablet_row::{ColumnDef, ColumnType, RowBuilder, Schema};

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

fn encode(schema: &Schema, col0: &str, col1: i32, col2: i16, col3: f32, col4: f64, col5: i64, col6: &str) -> Vec<u8> {
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
fn simple_select_with_limit() {
    let schema = t1_schema();
    let store = MemPartition::new(schema.clone());
    store.put(encode(&schema, "0", 32, 16, 2.1, 3.1, 64, "1")).unwrap();
    store.put(encode(&schema, "2", 33, 17, 2.2, 3.2, 65, "3")).unwrap();

    let engine = Engine::default();
    let out = tablet_engine::run(&engine, "db1", "SELECT col1 FROM t1 LIMIT 1", &MiniParser, &store).unwrap();
    assert_eq!(out, vec![vec![RowValue::I32(32)]]);
}

#[test]
fn varchar_select_round_trips_strings() {
    let schema = t1_schema();
    let store = MemPartition::new(schema.clone());
    store.put(encode(&schema, "0", 32, 16, 2.1, 3.1, 64, "1")).unwrap();

    let engine = Engine::default();
    let out = tablet_engine::run(&engine, "db1", "SELECT col0, col6 FROM t1 LIMIT 1", &MiniParser, &store).unwrap();
    assert_eq!(out, vec![vec![RowValue::Varchar(b"0".to_vec()), RowValue::Varchar(b"1".to_vec())]]);
}

#[test]
fn embedded_udf_test_a_b_returns_65() {
    let schema = t1_schema();
    let store = MemPartition::new(schema.clone());
    store.put(encode(&schema, "0", 32, 16, 2.1, 3.1, 64, "1")).unwrap();

    let engine = Engine::default();
    let sql = "%%fun def test(a:i32,b:i32):i32 c=a+b d=c+1 return d end \
               %%sql SELECT test(col1,col1) FROM t1 LIMIT 1";
    let out = tablet_engine::run(&engine, "db1", sql, &MiniParser, &store).unwrap();
    assert_eq!(out, vec![vec![RowValue::I32(65)]]);
}

#[test]
fn windowed_project_sums_the_matching_partition() {
    let schema = t1_schema();
    let store = MemPartition::new(schema.clone());
    store.put(encode(&schema, "a", 10, 1, 0.0, 0.0, 1, "k")).unwrap();
    store.put(encode(&schema, "b", 20, 2, 0.0, 0.0, 2, "k")).unwrap();
    store.put(encode(&schema, "c", 5, 3, 0.0, 0.0, 1, "other")).unwrap();

    let engine = Engine::default();
    let sql = "SELECT sum(col1) OVER w FROM t1 WINDOW w AS (PARTITION BY col6 ORDER BY col5)";
    let out = tablet_engine::run(&engine, "db1", sql, &MiniParser, &store).unwrap();
    assert_eq!(out.len(), 3);
    // Both "k" rows see the full partition's sum; the lone "other" row sees only itself.
    assert_eq!(out[0], vec![RowValue::I64(30)]);
    assert_eq!(out[1], vec![RowValue::I64(30)]);
    assert_eq!(out[2], vec![RowValue::I64(5)]);
}

#[test]
fn compile_cache_serves_a_second_run_from_cache() {
    let schema = t1_schema();
    let store = MemPartition::new(schema.clone());
    store.put(encode(&schema, "0", 1, 0, 0.0, 0.0, 0, "x")).unwrap();

    let engine = Engine::default();
    let sql = "SELECT col1 FROM t1 LIMIT 1";
    tablet_engine::run(&engine, "db1", sql, &MiniParser, &store).unwrap();
    tablet_engine::run(&engine, "db1", sql, &MiniParser, &store).unwrap();

    let snap = engine.metrics.snapshot();
    assert_eq!(snap.compiles, 1);
    assert_eq!(snap.cache_misses, 1);
    assert_eq!(snap.cache_hits, 1);
    assert_eq!(snap.runs, 2);
}

#[test]
fn unknown_table_surfaces_as_table_not_found() {
    let schema = t1_schema();
    let store = MemPartition::new(schema);
    let engine = Engine::default();
    let err = tablet_engine::run(&engine, "db1", "SELECT col1 FROM missing LIMIT 1", &MiniParser, &store).unwrap_err();
    assert!(matches!(err, tablet_engine::EngineError::TableNotFound(t) if t == "missing"));
}
