use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tablet_engine::{Engine, MiniParser};
use tablet_row::{ColumnDef, ColumnType, RowBuilder, Schema};
use tablet_server::{router, AppState};
use tower::ServiceExt;

fn encode_row(schema: &Schema, id: i32, label: &str) -> Vec<u8> {
    let mut builder = RowBuilder::new(schema);
    let total = builder.cal_total_length(label.len() as u32);
    builder.set_buffer(vec![0u8; total as usize]).unwrap();
    builder.append_i32(id).unwrap();
    builder.append_string(label.as_bytes()).unwrap();
    builder.finish().unwrap()
}

fn state() -> Arc<AppState> {
    Arc::new(AppState { registry: Default::default(), engine: Engine::default(), parser: MiniParser })
}

async fn send(app: axum::Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

#[tokio::test]
async fn create_table_then_insert_then_query_round_trips() {
    let app = router(state());

    let (status, _) = send(
        app.clone(),
        "POST",
        "/tables",
        json!({
            "db": "d", "table": "t", "tid": 1, "pids": [0],
            "columns": [{"name": "id", "ty": "i32"}, {"name": "label", "ty": "varchar"}],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let schema = Schema::new(vec![ColumnDef::new("id", ColumnType::I32), ColumnDef::new("label", ColumnType::Varchar)]).unwrap();
    let row = encode_row(&schema, 7, "hello");
    let (status, _) = send(app.clone(), "POST", "/tables/d/t/rows", json!({"key": 0, "row": row})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app.clone(), "POST", "/query", json!({"db": "d", "sql": "SELECT id, label FROM t"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result_set"], json!([["7", "hello"]]));
}

#[tokio::test]
async fn creating_the_same_table_twice_is_a_conflict() {
    let app = router(state());
    let create = json!({"db": "d", "table": "t", "tid": 1, "pids": [0], "columns": [{"name": "id", "ty": "i32"}]});
    let (status, _) = send(app.clone(), "POST", "/tables", create.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(app.clone(), "POST", "/tables", create).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], json!("table_exists"));
}

#[tokio::test]
async fn querying_an_unknown_table_is_not_found() {
    let app = router(state());
    let (status, body) = send(app, "POST", "/query", json!({"db": "d", "sql": "SELECT id FROM missing"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], json!("table_not_found"));
}

#[tokio::test]
async fn malformed_sql_surfaces_as_a_sql_error() {
    let app = router(state());
    let create = json!({"db": "d", "table": "t", "tid": 1, "pids": [0], "columns": [{"name": "id", "ty": "i32"}]});
    send(app.clone(), "POST", "/tables", create).await;
    let (status, body) = send(app, "POST", "/query", json!({"db": "d", "sql": "SELECT FROM t"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], json!("sql_error"));
}
