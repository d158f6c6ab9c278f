use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tablet_engine::{Engine, MiniParser, RowValue};
use tablet_row::{ColumnDef, ColumnType, Schema};
use tracing::instrument;

use crate::registry::{Registry, RegistryError};
use crate::status::Status;

pub struct AppState {
    pub registry: Registry,
    pub engine: Engine,
    pub parser: MiniParser,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tables", post(create_table))
        .route("/tables/:db/:table/rows", post(insert))
        .route("/tables/:db/:table/schema", get(get_table_schema))
        .route("/query", post(query))
        .with_state(state)
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: String,
}

fn parse_column_type(ty: &str) -> Option<ColumnType> {
    Some(match ty {
        "bool" => ColumnType::Bool,
        "i16" => ColumnType::I16,
        "i32" => ColumnType::I32,
        "i64" => ColumnType::I64,
        "f32" => ColumnType::F32,
        "f64" => ColumnType::F64,
        "timestamp" => ColumnType::Timestamp,
        "date" => ColumnType::Date,
        "varchar" => ColumnType::Varchar,
        _ => return None,
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateTableRequest {
    pub db: String,
    pub table: String,
    pub tid: u32,
    pub pids: Vec<u32>,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn status_response(status: Status, message: Option<String>) -> (StatusCode, Json<StatusResponse>) {
    (status.http_code(), Json(StatusResponse { status, message }))
}

#[instrument(skip(state))]
async fn create_table(State(state): State<Arc<AppState>>, Json(req): Json<CreateTableRequest>) -> (StatusCode, Json<StatusResponse>) {
    if req.tid == 0 || req.pids.is_empty() {
        return status_response(Status::BadRequest, Some("tid must be > 0 and pids must be non-empty".to_string()));
    }
    let mut columns = Vec::with_capacity(req.columns.len());
    for c in &req.columns {
        let Some(ty) = parse_column_type(&c.ty) else {
            return status_response(Status::BadRequest, Some(format!("unknown column type `{}`", c.ty)));
        };
        columns.push(ColumnDef::new(c.name.clone(), ty));
    }
    let schema = match Schema::new(columns) {
        Ok(s) => s,
        Err(e) => return status_response(Status::BadRequest, Some(e.to_string())),
    };
    match state.registry.create_table(&req.db, &req.table, req.tid, &req.pids, schema) {
        Ok(()) => status_response(Status::Ok, None),
        Err(RegistryError::TableExists) => status_response(Status::TableExists, None),
        Err(_) => status_response(Status::BadRequest, None),
    }
}

#[derive(Debug, Deserialize)]
pub struct InsertRequest {
    pub key: u32,
    pub row: Vec<u8>,
}

#[instrument(skip(state, req))]
async fn insert(
    State(state): State<Arc<AppState>>,
    Path((db, table)): Path<(String, String)>,
    Json(req): Json<InsertRequest>,
) -> (StatusCode, Json<StatusResponse>) {
    match state.registry.insert(&db, &table, req.key, req.row) {
        Ok(()) => status_response(Status::Ok, None),
        Err(RegistryError::TableNotFound) => status_response(Status::TableNotFound, None),
        Err(_) => status_response(Status::TablePutFailed, None),
    }
}

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub status: Status,
    pub columns: Vec<ColumnSpec>,
}

#[instrument(skip(state))]
async fn get_table_schema(State(state): State<Arc<AppState>>, Path((db, table)): Path<(String, String)>) -> (StatusCode, Json<SchemaResponse>) {
    match state.registry.schema(&db, &table) {
        Ok(schema) => {
            let columns = schema.columns().iter().map(|c| ColumnSpec { name: c.name.clone(), ty: c.ty.to_string() }).collect();
            (StatusCode::OK, Json(SchemaResponse { status: Status::Ok, columns }))
        }
        Err(_) => (StatusCode::NOT_FOUND, Json(SchemaResponse { status: Status::TableNotFound, columns: Vec::new() })),
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub db: String,
    pub sql: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub status: Status,
    pub result_set: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[instrument(skip(state))]
async fn query(State(state): State<Arc<AppState>>, Json(req): Json<QueryRequest>) -> (StatusCode, Json<QueryResponse>) {
    let table = match extract_table_name(&req.sql) {
        Some(t) => t,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(QueryResponse { status: Status::BadRequest, result_set: Vec::new(), message: Some("could not find a FROM clause".to_string()) }),
            )
        }
    };
    let view = match state.registry.table_view(&req.db, &table) {
        Ok(v) => v,
        Err(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(QueryResponse { status: Status::TableNotFound, result_set: Vec::new(), message: None }),
            )
        }
    };
    match tablet_engine::run(&state.engine, &req.db, &req.sql, &state.parser, &view) {
        Ok(rows) => {
            let result_set = rows.into_iter().map(|row| row.iter().map(RowValue::to_string).collect()).collect();
            (StatusCode::OK, Json(QueryResponse { status: Status::Ok, result_set, message: None }))
        }
        Err(err) => {
            let status = Status::from(&err);
            (status.http_code(), Json(QueryResponse { status, result_set: Vec::new(), message: Some(err.to_string()) }))
        }
    }
}

/// The tablet server's SQL surface always names the table right after
/// `FROM`; pulling it out here lets the HTTP layer resolve the partition
/// registry lookup without re-implementing the engine's parser.
fn extract_table_name(sql: &str) -> Option<String> {
    let sql = sql.rsplit("%%sql").next().unwrap_or(sql);
    let mut words = sql.split_whitespace();
    while let Some(word) = words.next() {
        if word.eq_ignore_ascii_case("FROM") {
            return words.next().map(str::to_string);
        }
    }
    None
}
