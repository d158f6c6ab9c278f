use serde::Serialize;

/// The RPC surface's status codes (spec §6). `Ok` aside, every other
/// variant is also an HTTP status via [`Status::http_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    BadRequest,
    TableExists,
    TableNotFound,
    TablePutFailed,
    SqlError,
}

impl Status {
    pub fn http_code(self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Status::Ok => StatusCode::OK,
            Status::BadRequest => StatusCode::BAD_REQUEST,
            Status::TableExists => StatusCode::CONFLICT,
            Status::TableNotFound => StatusCode::NOT_FOUND,
            Status::TablePutFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Status::SqlError => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<&tablet_engine::EngineError> for Status {
    fn from(err: &tablet_engine::EngineError) -> Self {
        match err {
            tablet_engine::EngineError::Sql(_) | tablet_engine::EngineError::Codegen(_) => Status::SqlError,
            tablet_engine::EngineError::TableNotFound(_) => Status::TableNotFound,
            tablet_engine::EngineError::RowCodec(_) | tablet_engine::EngineError::UnknownColumn(_) => Status::BadRequest,
            tablet_engine::EngineError::PutFailed(_) => Status::TablePutFailed,
            tablet_engine::EngineError::UdfFailed(_) => Status::SqlError,
        }
    }
}
