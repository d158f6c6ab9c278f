#[derive(Debug, thiserror::Error)]
pub enum SqlError {
    #[error("unexpected end of input while parsing `{0}`")]
    UnexpectedEof(&'static str),
    #[error("unexpected token `{found}`, expected {expected}")]
    UnexpectedToken { found: String, expected: &'static str },
    #[error("unknown window `{0}` referenced by a windowed select item")]
    UnknownWindow(String),
    #[error("malformed literal `{0}`")]
    BadLiteral(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Sql(#[from] SqlError),
    #[error(transparent)]
    Codegen(#[from] tablet_irgen::CodegenError),
    #[error(transparent)]
    RowCodec(#[from] tablet_row::RowCodecError),
    #[error("unknown table `{0}`")]
    TableNotFound(String),
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
    #[error("storage put failed: {0}")]
    PutFailed(String),
    #[error("compiled UDF `{0}` returned a non-zero status")]
    UdfFailed(String),
}
