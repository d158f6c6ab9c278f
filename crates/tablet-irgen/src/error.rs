use crate::types::IrType;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CodegenError {
    #[error("type mismatch: cannot unify {lhs} and {rhs} for a binary operator")]
    TypeMismatch { lhs: IrType, rhs: IrType },
    #[error("unknown name `{0}`")]
    UnknownName(String),
    #[error("unsupported type `{0}` in this position")]
    UnsupportedType(IrType),
    #[error("unsafe cast from {from} to {to} outside an explicit cast expression")]
    UnsafeCast { from: IrType, to: IrType },
    #[error("malformed function body: {0}")]
    MalformedAst(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("wrong number of arguments for `{name}`: expected {expected}, found {found}")]
    ArityMismatch { name: String, expected: usize, found: usize },
}
