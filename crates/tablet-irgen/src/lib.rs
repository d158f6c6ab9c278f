//! Lowers a small procedural-function AST (assignment, return, if/elif/else,
//! for-in over list handles) into a block-based SSA-ish IR, through a
//! type-directed expression builder with an explicit safe-cast table and a
//! scope stack that tracks iterator ownership for cleanup.

mod ast;
mod builder;
mod error;
mod ir;
mod jit;
mod scope;
mod types;

pub use ast::{BinOp, ConstValue, Expr, FnDef, IfStmt, Param, Stmt, UnaryOp};
pub use builder::lower_function;
pub use error::CodegenError;
pub use ir::{
    BasicBlock, BlockId, CmpOp, Const, FloatBinOp, Inst, IntBinOp, IrFunction, Module, Terminator, UnOp, ValueId,
};
pub use jit::{ExternalFn, InterpSink, JitSink, RtValue};
pub use types::{safe_cast, unify_for_binop, IrType, OpKind};

/// Lowers every function def into a single module, in order. The whole
/// batch fails on the first lowering error.
pub fn compile_module(
    defs: &[FnDef],
    externals: &dyn Fn(&str) -> Option<(Vec<IrType>, IrType)>,
) -> Result<Module, CodegenError> {
    let mut module = Module::default();
    for def in defs {
        module.functions.push(lower_function(def, externals)?);
    }
    Ok(module)
}
