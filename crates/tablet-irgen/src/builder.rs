//! The per-function builder: turns a [`Stmt`]/[`Expr`] tree into a
//! [`BasicBlock`] graph, threading a [`ScopeStack`] through expression and
//! block lowering so iterator cleanup can be inserted at the right points.

use crate::ast::{BinOp, ConstValue, Expr, FnDef, IfStmt, Stmt, UnaryOp};
use crate::error::CodegenError;
use crate::ir::{BasicBlock, BlockId, Const, Inst, IrFunction, Terminator, UnOp, ValueId};
use crate::scope::ScopeStack;
use crate::types::{safe_cast, unify_for_binop, IrType, OpKind};

/// A lowered expression's SSA value together with its static type, so
/// callers don't have to re-derive types from instructions already emitted.
#[derive(Debug, Clone)]
struct TypedValue {
    value: ValueId,
    ty: IrType,
}

pub struct FnBuilder<'a> {
    name: String,
    ret: IrType,
    blocks: Vec<BasicBlock>,
    next_value: u32,
    insert_block: BlockId,
    scope: ScopeStack,
    externals: &'a dyn Fn(&str) -> Option<(Vec<IrType>, IrType)>,
}

impl<'a> FnBuilder<'a> {
    fn new(name: String, ret: IrType, externals: &'a dyn Fn(&str) -> Option<(Vec<IrType>, IrType)>) -> Self {
        let entry = BasicBlock::default();
        FnBuilder {
            name,
            ret,
            blocks: vec![entry],
            next_value: 0,
            insert_block: BlockId(0),
            scope: ScopeStack::default(),
            externals,
        }
    }

    fn new_block(&mut self) -> BlockId {
        self.blocks.push(BasicBlock::default());
        BlockId(self.blocks.len() as u32 - 1)
    }

    fn new_value(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }

    fn emit(&mut self, inst: Inst) {
        self.blocks[self.insert_block.0 as usize].insts.push(inst);
    }

    fn is_terminated(&self, blk: BlockId) -> bool {
        self.blocks[blk.0 as usize].terminator.is_some()
    }

    fn terminate(&mut self, blk: BlockId, term: Terminator) {
        debug_assert!(self.blocks[blk.0 as usize].terminator.is_none(), "block already terminated");
        self.blocks[blk.0 as usize].terminator = Some(term);
    }

    fn const_value(&mut self, c: &ConstValue) -> TypedValue {
        let dst = self.new_value();
        let (value, ty) = match *c {
            ConstValue::Bool(b) => (Const::Bool(b), IrType::Bool),
            ConstValue::I16(v) => (Const::I16(v), IrType::I16),
            ConstValue::I32(v) => (Const::I32(v), IrType::I32),
            ConstValue::I64(v) => (Const::I64(v), IrType::I64),
            ConstValue::F32(v) => (Const::F32(v), IrType::F32),
            ConstValue::F64(v) => (Const::F64(v), IrType::F64),
        };
        self.emit(Inst::Const { dst, value });
        TypedValue { value: dst, ty }
    }

    fn cast_to(&mut self, v: TypedValue, to: &IrType, explicit: bool) -> Result<TypedValue, CodegenError> {
        if &v.ty == to {
            return Ok(v);
        }
        if matches!(to, IrType::Bool) {
            let dst = self.new_value();
            self.emit(Inst::CastToBool { dst, src: v.value, from: v.ty });
            return Ok(TypedValue { value: dst, ty: IrType::Bool });
        }
        if !explicit && !safe_cast(&v.ty, to) {
            return Err(CodegenError::UnsafeCast { from: v.ty, to: to.clone() });
        }
        let dst = self.new_value();
        self.emit(Inst::Cast { dst, src: v.value, from: v.ty, to: to.clone(), checked: explicit });
        Ok(TypedValue { value: dst, ty: to.clone() })
    }

    fn coerce_to_bool(&mut self, v: TypedValue) -> Result<ValueId, CodegenError> {
        Ok(self.cast_to(v, &IrType::Bool, true)?.value)
    }

    fn lower_expr(&mut self, expr: &Expr) -> Result<TypedValue, CodegenError> {
        match expr {
            Expr::Const(c) => Ok(self.const_value(c)),
            Expr::Ident(name) => {
                let binding = self
                    .scope
                    .lookup(name)
                    .ok_or_else(|| CodegenError::UnknownName(name.clone()))?
                    .clone();
                let dst = self.new_value();
                self.emit(Inst::Load { dst, slot: binding.slot });
                Ok(TypedValue { value: dst, ty: binding.ty })
            }
            Expr::Unary { op, expr } => {
                let v = self.lower_expr(expr)?;
                match op {
                    UnaryOp::Not => {
                        let src = self.coerce_to_bool(v)?;
                        let dst = self.new_value();
                        self.emit(Inst::UnOp { dst, op: UnOp::Not, ty: IrType::Bool, src });
                        Ok(TypedValue { value: dst, ty: IrType::Bool })
                    }
                    UnaryOp::Neg => {
                        if !v.ty.is_scalar() || matches!(v.ty, IrType::Bool) {
                            return Err(CodegenError::UnsupportedType(v.ty));
                        }
                        let dst = self.new_value();
                        self.emit(Inst::UnOp { dst, op: UnOp::Neg, ty: v.ty.clone(), src: v.value });
                        Ok(TypedValue { value: dst, ty: v.ty })
                    }
                }
            }
            Expr::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs),
            Expr::Cast { expr, to, explicit } => {
                let v = self.lower_expr(expr)?;
                self.cast_to(v, to, *explicit)
            }
            Expr::Call { name, args } => self.lower_call(name, args),
        }
    }

    fn lower_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<TypedValue, CodegenError> {
        let l = self.lower_expr(lhs)?;
        let r = self.lower_expr(rhs)?;
        let is_compare = matches!(op, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge);
        let (common, kind) = unify_for_binop(&l.ty, &r.ty)
            .ok_or_else(|| CodegenError::TypeMismatch { lhs: l.ty.clone(), rhs: r.ty.clone() })?;
        let lhs_v = self.cast_to(l, &common, false)?.value;
        let rhs_v = self.cast_to(r, &common, false)?.value;
        if is_compare {
            let dst = self.new_value();
            let cmp = match op {
                BinOp::Eq => crate::ir::CmpOp::Eq,
                BinOp::Ne => crate::ir::CmpOp::Ne,
                BinOp::Lt => crate::ir::CmpOp::Lt,
                BinOp::Le => crate::ir::CmpOp::Le,
                BinOp::Gt => crate::ir::CmpOp::Gt,
                BinOp::Ge => crate::ir::CmpOp::Ge,
                _ => unreachable!(),
            };
            self.emit(Inst::Cmp { dst, op: cmp, is_float: kind == OpKind::Float, lhs: lhs_v, rhs: rhs_v });
            return Ok(TypedValue { value: dst, ty: IrType::Bool });
        }
        let dst = self.new_value();
        match kind {
            OpKind::Int => {
                let iop = match op {
                    BinOp::Add => crate::ir::IntBinOp::Add,
                    BinOp::Sub => crate::ir::IntBinOp::Sub,
                    BinOp::Mul => crate::ir::IntBinOp::Mul,
                    BinOp::Div => crate::ir::IntBinOp::Div,
                    BinOp::Mod => crate::ir::IntBinOp::Rem,
                    _ => unreachable!(),
                };
                self.emit(Inst::IntBinOp { dst, op: iop, ty: common.clone(), lhs: lhs_v, rhs: rhs_v });
            }
            OpKind::Float => {
                let fop = match op {
                    BinOp::Add => crate::ir::FloatBinOp::Add,
                    BinOp::Sub => crate::ir::FloatBinOp::Sub,
                    BinOp::Mul => crate::ir::FloatBinOp::Mul,
                    BinOp::Div => crate::ir::FloatBinOp::Div,
                    BinOp::Mod => return Err(CodegenError::UnsupportedType(common)),
                    _ => unreachable!(),
                };
                self.emit(Inst::FloatBinOp { dst, op: fop, ty: common.clone(), lhs: lhs_v, rhs: rhs_v });
            }
        }
        Ok(TypedValue { value: dst, ty: common })
    }

    fn lower_call(&mut self, name: &str, args: &[Expr]) -> Result<TypedValue, CodegenError> {
        let (param_types, ret) =
            (self.externals)(name).ok_or_else(|| CodegenError::UnknownFunction(name.to_string()))?;
        if param_types.len() != args.len() {
            return Err(CodegenError::ArityMismatch { name: name.to_string(), expected: param_types.len(), found: args.len() });
        }
        let mut values = Vec::with_capacity(args.len());
        for (arg, want) in args.iter().zip(&param_types) {
            let v = self.lower_expr(arg)?;
            values.push(self.cast_to(v, want, false)?.value);
        }
        let dst = self.new_value();
        self.emit(Inst::Call { dst: Some(dst), callee: name.to_string(), args: values });
        Ok(TypedValue { value: dst, ty: ret })
    }

    fn lower_assign(&mut self, name: &str, expr: &Expr) -> Result<(), CodegenError> {
        let v = self.lower_expr(expr)?;
        if let Some(existing) = self.scope.lookup(name).cloned() {
            let v = self.cast_to(v, &existing.ty, false)?;
            self.emit(Inst::Store { slot: existing.slot, value: v.value });
        } else {
            let slot = self.new_value();
            self.emit(Inst::Alloca { slot, ty: v.ty.clone() });
            self.emit(Inst::Store { slot, value: v.value });
            self.scope.bind(name, slot, v.ty);
        }
        Ok(())
    }

    fn emit_clear_all_scope_values(&mut self) {
        for iter in self.scope.all_iterators_top_to_bottom() {
            self.emit(Inst::IterDestroy { iter });
        }
    }

    fn emit_clear_top_scope_value(&mut self) {
        let iters: Vec<_> = self.scope.top_iterators().to_vec();
        for iter in iters {
            self.emit(Inst::IterDestroy { iter });
        }
    }

    fn lower_return(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        let v = self.lower_expr(expr)?;
        let ret = self.ret.clone();
        let v = self.cast_to(v, &ret, false)?;
        self.emit_clear_all_scope_values();
        self.terminate(self.insert_block, Terminator::Ret(Some(v.value)));
        Ok(())
    }

    fn lower_if(&mut self, ifstmt: &IfStmt, end_local: BlockId) -> Result<bool, CodegenError> {
        let cond = self.lower_expr(&ifstmt.cond)?;
        let cond = self.coerce_to_bool(cond)?;
        let start = self.insert_block;
        let cond_true = self.new_block();
        let mut cond_false = self.new_block();
        self.terminate(start, Terminator::CondBr { cond, then_blk: cond_true, else_blk: cond_false });

        let mut any_reachable = false;
        self.insert_block = cond_true;
        if self.lower_block(&ifstmt.body, end_local)? {
            any_reachable = true;
        }

        for (econd, ebody) in &ifstmt.elifs {
            self.insert_block = cond_false;
            let c = self.lower_expr(econd)?;
            let c = self.coerce_to_bool(c)?;
            let next_true = self.new_block();
            let next_false = self.new_block();
            self.terminate(cond_false, Terminator::CondBr { cond: c, then_blk: next_true, else_blk: next_false });
            self.insert_block = next_true;
            if self.lower_block(ebody, end_local)? {
                any_reachable = true;
            }
            cond_false = next_false;
        }

        self.insert_block = cond_false;
        match &ifstmt.else_body {
            Some(body) => {
                if self.lower_block(body, end_local)? {
                    any_reachable = true;
                }
            }
            None => {
                self.terminate(cond_false, Terminator::Br(end_local));
                any_reachable = true;
            }
        }

        self.insert_block = end_local;
        Ok(any_reachable)
    }

    fn lower_for_in(&mut self, var: &str, iterable: &Expr, body: &[Stmt]) -> Result<(), CodegenError> {
        let container = self.lower_expr(iterable)?;
        let elem_ty = match &container.ty {
            IrType::List(inner) => (**inner).clone(),
            other => return Err(CodegenError::UnsupportedType(other.clone())),
        };

        self.scope.enter();
        let iter_val = self.new_value();
        self.emit(Inst::IterNew { dst: iter_val, container: container.value, elem_ty: elem_ty.clone() });
        self.scope.add_iterator(iter_val);

        let loop_cond = self.new_block();
        let loop_body = self.new_block();
        let loop_end = self.new_block();
        self.terminate(self.insert_block, Terminator::Br(loop_cond));

        self.insert_block = loop_cond;
        let has_next = self.new_value();
        self.emit(Inst::IterHasNext { dst: has_next, iter: iter_val });
        self.terminate(loop_cond, Terminator::CondBr { cond: has_next, then_blk: loop_body, else_blk: loop_end });

        self.insert_block = loop_body;
        let item = self.new_value();
        self.emit(Inst::IterNext { dst: item, iter: iter_val, elem_ty: elem_ty.clone() });
        let slot = self.new_value();
        self.emit(Inst::Alloca { slot, ty: elem_ty.clone() });
        self.emit(Inst::Store { slot, value: item });
        self.scope.bind(var, slot, elem_ty);
        self.lower_block(body, loop_cond)?;

        self.insert_block = loop_end;
        self.emit_clear_top_scope_value();
        self.scope.exit();
        Ok(())
    }

    /// Lowers a straight-line list of statements against the current
    /// insert point. Returns whether control can fall through to `end`
    /// (`false` once a `return`, or an `if` whose every arm returned, is
    /// seen — remaining statements in `stmts` are then unreachable and are
    /// not lowered).
    fn lower_block(&mut self, stmts: &[Stmt], end: BlockId) -> Result<bool, CodegenError> {
        let mut reachable = true;
        for stmt in stmts {
            if !reachable {
                break;
            }
            match stmt {
                Stmt::Assign { name, expr } => self.lower_assign(name, expr)?,
                Stmt::Return(expr) => {
                    self.lower_return(expr)?;
                    reachable = false;
                }
                Stmt::If(ifstmt) => {
                    let local_end = self.new_block();
                    reachable = self.lower_if(ifstmt, local_end)?;
                }
                Stmt::ForIn { var, iterable, body } => {
                    self.lower_for_in(var, iterable, body)?;
                }
            }
        }
        if reachable && !self.is_terminated(self.insert_block) {
            self.terminate(self.insert_block, Terminator::Br(end));
        }
        Ok(reachable)
    }
}

/// Lowers a single procedural function definition into a standalone
/// [`IrFunction`]. `externals` resolves a callee name to its parameter and
/// return types; it is consulted for every [`Expr::Call`].
pub fn lower_function(
    def: &FnDef,
    externals: &dyn Fn(&str) -> Option<(Vec<IrType>, IrType)>,
) -> Result<IrFunction, CodegenError> {
    let mut fb = FnBuilder::new(def.name.clone(), def.ret.clone(), externals);
    fb.scope.enter();
    for (idx, param) in def.params.iter().enumerate() {
        let dst = fb.new_value();
        fb.emit(Inst::Param { dst, index: idx as u32 });
        let slot = fb.new_value();
        fb.emit(Inst::Alloca { slot, ty: param.ty.clone() });
        fb.emit(Inst::Store { slot, value: dst });
        fb.scope.bind(&param.name, slot, param.ty.clone());
    }

    let final_block = fb.new_block();
    let reachable = fb.lower_block(&def.body, final_block)?;
    if reachable {
        return Err(CodegenError::MalformedAst(format!("function `{}` does not return on every path", def.name)));
    }
    fb.scope.exit();

    let mut func = IrFunction {
        name: fb.name,
        param_types: def.params.iter().map(|p| p.ty.clone()).collect(),
        ret: fb.ret,
        blocks: fb.blocks,
        entry: BlockId(0),
        value_count: fb.next_value,
    };
    func.prune_unreachable();
    Ok(func)
}
