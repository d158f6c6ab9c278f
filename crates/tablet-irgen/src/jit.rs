//! The contract a native-code backend must satisfy to consume this crate's
//! IR, plus a tree-walking interpreter that implements it well enough to
//! run the compiled module in-process. A real backend would replace
//! [`InterpSink`] with one that emits machine code; nothing upstream of
//! this trait needs to change.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ir::{BasicBlock, Const, Inst, IrFunction, Module, Terminator, ValueId};
use crate::types::IrType;

/// A runtime value produced by evaluating the IR. Lists are reference
/// counted since `IterNew`/`IterNext` only ever borrow from them.
#[derive(Debug, Clone, PartialEq)]
pub enum RtValue {
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    List(Arc<Vec<RtValue>>),
}

impl RtValue {
    fn as_i64(&self) -> i64 {
        match self {
            RtValue::Bool(b) => *b as i64,
            RtValue::I16(v) => *v as i64,
            RtValue::I32(v) => *v as i64,
            RtValue::I64(v) => *v,
            RtValue::F32(v) => *v as i64,
            RtValue::F64(v) => *v as i64,
            RtValue::List(_) => 0,
        }
    }

    fn as_f64(&self) -> f64 {
        match self {
            RtValue::Bool(b) => *b as i64 as f64,
            RtValue::I16(v) => *v as f64,
            RtValue::I32(v) => *v as f64,
            RtValue::I64(v) => *v as f64,
            RtValue::F32(v) => *v as f64,
            RtValue::F64(v) => *v,
            RtValue::List(_) => 0.0,
        }
    }

    fn truthy(&self) -> bool {
        match self {
            RtValue::Bool(b) => *b,
            other => other.as_i64() != 0,
        }
    }
}

/// An external symbol a compiled module may call into: a row-field getter,
/// a built-in aggregate, or any other host function registered by the
/// embedder.
pub type ExternalFn = Arc<dyn Fn(&[RtValue]) -> RtValue + Send + Sync>;

/// What a backend must provide to materialize a [`Module`] into something
/// callable: register host symbols before compiling, then produce, for
/// each function, a closure taking that function's arguments.
pub trait JitSink {
    type Callable;

    fn register_external(&mut self, name: &str, signature: (Vec<IrType>, IrType), func: ExternalFn);

    fn materialize(&mut self, module: &Module, function: &str) -> Option<Self::Callable>;
}

#[derive(Default)]
struct IterState {
    items: Arc<Vec<RtValue>>,
    pos: usize,
}

/// A reference [`JitSink`] that interprets the IR directly rather than
/// compiling it. Functionally complete for every instruction this crate
/// emits; intended for tests and as the engine's fallback execution path
/// when no native backend is wired in.
#[derive(Default)]
pub struct InterpSink {
    externals: HashMap<String, ExternalFn>,
}

impl JitSink for InterpSink {
    type Callable = Arc<IrFunction>;

    fn register_external(&mut self, name: &str, _signature: (Vec<IrType>, IrType), func: ExternalFn) {
        self.externals.insert(name.to_string(), func);
    }

    fn materialize(&mut self, module: &Module, function: &str) -> Option<Self::Callable> {
        module.find(function).cloned().map(Arc::new)
    }
}

impl InterpSink {
    /// Runs a materialized function to completion. This is the stand-in
    /// for what a real backend's generated machine code would do.
    pub fn call(&self, func: &IrFunction, args: &[RtValue]) -> RtValue {
        let mut values: HashMap<ValueId, RtValue> = HashMap::new();
        let mut slots: HashMap<ValueId, RtValue> = HashMap::new();
        let mut iters: HashMap<ValueId, IterState> = HashMap::new();
        let mut block = func.entry;
        loop {
            let bb: &BasicBlock = func.block(block);
            for inst in &bb.insts {
                self.exec(inst, &mut values, &mut slots, &mut iters, args);
            }
            match bb.terminator.as_ref().expect("well-formed function: every reachable block is terminated") {
                Terminator::Br(next) => block = *next,
                Terminator::CondBr { cond, then_blk, else_blk } => {
                    block = if values[cond].truthy() { *then_blk } else { *else_blk };
                }
                Terminator::Ret(v) => {
                    return v.map(|id| values[&id].clone()).unwrap_or(RtValue::Bool(false));
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn exec(
        &self,
        inst: &Inst,
        values: &mut HashMap<ValueId, RtValue>,
        slots: &mut HashMap<ValueId, RtValue>,
        iters: &mut HashMap<ValueId, IterState>,
        args: &[RtValue],
    ) {
        match inst {
            Inst::Const { dst, value } => {
                values.insert(*dst, const_to_rt(value));
            }
            Inst::Param { dst, index } => {
                values.insert(*dst, args[*index as usize].clone());
            }
            Inst::Alloca { slot, .. } => {
                slots.entry(*slot).or_insert(RtValue::I64(0));
            }
            Inst::Load { dst, slot } => {
                values.insert(*dst, slots[slot].clone());
            }
            Inst::Store { slot, value } => {
                slots.insert(*slot, values[value].clone());
            }
            Inst::UnOp { dst, op, src, .. } => {
                let v = &values[src];
                let out = match op {
                    crate::ir::UnOp::Not => RtValue::Bool(!v.truthy()),
                    crate::ir::UnOp::Neg => match v {
                        RtValue::I16(x) => RtValue::I16(-x),
                        RtValue::I32(x) => RtValue::I32(-x),
                        RtValue::I64(x) => RtValue::I64(-x),
                        RtValue::F32(x) => RtValue::F32(-x),
                        RtValue::F64(x) => RtValue::F64(-x),
                        other => other.clone(),
                    },
                };
                values.insert(*dst, out);
            }
            Inst::IntBinOp { dst, op, ty, lhs, rhs } => {
                let l = values[lhs].as_i64();
                let r = values[rhs].as_i64();
                let result = match op {
                    crate::ir::IntBinOp::Add => l.wrapping_add(r),
                    crate::ir::IntBinOp::Sub => l.wrapping_sub(r),
                    crate::ir::IntBinOp::Mul => l.wrapping_mul(r),
                    crate::ir::IntBinOp::Div => l.checked_div(r).unwrap_or(0),
                    crate::ir::IntBinOp::Rem => l.checked_rem(r).unwrap_or(0),
                };
                values.insert(*dst, narrow_int(result, ty));
            }
            Inst::FloatBinOp { dst, op, ty, lhs, rhs } => {
                let l = values[lhs].as_f64();
                let r = values[rhs].as_f64();
                let result = match op {
                    crate::ir::FloatBinOp::Add => l + r,
                    crate::ir::FloatBinOp::Sub => l - r,
                    crate::ir::FloatBinOp::Mul => l * r,
                    crate::ir::FloatBinOp::Div => l / r,
                };
                values.insert(*dst, narrow_float(result, ty));
            }
            Inst::Cmp { dst, op, is_float, lhs, rhs } => {
                let ord = if *is_float {
                    values[lhs].as_f64().partial_cmp(&values[rhs].as_f64())
                } else {
                    values[lhs].as_i64().partial_cmp(&values[rhs].as_i64())
                };
                let result = match (ord, op) {
                    (Some(std::cmp::Ordering::Equal), crate::ir::CmpOp::Eq) => true,
                    (Some(std::cmp::Ordering::Equal), crate::ir::CmpOp::Le) => true,
                    (Some(std::cmp::Ordering::Equal), crate::ir::CmpOp::Ge) => true,
                    (Some(std::cmp::Ordering::Less), crate::ir::CmpOp::Lt) => true,
                    (Some(std::cmp::Ordering::Less), crate::ir::CmpOp::Le) => true,
                    (Some(std::cmp::Ordering::Less), crate::ir::CmpOp::Ne) => true,
                    (Some(std::cmp::Ordering::Greater), crate::ir::CmpOp::Gt) => true,
                    (Some(std::cmp::Ordering::Greater), crate::ir::CmpOp::Ge) => true,
                    (Some(std::cmp::Ordering::Greater), crate::ir::CmpOp::Ne) => true,
                    _ => false,
                };
                values.insert(*dst, RtValue::Bool(result));
            }
            Inst::Cast { dst, src, to, .. } => {
                values.insert(*dst, cast_rt(&values[src], to));
            }
            Inst::CastToBool { dst, src, .. } => {
                values.insert(*dst, RtValue::Bool(values[src].truthy()));
            }
            Inst::Call { dst, callee, args } => {
                let argv: Vec<RtValue> = args.iter().map(|a| values[a].clone()).collect();
                let f = self.externals.get(callee).unwrap_or_else(|| panic!("unregistered external `{callee}`"));
                let out = f(&argv);
                if let Some(dst) = dst {
                    values.insert(*dst, out);
                }
            }
            Inst::IterNew { dst, container, .. } => {
                let RtValue::List(items) = values[container].clone() else {
                    panic!("IterNew over a non-list value")
                };
                iters.insert(*dst, IterState { items, pos: 0 });
                values.insert(*dst, RtValue::I64(dst.0 as i64));
            }
            Inst::IterHasNext { dst, iter } => {
                let state = &iters[iter];
                values.insert(*dst, RtValue::Bool(state.pos < state.items.len()));
            }
            Inst::IterNext { dst, iter, .. } => {
                let state = iters.get_mut(iter).expect("IterNext on unknown iterator");
                let item = state.items[state.pos].clone();
                state.pos += 1;
                values.insert(*dst, item);
            }
            Inst::IterDestroy { iter } => {
                iters.remove(iter);
            }
        }
    }
}

fn const_to_rt(c: &Const) -> RtValue {
    match *c {
        Const::Bool(v) => RtValue::Bool(v),
        Const::I16(v) => RtValue::I16(v),
        Const::I32(v) => RtValue::I32(v),
        Const::I64(v) => RtValue::I64(v),
        Const::F32(v) => RtValue::F32(v),
        Const::F64(v) => RtValue::F64(v),
    }
}

fn narrow_int(v: i64, ty: &IrType) -> RtValue {
    match ty {
        IrType::Bool => RtValue::Bool(v != 0),
        IrType::I16 => RtValue::I16(v as i16),
        IrType::I32 => RtValue::I32(v as i32),
        IrType::I64 => RtValue::I64(v),
        _ => RtValue::I64(v),
    }
}

fn narrow_float(v: f64, ty: &IrType) -> RtValue {
    match ty {
        IrType::F32 => RtValue::F32(v as f32),
        IrType::F64 => RtValue::F64(v),
        _ => RtValue::F64(v),
    }
}

fn cast_rt(v: &RtValue, to: &IrType) -> RtValue {
    match to {
        IrType::Bool => RtValue::Bool(v.truthy()),
        IrType::I16 => RtValue::I16(v.as_i64() as i16),
        IrType::I32 => RtValue::I32(v.as_i64() as i32),
        IrType::I64 => RtValue::I64(v.as_i64()),
        IrType::F32 => RtValue::F32(v.as_f64() as f32),
        IrType::F64 => RtValue::F64(v.as_f64()),
        IrType::List(_) => v.clone(),
    }
}
