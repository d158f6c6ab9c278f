//! A stack of lexical frames tracking variable bindings and the iterator
//! handles a frame owns. The block builder drains a frame's iterator list
//! into explicit `IterDestroy` instructions at the two points cleanup can
//! happen: normal fall-through out of a loop (innermost frame only) and a
//! `return` anywhere (every live frame, top to bottom).

use crate::ir::ValueId;
use crate::types::IrType;

#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub slot: ValueId,
    pub ty: IrType,
}

#[derive(Debug, Default)]
struct Frame {
    vars: Vec<(String, Binding)>,
    iterators: Vec<ValueId>,
}

#[derive(Debug, Default)]
pub(crate) struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn enter(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Pops the innermost frame. Callers must have already destroyed its
    /// iterators (via [`Self::top_iterators`]) before popping.
    pub fn exit(&mut self) {
        self.frames.pop().expect("exit without a matching enter");
    }

    pub fn bind(&mut self, name: &str, slot: ValueId, ty: IrType) {
        let frame = self.frames.last_mut().expect("bind outside any scope");
        frame.vars.push((name.to_string(), Binding { slot, ty }));
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.frames.iter().rev().find_map(|f| f.vars.iter().rev().find(|(n, _)| n == name).map(|(_, b)| b))
    }

    pub fn add_iterator(&mut self, iter: ValueId) {
        self.frames.last_mut().expect("add_iterator outside any scope").iterators.push(iter);
    }

    /// Iterator handles owned by the innermost live frame, oldest first.
    pub fn top_iterators(&self) -> &[ValueId] {
        self.frames.last().map(|f| f.iterators.as_slice()).unwrap_or(&[])
    }

    /// Every iterator handle owned by every live frame, outermost frame
    /// last so destruction still proceeds top to bottom when the caller
    /// walks this slice in order.
    pub fn all_iterators_top_to_bottom(&self) -> Vec<ValueId> {
        self.frames.iter().rev().flat_map(|f| f.iterators.iter().copied()).collect()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
