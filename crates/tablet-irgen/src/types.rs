//! The scalar type lattice used by expression lowering, plus the safe-cast
//! predicate that governs both explicit `cast` expressions and the implicit
//! promotions inserted around binary operators.

use std::fmt;

/// A value type as seen by the IR. `List` only ever appears as a function
/// parameter type (the opaque handle a windowed aggregate iterates over);
/// it is never itself a binary-op operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    List(Box<IrType>),
}

impl IrType {
    pub fn is_scalar(&self) -> bool {
        !matches!(self, IrType::List(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, IrType::F32 | IrType::F64)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, IrType::Bool | IrType::I16 | IrType::I32 | IrType::I64)
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Bool => write!(f, "bool"),
            IrType::I16 => write!(f, "i16"),
            IrType::I32 => write!(f, "i32"),
            IrType::I64 => write!(f, "i64"),
            IrType::F32 => write!(f, "f32"),
            IrType::F64 => write!(f, "f64"),
            IrType::List(inner) => write!(f, "list<{inner}>"),
        }
    }
}

/// `true` iff a value of type `src` can be cast to `dst` without the
/// explicit-cast guard. Widening within a family is always safe; narrowing,
/// or crossing the int/float boundary above `i32`, is not.
pub fn safe_cast(src: &IrType, dst: &IrType) -> bool {
    use IrType::*;
    match src {
        Bool | I16 => true,
        I32 => !matches!(dst, I16),
        I64 => matches!(dst, I64),
        F32 => matches!(dst, F32 | F64),
        F64 => matches!(dst, F64),
        List(_) => false,
    }
}

/// Rank used to pick the "wider" side of an int-int or float-float
/// promotion. `Bool` is the narrowest integer type.
fn int_rank(t: &IrType) -> Option<u8> {
    match t {
        IrType::Bool => Some(0),
        IrType::I16 => Some(1),
        IrType::I32 => Some(2),
        IrType::I64 => Some(3),
        _ => None,
    }
}

fn float_rank(t: &IrType) -> Option<u8> {
    match t {
        IrType::F32 => Some(0),
        IrType::F64 => Some(1),
        _ => None,
    }
}

/// Whether a promoted binary op should be emitted as an integer or a
/// floating-point instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Int,
    Float,
}

/// Resolve the common type two binary-op operands promote to, and whether
/// the result is an integer or floating op. Promotion always goes through
/// the narrower operand's safe-cast path; a pair with no safe path (e.g.
/// `i64` and `f32`) is rejected rather than silently widened.
pub fn unify_for_binop(a: &IrType, b: &IrType) -> Option<(IrType, OpKind)> {
    if a == b && a.is_scalar() {
        let kind = if a.is_float() { OpKind::Float } else { OpKind::Int };
        return Some((a.clone(), kind));
    }
    if let (Some(ra), Some(rb)) = (int_rank(a), int_rank(b)) {
        let (narrow, wide) = if ra < rb { (a, b) } else { (b, a) };
        return safe_cast(narrow, wide).then(|| (wide.clone(), OpKind::Int));
    }
    if let (Some(_), Some(_)) = (int_rank(a), float_rank(b)) {
        return safe_cast(a, b).then(|| (b.clone(), OpKind::Float));
    }
    if let (Some(_), Some(_)) = (float_rank(a), int_rank(b)) {
        return safe_cast(b, a).then(|| (a.clone(), OpKind::Float));
    }
    if let (Some(ra), Some(rb)) = (float_rank(a), float_rank(b)) {
        let (narrow, wide) = if ra < rb { (a, b) } else { (b, a) };
        return safe_cast(narrow, wide).then(|| (wide.clone(), OpKind::Float));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_cast_matches_the_reference_table() {
        assert!(safe_cast(&IrType::Bool, &IrType::F64));
        assert!(safe_cast(&IrType::I16, &IrType::I64));
        assert!(safe_cast(&IrType::I32, &IrType::Bool));
        assert!(!safe_cast(&IrType::I32, &IrType::I16));
        assert!(safe_cast(&IrType::I64, &IrType::I64));
        assert!(!safe_cast(&IrType::I64, &IrType::F32));
        assert!(!safe_cast(&IrType::I64, &IrType::F64));
        assert!(safe_cast(&IrType::F32, &IrType::F64));
        assert!(!safe_cast(&IrType::F64, &IrType::F32));
    }

    #[test]
    fn unify_promotes_narrower_int_to_wider() {
        let (ty, kind) = unify_for_binop(&IrType::I16, &IrType::I32).unwrap();
        assert_eq!(ty, IrType::I32);
        assert_eq!(kind, OpKind::Int);
    }

    #[test]
    fn unify_rejects_i64_against_float() {
        assert!(unify_for_binop(&IrType::I64, &IrType::F32).is_none());
        assert!(unify_for_binop(&IrType::F64, &IrType::I64).is_none());
    }

    #[test]
    fn unify_promotes_int_to_floating() {
        let (ty, kind) = unify_for_binop(&IrType::I32, &IrType::F64).unwrap();
        assert_eq!(ty, IrType::F64);
        assert_eq!(kind, OpKind::Float);
    }
}
