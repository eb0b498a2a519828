//! Structured statement IR for translated function bodies.
//!
//! The translator turns each stack-machine body into a tree of [`Stmt`]s over
//! named variables. Expressions are trees of pure operations; anything with a
//! side effect or a trap (calls, integer division, float-to-int truncation)
//! is bound to a temporary by a [`Stmt::Let`] at the point it executes.

use super::types::{FuncIdx, GlobalIdx, TypeIdx, Value, ValueKind};
use std::fmt;

/// A temporary introduced by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(pub u32);

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stack_v{}", self.0)
    }
}

/// Label of a structured scope (block, loop or if). Unique per function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label{}", self.0)
    }
}

/// An addressable storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Var {
    /// Parameter or declared local, by local index.
    Local(u32),
    Global(GlobalIdx),
    Temp(TempId),
    /// Result slot of the scope with this label.
    Result(Label),
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Local(n) => write!(f, "local{n}"),
            Var::Global(g) => write!(f, "global{g}"),
            Var::Temp(t) => write!(f, "{t}"),
            Var::Result(label) => write!(f, "result_v{}", label.0),
        }
    }
}

/// Binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // i32 arithmetic
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I32Rotl,
    I32Rotr,

    // i32 comparisons
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,

    // i64 arithmetic
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    I64Rotl,
    I64Rotr,

    // i64 comparisons
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,

    // f32
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F32Min,
    F32Max,
    F32Copysign,
    F32Eq,
    F32Ne,
    F32Lt,
    F32Gt,
    F32Le,
    F32Ge,

    // f64
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
    F64Min,
    F64Max,
    F64Copysign,
    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,
}

/// Unary operations, conversions included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    I32Clz,
    I32Ctz,
    I32Popcnt,
    I32Eqz,
    I64Clz,
    I64Ctz,
    I64Popcnt,
    I64Eqz,

    F32Abs,
    F32Neg,
    F32Ceil,
    F32Floor,
    F32Trunc,
    F32Nearest,
    F32Sqrt,
    F64Abs,
    F64Neg,
    F64Ceil,
    F64Floor,
    F64Trunc,
    F64Nearest,
    F64Sqrt,

    I32WrapI64,
    I64ExtendI32S,
    I64ExtendI32U,

    // Sign extension (in place)
    I32Extend8S,
    I32Extend16S,
    I64Extend8S,
    I64Extend16S,
    I64Extend32S,

    // Float → int, trapping on NaN and overflow
    I32TruncF32S,
    I32TruncF32U,
    I32TruncF64S,
    I32TruncF64U,
    I64TruncF32S,
    I64TruncF32U,
    I64TruncF64S,
    I64TruncF64U,

    F32ConvertI32S,
    F32ConvertI32U,
    F32ConvertI64S,
    F32ConvertI64U,
    F64ConvertI32S,
    F64ConvertI32U,
    F64ConvertI64S,
    F64ConvertI64U,

    F32DemoteF64,
    F64PromoteF32,

    I32ReinterpretF32,
    I64ReinterpretF64,
    F32ReinterpretI32,
    F64ReinterpretI64,
}

impl BinOp {
    /// Kind of the value this operation produces. Comparisons produce i32.
    pub fn result_type(&self) -> ValueKind {
        use BinOp::*;
        match self {
            I32Add | I32Sub | I32Mul | I32DivS | I32DivU | I32RemS | I32RemU | I32And | I32Or
            | I32Xor | I32Shl | I32ShrS | I32ShrU | I32Rotl | I32Rotr => ValueKind::I32,

            I64Add | I64Sub | I64Mul | I64DivS | I64DivU | I64RemS | I64RemU | I64And | I64Or
            | I64Xor | I64Shl | I64ShrS | I64ShrU | I64Rotl | I64Rotr => ValueKind::I64,

            F32Add | F32Sub | F32Mul | F32Div | F32Min | F32Max | F32Copysign => ValueKind::F32,
            F64Add | F64Sub | F64Mul | F64Div | F64Min | F64Max | F64Copysign => ValueKind::F64,

            _ => ValueKind::I32,
        }
    }

    /// Kind of both operands.
    pub fn operand_type(&self) -> ValueKind {
        use BinOp::*;
        match self {
            I32Add | I32Sub | I32Mul | I32DivS | I32DivU | I32RemS | I32RemU | I32And | I32Or
            | I32Xor | I32Shl | I32ShrS | I32ShrU | I32Rotl | I32Rotr | I32Eq | I32Ne
            | I32LtS | I32LtU | I32GtS | I32GtU | I32LeS | I32LeU | I32GeS | I32GeU => {
                ValueKind::I32
            }

            I64Add | I64Sub | I64Mul | I64DivS | I64DivU | I64RemS | I64RemU | I64And | I64Or
            | I64Xor | I64Shl | I64ShrS | I64ShrU | I64Rotl | I64Rotr | I64Eq | I64Ne
            | I64LtS | I64LtU | I64GtS | I64GtU | I64LeS | I64LeU | I64GeS | I64GeU => {
                ValueKind::I64
            }

            F32Add | F32Sub | F32Mul | F32Div | F32Min | F32Max | F32Copysign | F32Eq | F32Ne
            | F32Lt | F32Gt | F32Le | F32Ge => ValueKind::F32,

            F64Add | F64Sub | F64Mul | F64Div | F64Min | F64Max | F64Copysign | F64Eq | F64Ne
            | F64Lt | F64Gt | F64Le | F64Ge => ValueKind::F64,
        }
    }

    pub fn is_comparison(&self) -> bool {
        use BinOp::*;
        matches!(
            self,
            I32Eq
                | I32Ne
                | I32LtS
                | I32LtU
                | I32GtS
                | I32GtU
                | I32LeS
                | I32LeU
                | I32GeS
                | I32GeU
                | I64Eq
                | I64Ne
                | I64LtS
                | I64LtU
                | I64GtS
                | I64GtU
                | I64LeS
                | I64LeU
                | I64GeS
                | I64GeU
                | F32Eq
                | F32Ne
                | F32Lt
                | F32Gt
                | F32Le
                | F32Ge
                | F64Eq
                | F64Ne
                | F64Lt
                | F64Gt
                | F64Le
                | F64Ge
        )
    }

    /// Integer division and remainder trap on a zero divisor (and signed
    /// division on overflow).
    pub fn can_trap(&self) -> bool {
        use BinOp::*;
        matches!(
            self,
            I32DivS | I32DivU | I32RemS | I32RemU | I64DivS | I64DivU | I64RemS | I64RemU
        )
    }
}

impl UnOp {
    /// Kind of the value this operation produces. Tests produce i32.
    pub fn result_type(&self) -> ValueKind {
        use UnOp::*;
        match self {
            I32Clz | I32Ctz | I32Popcnt | I32Eqz | I64Eqz | I32WrapI64 | I32Extend8S
            | I32Extend16S | I32TruncF32S | I32TruncF32U | I32TruncF64S | I32TruncF64U
            | I32ReinterpretF32 => ValueKind::I32,

            I64Clz | I64Ctz | I64Popcnt | I64ExtendI32S | I64ExtendI32U | I64Extend8S
            | I64Extend16S | I64Extend32S | I64TruncF32S | I64TruncF32U | I64TruncF64S
            | I64TruncF64U | I64ReinterpretF64 => ValueKind::I64,

            F32Abs | F32Neg | F32Ceil | F32Floor | F32Trunc | F32Nearest | F32Sqrt
            | F32ConvertI32S | F32ConvertI32U | F32ConvertI64S | F32ConvertI64U
            | F32DemoteF64 | F32ReinterpretI32 => ValueKind::F32,

            F64Abs | F64Neg | F64Ceil | F64Floor | F64Trunc | F64Nearest | F64Sqrt
            | F64ConvertI32S | F64ConvertI32U | F64ConvertI64S | F64ConvertI64U
            | F64PromoteF32 | F64ReinterpretI64 => ValueKind::F64,
        }
    }

    /// Kind of the operand.
    pub fn operand_type(&self) -> ValueKind {
        use UnOp::*;
        match self {
            I32Clz | I32Ctz | I32Popcnt | I32Eqz | I32Extend8S | I32Extend16S
            | I64ExtendI32S | I64ExtendI32U | F32ConvertI32S | F32ConvertI32U
            | F64ConvertI32S | F64ConvertI32U | F32ReinterpretI32 => ValueKind::I32,

            I64Clz | I64Ctz | I64Popcnt | I64Eqz | I64Extend8S | I64Extend16S | I64Extend32S
            | I32WrapI64 | F32ConvertI64S | F32ConvertI64U | F64ConvertI64S
            | F64ConvertI64U | F64ReinterpretI64 => ValueKind::I64,

            F32Abs | F32Neg | F32Ceil | F32Floor | F32Trunc | F32Nearest | F32Sqrt
            | I32TruncF32S | I32TruncF32U | I64TruncF32S | I64TruncF32U | F64PromoteF32
            | I32ReinterpretF32 => ValueKind::F32,

            F64Abs | F64Neg | F64Ceil | F64Floor | F64Trunc | F64Nearest | F64Sqrt
            | I32TruncF64S | I32TruncF64U | I64TruncF64S | I64TruncF64U | F32DemoteF64
            | I64ReinterpretF64 => ValueKind::F64,
        }
    }

    /// Float-to-integer truncations trap on NaN and out-of-range input.
    pub fn can_trap(&self) -> bool {
        use UnOp::*;
        matches!(
            self,
            I32TruncF32S
                | I32TruncF32U
                | I32TruncF64S
                | I32TruncF64U
                | I64TruncF32S
                | I64TruncF32U
                | I64TruncF64S
                | I64TruncF64U
        )
    }
}

/// An expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(Value),
    Get(Var),
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `condition != 0 ? if_true : if_false`; both arms are evaluated.
    Select {
        condition: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    Call {
        callee: FuncIdx,
        args: Vec<Expr>,
    },
    /// Call through table slot `index`, typed by the call site's signature.
    CallIndirect {
        type_idx: TypeIdx,
        index: Box<Expr>,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn get(var: Var) -> Self {
        Expr::Get(var)
    }

    pub fn unary(op: UnOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Constants and variable reads: cheap to duplicate.
    pub fn is_simple(&self) -> bool {
        matches!(self, Expr::Const(_) | Expr::Get(_))
    }

    /// True when evaluating the expression later could observe a different
    /// value than evaluating it now, given writes to `var`.
    pub fn reads(&self, var: Var) -> bool {
        self.any_var(&|v| v == var)
    }

    pub fn reads_any_global(&self) -> bool {
        self.any_var(&|v| matches!(v, Var::Global(_)))
    }

    /// Reads a local or a global, whose value may change before use.
    pub fn reads_mutable_state(&self) -> bool {
        self.any_var(&|v| matches!(v, Var::Local(_) | Var::Global(_)))
    }

    fn any_var(&self, pred: &dyn Fn(Var) -> bool) -> bool {
        match self {
            Expr::Const(_) => false,
            Expr::Get(v) => pred(*v),
            Expr::Unary { operand, .. } => operand.any_var(pred),
            Expr::Binary { lhs, rhs, .. } => lhs.any_var(pred) || rhs.any_var(pred),
            Expr::Select {
                condition,
                if_true,
                if_false,
            } => condition.any_var(pred) || if_true.any_var(pred) || if_false.any_var(pred),
            Expr::Call { args, .. } => args.iter().any(|a| a.any_var(pred)),
            Expr::CallIndirect { index, args, .. } => {
                index.any_var(pred) || args.iter().any(|a| a.any_var(pred))
            }
        }
    }
}

/// How a branch transfers control to its target scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// Re-enter a loop at its top.
    Restart,
    /// Continue after the end of a block or if.
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign {
        target: Var,
        value: Expr,
    },
    /// Declare and initialize a temporary.
    Let {
        temp: TempId,
        kind: ValueKind,
        value: Expr,
    },
    /// Evaluate for side effects only (a call without a result).
    Eval(Expr),
    Return(Option<Expr>),
    Block {
        label: Label,
        body: Vec<Stmt>,
    },
    Loop {
        label: Label,
        body: Vec<Stmt>,
    },
    If {
        label: Label,
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    Br {
        target: Label,
        kind: BranchKind,
    },
    /// Run `transfer` (result assignment plus a branch or return) when
    /// `condition` is non-zero.
    BranchIf {
        condition: Expr,
        transfer: Vec<Stmt>,
    },
    /// Run `cases[index]`, or `default` when out of range.
    BranchTable {
        index: Expr,
        cases: Vec<Vec<Stmt>>,
        default: Vec<Stmt>,
    },
    Trap,
}

/// A local slot the emitted method must declare before its statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    pub var: Var,
    pub kind: ValueKind,
}

/// Translation result for one defined function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    pub func: FuncIdx,
    /// Declared locals (zero-initialized) followed by scope result slots.
    pub declarations: Vec<Declaration>,
    pub statements: Vec<Stmt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_display_names() {
        assert_eq!(Var::Local(3).to_string(), "local3");
        assert_eq!(Var::Global(GlobalIdx::new(1)).to_string(), "global1");
        assert_eq!(Var::Temp(TempId(7)).to_string(), "stack_v7");
        assert_eq!(Var::Result(Label(2)).to_string(), "result_v2");
        assert_eq!(Label(4).to_string(), "label4");
    }

    #[test]
    fn reads_tracks_nested_uses() {
        let e = Expr::binary(
            BinOp::I32Add,
            Expr::get(Var::Local(0)),
            Expr::unary(UnOp::I32Clz, Expr::get(Var::Global(GlobalIdx::new(2)))),
        );
        assert!(e.reads(Var::Local(0)));
        assert!(!e.reads(Var::Local(1)));
        assert!(e.reads_any_global());
        assert!(e.reads_mutable_state());

        let stable = Expr::binary(
            BinOp::I32Add,
            Expr::get(Var::Temp(TempId(0))),
            Expr::Const(Value::I32(1)),
        );
        assert!(!stable.reads_mutable_state());
    }

    #[test]
    fn comparisons_produce_i32() {
        assert!(BinOp::I64LtU.is_comparison());
        assert_eq!(BinOp::I64LtU.result_type(), ValueKind::I32);
        assert_eq!(BinOp::I64LtU.operand_type(), ValueKind::I64);
        assert_eq!(UnOp::I64Eqz.result_type(), ValueKind::I32);
        assert!(!BinOp::F64Add.is_comparison());
    }

    #[test]
    fn trapping_ops() {
        assert!(BinOp::I32RemU.can_trap());
        assert!(!BinOp::F32Div.can_trap());
        assert!(UnOp::I64TruncF64U.can_trap());
        assert!(!UnOp::F32ConvertI64U.can_trap());
    }
}
