//! C# backend.
//!
//! Integer arithmetic is wrapped in `unchecked(...)` so the result wraps at
//! the declared width regardless of the consumer's project settings.
//! Operations that trap in Wasm map onto C# constructs that throw:
//! integer division by zero, `int.MinValue / -1`, and `checked` float to
//! integer casts.

use crate::backend::Backend;
use crate::codegen::types;
use crate::ir::*;

/// Backend emitting C# expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CSharpBackend;

impl CSharpBackend {
    pub fn new() -> Self {
        CSharpBackend
    }
}

fn unchecked(expr: String) -> String {
    format!("unchecked({expr})")
}

impl Backend for CSharpBackend {
    fn literal(&self, value: Value) -> String {
        types::literal(value)
    }

    fn binop(&self, op: BinOp, lhs: &str, rhs: &str) -> String {
        if op.is_comparison() {
            return format!("({} ? 1 : 0)", self.comparison(op, lhs, rhs));
        }
        match op {
            BinOp::I32Add | BinOp::I64Add => unchecked(format!("{lhs} + {rhs}")),
            BinOp::I32Sub | BinOp::I64Sub => unchecked(format!("{lhs} - {rhs}")),
            BinOp::I32Mul | BinOp::I64Mul => unchecked(format!("{lhs} * {rhs}")),

            // Throws on zero and on MinValue / -1, as Wasm traps.
            BinOp::I32DivS | BinOp::I64DivS => format!("({lhs} / {rhs})"),
            BinOp::I32DivU => unchecked(format!("(int)((uint){lhs} / (uint){rhs})")),
            BinOp::I64DivU => unchecked(format!("(long)((ulong){lhs} / (ulong){rhs})")),

            // MinValue % -1 throws in C# but is 0 in Wasm.
            BinOp::I32RemS => format!("(int)((long){lhs} % (long){rhs})"),
            BinOp::I64RemS => format!("({rhs} == -1L ? 0L : {lhs} % {rhs})"),
            BinOp::I32RemU => unchecked(format!("(int)((uint){lhs} % (uint){rhs})")),
            BinOp::I64RemU => unchecked(format!("(long)((ulong){lhs} % (ulong){rhs})")),

            BinOp::I32And | BinOp::I64And => format!("({lhs} & {rhs})"),
            BinOp::I32Or | BinOp::I64Or => format!("({lhs} | {rhs})"),
            BinOp::I32Xor | BinOp::I64Xor => format!("({lhs} ^ {rhs})"),

            // C# masks the shift count to the operand width.
            BinOp::I32Shl => unchecked(format!("{lhs} << {rhs}")),
            BinOp::I32ShrS => format!("({lhs} >> {rhs})"),
            BinOp::I32ShrU => unchecked(format!("(int)((uint){lhs} >> {rhs})")),
            BinOp::I64Shl => unchecked(format!("{lhs} << (int){rhs}")),
            BinOp::I64ShrS => unchecked(format!("{lhs} >> (int){rhs}")),
            BinOp::I64ShrU => unchecked(format!("(long)((ulong){lhs} >> (int){rhs})")),

            BinOp::I32Rotl => {
                unchecked(format!("(int)BitOperations.RotateLeft((uint){lhs}, {rhs})"))
            }
            BinOp::I32Rotr => {
                unchecked(format!("(int)BitOperations.RotateRight((uint){lhs}, {rhs})"))
            }
            BinOp::I64Rotl => unchecked(format!(
                "(long)BitOperations.RotateLeft((ulong){lhs}, (int){rhs})"
            )),
            BinOp::I64Rotr => unchecked(format!(
                "(long)BitOperations.RotateRight((ulong){lhs}, (int){rhs})"
            )),

            BinOp::F32Add | BinOp::F64Add => format!("({lhs} + {rhs})"),
            BinOp::F32Sub | BinOp::F64Sub => format!("({lhs} - {rhs})"),
            BinOp::F32Mul | BinOp::F64Mul => format!("({lhs} * {rhs})"),
            BinOp::F32Div | BinOp::F64Div => format!("({lhs} / {rhs})"),
            BinOp::F32Min => format!("MathF.Min({lhs}, {rhs})"),
            BinOp::F32Max => format!("MathF.Max({lhs}, {rhs})"),
            BinOp::F32Copysign => format!("MathF.CopySign({lhs}, {rhs})"),
            BinOp::F64Min => format!("Math.Min({lhs}, {rhs})"),
            BinOp::F64Max => format!("Math.Max({lhs}, {rhs})"),
            BinOp::F64Copysign => format!("Math.CopySign({lhs}, {rhs})"),

            // Comparisons were handled above.
            _ => format!("({} ? 1 : 0)", self.comparison(op, lhs, rhs)),
        }
    }

    fn comparison(&self, op: BinOp, lhs: &str, rhs: &str) -> String {
        let (cast, symbol) = match op {
            BinOp::I32Eq | BinOp::I64Eq | BinOp::F32Eq | BinOp::F64Eq => ("", "=="),
            BinOp::I32Ne | BinOp::I64Ne | BinOp::F32Ne | BinOp::F64Ne => ("", "!="),
            BinOp::I32LtS | BinOp::I64LtS | BinOp::F32Lt | BinOp::F64Lt => ("", "<"),
            BinOp::I32GtS | BinOp::I64GtS | BinOp::F32Gt | BinOp::F64Gt => ("", ">"),
            BinOp::I32LeS | BinOp::I64LeS | BinOp::F32Le | BinOp::F64Le => ("", "<="),
            BinOp::I32GeS | BinOp::I64GeS | BinOp::F32Ge | BinOp::F64Ge => ("", ">="),
            BinOp::I32LtU => ("(uint)", "<"),
            BinOp::I32GtU => ("(uint)", ">"),
            BinOp::I32LeU => ("(uint)", "<="),
            BinOp::I32GeU => ("(uint)", ">="),
            BinOp::I64LtU => ("(ulong)", "<"),
            BinOp::I64GtU => ("(ulong)", ">"),
            BinOp::I64LeU => ("(ulong)", "<="),
            BinOp::I64GeU => ("(ulong)", ">="),
            // Not a comparison; test the arithmetic result instead.
            _ => return self.is_nonzero(&self.binop(op, lhs, rhs)),
        };
        if cast.is_empty() {
            format!("({lhs} {symbol} {rhs})")
        } else {
            format!("(unchecked({cast}{lhs} {symbol} {cast}{rhs}))")
        }
    }

    fn unop(&self, op: UnOp, x: &str) -> String {
        match op {
            UnOp::I32Eqz | UnOp::I64Eqz => format!("({} ? 1 : 0)", self.is_zero(x)),

            UnOp::I32Clz => format!("BitOperations.LeadingZeroCount(unchecked((uint){x}))"),
            UnOp::I32Ctz => format!("BitOperations.TrailingZeroCount({x})"),
            UnOp::I32Popcnt => format!("BitOperations.PopCount(unchecked((uint){x}))"),
            UnOp::I64Clz => format!("(long)BitOperations.LeadingZeroCount(unchecked((ulong){x}))"),
            UnOp::I64Ctz => format!("(long)BitOperations.TrailingZeroCount({x})"),
            UnOp::I64Popcnt => format!("(long)BitOperations.PopCount(unchecked((ulong){x}))"),

            UnOp::F32Abs => format!("MathF.Abs({x})"),
            UnOp::F32Neg => format!("(-{x})"),
            UnOp::F32Ceil => format!("MathF.Ceiling({x})"),
            UnOp::F32Floor => format!("MathF.Floor({x})"),
            UnOp::F32Trunc => format!("MathF.Truncate({x})"),
            UnOp::F32Nearest => format!("MathF.Round({x}, MidpointRounding.ToEven)"),
            UnOp::F32Sqrt => format!("MathF.Sqrt({x})"),
            UnOp::F64Abs => format!("Math.Abs({x})"),
            UnOp::F64Neg => format!("(-{x})"),
            UnOp::F64Ceil => format!("Math.Ceiling({x})"),
            UnOp::F64Floor => format!("Math.Floor({x})"),
            UnOp::F64Trunc => format!("Math.Truncate({x})"),
            UnOp::F64Nearest => format!("Math.Round({x}, MidpointRounding.ToEven)"),
            UnOp::F64Sqrt => format!("Math.Sqrt({x})"),

            UnOp::I32WrapI64 => unchecked(format!("(int){x}")),
            UnOp::I64ExtendI32S => format!("((long){x})"),
            UnOp::I64ExtendI32U => format!("((long)unchecked((uint){x}))"),

            UnOp::I32Extend8S => format!("((int)unchecked((sbyte){x}))"),
            UnOp::I32Extend16S => format!("((int)unchecked((short){x}))"),
            UnOp::I64Extend8S => format!("((long)unchecked((sbyte){x}))"),
            UnOp::I64Extend16S => format!("((long)unchecked((short){x}))"),
            UnOp::I64Extend32S => format!("((long)unchecked((int){x}))"),

            // checked casts throw on NaN and on out-of-range values.
            UnOp::I32TruncF32S | UnOp::I32TruncF64S => format!("checked((int){x})"),
            UnOp::I64TruncF32S | UnOp::I64TruncF64S => format!("checked((long){x})"),
            UnOp::I32TruncF32U | UnOp::I32TruncF64U => {
                format!("unchecked((int)checked((uint){x}))")
            }
            UnOp::I64TruncF32U | UnOp::I64TruncF64U => {
                format!("unchecked((long)checked((ulong){x}))")
            }

            UnOp::F32ConvertI32S | UnOp::F32ConvertI64S | UnOp::F32DemoteF64 => {
                format!("((float){x})")
            }
            UnOp::F32ConvertI32U => format!("((float)unchecked((uint){x}))"),
            UnOp::F32ConvertI64U => format!("((float)unchecked((ulong){x}))"),
            UnOp::F64ConvertI32S | UnOp::F64ConvertI64S | UnOp::F64PromoteF32 => {
                format!("((double){x})")
            }
            UnOp::F64ConvertI32U => format!("((double)unchecked((uint){x}))"),
            UnOp::F64ConvertI64U => format!("((double)unchecked((ulong){x}))"),

            UnOp::I32ReinterpretF32 => format!("BitConverter.SingleToInt32Bits({x})"),
            UnOp::I64ReinterpretF64 => format!("BitConverter.DoubleToInt64Bits({x})"),
            UnOp::F32ReinterpretI32 => format!("BitConverter.Int32BitsToSingle({x})"),
            UnOp::F64ReinterpretI64 => format!("BitConverter.Int64BitsToDouble({x})"),
        }
    }

    fn is_zero(&self, operand: &str) -> String {
        format!("({operand} == 0)")
    }

    fn is_nonzero(&self, operand: &str) -> String {
        format!("({operand} != 0)")
    }

    fn trap(&self) -> String {
        "throw new InvalidOperationException(\"unreachable\");".to_string()
    }
}
