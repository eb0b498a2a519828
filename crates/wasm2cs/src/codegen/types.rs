//! Type and signature mapping from Wasm value kinds to C#.

use crate::ir::*;

/// C# type for a value kind.
pub fn value_type(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::I32 => "int",
        ValueKind::I64 => "long",
        ValueKind::F32 => "float",
        ValueKind::F64 => "double",
    }
}

/// C# return type of a signature.
pub fn return_type(result: Option<ValueKind>) -> &'static str {
    result.map_or("void", value_type)
}

/// Name of the delegate type declared for a signature.
pub fn delegate_name(idx: TypeIdx) -> String {
    format!("Type{}", idx)
}

/// Parameter list with the given name prefix: `int arg0, long arg1`.
pub fn param_list(params: &[ValueKind], prefix: &str) -> String {
    params
        .iter()
        .enumerate()
        .map(|(i, kind)| format!("{} {prefix}{i}", value_type(*kind)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `private delegate int Type3(int arg0, long arg1);`
pub fn delegate_declaration(ty: &FuncType) -> String {
    format!(
        "private delegate {} {}({});",
        return_type(ty.result),
        delegate_name(ty.index),
        param_list(&ty.params, "arg")
    )
}

/// Exact C# literal for a constant. Negative values are parenthesized so
/// the literal can be used as the operand of a cast.
pub fn literal(value: Value) -> String {
    match value {
        Value::I32(v) if v < 0 => format!("({v})"),
        Value::I32(v) => v.to_string(),
        Value::I64(v) if v < 0 => format!("({v}L)"),
        Value::I64(v) => format!("{v}L"),
        Value::F32(v) => {
            if v.is_nan() {
                format!("BitConverter.Int32BitsToSingle({})", v.to_bits() as i32)
            } else if v.is_infinite() {
                if v > 0.0 {
                    "float.PositiveInfinity".to_string()
                } else {
                    "float.NegativeInfinity".to_string()
                }
            } else if v.is_sign_negative() {
                format!("({v:?}f)")
            } else {
                format!("{v:?}f")
            }
        }
        Value::F64(v) => {
            if v.is_nan() {
                format!("BitConverter.Int64BitsToDouble({}L)", v.to_bits() as i64)
            } else if v.is_infinite() {
                if v > 0.0 {
                    "double.PositiveInfinity".to_string()
                } else {
                    "double.NegativeInfinity".to_string()
                }
            } else if v.is_sign_negative() {
                format!("({v:?}d)")
            } else {
                format!("{v:?}d")
            }
        }
    }
}
