//! Wasm numeric semantics for the interpreter.
//!
//! ## Float-to-integer truncation
//!
//! Rust's `as` cast for float-to-integer saturates. Wasm traps on NaN and on
//! out-of-range input, so each truncation validates before casting.
//!
//! ## Integer division / remainder
//!
//! `checked_div` returns `None` for both divide-by-zero and `MIN / -1`, and
//! both trap. `MIN rem_s -1` is 0 and does not trap.

use super::Trap;
use wasm2cs::ir::{BinOp, UnOp, Value};

fn kind_mismatch(op: impl std::fmt::Debug, operands: &[Value]) -> Trap {
    Trap::Malformed(format!("operands {operands:?} do not fit {op:?}"))
}

fn flag(cond: bool) -> Value {
    Value::I32(cond as i32)
}

/// Evaluate a binary operator.
pub fn binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, Trap> {
    let value = match (lhs, rhs) {
        (Value::I32(a), Value::I32(b)) => i32_binary(op, a, b),
        (Value::I64(a), Value::I64(b)) => i64_binary(op, a, b),
        (Value::F32(a), Value::F32(b)) => f32_binary(op, a, b),
        (Value::F64(a), Value::F64(b)) => f64_binary(op, a, b),
        _ => None,
    };
    value.unwrap_or_else(|| Err(kind_mismatch(op, &[lhs, rhs])))
}

fn i32_binary(op: BinOp, a: i32, b: i32) -> Option<Result<Value, Trap>> {
    let (ua, ub) = (a as u32, b as u32);
    let v = match op {
        BinOp::I32Add => Value::I32(a.wrapping_add(b)),
        BinOp::I32Sub => Value::I32(a.wrapping_sub(b)),
        BinOp::I32Mul => Value::I32(a.wrapping_mul(b)),
        BinOp::I32DivS => return Some(i32_div_s(a, b).map(Value::I32)),
        BinOp::I32DivU => return Some(i32_div_u(a, b).map(Value::I32)),
        BinOp::I32RemS => return Some(i32_rem_s(a, b).map(Value::I32)),
        BinOp::I32RemU => return Some(i32_rem_u(a, b).map(Value::I32)),
        BinOp::I32And => Value::I32(a & b),
        BinOp::I32Or => Value::I32(a | b),
        BinOp::I32Xor => Value::I32(a ^ b),
        BinOp::I32Shl => Value::I32(a.wrapping_shl(ub)),
        BinOp::I32ShrS => Value::I32(a.wrapping_shr(ub)),
        BinOp::I32ShrU => Value::I32(ua.wrapping_shr(ub) as i32),
        BinOp::I32Rotl => Value::I32(ua.rotate_left(ub % 32) as i32),
        BinOp::I32Rotr => Value::I32(ua.rotate_right(ub % 32) as i32),
        BinOp::I32Eq => flag(a == b),
        BinOp::I32Ne => flag(a != b),
        BinOp::I32LtS => flag(a < b),
        BinOp::I32LtU => flag(ua < ub),
        BinOp::I32GtS => flag(a > b),
        BinOp::I32GtU => flag(ua > ub),
        BinOp::I32LeS => flag(a <= b),
        BinOp::I32LeU => flag(ua <= ub),
        BinOp::I32GeS => flag(a >= b),
        BinOp::I32GeU => flag(ua >= ub),
        _ => return None,
    };
    Some(Ok(v))
}

fn i64_binary(op: BinOp, a: i64, b: i64) -> Option<Result<Value, Trap>> {
    let (ua, ub) = (a as u64, b as u64);
    let v = match op {
        BinOp::I64Add => Value::I64(a.wrapping_add(b)),
        BinOp::I64Sub => Value::I64(a.wrapping_sub(b)),
        BinOp::I64Mul => Value::I64(a.wrapping_mul(b)),
        BinOp::I64DivS => return Some(i64_div_s(a, b).map(Value::I64)),
        BinOp::I64DivU => return Some(i64_div_u(a, b).map(Value::I64)),
        BinOp::I64RemS => return Some(i64_rem_s(a, b).map(Value::I64)),
        BinOp::I64RemU => return Some(i64_rem_u(a, b).map(Value::I64)),
        BinOp::I64And => Value::I64(a & b),
        BinOp::I64Or => Value::I64(a | b),
        BinOp::I64Xor => Value::I64(a ^ b),
        BinOp::I64Shl => Value::I64(a.wrapping_shl(ub as u32)),
        BinOp::I64ShrS => Value::I64(a.wrapping_shr(ub as u32)),
        BinOp::I64ShrU => Value::I64(ua.wrapping_shr(ub as u32) as i64),
        BinOp::I64Rotl => Value::I64(ua.rotate_left((ub % 64) as u32) as i64),
        BinOp::I64Rotr => Value::I64(ua.rotate_right((ub % 64) as u32) as i64),
        BinOp::I64Eq => flag(a == b),
        BinOp::I64Ne => flag(a != b),
        BinOp::I64LtS => flag(a < b),
        BinOp::I64LtU => flag(ua < ub),
        BinOp::I64GtS => flag(a > b),
        BinOp::I64GtU => flag(ua > ub),
        BinOp::I64LeS => flag(a <= b),
        BinOp::I64LeU => flag(ua <= ub),
        BinOp::I64GeS => flag(a >= b),
        BinOp::I64GeU => flag(ua >= ub),
        _ => return None,
    };
    Some(Ok(v))
}

fn f32_binary(op: BinOp, a: f32, b: f32) -> Option<Result<Value, Trap>> {
    let v = match op {
        BinOp::F32Add => Value::F32(a + b),
        BinOp::F32Sub => Value::F32(a - b),
        BinOp::F32Mul => Value::F32(a * b),
        BinOp::F32Div => Value::F32(a / b),
        BinOp::F32Min => Value::F32(f32_min(a, b)),
        BinOp::F32Max => Value::F32(f32_max(a, b)),
        BinOp::F32Copysign => Value::F32(a.copysign(b)),
        BinOp::F32Eq => flag(a == b),
        BinOp::F32Ne => flag(a != b),
        BinOp::F32Lt => flag(a < b),
        BinOp::F32Gt => flag(a > b),
        BinOp::F32Le => flag(a <= b),
        BinOp::F32Ge => flag(a >= b),
        _ => return None,
    };
    Some(Ok(v))
}

fn f64_binary(op: BinOp, a: f64, b: f64) -> Option<Result<Value, Trap>> {
    let v = match op {
        BinOp::F64Add => Value::F64(a + b),
        BinOp::F64Sub => Value::F64(a - b),
        BinOp::F64Mul => Value::F64(a * b),
        BinOp::F64Div => Value::F64(a / b),
        BinOp::F64Min => Value::F64(f64_min(a, b)),
        BinOp::F64Max => Value::F64(f64_max(a, b)),
        BinOp::F64Copysign => Value::F64(a.copysign(b)),
        BinOp::F64Eq => flag(a == b),
        BinOp::F64Ne => flag(a != b),
        BinOp::F64Lt => flag(a < b),
        BinOp::F64Gt => flag(a > b),
        BinOp::F64Le => flag(a <= b),
        BinOp::F64Ge => flag(a >= b),
        _ => return None,
    };
    Some(Ok(v))
}

// NaN propagates; -0.0 orders below +0.0.
fn f32_min(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == b {
        if a.is_sign_negative() { a } else { b }
    } else {
        a.min(b)
    }
}

fn f32_max(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == b {
        if a.is_sign_positive() { a } else { b }
    } else {
        a.max(b)
    }
}

fn f64_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        if a.is_sign_negative() { a } else { b }
    } else {
        a.min(b)
    }
}

fn f64_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        if a.is_sign_positive() { a } else { b }
    } else {
        a.max(b)
    }
}

/// Evaluate a unary operator or conversion.
pub fn unary(op: UnOp, operand: Value) -> Result<Value, Trap> {
    use Value::*;
    let v = match (op, operand) {
        (UnOp::I32Eqz, I32(x)) => flag(x == 0),
        (UnOp::I32Clz, I32(x)) => I32(x.leading_zeros() as i32),
        (UnOp::I32Ctz, I32(x)) => I32(x.trailing_zeros() as i32),
        (UnOp::I32Popcnt, I32(x)) => I32(x.count_ones() as i32),
        (UnOp::I64Eqz, I64(x)) => flag(x == 0),
        (UnOp::I64Clz, I64(x)) => I64(x.leading_zeros() as i64),
        (UnOp::I64Ctz, I64(x)) => I64(x.trailing_zeros() as i64),
        (UnOp::I64Popcnt, I64(x)) => I64(x.count_ones() as i64),

        (UnOp::F32Abs, F32(x)) => F32(x.abs()),
        (UnOp::F32Neg, F32(x)) => F32(-x),
        (UnOp::F32Ceil, F32(x)) => F32(x.ceil()),
        (UnOp::F32Floor, F32(x)) => F32(x.floor()),
        (UnOp::F32Trunc, F32(x)) => F32(x.trunc()),
        (UnOp::F32Nearest, F32(x)) => F32(x.round_ties_even()),
        (UnOp::F32Sqrt, F32(x)) => F32(x.sqrt()),
        (UnOp::F64Abs, F64(x)) => F64(x.abs()),
        (UnOp::F64Neg, F64(x)) => F64(-x),
        (UnOp::F64Ceil, F64(x)) => F64(x.ceil()),
        (UnOp::F64Floor, F64(x)) => F64(x.floor()),
        (UnOp::F64Trunc, F64(x)) => F64(x.trunc()),
        (UnOp::F64Nearest, F64(x)) => F64(x.round_ties_even()),
        (UnOp::F64Sqrt, F64(x)) => F64(x.sqrt()),

        (UnOp::I32WrapI64, I64(x)) => I32(x as i32),
        (UnOp::I64ExtendI32S, I32(x)) => I64(x as i64),
        (UnOp::I64ExtendI32U, I32(x)) => I64(x as u32 as i64),
        (UnOp::I32Extend8S, I32(x)) => I32(x as i8 as i32),
        (UnOp::I32Extend16S, I32(x)) => I32(x as i16 as i32),
        (UnOp::I64Extend8S, I64(x)) => I64(x as i8 as i64),
        (UnOp::I64Extend16S, I64(x)) => I64(x as i16 as i64),
        (UnOp::I64Extend32S, I64(x)) => I64(x as i32 as i64),

        (UnOp::I32TruncF32S, F32(x)) => I32(i32_trunc_f32_s(x)?),
        (UnOp::I32TruncF32U, F32(x)) => I32(i32_trunc_f32_u(x)?),
        (UnOp::I32TruncF64S, F64(x)) => I32(i32_trunc_f64_s(x)?),
        (UnOp::I32TruncF64U, F64(x)) => I32(i32_trunc_f64_u(x)?),
        (UnOp::I64TruncF32S, F32(x)) => I64(i64_trunc_f32_s(x)?),
        (UnOp::I64TruncF32U, F32(x)) => I64(i64_trunc_f32_u(x)?),
        (UnOp::I64TruncF64S, F64(x)) => I64(i64_trunc_f64_s(x)?),
        (UnOp::I64TruncF64U, F64(x)) => I64(i64_trunc_f64_u(x)?),

        (UnOp::F32ConvertI32S, I32(x)) => F32(x as f32),
        (UnOp::F32ConvertI32U, I32(x)) => F32(x as u32 as f32),
        (UnOp::F32ConvertI64S, I64(x)) => F32(x as f32),
        (UnOp::F32ConvertI64U, I64(x)) => F32(x as u64 as f32),
        (UnOp::F64ConvertI32S, I32(x)) => F64(x as f64),
        (UnOp::F64ConvertI32U, I32(x)) => F64(x as u32 as f64),
        (UnOp::F64ConvertI64S, I64(x)) => F64(x as f64),
        (UnOp::F64ConvertI64U, I64(x)) => F64(x as u64 as f64),
        (UnOp::F32DemoteF64, F64(x)) => F32(x as f32),
        (UnOp::F64PromoteF32, F32(x)) => F64(x as f64),

        (UnOp::I32ReinterpretF32, F32(x)) => I32(x.to_bits() as i32),
        (UnOp::I64ReinterpretF64, F64(x)) => I64(x.to_bits() as i64),
        (UnOp::F32ReinterpretI32, I32(x)) => F32(f32::from_bits(x as u32)),
        (UnOp::F64ReinterpretI64, I64(x)) => F64(f64::from_bits(x as u64)),

        _ => return Err(kind_mismatch(op, &[operand])),
    };
    Ok(v)
}

// ── Float → integer trapping truncation ─────────────────────────────────────

fn i32_trunc_f32_s(v: f32) -> Result<i32, Trap> {
    if v.is_nan() || v >= 2147483648.0f32 || v < -2147483648.0f32 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v as i32)
}

// `-0.5` truncates to 0, so only values at -1.0 or below are out of range.
fn i32_trunc_f32_u(v: f32) -> Result<i32, Trap> {
    if v.is_nan() || v >= 4294967296.0f32 || v <= -1.0f32 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v as u32 as i32)
}

fn i32_trunc_f64_s(v: f64) -> Result<i32, Trap> {
    if v.is_nan() || v >= 2147483648.0f64 || v <= -2147483649.0f64 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v as i32)
}

fn i32_trunc_f64_u(v: f64) -> Result<i32, Trap> {
    if v.is_nan() || v >= 4294967296.0f64 || v <= -1.0f64 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v as u32 as i32)
}

fn i64_trunc_f32_s(v: f32) -> Result<i64, Trap> {
    if v.is_nan() || v >= 9223372036854775808.0f32 || v < -9223372036854775808.0f32 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v as i64)
}

fn i64_trunc_f32_u(v: f32) -> Result<i64, Trap> {
    if v.is_nan() || v >= 18446744073709551616.0f32 || v <= -1.0f32 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v as u64 as i64)
}

fn i64_trunc_f64_s(v: f64) -> Result<i64, Trap> {
    if v.is_nan() || v >= 9223372036854775808.0f64 || v < -9223372036854775808.0f64 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v as i64)
}

fn i64_trunc_f64_u(v: f64) -> Result<i64, Trap> {
    if v.is_nan() || v >= 18446744073709551616.0f64 || v <= -1.0f64 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v as u64 as i64)
}

// ── Division / remainder ────────────────────────────────────────────────────

fn i32_div_s(lhs: i32, rhs: i32) -> Result<i32, Trap> {
    match rhs {
        0 => Err(Trap::DivisionByZero),
        _ => lhs.checked_div(rhs).ok_or(Trap::IntegerOverflow),
    }
}

fn i32_div_u(lhs: i32, rhs: i32) -> Result<i32, Trap> {
    (lhs as u32)
        .checked_div(rhs as u32)
        .map(|v| v as i32)
        .ok_or(Trap::DivisionByZero)
}

fn i32_rem_s(lhs: i32, rhs: i32) -> Result<i32, Trap> {
    if rhs == 0 {
        return Err(Trap::DivisionByZero);
    }
    Ok(lhs.wrapping_rem(rhs))
}

fn i32_rem_u(lhs: i32, rhs: i32) -> Result<i32, Trap> {
    (lhs as u32)
        .checked_rem(rhs as u32)
        .map(|v| v as i32)
        .ok_or(Trap::DivisionByZero)
}

fn i64_div_s(lhs: i64, rhs: i64) -> Result<i64, Trap> {
    match rhs {
        0 => Err(Trap::DivisionByZero),
        _ => lhs.checked_div(rhs).ok_or(Trap::IntegerOverflow),
    }
}

fn i64_div_u(lhs: i64, rhs: i64) -> Result<i64, Trap> {
    (lhs as u64)
        .checked_div(rhs as u64)
        .map(|v| v as i64)
        .ok_or(Trap::DivisionByZero)
}

fn i64_rem_s(lhs: i64, rhs: i64) -> Result<i64, Trap> {
    if rhs == 0 {
        return Err(Trap::DivisionByZero);
    }
    Ok(lhs.wrapping_rem(rhs))
}

fn i64_rem_u(lhs: i64, rhs: i64) -> Result<i64, Trap> {
    (lhs as u64)
        .checked_rem(rhs as u64)
        .map(|v| v as i64)
        .ok_or(Trap::DivisionByZero)
}
