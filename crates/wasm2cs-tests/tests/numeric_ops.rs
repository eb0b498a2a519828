//! Runtime tests for the numeric instruction set.
//!
//! Covers i64 and float arithmetic, conversions, the trapping cases
//! (division and truncation) and the sign-extension operators.

use wasm2cs_tests::{load, Machine, Trap, Value};

const I64_OPS: &str = r#"
    (module
        (func $div_s (param i64 i64) (result i64) local.get 0 local.get 1 i64.div_s)
        (func $div_u (param i64 i64) (result i64) local.get 0 local.get 1 i64.div_u)
        (func $rem_s (param i64 i64) (result i64) local.get 0 local.get 1 i64.rem_s)
        (func $and (param i64 i64) (result i64) local.get 0 local.get 1 i64.and)
        (func $shl (param i64 i64) (result i64) local.get 0 local.get 1 i64.shl)
        (func $shr_u (param i64 i64) (result i64) local.get 0 local.get 1 i64.shr_u)
        (func $lt_s (param i64 i64) (result i32) local.get 0 local.get 1 i64.lt_s)
        (func $lt_u (param i64 i64) (result i32) local.get 0 local.get 1 i64.lt_u)
        (func $clz (param i64) (result i64) local.get 0 i64.clz)
        (func $popcnt (param i64) (result i64) local.get 0 i64.popcnt)
        (func $rotl (param i64 i64) (result i64) local.get 0 local.get 1 i64.rotl)
        (func $rotr (param i64 i64) (result i64) local.get 0 local.get 1 i64.rotr))
"#;

const I32_OPS: &str = r#"
    (module
        (func $add (param i32 i32) (result i32) local.get 0 local.get 1 i32.add)
        (func $mul (param i32 i32) (result i32) local.get 0 local.get 1 i32.mul)
        (func $div_s (param i32 i32) (result i32) local.get 0 local.get 1 i32.div_s)
        (func $div_u (param i32 i32) (result i32) local.get 0 local.get 1 i32.div_u)
        (func $rem_s (param i32 i32) (result i32) local.get 0 local.get 1 i32.rem_s)
        (func $rem_u (param i32 i32) (result i32) local.get 0 local.get 1 i32.rem_u)
        (func $shr_s (param i32 i32) (result i32) local.get 0 local.get 1 i32.shr_s)
        (func $shr_u (param i32 i32) (result i32) local.get 0 local.get 1 i32.shr_u)
        (func $ge_u (param i32 i32) (result i32) local.get 0 local.get 1 i32.ge_u)
        (func $ctz (param i32) (result i32) local.get 0 i32.ctz)
        (func $rotr (param i32 i32) (result i32) local.get 0 local.get 1 i32.rotr)
        (func $extend8 (param i32) (result i32) local.get 0 i32.extend8_s)
        (func $extend16 (param i32) (result i32) local.get 0 i32.extend16_s))
"#;

const FLOAT_OPS: &str = r#"
    (module
        (func $f64_add (param f64 f64) (result f64) local.get 0 local.get 1 f64.add)
        (func $f64_div (param f64 f64) (result f64) local.get 0 local.get 1 f64.div)
        (func $f64_min (param f64 f64) (result f64) local.get 0 local.get 1 f64.min)
        (func $f64_max (param f64 f64) (result f64) local.get 0 local.get 1 f64.max)
        (func $f64_nearest (param f64) (result f64) local.get 0 f64.nearest)
        (func $f64_sqrt (param f64) (result f64) local.get 0 f64.sqrt)
        (func $f32_copysign (param f32 f32) (result f32) local.get 0 local.get 1 f32.copysign)
        (func $f32_neg (param f32) (result f32) local.get 0 f32.neg)
        (func $f32_trunc (param f32) (result f32) local.get 0 f32.trunc)
        (func $f64_lt (param f64 f64) (result i32) local.get 0 local.get 1 f64.lt)
        (func $f64_ne (param f64 f64) (result i32) local.get 0 local.get 1 f64.ne))
"#;

const CONVERSIONS: &str = r#"
    (module
        (func $wrap (param i64) (result i32) local.get 0 i32.wrap_i64)
        (func $extend_s (param i32) (result i64) local.get 0 i64.extend_i32_s)
        (func $extend_u (param i32) (result i64) local.get 0 i64.extend_i32_u)
        (func $trunc_s (param f64) (result i32) local.get 0 i32.trunc_f64_s)
        (func $trunc_u (param f64) (result i32) local.get 0 i32.trunc_f64_u)
        (func $trunc64_s (param f32) (result i64) local.get 0 i64.trunc_f32_s)
        (func $convert_u (param i32) (result f64) local.get 0 f64.convert_i32_u)
        (func $convert64_s (param i64) (result f32) local.get 0 f32.convert_i64_s)
        (func $demote (param f64) (result f32) local.get 0 f32.demote_f64)
        (func $promote (param f32) (result f64) local.get 0 f64.promote_f32)
        (func $bits (param f32) (result i32) local.get 0 i32.reinterpret_f32)
        (func $from_bits (param i64) (result f64) local.get 0 f64.reinterpret_i64)
        (func $extend32 (param i64) (result i64) local.get 0 i64.extend32_s))
"#;

fn i64_call(m: &mut Machine, name: &str, args: &[i64]) -> Result<i64, Trap> {
    let args: Vec<Value> = args.iter().copied().map(Value::I64).collect();
    m.call_i64(name, &args)
}

fn i32_call(m: &mut Machine, name: &str, args: &[i32]) -> Result<i32, Trap> {
    let args: Vec<Value> = args.iter().copied().map(Value::I32).collect();
    m.call_i32(name, &args)
}

fn f64_call(m: &mut Machine, name: &str, args: &[f64]) -> Option<f64> {
    let args: Vec<Value> = args.iter().copied().map(Value::F64).collect();
    match m.call(name, &args) {
        Ok(Some(Value::F64(v))) => Some(v),
        _ => None,
    }
}

// === i64 operations ===

#[test]
fn test_i64_div_s() {
    let mut m = load(I64_OPS);
    assert_eq!(i64_call(&mut m, "div_s", &[100, 7]), Ok(14));
    assert_eq!(i64_call(&mut m, "div_s", &[-100, 7]), Ok(-14));
    assert_eq!(i64_call(&mut m, "div_s", &[0, 5]), Ok(0));
}

#[test]
fn test_i64_div_traps() {
    let mut m = load(I64_OPS);
    assert_eq!(i64_call(&mut m, "div_s", &[10, 0]), Err(Trap::DivisionByZero));
    assert_eq!(i64_call(&mut m, "div_u", &[10, 0]), Err(Trap::DivisionByZero));
    assert_eq!(i64_call(&mut m, "div_s", &[i64::MIN, -1]), Err(Trap::IntegerOverflow));
}

#[test]
fn test_i64_div_u_treats_operands_unsigned() {
    let mut m = load(I64_OPS);
    assert_eq!(i64_call(&mut m, "div_u", &[-1, 2]), Ok(i64::MAX));
}

#[test]
fn test_i64_rem_s_min_by_neg_one() {
    let mut m = load(I64_OPS);
    assert_eq!(i64_call(&mut m, "rem_s", &[i64::MIN, -1]), Ok(0));
    assert_eq!(i64_call(&mut m, "rem_s", &[-7, 2]), Ok(-1));
}

#[test]
fn test_i64_bitand() {
    let mut m = load(I64_OPS);
    assert_eq!(i64_call(&mut m, "and", &[0xFF00, 0x0FF0]), Ok(0x0F00));
    assert_eq!(i64_call(&mut m, "and", &[-1, 0x1234]), Ok(0x1234));
}

#[test]
fn test_i64_shifts() {
    let mut m = load(I64_OPS);
    assert_eq!(i64_call(&mut m, "shl", &[1, 10]), Ok(1024));
    assert_eq!(i64_call(&mut m, "shl", &[1, 63]), Ok(i64::MIN));
    // shift count is taken modulo 64
    assert_eq!(i64_call(&mut m, "shl", &[1, 64]), Ok(1));
    assert_eq!(i64_call(&mut m, "shr_u", &[-1, 60]), Ok(0xF));
}

#[test]
fn test_i64_comparisons() {
    let mut m = load(I64_OPS);
    let lt = |m: &mut Machine, name, a, b| m.call_i32(name, &[Value::I64(a), Value::I64(b)]);
    assert_eq!(lt(&mut m, "lt_s", 5, 10), Ok(1));
    assert_eq!(lt(&mut m, "lt_s", 10, 5), Ok(0));
    assert_eq!(lt(&mut m, "lt_s", 5, 5), Ok(0));
    assert_eq!(lt(&mut m, "lt_s", -1, 0), Ok(1));
    assert_eq!(lt(&mut m, "lt_u", -1, 0), Ok(0));
}

#[test]
fn test_i64_bit_counts() {
    let mut m = load(I64_OPS);
    assert_eq!(i64_call(&mut m, "clz", &[1]), Ok(63));
    assert_eq!(i64_call(&mut m, "clz", &[0]), Ok(64));
    assert_eq!(i64_call(&mut m, "clz", &[-1]), Ok(0));
    assert_eq!(i64_call(&mut m, "popcnt", &[-1]), Ok(64));
    assert_eq!(i64_call(&mut m, "popcnt", &[0b1011]), Ok(3));
}

#[test]
fn test_i64_rotates() {
    let mut m = load(I64_OPS);
    assert_eq!(i64_call(&mut m, "rotl", &[1, 1]), Ok(2));
    assert_eq!(i64_call(&mut m, "rotl", &[1, 63]), Ok(i64::MIN));
    assert_eq!(
        i64_call(&mut m, "rotl", &[0x0123456789ABCDEFu64 as i64, 4]),
        Ok(0x123456789ABCDEF0u64 as i64)
    );
    assert_eq!(i64_call(&mut m, "rotr", &[1, 1]), Ok(i64::MIN));
}

// === i32 operations ===

#[test]
fn test_i32_wraparound() {
    let mut m = load(I32_OPS);
    assert_eq!(i32_call(&mut m, "add", &[i32::MAX, 1]), Ok(i32::MIN));
    assert_eq!(i32_call(&mut m, "mul", &[0x10000, 0x10000]), Ok(0));
    assert_eq!(i32_call(&mut m, "mul", &[-3, 7]), Ok(-21));
}

#[test]
fn test_i32_division() {
    let mut m = load(I32_OPS);
    assert_eq!(i32_call(&mut m, "div_s", &[-7, 2]), Ok(-3));
    assert_eq!(i32_call(&mut m, "div_u", &[-7, 2]), Ok(0x7FFF_FFFC));
    assert_eq!(i32_call(&mut m, "rem_s", &[-7, 2]), Ok(-1));
    assert_eq!(i32_call(&mut m, "rem_u", &[-7, 2]), Ok(1));
    assert_eq!(i32_call(&mut m, "rem_s", &[i32::MIN, -1]), Ok(0));
}

#[test]
fn test_i32_division_traps() {
    let mut m = load(I32_OPS);
    assert_eq!(i32_call(&mut m, "div_s", &[1, 0]), Err(Trap::DivisionByZero));
    assert_eq!(i32_call(&mut m, "div_u", &[1, 0]), Err(Trap::DivisionByZero));
    assert_eq!(i32_call(&mut m, "rem_s", &[1, 0]), Err(Trap::DivisionByZero));
    assert_eq!(i32_call(&mut m, "rem_u", &[1, 0]), Err(Trap::DivisionByZero));
    assert_eq!(i32_call(&mut m, "div_s", &[i32::MIN, -1]), Err(Trap::IntegerOverflow));
}

#[test]
fn test_i32_shifts_and_compare() {
    let mut m = load(I32_OPS);
    assert_eq!(i32_call(&mut m, "shr_s", &[-16, 2]), Ok(-4));
    assert_eq!(i32_call(&mut m, "shr_u", &[-16, 28]), Ok(0xF));
    assert_eq!(i32_call(&mut m, "shr_s", &[-16, 34]), Ok(-4));
    assert_eq!(i32_call(&mut m, "ge_u", &[-1, 1]), Ok(1));
    assert_eq!(i32_call(&mut m, "ge_u", &[1, -1]), Ok(0));
}

#[test]
fn test_i32_ctz_and_rotr() {
    let mut m = load(I32_OPS);
    assert_eq!(i32_call(&mut m, "ctz", &[0]), Ok(32));
    assert_eq!(i32_call(&mut m, "ctz", &[8]), Ok(3));
    assert_eq!(i32_call(&mut m, "rotr", &[1, 1]), Ok(i32::MIN));
    assert_eq!(i32_call(&mut m, "rotr", &[0x12345678, 8]), Ok(0x78123456));
}

#[test]
fn test_sign_extension() {
    let mut m = load(I32_OPS);
    assert_eq!(i32_call(&mut m, "extend8", &[0x80]), Ok(-128));
    assert_eq!(i32_call(&mut m, "extend8", &[0x17F]), Ok(127));
    assert_eq!(i32_call(&mut m, "extend16", &[0x8000]), Ok(-32768));
    assert_eq!(i32_call(&mut m, "extend16", &[0x1234]), Ok(0x1234));
}

// === float operations ===

#[test]
fn test_f64_arithmetic() {
    let mut m = load(FLOAT_OPS);
    assert_eq!(f64_call(&mut m, "f64_add", &[1.5, 2.25]), Some(3.75));
    assert_eq!(f64_call(&mut m, "f64_div", &[1.0, 0.0]), Some(f64::INFINITY));
    assert_eq!(f64_call(&mut m, "f64_sqrt", &[16.0]), Some(4.0));
    assert!(f64_call(&mut m, "f64_div", &[0.0, 0.0]).is_some_and(f64::is_nan));
}

#[test]
fn test_f64_min_max() {
    let mut m = load(FLOAT_OPS);
    assert_eq!(f64_call(&mut m, "f64_min", &[1.0, -2.0]), Some(-2.0));
    assert_eq!(f64_call(&mut m, "f64_max", &[1.0, -2.0]), Some(1.0));
    let min_zero = f64_call(&mut m, "f64_min", &[0.0, -0.0]).unwrap();
    assert!(min_zero == 0.0 && min_zero.is_sign_negative());
    let max_zero = f64_call(&mut m, "f64_max", &[-0.0, 0.0]).unwrap();
    assert!(max_zero == 0.0 && max_zero.is_sign_positive());
    assert!(f64_call(&mut m, "f64_min", &[f64::NAN, 1.0]).is_some_and(f64::is_nan));
    assert!(f64_call(&mut m, "f64_max", &[1.0, f64::NAN]).is_some_and(f64::is_nan));
}

#[test]
fn test_f64_nearest_rounds_half_to_even() {
    let mut m = load(FLOAT_OPS);
    assert_eq!(f64_call(&mut m, "f64_nearest", &[2.5]), Some(2.0));
    assert_eq!(f64_call(&mut m, "f64_nearest", &[3.5]), Some(4.0));
    assert_eq!(f64_call(&mut m, "f64_nearest", &[-0.5]), Some(-0.0));
    assert_eq!(f64_call(&mut m, "f64_nearest", &[1.4]), Some(1.0));
}

#[test]
fn test_f32_sign_ops() {
    let mut m = load(FLOAT_OPS);
    assert_eq!(
        m.call("f32_copysign", &[Value::F32(3.0), Value::F32(-0.0)]),
        Ok(Some(Value::F32(-3.0)))
    );
    assert_eq!(m.call("f32_neg", &[Value::F32(0.0)]), Ok(Some(Value::F32(-0.0))));
    assert_eq!(m.call("f32_trunc", &[Value::F32(-2.7)]), Ok(Some(Value::F32(-2.0))));
}

#[test]
fn test_f64_comparisons_with_nan() {
    let mut m = load(FLOAT_OPS);
    let cmp = |m: &mut Machine, name, a, b| m.call_i32(name, &[Value::F64(a), Value::F64(b)]);
    assert_eq!(cmp(&mut m, "f64_lt", 1.0, 2.0), Ok(1));
    assert_eq!(cmp(&mut m, "f64_lt", f64::NAN, 2.0), Ok(0));
    assert_eq!(cmp(&mut m, "f64_ne", f64::NAN, f64::NAN), Ok(1));
    assert_eq!(cmp(&mut m, "f64_ne", 2.0, 2.0), Ok(0));
}

// === conversions ===

#[test]
fn test_integer_width_conversions() {
    let mut m = load(CONVERSIONS);
    assert_eq!(m.call_i32("wrap", &[Value::I64(0x1_0000_0005)]), Ok(5));
    assert_eq!(m.call_i64("extend_s", &[Value::I32(-1)]), Ok(-1));
    assert_eq!(m.call_i64("extend_u", &[Value::I32(-1)]), Ok(0xFFFF_FFFF));
    assert_eq!(m.call_i64("extend32", &[Value::I64(0x8000_0000)]), Ok(-0x8000_0000));
}

#[test]
fn test_truncation() {
    let mut m = load(CONVERSIONS);
    assert_eq!(m.call_i32("trunc_s", &[Value::F64(-3.9)]), Ok(-3));
    assert_eq!(m.call_i32("trunc_u", &[Value::F64(4294967295.0)]), Ok(-1));
    assert_eq!(m.call_i32("trunc_u", &[Value::F64(-0.9)]), Ok(0));
    assert_eq!(m.call_i64("trunc64_s", &[Value::F32(-1e10)]), Ok(-10_000_000_000));
}

#[test]
fn test_truncation_traps() {
    let mut m = load(CONVERSIONS);
    assert_eq!(m.call_i32("trunc_s", &[Value::F64(f64::NAN)]), Err(Trap::IntegerOverflow));
    assert_eq!(m.call_i32("trunc_s", &[Value::F64(2147483648.0)]), Err(Trap::IntegerOverflow));
    assert_eq!(m.call_i32("trunc_u", &[Value::F64(-1.0)]), Err(Trap::IntegerOverflow));
    assert_eq!(m.call_i64("trunc64_s", &[Value::F32(f32::INFINITY)]), Err(Trap::IntegerOverflow));
}

#[test]
fn test_float_conversions() {
    let mut m = load(CONVERSIONS);
    assert_eq!(m.call("convert_u", &[Value::I32(-1)]), Ok(Some(Value::F64(4294967295.0))));
    assert_eq!(m.call("convert64_s", &[Value::I64(-8)]), Ok(Some(Value::F32(-8.0))));
    assert_eq!(m.call("demote", &[Value::F64(0.5)]), Ok(Some(Value::F32(0.5))));
    assert_eq!(m.call("promote", &[Value::F32(-1.25)]), Ok(Some(Value::F64(-1.25))));
}

#[test]
fn test_reinterpret() {
    let mut m = load(CONVERSIONS);
    assert_eq!(m.call_i32("bits", &[Value::F32(1.0)]), Ok(0x3F80_0000));
    assert_eq!(m.call_i32("bits", &[Value::F32(-0.0)]), Ok(i32::MIN));
    assert_eq!(
        m.call("from_bits", &[Value::I64(0x4000_0000_0000_0000)]),
        Ok(Some(Value::F64(2.0)))
    );
}

#[test]
fn test_long_addition_chain() {
    // i32.const 0 followed by 100 000 increments and a doubling of the
    // parameter every 1 000 steps
    let mut body = String::from("i32.const 0\n");
    for i in 0..100_000 {
        body.push_str("i32.const 1 i32.add\n");
        if i % 1_000 == 0 {
            body.push_str("local.get 0 i32.add\n");
        }
    }
    let mut m = load(&format!("(module (func $sum (param i32) (result i32) {body}))"));
    assert_eq!(m.call_i32("sum", &[Value::I32(0)]), Ok(100_000));
    assert_eq!(m.call_i32("sum", &[Value::I32(2)]), Ok(100_200));
}

#[test]
fn test_long_float_chain_keeps_order() {
    // ((x * 2) - 1) repeated; evaluation order matters for the result
    let body = "f64.const 2 f64.mul f64.const 1 f64.sub\n".repeat(500);
    let mut m = load(&format!(
        "(module (func $iterate (param f64) (result f64) local.get 0\n{body}))"
    ));
    // x = 1 is a fixed point of x -> 2x - 1
    assert_eq!(m.call("iterate", &[Value::F64(1.0)]), Ok(Some(Value::F64(1.0))));
    let expected = (0..500).fold(0.75f64, |x, _| x * 2.0 - 1.0);
    assert_eq!(m.call("iterate", &[Value::F64(0.75)]), Ok(Some(Value::F64(expected))));
}
