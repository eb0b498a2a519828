//! Runtime tests for indirect function calls (call_indirect).
//!
//! These tests verify that:
//! 1. call_indirect dispatches to the function in the selected table slot
//! 2. A signature mismatch traps with IndirectCallTypeMismatch
//! 3. Empty and out-of-range slots trap

use wasm2cs_tests::{load, Machine, Trap, Value};

const DISPATCH: &str = r#"
    (module
        (type $binop (func (param i32 i32) (result i32)))
        (type $unop (func (param i32) (result i32)))

        (table 6 funcref)
        (elem (i32.const 0) $add $sub $mul $negate)

        (func $add (type $binop) local.get 0 local.get 1 i32.add)
        (func $sub (type $binop) local.get 0 local.get 1 i32.sub)
        (func $mul (type $binop) local.get 0 local.get 1 i32.mul)
        (func $negate (type $unop) i32.const 0 local.get 0 i32.sub)

        (func $dispatch_binop (param i32 i32 i32) (result i32)
            local.get 0
            local.get 1
            local.get 2
            call_indirect (type $binop))

        (func $dispatch_unop (param i32 i32) (result i32)
            local.get 0
            local.get 1
            call_indirect (type $unop)))
"#;

fn module() -> Machine {
    load(DISPATCH)
}

fn binop(m: &mut Machine, a: i32, b: i32, slot: i32) -> Result<i32, Trap> {
    m.call_i32(
        "dispatch_binop",
        &[Value::I32(a), Value::I32(b), Value::I32(slot)],
    )
}

fn unop(m: &mut Machine, x: i32, slot: i32) -> Result<i32, Trap> {
    m.call_i32("dispatch_unop", &[Value::I32(x), Value::I32(slot)])
}

// ── dispatch_binop: (i32, i32) -> i32 via $binop ──

#[test]
fn test_binop_dispatch_add() {
    assert_eq!(binop(&mut module(), 10, 3, 0), Ok(13));
}

#[test]
fn test_binop_dispatch_sub() {
    assert_eq!(binop(&mut module(), 10, 3, 1), Ok(7));
}

#[test]
fn test_binop_dispatch_mul() {
    assert_eq!(binop(&mut module(), 10, 3, 2), Ok(30));
}

#[test]
fn test_binop_dispatch_all_ops() {
    let mut m = module();
    for (a, b) in [(1, 2), (100, 50), (-5, 3), (0, 0), (i32::MAX, 2)] {
        assert_eq!(binop(&mut m, a, b, 0), Ok(a.wrapping_add(b)), "add({a}, {b})");
        assert_eq!(binop(&mut m, a, b, 1), Ok(a.wrapping_sub(b)), "sub({a}, {b})");
        assert_eq!(binop(&mut m, a, b, 2), Ok(a.wrapping_mul(b)), "mul({a}, {b})");
    }
}

#[test]
fn test_binop_direct_vs_indirect() {
    let mut m = module();
    for (name, slot) in [("add", 0), ("sub", 1), ("mul", 2)] {
        let direct = m.call_i32(name, &[Value::I32(7), Value::I32(3)]);
        assert_eq!(direct, binop(&mut m, 7, 3, slot), "{name}");
    }
}

// ── dispatch_unop: (i32) -> i32 via $unop ──

#[test]
fn test_unop_dispatch_negate() {
    let mut m = module();
    assert_eq!(unop(&mut m, 42, 3), Ok(-42));
    assert_eq!(unop(&mut m, 0, 3), Ok(0));
    assert_eq!(unop(&mut m, -7, 3), Ok(7));
}

// ── traps ──

#[test]
fn test_type_mismatch_traps() {
    let mut m = module();
    // slot 3 holds a $unop, called as $binop
    assert_eq!(binop(&mut m, 1, 2, 3), Err(Trap::IndirectCallTypeMismatch));
    // slot 0 holds a $binop, called as $unop
    assert_eq!(unop(&mut m, 1, 0), Err(Trap::IndirectCallTypeMismatch));
}

#[test]
fn test_empty_slot_traps() {
    let mut m = module();
    assert_eq!(binop(&mut m, 1, 2, 4), Err(Trap::UndefinedElement));
    assert_eq!(unop(&mut m, 1, 5), Err(Trap::UndefinedElement));
}

#[test]
fn test_out_of_bounds_traps() {
    let mut m = module();
    assert_eq!(binop(&mut m, 1, 2, 6), Err(Trap::TableOutOfBounds));
    assert_eq!(binop(&mut m, 1, 2, 1000), Err(Trap::TableOutOfBounds));
    assert_eq!(binop(&mut m, 1, 2, -1), Err(Trap::TableOutOfBounds));
}

#[test]
fn test_trap_leaves_module_usable() {
    let mut m = module();
    assert!(binop(&mut m, 1, 2, 99).is_err());
    assert_eq!(binop(&mut m, 1, 2, 0), Ok(3));
}

// ── layout of the dispatch table ──

#[test]
fn test_segment_at_offset() {
    let wat = r#"
        (module
            (type $thunk (func (result i32)))
            (table 4 funcref)
            (elem (i32.const 2) $two $three)
            (func $two (type $thunk) i32.const 2)
            (func $three (type $thunk) i32.const 3)
            (func $run (param i32) (result i32)
                local.get 0
                call_indirect (type $thunk)))
    "#;
    let mut m = load(wat);
    assert_eq!(m.call_i32("run", &[Value::I32(2)]), Ok(2));
    assert_eq!(m.call_i32("run", &[Value::I32(3)]), Ok(3));
    assert_eq!(m.call_i32("run", &[Value::I32(0)]), Err(Trap::UndefinedElement));
}

#[test]
fn test_indirect_call_to_import() {
    let wat = r#"
        (module
            (type $sink (func (param i64)))
            (import "host" "emit" (func $emit (type $sink)))
            (table 1 funcref)
            (elem (i32.const 0) $emit)
            (func $send (param i64)
                local.get 0
                i32.const 0
                call_indirect (type $sink)))
    "#;
    let got = std::rc::Rc::new(std::cell::Cell::new(0i64));
    let seen = std::rc::Rc::clone(&got);
    let mut m = load(wat).with_import("host", "emit", move |args| {
        if let Some(Value::I64(v)) = args.first() {
            seen.set(*v);
        }
        Ok(None)
    });
    assert_eq!(m.call("send", &[Value::I64(-99)]), Ok(None));
    assert_eq!(got.get(), -99);
}

#[test]
fn test_indirect_recursion() {
    // factorial through the table
    let wat = r#"
        (module
            (type $f (func (param i64) (result i64)))
            (table 1 funcref)
            (elem (i32.const 0) $fact)
            (func $fact (type $f)
                local.get 0
                i64.const 2
                i64.lt_u
                (if (result i64)
                    (then i64.const 1)
                    (else
                        local.get 0
                        local.get 0
                        i64.const 1
                        i64.sub
                        i32.const 0
                        call_indirect (type $f)
                        i64.mul))))
    "#;
    let mut m = load(wat);
    assert_eq!(m.call_i64("fact", &[Value::I64(10)]), Ok(3_628_800));
    assert_eq!(m.call_i64("fact", &[Value::I64(0)]), Ok(1));
}
