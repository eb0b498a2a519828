//! Execution tests for wasm2cs.
//!
//! The generated C# needs a .NET toolchain to run, so these tests execute
//! the translated statement IR directly with [`eval::Machine`]. Every
//! construct the emitter renders (scopes, branches, temporaries, calls)
//! runs here with the same meaning.

pub mod eval;

pub use eval::{Machine, Trap};
pub use wasm2cs::ir::Value;

/// Load a WAT module, panicking with the translation error on failure.
pub fn load(wat: &str) -> Machine {
    match Machine::from_wat(wat) {
        Ok(machine) => machine,
        Err(err) => panic!("failed to load module: {err:#}"),
    }
}

/// Iterative Fibonacci with Wasm `i32` wraparound.
pub fn fibo_orig(n: i32) -> i32 {
    if n <= 1 {
        n
    } else {
        let mut a: i32 = 0;
        let mut b: i32 = 1;
        for _ in 2..=n {
            let tmp = a.wrapping_add(b);
            a = b;
            b = tmp;
        }
        b
    }
}
