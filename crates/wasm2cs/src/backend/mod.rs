//! Code generation backends.
//!
//! The Backend trait isolates how individual Wasm operations are spelled in
//! the output language. The emitter in [`crate::codegen`] walks the statement
//! IR and asks the backend for every operator, literal and condition.

mod csharp;
pub use csharp::CSharpBackend;

use crate::ir::*;

/// Rendering of scalar operations.
///
/// Operands arrive already rendered and are treated as atoms: every
/// returned string must be safe to embed as the operand of another
/// operation without further parenthesization.
pub trait Backend {
    /// Exact literal for a constant.
    fn literal(&self, value: Value) -> String;

    /// A binary operation in value position. Comparisons yield an `i32`
    /// of 0 or 1.
    fn binop(&self, op: BinOp, lhs: &str, rhs: &str) -> String;

    /// A unary operation (including conversions) in value position.
    fn unop(&self, op: UnOp, operand: &str) -> String;

    /// A comparison as a native boolean, for condition position. Condition
    /// strings are fully parenthesized so they can follow `if` directly.
    fn comparison(&self, op: BinOp, lhs: &str, rhs: &str) -> String;

    /// `operand == 0` as a native boolean.
    fn is_zero(&self, operand: &str) -> String;

    /// `operand != 0` as a native boolean.
    fn is_nonzero(&self, operand: &str) -> String;

    /// Conditional value. Both arms have already been evaluated by the
    /// source program, so they must be free of side effects.
    fn select(&self, condition: &str, if_true: &str, if_false: &str) -> String {
        format!("({condition} ? {if_true} : {if_false})")
    }

    /// Statement raising the trap for `unreachable`.
    fn trap(&self) -> String;
}
