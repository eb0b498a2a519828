//! # Function translator
//!
//! Translates each defined function's stack-machine body into the structured
//! statement IR of [`crate::ir`]. A translator walks the operator stream once,
//! keeping:
//!
//! - an operand stack of deferred pure expressions ([`core`]),
//! - a control stack with one frame per open `block`/`loop`/`if`, seeded
//!   with a frame for the function body itself,
//! - counters for temporaries and labels, local to the function.
//!
//! Calls and trapping operators are bound to temporaries where they execute;
//! writes to locals and globals first spill any pending operand that reads
//! the written slot. Together these keep the original evaluation order.
//!
//! Branches resolve against the control stack: a loop target re-enters the
//! loop, a block or if target assigns the scope's result slot and exits, and
//! the function frame returns.

mod core;
mod operator;

use self::core::FunctionTranslator;
use crate::error::{Result, TranspileError};
use crate::ir::{Function, FunctionBody, Module};
use tracing::{debug, trace};
use wasmparser::BinaryReader;

/// Translate one defined function.
pub fn translate_function(module: &Module, func: &Function) -> Result<FunctionBody> {
    let body = func.body().ok_or_else(|| {
        TranspileError::MalformedInput(format!(
            "function {} ({}) is imported and has no body",
            func.index, func.name
        ))
    })?;

    let mut translator = FunctionTranslator::new(module, func, body)?;
    let mut reader = BinaryReader::new(&body.code, body.code_offset);

    while !reader.eof() {
        if translator.finished.is_some() {
            return Err(translator.malformed("operators after the end of the function"));
        }
        let op = reader
            .read_operator()
            .map_err(|e| translator.malformed(&format!("decoding operator: {e}")))?;
        trace!(index = translator.operator_index, ?op, "translate");
        translator.translate_operator(&op)?;
        translator.operator_index += 1;
    }

    let statements = translator
        .finished
        .take()
        .ok_or_else(|| translator.malformed("function body is missing its final end"))?;

    debug!(
        function = %func.index,
        name = %func.name,
        operators = translator.operator_index,
        statements = statements.len(),
        "translated function"
    );

    Ok(FunctionBody {
        func: func.index,
        declarations: translator.declarations,
        statements,
    })
}

/// Translate every defined function, in declaration order.
pub fn translate_module(module: &Module) -> Result<Vec<FunctionBody>> {
    module
        .defined_functions()
        .map(|func| translate_function(module, func))
        .collect()
}
