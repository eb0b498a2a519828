//! Method and import stub generation.

use super::expr::ExprWriter;
use super::statement::StatementWriter;
use super::types::{param_list, return_type};
use super::Symbols;
use crate::backend::Backend;
use crate::error::{IndexSpace, Result, TranspileError};
use crate::ir::*;

/// Indentation of members inside the container class.
const MEMBER_DEPTH: usize = 2;
const MEMBER_INDENT: &str = "        ";

fn signature<'m>(module: &'m Module, func: &Function) -> Result<&'m FuncType> {
    module.signature_of(func).ok_or_else(|| {
        TranspileError::invalid_index(
            format!("function {} ({})", func.index, func.name),
            IndexSpace::Type,
            func.type_idx.as_usize() as u32,
        )
    })
}

/// Generate the partial stub declaring an imported function.
pub fn generate_import_stub(module: &Module, func: &Function, symbols: &Symbols) -> Result<String> {
    let FunctionKind::Imported { module: import_module, .. } = &func.kind else {
        return Err(TranspileError::MalformedInput(format!(
            "function {} ({}) is not an import",
            func.index, func.name
        )));
    };
    let sig = signature(module, func)?;
    let mut out = String::new();
    out.push_str(&format!("{MEMBER_INDENT}// Module: {import_module}\n"));
    out.push_str(&format!("{MEMBER_INDENT}// Index: {}\n", func.index));
    out.push_str(&format!(
        "{MEMBER_INDENT}internal static partial {} {}({});\n",
        return_type(sig.result),
        symbols.method_name(func.index)?,
        param_list(&sig.params, "arg")
    ));
    Ok(out)
}

/// Generate the method for a defined function from its translated body.
pub fn generate_method<B: Backend>(
    backend: &B,
    module: &Module,
    func: &Function,
    body: &FunctionBody,
    symbols: &Symbols,
) -> Result<String> {
    let sig = signature(module, func)?;
    let mut out = String::new();

    out.push_str(&format!("{MEMBER_INDENT}// OriginalName: {}\n", func.name.escape_debug()));
    out.push_str(&format!("{MEMBER_INDENT}// Index: {}\n", func.index));
    out.push_str(&format!(
        "{MEMBER_INDENT}internal {} {}({})\n",
        return_type(sig.result),
        symbols.method_name(func.index)?,
        param_list(&sig.params, "local")
    ));
    out.push_str(&format!("{MEMBER_INDENT}{{\n"));

    let mut writer = StatementWriter::new(ExprWriter::new(backend, symbols), MEMBER_DEPTH + 1);
    for decl in &body.declarations {
        writer.declaration(decl);
    }
    writer.statements(&body.statements)?;
    out.push_str(&writer.finish());

    out.push_str(&format!("{MEMBER_INDENT}}}\n"));
    Ok(out)
}
