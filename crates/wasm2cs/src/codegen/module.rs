//! Whole-file generation.

use super::function::{generate_import_stub, generate_method};
use super::types::{delegate_declaration, delegate_name, literal, value_type};
use super::{NamingContext, Symbols};
use crate::backend::Backend;
use crate::error::{IndexSpace, Result, TranspileError};
use crate::ir::*;
use std::collections::BTreeMap;
use tracing::debug;

const HEADER: &str = "// Code generated by wasm2cs. DO NOT EDIT.\n\
#pragma warning disable 162, 164, 168, 219, 414\n\
using System;\n\
using System.Numerics;\n";

/// Generate the complete C# file.
pub fn generate_module<B: Backend>(
    backend: &B,
    naming: &NamingContext,
    module: &Module,
    bodies: &[FunctionBody],
) -> Result<String> {
    let symbols = Symbols::new(module)?;
    check_member_names(naming, module, &symbols)?;
    let container = &naming.container;
    let mut out = String::new();

    out.push_str(HEADER);
    out.push('\n');
    out.push_str(&format!("namespace {}\n{{\n", naming.namespace));

    // Import stubs
    out.push_str("    static partial class Import\n    {\n");
    for (i, func) in module.imported_functions().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&generate_import_stub(module, func, &symbols)?);
    }
    out.push_str("    }\n\n");

    out.push_str(&format!("    sealed class {container}\n    {{\n"));
    out.push_str(&format!(
        "        public {container}()\n        {{\n            initializeFuncs_();\n        }}\n"
    ));

    if !module.globals.is_empty() {
        out.push('\n');
    }
    for global in &module.globals {
        out.push_str(&format!(
            "        private {} global{} = {};\n",
            value_type(global.kind),
            global.index,
            literal(global.init)
        ));
    }

    let defined: Vec<&Function> = module.defined_functions().collect();
    if defined.len() != bodies.len() {
        return Err(TranspileError::MalformedInput(format!(
            "{} defined functions but {} translated bodies",
            defined.len(),
            bodies.len()
        )));
    }
    for (func, body) in defined.into_iter().zip(bodies) {
        if body.func != func.index {
            return Err(TranspileError::MalformedInput(format!(
                "body for function {} found where function {} was expected",
                body.func, func.index
            )));
        }
        out.push('\n');
        out.push_str(&generate_method(backend, module, func, body, &symbols)?);
    }

    if !module.types.is_empty() {
        out.push('\n');
    }
    for ty in &module.types {
        out.push_str(&format!("        {}\n", delegate_declaration(ty)));
    }

    out.push('\n');
    out.push_str(&generate_table(&module.table));
    out.push('\n');
    out.push_str(&generate_initializer(module, &symbols)?);

    out.push_str("    }\n}\n");

    debug!(
        functions = module.functions.len(),
        bytes = out.len(),
        "generated C# module"
    );
    Ok(out)
}

/// Methods share the container's member namespace with the generated
/// globals and delegates, and may not take the class's own name or the
/// name of the import stub class.
fn check_member_names(naming: &NamingContext, module: &Module, symbols: &Symbols) -> Result<()> {
    let mut taken: BTreeMap<String, String> = BTreeMap::new();
    taken.insert("Import".to_string(), "the import stub class".to_string());
    taken.insert(naming.container.clone(), "the container class".to_string());
    for global in &module.globals {
        taken.insert(format!("global{}", global.index), format!("global {}", global.index));
    }
    for ty in &module.types {
        taken.insert(delegate_name(ty.index), format!("the delegate of type {}", ty.index));
    }

    for func in module.defined_functions() {
        let name = symbols.method_name(func.index)?;
        let owner = format!("function {} ({})", func.index, func.name);
        if let Some(previous) = taken.insert(name.to_string(), owner.clone()) {
            return Err(TranspileError::NameCollision {
                context: owner,
                name: name.to_string(),
                owner: previous,
            });
        }
    }
    Ok(())
}

/// Static table contents: function indices per segment and segment offsets.
fn generate_table(table: &Table) -> String {
    let mut out = String::new();
    if table.segments.is_empty() {
        out.push_str("        private static readonly uint[][] table_ = { };\n");
        out.push_str("        private static readonly uint[] tableOffsets_ = { };\n");
        return out;
    }

    out.push_str("        private static readonly uint[][] table_ =\n        {\n");
    for seg in &table.segments {
        let entries: String = seg
            .functions
            .iter()
            .map(|f| format!("{f}, "))
            .collect();
        out.push_str(&format!("            new uint[] {{ {entries}}},\n"));
    }
    out.push_str("        };\n");

    let offsets: String = table
        .segments
        .iter()
        .map(|seg| format!("{}, ", seg.offset))
        .collect();
    out.push_str(&format!(
        "        private static readonly uint[] tableOffsets_ = {{ {offsets}}};\n"
    ));
    out
}

/// Fields holding one delegate per function and the dispatch array, plus
/// the method the constructor calls to fill them.
fn generate_initializer(module: &Module, symbols: &Symbols) -> Result<String> {
    let mut out = String::new();
    out.push_str("        private object[] funcs_;\n");
    out.push_str("        private object[] dispatch_;\n\n");
    out.push_str("        private void initializeFuncs_()\n        {\n");

    out.push_str("            funcs_ = new object[]\n            {\n");
    for func in &module.functions {
        let ty = module.signature_of(func).ok_or_else(|| {
            TranspileError::invalid_index(
                format!("function {} ({})", func.index, func.name),
                IndexSpace::Type,
                func.type_idx.as_usize() as u32,
            )
        })?;
        out.push_str(&format!(
            "                ({})({}),\n",
            delegate_name(ty.index),
            symbols.callee(func.index)?
        ));
    }
    out.push_str("            };\n");

    out.push_str(&format!(
        "            dispatch_ = new object[{}];\n",
        module.table.size
    ));
    out.push_str(
        "            for (int s = 0; s < table_.Length; s++)\n\
         \x20           {\n\
         \x20               for (int i = 0; i < table_[s].Length; i++)\n\
         \x20               {\n\
         \x20                   dispatch_[(int)tableOffsets_[s] + i] = funcs_[table_[s][i]];\n\
         \x20               }\n\
         \x20           }\n",
    );
    out.push_str("        }\n");
    Ok(out)
}
