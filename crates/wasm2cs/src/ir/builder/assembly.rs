//! Function, global and table assembly.

use super::super::types::*;
use super::signatures::value_kind;
use crate::error::{IndexSpace, Result, TranspileError};
use crate::parser::{ExportKind, InitValue, ParsedModule};
use std::collections::BTreeMap;

fn check_type_idx(type_idx: u32, types: &[FuncType], context: &str) -> Result<TypeIdx> {
    if (type_idx as usize) < types.len() {
        Ok(TypeIdx::new(type_idx as usize))
    } else {
        Err(TranspileError::invalid_index(
            context,
            IndexSpace::Type,
            type_idx,
        ))
    }
}

/// Build the unified function index space.
///
/// Imports occupy `0..imports`; defined function `i` pairs entry
/// `i - imports` of the function section with entry `i - imports` of the
/// code section.
pub(super) fn build_functions(parsed: &ParsedModule, types: &[FuncType]) -> Result<Vec<Function>> {
    if parsed.func_type_indices.len() != parsed.bodies.len() {
        return Err(TranspileError::MalformedInput(format!(
            "function section declares {} functions but code section has {} bodies",
            parsed.func_type_indices.len(),
            parsed.bodies.len()
        )));
    }

    let num_imports = parsed.imports.len();
    let total = num_imports + parsed.bodies.len();

    // First export name per function, used when the name section is silent.
    let mut export_names: BTreeMap<u32, &str> = BTreeMap::new();
    for export in parsed.exports.iter().filter(|e| e.kind == ExportKind::Func) {
        export_names.entry(export.index).or_insert(&export.name);
    }

    let mut functions = Vec::with_capacity(total);
    for i in 0..total {
        let index = FuncIdx::new(i);
        let context = format!("function {i}");

        if i < num_imports {
            let import = &parsed.imports[i];
            let type_idx = check_type_idx(import.type_idx, types, &context)?;
            functions.push(Function {
                index,
                name: import.name.clone(),
                type_idx,
                kind: FunctionKind::Imported {
                    module: import.module_name.clone(),
                    field: import.name.clone(),
                },
            });
            continue;
        }

        let local = i - num_imports;
        let type_idx = check_type_idx(parsed.func_type_indices[local], types, &context)?;
        let body = &parsed.bodies[local];
        let locals = body
            .locals
            .iter()
            .map(|vt| value_kind(*vt, &context))
            .collect::<Result<Vec<_>>>()?;

        let name = parsed
            .function_names
            .get(&(i as u32))
            .cloned()
            .or_else(|| export_names.get(&(i as u32)).map(|n| n.to_string()))
            .unwrap_or_else(|| format!("func{i}"));

        functions.push(Function {
            index,
            name,
            type_idx,
            kind: FunctionKind::Defined(DefinedBody {
                locals,
                code: body.code.clone(),
                code_offset: body.code_offset,
            }),
        });
    }

    Ok(functions)
}

pub(super) fn build_globals(parsed: &ParsedModule) -> Result<Vec<Global>> {
    parsed
        .globals
        .iter()
        .enumerate()
        .map(|(i, g)| {
            let context = format!("global {i}");
            let kind = value_kind(g.val_type, &context)?;
            let init = match g.init_value {
                InitValue::I32(v) => Value::I32(v),
                InitValue::I64(v) => Value::I64(v),
                InitValue::F32(v) => Value::F32(v),
                InitValue::F64(v) => Value::F64(v),
            };
            if init.kind() != kind {
                return Err(TranspileError::MalformedInput(format!(
                    "{context}: declared {kind} but initialized with {init}"
                )));
            }
            Ok(Global {
                index: GlobalIdx::new(i),
                kind,
                mutable: g.mutable,
                init,
            })
        })
        .collect()
}

/// Build the table from active element segments. Every entry must name an
/// existing function.
pub(super) fn build_table(parsed: &ParsedModule, num_functions: usize) -> Result<Table> {
    let mut size = parsed.table.as_ref().map_or(0, |t| t.initial_size);
    let mut segments = Vec::with_capacity(parsed.element_segments.len());

    for (s, seg) in parsed.element_segments.iter().enumerate() {
        let functions = seg
            .func_indices
            .iter()
            .map(|&f| {
                if (f as usize) < num_functions {
                    Ok(FuncIdx::new(f as usize))
                } else {
                    Err(TranspileError::invalid_index(
                        format!("element segment {s}"),
                        IndexSpace::Function,
                        f,
                    ))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let end = seg.offset.saturating_add(functions.len() as u32);
        size = size.max(end);
        segments.push(TableSegment {
            offset: seg.offset,
            functions,
        });
    }

    Ok(Table { size, segments })
}
