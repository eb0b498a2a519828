//! Type section → `FuncType` conversion.

use super::super::types::{FuncType, TypeIdx, ValueKind};
use crate::error::{Result, TranspileError};
use crate::parser::ParsedModule;
use wasmparser::ValType;

/// Convert a value type, failing for vector and reference types.
pub(crate) fn value_kind(vt: ValType, context: &str) -> Result<ValueKind> {
    ValueKind::from_wasmparser(vt)
        .ok_or_else(|| TranspileError::unsupported(context, format!("value type {vt:?}")))
}

/// One `FuncType` per type-section entry, in declaration order. Structurally
/// identical entries stay separate: call sites refer to them by index.
pub(super) fn build_types(parsed: &ParsedModule) -> Result<Vec<FuncType>> {
    parsed
        .types
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            let context = format!("type {i}");
            if ty.results.len() > 1 {
                return Err(TranspileError::UnsupportedSignature {
                    context,
                    results: ty.results.len(),
                });
            }
            let params = ty
                .params
                .iter()
                .map(|vt| value_kind(*vt, &context))
                .collect::<Result<Vec<_>>>()?;
            let result = ty
                .results
                .first()
                .map(|vt| value_kind(*vt, &context))
                .transpose()?;
            Ok(FuncType {
                index: TypeIdx::new(i),
                params,
                result,
            })
        })
        .collect()
}
