//! # Module linker
//!
//! Turns a `ParsedModule` into a linked [`Module`].
//!
//! ```text
//! ParsedModule
//!      │
//!      ├─[signatures]── build_types()      ─► Vec<FuncType>
//!      │
//!      └─[assembly]──── build_functions()  ─► Vec<Function>   (imports, then defined)
//!                       build_globals()    ─► Vec<Global>
//!                       build_table()      ─► Table
//!                            ─► Module ──► translate / codegen
//! ```
//!
//! Function bodies are not touched here; the translator decodes them later
//! against the finished module.

mod assembly;
mod signatures;

use super::types::Module;
use crate::error::Result;
use crate::parser::ParsedModule;
use tracing::debug;

/// Link a decoded module.
///
/// Fails with `UnsupportedSignature` for any signature with more than one
/// result, `InvalidIndex` for dangling type or function references, and
/// `MalformedInput` when the function and code sections disagree in length.
pub fn build_module(parsed: &ParsedModule) -> Result<Module> {
    let types = signatures::build_types(parsed)?;
    let functions = assembly::build_functions(parsed, &types)?;
    let globals = assembly::build_globals(parsed)?;
    let table = assembly::build_table(parsed, functions.len())?;

    debug!(
        types = types.len(),
        functions = functions.len(),
        imports = parsed.imports.len(),
        globals = globals.len(),
        table_size = table.size,
        "linked module"
    );

    Ok(Module {
        types,
        functions,
        globals,
        table,
        num_imported_functions: parsed.imports.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IndexSpace, TranspileError};
    use crate::ir::{FuncIdx, FunctionKind, TypeIdx, Value, ValueKind};
    use crate::parser::parse_wasm;

    fn build(wat: &str) -> Result<Module> {
        let wasm = wat::parse_str(wat).unwrap();
        build_module(&parse_wasm(&wasm).unwrap())
    }

    #[test]
    fn imports_precede_defined_functions() {
        let module = build(
            r#"
            (module
                (import "env" "log" (func (param i32)))
                (import "env" "now" (func (result i64)))
                (func $first (result i32) i32.const 1)
                (func $second (param f64))
            )
        "#,
        )
        .unwrap();

        assert_eq!(module.num_imported_functions, 2);
        assert_eq!(module.functions.len(), 4);
        assert_eq!(module.functions[0].name, "log");
        assert!(module.functions[1].is_imported());
        assert_eq!(module.functions[2].name, "first");
        assert_eq!(module.functions[3].name, "second");

        // Defined functions are paired with their own signatures, not shifted
        // by the import count.
        let first = module.signature_of(&module.functions[2]).unwrap();
        assert_eq!(first.params, vec![]);
        assert_eq!(first.result, Some(ValueKind::I32));
        let second = module.signature_of(&module.functions[3]).unwrap();
        assert_eq!(second.params, vec![ValueKind::F64]);
        assert_eq!(second.result, None);

        for (i, f) in module.functions.iter().enumerate() {
            assert_eq!(f.index, FuncIdx::new(i));
        }
        match &module.functions[0].kind {
            FunctionKind::Imported { module, field } => {
                assert_eq!(module, "env");
                assert_eq!(field, "log");
            }
            FunctionKind::Defined(_) => panic!("expected import"),
        }
    }

    #[test]
    fn names_fall_back_to_exports_then_index() {
        let wasm = wat::parse_str(
            r#"
            (module
                (func (result i32) i32.const 1)
                (func (result i32) i32.const 2)
                (export "answer" (func 1))
            )
        "#,
        )
        .unwrap();
        let mut parsed = parse_wasm(&wasm).unwrap();
        parsed.function_names.clear();
        let module = build_module(&parsed).unwrap();
        assert_eq!(module.functions[0].name, "func0");
        assert_eq!(module.functions[1].name, "answer");
    }

    #[test]
    fn multi_result_signature_is_rejected() {
        let err = build(
            r#"
            (module
                (func (result i32 i32) i32.const 1 i32.const 2)
            )
        "#,
        )
        .unwrap_err();
        match err {
            TranspileError::UnsupportedSignature { results, .. } => assert_eq!(results, 2),
            other => panic!("expected UnsupportedSignature, got {other:?}"),
        }
    }

    #[test]
    fn globals_keep_initializers() {
        let module = build(
            r#"
            (module
                (global (mut i32) (i32.const 42))
                (global f64 (f64.const -0.5))
            )
        "#,
        )
        .unwrap();
        assert_eq!(module.globals.len(), 2);
        assert_eq!(module.globals[0].kind, ValueKind::I32);
        assert!(module.globals[0].mutable);
        assert_eq!(module.globals[0].init, Value::I32(42));
        assert_eq!(module.globals[1].init, Value::F64(-0.5));
    }

    #[test]
    fn table_segments_keep_offsets() {
        let module = build(
            r#"
            (module
                (type $t (func (result i32)))
                (type $u (func (param i32)))
                (table 2 funcref)
                (elem (i32.const 3) $a $b)
                (func $a (type $t) i32.const 1)
                (func $b (type $t) i32.const 2)
                (func $c (type $u))
            )
        "#,
        )
        .unwrap();
        assert_eq!(module.table.segments.len(), 1);
        assert_eq!(module.table.segments[0].offset, 3);
        assert_eq!(
            module.table.segments[0].functions,
            vec![FuncIdx::new(0), FuncIdx::new(1)]
        );
        // Grown to cover the segment.
        assert_eq!(module.table.size, 5);
        let sigs: Vec<_> = module.table_type_indices().into_iter().collect();
        assert_eq!(sigs, vec![TypeIdx::new(0)]);
    }

    #[test]
    fn dangling_element_entry_is_invalid() {
        let wasm = wat::parse_str(
            r#"
            (module
                (table 1 funcref)
                (elem (i32.const 0) 0)
                (func)
            )
        "#,
        )
        .unwrap();
        let mut parsed = parse_wasm(&wasm).unwrap();
        parsed.element_segments[0].func_indices = vec![5];
        match build_module(&parsed).unwrap_err() {
            TranspileError::InvalidIndex { space, index, .. } => {
                assert_eq!(space, IndexSpace::Function);
                assert_eq!(index, 5);
            }
            other => panic!("expected InvalidIndex, got {other:?}"),
        }
    }

    #[test]
    fn section_length_mismatch_is_malformed() {
        let wasm = wat::parse_str("(module (func) (func))").unwrap();
        let mut parsed = parse_wasm(&wasm).unwrap();
        parsed.bodies.pop();
        assert!(matches!(
            build_module(&parsed).unwrap_err(),
            TranspileError::MalformedInput(_)
        ));
    }

    #[test]
    fn duplicate_signatures_stay_distinct() {
        let module = build(
            r#"
            (module
                (type (func (param i32) (result i32)))
                (type (func (param i32) (result i32)))
            )
        "#,
        )
        .unwrap();
        assert_eq!(module.types.len(), 2);
        assert_eq!(module.types[1].index, TypeIdx::new(1));
        assert_eq!(module.types[0].params, module.types[1].params);
    }
}
