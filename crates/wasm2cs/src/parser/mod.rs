//! WebAssembly module decoder.
//!
//! This module wraps the `wasmparser` crate and extracts the sections the
//! translator cares about into plain owned data. No cross-section linking
//! happens here: the function section and the code section stay in separate
//! arrays and are paired by the IR builder.

use crate::error::{ReadContext, Result, TranspileError};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use wasmparser::{
    Encoding, ExternalKind, KnownCustom, Name, Operator, Parser, Payload, TypeRef, ValType,
};

/// A function signature exactly as declared in the type section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedType {
    pub params: Vec<ValType>,
    pub results: Vec<ValType>,
}

/// A function import.
#[derive(Debug, Clone)]
pub struct ImportInfo {
    /// The import module name (e.g., "env").
    pub module_name: String,
    /// The import field name (e.g., "log").
    pub name: String,
    /// Index into the type section.
    pub type_idx: u32,
}

/// A code section entry.
#[derive(Debug, Clone)]
pub struct ParsedBody {
    /// Declared locals, expanded (parameters are not included).
    pub locals: Vec<ValType>,
    /// Raw operator bytes, decoded later by the function translator.
    pub code: Vec<u8>,
    /// Offset of `code` within the original binary, for error positions.
    pub code_offset: usize,
}

/// Information about a single Wasm global variable.
#[derive(Debug, Clone)]
pub struct GlobalInfo {
    pub val_type: ValType,
    pub mutable: bool,
    pub init_value: InitValue,
}

/// Parsed constant initializer expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitValue {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

/// Table declaration (MVP: at most one funcref table).
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub initial_size: u32,
}

/// An active element segment.
#[derive(Debug, Clone)]
pub struct ElementSegment {
    /// Starting offset in the table.
    pub offset: u32,
    /// Function indices placed into the table starting at `offset`.
    pub func_indices: Vec<u32>,
}

/// Kind of export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Func,
    Table,
    Memory,
    Global,
}

/// An export from the module.
#[derive(Debug, Clone)]
pub struct ExportInfo {
    pub name: String,
    pub kind: ExportKind,
    pub index: u32,
}

/// Decoded WebAssembly module, before linking.
#[derive(Debug, Clone, Default)]
pub struct ParsedModule {
    /// Type section, in declaration order
    pub types: Vec<ParsedType>,

    /// Function imports; these occupy indices `0..imports.len()` of the
    /// function index space
    pub imports: Vec<ImportInfo>,

    /// Function section: type index of each defined function
    pub func_type_indices: Vec<u32>,

    /// Code section entries, in declaration order
    pub bodies: Vec<ParsedBody>,

    pub globals: Vec<GlobalInfo>,

    pub table: Option<TableInfo>,

    pub element_segments: Vec<ElementSegment>,

    pub exports: Vec<ExportInfo>,

    /// Function names from the `name` custom section, keyed by function index
    pub function_names: BTreeMap<u32, String>,
}

/// Evaluate a constant expression (a single `*.const` operator).
fn eval_const_expr(const_expr: wasmparser::ConstExpr, what: &str) -> Result<InitValue> {
    let mut reader = const_expr.get_operators_reader();
    let op = reader.read().reading(what)?;
    match op {
        Operator::I32Const { value } => Ok(InitValue::I32(value)),
        Operator::I64Const { value } => Ok(InitValue::I64(value)),
        Operator::F32Const { value } => Ok(InitValue::F32(f32::from_bits(value.bits()))),
        Operator::F64Const { value } => Ok(InitValue::F64(f64::from_bits(value.bits()))),
        other => Err(TranspileError::unsupported(
            what,
            format!("non-constant initializer {other:?}"),
        )),
    }
}

/// Parse an active element segment, or return None for passive/declared segments.
fn parse_element_segment(element: wasmparser::Element) -> Result<Option<ElementSegment>> {
    match element.kind {
        wasmparser::ElementKind::Active {
            table_index,
            offset_expr,
        } => {
            let tidx = table_index.unwrap_or(0);
            if tidx != 0 {
                return Err(TranspileError::unsupported(
                    "element segment",
                    format!("table index {tidx}"),
                ));
            }

            let offset = match eval_const_expr(offset_expr, "element segment offset")? {
                InitValue::I32(v) => v as u32,
                other => {
                    return Err(TranspileError::MalformedInput(format!(
                        "element segment offset must be i32, found {other:?}"
                    )))
                }
            };

            let mut func_indices = Vec::new();
            match element.items {
                wasmparser::ElementItems::Functions(funcs) => {
                    for func_idx in funcs {
                        func_indices.push(func_idx.reading("element function index")?);
                    }
                }
                wasmparser::ElementItems::Expressions(..) => {
                    return Err(TranspileError::unsupported(
                        "element segment",
                        "expression-based element items",
                    ));
                }
            }

            Ok(Some(ElementSegment {
                offset,
                func_indices,
            }))
        }
        // Passive and declared segments never populate the table at start-up.
        wasmparser::ElementKind::Passive | wasmparser::ElementKind::Declared => Ok(None),
    }
}

/// Upper bound on declared locals per function, matching the limit the
/// wasmparser validator enforces.
const MAX_LOCALS: u32 = 50_000;

/// Parse a code section entry, extracting locals and the operator bytes.
fn parse_code_entry(body: wasmparser::FunctionBody) -> Result<ParsedBody> {
    let mut locals = Vec::new();
    let mut total: u32 = 0;
    let locals_reader = body.get_locals_reader().reading("locals")?;
    for local in locals_reader {
        let (count, val_type) = local.reading("local declaration")?;
        total = total
            .checked_add(count)
            .filter(|&n| n <= MAX_LOCALS)
            .ok_or_else(|| {
                TranspileError::MalformedInput(format!(
                    "function declares more than {MAX_LOCALS} locals"
                ))
            })?;
        locals.extend(std::iter::repeat(val_type).take(count as usize));
    }

    let operators_reader = body.get_operators_reader().reading("function body")?;
    let mut binary_reader = operators_reader.get_binary_reader();
    let code_offset = binary_reader.original_position();
    let remaining = binary_reader.bytes_remaining();
    let code = binary_reader
        .read_bytes(remaining)
        .reading("function body bytes")?;

    Ok(ParsedBody {
        locals,
        code: code.to_vec(),
        code_offset,
    })
}

/// Collect function names from a `name` custom section. Names are advisory,
/// so a malformed subsection is logged and skipped.
fn parse_function_names(
    reader: wasmparser::NameSectionReader<'_>,
    names: &mut BTreeMap<u32, String>,
) {
    for subsection in reader {
        let subsection = match subsection {
            Ok(s) => s,
            Err(e) => {
                warn!("ignoring malformed name section: {e}");
                return;
            }
        };
        if let Name::Function(map) = subsection {
            for naming in map {
                match naming {
                    Ok(naming) => {
                        names.insert(naming.index, naming.name.to_string());
                    }
                    Err(e) => {
                        warn!("ignoring malformed function name entry: {e}");
                        return;
                    }
                }
            }
        }
    }
}

/// Parse a WebAssembly binary into a [`ParsedModule`].
pub fn parse_wasm(wasm_bytes: &[u8]) -> Result<ParsedModule> {
    let parser = Parser::new(0);
    let mut module = ParsedModule::default();

    for payload in parser.parse_all(wasm_bytes) {
        let payload = payload.reading("module payload")?;

        match payload {
            Payload::Version { encoding, .. } => {
                if encoding != Encoding::Module {
                    return Err(TranspileError::MalformedInput(
                        "component binaries are not core modules".to_string(),
                    ));
                }
            }

            Payload::TypeSection(reader) => {
                for rec_group in reader {
                    let rec_group = rec_group.reading("type section")?;
                    for sub_type in rec_group.types() {
                        match &sub_type.composite_type.inner {
                            wasmparser::CompositeInnerType::Func(func_ty) => {
                                module.types.push(ParsedType {
                                    params: func_ty.params().to_vec(),
                                    results: func_ty.results().to_vec(),
                                });
                            }
                            other => {
                                return Err(TranspileError::unsupported(
                                    format!("type {}", module.types.len()),
                                    format!("{other:?}"),
                                ));
                            }
                        }
                    }
                }
                debug!(count = module.types.len(), "decoded type section");
            }

            Payload::ImportSection(reader) => {
                for import in reader {
                    let import = import.reading("import section")?;
                    let context = format!("import {}.{}", import.module, import.name);
                    match import.ty {
                        TypeRef::Func(type_idx) => {
                            module.imports.push(ImportInfo {
                                module_name: import.module.to_string(),
                                name: import.name.to_string(),
                                type_idx,
                            });
                        }
                        // Memory imports are only reachable through memory
                        // operators, which the translator rejects.
                        TypeRef::Memory(_) => {
                            debug!("{context}: memory import ignored");
                        }
                        TypeRef::Global(_) => {
                            return Err(TranspileError::unsupported(context, "imported global"));
                        }
                        TypeRef::Table(_) => {
                            return Err(TranspileError::unsupported(context, "imported table"));
                        }
                        other => {
                            return Err(TranspileError::unsupported(
                                context,
                                format!("import of {other:?}"),
                            ));
                        }
                    }
                }
                debug!(count = module.imports.len(), "decoded function imports");
            }

            Payload::FunctionSection(reader) => {
                for func_type_idx in reader {
                    module
                        .func_type_indices
                        .push(func_type_idx.reading("function section")?);
                }
            }

            Payload::CodeSectionEntry(body) => {
                module.bodies.push(parse_code_entry(body)?);
            }

            Payload::TableSection(reader) => {
                for tbl in reader {
                    let tbl = tbl.reading("table section")?;
                    if module.table.is_some() {
                        return Err(TranspileError::unsupported(
                            "table section",
                            "more than one table",
                        ));
                    }
                    module.table = Some(TableInfo {
                        initial_size: tbl.ty.initial as u32,
                    });
                }
            }

            Payload::ElementSection(reader) => {
                for element in reader {
                    let element = element.reading("element section")?;
                    if let Some(segment) = parse_element_segment(element)? {
                        module.element_segments.push(segment);
                    }
                }
            }

            Payload::GlobalSection(reader) => {
                for global in reader {
                    let global = global.reading("global section")?;
                    let what = format!("global {}", module.globals.len());
                    let init_value = eval_const_expr(global.init_expr, &what)?;
                    module.globals.push(GlobalInfo {
                        val_type: global.ty.content_type,
                        mutable: global.ty.mutable,
                        init_value,
                    });
                }
            }

            Payload::ExportSection(reader) => {
                for export in reader {
                    let export = export.reading("export section")?;
                    let kind = match export.kind {
                        ExternalKind::Func => ExportKind::Func,
                        ExternalKind::Table => ExportKind::Table,
                        ExternalKind::Memory => ExportKind::Memory,
                        ExternalKind::Global => ExportKind::Global,
                        ExternalKind::Tag => continue,
                    };
                    module.exports.push(ExportInfo {
                        name: export.name.to_string(),
                        kind,
                        index: export.index,
                    });
                }
            }

            Payload::CustomSection(reader) => {
                if let KnownCustom::Name(names) = reader.as_known() {
                    parse_function_names(names, &mut module.function_names);
                }
            }

            Payload::MemorySection(_) | Payload::DataSection(_) => {
                debug!("memory/data section ignored");
            }

            Payload::StartSection { func, .. } => {
                debug!(func, "start function ignored");
            }

            _ => {}
        }
    }

    debug!(
        defined = module.bodies.len(),
        imported = module.imports.len(),
        globals = module.globals.len(),
        segments = module.element_segments.len(),
        "decoded module"
    );
    Ok(module)
}
