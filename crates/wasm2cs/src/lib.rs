//! wasm2cs — WebAssembly to C# transpiler.
//!
//! This crate decodes a WebAssembly MVP module, links it into an IR,
//! translates every function body from stack-machine operators into
//! structured statements, and emits one C# source file.

pub mod backend;
pub mod codegen;
pub mod error;
pub mod ident;
pub mod ir;
pub mod parser;
pub mod translate;

pub use error::{Result, TranspileError};

use backend::CSharpBackend;
use codegen::{CodeGenerator, NamingContext};
use ir::{build_module, FunctionBody, Module};
use parser::parse_wasm;
use tracing::info;

/// Configuration options for transpilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileOptions {
    /// `/`-separated module path; becomes the dotted C# namespace.
    pub module_path: String,
    /// Name of the generated class holding the translated functions.
    pub container: String,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            module_path: "wasm".to_string(),
            container: "Module".to_string(),
        }
    }
}

/// The linked module together with one translated body per defined function.
#[derive(Debug, Clone)]
pub struct TranslatedModule {
    pub module: Module,
    pub bodies: Vec<FunctionBody>,
}

/// Decode, link and translate a module without emitting source.
pub fn translate(wasm_bytes: &[u8]) -> Result<TranslatedModule> {
    let parsed = parse_wasm(wasm_bytes)?;
    let module = build_module(&parsed)?;
    let bodies = translate::translate_module(&module)?;
    Ok(TranslatedModule { module, bodies })
}

/// Transpile a WebAssembly module to C# source code.
///
/// Nothing is produced unless every function translates.
///
/// # Example
/// ```no_run
/// use wasm2cs::{transpile, TranspileOptions};
///
/// let wasm_bytes = std::fs::read("input.wasm").unwrap();
/// let options = TranspileOptions::default();
/// let source = transpile(&wasm_bytes, &options).unwrap();
/// std::fs::write("Module.cs", source).unwrap();
/// ```
pub fn transpile(wasm_bytes: &[u8], options: &TranspileOptions) -> Result<String> {
    let naming = NamingContext::new(&options.module_path, &options.container)?;
    let translated = translate(wasm_bytes)?;

    let backend = CSharpBackend::new();
    let source = CodeGenerator::new(&backend, &naming)
        .generate(&translated.module, &translated.bodies)?;

    info!(
        namespace = %naming.namespace,
        container = %naming.container,
        functions = translated.module.functions.len(),
        "transpiled module"
    );
    Ok(source)
}
