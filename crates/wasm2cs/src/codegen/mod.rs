//! Code generation: emits C# source from the linked module and the
//! translated function bodies.
//!
//! # Layout
//!
//! ```text
//!   Module + [FunctionBody]          NamingContext
//!            │                             │
//!            └──────────────┬──────────────┘
//!                           ▼
//!                 CodeGenerator::generate()
//!                           │
//!     ┌─────────────────────┼────────────────────────────┐
//!     ▼                     ▼                            ▼
//!  Import stubs       sealed class {Container}     delegate types,
//!  (partial methods)  globals, methods             table literal,
//!                                                  dispatch wiring
//! ```
//!
//! # Sub-modules
//!
//! - **`module`**: file layout, globals, table literal, dispatch initializer
//! - **`function`**: method signatures and bodies, import stubs
//! - **`statement`**: structured statements, labels and branches
//! - **`expr`**: expressions and boolean conditions
//! - **`types`**: value types, delegate declarations, literals
//!
//! Operators themselves are spelled by a [`Backend`](crate::backend::Backend).

pub mod expr;
pub mod function;
pub mod module;
pub mod statement;
pub mod types;

use crate::backend::Backend;
use crate::error::{IndexSpace, Result, TranspileError};
use crate::ident::{namespace_from_path, sanitize};
use crate::ir::*;

/// Sanitized names for the enclosing namespace and container class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingContext {
    pub namespace: String,
    pub container: String,
}

impl NamingContext {
    /// `module_path` is `/`-separated; each segment becomes one namespace
    /// component.
    pub fn new(module_path: &str, container: &str) -> Result<Self> {
        Ok(NamingContext {
            namespace: namespace_from_path(module_path)?,
            container: sanitize(container)?,
        })
    }
}

/// Call targets for every function, indexed by function index.
#[derive(Debug, Clone, Default)]
pub struct Symbols {
    pub(crate) functions: Vec<String>,
}

impl Symbols {
    /// Imports resolve to `Import.{field}`; defined functions to their
    /// method name.
    pub fn new(module: &Module) -> Result<Self> {
        let functions = module
            .functions
            .iter()
            .map(|func| match &func.kind {
                FunctionKind::Imported { field, .. } => Ok(format!("Import.{}", sanitize(field)?)),
                FunctionKind::Defined(_) => sanitize(&func.name),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Symbols { functions })
    }

    /// Expression naming the function at a call site.
    pub fn callee(&self, idx: FuncIdx) -> Result<&str> {
        self.functions
            .get(idx.as_usize())
            .map(String::as_str)
            .ok_or_else(|| {
                let index = idx.as_usize() as u32;
                TranspileError::invalid_index("call target", IndexSpace::Function, index)
            })
    }

    /// Declared member name, without the `Import.` qualifier.
    pub fn method_name(&self, idx: FuncIdx) -> Result<&str> {
        let callee = self.callee(idx)?;
        Ok(callee.strip_prefix("Import.").unwrap_or(callee))
    }
}

/// Orchestrates emission of one C# file.
///
/// # Example
///
/// ```ignore
/// let backend = CSharpBackend::new();
/// let naming = NamingContext::new("wasm", "Module")?;
/// let source = CodeGenerator::new(&backend, &naming).generate(&module, &bodies)?;
/// ```
pub struct CodeGenerator<'a, B: Backend> {
    backend: &'a B,
    naming: &'a NamingContext,
}

impl<'a, B: Backend> CodeGenerator<'a, B> {
    pub fn new(backend: &'a B, naming: &'a NamingContext) -> Self {
        CodeGenerator { backend, naming }
    }

    /// Generate the complete file. `bodies` holds one entry per defined
    /// function, in declaration order.
    pub fn generate(&self, module: &Module, bodies: &[FunctionBody]) -> Result<String> {
        module::generate_module(self.backend, self.naming, module, bodies)
    }
}
