//! Intermediate representation for Wasm → C# translation.
//!
//! [`types`] holds the linked module (signatures, functions, globals, table);
//! [`code`] holds the structured statement tree produced per function by the
//! translator. Both are independent of the output language.

mod code;
mod types;
pub use code::*;
pub use types::*;

pub mod builder;
pub use builder::build_module;
