//! Error types for the transpilation pipeline.
//!
//! Every failure is terminal: no partial C# output is produced once any of
//! these is raised.

use std::fmt;
use thiserror::Error;

/// The index space an [`TranspileError::InvalidIndex`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSpace {
    Type,
    Function,
    Global,
    Local,
    Table,
    Label,
}

impl fmt::Display for IndexSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndexSpace::Type => "type",
            IndexSpace::Function => "function",
            IndexSpace::Global => "global",
            IndexSpace::Local => "local",
            IndexSpace::Table => "table",
            IndexSpace::Label => "label",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum TranspileError {
    /// The binary is not a structurally valid module.
    #[error("malformed module: {0}")]
    MalformedInput(String),

    /// A signature declares more than one result value.
    #[error("{context}: signature declares {results} results, at most one is supported")]
    UnsupportedSignature { context: String, results: usize },

    /// An operator, value type or section feature outside the supported subset.
    #[error("{context}: unsupported operation `{operation}`")]
    UnsupportedOperation { context: String, operation: String },

    /// A reference into an index space that does not resolve.
    #[error("{context}: invalid {space} index {index}")]
    InvalidIndex {
        context: String,
        space: IndexSpace,
        index: u32,
    },

    /// A name cannot be mapped onto the identifier scheme.
    #[error("cannot encode identifier {name:?}: {ch:?} is outside Latin-1")]
    IdentifierEncoding { name: String, ch: char },

    /// A sanitized function name clashes with another member of the
    /// generated class.
    #[error("{context}: name `{name}` is already used by {owner}")]
    NameCollision {
        context: String,
        name: String,
        owner: String,
    },
}

impl From<wasmparser::BinaryReaderError> for TranspileError {
    fn from(err: wasmparser::BinaryReaderError) -> Self {
        TranspileError::MalformedInput(err.to_string())
    }
}

impl TranspileError {
    pub(crate) fn unsupported(context: impl Into<String>, operation: impl Into<String>) -> Self {
        TranspileError::UnsupportedOperation {
            context: context.into(),
            operation: operation.into(),
        }
    }

    pub(crate) fn invalid_index(context: impl Into<String>, space: IndexSpace, index: u32) -> Self {
        TranspileError::InvalidIndex {
            context: context.into(),
            space,
            index,
        }
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, TranspileError>;

/// Attaches a description of what was being read to a decoder error.
pub(crate) trait ReadContext<T> {
    fn reading(self, what: &str) -> Result<T>;
}

impl<T> ReadContext<T> for std::result::Result<T, wasmparser::BinaryReaderError> {
    fn reading(self, what: &str) -> Result<T> {
        self.map_err(|e| TranspileError::MalformedInput(format!("reading {what}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_index_message_names_the_space() {
        let err = TranspileError::invalid_index("function 3, operator 7", IndexSpace::Type, 9);
        assert_eq!(
            err.to_string(),
            "function 3, operator 7: invalid type index 9"
        );
    }

    #[test]
    fn identifier_error_shows_offending_char() {
        let err = TranspileError::IdentifierEncoding {
            name: "π".to_string(),
            ch: 'π',
        };
        assert!(err.to_string().contains("'π'"));
    }
}
