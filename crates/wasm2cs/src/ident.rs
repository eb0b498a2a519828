//! Identifier sanitization.
//!
//! Maps arbitrary names (function names from the `name` section, import
//! fields, namespace path segments) onto the identifier alphabet of the
//! generated C#. ASCII letters and digits are kept; every other Latin-1
//! character becomes `_` followed by its code as two lowercase hex digits.
//! The mapping is injective and never alters names that are already plain
//! alphanumerics.

use crate::error::{Result, TranspileError};
use std::fmt::Write;

/// Sanitize a single name.
///
/// Fails with [`TranspileError::IdentifierEncoding`] on the first character
/// whose code point is above `0xFF`.
pub fn sanitize(name: &str) -> Result<String> {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            continue;
        }
        let code = ch as u32;
        if code > 0xff {
            return Err(TranspileError::IdentifierEncoding {
                name: name.to_string(),
                ch,
            });
        }
        // Writing into a String cannot fail.
        let _ = write!(out, "_{code:02x}");
    }
    Ok(out)
}

/// Build a dotted namespace from a `/`-separated module path, sanitizing
/// each segment on its own.
pub fn namespace_from_path(path: &str) -> Result<String> {
    let segments = path
        .split('/')
        .map(sanitize)
        .collect::<Result<Vec<_>>>()?;
    Ok(segments.join("."))
}
