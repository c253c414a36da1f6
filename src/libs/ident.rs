use std::fmt;

use crate::libs::error::{EditorError, Result};

/// Returns true iff `s` is non-empty and made only of `[A-Za-z0-9_]`.
pub fn is_safe_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// A table or column name that passed the identifier guard.
///
/// The only way to get quoted SQL text for a name is through this type, so
/// nothing reaches the generated SQL without being checked first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    pub fn new(s: &str) -> Option<Self> {
        is_safe_identifier(s).then(|| Ident(s.to_string()))
    }

    pub fn table(s: &str) -> Result<Self> {
        Self::new(s).ok_or_else(|| EditorError::bad_request("invalid table"))
    }

    pub fn column(s: &str) -> Result<Self> {
        Self::new(s).ok_or_else(|| EditorError::bad_request("invalid column"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SQLite quoting. Safe names never contain `"`, so no escaping is needed.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
