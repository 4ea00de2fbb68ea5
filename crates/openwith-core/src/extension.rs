//! Validated file extension input.

use crate::error::{OpenWithError, Result};
use serde_json::Value;
use std::fmt;

pub(crate) const MISSING_EXTENSION: &str = "extension must be provided";
pub(crate) const NON_STRING_EXTENSION: &str = "extension must be a string";

/// A non-empty file extension such as `.txt`.
///
/// The text is kept verbatim; no leading dot is added or removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionKey(String);

impl ExtensionKey {
    /// Validate a typed extension string.
    pub fn new(extension: impl Into<String>) -> Result<Self> {
        let extension = extension.into();
        if extension.is_empty() {
            return Err(OpenWithError::invalid_argument(MISSING_EXTENSION));
        }
        Ok(Self(extension))
    }

    /// Validate an untyped value, e.g. a field taken from a JSON request.
    ///
    /// Absent-looking values (`null`, `false`, `0`, `""`) are reported as
    /// missing; any other non-string is reported as having the wrong type.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Self::new(s.as_str()),
            v if is_falsy(v) => Err(OpenWithError::invalid_argument(MISSING_EXTENSION)),
            _ => Err(OpenWithError::invalid_argument(NON_STRING_EXTENSION)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

impl fmt::Display for ExtensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExtensionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
