//! Structured error types shared across the pipeline crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SccError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (molecule names, widths, folds, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the scalar-coupling pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SccError {
    /// Missing columns, unknown coupling types and malformed cells.
    #[error("schema error: {0}")]
    Schema(ErrorInfo),
    /// A rank transform was requested for a type the fold never fitted.
    #[error("unmapped type error: {0}")]
    UnmappedType(ErrorInfo),
    /// A packed tensor does not have the width the pipeline requires.
    #[error("shape mismatch error: {0}")]
    ShapeMismatch(ErrorInfo),
    /// Invalid run configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Filesystem failures.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and deserialization failures.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SccError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SccError::Schema(info)
            | SccError::UnmappedType(info)
            | SccError::ShapeMismatch(info)
            | SccError::Config(info)
            | SccError::Io(info)
            | SccError::Serde(info) => info,
        }
    }

    /// Adds a context entry to the payload, keeping the variant.
    pub fn with_context(self, key: impl Into<String>, value: impl ToString) -> Self {
        match self {
            SccError::Schema(info) => SccError::Schema(info.with_context(key, value)),
            SccError::UnmappedType(info) => SccError::UnmappedType(info.with_context(key, value)),
            SccError::ShapeMismatch(info) => SccError::ShapeMismatch(info.with_context(key, value)),
            SccError::Config(info) => SccError::Config(info.with_context(key, value)),
            SccError::Io(info) => SccError::Io(info.with_context(key, value)),
            SccError::Serde(info) => SccError::Serde(info.with_context(key, value)),
        }
    }

    /// Shorthand for a [`SccError::Schema`] without context.
    pub fn schema(code: &str, message: impl Into<String>) -> Self {
        SccError::Schema(ErrorInfo::new(code, message))
    }

    /// Shorthand for a [`SccError::ShapeMismatch`] recording the expected and
    /// observed widths.
    pub fn shape(code: &str, message: impl Into<String>, expected: usize, found: usize) -> Self {
        SccError::ShapeMismatch(
            ErrorInfo::new(code, message)
                .with_context("expected", expected)
                .with_context("found", found),
        )
    }

    /// Shorthand for a [`SccError::Config`] without context.
    pub fn config(code: &str, message: impl Into<String>) -> Self {
        SccError::Config(ErrorInfo::new(code, message))
    }

    /// Wraps an I/O failure on `path`.
    pub fn io(code: &str, path: &std::path::Path, err: impl ToString) -> Self {
        SccError::Io(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.display()),
        )
    }
}
