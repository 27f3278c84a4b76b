//! Core error types for stache-rs.
//!
//! This module provides the [`StacheError`] enum covering every failure the
//! engine can report: invalid configuration, template syntax errors found at
//! compile time, variable resolution failures found at execution time, and
//! failures of the collaborators the engine calls out to (partial loaders,
//! lambdas, output sinks).

use std::fmt;

use thiserror::Error;

/// The primary error type for stache-rs.
///
/// Parse errors are raised by `compile` and never deferred to execution.
/// Every other variant aborts the `execute` call that raised it; the engine
/// never emits a best-effort render after a failure.
///
/// # Examples
///
/// ```
/// use stache_rs_core::error::StacheError;
///
/// let err = StacheError::resolution("user.name", 3, "No key, method or field with name 'user.name' on line 3");
/// assert_eq!(err.line(), Some(3));
/// assert!(err.to_string().contains("user.name"));
/// ```
#[derive(Error, Debug)]
pub enum StacheError {
    // ── Configuration ────────────────────────────────────────────────

    /// Invalid delimiters or malformed settings.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Compilation ──────────────────────────────────────────────────

    /// The template source is malformed.
    #[error("Parse error: {message} @ line {line}")]
    ParseError {
        /// What went wrong.
        message: String,
        /// The 1-based source line.
        line: usize,
    },

    // ── Execution ────────────────────────────────────────────────────

    /// A variable or section name could not be resolved.
    #[error("Resolution error: {message}")]
    ResolutionError {
        /// The full (possibly compound) name being resolved.
        name: String,
        /// The 1-based source line of the tag.
        line: usize,
        /// A human-readable description.
        message: String,
    },

    /// Loading or compiling a partial template failed.
    #[error("Unable to load template '{name}': {source}")]
    PartialError {
        /// The partial name as written in the `{{>name}}` tag.
        name: String,
        /// The underlying loader or compile failure.
        source: Box<StacheError>,
    },

    /// A lambda section failed.
    #[error("Lambda for section '{name}' on line {line} failed: {source}")]
    LambdaError {
        /// The section name bound to the lambda.
        name: String,
        /// The 1-based source line of the section tag.
        line: usize,
        /// The error returned by the lambda.
        source: Box<StacheError>,
    },

    // ── Collaborators ────────────────────────────────────────────────

    /// The requested template was not found by the loader.
    #[error("Template does not exist: {0}")]
    TemplateDoesNotExist(String),

    /// An operation that requires configuration that is not present.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// A host value could not be converted into a template value.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The output sink rejected a write.
    #[error("Output error: {0}")]
    Output(#[from] fmt::Error),

    /// An I/O error occurred while reading template source.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StacheError {
    /// Creates a [`StacheError::ParseError`].
    pub fn parse(message: impl Into<String>, line: usize) -> Self {
        Self::ParseError {
            message: message.into(),
            line,
        }
    }

    /// Creates a [`StacheError::ResolutionError`].
    pub fn resolution(name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::ResolutionError {
            name: name.into(),
            line,
            message: message.into(),
        }
    }

    /// Returns the 1-based template line associated with this error, if any.
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::ParseError { line, .. }
            | Self::ResolutionError { line, .. }
            | Self::LambdaError { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Returns the variable, section, or partial name associated with this error, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::ResolutionError { name, .. }
            | Self::PartialError { name, .. }
            | Self::LambdaError { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns `true` for errors raised while compiling a template.
    pub const fn is_parse_error(&self) -> bool {
        matches!(self, Self::ParseError { .. })
    }
}

/// A convenience type alias for `Result<T, StacheError>`.
pub type StacheResult<T> = Result<T, StacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = StacheError::parse("Section close tag with no open tag 'foo'", 4);
        assert_eq!(
            err.to_string(),
            "Parse error: Section close tag with no open tag 'foo' @ line 4"
        );
        assert!(err.is_parse_error());
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn test_resolution_error_carries_name_and_line() {
        let err = StacheError::resolution("a.b.c", 2, "Missing context for compound variable 'a.b.c'");
        assert_eq!(err.name(), Some("a.b.c"));
        assert_eq!(err.line(), Some(2));
        assert!(!err.is_parse_error());
    }

    #[test]
    fn test_partial_error_wraps_source() {
        let err = StacheError::PartialError {
            name: "header".into(),
            source: Box::new(StacheError::TemplateDoesNotExist("header".into())),
        };
        assert_eq!(err.name(), Some("header"));
        assert_eq!(
            err.to_string(),
            "Unable to load template 'header': Template does not exist: header"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_lambda_error_display() {
        let err = StacheError::LambdaError {
            name: "wrap".into(),
            line: 7,
            source: Box::new(StacheError::Unsupported("nope".into())),
        };
        assert_eq!(err.line(), Some(7));
        assert!(err.to_string().contains("'wrap' on line 7"));
    }

    #[test]
    fn test_configuration_error_has_no_line() {
        let err = StacheError::ConfigurationError("bad delims".into());
        assert_eq!(err.line(), None);
        assert_eq!(err.name(), None);
        assert_eq!(err.to_string(), "Configuration error: bad delims");
    }

    #[test]
    fn test_fmt_error_conversion() {
        let err: StacheError = fmt::Error.into();
        assert!(matches!(err, StacheError::Output(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: StacheError = io_err.into();
        assert!(err.to_string().contains("file missing"));
    }
}
