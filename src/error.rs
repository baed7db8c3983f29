//! Error types for rule loading and resolution.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Load-time errors
    MalformedRule,
    ReadError,
    ParseError,

    // Resolution-time errors
    DependencyResolution,

    // Everything else
    InternalError,
}

/// Where a rule was declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum RuleSource {
    /// Compiled into the binary.
    Builtin,
    /// Loaded from a file on disk.
    File(PathBuf),
    /// Built in memory (tests, embedding applications).
    Inline,
}

impl fmt::Display for RuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSource::Builtin => write!(f, "builtin"),
            RuleSource::File(path) => write!(f, "{}", path.display()),
            RuleSource::Inline => write!(f, "inline"),
        }
    }
}

/// Errors raised while loading rule documents or resolving a target.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A rule's `select` or `apply` has an invalid shape.
    #[error("malformed rule #{index} in {origin}: `{field}` {reason}")]
    MalformedRule {
        origin: RuleSource,
        /// Position of the rule within its document.
        index: usize,
        field: String,
        reason: String,
    },

    /// A dynamic rule asked for a dependency that could not be supplied.
    #[error("rule #{rule} ({origin}) could not resolve dependency '{dependency}': {reason}")]
    DependencyResolution {
        /// Declaration index of the rule within its rule set.
        rule: usize,
        origin: RuleSource,
        dependency: String,
        reason: String,
    },

    #[error("cannot read {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    #[error("cannot parse {origin}: {message}")]
    Parse { origin: RuleSource, message: String },
}

impl RuleError {
    pub fn malformed(
        origin: &RuleSource,
        index: usize,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        RuleError::MalformedRule {
            origin: origin.clone(),
            index,
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            RuleError::MalformedRule { .. } => ErrorCode::MalformedRule,
            RuleError::DependencyResolution { .. } => ErrorCode::DependencyResolution,
            RuleError::Read { .. } => ErrorCode::ReadError,
            RuleError::Parse { .. } => ErrorCode::ParseError,
        }
    }

    /// Structured report for machine-readable output.
    pub fn report(&self) -> ErrorReport {
        let report = ErrorReport::new(self.code(), self.to_string());
        match self {
            RuleError::MalformedRule { field, .. } => report.with_field(field),
            RuleError::DependencyResolution { dependency, .. } => {
                report.with_details(format!("dependency: {}", dependency))
            }
            RuleError::Read { .. } | RuleError::Parse { .. } => report,
        }
    }
}

/// Structured error for CLI output.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorReport {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

// Let `anyhow` errors from the binary carry their RuleError code when present
impl From<anyhow::Error> for ErrorReport {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<RuleError>() {
            Ok(rule_err) => rule_err.report(),
            Err(err) => ErrorReport::internal(err),
        }
    }
}

/// Result type for rule loading and resolution.
pub type RuleResult<T> = std::result::Result<T, RuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_names_field() {
        let err = RuleError::malformed(&RuleSource::Builtin, 3, "select.module", "must be a string");
        assert_eq!(err.code(), ErrorCode::MalformedRule);
        assert_eq!(
            err.to_string(),
            "malformed rule #3 in builtin: `select.module` must be a string"
        );
    }

    #[test]
    fn test_report_serializes_code() {
        let err = RuleError::DependencyResolution {
            rule: 0,
            origin: RuleSource::Inline,
            dependency: "environment".to_string(),
            reason: "not provided".to_string(),
        };
        let json = serde_json::to_value(err.report()).unwrap();
        assert_eq!(json["code"], "DEPENDENCY_RESOLUTION");
        assert_eq!(json["details"], "dependency: environment");
        assert!(json.get("field").is_none());
    }

    #[test]
    fn test_report_from_anyhow_downcasts() {
        let err: anyhow::Error = RuleError::Parse {
            origin: RuleSource::Inline,
            message: "bad".to_string(),
        }
        .into();
        let report = ErrorReport::from(err);
        assert_eq!(report.code, ErrorCode::ParseError);

        let report = ErrorReport::from(anyhow::anyhow!("boom"));
        assert_eq!(report.code, ErrorCode::InternalError);
    }
}
