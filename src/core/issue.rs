//! Findings produced by site and content checks.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
        })
    }
}

/// One problem found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    /// What the problem is attached to: a config key path, a front-matter
    /// field, or a link destination.
    pub target: String,
    pub message: String,
}

impl Issue {
    pub fn error(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn warning(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            target: target.into(),
            message: message.into(),
        }
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}
