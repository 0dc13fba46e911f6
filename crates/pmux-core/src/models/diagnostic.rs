//! Diagnostics and attribute paths

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Unset severity; treated as non-fatal
    #[default]
    Invalid,
    /// Fatal condition
    Error,
    /// Warning condition
    Warning,
}

/// One step in an attribute path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributePathStep {
    /// Named attribute of an object or block
    AttributeName(String),
    /// String key of a map element
    ElementKeyString(String),
    /// Index of a list element
    ElementKeyInt(i64),
}

/// Path to an attribute within a config, state or plan value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributePath {
    /// Steps from the root of the value
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    /// Path starting at a top-level attribute
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.into())],
        }
    }

    /// Descend into a nested attribute
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.steps.push(AttributePathStep::AttributeName(name.into()));
        self
    }

    /// Descend into a map element
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.steps.push(AttributePathStep::ElementKeyString(key.into()));
        self
    }

    /// Descend into a list element
    pub fn index(mut self, index: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(index));
        self
    }
}

impl fmt::Display for AttributePath {
    /// Renders as `tags["env"].rules[0]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) if i == 0 => f.write_str(name)?,
                AttributePathStep::AttributeName(name) => write!(f, ".{}", name)?,
                AttributePathStep::ElementKeyString(key) => write!(f, "[{:?}]", key)?,
                AttributePathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// A structured warning or error returned alongside a response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: DiagnosticSeverity,
    /// Short description
    pub summary: String,
    /// Longer explanation
    #[serde(default)]
    pub detail: String,
    /// Attribute the diagnostic refers to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    /// Error-severity diagnostic
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    /// Warning-severity diagnostic
    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    /// Attach an attribute path
    pub fn with_attribute(mut self, attribute: AttributePath) -> Self {
        self.attribute = Some(attribute);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// Whether any diagnostic in the slice has error severity
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
