//! Core domain models for data value violations and validation results
//!
//! Architecture: Rich Domain Models - Violations are entities with behavior, not just data
//! - A Violation carries both where the rule was declared and where the value came from
//! - ValidationReport acts as an aggregate root managing the ordered collection of violations
//! - Authoring defects are errors; failed rules are data

use crate::domain::values::{SourceLocation, ValuePath};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One rule failing against one resolved value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Path of the offending value
    pub path: ValuePath,
    /// Where the offending value came from (schema default or values document)
    pub violation_location: SourceLocation,
    /// Where the failing rule was declared
    pub declaration_location: SourceLocation,
    /// What the rule requires, e.g. "length greater or equal to 1"
    pub rule_description: String,
    /// Why this particular value fails, e.g. "length of 0 is less than 1"
    pub failure_detail: String,
    /// Registry name of the rule, `None` for custom rules
    pub rule_name: Option<String>,
}

impl Violation {
    /// Create a new violation
    pub fn new(
        path: ValuePath,
        violation_location: SourceLocation,
        declaration_location: SourceLocation,
        rule_description: impl Into<String>,
        failure_detail: impl Into<String>,
    ) -> Self {
        Self {
            path,
            violation_location,
            declaration_location,
            rule_description: rule_description.into(),
            failure_detail: failure_detail.into(),
            rule_name: None,
        }
    }

    /// Record the registry name of the rule that failed
    pub fn with_rule_name(mut self, name: impl Into<String>) -> Self {
        self.rule_name = Some(name.into());
        self
    }

    /// Format violation as one report line
    pub fn format_display(&self) -> String {
        format!(
            "\"{}\" ({}) requires \"{}\"; fail: {} (by {})",
            self.path,
            self.violation_location,
            self.rule_description,
            self.failure_detail,
            self.declaration_location
        )
    }
}

/// Summary statistics for a validation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationSummary {
    /// Schema nodes visited during the walk
    pub nodes_visited: usize,
    /// Rules whose predicate actually ran
    pub rules_evaluated: usize,
    /// Rules skipped by null short-circuiting or a false guard
    pub rules_skipped: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
    /// Timestamp when validation was performed
    pub validated_at: DateTime<Utc>,
}

/// Complete result of one validation pass
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// Violations in schema pre-order, then rule declaration order
    pub violations: Vec<Violation>,
    /// Summary statistics
    pub summary: ValidationSummary,
    /// Fingerprint of the schema this report was produced against
    pub schema_fingerprint: Option<String>,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            summary: ValidationSummary { validated_at: Utc::now(), ..Default::default() },
            schema_fingerprint: None,
        }
    }

    /// Append a violation, preserving the order of discovery
    pub fn add_violation(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Whether the report contains any violations
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Empty report means every data value is valid
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations raised against one value
    pub fn violations_at<'a>(&'a self, path: &'a ValuePath) -> impl Iterator<Item = &'a Violation> {
        self.violations.iter().filter(move |v| &v.path == path)
    }

    pub fn record_node(&mut self) {
        self.summary.nodes_visited += 1;
    }

    pub fn record_evaluated(&mut self) {
        self.summary.rules_evaluated += 1;
    }

    pub fn record_skipped(&mut self, count: usize) {
        self.summary.rules_skipped += count;
    }

    /// Set the execution time
    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    /// Set the schema fingerprint
    pub fn set_schema_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.schema_fingerprint = Some(fingerprint.into());
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that abort a run instead of producing a report
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// A rule name not present in the registry
    #[error("Unknown rule '{name}' (declared at {location})")]
    UnknownRule { name: String, location: SourceLocation },

    /// A known rule given parameters of the wrong shape
    #[error("Invalid parameters for rule '{rule}' (declared at {location}): {message}")]
    InvalidParameters { rule: String, location: SourceLocation, message: String },

    /// A custom predicate failed while evaluating
    #[error("Custom rule declared at {location} failed to evaluate: {message}")]
    Predicate { location: SourceLocation, message: String },

    /// The data tree is missing a position the schema declares
    #[error("No data value at '{path}' although the schema declares it")]
    StructureMismatch { path: ValuePath },

    /// A schema document could not be read into a schema tree
    #[error("Schema error in {file}: {message}")]
    Schema { file: String, message: String },

    /// A values document could not be merged onto the schema defaults
    #[error("Data values error in {file}: {message}")]
    Merge { file: String, message: String },

    /// Configuration file could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// File could not be read or accessed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Report or configuration could not be serialized
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl GuardError {
    pub fn unknown_rule(name: impl Into<String>, location: &SourceLocation) -> Self {
        Self::UnknownRule { name: name.into(), location: location.clone() }
    }

    pub fn invalid_parameters(
        rule: impl Into<String>,
        location: &SourceLocation,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameters {
            rule: rule.into(),
            location: location.clone(),
            message: message.into(),
        }
    }

    pub fn predicate(location: &SourceLocation, message: impl Into<String>) -> Self {
        Self::Predicate { location: location.clone(), message: message.into() }
    }

    pub fn schema(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema { file: file.into(), message: message.into() }
    }

    pub fn merge(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Merge { file: file.into(), message: message.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into() }
    }

    /// Whether the schema itself is broken, as opposed to its inputs or environment
    pub fn is_authoring_defect(&self) -> bool {
        matches!(
            self,
            Self::UnknownRule { .. } | Self::InvalidParameters { .. } | Self::Predicate { .. }
        )
    }
}

/// Result type for validation operations
pub type GuardResult<T> = Result<T, GuardError>;
