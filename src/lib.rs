//! Values Guard - Validation engine for merged configuration data values
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Pure validation logic separated from YAML loading and presentation
//! - The rule registry is built once and shared read-only between passes
//! - Violations are data in a report; only broken schemas and inputs are errors

pub mod config;
pub mod domain;
pub mod loader;
pub mod report;
pub mod rules;
pub mod schema;
pub mod validator;

// Re-export main types for convenient access
pub use domain::values::{DataValueNode, PathSegment, SourceLocation, Value, ValuePath};
pub use domain::violations::{
    GuardError, GuardResult, ValidationReport, ValidationSummary, Violation,
};

pub use config::{ConfigBuilder, GuardConfig};

pub use loader::{Bundle, SchemaDocument, ValuesDocument};

pub use report::{render, OutputFormat, ReportFormatter, ReportOptions};

pub use rules::{Guard, Rule, RuleDefinition, RuleKind, RuleRegistry};

pub use schema::{SchemaChildren, SchemaNode};

pub use validator::{validate, ValidationOptions, Validator};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Main entry point tying the registry, loaders, validator and formatter together
#[derive(Debug, Clone)]
pub struct ValuesGuard {
    registry: Arc<RuleRegistry>,
    validator: Validator,
    report_formatter: ReportFormatter,
}

impl ValuesGuard {
    /// Create a guard with the built-in rule catalog
    pub fn new() -> Self {
        Self::with_registry(RuleRegistry::with_builtins())
    }

    /// Create a guard with a custom rule catalog
    pub fn with_registry(registry: RuleRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            validator: Validator::default(),
            report_formatter: ReportFormatter::default(),
        }
    }

    /// Create a guard shaped by the given configuration
    pub fn new_with_config(config: &GuardConfig) -> GuardResult<Self> {
        config.validate()?;
        let report_formatter = ReportFormatter::new(ReportOptions {
            use_colors: config.report.use_colors,
            max_violations: config.report.max_violations,
        });

        Ok(Self::with_registry(config.registry()).with_report_formatter(report_formatter))
    }

    /// Create a guard loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> GuardResult<Self> {
        let config = GuardConfig::load_from_file(path)?;
        Self::new_with_config(&config)
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    /// Set custom validation options
    pub fn with_validation_options(mut self, options: ValidationOptions) -> Self {
        self.validator = Validator::new(options);
        self
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Read a schema document, resolving its rules against the registry
    pub fn load_schema<P: AsRef<Path>>(&self, path: P) -> GuardResult<SchemaDocument> {
        SchemaDocument::load(path.as_ref(), &self.registry)
    }

    /// Read a schema document and merge values documents onto its defaults
    pub fn load_bundle<P: AsRef<Path>>(&self, schema: P, values: &[PathBuf]) -> GuardResult<Bundle> {
        loader::load_bundle(schema.as_ref(), values, &self.registry)
    }

    /// Validate an already merged data tree
    pub fn validate(&self, schema: &SchemaNode, data: &DataValueNode) -> GuardResult<ValidationReport> {
        self.validator.validate(schema, data)
    }

    /// Load, merge and validate in one step
    pub fn check_files<P: AsRef<Path>>(&self, schema: P, values: &[PathBuf]) -> GuardResult<ValidationReport> {
        let bundle = self.load_bundle(schema, values)?;
        self.validate(&bundle.schema, &bundle.data)
    }

    /// Format a validation report for output
    pub fn format_report(&self, report: &ValidationReport, format: OutputFormat) -> GuardResult<String> {
        self.report_formatter.format_report(report, format)
    }
}

impl Default for ValuesGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate independent bundles in parallel with default options
pub fn validate_all(bundles: &[(SchemaNode, DataValueNode)]) -> Vec<GuardResult<ValidationReport>> {
    Validator::default().validate_all(bundles)
}
