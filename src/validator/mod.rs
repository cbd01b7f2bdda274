//! Validation orchestrator
//!
//! Architecture: Domain Service - The validator walks the schema against the merged data
//! - Pre-order traversal; violations come out in schema order, then rule declaration order
//! - Null values on nullable nodes only see nullity rules and stop the descent
//! - Every rule runs; one bad value can produce several violations

pub mod evaluator;

use crate::domain::values::{DataValueNode, Value};
use crate::domain::violations::{GuardError, GuardResult, ValidationReport, Violation};
use crate::rules::GuardContext;
use crate::schema::{SchemaChildren, SchemaNode};
use evaluator::{evaluate, Evaluation};
use rayon::prelude::*;
use std::time::Instant;

/// Options for customizing a validation pass
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Attach the schema fingerprint to the report
    pub fingerprint_schema: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self { fingerprint_schema: true }
    }
}

/// Walks a schema tree against a data tree and collects violations
#[derive(Debug, Clone, Default)]
pub struct Validator {
    options: ValidationOptions,
}

impl Validator {
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    /// Run one complete pass
    ///
    /// Failed rules become violations in the report. Errors are reserved for a
    /// custom predicate that fails and for data trees missing a schema position.
    pub fn validate(
        &self,
        schema: &SchemaNode,
        data: &DataValueNode,
    ) -> GuardResult<ValidationReport> {
        let start_time = Instant::now();
        let mut report = ValidationReport::new();

        self.visit(schema, data, None, &mut report)?;

        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        if self.options.fingerprint_schema {
            report.set_schema_fingerprint(schema.fingerprint());
        }

        tracing::info!(
            "Validated {} nodes: {} rules evaluated, {} skipped, {} violations",
            report.summary.nodes_visited,
            report.summary.rules_evaluated,
            report.summary.rules_skipped,
            report.violations.len()
        );

        Ok(report)
    }

    /// Validate independent bundles in parallel; results keep input order
    pub fn validate_all(
        &self,
        bundles: &[(SchemaNode, DataValueNode)],
    ) -> Vec<GuardResult<ValidationReport>> {
        bundles.par_iter().map(|(schema, data)| self.validate(schema, data)).collect()
    }

    fn visit(
        &self,
        schema: &SchemaNode,
        data: &DataValueNode,
        parent: Option<&DataValueNode>,
        report: &mut ValidationReport,
    ) -> GuardResult<()> {
        report.record_node();
        let absent = schema.is_nullable() && data.value.is_null();

        tracing::debug!(
            "Visiting '{}' ({} rules{})",
            data.path,
            schema.rules().len(),
            if absent { ", null" } else { "" }
        );

        let ctx = GuardContext::new(data, parent);
        for rule in schema.rules() {
            if absent && !rule.is_nullity_aware() {
                tracing::debug!("Skipping '{}' at '{}': value is null", rule.description(), data.path);
                report.record_skipped(1);
                continue;
            }

            match evaluate(rule, &ctx)? {
                Evaluation::Pass => report.record_evaluated(),
                Evaluation::Fail(detail) => {
                    report.record_evaluated();
                    let mut violation = Violation::new(
                        data.path.clone(),
                        data.location.clone(),
                        rule.location().clone(),
                        rule.description(),
                        detail,
                    );
                    if let Some(name) = rule.name() {
                        violation = violation.with_rule_name(name);
                    }
                    report.add_violation(violation);
                }
                Evaluation::Skipped => report.record_skipped(1),
            }
        }

        if absent {
            report.record_skipped(schema.descendant_rule_count());
            return Ok(());
        }

        match schema.children() {
            SchemaChildren::None => {}
            SchemaChildren::Map(children) => {
                for child in children {
                    let child_data = child
                        .key()
                        .and_then(|key| data.get(key))
                        .ok_or_else(|| GuardError::StructureMismatch {
                            path: child.path().clone(),
                        })?;
                    self.visit(child, child_data, Some(data), report)?;
                }
            }
            SchemaChildren::Array(template) => {
                if template.rule_count() > 0 {
                    if let Value::Array(items) = &data.value {
                        for item in items {
                            self.visit(template, item, Some(data), report)?;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Validate with default options
pub fn validate(schema: &SchemaNode, data: &DataValueNode) -> GuardResult<ValidationReport> {
    Validator::default().validate(schema, data)
}
