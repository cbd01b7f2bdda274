//! Catalog of named rules
//!
//! Architecture: Repository - The registry maps rule names to check factories
//! - Built once at start-up and shared read-only between validation passes
//! - Parameters are type-checked when a schema is built, never during traversal
//! - New named rules are new table entries; the evaluator never changes

use crate::domain::values::{Number, SourceLocation};
use crate::domain::violations::{GuardError, GuardResult};
use crate::rules::builtin::{Max, MaxLen, Min, MinLen, NotNull, OneNotNull, OneOf, Pattern};
use crate::rules::{Check, Rule};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// Turns a rule argument into a check, or explains why the argument is malformed
pub type BuildCheck = fn(&JsonValue) -> Result<Arc<dyn Check>, String>;

/// One catalog entry
#[derive(Clone)]
pub struct RuleDefinition {
    /// Name used in schema declarations
    pub name: &'static str,
    /// Name of the single parameter
    pub parameter: &'static str,
    /// Accepted parameter shape, for documentation and error messages
    pub parameter_shape: &'static str,
    /// Value kinds the rule is meant for
    pub applies_to: &'static str,
    /// "requires ..." phrase with `{param}` placeholders
    pub description_template: &'static str,
    /// Failure detail with `{param}` / `{actual}` placeholders
    pub failure_template: &'static str,
    /// Factory for the typed check
    pub build: BuildCheck,
}

impl fmt::Debug for RuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDefinition")
            .field("name", &self.name)
            .field("parameter", &self.parameter)
            .field("applies_to", &self.applies_to)
            .finish_non_exhaustive()
    }
}

/// Read-only table of named rules
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    definitions: Vec<RuleDefinition>,
}

impl RuleRegistry {
    /// A registry with no rules
    pub fn empty() -> Self {
        Self { definitions: Vec::new() }
    }

    /// The built-in catalog
    pub fn with_builtins() -> Self {
        Self { definitions: builtin_definitions() }
    }

    /// Add a rule definition; names are unique
    pub fn register(&mut self, definition: RuleDefinition) -> GuardResult<()> {
        if self.definition(definition.name).is_some() {
            return Err(GuardError::config(format!(
                "Rule '{}' is already registered",
                definition.name
            )));
        }
        tracing::debug!("Registering rule '{}'", definition.name);
        self.definitions.push(definition);
        Ok(())
    }

    /// Remove a rule from the catalog, returning whether it existed
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.definitions.len();
        self.definitions.retain(|d| d.name != name);
        before != self.definitions.len()
    }

    pub fn definition(&self, name: &str) -> Option<&RuleDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// All definitions in catalog order
    pub fn definitions(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Resolve a named rule declared at `location`
    pub fn lookup(
        &self,
        name: &str,
        argument: &JsonValue,
        location: &SourceLocation,
    ) -> GuardResult<Rule> {
        let definition = self
            .definition(name)
            .ok_or_else(|| GuardError::unknown_rule(name, location))?;

        let check = (definition.build)(argument).map_err(|message| {
            GuardError::invalid_parameters(
                name,
                location,
                format!("{message} (expected {}: {})", definition.parameter, definition.parameter_shape),
            )
        })?;

        Ok(Rule::named(name, definition.parameter, argument.clone(), check, location.clone()))
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn non_negative(argument: &JsonValue) -> Result<usize, String> {
    argument
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| format!("got {argument}"))
}

fn number(argument: &JsonValue) -> Result<Number, String> {
    Number::from_json(argument).ok_or_else(|| format!("got {argument}"))
}

fn build_min_len(argument: &JsonValue) -> Result<Arc<dyn Check>, String> {
    Ok(Arc::new(MinLen(non_negative(argument)?)))
}

fn build_max_len(argument: &JsonValue) -> Result<Arc<dyn Check>, String> {
    Ok(Arc::new(MaxLen(non_negative(argument)?)))
}

fn build_min(argument: &JsonValue) -> Result<Arc<dyn Check>, String> {
    Ok(Arc::new(Min(number(argument)?)))
}

fn build_max(argument: &JsonValue) -> Result<Arc<dyn Check>, String> {
    Ok(Arc::new(Max(number(argument)?)))
}

fn build_one_of(argument: &JsonValue) -> Result<Arc<dyn Check>, String> {
    let literals = argument.as_array().ok_or_else(|| format!("got {argument}"))?;
    if literals.is_empty() {
        return Err("the set is empty".to_string());
    }
    if literals.iter().any(|l| l.is_array() || l.is_object()) {
        return Err(format!("set members must be literals, got {argument}"));
    }
    let mut unique: Vec<JsonValue> = Vec::with_capacity(literals.len());
    for literal in literals {
        if !unique.contains(literal) {
            unique.push(literal.clone());
        }
    }
    Ok(Arc::new(OneOf(unique)))
}

fn build_not_null(argument: &JsonValue) -> Result<Arc<dyn Check>, String> {
    let expected = argument.as_bool().ok_or_else(|| format!("got {argument}"))?;
    Ok(Arc::new(NotNull(expected)))
}

fn build_one_not_null(argument: &JsonValue) -> Result<Arc<dyn Check>, String> {
    match argument {
        JsonValue::Bool(true) => Ok(Arc::new(OneNotNull(None))),
        JsonValue::Array(keys) if !keys.is_empty() => {
            let keys = keys
                .iter()
                .map(|k| k.as_str().map(str::to_string).ok_or_else(|| format!("got key {k}")))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Arc::new(OneNotNull(Some(keys))))
        }
        other => Err(format!("got {other}")),
    }
}

fn build_pattern(argument: &JsonValue) -> Result<Arc<dyn Check>, String> {
    let source = argument.as_str().ok_or_else(|| format!("got {argument}"))?;
    let regex = regex::Regex::new(source).map_err(|e| format!("invalid regex '{source}': {e}"))?;
    Ok(Arc::new(Pattern(regex)))
}

fn builtin_definitions() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition {
            name: "min_len",
            parameter: "n",
            parameter_shape: "non-negative integer",
            applies_to: "string, array, map",
            description_template: "length greater or equal to {n}",
            failure_template: "length of {actual} is less than {n}",
            build: build_min_len,
        },
        RuleDefinition {
            name: "max_len",
            parameter: "n",
            parameter_shape: "non-negative integer",
            applies_to: "string, array, map",
            description_template: "length less than or equal to {n}",
            failure_template: "length of {actual} is more than {n}",
            build: build_max_len,
        },
        RuleDefinition {
            name: "min",
            parameter: "n",
            parameter_shape: "number",
            applies_to: "number",
            description_template: "a value greater or equal to {n}",
            failure_template: "{actual} is less than {n}",
            build: build_min,
        },
        RuleDefinition {
            name: "max",
            parameter: "n",
            parameter_shape: "number",
            applies_to: "number",
            description_template: "a value less than or equal to {n}",
            failure_template: "{actual} is more than {n}",
            build: build_max,
        },
        RuleDefinition {
            name: "one_of",
            parameter: "set",
            parameter_shape: "non-empty list of literals",
            applies_to: "any",
            description_template: "one of: {set}",
            failure_template: "{actual} is not one of: {set}",
            build: build_one_of,
        },
        RuleDefinition {
            name: "not_null",
            parameter: "expected",
            parameter_shape: "boolean",
            applies_to: "any",
            description_template: "not null | null",
            failure_template: "value is null | value is not null ({actual})",
            build: build_not_null,
        },
        RuleDefinition {
            name: "one_not_null",
            parameter: "keys",
            parameter_shape: "true or non-empty list of keys",
            applies_to: "map",
            description_template: "exactly one of {keys} to be not null",
            failure_template: "all values are null | multiple values are not null ({present})",
            build: build_one_not_null,
        },
        RuleDefinition {
            name: "pattern",
            parameter: "regex",
            parameter_shape: "regular expression string",
            applies_to: "string",
            description_template: "a value matching /{regex}/",
            failure_template: "\"{actual}\" does not match /{regex}/",
            build: build_pattern,
        },
    ]
}
