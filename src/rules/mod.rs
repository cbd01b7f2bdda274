//! Rules attached to schema positions
//!
//! Architecture: Closed Tagged Variant - A rule is Named, Custom or Conditional
//! - Named rules carry a typed check resolved from the registry when the schema is built
//! - Custom rules wrap an author-supplied predicate that may itself fail
//! - Conditional rules wrap another rule behind a guard over sibling values

pub mod builtin;
pub mod registry;

use crate::domain::values::{DataValueNode, SourceLocation, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub use registry::{RuleDefinition, RuleRegistry};

/// Result of running one check against one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    /// Value-specific explanation of the failure
    Fail(String),
}

impl Outcome {
    /// Pass when `ok`, otherwise fail with the lazily built detail
    pub fn check(ok: bool, detail: impl FnOnce() -> String) -> Self {
        if ok { Self::Pass } else { Self::Fail(detail()) }
    }
}

/// A typed, parameter-resolved predicate for a named rule
pub trait Check: fmt::Debug + Send + Sync {
    /// What the rule requires, independent of any value
    fn description(&self) -> String;

    /// Evaluate against one value
    fn check(&self, value: &Value) -> Outcome;

    /// Whether this check still applies to a null value on a nullable node
    fn nullity_aware(&self) -> bool {
        false
    }
}

/// A registry rule bound to its parameter
#[derive(Debug, Clone)]
pub struct NamedRule {
    name: String,
    parameter: &'static str,
    argument: serde_json::Value,
    check: Arc<dyn Check>,
}

impl NamedRule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self) -> &dyn Check {
        self.check.as_ref()
    }
}

type Predicate = dyn Fn(&Value) -> Result<bool, String> + Send + Sync;

/// Author-supplied predicate; an `Err` is an authoring defect, not a validation failure
#[derive(Clone)]
pub struct CustomRule {
    predicate: Arc<Predicate>,
}

impl CustomRule {
    pub fn test(&self, value: &Value) -> Result<bool, String> {
        (self.predicate)(value)
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomRule(<predicate>)")
    }
}

/// What a guard can see: the value under test and the map that holds it
#[derive(Debug, Clone, Copy)]
pub struct GuardContext<'a> {
    pub node: &'a DataValueNode,
    pub parent: Option<&'a DataValueNode>,
}

impl<'a> GuardContext<'a> {
    pub fn new(node: &'a DataValueNode, parent: Option<&'a DataValueNode>) -> Self {
        Self { node, parent }
    }

    /// Entry of the enclosing map
    pub fn sibling(&self, key: &str) -> Option<&'a DataValueNode> {
        self.parent.and_then(|parent| parent.get(key))
    }
}

type GuardFn = dyn Fn(&GuardContext<'_>) -> bool + Send + Sync;

/// Condition under which a wrapped rule applies
#[derive(Clone)]
pub struct Guard {
    description: String,
    predicate: Arc<GuardFn>,
}

impl Guard {
    pub fn new(
        description: impl Into<String>,
        predicate: impl Fn(&GuardContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self { description: description.into(), predicate: Arc::new(predicate) }
    }

    /// Holds when sibling `key` equals `literal`
    pub fn sibling_equals(key: impl Into<String>, literal: serde_json::Value) -> Self {
        let key = key.into();
        let description = format!("{key} == {literal}");
        Self::new(description, move |ctx| {
            ctx.sibling(&key).is_some_and(|node| node.value.matches_literal(&literal))
        })
    }

    /// Holds when sibling `key` exists and is not null
    pub fn sibling_present(key: impl Into<String>) -> Self {
        let key = key.into();
        let description = format!("{key} is not null");
        Self::new(description, move |ctx| ctx.sibling(&key).is_some_and(|node| !node.value.is_null()))
    }

    pub fn holds(&self, ctx: &GuardContext<'_>) -> bool {
        (self.predicate)(ctx)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").field("description", &self.description).finish()
    }
}

/// How a rule decides pass or fail
#[derive(Debug, Clone)]
pub enum RuleKind {
    Named(NamedRule),
    Custom(CustomRule),
    Conditional { guard: Guard, inner: Box<Rule> },
}

/// One constraint attached to a schema position
#[derive(Debug, Clone)]
pub struct Rule {
    description: String,
    kind: RuleKind,
    location: SourceLocation,
}

impl Rule {
    /// Bind a resolved check; used by the registry
    pub(crate) fn named(
        name: impl Into<String>,
        parameter: &'static str,
        argument: serde_json::Value,
        check: Arc<dyn Check>,
        location: SourceLocation,
    ) -> Self {
        Self {
            description: check.description(),
            kind: RuleKind::Named(NamedRule { name: name.into(), parameter, argument, check }),
            location,
        }
    }

    /// A custom rule whose predicate may fail
    pub fn custom(
        description: impl Into<String>,
        location: SourceLocation,
        predicate: impl Fn(&Value) -> Result<bool, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            kind: RuleKind::Custom(CustomRule { predicate: Arc::new(predicate) }),
            location,
        }
    }

    /// A custom rule with an infallible predicate
    pub fn assert(
        description: impl Into<String>,
        location: SourceLocation,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::custom(description, location, move |value| Ok(predicate(value)))
    }

    /// Apply this rule only when `guard` holds
    pub fn when(self, guard: Guard) -> Self {
        Self {
            description: self.description.clone(),
            location: self.location.clone(),
            kind: RuleKind::Conditional { guard, inner: Box::new(self) },
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Registry name, looking through conditional wrappers
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            RuleKind::Named(named) => Some(named.name()),
            RuleKind::Custom(_) => None,
            RuleKind::Conditional { inner, .. } => inner.name(),
        }
    }

    /// Parameter name to literal, empty for custom rules
    pub fn parameters(&self) -> BTreeMap<&str, &serde_json::Value> {
        match &self.kind {
            RuleKind::Named(named) => BTreeMap::from([(named.parameter, &named.argument)]),
            RuleKind::Custom(_) => BTreeMap::new(),
            RuleKind::Conditional { inner, .. } => inner.parameters(),
        }
    }

    /// Whether the rule is about nullity and so survives null short-circuiting
    pub fn is_nullity_aware(&self) -> bool {
        match &self.kind {
            RuleKind::Named(named) => named.check.nullity_aware(),
            RuleKind::Custom(_) => false,
            RuleKind::Conditional { inner, .. } => inner.is_nullity_aware(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::values::ValuePath;
    use serde_json::json;

    fn map_node(json: serde_json::Value) -> DataValueNode {
        DataValueNode::from_json(ValuePath::root(), &json, &SourceLocation::unknown())
    }

    #[test]
    fn test_custom_rule_keeps_description() {
        let rule = Rule::assert("not 'default'", SourceLocation::new("schema.yml", 4), |v| {
            v.as_str() != Some("default")
        });

        assert_eq!(rule.description(), "not 'default'");
        assert_eq!(rule.name(), None);
        assert!(rule.parameters().is_empty());
        assert!(!rule.is_nullity_aware());
        match rule.kind() {
            RuleKind::Custom(custom) => {
                assert_eq!(custom.test(&Value::String("default".into())), Ok(false));
            }
            other => panic!("expected custom rule, got {other:?}"),
        }
    }

    #[test]
    fn test_guards_read_siblings() {
        let parent = map_node(json!({"tls": true, "cert": null, "mode": "strict"}));
        let cert = parent.get("cert").unwrap();
        let ctx = GuardContext::new(cert, Some(&parent));

        assert!(Guard::sibling_equals("tls", json!(true)).holds(&ctx));
        assert!(!Guard::sibling_equals("tls", json!(false)).holds(&ctx));
        assert!(Guard::sibling_present("mode").holds(&ctx));
        assert!(!Guard::sibling_present("cert").holds(&ctx));
        assert!(!Guard::sibling_present("missing").holds(&ctx));

        let orphan = GuardContext::new(cert, None);
        assert!(!Guard::sibling_present("mode").holds(&orphan));
    }

    #[test]
    fn test_conditional_wraps_inner_rule() {
        let rule = Rule::assert("non-empty", SourceLocation::new("schema.yml", 9), |v| {
            v.length().unwrap_or(0) > 0
        })
        .when(Guard::sibling_present("tls"));

        assert_eq!(rule.description(), "non-empty");
        assert_eq!(rule.location(), &SourceLocation::new("schema.yml", 9));
        assert!(matches!(rule.kind(), RuleKind::Conditional { .. }));
    }
}
