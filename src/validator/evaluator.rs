//! Rule evaluation
//!
//! Dispatches on the rule kind: named rules delegate to their registry check,
//! custom rules call the author's predicate, conditional rules consult the guard first.

use crate::domain::violations::{GuardError, GuardResult};
use crate::rules::{GuardContext, Outcome, Rule, RuleKind};

/// Result of applying one rule to one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Pass,
    Fail(String),
    /// A conditional rule whose guard did not hold
    Skipped,
}

/// Evaluate `rule` against the value in `ctx`
///
/// A custom predicate returning `Err` aborts with [`GuardError::Predicate`].
pub fn evaluate(rule: &Rule, ctx: &GuardContext<'_>) -> GuardResult<Evaluation> {
    match rule.kind() {
        RuleKind::Named(named) => Ok(match named.check().check(&ctx.node.value) {
            Outcome::Pass => Evaluation::Pass,
            Outcome::Fail(detail) => Evaluation::Fail(detail),
        }),
        RuleKind::Custom(custom) => match custom.test(&ctx.node.value) {
            Ok(true) => Ok(Evaluation::Pass),
            Ok(false) => Ok(Evaluation::Fail(rule.description().to_string())),
            Err(message) => Err(GuardError::predicate(rule.location(), message)),
        },
        RuleKind::Conditional { guard, inner } => {
            if guard.holds(ctx) {
                evaluate(inner, ctx)
            } else {
                tracing::debug!(
                    "Skipping '{}' at '{}': guard '{}' does not hold",
                    rule.description(),
                    ctx.node.path,
                    guard.description()
                );
                Ok(Evaluation::Skipped)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::values::{DataValueNode, SourceLocation, ValuePath};
    use crate::rules::{Guard, RuleRegistry};
    use serde_json::json;

    fn node(json: serde_json::Value) -> DataValueNode {
        DataValueNode::from_json(ValuePath::root(), &json, &SourceLocation::unknown())
    }

    #[test]
    fn test_named_rule_uses_check_detail() {
        let rule = RuleRegistry::default()
            .lookup("min", &json!(1024), &SourceLocation::new("schema.yml", 1))
            .unwrap();
        let value = node(json!(0));

        assert_eq!(
            evaluate(&rule, &GuardContext::new(&value, None)).unwrap(),
            Evaluation::Fail("0 is less than 1024".to_string())
        );
    }

    #[test]
    fn test_custom_rule_fails_with_description() {
        let rule = Rule::assert("not 'default'", SourceLocation::unknown(), |v| {
            v.as_str() != Some("default")
        });

        let bad = node(json!("default"));
        let good = node(json!("prod"));
        assert_eq!(
            evaluate(&rule, &GuardContext::new(&bad, None)).unwrap(),
            Evaluation::Fail("not 'default'".to_string())
        );
        assert_eq!(evaluate(&rule, &GuardContext::new(&good, None)).unwrap(), Evaluation::Pass);
    }

    #[test]
    fn test_raising_predicate_is_fatal() {
        let location = SourceLocation::new("schema.yml", 12);
        let rule = Rule::custom("parses as port", location.clone(), |v| {
            v.as_str().ok_or_else(|| "expected a string".to_string())?;
            Ok(true)
        });

        let err = evaluate(&rule, &GuardContext::new(&node(json!(3)), None)).unwrap_err();
        match err {
            GuardError::Predicate { location: at, message } => {
                assert_eq!(at, location);
                assert_eq!(message, "expected a string");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_conditional_rule() {
        let rule = RuleRegistry::default()
            .lookup("min_len", &json!(1), &SourceLocation::unknown())
            .unwrap()
            .when(Guard::sibling_equals("tls", json!(true)));

        let enabled = node(json!({"tls": true, "cert": ""}));
        let disabled = node(json!({"tls": false, "cert": ""}));

        let cert = enabled.get("cert").unwrap();
        assert_eq!(
            evaluate(&rule, &GuardContext::new(cert, Some(&enabled))).unwrap(),
            Evaluation::Fail("length of 0 is less than 1".to_string())
        );

        let cert = disabled.get("cert").unwrap();
        assert_eq!(
            evaluate(&rule, &GuardContext::new(cert, Some(&disabled))).unwrap(),
            Evaluation::Skipped
        );
    }
}
