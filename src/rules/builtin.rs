//! Checks behind the built-in named rules

use crate::domain::values::{Number, Value};
use crate::rules::{Check, Outcome};
use regex::Regex;
use std::cmp::Ordering;

fn wrong_kind(expected: &str, value: &Value) -> Outcome {
    Outcome::Fail(format!("value must be {expected} (was {})", value.kind_name()))
}

fn not_comparable(value: Number, bound: Number) -> Outcome {
    Outcome::Fail(format!("{value} cannot be compared with {}", bound))
}

const LENGTH_KINDS: &str = "a string, array, or map";

/// `min_len`
#[derive(Debug)]
pub struct MinLen(pub usize);

impl Check for MinLen {
    fn description(&self) -> String {
        format!("length greater or equal to {}", self.0)
    }

    fn check(&self, value: &Value) -> Outcome {
        match value.length() {
            Some(len) => Outcome::check(len >= self.0, || {
                format!("length of {len} is less than {}", self.0)
            }),
            None => wrong_kind(LENGTH_KINDS, value),
        }
    }
}

/// `max_len`
#[derive(Debug)]
pub struct MaxLen(pub usize);

impl Check for MaxLen {
    fn description(&self) -> String {
        format!("length less than or equal to {}", self.0)
    }

    fn check(&self, value: &Value) -> Outcome {
        match value.length() {
            Some(len) => Outcome::check(len <= self.0, || {
                format!("length of {len} is more than {}", self.0)
            }),
            None => wrong_kind(LENGTH_KINDS, value),
        }
    }
}

/// `min`
#[derive(Debug)]
pub struct Min(pub Number);

impl Check for Min {
    fn description(&self) -> String {
        format!("a value greater or equal to {}", self.0)
    }

    fn check(&self, value: &Value) -> Outcome {
        match value.as_number() {
            Some(n) => match n.compare(self.0) {
                Some(Ordering::Less) => Outcome::Fail(format!("{n} is less than {}", self.0)),
                Some(_) => Outcome::Pass,
                None => not_comparable(n, self.0),
            },
            None => wrong_kind("a number", value),
        }
    }
}

/// `max`
#[derive(Debug)]
pub struct Max(pub Number);

impl Check for Max {
    fn description(&self) -> String {
        format!("a value less than or equal to {}", self.0)
    }

    fn check(&self, value: &Value) -> Outcome {
        match value.as_number() {
            Some(n) => match n.compare(self.0) {
                Some(Ordering::Greater) => Outcome::Fail(format!("{n} is more than {}", self.0)),
                Some(_) => Outcome::Pass,
                None => not_comparable(n, self.0),
            },
            None => wrong_kind("a number", value),
        }
    }
}

/// `one_of`
#[derive(Debug)]
pub struct OneOf(pub Vec<serde_json::Value>);

impl OneOf {
    fn joined(&self) -> String {
        self.0
            .iter()
            .map(|literal| match literal {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Check for OneOf {
    fn description(&self) -> String {
        format!("one of: {}", self.joined())
    }

    fn check(&self, value: &Value) -> Outcome {
        Outcome::check(self.0.iter().any(|literal| value.matches_literal(literal)), || {
            format!("{value} is not one of: {}", self.joined())
        })
    }
}

/// `not_null`; `NotNull(false)` requires the value to be null
#[derive(Debug)]
pub struct NotNull(pub bool);

impl Check for NotNull {
    fn description(&self) -> String {
        if self.0 { "not null".to_string() } else { "null".to_string() }
    }

    fn check(&self, value: &Value) -> Outcome {
        Outcome::check(value.is_null() != self.0, || {
            if self.0 { "value is null".to_string() } else { format!("value is not null ({value})") }
        })
    }

    fn nullity_aware(&self) -> bool {
        true
    }
}

/// `one_not_null`; `None` means every entry of the map
#[derive(Debug)]
pub struct OneNotNull(pub Option<Vec<String>>);

fn quoted_list<'a>(keys: impl Iterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = keys.map(|k| format!("\"{k}\"")).collect();
    format!("[{}]", quoted.join(", "))
}

impl Check for OneNotNull {
    fn description(&self) -> String {
        match &self.0 {
            Some(keys) => format!(
                "exactly one of {} to be not null",
                quoted_list(keys.iter().map(String::as_str))
            ),
            None => "exactly one value to be not null".to_string(),
        }
    }

    fn check(&self, value: &Value) -> Outcome {
        let Value::Map(entries) = value else {
            return wrong_kind("a map", value);
        };

        let present: Vec<&str> = match &self.0 {
            Some(keys) => keys
                .iter()
                .filter(|k| value.get(k).is_some_and(|node| !node.value.is_null()))
                .map(String::as_str)
                .collect(),
            None => entries
                .iter()
                .filter(|(_, node)| !node.value.is_null())
                .map(|(k, _)| k.as_str())
                .collect(),
        };

        match present.len() {
            1 => Outcome::Pass,
            0 => Outcome::Fail("all values are null".to_string()),
            _ => Outcome::Fail(format!(
                "multiple values are not null ({})",
                quoted_list(present.into_iter())
            )),
        }
    }
}

/// `pattern`
#[derive(Debug)]
pub struct Pattern(pub Regex);

impl Check for Pattern {
    fn description(&self) -> String {
        format!("a value matching /{}/", self.0.as_str())
    }

    fn check(&self, value: &Value) -> Outcome {
        match value.as_str() {
            Some(s) => Outcome::check(self.0.is_match(s), || {
                format!("\"{s}\" does not match /{}/", self.0.as_str())
            }),
            None => wrong_kind("a string", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::values::{DataValueNode, SourceLocation, ValuePath};
    use rstest::rstest;
    use serde_json::json;

    fn value(json: serde_json::Value) -> Value {
        DataValueNode::from_json(ValuePath::root(), &json, &SourceLocation::unknown()).value
    }

    fn fail(detail: &str) -> Outcome {
        Outcome::Fail(detail.to_string())
    }

    #[rstest]
    #[case(json!(""), fail("length of 0 is less than 1"))]
    #[case(json!("a"), Outcome::Pass)]
    #[case(json!([]), fail("length of 0 is less than 1"))]
    #[case(json!({"k": 1}), Outcome::Pass)]
    #[case(json!(5), fail("value must be a string, array, or map (was integer)"))]
    fn test_min_len(#[case] input: serde_json::Value, #[case] expected: Outcome) {
        assert_eq!(MinLen(1).check(&value(input)), expected);
    }

    #[rstest]
    #[case(serde_json::Value::String("x".repeat(64)), fail("length of 64 is more than 63"))]
    #[case(serde_json::Value::String("x".repeat(63)), Outcome::Pass)]
    #[case(json!(null), fail("value must be a string, array, or map (was null)"))]
    fn test_max_len(#[case] input: serde_json::Value, #[case] expected: Outcome) {
        assert_eq!(MaxLen(63).check(&value(input)), expected);
    }

    #[rstest]
    #[case(json!(0), fail("0 is less than 1024"))]
    #[case(json!(1024), Outcome::Pass)]
    #[case(json!(1023.5), fail("1023.5 is less than 1024"))]
    #[case(json!("8080"), fail("value must be a number (was string)"))]
    fn test_min(#[case] input: serde_json::Value, #[case] expected: Outcome) {
        assert_eq!(Min(Number::Int(1024)).check(&value(input)), expected);
    }

    #[rstest]
    #[case(json!(65535), Outcome::Pass)]
    #[case(json!(70000), fail("70000 is more than 65535"))]
    fn test_max(#[case] input: serde_json::Value, #[case] expected: Outcome) {
        assert_eq!(Max(Number::Int(65535)).check(&value(input)), expected);
    }

    #[rstest]
    #[case(Box::new(Min(Number::Int(0))), Value::Float(f64::NAN), fail("NaN cannot be compared with 0"))]
    #[case(Box::new(Max(Number::Int(10))), Value::Float(f64::NAN), fail("NaN cannot be compared with 10"))]
    #[case(Box::new(Min(Number::Float(f64::NAN))), Value::Int(5), fail("5 cannot be compared with NaN"))]
    #[case(
        Box::new(Max(Number::Float(9_007_199_254_740_992.0))),
        Value::Int(9_007_199_254_740_993),
        fail("9007199254740993 is more than 9007199254740992")
    )]
    #[case(Box::new(Max(Number::Float(9_007_199_254_740_992.0))), Value::Int(9_007_199_254_740_992), Outcome::Pass)]
    #[case(Box::new(Min(Number::Float(0.5))), Value::Int(0), fail("0 is less than 0.5"))]
    #[case(Box::new(Min(Number::Float(-0.5))), Value::Int(0), Outcome::Pass)]
    fn test_bounds_compare_exactly(#[case] rule: Box<dyn Check>, #[case] input: Value, #[case] expected: Outcome) {
        assert_eq!(rule.check(&input), expected);
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(MinLen(1).description(), "length greater or equal to 1");
        assert_eq!(MaxLen(63).description(), "length less than or equal to 63");
        assert_eq!(Min(Number::Int(1024)).description(), "a value greater or equal to 1024");
        assert_eq!(Max(Number::Float(0.5)).description(), "a value less than or equal to 0.5");
        assert_eq!(NotNull(true).description(), "not null");
        assert_eq!(NotNull(false).description(), "null");
        assert_eq!(
            OneOf(vec![json!("debug"), json!("info"), json!(3)]).description(),
            "one of: debug, info, 3"
        );
    }

    #[test]
    fn test_one_of() {
        let check = OneOf(vec![json!("debug"), json!("info")]);
        assert_eq!(check.check(&value(json!("info"))), Outcome::Pass);
        assert_eq!(
            check.check(&value(json!("trace"))),
            fail("\"trace\" is not one of: debug, info")
        );
    }

    #[test]
    fn test_not_null() {
        assert_eq!(NotNull(true).check(&Value::Null), fail("value is null"));
        assert_eq!(NotNull(true).check(&Value::Int(1)), Outcome::Pass);
        assert_eq!(NotNull(false).check(&Value::Null), Outcome::Pass);
        assert_eq!(NotNull(false).check(&Value::Int(1)), fail("value is not null (1)"));
        assert!(NotNull(true).nullity_aware());
        assert!(!MinLen(1).nullity_aware());
    }

    #[test]
    fn test_one_not_null() {
        let all = OneNotNull(None);
        assert_eq!(all.check(&value(json!({"a": 1, "b": null}))), Outcome::Pass);
        assert_eq!(all.check(&value(json!({"a": null, "b": null}))), fail("all values are null"));
        assert_eq!(
            all.check(&value(json!({"a": 1, "b": 2}))),
            fail("multiple values are not null ([\"a\", \"b\"])")
        );

        let listed = OneNotNull(Some(vec!["http".into(), "https".into()]));
        assert_eq!(listed.description(), "exactly one of [\"http\", \"https\"] to be not null");
        assert_eq!(listed.check(&value(json!({"http": 1, "other": 2}))), Outcome::Pass);
        assert_eq!(listed.check(&value(json!([1]))), fail("value must be a map (was array)"));
    }

    #[test]
    fn test_pattern() {
        let check = Pattern(Regex::new("^[a-z]+$").unwrap());
        assert_eq!(check.description(), "a value matching /^[a-z]+$/");
        assert_eq!(check.check(&value(json!("alice"))), Outcome::Pass);
        assert_eq!(
            check.check(&value(json!("Alice"))),
            fail("\"Alice\" does not match /^[a-z]+$/")
        );
    }
}
