//! Schema node tree
//!
//! Architecture: Aggregate - A SchemaNode owns its rules and its children
//! - Built once per run by a schema parser, immutable afterwards
//! - Sibling order is declaration order and drives report order
//! - Array-shaped nodes hold a single element template

use crate::domain::values::{PathSegment, ValuePath};
use crate::rules::Rule;
use sha2::{Digest, Sha256};

/// Substructure of a schema node
#[derive(Debug, Clone, Default)]
pub enum SchemaChildren {
    #[default]
    None,
    /// Map entries in declaration order
    Map(Vec<SchemaNode>),
    /// Template applied to every array element
    Array(Box<SchemaNode>),
}

/// One addressable position in the configuration shape
#[derive(Debug, Clone, Default)]
pub struct SchemaNode {
    path: ValuePath,
    rules: Vec<Rule>,
    nullable: bool,
    children: SchemaChildren,
}

impl SchemaNode {
    pub fn new(path: ValuePath) -> Self {
        Self { path, ..Default::default() }
    }

    /// The document root
    pub fn root() -> Self {
        Self::new(ValuePath::root())
    }

    /// A map entry named `key` placed below `parent`
    pub fn field(parent: &ValuePath, key: impl Into<String>) -> Self {
        Self::new(parent.child(key))
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Append a rule after those already declared
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Append a map entry; the child's path must extend this node's path by one key
    pub fn with_child(mut self, child: SchemaNode) -> Self {
        debug_assert!(child.key().is_some(), "map entries are addressed by key");
        match &mut self.children {
            SchemaChildren::Map(children) => children.push(child),
            _ => self.children = SchemaChildren::Map(vec![child]),
        }
        self
    }

    /// Make this node array-shaped with the given element template
    pub fn with_items(mut self, template: SchemaNode) -> Self {
        self.children = SchemaChildren::Array(Box::new(template));
        self
    }

    pub fn path(&self) -> &ValuePath {
        &self.path
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn children(&self) -> &SchemaChildren {
        &self.children
    }

    /// Key of this node inside its parent map
    pub fn key(&self) -> Option<&str> {
        self.path.last_key()
    }

    /// Map entry by key
    pub fn child(&self, key: &str) -> Option<&SchemaNode> {
        match &self.children {
            SchemaChildren::Map(children) => children.iter().find(|c| c.key() == Some(key)),
            _ => None,
        }
    }

    /// Rules declared on this node and everything below it
    pub fn rule_count(&self) -> usize {
        self.rules.len() + self.descendant_rule_count()
    }

    /// Rules declared strictly below this node
    pub fn descendant_rule_count(&self) -> usize {
        match &self.children {
            SchemaChildren::None => 0,
            SchemaChildren::Map(children) => children.iter().map(SchemaNode::rule_count).sum(),
            SchemaChildren::Array(template) => template.rule_count(),
        }
    }

    /// Pre-order iterator over this node and its descendants
    pub fn walk(&self) -> Vec<&SchemaNode> {
        let mut nodes = vec![self];
        match &self.children {
            SchemaChildren::None => {}
            SchemaChildren::Map(children) => {
                for child in children {
                    nodes.extend(child.walk());
                }
            }
            SchemaChildren::Array(template) => nodes.extend(template.walk()),
        }
        nodes
    }

    /// Stable hash of paths, nullability and rules, for tagging reports
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for node in self.walk() {
            for segment in node.path.segments() {
                match segment {
                    PathSegment::Key(key) => hasher.update(format!("k:{key};")),
                    PathSegment::Index(index) => hasher.update(format!("i:{index};")),
                    PathSegment::AnyItem => hasher.update("any;"),
                }
            }
            hasher.update(if node.nullable { "nullable\n" } else { "required\n" });
            for rule in &node.rules {
                hasher.update(format!(
                    "{}|{}|{}\n",
                    rule.name().unwrap_or("<custom>"),
                    rule.description(),
                    rule.location()
                ));
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::values::SourceLocation;
    use crate::rules::RuleRegistry;
    use serde_json::json;

    fn sample() -> SchemaNode {
        let registry = RuleRegistry::default();
        let location = SourceLocation::new("schema.yml", 1);
        let root = ValuePath::root();
        let ports = ValuePath::from_keys("ports");

        SchemaNode::root()
            .with_child(
                SchemaNode::field(&root, "namespace")
                    .with_rule(registry.lookup("min_len", &json!(1), &location).unwrap())
                    .with_rule(registry.lookup("max_len", &json!(63), &location).unwrap()),
            )
            .with_child(SchemaNode::field(&root, "database").nullable(true).with_child(
                SchemaNode::new(ValuePath::from_keys("database.host"))
                    .with_rule(registry.lookup("min_len", &json!(1), &location).unwrap()),
            ))
            .with_child(SchemaNode::new(ports.clone()).with_items(
                SchemaNode::new(ports.any_item())
                    .with_rule(registry.lookup("min", &json!(1), &location).unwrap()),
            ))
    }

    #[test]
    fn test_structure() {
        let schema = sample();
        let keys: Vec<_> = schema.walk().iter().map(|n| n.path().to_string()).collect();
        assert_eq!(keys, ["", "namespace", "database", "database.host", "ports", "ports[]"]);

        assert_eq!(schema.rule_count(), 4);
        assert_eq!(schema.child("database").unwrap().descendant_rule_count(), 1);
        assert!(schema.child("database").unwrap().is_nullable());
        assert_eq!(schema.child("namespace").unwrap().key(), Some("namespace"));
        assert!(schema.child("missing").is_none());
    }

    #[test]
    fn test_fingerprint_is_stable_and_sensitive() {
        assert_eq!(sample().fingerprint(), sample().fingerprint());
        let changed = sample().with_child(SchemaNode::field(&ValuePath::root(), "extra"));
        assert_ne!(sample().fingerprint(), changed.fingerprint());
    }
}
