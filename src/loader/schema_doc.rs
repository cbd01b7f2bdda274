//! Schema documents
//!
//! Every key of a schema document declares one node:
//!
//! ```yaml
//! namespace:
//!   default: default
//!   validations:
//!     - min_len: 1
//!     - max_len: 63
//! database:
//!   nullable: true
//!   properties:
//!     host:
//!       validations:
//!         - min_len: 1
//! ```

use super::SourceText;
use crate::domain::values::{DataValueNode, SourceLocation, Value, ValuePath};
use crate::domain::violations::{GuardError, GuardResult};
use crate::rules::{Guard, Rule, RuleRegistry};
use crate::schema::SchemaNode;
use std::fs;
use std::path::Path;
use yaml_spanned::{Spanned, Value as YamlValue};

const FIELDS: &[&str] = &["default", "nullable", "validations", "properties", "items", "description"];

/// Shape below a declared node
#[derive(Debug, Clone)]
pub enum Shape {
    Leaf,
    Map(Vec<(String, Declaration)>),
    Array(Box<Declaration>),
}

/// One declared node, as written
#[derive(Debug, Clone)]
pub struct Declaration {
    pub path: ValuePath,
    /// Line of the declaring key
    pub location: SourceLocation,
    pub nullable: bool,
    pub default: Option<DataValueNode>,
    pub rules: Vec<Rule>,
    pub description: Option<String>,
    pub shape: Shape,
}

impl Declaration {
    fn new(path: ValuePath, location: SourceLocation) -> Self {
        Self {
            path,
            location,
            nullable: false,
            default: None,
            rules: Vec::new(),
            description: None,
            shape: Shape::Leaf,
        }
    }

    /// Property declaration by key
    pub fn property(&self, key: &str) -> Option<&Declaration> {
        match &self.shape {
            Shape::Map(properties) => properties.iter().find(|(k, _)| k == key).map(|(_, d)| d),
            _ => None,
        }
    }

    /// Documented declarations in pre-order
    pub fn descriptions(&self) -> Vec<(&ValuePath, &str)> {
        let mut found = Vec::new();
        self.collect_descriptions(&mut found);
        found
    }

    fn collect_descriptions<'a>(&'a self, found: &mut Vec<(&'a ValuePath, &'a str)>) {
        if let Some(description) = &self.description {
            found.push((&self.path, description.as_str()));
        }
        match &self.shape {
            Shape::Leaf => {}
            Shape::Map(properties) => properties.iter().for_each(|(_, decl)| decl.collect_descriptions(found)),
            Shape::Array(item) => item.collect_descriptions(found),
        }
    }

    fn to_schema(&self) -> SchemaNode {
        let node = SchemaNode::new(self.path.clone())
            .nullable(self.nullable)
            .with_rules(self.rules.iter().cloned());
        match &self.shape {
            Shape::Leaf => node,
            Shape::Map(properties) => {
                properties.iter().fold(node, |node, (_, decl)| node.with_child(decl.to_schema()))
            }
            Shape::Array(item) => node.with_items(item.to_schema()),
        }
    }
}

/// A parsed schema document
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    file: String,
    root: Declaration,
}

impl SchemaDocument {
    pub fn load(path: &Path, registry: &RuleRegistry) -> GuardResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&path.display().to_string(), &content, registry)
    }

    pub fn parse(file: &str, content: &str, registry: &RuleRegistry) -> GuardResult<Self> {
        let mut root = Declaration::new(ValuePath::root(), SourceLocation::new(file, 1));
        if super::is_blank(content) {
            root.shape = Shape::Map(Vec::new());
            return Ok(Self { file: file.to_string(), root });
        }

        let text = SourceText::new(file, content);
        let spanned = text.parse(content).map_err(|message| GuardError::schema(file, message))?;

        let parser = DeclarationParser { text: &text, registry };
        match spanned.as_ref() {
            YamlValue::Null => root.shape = Shape::Map(Vec::new()),
            YamlValue::Mapping(_) => root.shape = Shape::Map(parser.properties(&spanned, &root.path)?),
            _ => return Err(GuardError::schema(file, "top level must be a mapping of declarations")),
        }

        let declared = root.to_schema().walk().len() - 1;
        tracing::debug!("Parsed {} declarations from {}", declared, file);

        Ok(Self { file: file.to_string(), root })
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn root(&self) -> &Declaration {
        &self.root
    }

    /// Validation tree for this document
    pub fn schema(&self) -> SchemaNode {
        self.root.to_schema()
    }
}

struct DeclarationParser<'a> {
    text: &'a SourceText,
    registry: &'a RuleRegistry,
}

impl DeclarationParser<'_> {
    fn error(&self, message: impl Into<String>) -> GuardError {
        GuardError::schema(self.text.file(), message)
    }

    /// Declarations of a mapping node, in document order
    fn properties(
        &self,
        spanned: &Spanned<YamlValue>,
        parent: &ValuePath,
    ) -> GuardResult<Vec<(String, Declaration)>> {
        let YamlValue::Mapping(map) = spanned.as_ref() else {
            return Err(self.error(format!(
                "'properties' of '{}' ({}) must be a mapping",
                parent,
                self.text.location(spanned)
            )));
        };

        let mut properties: Vec<(String, Declaration)> = Vec::new();
        for (key_spanned, value_spanned) in map {
            let key = self.text.key(key_spanned).map_err(|m| self.error(m))?;
            if properties.iter().any(|(k, _)| *k == key) {
                return Err(self.error(format!(
                    "'{}' is declared twice ({})",
                    parent.child(key.clone()),
                    self.text.location(key_spanned)
                )));
            }
            let declaration =
                self.declaration(value_spanned, parent.child(key.clone()), self.text.location(key_spanned))?;
            properties.push((key, declaration));
        }
        Ok(properties)
    }

    fn declaration(
        &self,
        spanned: &Spanned<YamlValue>,
        path: ValuePath,
        location: SourceLocation,
    ) -> GuardResult<Declaration> {
        let mut decl = Declaration::new(path, location);
        let map = match spanned.as_ref() {
            YamlValue::Null => return Ok(decl),
            YamlValue::Mapping(map) => map,
            _ => {
                return Err(self.error(format!(
                    "declaration of '{}' ({}) must be a mapping of {}",
                    decl.path,
                    decl.location,
                    FIELDS.join(", ")
                )))
            }
        };

        let mut properties = None;
        let mut items = None;
        for (field_spanned, value) in map {
            let field = self.text.key(field_spanned).map_err(|m| self.error(m))?;
            let field_location = self.text.location(field_spanned);
            match field.as_str() {
                "default" => {
                    let default = self.text.to_data(value, &decl.path).map_err(|m| self.error(m))?;
                    decl.default = Some(default.with_location(field_location.clone()));
                }
                "nullable" => match value.as_ref() {
                    YamlValue::Bool(b) => decl.nullable = *b,
                    _ => {
                        return Err(self.error(format!(
                            "'nullable' of '{}' ({}) must be true or false",
                            decl.path, field_location
                        )))
                    }
                },
                "description" => match value.as_ref() {
                    YamlValue::String(s) => decl.description = Some(s.clone()),
                    _ => {
                        return Err(self.error(format!(
                            "'description' of '{}' ({}) must be a string",
                            decl.path, field_location
                        )))
                    }
                },
                "validations" => decl.rules = self.validations(value, &decl.path)?,
                "properties" => properties = Some(self.properties(value, &decl.path)?),
                "items" => {
                    items = Some(self.declaration(value, decl.path.any_item(), field_location)?);
                }
                other => {
                    return Err(self.error(format!(
                        "unknown field '{}' in declaration of '{}' ({}); expected one of: {}",
                        other,
                        decl.path,
                        field_location,
                        FIELDS.join(", ")
                    )))
                }
            }
        }

        decl.shape = match (properties, items) {
            (Some(_), Some(_)) => {
                return Err(self.error(format!(
                    "'{}' ({}) declares both properties and items",
                    decl.path, decl.location
                )))
            }
            (Some(properties), None) => {
                if decl.default.is_some() {
                    return Err(self.error(format!(
                        "'{}' ({}) declares properties; defaults belong on the properties",
                        decl.path, decl.location
                    )));
                }
                Shape::Map(properties)
            }
            (None, Some(item)) => {
                if let Some(default) = &decl.default {
                    if !matches!(default.value, Value::Array(_)) {
                        return Err(self.error(format!(
                            "default of '{}' ({}) must be an array",
                            decl.path, default.location
                        )));
                    }
                }
                Shape::Array(Box::new(item))
            }
            (None, None) => Shape::Leaf,
        };

        Ok(decl)
    }

    fn validations(&self, spanned: &Spanned<YamlValue>, path: &ValuePath) -> GuardResult<Vec<Rule>> {
        let entries = match spanned.as_ref() {
            YamlValue::Null => return Ok(Vec::new()),
            YamlValue::Sequence(entries) => entries,
            _ => {
                return Err(self.error(format!(
                    "validations of '{}' ({}) must be a list",
                    path,
                    self.text.location(spanned)
                )))
            }
        };

        let mut rules = Vec::new();
        for entry in entries.iter() {
            let YamlValue::Mapping(map) = entry.as_ref() else {
                return Err(self.error(format!(
                    "each validation of '{}' ({}) must be a mapping of rule name to parameter",
                    path,
                    self.text.location(entry)
                )));
            };

            let mut guard = None;
            let mut declared = Vec::new();
            for (name_spanned, argument) in map {
                let name = self.text.key(name_spanned).map_err(|m| self.error(m))?;
                if name == "when" {
                    guard = Some(self.guard(argument)?);
                    continue;
                }
                let location = self.text.location(name_spanned);
                let argument = self
                    .text
                    .to_data(argument, path)
                    .map_err(|m| self.error(m))?
                    .value
                    .to_json();
                declared.push(self.registry.lookup(&name, &argument, &location)?);
            }

            if declared.is_empty() {
                return Err(self.error(format!(
                    "validation of '{}' ({}) names no rule",
                    path,
                    self.text.location(entry)
                )));
            }
            rules.extend(declared.into_iter().map(|rule| match &guard {
                Some(guard) => rule.when(guard.clone()),
                None => rule,
            }));
        }
        Ok(rules)
    }

    fn guard(&self, spanned: &Spanned<YamlValue>) -> GuardResult<Guard> {
        let location = self.text.location(spanned);
        let invalid = || {
            self.error(format!(
                "'when' ({location}) must be {{sibling: <key>, equals: <value>}} or {{sibling: <key>, present: true}}"
            ))
        };

        let YamlValue::Mapping(map) = spanned.as_ref() else {
            return Err(invalid());
        };

        let mut sibling = None;
        let mut equals = None;
        let mut present = false;
        for (key_spanned, value) in map {
            match self.text.key(key_spanned).map_err(|m| self.error(m))?.as_str() {
                "sibling" => match value.as_ref() {
                    YamlValue::String(key) => sibling = Some(key.clone()),
                    _ => return Err(invalid()),
                },
                "equals" => {
                    let literal = self
                        .text
                        .to_data(value, &ValuePath::root())
                        .map_err(|m| self.error(m))?
                        .value
                        .to_json();
                    equals = Some(literal);
                }
                "present" => match value.as_ref() {
                    YamlValue::Bool(true) => present = true,
                    _ => return Err(invalid()),
                },
                _ => return Err(invalid()),
            }
        }

        match (sibling, equals, present) {
            (Some(key), Some(literal), false) => Ok(Guard::sibling_equals(key, literal)),
            (Some(key), None, true) => Ok(Guard::sibling_present(key)),
            _ => Err(invalid()),
        }
    }
}
