//! Overlaying values documents onto schema defaults
//!
//! Maps merge key by key, scalars and arrays replace. Array elements start
//! from the item declaration's defaults before the supplied element is laid over them.

use super::schema_doc::{Declaration, SchemaDocument, Shape};
use super::SourceText;
use crate::domain::values::{DataValueNode, Value, ValuePath};
use crate::domain::violations::{GuardError, GuardResult};
use std::fs;
use std::path::Path;

/// One parsed values document
#[derive(Debug, Clone)]
pub struct ValuesDocument {
    file: String,
    root: Option<DataValueNode>,
}

impl ValuesDocument {
    pub fn load(path: &Path) -> GuardResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&path.display().to_string(), &content)
    }

    pub fn parse(file: &str, content: &str) -> GuardResult<Self> {
        if super::is_blank(content) {
            return Ok(Self { file: file.to_string(), root: None });
        }

        let text = SourceText::new(file, content);
        let spanned = text.parse(content).map_err(|message| GuardError::merge(file, message))?;
        let root = text.to_data(&spanned, &ValuePath::root()).map_err(|m| GuardError::merge(file, m))?;

        match root.value {
            Value::Null => Ok(Self { file: file.to_string(), root: None }),
            Value::Map(_) => Ok(Self { file: file.to_string(), root: Some(root) }),
            _ => Err(GuardError::merge(file, "top level must be a mapping")),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }
}

/// Schema defaults with every document laid over them in order
pub fn merge(schema: &SchemaDocument, documents: &[ValuesDocument]) -> GuardResult<DataValueNode> {
    let mut data = materialize(schema.root(), &ValuePath::root())
        .map_err(|message| GuardError::schema(schema.file(), message))?;

    for document in documents {
        match &document.root {
            Some(patch) => overlay(schema.root(), &mut data, patch)
                .map_err(|message| GuardError::merge(&document.file, message))?,
            None => tracing::warn!("Values document {} is empty", document.file),
        }
    }

    Ok(data)
}

/// Default value of a declaration; nullable nodes start out null
fn materialize(decl: &Declaration, path: &ValuePath) -> Result<DataValueNode, String> {
    if decl.nullable {
        let location = decl.default.as_ref().map_or(&decl.location, |d| &d.location);
        return Ok(DataValueNode::new(path.clone(), Value::Null, location.clone()));
    }
    materialize_present(decl, path)
}

/// Default value of a declaration as if it had been supplied
fn materialize_present(decl: &Declaration, path: &ValuePath) -> Result<DataValueNode, String> {
    match &decl.shape {
        Shape::Map(properties) => {
            let entries = properties
                .iter()
                .map(|(key, child)| Ok((key.clone(), materialize(child, &path.child(key.clone()))?)))
                .collect::<Result<Vec<_>, String>>()?;
            Ok(DataValueNode::new(path.clone(), Value::Map(entries), decl.location.clone()))
        }
        Shape::Array(_) => {
            let Some(default) = &decl.default else {
                return Ok(DataValueNode::new(path.clone(), Value::Array(Vec::new()), decl.location.clone()));
            };
            let mut node = DataValueNode::new(path.clone(), Value::Null, decl.location.clone());
            overlay(decl, &mut node, default)?;
            Ok(node)
        }
        Shape::Leaf => Ok(match &decl.default {
            Some(default) => default.clone().rebase(path),
            None => DataValueNode::new(path.clone(), Value::Null, decl.location.clone()),
        }),
    }
}

/// Lay `patch` over `base`, both positioned at `decl`
fn overlay(decl: &Declaration, base: &mut DataValueNode, patch: &DataValueNode) -> Result<(), String> {
    if patch.value.is_null() {
        if matches!(decl.shape, Shape::Map(_)) && !decl.nullable {
            return Err(format!("'{}' ({}) is a map that is not nullable", base.path, patch.location));
        }
        base.value = Value::Null;
        base.location = patch.location.clone();
        return Ok(());
    }

    match &decl.shape {
        Shape::Leaf => {
            *base = patch.clone().rebase(&base.path);
        }
        Shape::Map(properties) => {
            let Value::Map(entries) = &patch.value else {
                return Err(format!(
                    "'{}' ({}) must be a map, got {}",
                    base.path,
                    patch.location,
                    patch.value.kind_name()
                ));
            };
            if base.value.is_null() {
                *base = materialize_present(decl, &base.path)?;
            }
            for (key, child_patch) in entries {
                let Some(child_decl) = properties.iter().find(|(k, _)| k == key).map(|(_, d)| d) else {
                    return Err(format!(
                        "'{}' ({}) is not declared in the schema",
                        base.path.child(key.clone()),
                        child_patch.location
                    ));
                };
                let path = base.path.child(key.clone());
                let child = base
                    .get_mut(key)
                    .ok_or_else(|| format!("'{}' is missing from the defaults", path))?;
                overlay(child_decl, child, child_patch)?;
            }
            base.location = patch.location.clone();
        }
        Shape::Array(item) => {
            let Value::Array(elements) = &patch.value else {
                return Err(format!(
                    "'{}' ({}) must be an array, got {}",
                    base.path,
                    patch.location,
                    patch.value.kind_name()
                ));
            };
            let mut items = Vec::with_capacity(elements.len());
            for (i, element) in elements.iter().enumerate() {
                let mut node = materialize_present(item, &base.path.index(i))?;
                overlay(item, &mut node, element)?;
                items.push(node);
            }
            base.value = Value::Array(items);
            base.location = patch.location.clone();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::values::SourceLocation;
    use crate::rules::RuleRegistry;

    const SCHEMA: &str = "\
namespace:
  default: default
database:
  nullable: true
  properties:
    host:
      default: localhost
    port:
      default: 5432
ports:
  default: [80]
  items:
    default: 0
servers:
  items:
    properties:
      name:
        default: ''
      weight:
        default: 1
";

    fn schema() -> SchemaDocument {
        SchemaDocument::parse("schema.yml", SCHEMA, &RuleRegistry::default()).unwrap()
    }

    fn values(file: &str, content: &str) -> ValuesDocument {
        ValuesDocument::parse(file, content).unwrap()
    }

    #[test]
    fn test_defaults_only() {
        let data = merge(&schema(), &[]).unwrap();

        let namespace = data.get("namespace").unwrap();
        assert_eq!(namespace.value, Value::String("default".into()));
        assert_eq!(namespace.location, SourceLocation::new("schema.yml", 2));

        assert!(data.get("database").unwrap().value.is_null());

        let port = data.find(&ValuePath::from_keys("ports").index(0)).unwrap();
        assert_eq!(port.value, Value::Int(80));
        assert_eq!(port.path.to_string(), "ports[0]");

        assert_eq!(data.get("servers").unwrap().value, Value::Array(Vec::new()));
    }

    #[test]
    fn test_overlay_order_and_locations() {
        let data = merge(
            &schema(),
            &[
                values("base.yml", "namespace: staging\n"),
                values("prod.yml", "\nnamespace: prod\n"),
            ],
        )
        .unwrap();

        let namespace = data.get("namespace").unwrap();
        assert_eq!(namespace.value, Value::String("prod".into()));
        assert_eq!(namespace.location, SourceLocation::new("prod.yml", 2));
    }

    #[test]
    fn test_present_nullable_map_gets_defaults() {
        let data = merge(&schema(), &[values("values.yml", "database:\n  host: db.internal\n")]).unwrap();

        let database = data.get("database").unwrap();
        assert_eq!(database.get("host").unwrap().value, Value::String("db.internal".into()));
        assert_eq!(database.get("port").unwrap().value, Value::Int(5432));
        assert_eq!(database.get("port").unwrap().path.to_string(), "database.port");
    }

    #[test]
    fn test_array_elements_start_from_item_defaults() {
        let data = merge(
            &schema(),
            &[values("values.yml", "ports: [8080, 8443]\nservers:\n  - name: a\n  - weight: 3\n")],
        )
        .unwrap();

        let ports = data.get("ports").unwrap();
        assert_eq!(ports.value.length(), Some(2));

        let second = data.find(&ValuePath::from_keys("servers").index(1)).unwrap();
        assert_eq!(second.get("name").unwrap().value, Value::String(String::new()));
        assert_eq!(second.get("weight").unwrap().value, Value::Int(3));
        assert_eq!(second.get("weight").unwrap().path.to_string(), "servers[1].weight");
    }

    #[test]
    fn test_explicit_null() {
        let data = merge(&schema(), &[values("values.yml", "namespace: ~\n")]).unwrap();
        assert!(data.get("namespace").unwrap().value.is_null());
    }

    #[test]
    fn test_merge_errors() {
        for content in [
            "colour: blue\n",
            "database: 3\n",
            "ports: 80\n",
            "database:\n  user: me\n",
            "servers:\n  - ~\n",
            "- a\n",
        ] {
            let result = ValuesDocument::parse("values.yml", content)
                .and_then(|doc| merge(&schema(), &[doc]));
            match result {
                Err(GuardError::Merge { file, .. }) => assert_eq!(file, "values.yml"),
                other => panic!("{content:?} gave {other:?}"),
            }
        }
    }

    #[test]
    fn test_null_onto_required_map() {
        let schema = SchemaDocument::parse(
            "schema.yml",
            "server:\n  properties:\n    port:\n      default: 80\n",
            &RuleRegistry::default(),
        )
        .unwrap();

        match merge(&schema, &[values("values.yml", "server: ~\n")]) {
            Err(GuardError::Merge { file, message }) => {
                assert_eq!(file, "values.yml");
                assert!(message.contains("not nullable"), "{message}");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let data = merge(&schema, &[values("values.yml", "server:\n  port: ~\n")]).unwrap();
        assert!(data.find(&ValuePath::from_keys("server").child("port")).unwrap().value.is_null());
    }

    #[test]
    fn test_empty_document_is_ignored() {
        let data = merge(&schema(), &[values("empty.yml", "# nothing here\n")]).unwrap();
        assert_eq!(data.get("namespace").unwrap().value, Value::String("default".into()));
    }
}
