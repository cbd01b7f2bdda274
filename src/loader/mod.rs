//! Loading schema and values documents from YAML
//!
//! Architecture: Anti-Corruption Layer - YAML documents are translated into domain trees
//! - Spans from the YAML parser become file:line source locations
//! - Schema documents become a SchemaNode tree plus materialized defaults
//! - Values documents are overlaid on the defaults in the order given

pub mod merge;
pub mod schema_doc;

use crate::domain::values::{DataValueNode, SourceLocation, Value, ValuePath};
use crate::domain::violations::{GuardError, GuardResult};
use crate::rules::RuleRegistry;
use crate::schema::SchemaNode;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use yaml_spanned::{Spanned, Value as YamlValue};

pub use merge::{merge, ValuesDocument};
pub use schema_doc::{Declaration, SchemaDocument, Shape};

/// Maps byte offsets of one document to 1-indexed line numbers
#[derive(Debug, Clone)]
pub(crate) struct SourceText {
    file: String,
    line_starts: Vec<usize>,
}

impl SourceText {
    pub(crate) fn new(file: impl Into<String>, content: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            content.bytes().enumerate().filter(|(_, b)| *b == b'\n').map(|(i, _)| i + 1),
        );
        Self { file: file.into(), line_starts }
    }

    pub(crate) fn file(&self) -> &str {
        &self.file
    }

    pub(crate) fn line_of(&self, byte_index: usize) -> u32 {
        self.line_starts.partition_point(|&start| start <= byte_index) as u32
    }

    /// Location where a spanned YAML node starts
    pub(crate) fn location(&self, spanned: &Spanned<YamlValue>) -> SourceLocation {
        let span = spanned.span();
        SourceLocation::new(&self.file, self.line_of(span.start.unwrap_or_default().byte_index))
    }

    /// Parse `content` keeping spans
    pub(crate) fn parse(&self, content: &str) -> Result<Spanned<YamlValue>, String> {
        yaml_spanned::from_str(content).map_err(|e| format!("invalid YAML: {e}"))
    }

    /// Convert a spanned YAML node into a data tree with a location on every node
    pub(crate) fn to_data(
        &self,
        spanned: &Spanned<YamlValue>,
        path: &ValuePath,
    ) -> Result<DataValueNode, String> {
        let value = match spanned.as_ref() {
            YamlValue::Null => Value::Null,
            YamlValue::Bool(b) => Value::Bool(*b),
            YamlValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    return Err(format!("unsupported number at {}", self.location(spanned)));
                }
            }
            YamlValue::String(s) => Value::String(s.clone()),
            YamlValue::Sequence(seq) => Value::Array(
                seq.iter()
                    .enumerate()
                    .map(|(i, item)| self.to_data(item, &path.index(i)))
                    .collect::<Result<_, _>>()?,
            ),
            YamlValue::Mapping(map) => {
                let mut entries = Vec::new();
                for (key_spanned, value_spanned) in map {
                    let key = self.key(key_spanned)?;
                    let child = self.to_data(value_spanned, &path.child(key.clone()))?;
                    entries.push((key, child));
                }
                Value::Map(entries)
            }
            YamlValue::Tagged(tagged_value) => return self.to_data(&tagged_value.value, path),
        };
        Ok(DataValueNode::new(path.clone(), value, self.location(spanned)))
    }

    /// Mapping keys must be strings
    pub(crate) fn key(&self, spanned: &Spanned<YamlValue>) -> Result<String, String> {
        match spanned.as_ref() {
            YamlValue::String(key) => Ok(key.clone()),
            _ => Err(format!("mapping keys must be strings ({})", self.location(spanned))),
        }
    }
}

/// Documents holding nothing but whitespace and comments
pub(crate) fn is_blank(content: &str) -> bool {
    content.lines().map(str::trim).all(|line| line.is_empty() || line.starts_with('#') || line == "---")
}

/// Schema and merged data ready for validation
#[derive(Debug, Clone)]
pub struct Bundle {
    pub schema: SchemaNode,
    pub data: DataValueNode,
    /// Values documents applied, in order
    pub values_files: Vec<PathBuf>,
}

/// Expand directories into their YAML files, in lexical order
pub fn collect_values_files(paths: &[PathBuf]) -> GuardResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry
                    .map_err(|e| GuardError::merge(path.display().to_string(), e.to_string()))?;
                let is_yaml = entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| matches!(ext, "yml" | "yaml"));
                if entry.file_type().is_file() && is_yaml {
                    files.push(entry.into_path());
                }
            }
        } else {
            return Err(GuardError::merge(path.display().to_string(), "no such file or directory"));
        }
    }

    Ok(files)
}

/// Read a schema document and overlay values documents onto its defaults
pub fn load_bundle(
    schema_path: &Path,
    values: &[PathBuf],
    registry: &RuleRegistry,
) -> GuardResult<Bundle> {
    let document = SchemaDocument::load(schema_path, registry)?;
    let values_files = collect_values_files(values)?;

    let overlays = values_files
        .iter()
        .map(|path| ValuesDocument::load(path))
        .collect::<GuardResult<Vec<_>>>()?;

    let data = merge(&document, &overlays)?;
    tracing::debug!(
        "Loaded schema {} with {} values documents",
        schema_path.display(),
        values_files.len()
    );

    Ok(Bundle { schema: document.schema(), data, values_files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_line_numbers() {
        let text = SourceText::new("values.yml", "a: 1\nb: 2\n\nc: 3\n");
        assert_eq!(text.line_of(0), 1);
        assert_eq!(text.line_of(4), 1);
        assert_eq!(text.line_of(5), 2);
        assert_eq!(text.line_of(11), 4);
    }

    #[test]
    fn test_to_data_records_lines() {
        let content = "name: alice\nports:\n  - 80\n  - 443\n";
        let text = SourceText::new("values.yml", content);
        let spanned = text.parse(content).unwrap();
        let data = text.to_data(&spanned, &ValuePath::root()).unwrap();

        let name = data.get("name").unwrap();
        assert_eq!(name.value, Value::String("alice".into()));
        assert_eq!(name.location, SourceLocation::new("values.yml", 1));

        let second = data.find(&ValuePath::from_keys("ports").index(1)).unwrap();
        assert_eq!(second.value, Value::Int(443));
        assert_eq!(second.location, SourceLocation::new("values.yml", 4));
    }

    #[test]
    fn test_non_string_keys_are_rejected() {
        let content = "1: one\n";
        let text = SourceText::new("values.yml", content);
        let spanned = text.parse(content).unwrap();
        assert!(text.to_data(&spanned, &ValuePath::root()).is_err());
    }

    #[test]
    fn test_collect_values_files() -> GuardResult<()> {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("overlays"))?;
        fs::write(root.join("overlays/b.yaml"), "x: 1")?;
        fs::write(root.join("overlays/a.yml"), "x: 2")?;
        fs::write(root.join("overlays/notes.txt"), "ignored")?;
        fs::write(root.join("base.yml"), "x: 0")?;

        let files = collect_values_files(&[root.join("base.yml"), root.join("overlays")])?;
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["base.yml", "a.yml", "b.yaml"]);

        assert!(collect_values_files(&[root.join("missing.yml")]).is_err());
        Ok(())
    }
}
