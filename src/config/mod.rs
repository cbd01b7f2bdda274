//! Configuration loading and management for Values Guard
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to clean domain objects
//! - Defaults live here, so a missing file behaves like an empty one
//! - Configuration shapes the rule registry but never the validation algorithm

use crate::domain::violations::{GuardError, GuardResult};
use crate::report::OutputFormat;
use crate::rules::RuleRegistry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File names looked up in the working directory, in order
pub const CONFIG_FILE_NAMES: &[&str] = &["values_guard.yaml", "values_guard.yml", ".values_guard.yaml"];

/// Main configuration structure for Values Guard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Configuration format version
    pub version: String,
    /// Default schema document
    #[serde(default)]
    pub schema: Option<PathBuf>,
    /// Default values documents or directories, applied in order
    #[serde(default)]
    pub values: Vec<PathBuf>,
    /// Report rendering
    #[serde(default)]
    pub report: ReportConfig,
    /// Rule catalog adjustments
    #[serde(default)]
    pub rules: RulesConfig,
}

/// Report rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_true")]
    pub use_colors: bool,
    /// Stop listing violations after this many
    #[serde(default)]
    pub max_violations: Option<usize>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { format: OutputFormat::Human, use_colors: true, max_violations: None }
    }
}

/// Rule catalog configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Built-in rule names removed from the registry
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl GuardConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GuardResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            GuardError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            GuardError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> GuardResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| GuardError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// First configuration file found in `dir`
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES.iter().map(|name| dir.join(name)).find(|path| path.is_file())
    }

    /// Explicit file if given, otherwise a discovered one, otherwise defaults
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> GuardResult<Self> {
        match explicit.map(Path::to_path_buf).or_else(|| Self::discover(dir)) {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::load_from_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> GuardResult<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            return Err(GuardError::config(format!(
                "Unsupported configuration version: {}. Supported versions: 1.0",
                self.version
            )));
        }

        let builtins = RuleRegistry::with_builtins();
        for name in &self.rules.disabled {
            if builtins.definition(name).is_none() {
                return Err(GuardError::config(format!(
                    "Cannot disable unknown rule '{name}'"
                )));
            }
        }

        if self.report.max_violations == Some(0) {
            return Err(GuardError::config("report.max_violations must be at least 1"));
        }

        Ok(())
    }

    /// Built-in registry minus the disabled rules
    pub fn registry(&self) -> RuleRegistry {
        let mut registry = RuleRegistry::with_builtins();
        for name in &self.rules.disabled {
            registry.remove(name);
        }
        registry
    }

    /// Convert to YAML for display
    pub fn to_yaml(&self) -> GuardResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| GuardError::serialization(format!("Failed to serialize config: {e}")))
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            schema: None,
            values: Vec::new(),
            report: ReportConfig::default(),
            rules: RulesConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: GuardConfig,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self { config: GuardConfig::default() }
    }

    pub fn schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.schema = Some(path.into());
        self
    }

    /// Append a values document or directory
    pub fn add_values(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.values.push(path.into());
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.report.format = format;
        self
    }

    pub fn use_colors(mut self, use_colors: bool) -> Self {
        self.config.report.use_colors = use_colors;
        self
    }

    pub fn max_violations(mut self, max: usize) -> Self {
        self.config.report.max_violations = Some(max);
        self
    }

    /// Remove a built-in rule from the catalog
    pub fn disable_rule(mut self, name: impl Into<String>) -> Self {
        self.config.rules.disabled.push(name.into());
        self
    }

    /// Build the final configuration
    pub fn build(self) -> GuardResult<GuardConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_str() {
        let config = GuardConfig::load_from_str(
            r#"
version: "1.0"
schema: schema.yml
values:
  - values.yml
  - overlays/
report:
  format: junit
  max_violations: 10
rules:
  disabled: [pattern]
"#,
        )
        .unwrap();

        assert_eq!(config.schema, Some(PathBuf::from("schema.yml")));
        assert_eq!(config.values.len(), 2);
        assert_eq!(config.report.format, OutputFormat::Junit);
        assert!(config.report.use_colors);
        assert_eq!(config.report.max_violations, Some(10));
        assert!(config.registry().definition("pattern").is_none());
        assert!(config.registry().definition("min_len").is_some());
    }

    #[test]
    fn test_validation_errors() {
        assert!(GuardConfig::load_from_str("version: \"2.0\"").is_err());
        assert!(GuardConfig::load_from_str("version: \"1.0\"\nrules:\n  disabled: [shiny]").is_err());
        assert!(GuardConfig::load_from_str("version: \"1.0\"\nreport:\n  max_violations: 0").is_err());
        assert!(GuardConfig::load_from_str("version: [").is_err());
    }

    #[test]
    fn test_builder() {
        let config = ConfigBuilder::new()
            .schema("schema.yml")
            .add_values("values.yml")
            .format(OutputFormat::GitHub)
            .use_colors(false)
            .disable_rule("one_of")
            .build()
            .unwrap();

        assert_eq!(config.report.format, OutputFormat::GitHub);
        assert!(!config.report.use_colors);
        assert_eq!(config.registry().len(), RuleRegistry::with_builtins().len() - 1);

        assert!(ConfigBuilder::new().disable_rule("shiny").build().is_err());
    }

    #[test]
    fn test_resolve() -> GuardResult<()> {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(GuardConfig::resolve(None, temp_dir.path())?, GuardConfig::default());

        fs::write(
            temp_dir.path().join(".values_guard.yaml"),
            "version: \"1.0\"\nschema: from-dot-file.yml\n",
        )?;
        fs::write(
            temp_dir.path().join("values_guard.yml"),
            "version: \"1.0\"\nschema: from-yml.yml\n",
        )?;
        let config = GuardConfig::resolve(None, temp_dir.path())?;
        assert_eq!(config.schema, Some(PathBuf::from("from-yml.yml")));

        let explicit = temp_dir.path().join("custom.yaml");
        fs::write(&explicit, "version: \"1.0\"\nschema: custom.yml\n")?;
        let config = GuardConfig::resolve(Some(&explicit), temp_dir.path())?;
        assert_eq!(config.schema, Some(PathBuf::from("custom.yml")));
        Ok(())
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = ConfigBuilder::new().schema("schema.yml").build().unwrap();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(GuardConfig::load_from_str(&yaml).unwrap(), config);
    }
}
