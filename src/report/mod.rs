//! Report generation with multiple output formats
//!
//! Architecture: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - ValidationReport (domain) is converted to various external representations
//! - The human format reproduces the violation line template character for character
//! - Formatters never reorder or deduplicate what the validator produced

use crate::domain::violations::{GuardError, GuardResult, ValidationReport, ValidationSummary, Violation};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// First line of a non-empty human report
pub const REPORT_HEADER: &str = "One or more data values were invalid:";

/// Supported output formats for validation reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Header plus one line per violation
    #[default]
    Human,
    /// JSON format for programmatic consumption
    Json,
    /// JUnit XML format for CI/CD integration
    Junit,
    /// GitHub Actions format for workflow integration
    GitHub,
}

impl OutputFormat {
    /// Parse format from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            "junit" => Some(Self::Junit),
            "github" => Some(Self::GitHub),
            _ => None,
        }
    }

    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["human", "json", "junit", "github"]
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
    /// Maximum number of violations to include
    pub max_violations: Option<usize>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { use_colors: true, max_violations: None }
    }
}

/// Render the plain violation listing, `None` when every value is valid
pub fn render(report: &ValidationReport) -> Option<String> {
    if report.is_valid() {
        return None;
    }

    let mut output = String::from(REPORT_HEADER);
    output.push('\n');
    for violation in &report.violations {
        output.push_str(&violation.format_display());
        output.push('\n');
    }
    Some(output)
}

#[derive(Clone, Copy)]
enum Tone {
    Failure,
    Success,
    Emphasis,
    Dim,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    valid: bool,
    violations: &'a [Violation],
    omitted: usize,
    summary: &'a ValidationSummary,
    schema_fingerprint: Option<&'a str>,
}

/// Main report formatter that dispatches to specific formatters
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    /// Create a new report formatter with options
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Format a validation report in the specified format
    pub fn format_report(&self, report: &ValidationReport, format: OutputFormat) -> GuardResult<String> {
        let shown = self.limit(&report.violations);
        let omitted = report.violations.len() - shown.len();

        match format {
            OutputFormat::Human => Ok(self.format_human(report, shown, omitted)),
            OutputFormat::Json => self.format_json(report, shown, omitted),
            OutputFormat::Junit => Ok(self.format_junit(report, shown, omitted)),
            OutputFormat::GitHub => Ok(self.format_github(shown)),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
        mut writer: W,
    ) -> GuardResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    fn limit<'a>(&self, violations: &'a [Violation]) -> &'a [Violation] {
        match self.options.max_violations {
            Some(max) if max < violations.len() => &violations[..max],
            _ => violations,
        }
    }

    /// Format report in human-readable format
    fn format_human(&self, report: &ValidationReport, shown: &[Violation], omitted: usize) -> String {
        let mut output = String::new();

        if report.is_valid() {
            output.push_str(&self.paint("All data values are valid", Tone::Success));
            output.push('\n');
        } else {
            output.push_str(&self.paint(REPORT_HEADER, Tone::Failure));
            output.push('\n');
            for violation in shown {
                output.push_str(&self.format_violation(violation));
                output.push('\n');
            }
            if omitted > 0 {
                output.push_str(&self.paint(&format!("... and {omitted} more not shown"), Tone::Dim));
                output.push('\n');
            }
        }

        output.push('\n');
        output.push_str(&self.format_summary(report));
        output
    }

    fn format_violation(&self, violation: &Violation) -> String {
        if !self.options.use_colors {
            return violation.format_display();
        }
        format!(
            "\"{}\" ({}) requires \"{}\"; fail: {} (by {})",
            self.paint(&violation.path.to_string(), Tone::Emphasis),
            violation.violation_location,
            violation.rule_description,
            self.paint(&violation.failure_detail, Tone::Failure),
            self.paint(&violation.declaration_location.to_string(), Tone::Dim)
        )
    }

    /// Format the summary section
    fn format_summary(&self, report: &ValidationReport) -> String {
        let summary = &report.summary;
        let count = report.violations.len();
        let violations = format!("{} violation{}", count, if count == 1 { "" } else { "s" });
        let tone = if count == 0 { Tone::Success } else { Tone::Failure };

        format!(
            "Summary: {}, {} nodes visited, {} rules evaluated, {} skipped ({:.1}s)\n",
            self.paint(&violations, tone),
            summary.nodes_visited,
            summary.rules_evaluated,
            summary.rules_skipped,
            summary.execution_time_ms as f64 / 1000.0
        )
    }

    /// Format report in JSON format
    fn format_json(&self, report: &ValidationReport, shown: &[Violation], omitted: usize) -> GuardResult<String> {
        let json_report = JsonReport {
            valid: report.is_valid(),
            violations: shown,
            omitted,
            summary: &report.summary,
            schema_fingerprint: report.schema_fingerprint.as_deref(),
        };

        serde_json::to_string_pretty(&json_report)
            .map_err(|e| GuardError::serialization(format!("JSON serialization failed: {e}")))
    }

    /// Format report in JUnit XML format
    fn format_junit(&self, report: &ValidationReport, shown: &[Violation], omitted: usize) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let execution_time = (report.summary.execution_time_ms as f64) / 1000.0;
        let failures = shown.len() + usize::from(omitted > 0);
        xml.push_str(&format!(
            "<testsuite name=\"values-guard\" tests=\"{}\" failures=\"{}\" errors=\"0\" time=\"{:.3}\">\n",
            failures.max(1),
            failures,
            execution_time
        ));

        if report.is_valid() {
            xml.push_str("  <testcase classname=\"values-guard\" name=\"data values\"/>\n");
        }

        for violation in shown {
            xml.push_str(&format!(
                "  <testcase classname=\"{}\" name=\"{}\">\n",
                escape_xml(violation.rule_name.as_deref().unwrap_or("custom")),
                escape_xml(&violation.path.to_string())
            ));
            xml.push_str(&format!(
                "    <failure message=\"{}\">{}</failure>\n",
                escape_xml(&violation.rule_description),
                escape_xml(&violation.format_display())
            ));
            xml.push_str("  </testcase>\n");
        }

        if omitted > 0 {
            xml.push_str("  <testcase classname=\"values-guard\" name=\"omitted\">\n");
            xml.push_str(&format!(
                "    <failure message=\"{omitted} more violations not shown\"/>\n"
            ));
            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    /// Format report for GitHub Actions
    fn format_github(&self, shown: &[Violation]) -> String {
        let mut output = String::new();

        for violation in shown {
            let location = &violation.violation_location;
            let mut properties = Vec::new();
            if location.is_known() {
                properties.push(format!("file={}", escape_property(&location.file)));
            }
            if let Some(line) = location.line {
                properties.push(format!("line={line}"));
            }
            properties.push(format!(
                "title={}",
                escape_property(&format!("requires {}", violation.rule_description))
            ));

            output.push_str(&format!(
                "::error {}::{}\n",
                properties.join(","),
                escape_data(&violation.format_display())
            ));
        }

        output
    }

    #[cfg(feature = "cli")]
    fn paint(&self, text: &str, tone: Tone) -> String {
        use colored::Colorize;

        if !self.options.use_colors {
            return text.to_string();
        }
        match tone {
            Tone::Failure => text.red().bold().to_string(),
            Tone::Success => text.green().to_string(),
            Tone::Emphasis => text.yellow().to_string(),
            Tone::Dim => text.dimmed().to_string(),
        }
    }

    #[cfg(not(feature = "cli"))]
    fn paint(&self, text: &str, _tone: Tone) -> String {
        text.to_string()
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape a workflow command message
fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

/// Escape a workflow command property value
fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::values::{SourceLocation, ValuePath};
    use serde_json::Value as JsonValue;

    fn create_test_report() -> ValidationReport {
        let mut report = ValidationReport::new();

        report.add_violation(
            Violation::new(
                ValuePath::from_keys("namespace"),
                SourceLocation::new("schema.yml", 2),
                SourceLocation::new("schema.yml", 4),
                "length greater or equal to 1",
                "length of 0 is less than 1",
            )
            .with_rule_name("min_len"),
        );
        report.add_violation(
            Violation::new(
                ValuePath::from_keys("username"),
                SourceLocation::new("values.yml", 7),
                SourceLocation::new("schema.yml", 9),
                "not 'default'",
                "not 'default'",
            ),
        );

        report.set_execution_time(1200);
        report
    }

    fn plain() -> ReportFormatter {
        ReportFormatter::new(ReportOptions { use_colors: false, ..Default::default() })
    }

    #[test]
    fn test_render() {
        let report = create_test_report();
        assert_eq!(
            render(&report).unwrap(),
            "One or more data values were invalid:\n\
             \"namespace\" (schema.yml:2) requires \"length greater or equal to 1\"; fail: length of 0 is less than 1 (by schema.yml:4)\n\
             \"username\" (values.yml:7) requires \"not 'default'\"; fail: not 'default' (by schema.yml:9)\n"
        );
        assert!(render(&ValidationReport::new()).is_none());
    }

    #[test]
    fn test_human_format() {
        let report = create_test_report();
        let output = plain().format_report(&report, OutputFormat::Human).unwrap();

        let rendered = render(&report).unwrap();
        assert!(output.starts_with(&rendered));
        assert!(output.contains("Summary: 2 violations"));
    }

    #[test]
    fn test_max_violations() {
        let formatter = ReportFormatter::new(ReportOptions { use_colors: false, max_violations: Some(1) });
        let report = create_test_report();

        let output = formatter.format_report(&report, OutputFormat::Human).unwrap();
        assert!(output.contains("\"namespace\""));
        assert!(!output.contains("\"username\""));
        assert!(output.contains("... and 1 more not shown"));

        let json: JsonValue =
            serde_json::from_str(&formatter.format_report(&report, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["violations"].as_array().unwrap().len(), 1);
        assert_eq!(json["omitted"], 1);
    }

    #[test]
    fn test_nothing_shown_is_still_invalid() {
        let formatter = ReportFormatter::new(ReportOptions { use_colors: false, max_violations: Some(0) });
        let report = create_test_report();

        let output = formatter.format_report(&report, OutputFormat::Human).unwrap();
        assert!(output.starts_with("One or more data values were invalid:\n... and 2 more not shown\n"));
        assert!(!output.contains("All data values are valid"));

        let junit = formatter.format_report(&report, OutputFormat::Junit).unwrap();
        assert!(junit.contains("tests=\"1\" failures=\"1\""));
        assert!(junit.contains("<failure message=\"2 more violations not shown\"/>"));
        assert!(!junit.contains("name=\"data values\""));
    }

    #[test]
    fn test_json_format() {
        let mut report = create_test_report();
        report.set_schema_fingerprint("abc123");
        let output = plain().format_report(&report, OutputFormat::Json).unwrap();

        let json: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["violations"][0]["path"], "namespace");
        assert_eq!(json["violations"][0]["rule_name"], "min_len");
        assert_eq!(json["violations"][1]["rule_name"], JsonValue::Null);
        assert_eq!(json["summary"]["execution_time_ms"], 1200);
        assert_eq!(json["schema_fingerprint"], "abc123");
    }

    #[test]
    fn test_junit_format() {
        let output = plain().format_report(&create_test_report(), OutputFormat::Junit).unwrap();

        assert!(output.contains("<?xml version=\"1.0\""));
        assert!(output.contains("<testsuite name=\"values-guard\" tests=\"2\" failures=\"2\""));
        assert!(output.contains("classname=\"min_len\" name=\"namespace\""));
        assert!(output.contains("classname=\"custom\" name=\"username\""));
        assert!(output.contains("requires &quot;not &#39;default&#39;&quot;"));
    }

    #[test]
    fn test_github_format() {
        let output = plain().format_report(&create_test_report(), OutputFormat::GitHub).unwrap();

        let first = output.lines().next().unwrap();
        assert!(first.starts_with("::error file=schema.yml,line=2,title=requires length greater or equal to 1::"));
        assert!(first.ends_with("(by schema.yml:4)"));
        assert_eq!(output.lines().count(), 2);
    }

    #[test]
    fn test_empty_report() {
        let report = ValidationReport::new();
        let output = plain().format_report(&report, OutputFormat::Human).unwrap();
        assert!(output.starts_with("All data values are valid\n"));
        assert!(output.contains("Summary: 0 violations"));

        let junit = plain().format_report(&report, OutputFormat::Junit).unwrap();
        assert!(junit.contains("failures=\"0\""));
        assert!(plain().format_report(&report, OutputFormat::GitHub).unwrap().is_empty());
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("GitHub"), Some(OutputFormat::GitHub));
        assert_eq!(OutputFormat::parse("sarif"), None);
        for name in OutputFormat::all_formats() {
            assert!(OutputFormat::parse(name).is_some());
        }
    }
}
