//! Values Guard CLI - Command-line interface for data values validation
//!
//! Architecture: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to loader, validator and formatter calls
//! - Handles external concerns like process exit codes and terminal output
//! - Exit code 0 means valid, 1 means violations, 2 means the run itself failed

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use values_guard::{
    GuardConfig, GuardError, GuardResult, OutputFormat, ReportFormatter, ReportOptions, SchemaChildren,
    ValuesGuard,
};

/// Values Guard - Validate configuration data values against a schema
#[derive(Parser)]
#[command(name = "values-guard")]
#[command(version)]
#[command(about = "Validate merged configuration data values against the rules declared in a schema")]
#[command(long_about = "Values Guard merges values documents onto schema defaults, evaluates every declared rule and reports each failing value together with where it was set and where the rule was declared.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge values documents onto the schema defaults and validate the result
    Check {
        /// Schema document
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Values documents or directories, applied in order
        #[arg(long = "values", action = clap::ArgAction::Append)]
        values: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormatArg>,

        /// Maximum number of violations to report
        #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        max_violations: Option<usize>,
    },

    /// Build a schema document and report authoring defects
    ValidateSchema {
        /// Schema document to validate
        schema: PathBuf,
    },

    /// List the available named rules
    Rules,

    /// Explain what a specific rule does
    Explain {
        /// Rule name to explain
        rule: String,
    },
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Human,
    Json,
    Junit,
    Github,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Junit => OutputFormat::Junit,
            OutputFormatArg::Github => OutputFormat::GitHub,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run_command(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    }
}

fn run_command(cli: Cli) -> GuardResult<i32> {
    match cli.command {
        Commands::Check { schema, values, format, max_violations } => run_check(
            cli.config.as_deref(),
            schema,
            values,
            format,
            max_violations,
            !cli.no_color,
        ),
        Commands::ValidateSchema { schema } => run_validate_schema(cli.config.as_deref(), &schema),
        Commands::Rules => run_list_rules(cli.config.as_deref()),
        Commands::Explain { rule } => run_explain(cli.config.as_deref(), &rule),
    }
}

fn load_config(config_path: Option<&Path>) -> GuardResult<GuardConfig> {
    GuardConfig::resolve(config_path, Path::new("."))
}

fn run_check(
    config_path: Option<&Path>,
    schema: Option<PathBuf>,
    values: Vec<PathBuf>,
    format: Option<OutputFormatArg>,
    max_violations: Option<usize>,
    use_colors: bool,
) -> GuardResult<i32> {
    if max_violations == Some(0) {
        return Err(GuardError::config("max_violations must be at least 1"));
    }
    let config = load_config(config_path)?;

    let schema = schema.or_else(|| config.schema.clone()).ok_or_else(|| {
        GuardError::config("No schema document given; pass --schema or set 'schema' in the configuration")
    })?;
    let values = if values.is_empty() { config.values.clone() } else { values };
    let format = format.map(OutputFormat::from).unwrap_or(config.report.format);

    let report_options = ReportOptions {
        use_colors: use_colors && config.report.use_colors,
        max_violations: max_violations.or(config.report.max_violations),
    };
    let guard = ValuesGuard::new_with_config(&config)?.with_report_formatter(ReportFormatter::new(report_options));

    let report = guard.check_files(&schema, &values)?;
    print!("{}", guard.format_report(&report, format)?);

    if report.is_valid() {
        Ok(0)
    } else {
        Ok(1)
    }
}

fn run_validate_schema(config_path: Option<&Path>, schema: &Path) -> GuardResult<i32> {
    let config = load_config(config_path)?;
    let guard = ValuesGuard::new_with_config(&config)?;

    println!("Validating schema: {}", schema.display());

    match guard.load_schema(schema) {
        Ok(document) => {
            let tree = document.schema();
            let nodes = tree.walk();
            let nullable = nodes.iter().filter(|n| n.is_nullable()).count();
            let arrays =
                nodes.iter().filter(|n| matches!(n.children(), SchemaChildren::Array(_))).count();

            println!("Schema is valid");
            println!("Schema summary:");
            println!("  Declarations: {} ({} nullable, {} arrays)", nodes.len() - 1, nullable, arrays);
            println!("  Rules: {}", tree.rule_count());
            println!("  Fingerprint: {}", tree.fingerprint());

            let descriptions = document.root().descriptions();
            if !descriptions.is_empty() {
                println!("Documented declarations:");
                for (path, description) in descriptions {
                    println!("  {path}: {description}");
                }
            }
            Ok(0)
        }
        Err(e) => {
            eprintln!("Schema validation failed: {e}");
            Ok(2)
        }
    }
}

fn run_explain(config_path: Option<&Path>, rule: &str) -> GuardResult<i32> {
    let registry = load_config(config_path)?.registry();

    let Some(definition) = registry.definition(rule) else {
        eprintln!("Rule '{rule}' not found");
        println!();
        println!("Available rules:");
        for definition in registry.definitions() {
            println!("  - {}", definition.name);
        }
        return Ok(1);
    };

    println!("Rule: {}", definition.name);
    println!("Parameter: {} ({})", definition.parameter, definition.parameter_shape);
    println!("Applies to: {}", definition.applies_to);
    println!();
    println!("Requires:");
    println!("   {}", definition.description_template);
    println!();
    println!("Fails with:");
    println!("   {}", definition.failure_template);
    println!();
    println!("Example:");
    println!("   validations:");
    println!("     - {}: <{}>", definition.name, definition.parameter_shape);

    Ok(0)
}

fn run_list_rules(config_path: Option<&Path>) -> GuardResult<i32> {
    let registry = load_config(config_path)?.registry();

    println!("Available Rules\n");
    for definition in registry.definitions() {
        println!(
            "  {} <{}> [{}] - requires {}",
            definition.name, definition.parameter, definition.applies_to, definition.description_template
        );
    }

    Ok(0)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
