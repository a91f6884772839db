//! CLI definition and execution

use crate::render::render_summary;
use anyhow::Result;
use clap::Parser;
use shapegate_engine::{BatchConfig, BatchInput, BatchValidator, Outcome, ReportFormat, ReportOutput};
use shapegate_shacl::{
    build_rule_set, BuildError, ProfileCatalog, ProfileSelection, RuleSourceLoader, TurtleRuleLoader,
    ValidationLimits,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Main CLI structure
#[derive(Parser, Debug)]
#[command(name = "shapegate")]
#[command(about = "Validate knowledge graphs against layered schema profiles")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Validate against the LDC base profile
    #[arg(long)]
    pub ldc: bool,

    /// Validate against the program base profile
    #[arg(long)]
    pub program: bool,

    /// Validate against custom rule sources instead of a built-in profile
    #[arg(long, value_name = "FILE", num_args = 1..)]
    pub ont: Vec<PathBuf>,

    /// Base profile by catalog name
    #[arg(long, value_name = "NAME")]
    pub profile: Vec<String>,

    /// Add the restricted profile layer
    #[arg(long)]
    pub nist: bool,

    /// Add the strict sub-variant of the restricted layer
    #[arg(long = "nist-ta3")]
    pub nist_ta3: bool,

    /// Graph files to validate
    #[arg(short, long, value_name = "FILE", num_args = 1.., conflicts_with = "directory")]
    pub files: Vec<PathBuf>,

    /// Validate every graph file in a directory
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// JSON profile catalog replacing the built-in one
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Inputs validated concurrently
    #[arg(short, long, value_name = "N")]
    pub threads: Option<usize>,

    /// Write a report file next to each input
    #[arg(short, long)]
    pub output: bool,

    /// Write report files into this directory
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Stop recording violations per input after N
    #[arg(long, value_name = "N")]
    pub max_violations: Option<usize>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Requested profiles as given on the command line
    pub fn profile_selection(&self) -> ProfileSelection {
        let mut base = Vec::new();
        if self.ldc {
            base.push("ldc".to_string());
        }
        if self.program {
            base.push("program".to_string());
        }
        base.extend(self.profile.iter().cloned());

        ProfileSelection {
            base,
            custom: self.ont.clone(),
            restricted: self.nist,
            restricted_strict: self.nist_ta3,
        }
    }

    pub fn batch_input(&self) -> BatchInput {
        match &self.directory {
            Some(dir) => BatchInput::Directory(dir.clone()),
            None => BatchInput::Files(self.files.clone()),
        }
    }

    pub fn batch_config(&self) -> BatchConfig {
        let mut config = BatchConfig::default().with_limits(ValidationLimits {
            max_violations: self.max_violations,
        });
        if let Some(threads) = self.threads {
            config = config.with_workers(threads);
        }
        if self.output || self.report_dir.is_some() {
            config = config.with_report_output(ReportOutput {
                dir: self.report_dir.clone(),
                format: self.format.into(),
            });
        }
        config
    }

    /// Filter used when `RUST_LOG` is unset
    pub fn default_log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

/// Command execution result
#[derive(Debug)]
pub struct CommandResult {
    pub exit_code: i32,
    /// Rendered summary for stdout
    pub output: String,
    /// Message for stderr
    pub error: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl CommandResult {
    fn failed(outcome: Outcome, message: String) -> Self {
        Self {
            exit_code: outcome.exit_code(),
            output: String::new(),
            error: Some(message),
            data: None,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Outcome::Success.exit_code()
    }
}

/// Execute CLI commands
pub struct CommandExecutor {
    rule_loader: Box<dyn RuleSourceLoader>,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self {
            rule_loader: Box::new(TurtleRuleLoader),
        }
    }

    pub fn with_rule_loader(rule_loader: Box<dyn RuleSourceLoader>) -> Self {
        Self { rule_loader }
    }

    /// Build the rule set once, then validate every input against it
    pub async fn execute(&self, cli: &Cli) -> Result<CommandResult> {
        let input = cli.batch_input();
        // 入力なしはルールを読む前に使用法エラー
        if matches!(&input, BatchInput::Files(files) if files.is_empty()) {
            return Ok(CommandResult::failed(Outcome::UsageError, "no input files given".to_string()));
        }

        let catalog = match &cli.catalog {
            Some(path) => match ProfileCatalog::from_file(path) {
                Ok(catalog) => catalog,
                Err(e) => return Ok(CommandResult::failed(Outcome::UsageError, e.to_string())),
            },
            None => ProfileCatalog::builtin(),
        };

        let rules = match build_rule_set(&cli.profile_selection(), &catalog, self.rule_loader.as_ref()) {
            Ok(rules) => Arc::new(rules),
            Err(BuildError::Config(e)) => {
                return Ok(CommandResult::failed(Outcome::UsageError, e.to_string()))
            }
            Err(BuildError::Rule(e)) => {
                return Ok(CommandResult::failed(Outcome::FileError, e.to_string()))
            }
        };
        info!(
            constraints = rules.constraints().len(),
            types = rules.type_count(),
            relations = rules.relation_count(),
            "rule set ready"
        );

        let validator = BatchValidator::new(cli.batch_config());
        let result = validator.run(input, rules).await;

        let rendered = render_summary(&result, cli.format)?;
        Ok(CommandResult {
            exit_code: result.exit_code(),
            output: rendered.text,
            error: result.error.clone(),
            data: Some(rendered.data),
        })
    }
}
