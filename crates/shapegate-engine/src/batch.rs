//! Batch orchestration
//!
//! Every input gets exactly one [`InputResult`] slot. Inputs run through a
//! bounded, order-preserving stream: graph loading is async, validation runs
//! on the blocking pool against the shared rule set.

use crate::config::{BatchConfig, ReportFormat, ReportOutput};
use crate::discovery::discover_inputs;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use shapegate_core::{GraphLoadError, GraphLoader, RdfGraphLoader};
use shapegate_shacl::{CompiledRuleSet, DefaultShapeValidator, ShapeValidator, ValidationReport};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What to validate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchInput {
    Files(Vec<PathBuf>),
    Directory(PathBuf),
}

/// Overall classification of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every input loaded and conforms
    Success,
    /// Every input loaded, at least one does not conform
    ValidationError,
    /// The request itself was invalid
    UsageError,
    /// At least one input could not be read or parsed
    FileError,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::ValidationError => 1,
            Outcome::UsageError => 2,
            Outcome::FileError => 3,
        }
    }
}

/// Result slot of one input
#[derive(Debug, Clone)]
pub enum InputOutcome {
    Validated(ValidationReport),
    LoadFailed(GraphLoadError),
    /// Validation task did not complete
    Aborted(String),
}

#[derive(Debug, Clone)]
pub struct InputResult {
    pub path: PathBuf,
    pub outcome: InputOutcome,
    /// Report file written for this input
    pub report_file: Option<PathBuf>,
    /// Report file requested but not written
    pub report_error: Option<String>,
}

impl InputResult {
    pub fn report(&self) -> Option<&ValidationReport> {
        match &self.outcome {
            InputOutcome::Validated(report) => Some(report),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        !matches!(self.outcome, InputOutcome::Validated(_)) || self.report_error.is_some()
    }

    /// Failure description, if any
    pub fn error(&self) -> Option<String> {
        match &self.outcome {
            InputOutcome::LoadFailed(e) => Some(e.to_string()),
            InputOutcome::Aborted(reason) => Some(reason.clone()),
            InputOutcome::Validated(_) => self.report_error.clone(),
        }
    }
}

/// Aggregate counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub inputs: usize,
    pub conformant: usize,
    pub non_conformant: usize,
    pub failed: usize,
    pub violations: usize,
    pub warnings: usize,
    pub infos: usize,
    pub execution_time_ms: u64,
}

impl BatchStats {
    fn collect(results: &[InputResult]) -> Self {
        let mut stats = BatchStats {
            inputs: results.len(),
            ..Default::default()
        };
        for result in results {
            if let Some(report) = result.report() {
                if report.conforms {
                    stats.conformant += 1;
                } else {
                    stats.non_conformant += 1;
                }
                stats.violations += report.violation_count();
                stats.warnings += report.warning_count();
                stats.infos += report.info_count();
            }
            if result.is_failed() {
                stats.failed += 1;
            }
        }
        stats
    }
}

/// Result of a whole run
#[derive(Debug, Clone)]
pub struct OverallResult {
    pub outcome: Outcome,
    pub inputs: Vec<InputResult>,
    pub stats: BatchStats,
    /// Why the run stopped before validating anything
    pub error: Option<String>,
}

impl OverallResult {
    fn aborted(outcome: Outcome, error: String) -> Self {
        warn!(error = %error, "batch aborted");
        Self {
            outcome,
            inputs: Vec::new(),
            stats: BatchStats::default(),
            error: Some(error),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

/// Validates a batch of inputs against one compiled rule set
pub struct BatchValidator {
    loader: Arc<dyn GraphLoader>,
    validator: Arc<dyn ShapeValidator>,
    config: BatchConfig,
}

impl BatchValidator {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            loader: Arc::new(RdfGraphLoader),
            validator: Arc::new(DefaultShapeValidator::with_limits(config.limits)),
            config,
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn GraphLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ShapeValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub async fn run(&self, input: BatchInput, rules: Arc<CompiledRuleSet>) -> OverallResult {
        let start_time = std::time::Instant::now();

        let paths = match input {
            BatchInput::Files(files) if files.is_empty() => {
                return OverallResult::aborted(Outcome::UsageError, "no input files given".to_string());
            }
            BatchInput::Files(files) => files,
            BatchInput::Directory(dir) => match discover_inputs(&dir).await {
                Ok(paths) => paths,
                Err(e) => return OverallResult::aborted(Outcome::FileError, e.to_string()),
            },
        };

        let workers = self.config.workers.max(1);
        info!(inputs = paths.len(), workers, "batch started");

        let targets: Vec<Option<PathBuf>> = match &self.config.report_output {
            Some(output) => report_file_paths(&paths, output).into_iter().map(Some).collect(),
            None => vec![None; paths.len()],
        };

        let inputs: Vec<InputResult> = stream::iter(paths.into_iter().zip(targets))
            .map(|(path, target)| self.validate_input(path, target, Arc::clone(&rules)))
            .buffered(workers)
            .collect()
            .await;

        let mut stats = BatchStats::collect(&inputs);
        stats.execution_time_ms = start_time.elapsed().as_millis() as u64;

        let outcome = if stats.failed > 0 {
            Outcome::FileError
        } else if stats.non_conformant > 0 {
            Outcome::ValidationError
        } else {
            Outcome::Success
        };

        info!(
            outcome = ?outcome,
            conformant = stats.conformant,
            non_conformant = stats.non_conformant,
            failed = stats.failed,
            elapsed_ms = stats.execution_time_ms,
            "batch finished"
        );

        OverallResult {
            outcome,
            inputs,
            stats,
            error: None,
        }
    }

    async fn validate_input(
        &self,
        path: PathBuf,
        report_target: Option<PathBuf>,
        rules: Arc<CompiledRuleSet>,
    ) -> InputResult {
        debug!(path = %path.display(), "validating input");

        let graph = match self.loader.load(&path).await {
            Ok(graph) => graph,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "input failed to load");
                return InputResult {
                    path,
                    outcome: InputOutcome::LoadFailed(e),
                    report_file: None,
                    report_error: None,
                };
            }
        };

        let validator = Arc::clone(&self.validator);
        let outcome = match tokio::task::spawn_blocking(move || validator.validate(&graph, &rules)).await {
            Ok(report) => InputOutcome::Validated(report),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "validation task failed");
                InputOutcome::Aborted(format!("validation task failed: {}", e))
            }
        };

        let mut result = InputResult {
            path,
            outcome,
            report_file: None,
            report_error: None,
        };

        let output = self.config.report_output.as_ref();
        if let (Some(output), Some(target), Some(report)) = (output, report_target, result.report()) {
            match write_report_file(target, report, output.format).await {
                Ok(file) => result.report_file = Some(file),
                Err(e) => {
                    warn!(path = %result.path.display(), error = %e, "report file not written");
                    result.report_error = Some(e);
                }
            }
        }

        debug!(path = %result.path.display(), failed = result.is_failed(), "input done");
        result
    }
}

/// `<dir>/<stem>-report.<ext>`; `dir` defaults to the input's directory
pub fn report_file_path(input: &Path, output: &ReportOutput) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    let dir = output
        .dir
        .clone()
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{}-report.{}", stem, output.format.extension()))
}

/// Report targets for a whole batch, in input order. A target already taken
/// by an earlier input becomes `<stem>-<n>-report.<ext>` with the smallest
/// free `n` from 2.
pub fn report_file_paths(inputs: &[PathBuf], output: &ReportOutput) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let preferred = report_file_path(input, output);
            if taken.insert(preferred.clone()) {
                return preferred;
            }
            let suffix = format!("-report.{}", output.format.extension());
            let name = preferred.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let stem = name.strip_suffix(&suffix).unwrap_or(&name).to_string();
            let renamed = (2..)
                .map(|n| preferred.with_file_name(format!("{}-{}{}", stem, n, suffix)))
                .find(|candidate| taken.insert(candidate.clone()));
            renamed.unwrap_or(preferred)
        })
        .collect()
}

async fn write_report_file(
    target: PathBuf,
    report: &ValidationReport,
    format: ReportFormat,
) -> Result<PathBuf, String> {
    let body = match format {
        ReportFormat::Text => report.to_simple_string(),
        ReportFormat::Json => serde_json::to_string_pretty(report).map_err(|e| e.to_string())?,
    };
    tokio::fs::write(&target, body)
        .await
        .map_err(|e| format!("cannot write {}: {}", target.display(), e))?;
    Ok(target)
}
