//! Summary rendering for stdout

use crate::commands::OutputFormat;
use anyhow::Result;
use serde_json::json;
use shapegate_engine::{InputResult, OverallResult};
use std::fmt::Write as _;

/// Rendered summary plus its structured form
#[derive(Debug, Clone)]
pub struct RenderedSummary {
    pub text: String,
    pub data: serde_json::Value,
}

pub fn render_summary(result: &OverallResult, format: OutputFormat) -> Result<RenderedSummary> {
    let data = summary_json(result)?;
    let text = match format {
        OutputFormat::Text => summary_text(result),
        OutputFormat::Json => serde_json::to_string_pretty(&data)?,
    };
    Ok(RenderedSummary { text, data })
}

fn status(input: &InputResult) -> &'static str {
    match input.report() {
        _ if input.is_failed() => "failed",
        Some(report) if report.conforms => "conforms",
        _ => "does_not_conform",
    }
}

fn summary_json(result: &OverallResult) -> Result<serde_json::Value> {
    let inputs = result
        .inputs
        .iter()
        .map(|input| -> Result<serde_json::Value> {
            let report = input.report().map(|r| r.to_json()).transpose()?;
            Ok(json!({
                "path": input.path.display().to_string(),
                "status": status(input),
                "report": report,
                "report_file": input.report_file.as_ref().map(|p| p.display().to_string()),
                "error": input.error(),
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({
        "outcome": result.outcome,
        "exit_code": result.exit_code(),
        "inputs": inputs,
        "summary": result.stats,
        "error": result.error,
    }))
}

fn summary_text(result: &OverallResult) -> String {
    let mut out = String::new();

    for input in &result.inputs {
        let path = input.path.display();
        match input.report() {
            Some(report) => {
                let verdict = if report.conforms { "CONFORMS" } else { "DOES NOT CONFORM" };
                let _ = writeln!(
                    out,
                    "{}: {} ({} violations, {} warnings, {} infos)",
                    path,
                    verdict,
                    report.violation_count(),
                    report.warning_count(),
                    report.info_count()
                );
                for violation in &report.violations {
                    let _ = write!(out, "  [{}] {}", violation.severity, violation.focus);
                    if let Some(p) = &violation.path {
                        let _ = write!(out, " {}", p);
                    }
                    if let Some(v) = &violation.value {
                        let _ = write!(out, " = {}", v);
                    }
                    let _ = writeln!(out, " ({}): {}", violation.constraint, violation.message);
                }
                if report.truncated {
                    let _ = writeln!(out, "  ... more violations not recorded");
                }
                if let Some(error) = &input.report_error {
                    let _ = writeln!(out, "  report file not written: {}", error);
                }
            }
            None => {
                let _ = writeln!(out, "{}: FAILED - {}", path, input.error().unwrap_or_default());
            }
        }
    }

    let stats = &result.stats;
    let _ = write!(
        out,
        "Summary: {} inputs, {} conformant, {} non-conformant, {} failed; {} violations, {} warnings, {} infos ({} ms)",
        stats.inputs,
        stats.conformant,
        stats.non_conformant,
        stats.failed,
        stats.violations,
        stats.warnings,
        stats.infos,
        stats.execution_time_ms
    );
    out
}
