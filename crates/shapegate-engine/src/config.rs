//! Batch configuration

use serde::{Deserialize, Serialize};
use shapegate_shacl::ValidationLimits;
use std::path::PathBuf;

/// Serialization used for per-input report files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

/// Where per-input report files go
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOutput {
    /// `None` writes next to each input
    pub dir: Option<PathBuf>,
    pub format: ReportFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Inputs validated concurrently
    pub workers: usize,
    pub limits: ValidationLimits,
    /// Write `<stem>-report.<ext>` per validated input
    pub report_output: Option<ReportOutput>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            limits: ValidationLimits::default(),
            report_output: None,
        }
    }
}

impl BatchConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_limits(mut self, limits: ValidationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_report_output(mut self, output: ReportOutput) -> Self {
        self.report_output = Some(output);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BatchConfig::default();
        assert!(config.workers >= 1);
        assert_eq!(config.limits.max_violations, None);
        assert!(config.report_output.is_none());
    }

    #[test]
    fn test_zero_workers_is_clamped() {
        assert_eq!(BatchConfig::default().with_workers(0).workers, 1);
    }
}
