//! 検証レポート

use crate::model::{ConstraintId, Severity};
use serde::Serialize;
use shapegate_core::NodeId;

/// Outcome of validating one graph. Violations keep evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// No record of `Violation` severity
    pub conforms: bool,
    pub violations: Vec<Violation>,
    /// The violation limit was hit; more records exist
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

/// One failed check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub focus: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub constraint: ConstraintId,
    pub severity: Severity,
    pub message: String,
}

impl ValidationReport {
    pub fn new(violations: Vec<Violation>, truncated: bool) -> Self {
        let conforms = !violations.iter().any(|v| v.severity == Severity::Violation);
        Self {
            conforms,
            violations,
            truncated,
        }
    }

    /// Report whose records may be a truncated prefix; `conforms` covers
    /// the records that were dropped as well.
    pub fn with_conformance(violations: Vec<Violation>, truncated: bool, conforms: bool) -> Self {
        let conforms = conforms && !violations.iter().any(|v| v.severity == Severity::Violation);
        Self {
            conforms,
            violations,
            truncated,
        }
    }

    /// Conforming report with no records
    pub fn empty() -> Self {
        Self::new(Vec::new(), false)
    }

    /// JSON 形式でシリアライズ
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// 人間可読形式で出力
    pub fn to_simple_string(&self) -> String {
        let mut output = format!(
            "Validation Report: {}\n",
            if self.conforms { "CONFORMS" } else { "DOES NOT CONFORM" }
        );

        for (i, violation) in self.violations.iter().enumerate() {
            output.push_str(&format!("{} {}: {}\n", violation.severity, i + 1, violation.message));
            output.push_str(&format!("  Focus Node: {}\n", violation.focus));
            if let Some(path) = &violation.path {
                output.push_str(&format!("  Path: {}\n", path));
            }
            if let Some(value) = &violation.value {
                output.push_str(&format!("  Value: {}\n", value));
            }
            output.push_str(&format!("  Constraint: {}\n", violation.constraint));
        }

        if self.truncated {
            output.push_str("(violation limit reached, report truncated)\n");
        }
        output
    }

    /// 違反の数を取得
    pub fn violation_count(&self) -> usize {
        self.count(Severity::Violation)
    }

    /// 警告の数を取得
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// 情報メッセージの数を取得
    pub fn info_count(&self) -> usize {
        self.count(Severity::Info)
    }

    fn count(&self, severity: Severity) -> usize {
        self.violations.iter().filter(|v| v.severity == severity).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{KindTag, Path};
    use shapegate_core::Iri;

    fn record(severity: Severity) -> Violation {
        let path = Path::Forward(Iri::parse("http://example.org/name").unwrap());
        Violation {
            focus: NodeId::iri("http://example.org/alice"),
            path: Some(path.to_string()),
            value: None,
            constraint: ConstraintId::for_shape("http://example.org/PersonShape", Some(&path), KindTag::MinCount),
            severity,
            message: "expected at least 1 value, found 0".to_string(),
        }
    }

    #[test]
    fn test_warnings_do_not_break_conformance() {
        let report = ValidationReport::new(vec![record(Severity::Warning), record(Severity::Info)], false);
        assert!(report.conforms);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.info_count(), 1);

        let report = ValidationReport::new(vec![record(Severity::Violation)], false);
        assert!(!report.conforms);
        assert_eq!(report.violation_count(), 1);
    }

    #[test]
    fn test_truncated_report_keeps_dropped_conformance() {
        let report = ValidationReport::with_conformance(vec![record(Severity::Warning)], true, false);
        assert!(!report.conforms);
        assert_eq!(report.violation_count(), 0);

        let report = ValidationReport::with_conformance(vec![record(Severity::Violation)], false, true);
        assert!(!report.conforms);
    }

    #[test]
    fn test_simple_string() {
        let text = ValidationReport::new(vec![record(Severity::Violation)], true).to_simple_string();
        assert!(text.starts_with("Validation Report: DOES NOT CONFORM"));
        assert!(text.contains("Violation 1: expected at least 1 value"));
        assert!(text.contains("Focus Node: <http://example.org/alice>"));
        assert!(text.contains("truncated"));
    }

    #[test]
    fn test_json_shape() {
        let json = ValidationReport::new(vec![record(Severity::Violation)], false)
            .to_json()
            .unwrap();
        assert_eq!(json["conforms"], false);
        assert!(json.get("truncated").is_none());
        assert_eq!(json["violations"][0]["severity"], "violation");
        assert_eq!(
            json["violations"][0]["constraint"],
            "http://example.org/PersonShape[http://example.org/name]/minCount"
        );
        assert!(json["violations"][0].get("value").is_none());
    }
}
