//! SHACL サブセットによるスキーマ検証
//!
//! このクレートはルールの読み込みから検証レポートまでを提供します:
//! - ルールソース読み込み (Loader)
//! - プロファイル選択と層の重ね合わせ (Profile)
//! - ルールのコンパイル (Compile)
//! - 制約検証 (Validator)
//! - 検証レポート (Report)

pub mod compile;
pub mod loader;
pub mod model;
pub mod profile;
pub mod report;
pub mod validator;

// Re-exports
pub use compile::{CompiledRuleSet, RequirementGroup, RuleCompiler};
pub use loader::{RuleSource, RuleSourceLoader, TurtleRuleLoader};
pub use model::{
    AllowedValue, ConstraintId, ConstraintKey, ConstraintKind, KindTag, NodeKind, Path,
    RelationDefinition, RuleProfile, Severity, ShapeConstraint, Target, TypeDefinition,
};
pub use profile::{build_rule_set, ProfileCatalog, ProfileSelection};
pub use report::{ValidationReport, Violation};
pub use validator::{DefaultShapeValidator, ShapeValidator, ValidationLimits};

use shapegate_core::Iri;
use std::path::PathBuf;
use thiserror::Error;

/// ルールセットを構築できなかった理由
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule source {source_name} cannot be read: {reason}")]
    SourceUnreadable { source_name: String, reason: String },

    #[error("rule source {source_name} is malformed: {reason}")]
    SourceMalformed { source_name: String, reason: String },

    #[error("cyclic type hierarchy: {}", format_cycle(.cycle))]
    CyclicTypeHierarchy { cycle: Vec<Iri> },

    #[error("cyclic relation hierarchy: {}", format_cycle(.cycle))]
    CyclicRelationHierarchy { cycle: Vec<Iri> },

    #[error("constraint {constraint} targets undeclared {target}")]
    UnknownTarget { constraint: ConstraintId, target: Iri },
}

/// 要求された構成そのものが不正
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no base profile selected")]
    NoProfileSelected,

    #[error("more than one base profile selected: {}", .selected.join(", "))]
    AmbiguousProfileSelection { selected: Vec<String> },

    #[error("unknown profile '{name}' (available: {})", .available.join(", "))]
    UnknownProfile { name: String, available: Vec<String> },

    #[error("the strict sub-variant requires the restricted profile")]
    StrictWithoutRestricted,

    #[error("profile catalog {path} cannot be used: {reason}")]
    CatalogUnreadable { path: PathBuf, reason: String },
}

/// Either failure that stops a rule set from being built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

fn format_cycle(cycle: &[Iri]) -> String {
    use itertools::Itertools;
    cycle.iter().map(|iri| iri.as_str()).join(" -> ")
}
