//! プロファイル選択と層の重ね合わせ
//!
//! A run validates against exactly one base profile (a named catalog entry or
//! a list of custom sources), optionally layered with the restricted profile
//! and its strict sub-variant. Selection is checked before any graph is read.

use crate::compile::{CompiledRuleSet, RuleCompiler};
use crate::loader::{RuleSource, RuleSourceLoader};
use crate::{BuildError, ConfigError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const INTERCHANGE_ONTOLOGY: &str = include_str!("../resources/interchange-ontology.ttl");
const INTERCHANGE_SHAPES: &str = include_str!("../resources/interchange-shapes.ttl");
const LDC_ONTOLOGY: &str = include_str!("../resources/ldc-ontology.ttl");
const PROGRAM_ONTOLOGY: &str = include_str!("../resources/program-ontology.ttl");
const NIST_RESTRICTED: &str = include_str!("../resources/nist-restricted.ttl");
const NIST_TA3: &str = include_str!("../resources/nist-ta3.ttl");

/// Requested profiles for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSelection {
    /// Named base profiles from the catalog
    pub base: Vec<String>,
    /// Custom rule sources standing in for a base profile
    pub custom: Vec<PathBuf>,
    pub restricted: bool,
    pub restricted_strict: bool,
}

impl ProfileSelection {
    pub fn base(name: impl Into<String>) -> Self {
        Self {
            base: vec![name.into()],
            ..Self::default()
        }
    }

    pub fn custom(sources: Vec<PathBuf>) -> Self {
        Self {
            custom: sources,
            ..Self::default()
        }
    }

    pub fn with_restricted(mut self) -> Self {
        self.restricted = true;
        self
    }

    pub fn with_restricted_strict(mut self) -> Self {
        self.restricted_strict = true;
        self
    }

    /// Rule sources in layering order: base, restricted, restricted-strict
    pub fn resolve(&self, catalog: &ProfileCatalog) -> Result<Vec<RuleSource>, ConfigError> {
        let mut selected: Vec<String> = self.base.clone();
        if !self.custom.is_empty() {
            selected.extend(self.custom.iter().map(|p| p.display().to_string()));
        }

        let base_count = self.base.len() + usize::from(!self.custom.is_empty());
        match base_count {
            0 => return Err(ConfigError::NoProfileSelected),
            1 => {}
            _ => return Err(ConfigError::AmbiguousProfileSelection { selected }),
        }
        if self.restricted_strict && !self.restricted {
            return Err(ConfigError::StrictWithoutRestricted);
        }

        let mut sources = match self.base.first() {
            Some(name) => catalog
                .base
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownProfile {
                    name: name.clone(),
                    available: catalog.base_names(),
                })?,
            None => self.custom.iter().cloned().map(RuleSource::Path).collect(),
        };

        if self.restricted {
            sources.extend(catalog.restricted.iter().cloned());
        }
        if self.restricted_strict {
            sources.extend(catalog.restricted_strict.iter().cloned());
        }

        debug!(sources = ?sources.iter().map(RuleSource::name).collect::<Vec<_>>(), "profiles resolved");
        Ok(sources)
    }
}

/// Named base profiles plus the restricted layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCatalog {
    base: BTreeMap<String, Vec<RuleSource>>,
    restricted: Vec<RuleSource>,
    restricted_strict: Vec<RuleSource>,
}

/// On-disk catalog layout. Relative paths are resolved against the
/// catalog file's directory.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    base: BTreeMap<String, Vec<PathBuf>>,
    #[serde(default)]
    restricted: Vec<PathBuf>,
    #[serde(default)]
    restricted_strict: Vec<PathBuf>,
}

impl ProfileCatalog {
    /// Catalog compiled into the binary
    pub fn builtin() -> Self {
        let shared = || {
            vec![
                RuleSource::embedded("builtin:interchange-ontology.ttl", INTERCHANGE_ONTOLOGY),
                RuleSource::embedded("builtin:interchange-shapes.ttl", INTERCHANGE_SHAPES),
            ]
        };

        let mut ldc = shared();
        ldc.push(RuleSource::embedded("builtin:ldc-ontology.ttl", LDC_ONTOLOGY));
        let mut program = shared();
        program.push(RuleSource::embedded("builtin:program-ontology.ttl", PROGRAM_ONTOLOGY));

        Self {
            base: BTreeMap::from([("ldc".to_string(), ldc), ("program".to_string(), program)]),
            restricted: vec![RuleSource::embedded("builtin:nist-restricted.ttl", NIST_RESTRICTED)],
            restricted_strict: vec![RuleSource::embedded("builtin:nist-ta3.ttl", NIST_TA3)],
        }
    }

    /// Read a JSON catalog file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let unusable = |reason: String| ConfigError::CatalogUnreadable {
            path: path.to_path_buf(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| unusable(e.to_string()))?;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_json(&text, dir).map_err(unusable)
    }

    /// Parse a JSON catalog; relative paths are joined onto `dir`
    pub fn from_json(text: &str, dir: &Path) -> Result<Self, String> {
        let file: CatalogFile = serde_json::from_str(text).map_err(|e| e.to_string())?;
        if file.base.is_empty() {
            return Err("catalog declares no base profile".to_string());
        }

        let resolve = |paths: Vec<PathBuf>| -> Vec<RuleSource> {
            paths
                .into_iter()
                .map(|p| RuleSource::Path(if p.is_absolute() { p } else { dir.join(p) }))
                .collect()
        };

        Ok(Self {
            base: file
                .base
                .into_iter()
                .map(|(name, paths)| (name, resolve(paths)))
                .collect(),
            restricted: resolve(file.restricted),
            restricted_strict: resolve(file.restricted_strict),
        })
    }

    pub fn base_names(&self) -> Vec<String> {
        self.base.keys().cloned().collect()
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Resolve, load and compile the selected profiles
pub fn build_rule_set(
    selection: &ProfileSelection,
    catalog: &ProfileCatalog,
    loader: &dyn RuleSourceLoader,
) -> Result<CompiledRuleSet, BuildError> {
    let sources = selection.resolve(catalog)?;
    let profiles = sources
        .iter()
        .map(|source| loader.load(source))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RuleCompiler::compile(&profiles)?)
}
