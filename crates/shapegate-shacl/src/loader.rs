//! ルールソース読み込み
//!
//! A rule source is a Turtle document mixing ontology declarations
//! (classes, properties, domain/range) and SHACL node shapes. Every call to
//! [`RuleSourceLoader::load`] builds its own accumulator; nothing is carried
//! over between sources.

use crate::model::{
    AllowedValue, ConstraintKind, KindTag, NodeKind, Path, RelationDefinition, RuleProfile,
    Severity, ShapeConstraint, Target, TypeDefinition,
};
use crate::RuleError;
use indexmap::IndexMap;
use shapegate_core::vocabulary as vocab;
use shapegate_core::{parse_triples, Iri, RawTerm, RawTriple, RdfFormat, Value};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Where a rule source comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    Path(PathBuf),
    /// Compiled into the binary (built-in catalog)
    Embedded { name: String, text: &'static str },
}

impl RuleSource {
    pub fn embedded(name: impl Into<String>, text: &'static str) -> Self {
        RuleSource::Embedded {
            name: name.into(),
            text,
        }
    }

    pub fn name(&self) -> String {
        match self {
            RuleSource::Path(path) => path.display().to_string(),
            RuleSource::Embedded { name, .. } => name.clone(),
        }
    }
}

impl fmt::Display for RuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Turns one rule source into a [`RuleProfile`]
pub trait RuleSourceLoader: Send + Sync {
    fn load(&self, source: &RuleSource) -> Result<RuleProfile, RuleError>;
}

/// Default loader for Turtle rule sources
#[derive(Debug, Clone, Copy, Default)]
pub struct TurtleRuleLoader;

impl RuleSourceLoader for TurtleRuleLoader {
    fn load(&self, source: &RuleSource) -> Result<RuleProfile, RuleError> {
        let name = source.name();
        let (text, format): (Cow<'_, str>, RdfFormat) = match source {
            RuleSource::Path(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| RuleError::SourceUnreadable {
                    source_name: name.clone(),
                    reason: e.to_string(),
                })?;
                let format = RdfFormat::from_path(path).unwrap_or(RdfFormat::Turtle);
                (Cow::Owned(text), format)
            }
            RuleSource::Embedded { text, .. } => (Cow::Borrowed(*text), RdfFormat::Turtle),
        };

        let malformed = |reason: String| RuleError::SourceMalformed {
            source_name: name.clone(),
            reason,
        };

        let triples = parse_triples(&text, format).map_err(|e| malformed(e.0))?;
        let profile = extract_profile(&name, &triples).map_err(malformed)?;

        info!(
            source = %name,
            types = profile.types.len(),
            relations = profile.relations.len(),
            constraints = profile.constraints.len(),
            "rule source loaded"
        );
        Ok(profile)
    }
}

/// Build a profile from already-parsed triples
pub fn extract_profile(name: &str, triples: &[RawTriple]) -> Result<RuleProfile, String> {
    let descriptions = Descriptions::new(triples);
    Ok(RuleProfile {
        name: name.to_string(),
        types: extract_types(&descriptions)?,
        relations: extract_relations(&descriptions)?,
        constraints: extract_constraints(&descriptions)?,
    })
}

/// Triples grouped by subject, in document order of first appearance
struct Descriptions<'t> {
    subjects: IndexMap<&'t RawTerm, Vec<(&'t str, &'t RawTerm)>>,
}

impl<'t> Descriptions<'t> {
    fn new(triples: &'t [RawTriple]) -> Self {
        let mut subjects: IndexMap<&RawTerm, Vec<(&str, &RawTerm)>> = IndexMap::new();
        for triple in triples {
            subjects
                .entry(&triple.subject)
                .or_default()
                .push((triple.predicate.as_str(), &triple.object));
        }
        Self { subjects }
    }

    fn values<'a>(&'a self, subject: &RawTerm, predicate: &'a str) -> impl Iterator<Item = &'t RawTerm> + 'a {
        self.subjects
            .get(subject)
            .into_iter()
            .flatten()
            .filter(move |(p, _)| *p == predicate)
            .map(|(_, o)| *o)
    }

    fn properties(&self, subject: &RawTerm) -> &[(&'t str, &'t RawTerm)] {
        self.subjects.get(subject).map(Vec::as_slice).unwrap_or(&[])
    }

    fn has(&self, subject: &RawTerm, predicate: &str) -> bool {
        self.values(subject, predicate).next().is_some()
    }

    fn has_type(&self, subject: &RawTerm, ty: &str) -> bool {
        self.values(subject, vocab::RDF_TYPE).any(|o| o.as_iri() == Some(ty))
    }

    fn is_class(&self, subject: &RawTerm) -> bool {
        self.has_type(subject, vocab::OWL_CLASS) || self.has_type(subject, vocab::RDFS_CLASS)
    }

    /// Members of an RDF collection
    fn list(&self, head: &'t RawTerm) -> Result<Vec<&'t RawTerm>, String> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = head;
        loop {
            if cursor.as_iri() == Some(vocab::RDF_NIL) {
                return Ok(items);
            }
            if !seen.insert(cursor) {
                return Err(format!("cyclic RDF list at {}", label(cursor)));
            }
            let first = self
                .values(cursor, vocab::RDF_FIRST)
                .next()
                .ok_or_else(|| format!("list node {} has no rdf:first", label(cursor)))?;
            let rest = self
                .values(cursor, vocab::RDF_REST)
                .next()
                .ok_or_else(|| format!("list node {} has no rdf:rest", label(cursor)))?;
            items.push(first);
            cursor = rest;
        }
    }
}

fn label(term: &RawTerm) -> String {
    match term {
        RawTerm::Iri(iri) => iri.clone(),
        RawTerm::Blank(id) => format!("_:{}", id),
        RawTerm::Literal { lexical, .. } => format!("\"{}\"", lexical),
    }
}

fn named(iri: &str) -> Result<Iri, String> {
    Iri::parse_named(iri).map_err(|e| e.to_string())
}

fn named_term(term: &RawTerm, role: &str) -> Result<Iri, String> {
    match term {
        RawTerm::Iri(iri) => named(iri),
        other => Err(format!("{} must be an IRI, found {}", role, label(other))),
    }
}

fn extract_types(descriptions: &Descriptions<'_>) -> Result<Vec<TypeDefinition>, String> {
    let mut types = Vec::new();
    for subject in descriptions.subjects.keys() {
        let RawTerm::Iri(id) = subject else {
            continue;
        };
        if !descriptions.is_class(subject) && !descriptions.has(subject, vocab::RDFS_SUBCLASS_OF) {
            continue;
        }

        // 名前付きの親のみ (制限クラスなどの匿名ノードは無視)
        let parents = descriptions
            .values(subject, vocab::RDFS_SUBCLASS_OF)
            .filter_map(RawTerm::as_iri)
            .map(named)
            .collect::<Result<Vec<_>, _>>()?;

        types.push(TypeDefinition {
            id: named(id)?,
            parents,
        });
    }
    Ok(types)
}

fn extract_relations(descriptions: &Descriptions<'_>) -> Result<Vec<RelationDefinition>, String> {
    let mut relations = Vec::new();
    for subject in descriptions.subjects.keys() {
        let RawTerm::Iri(id) = subject else {
            continue;
        };
        let declared = descriptions.has_type(subject, vocab::OWL_OBJECT_PROPERTY)
            || descriptions.has_type(subject, vocab::OWL_DATATYPE_PROPERTY)
            || descriptions.has_type(subject, vocab::RDF_PROPERTY)
            || descriptions.has(subject, vocab::RDFS_SUBPROPERTY_OF)
            || descriptions.has(subject, vocab::RDFS_DOMAIN)
            || descriptions.has(subject, vocab::RDFS_RANGE);
        if !declared {
            continue;
        }

        let mut relation = RelationDefinition::new(named(id)?);
        relation.parents = descriptions
            .values(subject, vocab::RDFS_SUBPROPERTY_OF)
            .map(|parent| named_term(parent, "rdfs:subPropertyOf"))
            .collect::<Result<Vec<_>, _>>()?;
        relation.domain = type_alternatives(descriptions, subject, vocab::RDFS_DOMAIN)?;
        relation.range = type_alternatives(descriptions, subject, vocab::RDFS_RANGE)?;
        relations.push(relation);
    }
    Ok(relations)
}

/// Named types of a domain/range declaration, expanding `owl:unionOf`
fn type_alternatives(
    descriptions: &Descriptions<'_>,
    subject: &RawTerm,
    predicate: &str,
) -> Result<Vec<Iri>, String> {
    let mut alternatives = Vec::new();
    for value in descriptions.values(subject, predicate) {
        match value {
            RawTerm::Iri(iri) => alternatives.push(named(iri)?),
            RawTerm::Blank(_) => {
                let union = descriptions.values(value, vocab::OWL_UNION_OF).next().ok_or_else(|| {
                    format!("{} of {} is an anonymous class without owl:unionOf", predicate, label(subject))
                })?;
                for member in descriptions.list(union)? {
                    alternatives.push(named_term(member, "owl:unionOf member")?);
                }
            }
            RawTerm::Literal { .. } => {
                return Err(format!("{} of {} is a literal", predicate, label(subject)));
            }
        }
    }
    let mut seen = HashSet::new();
    alternatives.retain(|iri| seen.insert(iri.clone()));
    Ok(alternatives)
}

/// Constraint collected for one node shape before it is bound to targets
struct Pending {
    path: Option<Path>,
    kind: ConstraintKind,
    severity: Severity,
    message: Option<String>,
}

fn extract_constraints(descriptions: &Descriptions<'_>) -> Result<Vec<ShapeConstraint>, String> {
    let mut constraints = Vec::new();
    for subject in descriptions.subjects.keys() {
        let is_shape = descriptions.has_type(subject, vocab::SH_NODE_SHAPE)
            || descriptions.has(subject, vocab::SH_TARGET_CLASS)
            || descriptions.has(subject, vocab::SH_TARGET_SUBJECTS_OF);
        if !is_shape {
            continue;
        }

        let shape = label(subject);
        let targets = shape_targets(descriptions, subject)?;
        if targets.is_empty() {
            debug!(shape = %shape, "node shape without target skipped");
            continue;
        }

        let severity = severity_of(descriptions, subject)?.unwrap_or_default();
        let message = message_of(descriptions, subject);
        let mut pending: IndexMap<(Option<Path>, KindTag), Pending> = IndexMap::new();

        collect_parameters(descriptions, subject, None, severity, &message, &mut pending)?;

        if descriptions
            .values(subject, vocab::SH_CLOSED)
            .any(|v| matches!(v.as_literal(), Some("true") | Some("1")))
        {
            let mut ignored = Vec::new();
            for list in descriptions.values(subject, vocab::SH_IGNORED_PROPERTIES) {
                for member in descriptions.list(list)? {
                    ignored.push(named_term(member, "sh:ignoredProperties member")?);
                }
            }
            pending.insert(
                (None, KindTag::Closed),
                Pending {
                    path: None,
                    kind: ConstraintKind::Closed { ignored },
                    severity,
                    message: message.clone(),
                },
            );
        }

        for property in descriptions.values(subject, vocab::SH_PROPERTY) {
            let path = property_path(descriptions, property)?;
            let severity = severity_of(descriptions, property)?.unwrap_or(severity);
            let message = message_of(descriptions, property).or_else(|| message.clone());
            collect_parameters(descriptions, property, Some(path), severity, &message, &mut pending)?;
        }

        for target in &targets {
            for entry in pending.values() {
                constraints.push(ShapeConstraint {
                    shape: shape.clone(),
                    target: target.clone(),
                    path: entry.path.clone(),
                    kind: entry.kind.clone(),
                    severity: entry.severity,
                    message: entry.message.clone(),
                });
            }
        }
    }
    Ok(constraints)
}

fn shape_targets(descriptions: &Descriptions<'_>, shape: &RawTerm) -> Result<Vec<Target>, String> {
    let mut targets = Vec::new();
    if let RawTerm::Iri(iri) = shape {
        if descriptions.is_class(shape) {
            targets.push(Target::Type(named(iri)?));
        }
    }
    for class in descriptions.values(shape, vocab::SH_TARGET_CLASS) {
        targets.push(Target::Type(named_term(class, "sh:targetClass")?));
    }
    for relation in descriptions.values(shape, vocab::SH_TARGET_SUBJECTS_OF) {
        targets.push(Target::SubjectsOf(named_term(relation, "sh:targetSubjectsOf")?));
    }
    let mut seen = HashSet::new();
    targets.retain(|target| seen.insert(target.clone()));
    Ok(targets)
}

fn severity_of(descriptions: &Descriptions<'_>, shape: &RawTerm) -> Result<Option<Severity>, String> {
    descriptions
        .values(shape, vocab::SH_SEVERITY)
        .next()
        .map(|value| {
            value
                .as_iri()
                .and_then(Severity::from_iri)
                .ok_or_else(|| format!("unknown sh:severity {} on {}", label(value), label(shape)))
        })
        .transpose()
}

fn message_of(descriptions: &Descriptions<'_>, shape: &RawTerm) -> Option<String> {
    descriptions
        .values(shape, vocab::SH_MESSAGE)
        .find_map(RawTerm::as_literal)
        .map(str::to_string)
}

fn property_path(descriptions: &Descriptions<'_>, property: &RawTerm) -> Result<Path, String> {
    let path = descriptions
        .values(property, vocab::SH_PATH)
        .next()
        .ok_or_else(|| format!("property shape {} has no sh:path", label(property)))?;
    match path {
        RawTerm::Iri(iri) => Ok(Path::Forward(named(iri)?)),
        RawTerm::Blank(_) => {
            let inverse = descriptions
                .values(path, vocab::SH_INVERSE_PATH)
                .next()
                .ok_or_else(|| format!("unsupported path expression on {}", label(property)))?;
            Ok(Path::Inverse(named_term(inverse, "sh:inversePath")?))
        }
        RawTerm::Literal { .. } => Err(format!("sh:path of {} is a literal", label(property))),
    }
}

fn count(value: &RawTerm, parameter: &str) -> Result<u64, String> {
    value
        .as_literal()
        .and_then(|lexical| lexical.trim_start_matches('+').parse::<u64>().ok())
        .ok_or_else(|| format!("{} must be a non-negative integer, found {}", parameter, label(value)))
}

fn allowed_value(term: &RawTerm) -> Result<AllowedValue, String> {
    match term {
        RawTerm::Iri(iri) => Ok(AllowedValue::Iri(iri.clone())),
        RawTerm::Literal {
            lexical,
            datatype,
            language,
        } => {
            let datatype = Iri::parse(datatype).map_err(|e| e.to_string())?;
            let mut value = Value::new(lexical.clone(), datatype);
            value.language = language.clone();
            Ok(AllowedValue::Literal(value))
        }
        RawTerm::Blank(_) => Err(format!("sh:in member {} is a blank node", label(term))),
    }
}

/// Read constraint parameters of `shape` in document order. Repeated
/// datatype / class / in parameters widen the allowed set; repeated counts
/// keep the last one.
fn collect_parameters(
    descriptions: &Descriptions<'_>,
    shape: &RawTerm,
    path: Option<Path>,
    severity: Severity,
    message: &Option<String>,
    pending: &mut IndexMap<(Option<Path>, KindTag), Pending>,
) -> Result<(), String> {
    for &(predicate, value) in descriptions.properties(shape) {
        let kind = match predicate {
            vocab::SH_MIN_COUNT | vocab::SH_MAX_COUNT if path.is_none() => {
                return Err(format!("{} on {} requires a path", predicate, label(shape)));
            }
            vocab::SH_MIN_COUNT => ConstraintKind::MinCount(count(value, "sh:minCount")?),
            vocab::SH_MAX_COUNT => ConstraintKind::MaxCount(count(value, "sh:maxCount")?),
            vocab::SH_DATATYPE => ConstraintKind::Datatype(vec![named_term(value, "sh:datatype")?]),
            vocab::SH_NODE_KIND => {
                let kind = value
                    .as_iri()
                    .and_then(NodeKind::from_iri)
                    .ok_or_else(|| format!("unknown sh:nodeKind {}", label(value)))?;
                ConstraintKind::NodeKind(kind)
            }
            vocab::SH_IN => ConstraintKind::In(
                descriptions
                    .list(value)?
                    .into_iter()
                    .map(allowed_value)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            vocab::SH_CLASS => ConstraintKind::Class(vec![named_term(value, "sh:class")?]),
            _ => continue,
        };

        let key = (path.clone(), kind.tag());
        match pending.get_mut(&key) {
            Some(existing) => {
                merge_kind(&mut existing.kind, kind);
                existing.severity = severity;
                existing.message = message.clone();
            }
            None => {
                pending.insert(
                    key,
                    Pending {
                        path: path.clone(),
                        kind,
                        severity,
                        message: message.clone(),
                    },
                );
            }
        }
    }
    Ok(())
}

fn merge_kind(existing: &mut ConstraintKind, incoming: ConstraintKind) {
    match (existing, incoming) {
        (ConstraintKind::Datatype(have), ConstraintKind::Datatype(more))
        | (ConstraintKind::Class(have), ConstraintKind::Class(more)) => {
            for iri in more {
                if !have.contains(&iri) {
                    have.push(iri);
                }
            }
        }
        (ConstraintKind::In(have), ConstraintKind::In(more)) => {
            for value in more {
                if !have.contains(&value) {
                    have.push(value);
                }
            }
        }
        (slot, incoming) => *slot = incoming,
    }
}
