//! Rule model: type and relation definitions, shape constraints, profiles

use serde::Serialize;
use shapegate_core::{Graph, Iri, NodeId, Object, Value};
use shapegate_core::vocabulary as vocab;
use std::fmt;

/// Type declared by a rule source, with its direct parents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    pub id: Iri,
    pub parents: Vec<Iri>,
}

/// Relation declared by a rule source.
///
/// `domain` / `range` are alternatives: a subject (object) satisfies the
/// declaration if it is an instance of any listed type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDefinition {
    pub id: Iri,
    pub parents: Vec<Iri>,
    pub domain: Vec<Iri>,
    pub range: Vec<Iri>,
}

impl RelationDefinition {
    pub fn new(id: Iri) -> Self {
        Self {
            id,
            parents: Vec::new(),
            domain: Vec::new(),
            range: Vec::new(),
        }
    }
}

/// Which nodes a constraint applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    /// Instances of the type (or any subtype)
    Type(Iri),
    /// Subjects of the relation (or any subrelation)
    SubjectsOf(Iri),
}

impl Target {
    pub fn iri(&self) -> &Iri {
        match self {
            Target::Type(iri) | Target::SubjectsOf(iri) => iri,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Type(iri) => write!(f, "type {}", iri),
            Target::SubjectsOf(iri) => write!(f, "relation {}", iri),
        }
    }
}

/// Property path of a constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Path {
    Forward(Iri),
    Inverse(Iri),
}

impl Path {
    pub fn predicate(&self) -> &Iri {
        match self {
            Path::Forward(iri) | Path::Inverse(iri) => iri,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Forward(iri) => write!(f, "{}", iri),
            Path::Inverse(iri) => write!(f, "^{}", iri),
        }
    }
}

/// sh:nodeKind values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    Iri,
    BlankNode,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    pub fn from_iri(iri: &str) -> Option<Self> {
        match iri {
            vocab::SH_IRI => Some(NodeKind::Iri),
            vocab::SH_BLANK_NODE => Some(NodeKind::BlankNode),
            vocab::SH_LITERAL => Some(NodeKind::Literal),
            vocab::SH_BLANK_NODE_OR_IRI => Some(NodeKind::BlankNodeOrIri),
            vocab::SH_BLANK_NODE_OR_LITERAL => Some(NodeKind::BlankNodeOrLiteral),
            vocab::SH_IRI_OR_LITERAL => Some(NodeKind::IriOrLiteral),
            _ => None,
        }
    }

    pub fn matches(&self, graph: &Graph, object: &Object) -> bool {
        let (iri, blank, literal) = match object {
            Object::Node(idx) => {
                let blank = graph.node(*idx).id.is_blank();
                (!blank, blank, false)
            }
            Object::Value(_) => (false, false, true),
        };
        self.accepts(iri, blank, literal)
    }

    /// Kind check for a named resource that is not a graph node (an asserted type)
    pub fn matches_iri(&self) -> bool {
        self.accepts(true, false, false)
    }

    fn accepts(&self, iri: bool, blank: bool, literal: bool) -> bool {
        match self {
            NodeKind::Iri => iri,
            NodeKind::BlankNode => blank,
            NodeKind::Literal => literal,
            NodeKind::BlankNodeOrIri => blank || iri,
            NodeKind::BlankNodeOrLiteral => blank || literal,
            NodeKind::IriOrLiteral => iri || literal,
        }
    }
}

/// Member of an sh:in list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AllowedValue {
    Iri(String),
    Literal(Value),
}

impl AllowedValue {
    pub fn matches(&self, graph: &Graph, object: &Object) -> bool {
        match (self, object) {
            (AllowedValue::Iri(iri), Object::Node(idx)) => match &graph.node(*idx).id {
                NodeId::Iri(id) => id.as_ref() == iri.as_str(),
                NodeId::Blank(_) => false,
            },
            (AllowedValue::Literal(allowed), Object::Value(value)) => allowed == value,
            _ => false,
        }
    }

    pub fn matches_iri(&self, iri: &Iri) -> bool {
        matches!(self, AllowedValue::Iri(allowed) if allowed.as_str() == iri.as_str())
    }
}

impl fmt::Display for AllowedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowedValue::Iri(iri) => write!(f, "<{}>", iri),
            AllowedValue::Literal(value) => write!(f, "{}", value),
        }
    }
}

/// Closed set of supported constraint kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    MinCount(u64),
    MaxCount(u64),
    /// Value must be a well-formed literal of one of these datatypes
    Datatype(Vec<Iri>),
    NodeKind(NodeKind),
    In(Vec<AllowedValue>),
    /// Value must be an instance of one of these types
    Class(Vec<Iri>),
    /// Only predicates named by constraints on the same type (plus `ignored`)
    Closed { ignored: Vec<Iri> },
}

impl ConstraintKind {
    pub fn tag(&self) -> KindTag {
        match self {
            ConstraintKind::MinCount(_) => KindTag::MinCount,
            ConstraintKind::MaxCount(_) => KindTag::MaxCount,
            ConstraintKind::Datatype(_) => KindTag::Datatype,
            ConstraintKind::NodeKind(_) => KindTag::NodeKind,
            ConstraintKind::In(_) => KindTag::In,
            ConstraintKind::Class(_) => KindTag::Class,
            ConstraintKind::Closed { .. } => KindTag::Closed,
        }
    }
}

/// Discriminant of [`ConstraintKind`], part of the override key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KindTag {
    MinCount,
    MaxCount,
    Datatype,
    NodeKind,
    In,
    Class,
    Closed,
}

impl KindTag {
    /// Component name as used in constraint identifiers
    pub fn component(&self) -> &'static str {
        match self {
            KindTag::MinCount => "minCount",
            KindTag::MaxCount => "maxCount",
            KindTag::Datatype => "datatype",
            KindTag::NodeKind => "nodeKind",
            KindTag::In => "in",
            KindTag::Class => "class",
            KindTag::Closed => "closed",
        }
    }
}

/// Severity of a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Violation,
    Warning,
    Info,
}

impl Severity {
    pub fn from_iri(iri: &str) -> Option<Self> {
        match iri {
            vocab::SH_VIOLATION => Some(Severity::Violation),
            vocab::SH_WARNING => Some(Severity::Warning),
            vocab::SH_INFO => Some(Severity::Info),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Violation => "Violation",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
        };
        f.write_str(label)
    }
}

/// Stable identifier of a checked rule, shown in every violation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConstraintId(String);

impl ConstraintId {
    /// `<shape>[<path>]/<component>`
    pub fn for_shape(shape: &str, path: Option<&Path>, tag: KindTag) -> Self {
        match path {
            Some(path) => ConstraintId(format!("{}[{}]/{}", shape, path, tag.component())),
            None => ConstraintId(format!("{}/{}", shape, tag.component())),
        }
    }

    /// `<relation>/domain`
    pub fn domain(relation: &Iri) -> Self {
        ConstraintId(format!("{}/domain", relation))
    }

    /// `<relation>/range`
    pub fn range(relation: &Iri) -> Self {
        ConstraintId(format!("{}/range", relation))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Override key: a later profile's constraint with the same key replaces
/// an earlier one
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstraintKey {
    pub target: Target,
    pub path: Option<Path>,
    pub tag: KindTag,
}

/// One structural rule bound to a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeConstraint {
    /// Declaring shape (IRI, or `_:label` for anonymous shapes)
    pub shape: String,
    pub target: Target,
    pub path: Option<Path>,
    pub kind: ConstraintKind,
    pub severity: Severity,
    pub message: Option<String>,
}

impl ShapeConstraint {
    pub fn key(&self) -> ConstraintKey {
        ConstraintKey {
            target: self.target.clone(),
            path: self.path.clone(),
            tag: self.kind.tag(),
        }
    }

    pub fn id(&self) -> ConstraintId {
        ConstraintId::for_shape(&self.shape, self.path.as_ref(), self.kind.tag())
    }
}

/// Rules produced from one source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleProfile {
    pub name: String,
    pub types: Vec<TypeDefinition>,
    pub relations: Vec<RelationDefinition>,
    pub constraints: Vec<ShapeConstraint>,
}

impl RuleProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.relations.is_empty() && self.constraints.is_empty()
    }
}
