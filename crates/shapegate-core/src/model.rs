//! Graph data model: nodes, first-class relations and typed literal values

use crate::iri::Iri;
use crate::vocabulary as vocab;
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Node identifier: an opaque URI-like string or a blank node label
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Iri(Arc<str>),
    Blank(Arc<str>),
}

impl NodeId {
    pub fn iri(s: impl AsRef<str>) -> Self {
        NodeId::Iri(Arc::from(s.as_ref()))
    }

    pub fn blank(label: impl AsRef<str>) -> Self {
        NodeId::Blank(Arc::from(label.as_ref()))
    }

    /// Fresh blank identifier for client-side graph construction
    pub fn fresh_blank() -> Self {
        NodeId::blank(format!("g{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, NodeId::Blank(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            NodeId::Iri(s) | NodeId::Blank(s) => s,
        }
    }
}

impl Serialize for NodeId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Iri(s) => write!(f, "<{}>", s),
            NodeId::Blank(s) => write!(f, "_:{}", s),
        }
    }
}

/// Coarse classification of a literal's datatype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Integer,
    Decimal,
    Double,
    Boolean,
    DateTime,
    Date,
    Other,
}

/// Typed literal value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Value {
    pub lexical: String,
    pub datatype: Iri,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Value {
    pub fn new(lexical: impl Into<String>, datatype: Iri) -> Self {
        Self {
            lexical: lexical.into(),
            datatype,
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn kind(&self) -> ValueKind {
        match self.datatype.as_str() {
            vocab::XSD_STRING | vocab::RDF_LANG_STRING => ValueKind::String,
            vocab::XSD_INTEGER
            | vocab::XSD_INT
            | vocab::XSD_LONG
            | vocab::XSD_NON_NEGATIVE_INTEGER
            | vocab::XSD_POSITIVE_INTEGER
            | vocab::XSD_GYEAR => ValueKind::Integer,
            vocab::XSD_DECIMAL => ValueKind::Decimal,
            vocab::XSD_DOUBLE | vocab::XSD_FLOAT => ValueKind::Double,
            vocab::XSD_BOOLEAN => ValueKind::Boolean,
            vocab::XSD_DATE_TIME => ValueKind::DateTime,
            vocab::XSD_DATE => ValueKind::Date,
            _ => ValueKind::Other,
        }
    }

    /// Whether the lexical form is legal for the declared datatype.
    /// Datatypes we do not know are accepted as-is.
    pub fn is_well_formed(&self) -> bool {
        let lexical = self.lexical.as_str();
        match self.kind() {
            ValueKind::String | ValueKind::Other => true,
            ValueKind::Integer => {
                let Ok(n) = lexical.trim_start_matches('+').parse::<i128>() else {
                    return false;
                };
                match self.datatype.as_str() {
                    vocab::XSD_NON_NEGATIVE_INTEGER => n >= 0,
                    vocab::XSD_POSITIVE_INTEGER => n > 0,
                    vocab::XSD_INT => i32::try_from(n).is_ok(),
                    vocab::XSD_LONG => i64::try_from(n).is_ok(),
                    _ => true,
                }
            }
            ValueKind::Decimal => {
                !lexical.is_empty()
                    && !lexical.contains(['e', 'E'])
                    && lexical
                        .chars()
                        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-'))
                    && lexical.parse::<f64>().is_ok()
            }
            ValueKind::Double => {
                matches!(lexical, "INF" | "-INF" | "+INF" | "NaN")
                    || (lexical.parse::<f64>().is_ok()
                        && !lexical.eq_ignore_ascii_case("inf")
                        && !lexical.eq_ignore_ascii_case("nan"))
            }
            ValueKind::Boolean => matches!(lexical, "true" | "false" | "1" | "0"),
            ValueKind::DateTime => {
                chrono::DateTime::parse_from_rfc3339(lexical).is_ok()
                    || chrono::NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
            }
            ValueKind::Date => chrono::NaiveDate::parse_from_str(lexical, "%Y-%m-%d").is_ok(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.language {
            Some(lang) => write!(f, "\"{}\"@{}", self.lexical, lang),
            None if self.datatype.as_str() == vocab::XSD_STRING => write!(f, "\"{}\"", self.lexical),
            None => write!(f, "\"{}\"^^<{}>", self.lexical, self.datatype),
        }
    }
}

/// Index of a node inside its [`Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(pub usize);

/// Index of a relation inside its [`Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationIdx(pub usize);

/// Object position of a relation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Object {
    Node(NodeIdx),
    Value(Value),
}

/// A fact attached to a relation (e.g. a confidence value)
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub predicate: Iri,
    pub object: Object,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// Asserted types, in assertion order
    pub types: SmallVec<[Iri; 2]>,
}

/// Directed, typed edge. Relations are first-class and may carry facts.
#[derive(Debug, Clone)]
pub struct Relation {
    pub subject: NodeIdx,
    pub predicate: Iri,
    pub object: Object,
    pub facts: Vec<Fact>,
}

/// In-memory graph with subject/object adjacency indexes.
///
/// Nodes and relations keep insertion order, which is the order the
/// validator walks them in.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    node_index: HashMap<NodeId, NodeIdx>,
    relations: Vec<Relation>,
    outgoing: Vec<SmallVec<[RelationIdx; 4]>>,
    incoming: Vec<SmallVec<[RelationIdx; 4]>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the node with this id
    pub fn add_node(&mut self, id: NodeId) -> NodeIdx {
        if let Some(idx) = self.node_index.get(&id) {
            return *idx;
        }
        let idx = NodeIdx(self.nodes.len());
        self.nodes.push(Node {
            id: id.clone(),
            types: SmallVec::new(),
        });
        self.outgoing.push(SmallVec::new());
        self.incoming.push(SmallVec::new());
        self.node_index.insert(id, idx);
        idx
    }

    /// Create a node with a freshly generated blank identifier
    pub fn add_blank_node(&mut self) -> NodeIdx {
        self.add_node(NodeId::fresh_blank())
    }

    pub fn add_type(&mut self, node: NodeIdx, ty: Iri) {
        let types = &mut self.nodes[node.0].types;
        if !types.contains(&ty) {
            types.push(ty);
        }
    }

    /// Add a relation. Adding the same (subject, predicate, object) twice
    /// returns the existing relation.
    pub fn add_relation(&mut self, subject: NodeIdx, predicate: Iri, object: Object) -> RelationIdx {
        if let Some(existing) = self.find_relation(subject, &predicate, &object) {
            return existing;
        }
        let idx = RelationIdx(self.relations.len());
        if let Object::Node(target) = &object {
            self.incoming[target.0].push(idx);
        }
        self.outgoing[subject.0].push(idx);
        self.relations.push(Relation {
            subject,
            predicate,
            object,
            facts: Vec::new(),
        });
        idx
    }

    pub fn attach_fact(&mut self, relation: RelationIdx, predicate: Iri, object: Object) {
        let fact = Fact { predicate, object };
        let facts = &mut self.relations[relation.0].facts;
        if !facts.contains(&fact) {
            facts.push(fact);
        }
    }

    pub fn find_node(&self, id: &NodeId) -> Option<NodeIdx> {
        self.node_index.get(id).copied()
    }

    pub fn find_relation(&self, subject: NodeIdx, predicate: &Iri, object: &Object) -> Option<RelationIdx> {
        self.outgoing.get(subject.0)?.iter().copied().find(|idx| {
            let rel = &self.relations[idx.0];
            rel.predicate == *predicate && rel.object == *object
        })
    }

    pub fn node(&self, idx: NodeIdx) -> &Node {
        &self.nodes[idx.0]
    }

    pub fn relation(&self, idx: RelationIdx) -> &Relation {
        &self.relations[idx.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeIdx(i), n))
    }

    pub fn relations(&self) -> impl Iterator<Item = (RelationIdx, &Relation)> {
        self.relations.iter().enumerate().map(|(i, r)| (RelationIdx(i), r))
    }

    pub fn outgoing(&self, node: NodeIdx) -> impl Iterator<Item = &Relation> {
        self.outgoing[node.0].iter().map(|idx| &self.relations[idx.0])
    }

    pub fn incoming(&self, node: NodeIdx) -> impl Iterator<Item = &Relation> {
        self.incoming[node.0].iter().map(|idx| &self.relations[idx.0])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render an object for messages
    pub fn describe(&self, object: &Object) -> String {
        match object {
            Object::Node(idx) => self.node(*idx).id.to_string(),
            Object::Value(value) => value.to_string(),
        }
    }
}
