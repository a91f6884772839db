//! Graph loading boundary
//!
//! Serialized graphs come in through a [`GraphLoader`]; the validator never
//! sees raw bytes.

use crate::iri::Iri;
use crate::model::{Graph, NodeId, NodeIdx, Object, Value};
use crate::rdf::{parse_triples, RawTerm, RawTriple, RdfFormat};
use crate::vocabulary as vocab;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphLoadError {
    #[error("cannot read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("cannot parse {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("unsupported graph format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Produces a [`Graph`] from a path
#[async_trait]
pub trait GraphLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Graph, GraphLoadError>;
}

/// Default loader: reads the file asynchronously, parses with sophia on a
/// blocking thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct RdfGraphLoader;

#[async_trait]
impl GraphLoader for RdfGraphLoader {
    async fn load(&self, path: &Path) -> Result<Graph, GraphLoadError> {
        let format = RdfFormat::from_path(path)
            .ok_or_else(|| GraphLoadError::UnsupportedFormat(path.to_path_buf()))?;

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GraphLoadError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let owned_path = path.to_path_buf();
        tokio::task::spawn_blocking(move || parse_graph(&text, format, &owned_path))
            .await
            .map_err(|e| GraphLoadError::Malformed {
                path: path.to_path_buf(),
                reason: format!("parser task failed: {}", e),
            })?
    }
}

/// Parse serialized text into a [`Graph`]. `path` only labels errors.
pub fn parse_graph(text: &str, format: RdfFormat, path: &Path) -> Result<Graph, GraphLoadError> {
    let malformed = |reason: String| GraphLoadError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let triples = parse_triples(text, format).map_err(|e| malformed(e.0))?;
    let graph = graph_from_triples(&triples).map_err(malformed)?;

    debug!(
        path = %path.display(),
        nodes = graph.node_count(),
        relations = graph.relation_count(),
        "graph loaded"
    );
    Ok(graph)
}

/// Build a graph from parsed triples.
///
/// `rdf:type` triples with an IRI object become node types. Reified
/// statements (`rdf:Statement` with `rdf:subject`/`rdf:predicate`/`rdf:object`)
/// attach their remaining properties as facts on the matching relation.
pub fn graph_from_triples(triples: &[RawTriple]) -> Result<Graph, String> {
    let mut graph = Graph::new();

    for triple in triples {
        let subject = graph.add_node(resource_id(&triple.subject)?);
        let predicate = Iri::parse(&triple.predicate).map_err(|e| e.to_string())?;

        if predicate.as_str() == vocab::RDF_TYPE {
            if let RawTerm::Iri(ty) = &triple.object {
                let ty = Iri::parse(ty).map_err(|e| e.to_string())?;
                graph.add_type(subject, ty);
                continue;
            }
        }

        let object = object_of(&mut graph, &triple.object)?;
        graph.add_relation(subject, predicate, object);
    }

    attach_reified_facts(&mut graph);
    Ok(graph)
}

fn resource_id(term: &RawTerm) -> Result<NodeId, String> {
    match term {
        RawTerm::Iri(iri) => Ok(NodeId::iri(iri)),
        RawTerm::Blank(label) => Ok(NodeId::blank(label)),
        RawTerm::Literal { lexical, .. } => Err(format!("literal \"{}\" in subject position", lexical)),
    }
}

fn object_of(graph: &mut Graph, term: &RawTerm) -> Result<Object, String> {
    match term {
        RawTerm::Iri(_) | RawTerm::Blank(_) => Ok(Object::Node(graph.add_node(resource_id(term)?))),
        RawTerm::Literal {
            lexical,
            datatype,
            language,
        } => {
            let datatype = Iri::parse(datatype).map_err(|e| e.to_string())?;
            let mut value = Value::new(lexical.clone(), datatype);
            value.language = language.clone();
            Ok(Object::Value(value))
        }
    }
}

fn attach_reified_facts(graph: &mut Graph) {
    let statements: Vec<NodeIdx> = graph
        .nodes()
        .filter(|(_, node)| node.types.iter().any(|t| t.as_str() == vocab::RDF_STATEMENT))
        .map(|(idx, _)| idx)
        .collect();

    for statement in statements {
        let mut subject = None;
        let mut predicate = None;
        let mut object = None;
        let mut facts = Vec::new();

        for rel in graph.outgoing(statement) {
            match (rel.predicate.as_str(), &rel.object) {
                (vocab::RDF_SUBJECT, Object::Node(s)) => subject = Some(*s),
                (vocab::RDF_PREDICATE, Object::Node(p)) => predicate = Some(*p),
                (vocab::RDF_OBJECT, o) => object = Some(o.clone()),
                _ => facts.push((rel.predicate.clone(), rel.object.clone())),
            }
        }

        let (Some(subject), Some(predicate), Some(object)) = (subject, predicate, object) else {
            continue;
        };
        let NodeId::Iri(predicate) = &graph.node(predicate).id else {
            continue;
        };
        let Ok(predicate) = Iri::parse(predicate) else {
            continue;
        };

        if let Some(relation) = graph.find_relation(subject, &predicate, &object) {
            for (fact_predicate, fact_object) in facts {
                graph.attach_fact(relation, fact_predicate, fact_object);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REIFIED: &str = r#"
        @prefix ex: <http://example.org/> .
        @prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

        ex:alice a ex:Person ;
            ex:knows ex:bob .
        ex:bob a ex:Person .

        ex:stmt a rdf:Statement ;
            rdf:subject ex:alice ;
            rdf:predicate ex:knows ;
            rdf:object ex:bob ;
            ex:confidence "0.8"^^xsd:double .
    "#;

    #[test]
    fn types_are_stored_on_nodes() {
        let graph = parse_graph(REIFIED, RdfFormat::Turtle, Path::new("mem.ttl")).unwrap();
        let alice = graph.find_node(&NodeId::iri("http://example.org/alice")).unwrap();
        let node = graph.node(alice);
        assert_eq!(node.types.len(), 1);
        assert_eq!(node.types[0].local_name(), "Person");
        assert!(graph
            .outgoing(alice)
            .all(|r| r.predicate.as_str() != vocab::RDF_TYPE));
    }

    #[test]
    fn reified_statement_attaches_facts() {
        let graph = parse_graph(REIFIED, RdfFormat::Turtle, Path::new("mem.ttl")).unwrap();
        let alice = graph.find_node(&NodeId::iri("http://example.org/alice")).unwrap();
        let knows = graph
            .outgoing(alice)
            .find(|r| r.predicate.local_name() == "knows")
            .unwrap();
        assert_eq!(knows.facts.len(), 1);
        assert_eq!(knows.facts[0].predicate.local_name(), "confidence");
    }

    #[test]
    fn malformed_input_reports_path() {
        let err = parse_graph("ex:a ex:b", RdfFormat::Turtle, Path::new("broken.ttl")).unwrap_err();
        match err {
            GraphLoadError::Malformed { path, .. } => assert_eq!(path, PathBuf::from("broken.ttl")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn loader_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.ttl");
        std::fs::write(&path, REIFIED).unwrap();

        let graph = RdfGraphLoader.load(&path).await.unwrap();
        assert!(graph.node_count() >= 3);

        let missing = RdfGraphLoader.load(&dir.path().join("missing.ttl")).await;
        assert!(matches!(missing, Err(GraphLoadError::Unreadable { .. })));

        let unsupported = RdfGraphLoader.load(&dir.path().join("g.json")).await;
        assert!(matches!(unsupported, Err(GraphLoadError::UnsupportedFormat(_))));
    }
}
