//! # shapegate core
//!
//! 検証対象グラフのデータモデル
//! - 構造化識別子 (`Iri`: namespace + local name)
//! - ノード・第一級リレーション・型付きリテラル (`Graph`)
//! - グラフ読み込み境界 (`GraphLoader`)

pub mod iri;
pub mod loader;
pub mod model;
pub mod rdf;
pub mod vocabulary;

pub use iri::{Iri, IriError};
pub use loader::{graph_from_triples, parse_graph, GraphLoadError, GraphLoader, RdfGraphLoader};
pub use model::{Fact, Graph, Node, NodeId, NodeIdx, Object, Relation, RelationIdx, Value, ValueKind};
pub use rdf::{parse_triples, ParseError, RawTerm, RawTriple, RdfFormat};

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Iri {
        Iri::parse(s).unwrap()
    }

    mod graph_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        proptest! {
            #[test]
            fn prop_graph_deduplicates(edges in prop::collection::vec((0u8..6, 0u8..6), 0..40)) {
                let mut graph = Graph::new();
                for (s, o) in &edges {
                    let subject = graph.add_node(NodeId::iri(format!("http://example.org/n{}", s)));
                    let object = graph.add_node(NodeId::iri(format!("http://example.org/n{}", o)));
                    graph.add_relation(subject, iri("http://example.org/p"), Object::Node(object));
                }

                let nodes: HashSet<u8> = edges.iter().flat_map(|(s, o)| [*s, *o]).collect();
                let relations: HashSet<(u8, u8)> = edges.iter().copied().collect();
                prop_assert_eq!(graph.node_count(), nodes.len());
                prop_assert_eq!(graph.relation_count(), relations.len());
            }

            #[test]
            fn prop_iri_splits_into_namespace_and_local_name(
                base in "[a-z]{1,8}",
                segment in "[a-z]{1,8}",
                local in "[A-Za-z][A-Za-z0-9]{0,8}",
                hash in any::<bool>(),
            ) {
                let namespace = format!("http://{}.org/{}{}", base, segment, if hash { '#' } else { '/' });
                let parsed = iri(&format!("{}{}", namespace, local));
                prop_assert_eq!(parsed.namespace(), namespace.as_str());
                prop_assert_eq!(parsed.local_name(), local.as_str());
            }
        }

        #[test]
        fn test_add_node_is_idempotent() {
            let mut graph = Graph::new();
            let a = graph.add_node(NodeId::iri("http://example.org/a"));
            let again = graph.add_node(NodeId::iri("http://example.org/a"));
            assert_eq!(a, again);
            assert_eq!(graph.node_count(), 1);
        }

        #[test]
        fn test_duplicate_relation_is_not_added_twice() {
            let mut graph = Graph::new();
            let a = graph.add_node(NodeId::iri("http://example.org/a"));
            let b = graph.add_node(NodeId::iri("http://example.org/b"));
            let r1 = graph.add_relation(a, iri("http://example.org/p"), Object::Node(b));
            let r2 = graph.add_relation(a, iri("http://example.org/p"), Object::Node(b));
            assert_eq!(r1, r2);
            assert_eq!(graph.relation_count(), 1);
            assert_eq!(graph.incoming(b).count(), 1);
        }

        #[test]
        fn test_blank_nodes_are_fresh() {
            let mut graph = Graph::new();
            let b1 = graph.add_blank_node();
            let b2 = graph.add_blank_node();
            assert_ne!(b1, b2);
            assert!(graph.node(b1).id.is_blank());
        }

        #[test]
        fn test_relation_facts() {
            let mut graph = Graph::new();
            let a = graph.add_node(NodeId::iri("http://example.org/a"));
            let value = Value::new("Alice", iri(vocabulary::XSD_STRING));
            let rel = graph.add_relation(a, iri("http://example.org/name"), Object::Value(value));
            let confidence = Value::new("0.9", iri(vocabulary::XSD_DOUBLE));
            graph.attach_fact(rel, iri("http://example.org/confidence"), Object::Value(confidence.clone()));
            graph.attach_fact(rel, iri("http://example.org/confidence"), Object::Value(confidence));
            assert_eq!(graph.relation(rel).facts.len(), 1);
        }

        #[test]
        fn test_insertion_order_is_kept() {
            let mut graph = Graph::new();
            for name in ["c", "a", "b"] {
                graph.add_node(NodeId::iri(format!("http://example.org/{}", name)));
            }
            let order: Vec<String> = graph.nodes().map(|(_, n)| n.id.as_str().to_string()).collect();
            assert_eq!(
                order,
                vec!["http://example.org/c", "http://example.org/a", "http://example.org/b"]
            );
        }
    }

    mod value_tests {
        use super::*;

        fn typed(lexical: &str, datatype: &str) -> Value {
            Value::new(lexical, iri(datatype))
        }

        #[test]
        fn test_value_kinds() {
            assert_eq!(typed("1", vocabulary::XSD_INTEGER).kind(), ValueKind::Integer);
            assert_eq!(typed("x", vocabulary::XSD_STRING).kind(), ValueKind::String);
            assert_eq!(typed("2020-01-01T00:00:00Z", vocabulary::XSD_DATE_TIME).kind(), ValueKind::DateTime);
            assert_eq!(typed("x", "http://example.org/custom").kind(), ValueKind::Other);
        }

        #[test]
        fn test_well_formed_numbers() {
            assert!(typed("42", vocabulary::XSD_INTEGER).is_well_formed());
            assert!(!typed("forty-two", vocabulary::XSD_INTEGER).is_well_formed());
            assert!(!typed("-1", vocabulary::XSD_NON_NEGATIVE_INTEGER).is_well_formed());
            assert!(typed("0.75", vocabulary::XSD_DOUBLE).is_well_formed());
            assert!(typed("1.5e3", vocabulary::XSD_DOUBLE).is_well_formed());
            assert!(!typed("1.5e3", vocabulary::XSD_DECIMAL).is_well_formed());
            assert!(typed("INF", vocabulary::XSD_DOUBLE).is_well_formed());
        }

        #[test]
        fn test_well_formed_dates() {
            assert!(typed("2018-03-01T12:00:00Z", vocabulary::XSD_DATE_TIME).is_well_formed());
            assert!(typed("2018-03-01T12:00:00", vocabulary::XSD_DATE_TIME).is_well_formed());
            assert!(!typed("March 1st", vocabulary::XSD_DATE_TIME).is_well_formed());
            assert!(typed("2018-03-01", vocabulary::XSD_DATE).is_well_formed());
        }

        #[test]
        fn test_display() {
            assert_eq!(typed("x", vocabulary::XSD_STRING).to_string(), "\"x\"");
            assert_eq!(
                typed("1", vocabulary::XSD_INTEGER).to_string(),
                "\"1\"^^<http://www.w3.org/2001/XMLSchema#integer>"
            );
        }
    }
}
