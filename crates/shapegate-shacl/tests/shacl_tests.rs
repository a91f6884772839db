// Built-in profile validation tests

use shapegate_core::{parse_graph, Graph, RdfFormat};
use shapegate_shacl::{
    build_rule_set, BuildError, CompiledRuleSet, DefaultShapeValidator, ProfileCatalog,
    ProfileSelection, RuleError, Severity, ShapeValidator, TurtleRuleLoader,
};
use std::path::Path;

const PREFIXES: &str = r#"
@prefix aif:  <http://shapegate.dev/ns/interchange#> .
@prefix ldc:  <http://shapegate.dev/ns/ldc#> .
@prefix prog: <http://shapegate.dev/ns/program#> .
@prefix ex:   <http://example.org/kb/> .
@prefix xsd:  <http://www.w3.org/2001/XMLSchema#> .
"#;

/// One clustered, justified entity
fn knowledge_base(entity_type: &str, with_confidence: bool) -> Graph {
    let confidence = if with_confidence { "aif:confidence ex:conf1 ;" } else { "" };
    let body = format!(
        r#"
        ex:system a aif:System .

        ex:entity1 a {entity_type} ;
            aif:system ex:system ;
            aif:hasName "Vladimir" ;
            aif:justifiedBy ex:just1 .

        ex:just1 a aif:TextJustification ;
            aif:system ex:system ;
            aif:source "doc-0001" ;
            {confidence}
            aif:startOffset "0"^^xsd:int ;
            aif:endOffsetInclusive "7"^^xsd:int .

        ex:conf1 a aif:Confidence ;
            aif:system ex:system ;
            aif:confidenceValue "0.9"^^xsd:double .

        ex:cluster1 a aif:Cluster ;
            aif:system ex:system ;
            aif:prototype ex:entity1 .

        ex:membership1 a aif:ClusterMembership ;
            aif:system ex:system ;
            aif:cluster ex:cluster1 ;
            aif:clusterMember ex:entity1 .
        "#
    );
    parse_graph(&format!("{}{}", PREFIXES, body), RdfFormat::Turtle, Path::new("kb.ttl")).unwrap()
}

fn rules(selection: ProfileSelection) -> CompiledRuleSet {
    build_rule_set(&selection, &ProfileCatalog::builtin(), &TurtleRuleLoader).unwrap()
}

#[test]
fn test_valid_kb_conforms_under_every_layer() {
    let graph = knowledge_base("ldc:PER", true);
    let selections = [
        ProfileSelection::base("ldc"),
        ProfileSelection::base("ldc").with_restricted(),
        ProfileSelection::base("ldc").with_restricted().with_restricted_strict(),
    ];
    for selection in selections {
        let report = DefaultShapeValidator::new().validate(&graph, &rules(selection.clone()));
        assert!(report.conforms, "{:?}\n{}", selection, report.to_simple_string());
        assert!(report.violations.is_empty(), "{}", report.to_simple_string());
    }
}

#[test]
fn test_program_profile_uses_its_own_types() {
    let graph = knowledge_base("prog:Person", true);
    let report = DefaultShapeValidator::new().validate(&graph, &rules(ProfileSelection::base("program")));
    assert!(report.conforms, "{}", report.to_simple_string());

    // LDC 型は program プロファイルでは宣言されていない
    let graph = knowledge_base("ldc:PER", true);
    let report = DefaultShapeValidator::new().validate(&graph, &rules(ProfileSelection::base("program")));
    assert!(!report.conforms);
}

#[test]
fn test_restricted_min_count_overrides_base() {
    let graph = knowledge_base("ldc:PER", false);

    let base = DefaultShapeValidator::new().validate(&graph, &rules(ProfileSelection::base("ldc")));
    assert!(base.conforms, "{}", base.to_simple_string());

    let restricted = DefaultShapeValidator::new()
        .validate(&graph, &rules(ProfileSelection::base("ldc").with_restricted()));
    assert!(!restricted.conforms);
    assert_eq!(restricted.violations.len(), 1);
    let violation = &restricted.violations[0];
    assert_eq!(violation.focus.as_str(), "http://example.org/kb/just1");
    assert_eq!(violation.message, "justifications must carry a confidence");
    assert!(violation.constraint.as_str().ends_with("/minCount"));
}

#[test]
fn test_argument_range_violation() {
    let body = r#"
        ex:system a aif:System .
        ex:just a aif:TextJustification ; aif:system ex:system ; aif:source "d" ;
            aif:startOffset "1"^^xsd:int ; aif:endOffsetInclusive "2"^^xsd:int .
        ex:city a ldc:LOC ; aif:system ex:system ; aif:justifiedBy ex:just .
        ex:attack a ldc:ConflictAttack ; aif:system ex:system ; aif:justifiedBy ex:just ;
            ldc:attacker ex:city .
    "#;
    let graph = parse_graph(&format!("{}{}", PREFIXES, body), RdfFormat::Turtle, Path::new("a.ttl")).unwrap();
    let report = DefaultShapeValidator::new().validate(&graph, &rules(ProfileSelection::base("ldc")));

    let ids: Vec<&str> = report.violations.iter().map(|v| v.constraint.as_str()).collect();
    assert_eq!(ids, vec!["http://shapegate.dev/ns/ldc#attacker/range"]);
    assert_eq!(report.violations[0].severity, Severity::Violation);
}

#[test]
fn test_unclustered_elements_fail_restricted() {
    let body = r#"
        ex:system a aif:System .
        ex:just a aif:TextJustification ; aif:system ex:system ; aif:source "d" ;
            aif:confidence ex:conf ;
            aif:startOffset "1"^^xsd:int ; aif:endOffsetInclusive "2"^^xsd:int .
        ex:conf a aif:Confidence ; aif:confidenceValue "1.0"^^xsd:double .
        ex:person a ldc:PER ; aif:system ex:system ; aif:justifiedBy ex:just ;
            aif:hasName "A" , "B" .
    "#;
    let graph = parse_graph(&format!("{}{}", PREFIXES, body), RdfFormat::Turtle, Path::new("b.ttl")).unwrap();
    let report = DefaultShapeValidator::new()
        .validate(&graph, &rules(ProfileSelection::base("ldc").with_restricted()));

    assert!(!report.conforms);
    assert_eq!(report.violation_count(), 1);
    assert_eq!(report.warning_count(), 1);
    assert_eq!(report.violations[0].message, "element is not a member of any cluster");
}

#[test]
fn test_custom_sources_with_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cyclic.ttl");
    std::fs::write(
        &path,
        r#"
        @prefix ex: <http://example.org/> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        ex:A rdfs:subClassOf ex:B .
        ex:B rdfs:subClassOf ex:C .
        ex:C rdfs:subClassOf ex:A .
        "#,
    )
    .unwrap();

    let err = build_rule_set(
        &ProfileSelection::custom(vec![path]),
        &ProfileCatalog::builtin(),
        &TurtleRuleLoader,
    )
    .unwrap_err();
    match err {
        BuildError::Rule(RuleError::CyclicTypeHierarchy { cycle }) => {
            assert_eq!(cycle.len(), 4);
            assert_eq!(cycle.first(), cycle.last());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_missing_custom_source() {
    let err = build_rule_set(
        &ProfileSelection::custom(vec!["/definitely/not/here.ttl".into()]),
        &ProfileCatalog::builtin(),
        &TurtleRuleLoader,
    )
    .unwrap_err();
    assert!(matches!(err, BuildError::Rule(RuleError::SourceUnreadable { .. })));
}
