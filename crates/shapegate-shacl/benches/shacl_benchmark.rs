use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shapegate_core::{parse_graph, Graph, RdfFormat};
use shapegate_shacl::{
    build_rule_set, DefaultShapeValidator, ProfileCatalog, ProfileSelection, ShapeValidator,
    TurtleRuleLoader,
};
use std::fmt::Write;
use std::path::Path;

/// Generate a knowledge base of `size` clustered entities
fn generate_test_data(size: usize) -> Graph {
    let mut ttl = String::from(
        "@prefix aif: <http://shapegate.dev/ns/interchange#> .\n\
         @prefix ldc: <http://shapegate.dev/ns/ldc#> .\n\
         @prefix ex: <http://example.org/kb/> .\n\
         @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .\n\
         ex:system a aif:System .\n",
    );
    let types = ["ldc:PER", "ldc:ORG", "ldc:GPE", "ldc:LOC", "ldc:FAC"];

    for i in 0..size {
        let _ = writeln!(
            ttl,
            "ex:e{i} a {ty} ; aif:system ex:system ; aif:hasName \"Entity {i}\" ; aif:justifiedBy ex:j{i} .\n\
             ex:j{i} a aif:TextJustification ; aif:system ex:system ; aif:source \"doc{doc}\" ;\n\
                 aif:confidence ex:c{i} ; aif:startOffset \"{i}\"^^xsd:int ; aif:endOffsetInclusive \"{end}\"^^xsd:int .\n\
             ex:c{i} a aif:Confidence ; aif:system ex:system ; aif:confidenceValue \"0.5\"^^xsd:double .\n\
             ex:k{i} a aif:Cluster ; aif:system ex:system ; aif:prototype ex:e{i} .\n\
             ex:m{i} a aif:ClusterMembership ; aif:system ex:system ; aif:cluster ex:k{i} ; aif:clusterMember ex:e{i} .",
            ty = types[i % types.len()],
            doc = i % 10,
            end = i + 5,
        );

        // 一部のエンティティは名前を二つ持つ (警告)
        if i % 7 == 0 {
            let _ = writeln!(ttl, "ex:e{i} aif:hasName \"Alias {i}\" .");
        }
    }

    parse_graph(&ttl, RdfFormat::Turtle, Path::new("bench.ttl")).expect("benchmark data parses")
}

fn bench_validation(c: &mut Criterion) {
    let rules = build_rule_set(
        &ProfileSelection::base("ldc").with_restricted(),
        &ProfileCatalog::builtin(),
        &TurtleRuleLoader,
    )
    .expect("built-in profiles compile");
    let validator = DefaultShapeValidator::new();

    let mut group = c.benchmark_group("shape_validation");
    for size in [100, 1_000, 5_000] {
        let graph = generate_test_data(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &graph, |b, graph| {
            b.iter(|| validator.validate(black_box(graph), black_box(&rules)))
        });
    }
    group.finish();
}

fn bench_compilation(c: &mut Criterion) {
    let catalog = ProfileCatalog::builtin();
    let selection = ProfileSelection::base("ldc").with_restricted().with_restricted_strict();
    c.bench_function("compile_builtin_profiles", |b| {
        b.iter(|| build_rule_set(black_box(&selection), &catalog, &TurtleRuleLoader))
    });
}

criterion_group!(benches, bench_validation, bench_compilation);
criterion_main!(benches);
