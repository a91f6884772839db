//! Tests for the shapegate CLI

use clap::Parser;
use shapegate_cli::commands::{Cli, CommandExecutor, OutputFormat};
use std::path::{Path, PathBuf};

const VALID_KB: &str = r#"
@prefix aif: <http://shapegate.dev/ns/interchange#> .
@prefix ldc: <http://shapegate.dev/ns/ldc#> .
@prefix ex:  <http://example.org/kb/> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

ex:system a aif:System .
ex:alice a ldc:PER ; aif:system ex:system ; aif:justifiedBy ex:just .
ex:just a aif:TextJustification ; aif:system ex:system ; aif:source "doc" ;
    aif:startOffset "0"^^xsd:int ; aif:endOffsetInclusive "4"^^xsd:int .
"#;

const INVALID_KB: &str = r#"
@prefix aif: <http://shapegate.dev/ns/interchange#> .
@prefix ldc: <http://shapegate.dev/ns/ldc#> .
@prefix ex:  <http://example.org/kb/> .

ex:alice a ldc:PER .
"#;

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn parse(args: Vec<String>) -> Cli {
    Cli::try_parse_from(std::iter::once("shapegate".to_string()).chain(args)).unwrap()
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_cli_parsing_defaults() {
    let cli = parse(args(&["--ldc", "-f", "kb.ttl"]));
    assert!(cli.ldc);
    assert_eq!(cli.files, vec![PathBuf::from("kb.ttl")]);
    assert_eq!(cli.format, OutputFormat::Text);
    assert_eq!(cli.threads, None);
    assert!(!cli.output);
}

#[test]
fn test_cli_invalid_args() {
    assert!(Cli::try_parse_from(["shapegate", "--ldc", "--format", "xml"]).is_err());
    assert!(Cli::try_parse_from(["shapegate", "--ldc", "-t", "many"]).is_err());
}

#[tokio::test]
async fn test_conforming_files_exit_zero() {
    let dir = tempfile::tempdir().unwrap();
    let kb = write(dir.path(), "kb.ttl", VALID_KB);

    let cli = parse(vec!["--ldc".into(), "-f".into(), kb.display().to_string()]);
    let result = CommandExecutor::new().execute(&cli).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert!(result.success());
    assert!(result.output.contains("CONFORMS"));
    assert!(result.output.contains("Summary: 1 inputs, 1 conformant"));
}

#[tokio::test]
async fn test_violations_exit_one() {
    let dir = tempfile::tempdir().unwrap();
    let kb = write(dir.path(), "kb.ttl", INVALID_KB);

    let cli = parse(vec![
        "--ldc".into(),
        "--format".into(),
        "json".into(),
        "-f".into(),
        kb.display().to_string(),
    ]);
    let result = CommandExecutor::new().execute(&cli).await.unwrap();

    assert_eq!(result.exit_code, 1);
    let data = result.data.unwrap();
    assert_eq!(data["outcome"], "validation_error");
    assert_eq!(data["inputs"][0]["status"], "does_not_conform");
    assert!(data["summary"]["violations"].as_u64().unwrap() >= 1);

    let printed: serde_json::Value = serde_json::from_str(&result.output).unwrap();
    assert_eq!(printed["exit_code"], 1);
}

#[tokio::test]
async fn test_ambiguous_profiles_exit_two_before_reading_inputs() {
    let cli = parse(args(&["--ldc", "--program", "-f", "/does/not/exist.ttl"]));
    let result = CommandExecutor::new().execute(&cli).await.unwrap();

    assert_eq!(result.exit_code, 2);
    assert!(result.error.unwrap().contains("more than one base profile"));
    assert!(result.output.is_empty());
}

#[tokio::test]
async fn test_usage_errors_exit_two() {
    let no_profile = parse(args(&["-f", "kb.ttl"]));
    assert_eq!(CommandExecutor::new().execute(&no_profile).await.unwrap().exit_code, 2);

    let strict_alone = parse(args(&["--ldc", "--nist-ta3", "-f", "kb.ttl"]));
    assert_eq!(CommandExecutor::new().execute(&strict_alone).await.unwrap().exit_code, 2);

    let no_inputs = parse(args(&["--ldc"]));
    assert_eq!(CommandExecutor::new().execute(&no_inputs).await.unwrap().exit_code, 2);
}

#[tokio::test]
async fn test_missing_inputs_exit_two_before_loading_rules() {
    let cli = parse(args(&["--ont", "/does/not/exist/rules.ttl"]));
    let result = CommandExecutor::new().execute(&cli).await.unwrap();

    assert_eq!(result.exit_code, 2);
    let error = result.error.unwrap();
    assert!(error.contains("no input files"));
    assert!(!error.contains("rules.ttl"));
}

#[tokio::test]
async fn test_rule_source_failure_exits_three() {
    let dir = tempfile::tempdir().unwrap();
    let ontology = write(
        dir.path(),
        "cyclic.ttl",
        r#"
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        @prefix ex: <http://example.org/> .
        ex:A rdfs:subClassOf ex:B .
        ex:B rdfs:subClassOf ex:A .
        "#,
    );
    let kb = write(dir.path(), "kb.ttl", VALID_KB);

    let cli = parse(vec![
        "--ont".into(),
        ontology.display().to_string(),
        "-f".into(),
        kb.display().to_string(),
    ]);
    let result = CommandExecutor::new().execute(&cli).await.unwrap();

    assert_eq!(result.exit_code, 3);
    assert!(result.error.unwrap().contains("cyclic type hierarchy"));
}

#[tokio::test]
async fn test_directory_with_malformed_file_exits_three() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.ttl", VALID_KB);
    write(dir.path(), "b.ttl", "not turtle at all <");
    write(dir.path(), "c.ttl", VALID_KB);

    let cli = parse(vec!["--ldc".into(), "-d".into(), dir.path().display().to_string()]);
    let result = CommandExecutor::new().execute(&cli).await.unwrap();

    assert_eq!(result.exit_code, 3);
    assert!(result.output.contains("FAILED"));
    assert!(result.output.contains("2 conformant"));
}

#[tokio::test]
async fn test_report_files_next_to_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let kb = write(dir.path(), "kb.ttl", INVALID_KB);

    let cli = parse(vec!["--ldc".into(), "-o".into(), "-f".into(), kb.display().to_string()]);
    let result = CommandExecutor::new().execute(&cli).await.unwrap();

    assert_eq!(result.exit_code, 1);
    let report = std::fs::read_to_string(dir.path().join("kb-report.txt")).unwrap();
    assert!(report.contains("DOES NOT CONFORM"));
}

#[tokio::test]
async fn test_custom_catalog() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "people.ttl",
        r#"
        @prefix owl: <http://www.w3.org/2002/07/owl#> .
        @prefix sh:  <http://www.w3.org/ns/shacl#> .
        @prefix ex:  <http://example.org/> .
        ex:Person a owl:Class, sh:NodeShape ;
            sh:property [ sh:path ex:name ; sh:minCount 1 ] .
        "#,
    );
    let catalog = write(dir.path(), "catalog.json", r#"{ "base": { "people": ["people.ttl"] } }"#);
    let kb = write(
        dir.path(),
        "kb.ttl",
        "@prefix ex: <http://example.org/> .\nex:bob a ex:Person .\n",
    );

    let cli = parse(vec![
        "--catalog".into(),
        catalog.display().to_string(),
        "--profile".into(),
        "people".into(),
        "-f".into(),
        kb.display().to_string(),
    ]);
    let result = CommandExecutor::new().execute(&cli).await.unwrap();
    assert_eq!(result.exit_code, 1);

    // 組み込みプロファイル名はカスタムカタログにはない
    let cli = parse(vec![
        "--catalog".into(),
        catalog.display().to_string(),
        "--ldc".into(),
        "-f".into(),
        kb.display().to_string(),
    ]);
    let result = CommandExecutor::new().execute(&cli).await.unwrap();
    assert_eq!(result.exit_code, 2);
    assert!(result.error.unwrap().contains("unknown profile"));
}
