//! 制約検証
//!
//! Validation is a pure function of (graph, rule set). Nodes are visited in
//! graph insertion order with their applicable constraints in declaration
//! order; relations follow, in insertion order, for domain / range checks.

use crate::compile::{CompiledRuleSet, RequirementGroup};
use crate::model::{ConstraintId, ConstraintKind, Path, Severity, ShapeConstraint};
use crate::report::{ValidationReport, Violation};
use itertools::Itertools;
use shapegate_core::vocabulary as vocab;
use shapegate_core::{Graph, Iri, NodeId, NodeIdx, Object, Relation};
use std::collections::BTreeSet;
use tracing::debug;

/// Validation limits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationLimits {
    /// Stop recording after this many records (any severity)
    pub max_violations: Option<usize>,
}

/// Shape validator trait
pub trait ShapeValidator: Send + Sync {
    fn validate(&self, graph: &Graph, rules: &CompiledRuleSet) -> ValidationReport;
}

/// Default shape validator
#[derive(Debug, Clone, Default)]
pub struct DefaultShapeValidator {
    limits: ValidationLimits,
}

impl DefaultShapeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ValidationLimits {
        self.limits
    }
}

impl ShapeValidator for DefaultShapeValidator {
    fn validate(&self, graph: &Graph, rules: &CompiledRuleSet) -> ValidationReport {
        let mut sink = Sink::new(self.limits.max_violations);
        let rdf_type = Iri::parse(vocab::RDF_TYPE).ok();

        // ノード単位の形状制約
        for (idx, node) in graph.nodes() {
            if sink.is_settled() {
                break;
            }
            let types = rules.type_closure(&node.types);
            // 型付けは rdf:type の主語でもある
            let typed = rdf_type.as_ref().filter(|_| !node.types.is_empty());
            let predicates = graph.outgoing(idx).map(|r| &r.predicate).chain(typed);
            let applicable = rules.applicable(&types, predicates);
            for index in applicable {
                let check = Check {
                    graph,
                    rules,
                    focus: idx,
                    types: &types,
                    constraint: &rules.constraints()[index],
                    id: rules.constraint_id(index),
                };
                check.run(&mut sink);
            }
        }

        // リレーション単位の domain / range
        for (_, relation) in graph.relations() {
            if sink.is_settled() {
                break;
            }
            check_relation(graph, rules, relation, &mut sink);
        }

        let report = ValidationReport::with_conformance(sink.violations, sink.truncated, !sink.saw_violation);
        debug!(
            nodes = graph.node_count(),
            relations = graph.relation_count(),
            violations = report.violation_count(),
            warnings = report.warning_count(),
            conforms = report.conforms,
            "graph validated"
        );
        report
    }
}

/// Collects records up to the configured limit. Conformance is tracked
/// over every record, kept or dropped.
struct Sink {
    violations: Vec<Violation>,
    limit: Option<usize>,
    truncated: bool,
    saw_violation: bool,
}

impl Sink {
    fn new(limit: Option<usize>) -> Self {
        Self {
            violations: Vec::new(),
            limit,
            truncated: false,
            saw_violation: false,
        }
    }

    /// Nothing further can change the report
    fn is_settled(&self) -> bool {
        self.truncated && self.saw_violation
    }

    fn push(&mut self, violation: Violation) {
        if violation.severity == Severity::Violation {
            self.saw_violation = true;
        }
        if self.limit.is_some_and(|limit| self.violations.len() >= limit) {
            self.truncated = true;
            return;
        }
        self.violations.push(violation);
    }
}

/// One constraint evaluated against one focus node
struct Check<'a> {
    graph: &'a Graph,
    rules: &'a CompiledRuleSet,
    focus: NodeIdx,
    types: &'a BTreeSet<Iri>,
    constraint: &'a ShapeConstraint,
    id: &'a ConstraintId,
}

impl Check<'_> {
    fn run(&self, sink: &mut Sink) {
        match &self.constraint.kind {
            ConstraintKind::MinCount(min) => {
                let found = self.value_nodes().len() as u64;
                if found < *min {
                    self.report(sink, None, None, format!("expected at least {} value(s), found {}", min, found));
                }
            }
            ConstraintKind::MaxCount(max) => {
                let found = self.value_nodes().len() as u64;
                if found > *max {
                    self.report(sink, None, None, format!("expected at most {} value(s), found {}", max, found));
                }
            }
            ConstraintKind::Datatype(allowed) => {
                for value in self.value_nodes() {
                    let problem = match &value {
                        PathValue::Object(Object::Value(literal)) if !allowed.contains(&literal.datatype) => {
                            Some(format!("datatype {} is not one of {}", literal.datatype, join(allowed)))
                        }
                        PathValue::Object(Object::Value(literal)) if !literal.is_well_formed() => Some(format!(
                            "lexical form \"{}\" is not a valid {}",
                            literal.lexical, literal.datatype
                        )),
                        PathValue::Object(Object::Value(_)) => None,
                        _ => Some(format!("expected a literal of {}", join(allowed))),
                    };
                    if let Some(message) = problem {
                        self.report(sink, None, Some(value.describe(self.graph)), message);
                    }
                }
            }
            ConstraintKind::NodeKind(kind) => {
                for value in self.value_nodes() {
                    let matches = match &value {
                        PathValue::Object(object) => kind.matches(self.graph, object),
                        PathValue::Type(_) => kind.matches_iri(),
                    };
                    if !matches {
                        self.report(
                            sink,
                            None,
                            Some(value.describe(self.graph)),
                            format!("expected node kind {:?}", kind),
                        );
                    }
                }
            }
            ConstraintKind::In(allowed) => {
                for value in self.value_nodes() {
                    let listed = allowed.iter().any(|a| match &value {
                        PathValue::Object(object) => a.matches(self.graph, object),
                        PathValue::Type(ty) => a.matches_iri(ty),
                    });
                    if !listed {
                        self.report(
                            sink,
                            None,
                            Some(value.describe(self.graph)),
                            format!("value is not one of {}", allowed.iter().join(", ")),
                        );
                    }
                }
            }
            ConstraintKind::Class(classes) => {
                for value in self.value_nodes() {
                    let node = match &value {
                        PathValue::Object(Object::Node(idx)) => Some(*idx),
                        PathValue::Object(Object::Value(_)) => None,
                        PathValue::Type(ty) => self.graph.find_node(&NodeId::iri(ty.as_str())),
                    };
                    let is_instance = node.is_some_and(|idx| {
                        let closure = self.rules.type_closure(&self.graph.node(idx).types);
                        classes.iter().any(|c| closure.contains(c))
                    });
                    if !is_instance {
                        self.report(
                            sink,
                            None,
                            Some(value.describe(self.graph)),
                            format!("value is not an instance of {}", join(classes)),
                        );
                    }
                }
            }
            ConstraintKind::Closed { ignored } => {
                for relation in self.graph.outgoing(self.focus) {
                    let predicate = &relation.predicate;
                    let allowed = predicate.as_str() == vocab::RDF_TYPE
                        || ignored.iter().any(|i| self.rules.is_subrelation(predicate, i))
                        || self.rules.is_permitted(self.types, predicate);
                    if !allowed {
                        self.report(
                            sink,
                            Some(predicate.to_string()),
                            Some(self.graph.describe(&relation.object)),
                            format!("predicate {} is not allowed on a closed shape", predicate),
                        );
                    }
                }
            }
        }
    }

    /// Values reached from the focus node along the constraint path; the
    /// focus node itself when there is no path. Along `rdf:type` the values
    /// are asserted types, which are kept on nodes rather than as relations.
    fn value_nodes(&self) -> Vec<PathValue> {
        match &self.constraint.path {
            None => vec![PathValue::Object(Object::Node(self.focus))],
            Some(Path::Forward(predicate)) if predicate.as_str() == vocab::RDF_TYPE => self
                .graph
                .node(self.focus)
                .types
                .iter()
                .cloned()
                .map(PathValue::Type)
                .collect(),
            Some(Path::Inverse(predicate)) if predicate.as_str() == vocab::RDF_TYPE => {
                let focus = &self.graph.node(self.focus).id;
                self.graph
                    .nodes()
                    .filter(|(_, node)| !focus.is_blank() && node.types.iter().any(|t| t.as_str() == focus.as_str()))
                    .map(|(idx, _)| PathValue::Object(Object::Node(idx)))
                    .collect()
            }
            Some(Path::Forward(predicate)) => self
                .graph
                .outgoing(self.focus)
                .filter(|r| self.rules.is_subrelation(&r.predicate, predicate))
                .map(|r| PathValue::Object(r.object.clone()))
                .collect(),
            Some(Path::Inverse(predicate)) => self
                .graph
                .incoming(self.focus)
                .filter(|r| self.rules.is_subrelation(&r.predicate, predicate))
                .map(|r| PathValue::Object(Object::Node(r.subject)))
                .collect(),
        }
    }

    fn report(&self, sink: &mut Sink, path: Option<String>, value: Option<String>, message: String) {
        sink.push(Violation {
            focus: self.graph.node(self.focus).id.clone(),
            path: path.or_else(|| self.constraint.path.as_ref().map(Path::to_string)),
            value,
            constraint: self.id.clone(),
            severity: self.constraint.severity,
            message: self.constraint.message.clone().unwrap_or(message),
        });
    }
}

/// One value on a constraint path
enum PathValue {
    Object(Object),
    /// Asserted type of the focus node
    Type(Iri),
}

impl PathValue {
    fn describe(&self, graph: &Graph) -> String {
        match self {
            PathValue::Object(object) => graph.describe(object),
            PathValue::Type(ty) => format!("<{}>", ty),
        }
    }
}

fn check_relation(graph: &Graph, rules: &CompiledRuleSet, relation: &Relation, sink: &mut Sink) {
    let subject = graph.node(relation.subject);
    let domain = rules.domain_groups(&relation.predicate);
    if !domain.is_empty() {
        let types = rules.type_closure(&subject.types);
        for group in domain.iter().filter(|g| !g.accepts_node(&types)) {
            sink.push(relation_violation(
                graph,
                relation,
                ConstraintId::domain(&group.declared_on),
                None,
                format!("subject {} is not an instance of {}", subject.id, join(&group.declared)),
            ));
        }
    }

    let range = rules.range_groups(&relation.predicate);
    if range.is_empty() {
        return;
    }
    let object_types = match &relation.object {
        Object::Node(idx) => Some(rules.type_closure(&graph.node(*idx).types)),
        Object::Value(_) => None,
    };
    let accepts = |group: &RequirementGroup| match (&relation.object, &object_types) {
        (Object::Node(_), Some(types)) => group.accepts_node(types),
        (Object::Value(value), _) => group.accepts_literal(value),
        (Object::Node(_), None) => false,
    };
    for group in range.iter().filter(|g| !accepts(*g)) {
        sink.push(relation_violation(
            graph,
            relation,
            ConstraintId::range(&group.declared_on),
            Some(&relation.object),
            format!(
                "object {} is not in the range {}",
                graph.describe(&relation.object),
                join(&group.declared)
            ),
        ));
    }
}

fn relation_violation(
    graph: &Graph,
    relation: &Relation,
    constraint: ConstraintId,
    value: Option<&Object>,
    message: String,
) -> Violation {
    Violation {
        focus: graph.node(relation.subject).id.clone(),
        path: Some(relation.predicate.to_string()),
        value: value.map(|v| graph.describe(v)),
        constraint,
        severity: Severity::Violation,
        message,
    }
}

fn join(iris: &[Iri]) -> String {
    iris.iter().map(Iri::as_str).join(" | ")
}
