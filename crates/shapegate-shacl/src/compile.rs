//! ルールコンパイル
//!
//! Merges the profiles of one run, in layering order, into a single
//! immutable [`CompiledRuleSet`]:
//! 1. type / relation hierarchies (cycle checked)
//! 2. domain / range requirement groups, resolved to downward closures
//! 3. shape constraints keyed by (target, path, kind); later layers win
//! 4. every constraint target must be declared

use crate::model::{ConstraintId, ConstraintKey, Path, RelationDefinition, RuleProfile, ShapeConstraint, Target};
use crate::RuleError;
use indexmap::IndexMap;
use shapegate_core::vocabulary as vocab;
use shapegate_core::{Iri, Value};
use shapegate_rdfs::{Hierarchy, HierarchyClosure};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::iter;
use tracing::info;

/// One domain (or range) declaration that applies to a relation, either its
/// own or inherited from a super-relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementGroup {
    /// Relation carrying the declaration
    pub declared_on: Iri,
    pub declared: Vec<Iri>,
    /// `declared` plus every subtype
    pub allowed: BTreeSet<Iri>,
}

impl RequirementGroup {
    fn resolve(declared_on: &Iri, declared: &[Iri], types: &HierarchyClosure) -> Self {
        Self {
            declared_on: declared_on.clone(),
            declared: declared.to_vec(),
            allowed: types.downward_closure(declared),
        }
    }

    /// `owl:Thing` / `rdfs:Resource` accept every node
    pub fn accepts_any_node(&self) -> bool {
        self.declared
            .iter()
            .any(|t| matches!(t.as_str(), vocab::OWL_THING | vocab::RDFS_RESOURCE))
    }

    /// Node whose type closure is `types`
    pub fn accepts_node(&self, types: &BTreeSet<Iri>) -> bool {
        self.accepts_any_node() || types.iter().any(|t| self.allowed.contains(t))
    }

    /// Literal objects only match datatype names (xsd namespace or rdfs:Literal)
    pub fn accepts_literal(&self, value: &Value) -> bool {
        self.declared.iter().any(|t| {
            t.as_str() == vocab::RDFS_LITERAL
                || (t.in_namespace(vocab::XSD) && *t == value.datatype)
                || (t.as_str() == vocab::XSD_STRING && value.datatype.as_str() == vocab::RDF_LANG_STRING)
        })
    }
}

/// Immutable result of compiling the selected profiles. Shared read-only
/// by every validation task.
#[derive(Debug, Clone)]
pub struct CompiledRuleSet {
    profiles: Vec<String>,
    types: HierarchyClosure,
    relations: HierarchyClosure,
    domains: HashMap<Iri, Vec<RequirementGroup>>,
    ranges: HashMap<Iri, Vec<RequirementGroup>>,
    constraints: Vec<ShapeConstraint>,
    ids: Vec<ConstraintId>,
    by_type: HashMap<Iri, Vec<usize>>,
    by_relation: HashMap<Iri, Vec<usize>>,
    /// type -> predicates named by forward paths of constraints on that type
    permitted: HashMap<Iri, BTreeSet<Iri>>,
}

impl CompiledRuleSet {
    /// Names of the merged profiles, in layering order
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    /// Constraints in declaration order
    pub fn constraints(&self) -> &[ShapeConstraint] {
        &self.constraints
    }

    pub fn constraint_id(&self, index: usize) -> &ConstraintId {
        &self.ids[index]
    }

    pub fn has_type(&self, ty: &Iri) -> bool {
        self.types.contains(ty)
    }

    pub fn has_relation(&self, relation: &Iri) -> bool {
        self.relations.contains(relation)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Asserted types plus all their ancestors
    pub fn type_closure<'a>(&self, asserted: impl IntoIterator<Item = &'a Iri>) -> BTreeSet<Iri> {
        self.types.upward_closure(asserted)
    }

    /// `sub` is `sup` or one of its subrelations
    pub fn is_subrelation(&self, sub: &Iri, sup: &Iri) -> bool {
        self.relations.is_sub_of(sub, sup)
    }

    pub fn domain_groups(&self, relation: &Iri) -> &[RequirementGroup] {
        self.domains.get(relation).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn range_groups(&self, relation: &Iri) -> &[RequirementGroup] {
        self.ranges.get(relation).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Indices of constraints applying to a node with type closure `types`
    /// and outgoing relations `predicates`, in declaration order.
    pub fn applicable<'a>(
        &self,
        types: &BTreeSet<Iri>,
        predicates: impl IntoIterator<Item = &'a Iri>,
    ) -> Vec<usize> {
        let mut indices: Vec<usize> = types
            .iter()
            .filter_map(|ty| self.by_type.get(ty))
            .flatten()
            .copied()
            .collect();

        if !self.by_relation.is_empty() {
            for predicate in predicates {
                for relation in self.relations.upward_closure([predicate]) {
                    if let Some(found) = self.by_relation.get(&relation) {
                        indices.extend(found.iter().copied());
                    }
                }
            }
        }

        indices.sort_unstable();
        indices.dedup();

        // 複数ターゲットの形状は同じ ID を共有する
        let mut seen = HashSet::new();
        indices.retain(|&index| seen.insert(&self.ids[index]));
        indices
    }

    /// Whether a constraint on one of `types` names `predicate` (or one of its
    /// super-relations) as a forward path.
    pub fn is_permitted(&self, types: &BTreeSet<Iri>, predicate: &Iri) -> bool {
        let upward = self.relations.upward_closure([predicate]);
        types.iter().any(|ty| {
            self.permitted
                .get(ty)
                .map(|allowed| upward.iter().any(|p| allowed.contains(p)))
                .unwrap_or(false)
        })
    }
}

/// Compiles profiles into a [`CompiledRuleSet`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleCompiler;

impl RuleCompiler {
    /// `profiles` must be in layering order (base first).
    pub fn compile(profiles: &[RuleProfile]) -> Result<CompiledRuleSet, RuleError> {
        let mut type_hierarchy = Hierarchy::new();
        for ty in profiles.iter().flat_map(|p| &p.types) {
            type_hierarchy.add_member(ty.id.clone());
            for parent in &ty.parents {
                type_hierarchy.add_parent(ty.id.clone(), parent.clone());
            }
        }

        let definitions = merge_relations(profiles);
        let mut relation_hierarchy = Hierarchy::new();
        for relation in definitions.values() {
            relation_hierarchy.add_member(relation.id.clone());
            for parent in &relation.parents {
                relation_hierarchy.add_parent(relation.id.clone(), parent.clone());
            }
        }

        let types = type_hierarchy
            .close()
            .map_err(|e| RuleError::CyclicTypeHierarchy { cycle: e.cycle })?;
        let relations = relation_hierarchy
            .close()
            .map_err(|e| RuleError::CyclicRelationHierarchy { cycle: e.cycle })?;

        let mut domains = HashMap::new();
        let mut ranges = HashMap::new();
        for relation in definitions.keys() {
            let mut domain = Vec::new();
            let mut range = Vec::new();
            for declaring in iter::once(relation).chain(relations.ancestors(relation)) {
                let Some(definition) = definitions.get(declaring) else {
                    continue;
                };
                if !definition.domain.is_empty() {
                    domain.push(RequirementGroup::resolve(declaring, &definition.domain, &types));
                }
                if !definition.range.is_empty() {
                    range.push(RequirementGroup::resolve(declaring, &definition.range, &types));
                }
            }
            if !domain.is_empty() {
                domains.insert(relation.clone(), domain);
            }
            if !range.is_empty() {
                ranges.insert(relation.clone(), range);
            }
        }

        let mut merged: IndexMap<ConstraintKey, ShapeConstraint> = IndexMap::new();
        for constraint in profiles.iter().flat_map(|p| &p.constraints) {
            // 既存キーは位置を保ったまま値だけ置き換わる
            merged.insert(constraint.key(), constraint.clone());
        }
        let constraints: Vec<ShapeConstraint> = merged.into_values().collect();

        for constraint in &constraints {
            let declared = match &constraint.target {
                Target::Type(ty) => types.contains(ty),
                Target::SubjectsOf(relation) => {
                    relations.contains(relation) || relation.as_str() == vocab::RDF_TYPE
                }
            };
            if !declared {
                return Err(RuleError::UnknownTarget {
                    constraint: constraint.id(),
                    target: constraint.target.iri().clone(),
                });
            }
        }

        let mut by_type: HashMap<Iri, Vec<usize>> = HashMap::new();
        let mut by_relation: HashMap<Iri, Vec<usize>> = HashMap::new();
        let mut permitted: HashMap<Iri, BTreeSet<Iri>> = HashMap::new();
        for (index, constraint) in constraints.iter().enumerate() {
            match &constraint.target {
                Target::Type(ty) => {
                    by_type.entry(ty.clone()).or_default().push(index);
                    if let Some(Path::Forward(predicate)) = &constraint.path {
                        permitted.entry(ty.clone()).or_default().insert(predicate.clone());
                    }
                }
                Target::SubjectsOf(relation) => {
                    by_relation.entry(relation.clone()).or_default().push(index);
                }
            }
        }

        let ids = constraints.iter().map(ShapeConstraint::id).collect();
        let compiled = CompiledRuleSet {
            profiles: profiles.iter().map(|p| p.name.clone()).collect(),
            types,
            relations,
            domains,
            ranges,
            constraints,
            ids,
            by_type,
            by_relation,
            permitted,
        };

        info!(
            profiles = ?compiled.profiles,
            types = compiled.type_count(),
            relations = compiled.relation_count(),
            constraints = compiled.constraints.len(),
            "rule set compiled"
        );
        Ok(compiled)
    }
}

/// Union relation definitions across profiles: parents accumulate, a later
/// non-empty domain / range replaces the earlier one.
fn merge_relations(profiles: &[RuleProfile]) -> IndexMap<Iri, RelationDefinition> {
    let mut merged: IndexMap<Iri, RelationDefinition> = IndexMap::new();
    for relation in profiles.iter().flat_map(|p| &p.relations) {
        match merged.get_mut(&relation.id) {
            Some(existing) => {
                for parent in &relation.parents {
                    if !existing.parents.contains(parent) {
                        existing.parents.push(parent.clone());
                    }
                }
                if !relation.domain.is_empty() {
                    existing.domain = relation.domain.clone();
                }
                if !relation.range.is_empty() {
                    existing.range = relation.range.clone();
                }
            }
            None => {
                merged.insert(relation.id.clone(), relation.clone());
            }
        }
    }
    merged
}
