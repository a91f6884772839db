//! RDFS 階層の推移的閉包
//!
//! このクレートはルールコンパイラが使う階層計算を提供します:
//! - rdfs:subClassOf / rdfs:subPropertyOf の DAG 構築
//! - 循環検出 (循環経路を返す)
//! - 上位 (ancestors) / 下位 (descendants) の推移的閉包

use itertools::Itertools;
use shapegate_core::Iri;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Cycle found while closing a hierarchy. `cycle` starts and ends with the
/// same member.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("cycle: {}", .cycle.iter().map(|i| i.as_str()).join(" -> "))]
pub struct CycleError {
    pub cycle: Vec<Iri>,
}

/// Direct parent edges of a hierarchy (classes or relations)
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    parents: BTreeMap<Iri, BTreeSet<Iri>>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member with no parents (yet)
    pub fn add_member(&mut self, member: Iri) {
        self.parents.entry(member).or_default();
    }

    /// `child` is a direct sub-member of `parent`. Self references are ignored.
    pub fn add_parent(&mut self, child: Iri, parent: Iri) {
        self.parents.entry(parent.clone()).or_default();
        if child != parent {
            self.parents.entry(child).or_default().insert(parent);
        }
    }

    pub fn contains(&self, member: &Iri) -> bool {
        self.parents.contains_key(member)
    }

    pub fn members(&self) -> impl Iterator<Item = &Iri> {
        self.parents.keys()
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// First cycle found by a depth-first walk in member order
    pub fn find_cycle(&self) -> Option<Vec<Iri>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Active,
            Done,
        }

        fn visit<'a>(
            member: &'a Iri,
            parents: &'a BTreeMap<Iri, BTreeSet<Iri>>,
            marks: &mut HashMap<&'a Iri, Mark>,
            path: &mut Vec<&'a Iri>,
        ) -> Option<Vec<Iri>> {
            match marks.get(member) {
                Some(Mark::Done) => return None,
                Some(Mark::Active) => {
                    let start = path.iter().position(|m| *m == member).unwrap_or(0);
                    let mut cycle: Vec<Iri> = path[start..].iter().map(|m| (*m).clone()).collect();
                    cycle.push(member.clone());
                    return Some(cycle);
                }
                None => {}
            }

            marks.insert(member, Mark::Active);
            path.push(member);
            if let Some(direct) = parents.get(member) {
                for parent in direct {
                    if let Some(cycle) = visit(parent, parents, marks, path) {
                        return Some(cycle);
                    }
                }
            }
            path.pop();
            marks.insert(member, Mark::Done);
            None
        }

        let mut marks = HashMap::new();
        let mut path = Vec::new();
        self.parents
            .keys()
            .find_map(|member| visit(member, &self.parents, &mut marks, &mut path))
    }

    /// Check acyclicity and compute ancestor / descendant closures
    pub fn close(&self) -> Result<HierarchyClosure, CycleError> {
        if let Some(cycle) = self.find_cycle() {
            return Err(CycleError { cycle });
        }

        let mut ancestors: HashMap<Iri, BTreeSet<Iri>> = self
            .parents
            .iter()
            .map(|(member, direct)| (member.clone(), direct.clone()))
            .collect();

        // 不動点まで反復 (acyclic なので必ず停止する)
        let mut changed = true;
        while changed {
            changed = false;
            for (member, direct) in &self.parents {
                let mut inherited = BTreeSet::new();
                for parent in direct {
                    if let Some(grand_parents) = ancestors.get(parent) {
                        inherited.extend(grand_parents.iter().cloned());
                    }
                }
                if let Some(all) = ancestors.get_mut(member) {
                    let before = all.len();
                    all.extend(inherited);
                    changed |= all.len() != before;
                }
            }
        }

        let mut descendants: HashMap<Iri, BTreeSet<Iri>> = HashMap::new();
        for (member, above) in &ancestors {
            for ancestor in above {
                descendants
                    .entry(ancestor.clone())
                    .or_default()
                    .insert(member.clone());
            }
        }

        Ok(HierarchyClosure {
            ancestors,
            descendants,
        })
    }
}

/// Transitive closure of an acyclic hierarchy. Closures are strict (a member
/// is not its own ancestor); the `*_or_self` helpers add the member back.
#[derive(Debug, Clone, Default)]
pub struct HierarchyClosure {
    ancestors: HashMap<Iri, BTreeSet<Iri>>,
    descendants: HashMap<Iri, BTreeSet<Iri>>,
}

impl HierarchyClosure {
    pub fn contains(&self, member: &Iri) -> bool {
        self.ancestors.contains_key(member)
    }

    pub fn ancestors(&self, member: &Iri) -> impl Iterator<Item = &Iri> {
        self.ancestors.get(member).into_iter().flatten()
    }

    pub fn descendants(&self, member: &Iri) -> impl Iterator<Item = &Iri> {
        self.descendants.get(member).into_iter().flatten()
    }

    /// `sub` equals `sup` or lies below it
    pub fn is_sub_of(&self, sub: &Iri, sup: &Iri) -> bool {
        sub == sup
            || self
                .ancestors
                .get(sub)
                .map(|above| above.contains(sup))
                .unwrap_or(false)
    }

    /// Members plus every ancestor. Unknown members map to themselves.
    pub fn upward_closure<'a>(&self, members: impl IntoIterator<Item = &'a Iri>) -> BTreeSet<Iri> {
        let mut closed = BTreeSet::new();
        for member in members {
            closed.insert(member.clone());
            closed.extend(self.ancestors(member).cloned());
        }
        closed
    }

    /// Members plus every descendant. Unknown members map to themselves.
    pub fn downward_closure<'a>(&self, members: impl IntoIterator<Item = &'a Iri>) -> BTreeSet<Iri> {
        let mut closed = BTreeSet::new();
        for member in members {
            closed.insert(member.clone());
            closed.extend(self.descendants(member).cloned());
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.ancestors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ancestors.is_empty()
    }
}
