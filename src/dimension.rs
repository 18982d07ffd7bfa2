//! Dimensions: hypercubes, dimensions, domain-member networks, and the
//! `all`/`notAll` validation query a fact's context is checked against.

use crate::dts::Dts;
use crate::error::{Error, Result, TaxonomyCreationError};
use crate::ids::ConceptId;
use crate::xlink::{arcrole, ContextElement};
use ahash::AHashMap;
use compact_str::CompactString;
use indexmap::{IndexMap, IndexSet};

/// A resolved dimension member: an explicit-dimension locator's concept,
/// or a typed dimension's raw content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DimensionMember {
    Explicit(ConceptId),
    Typed(CompactString),
}

#[derive(Debug, Clone)]
pub struct SingleDimensionType {
    pub dimension: ConceptId,
    pub member: DimensionMember,
}

/// A dimensional combination: zero or more `(dimension, member)` pairs.
/// Used both for a hypercube's declared allowed combinations and for the
/// actual members found in an instance context's segment/scenario.
///
/// Equality and hashing are always computed over dimensions in canonical
/// (sorted-by-id) order, so a combination assembled by `shuffle`-ing one
/// discovery order compares equal to the same combination discovered in
/// another order.
#[derive(Debug, Clone, Default)]
pub struct MultipleDimensionType {
    dims: IndexMap<ConceptId, SingleDimensionType>,
}

impl MultipleDimensionType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_predecessor_dimension_domain(&mut self, dimension: ConceptId, member: DimensionMember) {
        self.dims.insert(dimension, SingleDimensionType { dimension, member });
    }

    pub fn contains_dimension(&self, dimension: ConceptId) -> bool {
        self.dims.contains_key(&dimension)
    }

    pub fn get_single_dimension_type(&self, dimension: ConceptId) -> Option<&SingleDimensionType> {
        self.dims.get(&dimension)
    }

    pub fn get_all_dimension_domain_map(&self) -> &IndexMap<ConceptId, SingleDimensionType> {
        &self.dims
    }

    /// Returns a copy with `dimension` set to `member`, added or replaced.
    pub fn activate(&self, dimension: ConceptId, member: DimensionMember) -> Self {
        let mut next = self.clone();
        next.dims.insert(dimension, SingleDimensionType { dimension, member });
        next
    }

    /// Semantically identical to `activate`: replaces an existing
    /// dimension's member rather than adding a new one.
    pub fn override_dimension(&self, dimension: ConceptId, member: DimensionMember) -> Self {
        self.activate(dimension, member)
    }

    /// Canonicalize dimension order (sorted by `ConceptId`) so two
    /// combinations discovered via different traversal orders compare
    /// equal.
    pub fn shuffle(&self) -> Self {
        let mut entries: Vec<_> = self.dims.values().cloned().collect();
        entries.sort_by_key(|s| s.dimension);
        let mut dims = IndexMap::new();
        for e in entries {
            dims.insert(e.dimension, e);
        }
        Self { dims }
    }
}

impl PartialEq for MultipleDimensionType {
    fn eq(&self, other: &Self) -> bool {
        if self.dims.len() != other.dims.len() {
            return false;
        }
        let a = self.shuffle();
        let b = other.shuffle();
        a.dims.values().zip(b.dims.values()).all(|(x, y)| x.dimension == y.dimension && x.member == y.member)
    }
}
impl Eq for MultipleDimensionType {}

impl std::hash::Hash for MultipleDimensionType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for s in self.shuffle().dims.values() {
            s.dimension.hash(state);
            s.member.hash(state);
        }
    }
}

/// One dimension: its domain (explicit members with their `usable` flag),
/// or nothing but its typed-ness (typed dimensions have no domain-member
/// network, only a `typedDomainRef`).
#[derive(Debug, Clone, Default)]
pub struct Dimension {
    pub concept: ConceptId,
    pub is_typed: bool,
    domain: IndexMap<ConceptId, bool>,
}

impl Dimension {
    pub fn contains_usable_dimension_domain(&self, member: ConceptId) -> bool {
        self.domain.get(&member).copied().unwrap_or(false)
    }

    pub fn domain_members(&self) -> impl Iterator<Item = ConceptId> + '_ {
        self.domain.keys().copied()
    }
}

/// One hypercube: the set of dimensions it declares via `hypercube-dimension`
/// arcs, each with its resolved domain.
#[derive(Debug, Clone, Default)]
pub struct Hypercube {
    pub concept: ConceptId,
    dimensions: IndexMap<ConceptId, Dimension>,
}

impl Hypercube {
    /// Merge another hypercube's dimensions into this one (used when the
    /// same hypercube concept is declared with dimensions split across
    /// more than one extended link role).
    pub fn add_hypercube(&mut self, other: &Hypercube) {
        for (id, dim) in &other.dimensions {
            self.dimensions.entry(*id).or_insert_with(|| dim.clone());
        }
    }

    pub fn dimension(&self, id: ConceptId) -> Option<&Dimension> {
        self.dimensions.get(&id)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions.values()
    }

    /// Does `combo` declare exactly this hypercube's dimensions, each with
    /// a usable member? A combo naming fewer or more dimensions than the
    /// cube does not match, even if every dimension it does name checks out.
    pub fn has_dimension_combination(&self, combo: &MultipleDimensionType) -> bool {
        let domain_map = combo.get_all_dimension_domain_map();
        if domain_map.len() != self.dimensions.len() {
            return false;
        }
        domain_map.values().all(|sdt| match (
            self.dimensions.get(&sdt.dimension),
            &sdt.member,
        ) {
            (Some(dim), DimensionMember::Explicit(m)) => {
                !dim.is_typed && dim.contains_usable_dimension_domain(*m)
            }
            (Some(dim), DimensionMember::Typed(_)) => dim.is_typed,
            (None, _) => false,
        })
    }
}

/// Resolved dimensional structure for a whole DTS.
#[derive(Debug, Default)]
pub struct DimensionEngine {
    hypercubes: AHashMap<ConceptId, Hypercube>,
    all_by_role: IndexMap<(ConceptId, CompactString), Vec<(ContextElement, ConceptId)>>,
    not_all_by_role: IndexMap<(ConceptId, CompactString), Vec<(ContextElement, ConceptId)>>,
}

impl DimensionEngine {
    pub fn hypercube(&self, id: ConceptId) -> Option<&Hypercube> {
        self.hypercubes.get(&id)
    }

    pub fn hypercube_count(&self) -> usize {
        self.hypercubes.len()
    }

    fn roles_for_concept(&self, concept: ConceptId) -> IndexSet<&str> {
        self.all_by_role
            .keys()
            .chain(self.not_all_by_role.keys())
            .filter(|(c, _)| *c == concept)
            .map(|(_, role)| role.as_str())
            .collect()
    }

    /// Is `combo` a valid dimensional context for a fact reporting
    /// `concept`, carried in `context_element` (scenario or segment)?
    /// Tries every extended link role that binds a has-hypercube arc to
    /// `concept`, short-circuiting on the first role that admits `combo`.
    pub fn dimension_allowed(
        &self,
        concept: ConceptId,
        context_element: ContextElement,
        combo: &MultipleDimensionType,
    ) -> bool {
        let canonical = combo.shuffle();
        if canonical.get_all_dimension_domain_map().is_empty() {
            return true;
        }
        self.roles_for_concept(concept)
            .into_iter()
            .any(|role| self.role_admits(concept, role, context_element, &canonical))
    }

    fn role_admits(
        &self,
        concept: ConceptId,
        role: &str,
        context_element: ContextElement,
        combo: &MultipleDimensionType,
    ) -> bool {
        let key = (concept, CompactString::new(role));

        if let Some(excluded) = self.not_all_by_role.get(&key) {
            for &(ce, hc) in excluded {
                if ce != context_element {
                    continue;
                }
                if self
                    .hypercubes
                    .get(&hc)
                    .map(|h| h.has_dimension_combination(combo))
                    .unwrap_or(false)
                {
                    return false;
                }
            }
        }

        let Some(allowed) = self.all_by_role.get(&key) else {
            return false;
        };
        let mut relevant = Hypercube::default();
        let mut any = false;
        for &(ce, hc) in allowed {
            if ce != context_element {
                continue;
            }
            if let Some(hypercube) = self.hypercubes.get(&hc) {
                relevant.add_hypercube(hypercube);
                any = true;
            }
        }
        any && relevant.has_dimension_combination(combo)
    }
}

/// A has-hypercube arc's source concept, plus every concept reached from
/// it by `domain-member` arcs in `role` — the full set of primary items a
/// fact's concept may match to qualify for that arc's hypercube binding.
fn primary_item_closure(
    graph: &crate::linkbase::LinkbaseGraph,
    source: ConceptId,
    role: &str,
) -> IndexSet<ConceptId> {
    let mut out = IndexSet::new();
    out.insert(source);
    for eid in graph.build_target_network(source, Some(arcrole::DOMAIN_MEMBER), role) {
        if let Some(concept) = graph.locator(eid).and_then(|l| l.concept()) {
            out.insert(concept);
        }
    }
    out
}

/// Build the dimensional structure for every extended link role in the
/// DTS's definition linkbase.
pub fn build(dts: &Dts) -> Result<DimensionEngine> {
    let mut engine = DimensionEngine::default();
    let graph = &dts.definition.0;

    for role in graph.extended_link_roles() {
        // Each hypercube-dimension arc establishes one dimension on one
        // hypercube, with its domain-member network resolved via
        // `build_target_network(dimension, any arc role, arc's targetRole
        // or the current role)`. Resolved independently per arc, so the
        // same dimension concept can carry a different domain subset on
        // different hypercubes (e.g. via distinct `targetRole`s).
        for arc in graph.arc_base_set(arcrole::HYPERCUBE_DIMENSION, role) {
            let Some(hc_loc) = graph.locator(arc.source) else { continue };
            let Some(hc_concept_id) = hc_loc.concept() else { continue };
            let Some(dim_loc) = graph.locator(arc.target) else { continue };
            let Some(dim_concept_id) = dim_loc.concept() else { continue };
            let hc_concept = dts.concept(hc_concept_id);
            if !hc_concept.is_hypercube() {
                return Err(Error::TaxonomyCreation(TaxonomyCreationError::WrongSubstitutionGroup {
                    role: CompactString::new(role),
                    expected: "xbrldt:hypercubeItem",
                }));
            }
            let dim_concept = dts.concept(dim_concept_id);
            if !dim_concept.is_explicit_dimension() && !dim_concept.is_typed_dimension() {
                return Err(Error::TaxonomyCreation(TaxonomyCreationError::WrongSubstitutionGroup {
                    role: CompactString::new(role),
                    expected: "xbrldt:dimensionItem",
                }));
            }
            let is_typed = dim_concept.is_typed_dimension();

            let mut domain = IndexMap::new();
            if !is_typed {
                let network_role = arc.target_role.as_deref().unwrap_or(role);
                for eid in graph.build_target_network(dim_concept_id, None, network_role) {
                    let Some(member_concept) = graph.locator(eid).and_then(|l| l.concept()) else {
                        continue;
                    };
                    if member_concept == dim_concept_id {
                        continue;
                    }
                    let usable = graph.locator(eid).map(|l| l.usable.get()).unwrap_or(false);
                    domain.insert(member_concept, usable);
                }
                if domain.is_empty() {
                    return Err(Error::TaxonomyCreation(TaxonomyCreationError::MissingDomainMemberNetwork {
                        dimension: dts.concept(dim_concept_id).name.clone(),
                        role: CompactString::new(role),
                    }));
                }
            }

            let dimension = Dimension {
                concept: dim_concept_id,
                is_typed,
                domain,
            };
            let hypercube = engine.hypercubes.entry(hc_concept_id).or_insert_with(|| Hypercube {
                concept: hc_concept_id,
                dimensions: IndexMap::new(),
            });
            hypercube.dimensions.insert(dim_concept_id, dimension);
        }

        // all/notAll (has-hypercube) arcs wire primary items to
        // hypercubes, scoped to the `contextElement` they were declared
        // for. A primary item also qualifies via any concept reached by
        // domain-member arcs from the arc's source locator in this role,
        // so a fact reporting a domain-member descendant of the declared
        // primary item is bound to the same hypercube.
        for arc in graph.arc_base_set(arcrole::ALL, role) {
            let Some(item_loc) = graph.locator(arc.source) else { continue };
            let Some(item_concept) = item_loc.concept() else { continue };
            let Some(hc_loc) = graph.locator(arc.target) else { continue };
            let Some(hc_concept) = hc_loc.concept() else { continue };
            for member in primary_item_closure(graph, item_concept, role) {
                engine
                    .all_by_role
                    .entry((member, CompactString::new(role)))
                    .or_default()
                    .push((arc.context_element, hc_concept));
            }
        }
        for arc in graph.arc_base_set(arcrole::NOT_ALL, role) {
            let Some(item_loc) = graph.locator(arc.source) else { continue };
            let Some(item_concept) = item_loc.concept() else { continue };
            let Some(hc_loc) = graph.locator(arc.target) else { continue };
            let Some(hc_concept) = hc_loc.concept() else { continue };
            for member in primary_item_closure(graph, item_concept, role) {
                engine
                    .not_all_by_role
                    .entry((member, CompactString::new(role)))
                    .or_default()
                    .push((arc.context_element, hc_concept));
            }
        }
    }

    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mdt_equality_ignores_insertion_order() {
        let d1 = ConceptId(1);
        let d2 = ConceptId(2);
        let m1 = ConceptId(10);
        let m2 = ConceptId(20);

        let mut forward = MultipleDimensionType::new();
        forward.add_predecessor_dimension_domain(d1, DimensionMember::Explicit(m1));
        forward.add_predecessor_dimension_domain(d2, DimensionMember::Explicit(m2));

        let mut backward = MultipleDimensionType::new();
        backward.add_predecessor_dimension_domain(d2, DimensionMember::Explicit(m2));
        backward.add_predecessor_dimension_domain(d1, DimensionMember::Explicit(m1));

        assert_eq!(forward, backward);
    }

    #[test]
    fn mdt_inequality_on_different_member() {
        let d1 = ConceptId(1);
        let m1 = ConceptId(10);
        let m2 = ConceptId(20);

        let mut a = MultipleDimensionType::new();
        a.add_predecessor_dimension_domain(d1, DimensionMember::Explicit(m1));
        let mut b = MultipleDimensionType::new();
        b.add_predecessor_dimension_domain(d1, DimensionMember::Explicit(m2));

        assert_ne!(a, b);
    }

    #[test]
    fn activate_replaces_existing_dimension_without_duplicating() {
        let d1 = ConceptId(1);
        let m1 = ConceptId(10);
        let m2 = ConceptId(20);

        let base = MultipleDimensionType::new().activate(d1, DimensionMember::Explicit(m1));
        let replaced = base.activate(d1, DimensionMember::Explicit(m2));

        assert_eq!(replaced.get_all_dimension_domain_map().len(), 1);
        assert_eq!(
            replaced.get_single_dimension_type(d1).unwrap().member,
            DimensionMember::Explicit(m2)
        );
    }

    #[test]
    fn empty_combination_has_no_dimensions() {
        let combo = MultipleDimensionType::new();
        assert!(!combo.contains_dimension(ConceptId(0)));
        assert!(combo.get_all_dimension_domain_map().is_empty());
    }

    fn two_dimension_cube() -> Hypercube {
        let mut d1 = Dimension {
            concept: ConceptId(1),
            is_typed: false,
            domain: IndexMap::new(),
        };
        d1.domain.insert(ConceptId(10), true);
        let mut d2 = Dimension {
            concept: ConceptId(2),
            is_typed: false,
            domain: IndexMap::new(),
        };
        d2.domain.insert(ConceptId(20), true);

        let mut cube = Hypercube {
            concept: ConceptId(100),
            dimensions: IndexMap::new(),
        };
        cube.dimensions.insert(ConceptId(1), d1);
        cube.dimensions.insert(ConceptId(2), d2);
        cube
    }

    #[test]
    fn has_dimension_combination_rejects_partial_dimension_set() {
        let cube = two_dimension_cube();
        let mut partial = MultipleDimensionType::new();
        partial.add_predecessor_dimension_domain(ConceptId(1), DimensionMember::Explicit(ConceptId(10)));
        assert!(!cube.has_dimension_combination(&partial));
    }

    #[test]
    fn has_dimension_combination_accepts_exact_dimension_set() {
        let cube = two_dimension_cube();
        let mut full = MultipleDimensionType::new();
        full.add_predecessor_dimension_domain(ConceptId(1), DimensionMember::Explicit(ConceptId(10)));
        full.add_predecessor_dimension_domain(ConceptId(2), DimensionMember::Explicit(ConceptId(20)));
        assert!(cube.has_dimension_combination(&full));
    }

    #[test]
    fn primary_item_closure_includes_domain_member_descendants() {
        let mut graph = crate::linkbase::LinkbaseGraph::new();
        let role = CompactString::new("role");
        let file = CompactString::new("t.xml");
        let primary = graph.add_locator(
            CompactString::new("primary"),
            None,
            None,
            None,
            crate::xlink::LocatorTarget::Concept(ConceptId(0)),
            file.clone(),
            role.clone(),
        );
        let member = graph.add_locator(
            CompactString::new("member"),
            None,
            None,
            None,
            crate::xlink::LocatorTarget::Concept(ConceptId(1)),
            file.clone(),
            role.clone(),
        );
        graph.add_arc(crate::xlink::Arc {
            source: primary,
            target: member,
            arcrole: CompactString::new(arcrole::DOMAIN_MEMBER),
            extended_link_role: role.clone(),
            context_element: ContextElement::Unset,
            target_role: None,
            order: 1.0,
            weight: 1.0,
            priority: 0,
            use_: crate::xlink::ArcUse::Optional,
        });

        let closure = primary_item_closure(&graph, ConceptId(0), "role");
        assert!(closure.contains(&ConceptId(0)));
        assert!(closure.contains(&ConceptId(1)));
    }
}
