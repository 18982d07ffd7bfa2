//! Linkbase graph: an extended-link-role indexed arc/element store with
//! XLink traversal, specialized per linkbase kind.

use crate::error::{Error, TaxonomyCreationError};
use crate::ids::{ArcId, ConceptId, ElementId};
use crate::xlink::{Arc, ArcUse, ExtendedLinkElement, Locator, LocatorTarget};
use ahash::AHashMap;
use compact_str::CompactString;
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkbaseKind {
    Presentation,
    Definition,
    Calculation,
    Label,
}

/// Generic arc/element store shared by all four linkbase specializations.
/// Arcs and elements are append-only during construction and the graph
/// becomes immutable once construction finishes.
#[derive(Debug, Default)]
pub struct LinkbaseGraph {
    elements: Vec<ExtendedLinkElement>,
    arcs: Vec<Arc>,

    /// `(source file, extended link role, xlink:label)` -> elements sharing
    /// that label, used to resolve `xlink:from`/`xlink:to` during arc
    /// construction. A label may name more than one element.
    by_label: AHashMap<(CompactString, CompactString, CompactString), Vec<ElementId>>,

    /// `(source file, id)` -> element, used to resolve locator `href`
    /// fallbacks to an existing resource id in the same linkbase file.
    by_file_id: AHashMap<(CompactString, CompactString), ElementId>,

    /// extended link role -> arcs in that role, insertion order.
    arcs_by_role: IndexMap<CompactString, Vec<ArcId>>,

    /// extended link role -> elements in that role, insertion order.
    elements_by_role: IndexMap<CompactString, Vec<ElementId>>,

    /// concept -> locators pointing at it, across all roles.
    locators_by_concept: AHashMap<ConceptId, Vec<ElementId>>,
}

impl LinkbaseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_locator(
        &mut self,
        label: CompactString,
        role: Option<CompactString>,
        title: Option<CompactString>,
        id: Option<CompactString>,
        target: LocatorTarget,
        source_file: CompactString,
        extended_link_role: CompactString,
    ) -> ElementId {
        let element_id = ElementId(self.elements.len() as u32);
        if let Some(id) = &id {
            self.by_file_id
                .insert((source_file.clone(), id.clone()), element_id);
        }
        self.by_label
            .entry((source_file.clone(), extended_link_role.clone(), label.clone()))
            .or_default()
            .push(element_id);
        self.elements_by_role
            .entry(extended_link_role.clone())
            .or_default()
            .push(element_id);
        if let LocatorTarget::Concept(concept) = target {
            self.locators_by_concept
                .entry(concept)
                .or_default()
                .push(element_id);
        }
        self.elements
            .push(ExtendedLinkElement::Locator(Locator {
                label,
                role,
                title,
                id,
                target,
                usable: std::cell::Cell::new(true),
                source_file,
                extended_link_role,
            }));
        element_id
    }

    pub fn add_resource(
        &mut self,
        label: CompactString,
        role: Option<CompactString>,
        title: Option<CompactString>,
        id: Option<CompactString>,
        lang: Option<CompactString>,
        value: CompactString,
        source_file: CompactString,
        extended_link_role: CompactString,
    ) -> ElementId {
        let element_id = ElementId(self.elements.len() as u32);
        if let Some(id) = &id {
            self.by_file_id
                .insert((source_file.clone(), id.clone()), element_id);
        }
        self.by_label
            .entry((source_file.clone(), extended_link_role.clone(), label.clone()))
            .or_default()
            .push(element_id);
        self.elements_by_role
            .entry(extended_link_role.clone())
            .or_default()
            .push(element_id);
        self.elements.push(ExtendedLinkElement::Resource(
            crate::xlink::Resource {
                label,
                role,
                title,
                id,
                lang,
                value,
                source_file,
                extended_link_role,
            },
        ));
        element_id
    }

    /// Resolve an existing resource by `(source file, id)`, used as the
    /// fallback when a locator `href` doesn't match a concept id.
    pub fn resource_by_file_id(&self, file: &str, id: &str) -> Option<ElementId> {
        self.by_file_id
            .get(&(CompactString::new(file), CompactString::new(id)))
            .copied()
    }

    pub fn labels(
        &self,
        source_file: &str,
        extended_link_role: &str,
        label: &str,
    ) -> &[ElementId] {
        self.by_label
            .get(&(
                CompactString::new(source_file),
                CompactString::new(extended_link_role),
                CompactString::new(label),
            ))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn add_arc(&mut self, arc: Arc) -> ArcId {
        let arc_id = ArcId(self.arcs.len() as u32);
        self.arcs_by_role
            .entry(arc.extended_link_role.clone())
            .or_default()
            .push(arc_id);
        self.arcs.push(arc);
        arc_id
    }

    pub fn element(&self, id: ElementId) -> &ExtendedLinkElement {
        &self.elements[id.index()]
    }

    pub fn locator(&self, id: ElementId) -> Option<&Locator> {
        self.element(id).as_locator()
    }

    pub fn arc(&self, id: ArcId) -> &Arc {
        &self.arcs[id.index()]
    }

    pub fn locators_for_concept(&self, concept: ConceptId) -> &[ElementId] {
        self.locators_by_concept
            .get(&concept)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn apply_usable(&self, target: ElementId, usable: bool) {
        if let ExtendedLinkElement::Locator(l) = self.element(target) {
            l.usable.set(usable);
        }
    }

    /// Every extended link role that appears on at least one arc.
    pub fn extended_link_roles(&self) -> impl Iterator<Item = &str> {
        self.arcs_by_role
            .iter()
            .filter(|(_, arcs)| !arcs.is_empty())
            .map(|(role, _)| role.as_str())
    }

    fn role_arcs(&self, role: &str) -> &[ArcId] {
        self.arcs_by_role.get(role).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Collapse equivalent arcs — same `(source, target, arcrole, link
    /// role)` — by `(priority, use)`: higher priority wins; at equal
    /// priority, `use=prohibited` hides `use=optional`. Stable ordering is
    /// the order in which each distinct edge was first seen in the source
    /// file.
    pub fn arc_base_set(&self, arc_role: &str, link_role: &str) -> Vec<&Arc> {
        self.arc_base_set_multi(&[arc_role], link_role)
    }

    pub fn arc_base_set_multi(&self, arc_roles: &[&str], link_role: &str) -> Vec<&Arc> {
        let mut groups: IndexMap<(ElementId, ElementId, &str), Vec<ArcId>> = IndexMap::new();
        for &arc_id in self.role_arcs(link_role) {
            let arc = self.arc(arc_id);
            if !arc_roles.iter().any(|r| *r == arc.arcrole) {
                continue;
            }
            groups
                .entry((arc.source, arc.target, arc.arcrole.as_str()))
                .or_default()
                .push(arc_id);
        }

        let mut out = Vec::with_capacity(groups.len());
        for (_, ids) in groups {
            let max_priority = ids.iter().map(|id| self.arc(*id).priority).max().unwrap();
            let at_max: Vec<ArcId> = ids
                .into_iter()
                .filter(|id| self.arc(*id).priority == max_priority)
                .collect();
            if at_max.iter().any(|id| self.arc(*id).use_ == ArcUse::Prohibited) {
                continue;
            }
            if let Some(id) = at_max.into_iter().next() {
                out.push(self.arc(id));
            }
        }
        out
    }

    /// Locators that are the source of some arc whose target locator
    /// points at `concept`.
    pub fn source_elements(&self, concept: ConceptId, link_role: &str) -> Vec<ElementId> {
        let mut out = IndexSet::new();
        for &arc_id in self.role_arcs(link_role) {
            let arc = self.arc(arc_id);
            if self
                .locator(arc.target)
                .map(|l| l.concept() == Some(concept))
                .unwrap_or(false)
            {
                out.insert(arc.source);
            }
        }
        out.into_iter().collect()
    }

    /// Dual of `source_elements`.
    pub fn target_elements(&self, concept: ConceptId, link_role: &str) -> Vec<ElementId> {
        let mut out = IndexSet::new();
        for &arc_id in self.role_arcs(link_role) {
            let arc = self.arc(arc_id);
            if self
                .locator(arc.source)
                .map(|l| l.concept() == Some(concept))
                .unwrap_or(false)
            {
                out.insert(arc.target);
            }
        }
        out.into_iter().collect()
    }

    /// Transitive closure of elements reachable from `concept`'s
    /// locator(s) in `link_role`, following arcs of `arc_role` (or any arc
    /// role, when `None`). Arcs carrying `targetRole` switch the role used
    /// for the rest of that branch. Guarded against cycles.
    pub fn build_target_network(
        &self,
        concept: ConceptId,
        arc_role: Option<&str>,
        link_role: &str,
    ) -> IndexSet<ElementId> {
        let mut visited: IndexSet<ElementId> = IndexSet::new();
        let mut stack: Vec<(ElementId, CompactString)> = self
            .locators_for_concept(concept)
            .iter()
            .filter(|&&eid| {
                self.elements_by_role
                    .get(link_role)
                    .map(|v| v.contains(&eid))
                    .unwrap_or(false)
            })
            .map(|&eid| (eid, CompactString::new(link_role)))
            .collect();

        while let Some((eid, role)) = stack.pop() {
            if !visited.insert(eid) {
                continue;
            }
            for &arc_id in self.role_arcs(role.as_str()) {
                let arc = self.arc(arc_id);
                if arc.source != eid {
                    continue;
                }
                if let Some(required) = arc_role {
                    if arc.arcrole != required {
                        continue;
                    }
                }
                if visited.contains(&arc.target) {
                    continue;
                }
                let next_role = arc.target_role.clone().unwrap_or_else(|| role.clone());
                stack.push((arc.target, next_role));
            }
        }
        visited
    }

    pub fn elements_in_role(&self, role: &str) -> &[ElementId] {
        self.elements_by_role.get(role).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// `LabelLinkbase` specialization.
#[derive(Debug, Default)]
pub struct LabelLinkbase(pub LinkbaseGraph);

impl LabelLinkbase {
    pub fn label_for(&self, concept: ConceptId, role: &str, lang: &str) -> Option<&str> {
        for (link_role, _) in self.0.arcs_by_role.iter() {
            for resource_id in self.0.target_elements(concept, link_role) {
                if let ExtendedLinkElement::Resource(r) = self.0.element(resource_id) {
                    let role_matches = r.role.as_deref() == Some(role);
                    let lang_matches = r.lang.as_deref() == Some(lang);
                    if role_matches && lang_matches {
                        return Some(r.value.as_str());
                    }
                }
            }
        }
        None
    }
}

/// `PresentationLinkbase` specialization; derived tree structure lives in
/// `presentation.rs`.
#[derive(Debug, Default)]
pub struct PresentationLinkbase(pub LinkbaseGraph);

/// `DefinitionLinkbase` specialization; dimension/hypercube derivation
/// lives in `dimension.rs`.
#[derive(Debug, Default)]
pub struct DefinitionLinkbase(pub LinkbaseGraph);

/// `CalculationLinkbase` specialization.
#[derive(Debug, Default)]
pub struct CalculationLinkbase(pub LinkbaseGraph);

impl CalculationLinkbase {
    /// `summation-item` arcs sourced at `concept` in `extended_link_role`,
    /// mapped to their weight.
    pub fn calculations(
        &self,
        concept: ConceptId,
        extended_link_role: &str,
    ) -> IndexMap<ConceptId, f64> {
        let mut out = IndexMap::new();
        for arc in self
            .0
            .arc_base_set(crate::xlink::arcrole::SUMMATION_ITEM, extended_link_role)
        {
            let Some(src) = self.0.locator(arc.source) else {
                continue;
            };
            if src.concept() != Some(concept) {
                continue;
            }
            let Some(tgt_concept) = self.0.locator(arc.target).and_then(|l| l.concept()) else {
                continue;
            };
            out.insert(tgt_concept, arc.weight);
        }
        out
    }
}

/// Resolve a locator `href` of the form `file#id`: first against the
/// concept registry (trying the named schema file, then any schema in the
/// DTS), then, when no concept matches, against an existing resource id in
/// the same linkbase file. Failure is fatal only when neither matches (see
/// DESIGN.md "Locator resolution").
pub fn resolve_href(
    dts_concept_by_schema_id: impl Fn(&str, &str) -> Option<ConceptId>,
    resource_by_file_id: impl Fn(&str, &str) -> Option<ElementId>,
    href: &str,
    linkbase_file: &str,
) -> Result<LocatorTarget, Error> {
    let (file, id) = href.split_once('#').ok_or_else(|| {
        Error::TaxonomyCreation(TaxonomyCreationError::UnresolvedLocator {
            linkbase: CompactString::new(linkbase_file),
            href: CompactString::new(href),
        })
    })?;
    let file = file.rsplit('/').next().unwrap_or(file);
    if let Some(concept) = dts_concept_by_schema_id(file, id) {
        return Ok(LocatorTarget::Concept(concept));
    }
    if let Some(resource) = resource_by_file_id(linkbase_file, id) {
        return Ok(LocatorTarget::Resource(resource));
    }
    Err(Error::TaxonomyCreation(TaxonomyCreationError::UnresolvedLocator {
        linkbase: CompactString::new(linkbase_file),
        href: CompactString::new(href),
    }))
}
