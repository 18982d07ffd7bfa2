//! XLink model: locators, resources, arcs, and the traversal routines a
//! linkbase exposes over them.

use crate::ids::{ConceptId, ElementId};
use compact_str::CompactString;
use std::cell::Cell;

/// Arc role URIs recognized by this crate.
pub mod arcrole {
    pub const HYPERCUBE_DIMENSION: &str = "http://xbrl.org/int/dim/arcrole/hypercube-dimension";
    pub const DIMENSION_DOMAIN: &str = "http://xbrl.org/int/dim/arcrole/dimension-domain";
    pub const DOMAIN_MEMBER: &str = "http://xbrl.org/int/dim/arcrole/domain-member";
    pub const ALL: &str = "http://xbrl.org/int/dim/arcrole/all";
    pub const NOT_ALL: &str = "http://xbrl.org/int/dim/arcrole/notAll";
    pub const SUMMATION_ITEM: &str = "http://www.xbrl.org/2003/arcrole/summation-item";
    pub const PARENT_CHILD: &str = "http://www.xbrl.org/2003/arcrole/parent-child";
    pub const CONCEPT_LABEL: &str = "http://www.xbrl.org/2003/arcrole/concept-label";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextElement {
    Scenario,
    Segment,
    Unset,
}

impl ContextElement {
    pub fn parse(value: &str) -> Self {
        match value {
            "scenario" => ContextElement::Scenario,
            "segment" => ContextElement::Segment,
            _ => ContextElement::Unset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcUse {
    Optional,
    Prohibited,
}

impl ArcUse {
    pub fn parse(value: &str) -> Self {
        match value {
            "prohibited" => ArcUse::Prohibited,
            _ => ArcUse::Optional,
        }
    }
}

/// What a locator's `href` resolved to: a concept id in the registry, or,
/// when no concept matched, an existing resource id in the same linkbase
/// file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorTarget {
    Concept(ConceptId),
    Resource(ElementId),
}

/// A locator: an extended-link element resolving `xlink:href` against the
/// concept registry, or, failing that, against a resource in the same file.
#[derive(Debug, Clone)]
pub struct Locator {
    pub label: CompactString,
    pub role: Option<CompactString>,
    pub title: Option<CompactString>,
    pub id: Option<CompactString>,
    pub target: LocatorTarget,
    /// Mutated in place by `xbrldt:usable="false"` arcs during graph
    /// construction; everything else about a locator is fixed at creation.
    pub usable: Cell<bool>,
    pub source_file: CompactString,
    pub extended_link_role: CompactString,
}

impl Locator {
    /// The concept this locator points to, or `None` when it resolved to a
    /// resource instead.
    pub fn concept(&self) -> Option<ConceptId> {
        match self.target {
            LocatorTarget::Concept(c) => Some(c),
            LocatorTarget::Resource(_) => None,
        }
    }

    pub fn resource(&self) -> Option<ElementId> {
        match self.target {
            LocatorTarget::Resource(r) => Some(r),
            LocatorTarget::Concept(_) => None,
        }
    }
}

/// A resource: an extended-link element carrying a literal value (e.g. a
/// label string).
#[derive(Debug, Clone)]
pub struct Resource {
    pub label: CompactString,
    pub role: Option<CompactString>,
    pub title: Option<CompactString>,
    pub id: Option<CompactString>,
    pub lang: Option<CompactString>,
    pub value: CompactString,
    pub source_file: CompactString,
    pub extended_link_role: CompactString,
}

#[derive(Debug, Clone)]
pub enum ExtendedLinkElement {
    Locator(Locator),
    Resource(Resource),
}

impl ExtendedLinkElement {
    pub fn as_locator(&self) -> Option<&Locator> {
        match self {
            ExtendedLinkElement::Locator(l) => Some(l),
            ExtendedLinkElement::Resource(_) => None,
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            ExtendedLinkElement::Resource(r) => Some(r),
            ExtendedLinkElement::Locator(_) => None,
        }
    }

    pub fn extended_link_role(&self) -> &str {
        match self {
            ExtendedLinkElement::Locator(l) => &l.extended_link_role,
            ExtendedLinkElement::Resource(r) => &r.extended_link_role,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            ExtendedLinkElement::Locator(l) => l.id.as_deref(),
            ExtendedLinkElement::Resource(r) => r.id.as_deref(),
        }
    }
}

/// A directed, labeled edge between two extended-link elements.
/// `source`/`target` are indices into the owning `LinkbaseGraph`'s
/// element arena.
#[derive(Debug, Clone)]
pub struct Arc {
    pub source: ElementId,
    pub target: ElementId,
    pub arcrole: CompactString,
    pub extended_link_role: CompactString,
    pub context_element: ContextElement,
    pub target_role: Option<CompactString>,
    pub order: f64,
    pub weight: f64,
    pub priority: i32,
    pub use_: ArcUse,
}
