//! Concept registry: schema element declarations and the schema files
//! that own them.

use crate::ids::{ConceptId, SchemaId};
use compact_str::CompactString;

pub const SUBST_GROUP_DIMENSION_ITEM: &str = "xbrldt:dimensionItem";
pub const SUBST_GROUP_HYPERCUBE_ITEM: &str = "xbrldt:hypercubeItem";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodType {
    Instant,
    Duration,
    Unset,
}

impl Default for PeriodType {
    fn default() -> Self {
        PeriodType::Unset
    }
}

impl PeriodType {
    pub fn parse(value: &str) -> Self {
        match value {
            "instant" => PeriodType::Instant,
            "duration" => PeriodType::Duration,
            _ => PeriodType::Unset,
        }
    }
}

/// A schema element declaration. Structural equality is `(id, name,
/// schema)`.
#[derive(Debug, Clone)]
pub struct Concept {
    pub id: CompactString,
    pub name: CompactString,
    pub schema: SchemaId,
    pub namespace_prefix: CompactString,
    pub namespace_uri: CompactString,
    pub concept_type: CompactString,
    pub substitution_group: Option<CompactString>,
    pub period_type: PeriodType,
    pub is_abstract: bool,
    pub is_nillable: bool,
    pub typed_domain_ref: Option<CompactString>,
}

impl PartialEq for Concept {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name && self.schema == other.schema
    }
}
impl Eq for Concept {}

impl Concept {
    /// A typed dimension: `substitutionGroup == xbrldt:dimensionItem` and a
    /// `typedDomainRef` is present. Otherwise, if the substitution group
    /// matches, it's an explicit dimension.
    pub fn is_typed_dimension(&self) -> bool {
        self.substitution_group.as_deref() == Some(SUBST_GROUP_DIMENSION_ITEM)
            && self.typed_domain_ref.is_some()
    }

    pub fn is_explicit_dimension(&self) -> bool {
        self.substitution_group.as_deref() == Some(SUBST_GROUP_DIMENSION_ITEM)
            && self.typed_domain_ref.is_none()
    }

    pub fn is_hypercube(&self) -> bool {
        self.substitution_group.as_deref() == Some(SUBST_GROUP_HYPERCUBE_ITEM)
    }

    /// Numeric-itemness is computed from the declared type rather than
    /// assumed true for every concept.
    pub fn is_numeric_item(&self) -> bool {
        is_numeric_type(&self.concept_type)
    }
}

/// Recognize XBRL's built-in numeric item types and their common
/// derivations. This is intentionally a fixed lookup, not a full type
/// hierarchy walk — schema-type derivation chains are an external
/// XML-Schema validator's job, out of scope here.
fn is_numeric_type(concept_type: &str) -> bool {
    let (_, local) = crate::xml_util::split_qname(concept_type);
    matches!(
        local,
        "monetaryItemType"
            | "decimalItemType"
            | "floatItemType"
            | "doubleItemType"
            | "integerItemType"
            | "nonNegativeIntegerItemType"
            | "nonPositiveIntegerItemType"
            | "positiveIntegerItemType"
            | "negativeIntegerItemType"
            | "sharesItemType"
            | "pureItemType"
            | "fractionItemType"
            | "percentItemType"
            | "perShareItemType"
    )
}

/// One schema file.
#[derive(Debug, Clone)]
pub struct TaxonomySchema {
    pub name: CompactString,
    pub namespace: CompactString,
    pub prefix: CompactString,
    pub imports: Vec<CompactString>,
    pub concepts: Vec<ConceptId>,
}
