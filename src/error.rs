//! Crate-wide error taxonomy.

use crate::ids::ConceptId;
use compact_str::CompactString;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("taxonomy creation error: {0}")]
    TaxonomyCreation(#[from] TaxonomyCreationError),

    #[error("instance load error: {0}")]
    InstanceLoad(#[from] InstanceLoadError),

    #[error("instance validation error: {0}")]
    InstanceValidation(String),

    #[error("calculation validation error: {0}")]
    CalculationValidation(#[from] CalculationValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Xbrl(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TaxonomyCreationError {
    #[error("unresolved locator href '{href}' in linkbase '{linkbase}'")]
    UnresolvedLocator {
        linkbase: CompactString,
        href: CompactString,
    },

    #[error("duplicate concept id '{id}'")]
    DuplicateConceptId { id: CompactString },

    #[error("duplicate concept name '{name}' in schema '{schema}'")]
    DuplicateConceptName {
        schema: CompactString,
        name: CompactString,
    },

    #[error("wrong substitution group for element referenced by a hypercube-dimension arc in role '{role}': expected {expected}")]
    WrongSubstitutionGroup {
        role: CompactString,
        expected: &'static str,
    },

    #[error("explicit dimension '{dimension}' has no domain-member network in role '{role}'")]
    MissingDomainMemberNetwork {
        dimension: CompactString,
        role: CompactString,
    },

    #[error("presentation concept has more than one parent in link role '{role}'")]
    AmbiguousPresentationParent { role: CompactString },

    #[error("schema '{0}' could not be read")]
    SchemaNotFound(CompactString),
}

#[derive(Debug, thiserror::Error)]
pub enum InstanceLoadError {
    #[error("unit '{id}' is missing a required id")]
    MissingUnitId { id: CompactString },

    #[error("context is missing a required id")]
    MissingContextId,

    #[error("context '{context}' is missing a required field: {field}")]
    MissingContextField {
        context: CompactString,
        field: &'static str,
    },

    #[error("fact references unresolved contextRef '{context_ref}'")]
    UnresolvedContextRef { context_ref: CompactString },

    #[error("fact is missing a required contextRef")]
    MissingContextRef,

    #[error("fact element '{0}' does not resolve to a known concept")]
    UnknownFactElement(CompactString),

    #[error("malformed dimensional member: {0}")]
    MalformedDimensionalMember(CompactString),
}

#[derive(Debug, thiserror::Error)]
pub enum CalculationValidationError {
    #[error("missing value for summand concept {concept:?} in dts #{dts_index}")]
    MissingValues {
        concept: ConceptId,
        dts_index: usize,
    },

    #[error("calculation mismatch in role '{extended_link_role}': expected {expected}, computed {computed}")]
    CalculationMismatch {
        expected: rust_decimal::Decimal,
        computed: rust_decimal::Decimal,
        summands: Vec<ConceptId>,
        extended_link_role: CompactString,
    },
}
