//! Calculation validation: per-context weighted-sum arithmetic over a
//! `CalculationLinkbase`'s base sets.

use crate::dts::Dts;
use crate::error::CalculationValidationError;
use crate::ids::ConceptId;
use crate::instance::Instance;
use compact_str::CompactString;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashSet;

/// Tunable calculation-validation behavior.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// When `true`, reproduces a `BigDecimal(Float.floatValue())`-style
    /// precision loss when parsing fact text by round-tripping through
    /// `f64` first. Default `false` parses decimal text directly via
    /// `rust_decimal`.
    pub legacy_float_calculation: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            legacy_float_calculation: false,
        }
    }
}

/// Validate every `summation-item` base set against the facts in
/// `instance`, returning one error per concept/context pair that fails.
/// Both missing-summand and mismatch failures are reported; validation
/// does not stop at the first one.
pub fn validate_calculations(
    dts: &Dts,
    instance: &Instance,
    config: &ValidationConfig,
) -> Vec<CalculationValidationError> {
    let mut errors = Vec::new();
    let graph = &dts.calculation.0;

    for role in graph.extended_link_roles() {
        let mut totals: HashSet<ConceptId> = HashSet::new();
        for arc in graph.arc_base_set(crate::xlink::arcrole::SUMMATION_ITEM, role) {
            if let Some(concept) = graph.locator(arc.source).and_then(|l| l.concept()) {
                totals.insert(concept);
            }
        }

        for &total_concept in &totals {
            let calcs = dts.calculation.calculations(total_concept, role);
            if calcs.is_empty() {
                continue;
            }

            for context_id in instance.context_ids() {
                let Some(total_text) = instance.fact_text(total_concept, context_id) else {
                    continue;
                };
                let Some(total_value) = parse_fact_value(total_text, config.legacy_float_calculation) else {
                    continue;
                };

                let mut computed = Decimal::ZERO;
                let mut missing = Vec::new();
                let mut summands = Vec::new();
                let mut scale = instance.fact_decimals(total_concept, context_id);

                for (&summand_concept, &weight) in calcs.iter() {
                    summands.push(summand_concept);
                    match instance.fact_text(summand_concept, context_id) {
                        Some(text) => match parse_fact_value(text, config.legacy_float_calculation) {
                            Some(value) => {
                                let w = Decimal::from_f64(weight).unwrap_or(Decimal::ONE);
                                computed += value * w;
                                scale = min_decimals(scale, instance.fact_decimals(summand_concept, context_id));
                            }
                            None => missing.push(summand_concept),
                        },
                        None => missing.push(summand_concept),
                    }
                }

                if !missing.is_empty() {
                    for missing_concept in missing {
                        errors.push(CalculationValidationError::MissingValues {
                            concept: missing_concept,
                            dts_index: 0,
                        });
                    }
                    continue;
                }

                let scale = scale.unwrap_or(2).max(0) as u32;
                let rounded_total = total_value.round_dp(scale);
                let rounded_computed = computed.round_dp(scale);
                if rounded_total != rounded_computed {
                    tracing::warn!(
                        role,
                        expected = %rounded_total,
                        computed = %rounded_computed,
                        "calculation mismatch"
                    );
                    errors.push(CalculationValidationError::CalculationMismatch {
                        expected: rounded_total,
                        computed: rounded_computed,
                        summands,
                        extended_link_role: CompactString::new(role),
                    });
                }
            }
        }
    }

    errors
}

fn min_decimals(a: Option<i32>, b: Option<i32>) -> Option<i32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Parse a fact's raw text into a `Decimal`. When `legacy_float` is set,
/// routes the value through `f64` first, reproducing a
/// `BigDecimal(Float.floatValue())`-style precision loss.
pub fn parse_fact_value(text: &str, legacy_float: bool) -> Option<Decimal> {
    let normalized = text.trim().replace(',', ".");
    if legacy_float {
        let f: f64 = normalized.parse().ok()?;
        Decimal::from_f64(f)
    } else {
        normalized.parse().ok()
    }
}
