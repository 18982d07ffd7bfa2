//! Instance outputter: serializes an `Instance` back to XBRL 2.1 instance
//! XML using the same wire form `instance::parse_instance` reads.
//! Round-tripping through that parser must reproduce the same fact set,
//! modulo context/unit id aliasing.

use crate::dts::Dts;
use crate::dimension::{DimensionMember, MultipleDimensionType};
use crate::instance::{Instance, InstanceContext, InstancePeriod, InstanceUnit};
use std::fmt::Write as _;

const XBRLI_NS: &str = "http://www.xbrl.org/2003/instance";
const XBRLDI_NS: &str = "http://xbrl.org/2006/xbrldi";
const LINK_NS: &str = "http://www.xbrl.org/2003/linkbase";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Render `instance` as an XBRL instance document, referencing `schema_ref`
/// as the root schema via `link:schemaRef`.
pub fn to_xml(dts: &Dts, instance: &Instance, schema_ref: &str) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = write!(
        out,
        "<xbrl xmlns=\"{XBRLI_NS}\" xmlns:link=\"{LINK_NS}\" xmlns:xlink=\"{XLINK_NS}\" xmlns:xbrldi=\"{XBRLDI_NS}\""
    );
    for schema in &dts.schemas {
        if !schema.prefix.is_empty() {
            let _ = write!(out, " xmlns:{}=\"{}\"", schema.prefix, schema.namespace);
        }
    }
    out.push_str(">\n");
    let _ = write!(
        out,
        "  <link:schemaRef xlink:type=\"simple\" xlink:href=\"{}\"/>\n",
        escape(schema_ref)
    );

    for context in instance.contexts_ordered() {
        write_context(&mut out, dts, context);
    }
    for unit in instance.units_ordered() {
        write_unit(&mut out, unit);
    }
    for fact in instance.facts() {
        let concept = dts.concept(fact.concept);
        let qname = if concept.namespace_prefix.is_empty() {
            concept.name.to_string()
        } else {
            format!("{}:{}", concept.namespace_prefix, concept.name)
        };
        let mut attrs = format!(" contextRef=\"{}\"", escape(&fact.context_ref));
        if let Some(unit_ref) = &fact.unit_ref {
            let _ = write!(attrs, " unitRef=\"{}\"", escape(unit_ref));
        }
        if let Some(d) = fact.decimals {
            let _ = write!(attrs, " decimals=\"{d}\"");
        }
        if let Some(p) = fact.precision {
            let _ = write!(attrs, " precision=\"{p}\"");
        }
        if fact.value.is_empty() {
            let _ = writeln!(out, "  <{qname}{attrs}/>");
        } else {
            let _ = writeln!(out, "  <{qname}{attrs}>{}</{qname}>", escape(&fact.value));
        }
    }

    out.push_str("</xbrl>\n");
    out
}

fn write_context(out: &mut String, dts: &Dts, context: &InstanceContext) {
    let _ = writeln!(out, "  <context id=\"{}\">", escape(&context.id));
    out.push_str("    <entity>\n");
    let _ = writeln!(
        out,
        "      <identifier scheme=\"{}\">{}</identifier>",
        escape(&context.entity_scheme),
        escape(&context.entity_identifier)
    );
    write_dimensional(out, dts, "segment", &context.segment, 6);
    out.push_str("    </entity>\n");
    out.push_str("    <period>\n");
    match &context.period {
        InstancePeriod::Instant(d) => {
            let _ = writeln!(out, "      <instant>{d}</instant>");
        }
        InstancePeriod::Duration { start, end } => {
            let _ = writeln!(out, "      <startDate>{start}</startDate>");
            let _ = writeln!(out, "      <endDate>{end}</endDate>");
        }
        InstancePeriod::Forever => {
            out.push_str("      <forever/>\n");
        }
    }
    out.push_str("    </period>\n");
    write_dimensional(out, dts, "scenario", &context.scenario, 4);
    out.push_str("  </context>\n");
}

fn write_dimensional(out: &mut String, dts: &Dts, tag: &str, mdt: &MultipleDimensionType, indent: usize) {
    if mdt.get_all_dimension_domain_map().is_empty() {
        return;
    }
    let pad = " ".repeat(indent);
    let _ = writeln!(out, "{pad}<{tag}>");
    for sdt in mdt.get_all_dimension_domain_map().values() {
        let dim_concept = dts.concept(sdt.dimension);
        let dim_qname = qname(dim_concept);
        match &sdt.member {
            DimensionMember::Explicit(member) => {
                let member_qname = qname(dts.concept(*member));
                let _ = writeln!(
                    out,
                    "{pad}  <xbrldi:explicitMember dimension=\"{dim_qname}\">{member_qname}</xbrldi:explicitMember>"
                );
            }
            DimensionMember::Typed(value) => {
                let _ = writeln!(
                    out,
                    "{pad}  <xbrldi:typedMember dimension=\"{dim_qname}\">{value}</xbrldi:typedMember>"
                );
            }
        }
    }
    let _ = writeln!(out, "{pad}</{tag}>");
}

fn qname(concept: &crate::schema::Concept) -> String {
    if concept.namespace_prefix.is_empty() {
        concept.name.to_string()
    } else {
        format!("{}:{}", concept.namespace_prefix, concept.name)
    }
}

fn write_unit(out: &mut String, unit: &InstanceUnit) {
    let _ = writeln!(out, "  <unit id=\"{}\">", escape(&unit.id));
    if let Some((num, den)) = &unit.divide {
        out.push_str("    <divide>\n      <unitNumerator>\n");
        for m in num {
            let _ = writeln!(out, "        <measure>{m}</measure>");
        }
        out.push_str("      </unitNumerator>\n      <unitDenominator>\n");
        for m in den {
            let _ = writeln!(out, "        <measure>{m}</measure>");
        }
        out.push_str("      </unitDenominator>\n    </divide>\n");
    } else {
        for m in &unit.measures {
            let _ = writeln!(out, "    <measure>{m}</measure>");
        }
    }
    out.push_str("  </unit>\n");
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
