//! Instance documents: facts, contexts, and units, and the XML parser
//! that builds them against a `Dts`.

use crate::dimension::{DimensionMember, MultipleDimensionType};
use crate::dts::Dts;
use crate::error::{Error, InstanceLoadError, Result};
use crate::ids::ConceptId;
use crate::xml_util::{attr, local_name, read_attributes, read_node, split_qname, XmlNode};
use ahash::AHashMap;
use chrono::NaiveDate;
use compact_str::CompactString;
use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstancePeriod {
    Instant(NaiveDate),
    Duration { start: NaiveDate, end: NaiveDate },
    Forever,
}

#[derive(Debug, Clone, Default)]
pub struct InstanceUnit {
    pub id: CompactString,
    pub measures: Vec<CompactString>,
    pub divide: Option<(Vec<CompactString>, Vec<CompactString>)>,
}

#[derive(Debug, Clone)]
pub struct InstanceContext {
    pub id: CompactString,
    pub entity_scheme: CompactString,
    pub entity_identifier: CompactString,
    pub period: InstancePeriod,
    pub segment: MultipleDimensionType,
    pub scenario: MultipleDimensionType,
}

#[derive(Debug, Clone)]
pub struct Fact {
    pub concept: ConceptId,
    pub context_ref: CompactString,
    pub unit_ref: Option<CompactString>,
    pub value: CompactString,
    pub decimals: Option<i32>,
    pub precision: Option<i32>,
}

/// An XBRL instance document.
#[derive(Debug, Default)]
pub struct Instance {
    contexts: IndexMap<CompactString, InstanceContext>,
    units: IndexMap<CompactString, InstanceUnit>,
    /// Keyed by `(concept, contextRef)`. A later fact for the same key
    /// overwrites the earlier one.
    facts: IndexMap<(ConceptId, CompactString), Fact>,
}

impl Instance {
    pub fn add_fact(&mut self, fact: Fact) {
        self.facts.insert((fact.concept, fact.context_ref.clone()), fact);
    }

    pub fn add_context(&mut self, context: InstanceContext) {
        self.contexts.insert(context.id.clone(), context);
    }

    pub fn add_unit(&mut self, unit: InstanceUnit) {
        self.units.insert(unit.id.clone(), unit);
    }

    pub fn context(&self, id: &str) -> Option<&InstanceContext> {
        self.contexts.get(id)
    }

    pub fn unit(&self, id: &str) -> Option<&InstanceUnit> {
        self.units.get(id)
    }

    pub fn context_ids(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(|s| s.as_str())
    }

    pub fn contexts_ordered(&self) -> impl Iterator<Item = &InstanceContext> {
        self.contexts.values()
    }

    pub fn units_ordered(&self) -> impl Iterator<Item = &InstanceUnit> {
        self.units.values()
    }

    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.values()
    }

    pub fn fact(&self, concept: ConceptId, context_ref: &str) -> Option<&Fact> {
        self.facts.get(&(concept, CompactString::new(context_ref)))
    }

    pub fn fact_text(&self, concept: ConceptId, context_ref: &str) -> Option<&str> {
        self.fact(concept, context_ref).map(|f| f.value.as_str())
    }

    pub fn fact_decimals(&self, concept: ConceptId, context_ref: &str) -> Option<i32> {
        self.fact(concept, context_ref).and_then(|f| f.decimals)
    }
}

/// Load an instance document against an already-built DTS.
pub fn load_instance(dts: &Dts, path: &Path) -> Result<Instance> {
    let content = std::fs::read(path)?;
    parse_instance(dts, &content)
}

/// Discover the instance's `schemaRef`, build its DTS, then load the
/// instance against it.
pub fn load_instance_with_dts(path: &Path) -> Result<(Dts, Instance)> {
    let content = std::fs::read(path)?;
    let href = find_schema_ref(&content)?;
    let schema_path = path.parent().unwrap_or_else(|| Path::new(".")).join(&href);
    let dts = crate::dts::create_dts(&schema_path)?;
    let instance = parse_instance(&dts, &content)?;
    Ok((dts, instance))
}

fn find_schema_ref(content: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(content);
    reader.trim_text(true);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::XmlParse(e.to_string()))?
        {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if local_name(&name) == "schemaRef" {
                    let attrs = read_attributes(e)?;
                    if let Some(href) = attr(&attrs, "href") {
                        return Ok(href.to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Err(Error::Xbrl("instance document has no schemaRef".into()))
}

fn parse_instance(dts: &Dts, content: &[u8]) -> Result<Instance> {
    let mut reader = Reader::from_reader(content);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut instance = Instance::default();
    let mut namespaces: AHashMap<String, String> = AHashMap::default();

    loop {
        buf.clear();
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::XmlParse(e.to_string()))?
        {
            Event::Start(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let attrs = read_attributes(e)?;
                let local = local_name(&name).to_string();

                if local == "xbrl" {
                    collect_namespaces(&attrs, &mut namespaces);
                    continue;
                }

                match local.as_str() {
                    "context" => {
                        let id = attr(&attrs, "id")
                            .ok_or(Error::InstanceLoad(InstanceLoadError::MissingContextId))?
                            .to_string();
                        let node = read_node(&mut reader, &mut buf, &name, attrs)?;
                        let context = build_context(dts, &namespaces, &id, &node)?;
                        instance.add_context(context);
                    }
                    "unit" => {
                        let id = attr(&attrs, "id")
                            .ok_or(Error::InstanceLoad(InstanceLoadError::MissingUnitId {
                                id: CompactString::new(""),
                            }))?
                            .to_string();
                        let node = read_node(&mut reader, &mut buf, &name, attrs)?;
                        instance.add_unit(build_unit(&id, &node));
                    }
                    _ => {
                        let context_ref = attr(&attrs, "contextRef").map(str::to_string);
                        let unit_ref = attr(&attrs, "unitRef").map(CompactString::new);
                        let decimals = attr(&attrs, "decimals").and_then(|v| v.parse().ok());
                        let precision = attr(&attrs, "precision").and_then(|v| v.parse().ok());
                        let value = crate::xml_util::read_text(&mut reader, &mut buf)?;

                        let Some(concept) = resolve_qname_concept(dts, &namespaces, &name) else {
                            if is_dts_namespace(dts, &namespaces, &name) {
                                return Err(Error::InstanceLoad(InstanceLoadError::UnknownFactElement(
                                    CompactString::new(&name),
                                )));
                            }
                            continue; // extension markup outside any DTS namespace (e.g. a footnote link)
                        };
                        let Some(context_ref) = context_ref else {
                            return Err(Error::InstanceLoad(InstanceLoadError::MissingContextRef));
                        };
                        instance.add_fact(Fact {
                            concept,
                            context_ref: CompactString::new(&context_ref),
                            unit_ref,
                            value: CompactString::new(value.trim()),
                            decimals,
                            precision,
                        });
                    }
                }
            }
            Event::Empty(ref e) => {
                // A self-closing fact (nil or empty-string content).
                // Self-closing context/unit/schemaRef have nothing worth
                // extracting and are skipped.
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let attrs = read_attributes(e)?;
                let local = local_name(&name);
                if matches!(local, "xbrl" | "context" | "unit" | "schemaRef") {
                    continue;
                }
                let Some(context_ref) = attr(&attrs, "contextRef") else {
                    continue;
                };
                let Some(concept) = resolve_qname_concept(dts, &namespaces, &name) else {
                    if is_dts_namespace(dts, &namespaces, &name) {
                        return Err(Error::InstanceLoad(InstanceLoadError::UnknownFactElement(
                            CompactString::new(&name),
                        )));
                    }
                    continue;
                };
                instance.add_fact(Fact {
                    concept,
                    context_ref: CompactString::new(context_ref),
                    unit_ref: attr(&attrs, "unitRef").map(CompactString::new),
                    value: CompactString::new(""),
                    decimals: attr(&attrs, "decimals").and_then(|v| v.parse().ok()),
                    precision: attr(&attrs, "precision").and_then(|v| v.parse().ok()),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    tracing::debug!(
        contexts = instance.contexts.len(),
        units = instance.units.len(),
        facts = instance.facts.len(),
        "parsed instance document"
    );

    Ok(instance)
}

fn collect_namespaces(attrs: &[(String, String)], namespaces: &mut AHashMap<String, String>) {
    for (k, v) in attrs {
        if let Some(prefix) = k.strip_prefix("xmlns:") {
            namespaces.insert(prefix.to_string(), v.clone());
        } else if k == "xmlns" {
            namespaces.insert(String::new(), v.clone());
        }
    }
}

fn build_unit(id: &str, node: &XmlNode) -> InstanceUnit {
    if let Some(divide) = node.child("divide") {
        let numerator = divide
            .child("unitNumerator")
            .map(|n| n.children_named("measure").map(|m| CompactString::new(m.text.trim())).collect())
            .unwrap_or_default();
        let denominator = divide
            .child("unitDenominator")
            .map(|n| n.children_named("measure").map(|m| CompactString::new(m.text.trim())).collect())
            .unwrap_or_default();
        InstanceUnit {
            id: CompactString::new(id),
            measures: Vec::new(),
            divide: Some((numerator, denominator)),
        }
    } else {
        let measures = node
            .children_named("measure")
            .map(|m| CompactString::new(m.text.trim()))
            .collect();
        InstanceUnit {
            id: CompactString::new(id),
            measures,
            divide: None,
        }
    }
}

fn build_context(
    dts: &Dts,
    namespaces: &AHashMap<String, String>,
    id: &str,
    node: &XmlNode,
) -> Result<InstanceContext> {
    let entity = node.child("entity").ok_or_else(|| {
        Error::InstanceLoad(InstanceLoadError::MissingContextField {
            context: CompactString::new(id),
            field: "entity",
        })
    })?;
    let identifier = entity.child("identifier").ok_or_else(|| {
        Error::InstanceLoad(InstanceLoadError::MissingContextField {
            context: CompactString::new(id),
            field: "identifier",
        })
    })?;
    let entity_scheme = identifier.attr("scheme").unwrap_or_default().to_string();
    let entity_identifier = identifier.text.trim().to_string();

    let period_node = node.child("period").ok_or_else(|| {
        Error::InstanceLoad(InstanceLoadError::MissingContextField {
            context: CompactString::new(id),
            field: "period",
        })
    })?;
    let period = build_period(id, period_node)?;

    let segment = entity
        .child("segment")
        .map(|n| build_dimensional(dts, namespaces, n))
        .transpose()?
        .unwrap_or_default();
    let scenario = node
        .child("scenario")
        .map(|n| build_dimensional(dts, namespaces, n))
        .transpose()?
        .unwrap_or_default();

    Ok(InstanceContext {
        id: CompactString::new(id),
        entity_scheme: CompactString::new(&entity_scheme),
        entity_identifier: CompactString::new(&entity_identifier),
        period,
        segment,
        scenario,
    })
}

fn build_period(context_id: &str, node: &XmlNode) -> Result<InstancePeriod> {
    if node.child("forever").is_some() {
        return Ok(InstancePeriod::Forever);
    }
    if let Some(instant) = node.child("instant") {
        let date = parse_date(instant.text.trim()).ok_or_else(|| {
            Error::InstanceLoad(InstanceLoadError::MissingContextField {
                context: CompactString::new(context_id),
                field: "instant",
            })
        })?;
        return Ok(InstancePeriod::Instant(date));
    }
    let start = node
        .child("startDate")
        .and_then(|n| parse_date(n.text.trim()))
        .ok_or_else(|| {
            Error::InstanceLoad(InstanceLoadError::MissingContextField {
                context: CompactString::new(context_id),
                field: "startDate",
            })
        })?;
    let end = node
        .child("endDate")
        .and_then(|n| parse_date(n.text.trim()))
        .ok_or_else(|| {
            Error::InstanceLoad(InstanceLoadError::MissingContextField {
                context: CompactString::new(context_id),
                field: "endDate",
            })
        })?;
    Ok(InstancePeriod::Duration { start, end })
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let date_part = text.split('T').next().unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn build_dimensional(
    dts: &Dts,
    namespaces: &AHashMap<String, String>,
    node: &XmlNode,
) -> Result<MultipleDimensionType> {
    let mut mdt = MultipleDimensionType::new();
    for member in node.children_named("explicitMember") {
        let dimension_qname = member.attr("dimension").ok_or_else(|| {
            Error::InstanceLoad(InstanceLoadError::MalformedDimensionalMember(CompactString::new(
                "explicitMember missing dimension attribute",
            )))
        })?;
        let dimension = resolve_qname_concept(dts, namespaces, dimension_qname).ok_or_else(|| {
            Error::InstanceLoad(InstanceLoadError::MalformedDimensionalMember(CompactString::new(dimension_qname)))
        })?;
        let member_concept = resolve_qname_concept(dts, namespaces, member.text.trim()).ok_or_else(|| {
            Error::InstanceLoad(InstanceLoadError::MalformedDimensionalMember(CompactString::new(
                member.text.trim(),
            )))
        })?;
        mdt.add_predecessor_dimension_domain(dimension, DimensionMember::Explicit(member_concept));
    }
    for member in node.children_named("typedMember") {
        let dimension_qname = member.attr("dimension").ok_or_else(|| {
            Error::InstanceLoad(InstanceLoadError::MalformedDimensionalMember(CompactString::new(
                "typedMember missing dimension attribute",
            )))
        })?;
        let dimension = resolve_qname_concept(dts, namespaces, dimension_qname).ok_or_else(|| {
            Error::InstanceLoad(InstanceLoadError::MalformedDimensionalMember(CompactString::new(dimension_qname)))
        })?;
        // Full nested XML content of a typed domain value isn't
        // round-tripped; the text form of its first child (or its own
        // text, if it has none) covers the common case.
        let value = if member.children.is_empty() {
            member.text.clone()
        } else {
            member.children.first().map(|c| c.text.clone()).unwrap_or_default()
        };
        mdt.add_predecessor_dimension_domain(dimension, DimensionMember::Typed(CompactString::new(&value)));
    }
    Ok(mdt)
}

/// Does `qname`'s namespace belong to a schema in `dts`? Used to tell a
/// genuinely unresolvable concept (`InstanceLoadError::UnknownFactElement`)
/// apart from extension markup outside the DTS entirely (e.g. a footnote
/// link), which is silently skipped.
fn is_dts_namespace(dts: &Dts, namespaces: &AHashMap<String, String>, qname: &str) -> bool {
    let (prefix, _) = split_qname(qname.trim());
    namespaces
        .get(prefix)
        .map(|ns| dts.schemas.iter().any(|s| s.namespace == ns.as_str()))
        .unwrap_or(false)
}

fn resolve_qname_concept(dts: &Dts, namespaces: &AHashMap<String, String>, qname: &str) -> Option<ConceptId> {
    let (prefix, local) = split_qname(qname.trim());
    let namespace = namespaces.get(prefix)?;
    let schema = dts.schemas.iter().find(|s| s.namespace == namespace.as_str())?;
    dts.concept_by_name(dts.schema_id(&schema.name)?, local)
}
