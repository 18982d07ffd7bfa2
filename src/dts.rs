//! DTS builder: discovers schemas transitively from a root file and
//! populates the concept registry and the four linkbase graphs.

use crate::dimension::DimensionEngine;
use crate::error::{Error, Result, TaxonomyCreationError};
use crate::ids::{ConceptId, SchemaId};
use crate::linkbase::{CalculationLinkbase, DefinitionLinkbase, LabelLinkbase, LinkbaseGraph, PresentationLinkbase};
use crate::presentation::PresentationEngine;
use crate::schema::{Concept, PeriodType, TaxonomySchema};
use crate::xlink::{Arc as XArc, ArcUse, ContextElement};
use crate::xml_util::{attr, local_name, read_attributes, read_text, split_qname};
use ahash::AHashMap;
use compact_str::CompactString;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// The default extended link role used when an extended link carries no
/// explicit `xlink:role`.
pub const DEFAULT_LINK_ROLE: &str = "http://www.xbrl.org/2003/role/link";

/// Tunable behaviors for DTS construction.
#[derive(Debug, Clone)]
pub struct DtsBuilderConfig {
    /// When `false` (default), a presentation concept with more than one
    /// source in a link role is a `TaxonomyCreationError`. When `true`,
    /// reproduces the original's silent "first source wins" behavior.
    pub legacy_presentation_parent: bool,
}

impl Default for DtsBuilderConfig {
    fn default() -> Self {
        Self {
            legacy_presentation_parent: false,
        }
    }
}

/// A Discoverable Taxonomy Set: a root schema plus every schema it
/// transitively imports, and the four linkbases layered over them.
pub struct Dts {
    pub schemas: Vec<TaxonomySchema>,
    pub concepts: Vec<Concept>,
    schema_by_name: AHashMap<CompactString, SchemaId>,
    concept_by_id: AHashMap<CompactString, ConceptId>,
    concept_by_schema_name: AHashMap<(SchemaId, CompactString), ConceptId>,
    concept_by_subst_group: AHashMap<CompactString, Vec<ConceptId>>,
    pub presentation: PresentationLinkbase,
    pub definition: DefinitionLinkbase,
    pub calculation: CalculationLinkbase,
    pub label: LabelLinkbase,
    pub presentation_trees: PresentationEngine,
    pub dimensions: DimensionEngine,
}

impl Dts {
    pub fn schema_id(&self, name: &str) -> Option<SchemaId> {
        self.schema_by_name.get(name).copied()
    }

    pub fn concept(&self, id: ConceptId) -> &Concept {
        &self.concepts[id.index()]
    }

    pub fn concept_by_id(&self, id: &str) -> Option<ConceptId> {
        self.concept_by_id.get(id).copied()
    }

    pub fn concept_by_name(&self, schema: SchemaId, name: &str) -> Option<ConceptId> {
        self.concept_by_schema_name
            .get(&(schema, CompactString::new(name)))
            .copied()
    }

    /// Resolve a `(prefix, local-name)` pair against the DTS, matching the
    /// schema whose declared prefix equals `prefix`.
    pub fn concept_by_qname(&self, prefix: &str, local: &str) -> Option<ConceptId> {
        for schema in &self.schemas {
            if schema.prefix == prefix {
                if let Some(id) = self.concept_by_name(self.schema_id(&schema.name)?, local) {
                    return Some(id);
                }
            }
        }
        None
    }

    pub fn concepts_by_substitution_group(&self, uri: &str) -> &[ConceptId] {
        self.concept_by_subst_group
            .get(uri)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn register_concept(&mut self, schema: SchemaId, concept: Concept) -> Result<ConceptId> {
        if self.concept_by_id.contains_key(&concept.id) {
            return Err(TaxonomyCreationError::DuplicateConceptId { id: concept.id }.into());
        }
        let key = (schema, concept.name.clone());
        if self.concept_by_schema_name.contains_key(&key) {
            return Err(TaxonomyCreationError::DuplicateConceptName {
                schema: self.schemas[schema.index()].name.clone(),
                name: concept.name,
            }
            .into());
        }
        let concept_id = ConceptId(self.concepts.len() as u32);
        self.concept_by_id.insert(concept.id.clone(), concept_id);
        self.concept_by_schema_name.insert(key, concept_id);
        if let Some(sg) = &concept.substitution_group {
            self.concept_by_subst_group
                .entry(sg.clone())
                .or_default()
                .push(concept_id);
        }
        self.schemas[schema.index()].concepts.push(concept_id);
        self.concepts.push(concept);
        Ok(concept_id)
    }
}

struct SchemaFile {
    name: CompactString,
    path: PathBuf,
}

struct Builder {
    cfg: DtsBuilderConfig,
    dts: Dts,
    linkbase_refs: Vec<PathBuf>,
    seen_linkbases: HashSet<PathBuf>,
}

/// Build a DTS from a root taxonomy schema file.
pub fn create_dts(root_schema: &Path) -> Result<Dts> {
    create_dts_with_config(root_schema, DtsBuilderConfig::default())
}

pub fn create_dts_with_config(root_schema: &Path, cfg: DtsBuilderConfig) -> Result<Dts> {
    let mut builder = Builder {
        cfg,
        dts: Dts {
            schemas: Vec::new(),
            concepts: Vec::new(),
            schema_by_name: AHashMap::default(),
            concept_by_id: AHashMap::default(),
            concept_by_schema_name: AHashMap::default(),
            concept_by_subst_group: AHashMap::default(),
            presentation: PresentationLinkbase::default(),
            definition: DefinitionLinkbase::default(),
            calculation: CalculationLinkbase::default(),
            label: LabelLinkbase::default(),
            presentation_trees: PresentationEngine::default(),
            dimensions: DimensionEngine::default(),
        },
        linkbase_refs: Vec::new(),
        seen_linkbases: HashSet::new(),
    };

    builder.load_schemas(root_schema)?;
    builder.load_linkbases()?;

    builder.dts.presentation_trees =
        crate::presentation::build(&builder.dts.presentation, builder.cfg.legacy_presentation_parent)?;
    builder.dts.dimensions = crate::dimension::build(&builder.dts)?;

    Ok(builder.dts)
}

impl Builder {
    fn load_schemas(&mut self, root_schema: &Path) -> Result<()> {
        let mut visited: HashSet<CompactString> = HashSet::new();
        let mut queue: VecDeque<SchemaFile> = VecDeque::new();
        let root_name = file_name(root_schema);
        queue.push_back(SchemaFile {
            name: root_name,
            path: root_schema.to_path_buf(),
        });

        while let Some(file) = queue.pop_front() {
            if !visited.insert(file.name.clone()) {
                tracing::warn!(schema = %file.name, "schema import cycle, already loaded");
                continue;
            }
            tracing::debug!(schema = %file.name, "loading schema");
            let content = std::fs::read(&file.path).map_err(|_| {
                Error::TaxonomyCreation(TaxonomyCreationError::SchemaNotFound(file.name.clone()))
            })?;
            let imports = self.load_schema_content(&file.name, &file.path, &content)?;
            for import in imports {
                if import.starts_with("http://") || import.starts_with("https://") {
                    tracing::debug!(location = %import, "skipping remote import (no network fetch)");
                    continue;
                }
                let import_path = resolve_relative(&file.path, &import);
                let import_name = file_name(&import_path);
                if !visited.contains(&import_name) {
                    queue.push_back(SchemaFile {
                        name: import_name,
                        path: import_path,
                    });
                }
            }
        }
        Ok(())
    }

    /// Parse one schema file: register its concepts, return the list of
    /// `schemaLocation`s it imports and queue any `linkbaseRef`s found in
    /// its annotations.
    fn load_schema_content(
        &mut self,
        name: &CompactString,
        path: &Path,
        content: &[u8],
    ) -> Result<Vec<String>> {
        let mut reader = Reader::from_reader(content);
        reader.trim_text(true);
        let mut buf = Vec::new();

        let mut target_namespace = CompactString::new("");
        let mut xmlns: Vec<(String, String)> = Vec::new();
        let mut imports = Vec::new();
        let mut pending_concepts: Vec<Vec<(String, String)>> = Vec::new();
        let mut linkbase_refs: Vec<String> = Vec::new();

        loop {
            buf.clear();
            match reader
                .read_event_into(&mut buf)
                .map_err(|e| Error::XmlParse(e.to_string()))?
            {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let name_str = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let attrs = read_attributes(e)?;
                    match local_name(&name_str) {
                        "schema" => {
                            for (k, v) in &attrs {
                                if k == "targetNamespace" {
                                    target_namespace = CompactString::new(v);
                                } else if k.starts_with("xmlns") {
                                    xmlns.push((k.clone(), v.clone()));
                                }
                            }
                        }
                        "import" | "include" => {
                            if let Some(loc) = attr(&attrs, "schemaLocation") {
                                imports.push(loc.to_string());
                            }
                        }
                        "element" => {
                            pending_concepts.push(attrs);
                        }
                        "linkbaseRef" => {
                            if let Some(href) = attr(&attrs, "href") {
                                linkbase_refs.push(href.to_string());
                            }
                        }
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let prefix = synthesize_prefix(&xmlns, &target_namespace, name);

        let schema_id = SchemaId(self.dts.schemas.len() as u32);
        self.dts.schema_by_name.insert(name.clone(), schema_id);
        self.dts.schemas.push(TaxonomySchema {
            name: name.clone(),
            namespace: target_namespace.clone(),
            prefix: prefix.clone(),
            imports: imports.iter().map(|s| CompactString::new(s)).collect(),
            concepts: Vec::new(),
        });

        for attrs in pending_concepts {
            if let Some(concept) = build_concept(&attrs, schema_id, &prefix, &target_namespace) {
                self.dts.register_concept(schema_id, concept)?;
            }
        }

        for href in linkbase_refs {
            if href.starts_with("http://") || href.starts_with("https://") {
                tracing::debug!(href = %href, "skipping remote linkbase ref");
                continue;
            }
            let lb_path = resolve_relative(path, &href);
            if self.seen_linkbases.insert(lb_path.clone()) {
                self.linkbase_refs.push(lb_path);
            }
        }

        Ok(imports)
    }

    fn load_linkbases(&mut self) -> Result<()> {
        let refs = std::mem::take(&mut self.linkbase_refs);
        for path in refs {
            let file_name = file_name(&path);
            tracing::debug!(linkbase = %file_name, "loading linkbase");
            let content = std::fs::read(&path).map_err(|_| {
                Error::TaxonomyCreation(TaxonomyCreationError::SchemaNotFound(file_name.clone()))
            })?;
            self.load_linkbase_content(&file_name, &content)?;
        }
        Ok(())
    }

    fn load_linkbase_content(&mut self, file_name: &CompactString, content: &[u8]) -> Result<()> {
        let mut reader = Reader::from_reader(content);
        reader.trim_text(true);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader
                .read_event_into(&mut buf)
                .map_err(|e| Error::XmlParse(e.to_string()))?
            {
                Event::Start(ref e) => {
                    let name_str = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let kind = match local_name(&name_str) {
                        "presentationLink" => Some(LinkKind::Presentation),
                        "definitionLink" => Some(LinkKind::Definition),
                        "calculationLink" => Some(LinkKind::Calculation),
                        "labelLink" => Some(LinkKind::Label),
                        _ => None,
                    };
                    let Some(kind) = kind else {
                        crate::xml_util::skip_element(&mut reader, &mut buf)?;
                        continue;
                    };
                    let attrs = read_attributes(e)?;
                    let role = attr(&attrs, "role")
                        .unwrap_or(DEFAULT_LINK_ROLE)
                        .to_string();
                    let children = read_link_children(&mut reader, &mut buf)?;
                    self.populate_link(kind, file_name, &role, children)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(())
    }

    fn populate_link(
        &mut self,
        kind: LinkKind,
        file_name: &CompactString,
        role: &str,
        children: Vec<LinkChild>,
    ) -> Result<()> {
        let role = CompactString::new(role);
        // Pass 1: resources, so a locator's href (pass 2) can fall back to
        // a resource id declared anywhere in the file regardless of
        // element order in the source.
        for child in &children {
            if attr(&child.attrs, "type") != Some("resource") {
                continue;
            }
            let label = attr(&child.attrs, "label").unwrap_or_default().to_string();
            let id = attr(&child.attrs, "id").map(CompactString::new);
            let title = attr(&child.attrs, "title").map(CompactString::new);
            let lrole = attr(&child.attrs, "role").map(CompactString::new);
            let lang = attr(&child.attrs, "lang").map(CompactString::new);
            self.graph_mut(kind).add_resource(
                CompactString::new(&label),
                lrole,
                title,
                id,
                lang,
                CompactString::new(&child.text),
                file_name.clone(),
                role.clone(),
            );
        }

        // Pass 2: locators. Resolved against the concept registry first,
        // falling back to a resource added in pass 1.
        for child in &children {
            if attr(&child.attrs, "type") != Some("locator") {
                continue;
            }
            let label = attr(&child.attrs, "label").unwrap_or_default().to_string();
            let href = attr(&child.attrs, "href").unwrap_or_default().to_string();
            let target = {
                let dts = &self.dts;
                let existing_graph = match kind {
                    LinkKind::Presentation => &dts.presentation.0,
                    LinkKind::Definition => &dts.definition.0,
                    LinkKind::Calculation => &dts.calculation.0,
                    LinkKind::Label => &dts.label.0,
                };
                crate::linkbase::resolve_href(
                    |_schema_file, id| dts.concept_by_id(id),
                    |file, id| existing_graph.resource_by_file_id(file, id),
                    &href,
                    file_name,
                )?
            };
            let id = attr(&child.attrs, "id").map(CompactString::new);
            let title = attr(&child.attrs, "title").map(CompactString::new);
            let lrole = attr(&child.attrs, "role").map(CompactString::new);
            self.graph_mut(kind).add_locator(
                CompactString::new(&label),
                lrole,
                title,
                id,
                target,
                file_name.clone(),
                role.clone(),
            );
        }

        // Pass 3: arcs.
        for child in &children {
            if attr(&child.attrs, "type") != Some("arc") {
                continue;
            }
            let from = attr(&child.attrs, "from").unwrap_or_default();
            let to = attr(&child.attrs, "to").unwrap_or_default();
            let arcrole = attr(&child.attrs, "arcrole").unwrap_or_default().to_string();
            let order: f64 = attr(&child.attrs, "order")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0);
            let weight: f64 = attr(&child.attrs, "weight")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1.0);
            let priority: i32 = attr(&child.attrs, "priority")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let use_ = attr(&child.attrs, "use")
                .map(ArcUse::parse)
                .unwrap_or(ArcUse::Optional);
            let context_element = attr(&child.attrs, "contextElement")
                .map(ContextElement::parse)
                .unwrap_or(ContextElement::Unset);
            let target_role = attr(&child.attrs, "targetRole").map(CompactString::new);
            let usable: Option<bool> = attr(&child.attrs, "usable").map(|v| v == "true");

            let graph = self.graph_mut(kind);
            let sources = graph.labels(file_name, role.as_str(), from).to_vec();
            let targets = graph.labels(file_name, role.as_str(), to).to_vec();
            for &source in &sources {
                for &target in &targets {
                    let arc = XArc {
                        source,
                        target,
                        arcrole: CompactString::new(&arcrole),
                        extended_link_role: role.clone(),
                        context_element,
                        target_role: target_role.clone(),
                        order,
                        weight,
                        priority,
                        use_,
                    };
                    graph.add_arc(arc);
                    if let Some(usable) = usable {
                        graph.apply_usable(target, usable);
                    }
                }
            }
        }
        Ok(())
    }

    fn graph_mut(&mut self, kind: LinkKind) -> &mut LinkbaseGraph {
        match kind {
            LinkKind::Presentation => &mut self.dts.presentation.0,
            LinkKind::Definition => &mut self.dts.definition.0,
            LinkKind::Calculation => &mut self.dts.calculation.0,
            LinkKind::Label => &mut self.dts.label.0,
        }
    }
}

#[derive(Clone, Copy)]
enum LinkKind {
    Presentation,
    Definition,
    Calculation,
    Label,
}

struct LinkChild {
    attrs: Vec<(String, String)>,
    text: String,
}

fn read_link_children(reader: &mut Reader<&[u8]>, buf: &mut Vec<u8>) -> Result<Vec<LinkChild>> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    loop {
        buf.clear();
        match reader
            .read_event_into(buf)
            .map_err(|e| Error::XmlParse(e.to_string()))?
        {
            Event::Start(ref e) => {
                let attrs = read_attributes(e)?;
                let text = read_text(reader, buf)?;
                out.push(LinkChild { attrs, text });
            }
            Event::Empty(ref e) => {
                let attrs = read_attributes(e)?;
                out.push(LinkChild {
                    attrs,
                    text: String::new(),
                });
            }
            Event::End(_) => {
                if depth == 0 {
                    return Ok(out);
                }
                depth -= 1;
            }
            Event::Eof => return Ok(out),
            _ => {}
        }
    }
}

fn build_concept(
    attrs: &[(String, String)],
    schema: SchemaId,
    prefix: &str,
    namespace: &str,
) -> Option<Concept> {
    let id = attr(attrs, "id")?;
    let name = attr(attrs, "name").unwrap_or(id);
    Some(Concept {
        id: CompactString::new(id),
        name: CompactString::new(name),
        schema,
        namespace_prefix: CompactString::new(prefix),
        namespace_uri: CompactString::new(namespace),
        concept_type: attr(attrs, "type").unwrap_or_default().into(),
        substitution_group: attr(attrs, "substitutionGroup").map(CompactString::new),
        period_type: attr(attrs, "periodType")
            .map(PeriodType::parse)
            .unwrap_or_default(),
        is_abstract: attr(attrs, "abstract") == Some("true"),
        is_nillable: attr(attrs, "nillable") == Some("true"),
        typed_domain_ref: attr(attrs, "typedDomainRef").map(CompactString::new),
    })
}

fn synthesize_prefix(xmlns: &[(String, String)], namespace: &str, schema_name: &str) -> CompactString {
    for (k, v) in xmlns {
        if v == namespace {
            let (_, local) = split_qname(k);
            if local != k.as_str() {
                return CompactString::new(local);
            }
        }
    }
    let trailing = namespace
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| schema_name.trim_end_matches(".xsd"));
    CompactString::new(format!("ns_{trailing}"))
}

fn file_name(path: &Path) -> CompactString {
    CompactString::new(
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned()),
    )
}

fn resolve_relative(base_file: &Path, location: &str) -> PathBuf {
    let base_dir = base_file.parent().unwrap_or_else(|| Path::new("."));
    base_dir.join(location)
}
