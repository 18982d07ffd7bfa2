//! End-to-end scenarios and cross-module invariants, built from inline
//! schema/linkbase/instance fixtures written to a temp directory. No
//! network access, no external XML-Schema validator.

use chrono::NaiveDate;
use crabrl::dimension::{DimensionMember, MultipleDimensionType};
use crabrl::error::{CalculationValidationError, Error, InstanceLoadError};
use crabrl::instance::{Fact, Instance, InstanceContext, InstancePeriod, InstanceUnit};
use crabrl::xlink::ContextElement;
use crabrl::{create_dts, load_instance, validate_calculations, Dts, ValidationConfig};
use std::fs;
use std::path::Path;

const DEFAULT_ROLE: &str = "http://www.xbrl.org/2003/role/link";

const COMPANY_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema"
            xmlns:xbrli="http://www.xbrl.org/2003/instance"
            xmlns:xbrldt="http://xbrl.org/2005/xbrldt"
            xmlns:link="http://www.xbrl.org/2003/linkbase"
            xmlns:xlink="http://www.w3.org/1999/xlink"
            targetNamespace="http://example.com/co"
            xmlns:co="http://example.com/co">
  <xsd:annotation>
    <xsd:appinfo>
      <link:linkbaseRef xlink:type="simple" xlink:href="presentation.xml" xlink:arcrole="http://www.w3.org/1999/xlink/properties/linkbase"/>
      <link:linkbaseRef xlink:type="simple" xlink:href="calculation.xml" xlink:arcrole="http://www.w3.org/1999/xlink/properties/linkbase"/>
      <link:linkbaseRef xlink:type="simple" xlink:href="definition.xml" xlink:arcrole="http://www.w3.org/1999/xlink/properties/linkbase"/>
    </xsd:appinfo>
  </xsd:annotation>

  <xsd:element id="Assets" name="Assets" substitutionGroup="xbrli:item" xbrli:periodType="instant" type="xbrli:monetaryItemType"/>
  <xsd:element id="CurrentAssets" name="CurrentAssets" substitutionGroup="xbrli:item" xbrli:periodType="instant" type="xbrli:monetaryItemType"/>
  <xsd:element id="NonCurrentAssets" name="NonCurrentAssets" substitutionGroup="xbrli:item" xbrli:periodType="instant" type="xbrli:monetaryItemType"/>

  <xsd:element id="AssetsByClass" name="AssetsByClass" substitutionGroup="xbrli:item" xbrli:periodType="instant" type="xbrli:monetaryItemType" abstract="true"/>
  <xsd:element id="ClassOfStockAxis" name="ClassOfStockAxis" substitutionGroup="xbrldt:dimensionItem" xbrli:periodType="instant" type="xbrli:stringItemType" abstract="true"/>
  <xsd:element id="CommonStockMember" name="CommonStockMember" substitutionGroup="xbrli:item" xbrli:periodType="instant" type="xbrli:stringItemType" abstract="true"/>
  <xsd:element id="PreferredStockMember" name="PreferredStockMember" substitutionGroup="xbrli:item" xbrli:periodType="instant" type="xbrli:stringItemType" abstract="true"/>
  <xsd:element id="ClassOfStockTableAll" name="ClassOfStockTableAll" substitutionGroup="xbrldt:hypercubeItem" xbrli:periodType="instant" type="xbrli:stringItemType" abstract="true"/>
  <xsd:element id="ClassOfStockTableNotAll" name="ClassOfStockTableNotAll" substitutionGroup="xbrldt:hypercubeItem" xbrli:periodType="instant" type="xbrli:stringItemType" abstract="true"/>
</xsd:schema>
"#;

const COMPANY_PRESENTATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<link:linkbase xmlns:link="http://www.xbrl.org/2003/linkbase" xmlns:xlink="http://www.w3.org/1999/xlink">
  <link:presentationLink xlink:type="extended" xlink:role="http://example.com/role/presentation">
    <link:loc xlink:type="locator" xlink:href="company.xsd#Assets" xlink:label="assets"/>
    <link:loc xlink:type="locator" xlink:href="company.xsd#CurrentAssets" xlink:label="current"/>
    <link:loc xlink:type="locator" xlink:href="company.xsd#NonCurrentAssets" xlink:label="noncurrent"/>
    <link:presentationArc xlink:type="arc" xlink:arcrole="http://www.xbrl.org/2003/arcrole/parent-child" xlink:from="assets" xlink:to="current" order="1"/>
    <link:presentationArc xlink:type="arc" xlink:arcrole="http://www.xbrl.org/2003/arcrole/parent-child" xlink:from="assets" xlink:to="noncurrent" order="2"/>
  </link:presentationLink>
</link:linkbase>
"#;

const COMPANY_CALCULATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<link:linkbase xmlns:link="http://www.xbrl.org/2003/linkbase" xmlns:xlink="http://www.w3.org/1999/xlink">
  <link:calculationLink xlink:type="extended" xlink:role="http://www.xbrl.org/2003/role/link">
    <link:loc xlink:type="locator" xlink:href="company.xsd#Assets" xlink:label="assets"/>
    <link:loc xlink:type="locator" xlink:href="company.xsd#CurrentAssets" xlink:label="current"/>
    <link:loc xlink:type="locator" xlink:href="company.xsd#NonCurrentAssets" xlink:label="noncurrent"/>
    <link:calculationArc xlink:type="arc" xlink:arcrole="http://www.xbrl.org/2003/arcrole/summation-item" xlink:from="assets" xlink:to="current" weight="1"/>
    <link:calculationArc xlink:type="arc" xlink:arcrole="http://www.xbrl.org/2003/arcrole/summation-item" xlink:from="assets" xlink:to="noncurrent" weight="1"/>
  </link:calculationLink>
</link:linkbase>
"#;

/// Definition linkbase exercising spec scenario 3: hypercube H1 (`all`)
/// restricts dimension D to member M1; hypercube H2 (`notAll`) restricts
/// the same dimension to member M2, via distinct `targetRole`s on their
/// `hypercube-dimension` arcs.
const COMPANY_DEFINITION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<link:linkbase xmlns:link="http://www.xbrl.org/2003/linkbase" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:xbrldt="http://xbrl.org/2005/xbrldt">
  <link:definitionLink xlink:type="extended" xlink:role="http://example.com/role/disclosure">
    <link:loc xlink:type="locator" xlink:href="company.xsd#AssetsByClass" xlink:label="primary"/>
    <link:loc xlink:type="locator" xlink:href="company.xsd#ClassOfStockTableAll" xlink:label="h1"/>
    <link:loc xlink:type="locator" xlink:href="company.xsd#ClassOfStockTableNotAll" xlink:label="h2"/>
    <link:loc xlink:type="locator" xlink:href="company.xsd#ClassOfStockAxis" xlink:label="dim"/>
    <link:definitionArc xlink:type="arc" xlink:arcrole="http://xbrl.org/int/dim/arcrole/all" xlink:from="primary" xlink:to="h1" xbrldt:contextElement="segment"/>
    <link:definitionArc xlink:type="arc" xlink:arcrole="http://xbrl.org/int/dim/arcrole/notAll" xlink:from="primary" xlink:to="h2" xbrldt:contextElement="segment"/>
    <link:definitionArc xlink:type="arc" xlink:arcrole="http://xbrl.org/int/dim/arcrole/hypercube-dimension" xlink:from="h1" xlink:to="dim" xbrldt:targetRole="http://example.com/role/domainM1"/>
    <link:definitionArc xlink:type="arc" xlink:arcrole="http://xbrl.org/int/dim/arcrole/hypercube-dimension" xlink:from="h2" xlink:to="dim" xbrldt:targetRole="http://example.com/role/domainM2"/>
  </link:definitionLink>
  <link:definitionLink xlink:type="extended" xlink:role="http://example.com/role/domainM1">
    <link:loc xlink:type="locator" xlink:href="company.xsd#ClassOfStockAxis" xlink:label="dim"/>
    <link:loc xlink:type="locator" xlink:href="company.xsd#CommonStockMember" xlink:label="m1"/>
    <link:definitionArc xlink:type="arc" xlink:arcrole="http://xbrl.org/int/dim/arcrole/dimension-domain" xlink:from="dim" xlink:to="m1"/>
  </link:definitionLink>
  <link:definitionLink xlink:type="extended" xlink:role="http://example.com/role/domainM2">
    <link:loc xlink:type="locator" xlink:href="company.xsd#ClassOfStockAxis" xlink:label="dim"/>
    <link:loc xlink:type="locator" xlink:href="company.xsd#PreferredStockMember" xlink:label="m2"/>
    <link:definitionArc xlink:type="arc" xlink:arcrole="http://xbrl.org/int/dim/arcrole/dimension-domain" xlink:from="dim" xlink:to="m2"/>
  </link:definitionLink>
</link:linkbase>
"#;

const PRIORITY_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema"
            xmlns:xbrli="http://www.xbrl.org/2003/instance"
            xmlns:link="http://www.xbrl.org/2003/linkbase"
            xmlns:xlink="http://www.w3.org/1999/xlink"
            targetNamespace="http://example.com/pr"
            xmlns:pr="http://example.com/pr">
  <xsd:annotation>
    <xsd:appinfo>
      <link:linkbaseRef xlink:type="simple" xlink:href="priority-calc.xml" xlink:arcrole="http://www.w3.org/1999/xlink/properties/linkbase"/>
    </xsd:appinfo>
  </xsd:annotation>
  <xsd:element id="A" name="A" substitutionGroup="xbrli:item" xbrli:periodType="instant" type="xbrli:monetaryItemType"/>
  <xsd:element id="B" name="B" substitutionGroup="xbrli:item" xbrli:periodType="instant" type="xbrli:monetaryItemType"/>
</xsd:schema>
"#;

const PRIORITY_CALCULATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<link:linkbase xmlns:link="http://www.xbrl.org/2003/linkbase" xmlns:xlink="http://www.w3.org/1999/xlink">
  <link:calculationLink xlink:type="extended" xlink:role="http://www.xbrl.org/2003/role/link">
    <link:loc xlink:type="locator" xlink:href="priority.xsd#A" xlink:label="a"/>
    <link:loc xlink:type="locator" xlink:href="priority.xsd#B" xlink:label="b"/>
    <link:calculationArc xlink:type="arc" xlink:arcrole="http://www.xbrl.org/2003/arcrole/summation-item" xlink:from="a" xlink:to="b" weight="1" priority="0"/>
    <link:calculationArc xlink:type="arc" xlink:arcrole="http://www.xbrl.org/2003/arcrole/summation-item" xlink:from="a" xlink:to="b" weight="2" priority="1"/>
  </link:calculationLink>
</link:linkbase>
"#;

fn write_company_fixture(dir: &Path) -> std::path::PathBuf {
    fs::write(dir.join("company.xsd"), COMPANY_SCHEMA).unwrap();
    fs::write(dir.join("presentation.xml"), COMPANY_PRESENTATION).unwrap();
    fs::write(dir.join("calculation.xml"), COMPANY_CALCULATION).unwrap();
    fs::write(dir.join("definition.xml"), COMPANY_DEFINITION).unwrap();
    dir.join("company.xsd")
}

fn company_instance_xml(current: &str, include_noncurrent: bool) -> String {
    let noncurrent_fact = if include_noncurrent {
        "  <co:NonCurrentAssets contextRef=\"c1\" unitRef=\"usd\" decimals=\"0\">60</co:NonCurrentAssets>\n"
    } else {
        ""
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<xbrl xmlns="http://www.xbrl.org/2003/instance" xmlns:link="http://www.xbrl.org/2003/linkbase" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:iso4217="http://www.xbrl.org/2003/iso4217" xmlns:co="http://example.com/co">
  <link:schemaRef xlink:type="simple" xlink:href="company.xsd"/>
  <context id="c1">
    <entity>
      <identifier scheme="http://example.com">0001</identifier>
    </entity>
    <period>
      <instant>2024-12-31</instant>
    </period>
  </context>
  <unit id="usd">
    <measure>iso4217:USD</measure>
  </unit>
  <co:Assets contextRef="c1" unitRef="usd" decimals="0">100</co:Assets>
  <co:CurrentAssets contextRef="c1" unitRef="usd" decimals="0">{current}</co:CurrentAssets>
{noncurrent_fact}</xbrl>
"#
    )
}

fn build_company_dts(dir: &Path) -> Dts {
    let schema = write_company_fixture(dir);
    create_dts(&schema).expect("create_dts should succeed for a well-formed fixture DTS")
}

// --- Scenario 1: single-schema concept lookup -----------------------------

#[test]
fn scenario_concept_lookup_and_numeric_item() {
    let dir = tempfile::tempdir().unwrap();
    let dts = build_company_dts(dir.path());

    let assets = dts.concept_by_id("Assets").expect("Assets concept registered");
    let concept = dts.concept(assets);
    assert_eq!(concept.name.as_str(), "Assets");
    assert!(concept.is_numeric_item());

    let axis = dts.concept_by_id("ClassOfStockAxis").unwrap();
    assert!(!dts.concept(axis).is_numeric_item());
}

// --- Scenario 2: priority wins among calculation arcs ---------------------

#[test]
fn scenario_priority_wins_calculation_arc() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("priority.xsd"), PRIORITY_SCHEMA).unwrap();
    fs::write(dir.path().join("priority-calc.xml"), PRIORITY_CALCULATION).unwrap();

    let dts = create_dts(&dir.path().join("priority.xsd")).unwrap();
    let a = dts.concept_by_id("A").unwrap();
    let b = dts.concept_by_id("B").unwrap();

    let calcs = dts.calculation.calculations(a, DEFAULT_ROLE);
    assert_eq!(calcs.len(), 1);
    assert_eq!(calcs.get(&b).copied(), Some(2.0));
}

// --- Scenario 3: all + notAll dimension exclusion -------------------------

#[test]
fn scenario_all_not_all_dimension_exclusion() {
    let dir = tempfile::tempdir().unwrap();
    let dts = build_company_dts(dir.path());

    let primary = dts.concept_by_id("AssetsByClass").unwrap();
    let axis = dts.concept_by_id("ClassOfStockAxis").unwrap();
    let m1 = dts.concept_by_id("CommonStockMember").unwrap();
    let m2 = dts.concept_by_id("PreferredStockMember").unwrap();

    assert_eq!(dts.dimensions.hypercube_count(), 2);

    let mut combo_m1 = MultipleDimensionType::new();
    combo_m1.add_predecessor_dimension_domain(axis, DimensionMember::Explicit(m1));
    assert!(dts.dimensions.dimension_allowed(primary, ContextElement::Segment, &combo_m1));

    let mut combo_m2 = MultipleDimensionType::new();
    combo_m2.add_predecessor_dimension_domain(axis, DimensionMember::Explicit(m2));
    assert!(!dts.dimensions.dimension_allowed(primary, ContextElement::Segment, &combo_m2));
}

// --- Scenarios 4-6: calculation validation --------------------------------

#[test]
fn scenario_calculation_pass() {
    let dir = tempfile::tempdir().unwrap();
    let schema = build_company_dts(dir.path());
    let instance_path = dir.path().join("instance.xml");
    fs::write(&instance_path, company_instance_xml("40", true)).unwrap();

    let instance = load_instance(&schema, &instance_path).unwrap();
    let errors = validate_calculations(&schema, &instance, &ValidationConfig::default());
    assert!(errors.is_empty(), "expected no calculation errors, got {errors:?}");
}

#[test]
fn scenario_calculation_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let schema = build_company_dts(dir.path());
    let instance_path = dir.path().join("instance.xml");
    fs::write(&instance_path, company_instance_xml("30", true)).unwrap();

    let instance = load_instance(&schema, &instance_path).unwrap();
    let errors = validate_calculations(&schema, &instance, &ValidationConfig::default());
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        CalculationValidationError::CalculationMismatch { expected, computed, .. } => {
            assert_eq!(expected.to_string(), "100");
            assert_eq!(computed.to_string(), "90");
        }
        other => panic!("expected a CalculationMismatch, got {other:?}"),
    }
}

#[test]
fn scenario_calculation_missing_summand() {
    let dir = tempfile::tempdir().unwrap();
    let schema = build_company_dts(dir.path());
    let instance_path = dir.path().join("instance.xml");
    fs::write(&instance_path, company_instance_xml("40", false)).unwrap();

    let instance = load_instance(&schema, &instance_path).unwrap();
    let errors = validate_calculations(&schema, &instance, &ValidationConfig::default());
    assert_eq!(errors.len(), 1);
    let non_current = schema.concept_by_id("NonCurrentAssets").unwrap();
    match &errors[0] {
        CalculationValidationError::MissingValues { concept, .. } => assert_eq!(*concept, non_current),
        other => panic!("expected MissingValues, got {other:?}"),
    }
}

// --- Invariants ------------------------------------------------------------

#[test]
fn invariant_concept_lookup_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let dts = build_company_dts(dir.path());

    for (index, concept) in dts.concepts.iter().enumerate() {
        let by_id = dts.concept_by_id(&concept.id).expect("every registered concept resolves by id");
        assert_eq!(by_id.index(), index);

        let by_name = dts
            .concept_by_name(concept.schema, &concept.name)
            .expect("every registered concept resolves by (schema, name)");
        assert_eq!(by_name.index(), index);
    }
}

#[test]
fn invariant_arc_extended_link_role_consistency() {
    let dir = tempfile::tempdir().unwrap();
    let dts = build_company_dts(dir.path());

    for role in dts.presentation.0.extended_link_roles() {
        for arc in dts.presentation.0.arc_base_set(crabrl::xlink::arcrole::PARENT_CHILD, role) {
            assert_eq!(arc.extended_link_role.as_str(), role);
            let source = dts.presentation.0.locator(arc.source).unwrap();
            let target = dts.presentation.0.locator(arc.target).unwrap();
            assert_eq!(source.extended_link_role.as_str(), role);
            assert_eq!(target.extended_link_role.as_str(), role);
        }
    }
}

#[test]
fn invariant_presentation_level_is_one_plus_parent() {
    let dir = tempfile::tempdir().unwrap();
    let dts = build_company_dts(dir.path());

    let tree = dts.presentation_trees.tree("http://example.com/role/presentation").unwrap();
    for (index, node) in tree.nodes.iter().enumerate() {
        match node.parent {
            Some(parent_index) => assert_eq!(node.level, tree.nodes[parent_index].level + 1),
            None => assert_eq!(node.level, 1, "root node {index} must have level 1"),
        }
    }
    assert!(!tree.roots.is_empty());
}

#[test]
fn invariant_hypercube_dimensions_have_domain_or_are_typed() {
    let dir = tempfile::tempdir().unwrap();
    let dts = build_company_dts(dir.path());

    let h1 = dts.concept_by_id("ClassOfStockTableAll").unwrap();
    let hypercube = dts.dimensions.hypercube(h1).expect("H1 registered");
    for dimension in hypercube.dimensions() {
        assert!(dimension.is_typed || dimension.domain_members().count() >= 1);
    }
}

#[test]
fn invariant_mdt_equality_is_order_independent() {
    let dir = tempfile::tempdir().unwrap();
    let dts = build_company_dts(dir.path());
    let axis = dts.concept_by_id("ClassOfStockAxis").unwrap();
    let m1 = dts.concept_by_id("CommonStockMember").unwrap();
    let h1 = dts.concept_by_id("ClassOfStockTableAll").unwrap();

    let mut forward = MultipleDimensionType::new();
    forward.add_predecessor_dimension_domain(axis, DimensionMember::Explicit(m1));
    forward.add_predecessor_dimension_domain(h1, DimensionMember::Explicit(m1));

    let mut backward = MultipleDimensionType::new();
    backward.add_predecessor_dimension_domain(h1, DimensionMember::Explicit(m1));
    backward.add_predecessor_dimension_domain(axis, DimensionMember::Explicit(m1));

    assert_eq!(forward, backward);
    assert_eq!(forward, forward.clone());
}

#[test]
fn invariant_instance_add_fact_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let dts = build_company_dts(dir.path());
    let assets = dts.concept_by_id("Assets").unwrap();

    let mut instance = Instance::default();
    instance.add_fact(Fact {
        concept: assets,
        context_ref: "c1".into(),
        unit_ref: Some("usd".into()),
        value: "100".into(),
        decimals: Some(0),
        precision: None,
    });

    let fact = instance.fact(assets, "c1").expect("fact round-trips through addFact/getFact");
    assert_eq!(fact.value.as_str(), "100");
}

#[test]
fn invariant_instance_loader_rejects_unresolved_dts_concept() {
    let dir = tempfile::tempdir().unwrap();
    let dts = build_company_dts(dir.path());
    let instance_path = dir.path().join("bad-instance.xml");
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<xbrl xmlns="http://www.xbrl.org/2003/instance" xmlns:link="http://www.xbrl.org/2003/linkbase" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:co="http://example.com/co">
  <link:schemaRef xlink:type="simple" xlink:href="company.xsd"/>
  <context id="c1">
    <entity>
      <identifier scheme="http://example.com">0001</identifier>
    </entity>
    <period>
      <instant>2024-12-31</instant>
    </period>
  </context>
  <co:NotARealConcept contextRef="c1">1</co:NotARealConcept>
</xbrl>
"#;
    fs::write(&instance_path, xml).unwrap();

    let err = load_instance(&dts, &instance_path).expect_err("unknown DTS-namespaced fact must fail to load");
    match err {
        Error::InstanceLoad(InstanceLoadError::UnknownFactElement(name)) => {
            assert!(name.contains("NotARealConcept"));
        }
        other => panic!("expected UnknownFactElement, got {other:?}"),
    }
}

// --- Round-trip: instance outputter ----------------------------------------

#[test]
fn roundtrip_instance_outputter() {
    let dir = tempfile::tempdir().unwrap();
    let dts = build_company_dts(dir.path());
    let assets = dts.concept_by_id("Assets").unwrap();
    let current = dts.concept_by_id("CurrentAssets").unwrap();

    let mut instance = Instance::default();
    instance.add_context(InstanceContext {
        id: "c1".into(),
        entity_scheme: "http://example.com".into(),
        entity_identifier: "0001".into(),
        period: InstancePeriod::Instant(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
        segment: MultipleDimensionType::new(),
        scenario: MultipleDimensionType::new(),
    });
    instance.add_unit(InstanceUnit {
        id: "usd".into(),
        measures: vec!["iso4217:USD".into()],
        divide: None,
    });
    instance.add_fact(Fact {
        concept: assets,
        context_ref: "c1".into(),
        unit_ref: Some("usd".into()),
        value: "100".into(),
        decimals: Some(0),
        precision: None,
    });
    instance.add_fact(Fact {
        concept: current,
        context_ref: "c1".into(),
        unit_ref: Some("usd".into()),
        value: "40".into(),
        decimals: Some(0),
        precision: None,
    });

    let xml = crabrl::outputter::to_xml(&dts, &instance, "company.xsd");
    let roundtrip_path = dir.path().join("roundtrip.xml");
    fs::write(&roundtrip_path, &xml).unwrap();

    let reparsed = load_instance(&dts, &roundtrip_path).unwrap();
    assert_eq!(reparsed.fact_text(assets, "c1"), instance.fact_text(assets, "c1"));
    assert_eq!(reparsed.fact_text(current, "c1"), instance.fact_text(current, "c1"));
    assert_eq!(reparsed.facts().count(), instance.facts().count());
}
