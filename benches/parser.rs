use crabrl::create_dts;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::io::Write;
use tempfile::NamedTempFile;

fn minimal_schema() -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".xsd").expect("tempfile");
    write!(
        file,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema"
            xmlns:xbrli="http://www.xbrl.org/2003/instance"
            targetNamespace="http://example.com/bench"
            xmlns:bench="http://example.com/bench">
  <xsd:element id="Assets" name="Assets" substitutionGroup="xbrli:item"
               xbrli:periodType="instant" type="xbrli:monetaryItemType"/>
</xsd:schema>"#
    )
    .expect("write schema");
    file
}

fn build_dts(c: &mut Criterion) {
    let schema = minimal_schema();
    c.bench_function("create_dts_minimal", |b| {
        b.iter(|| create_dts(black_box(schema.path())));
    });
}

criterion_group!(benches, build_dts);
criterion_main!(benches);
