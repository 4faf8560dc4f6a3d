//! Outline Building Benchmarks
//!
//! Measures outline assembly from flat leveled records, document-structure
//! parsing and core-properties scanning.
//!
//! Run with: `cargo bench --bench outline_building`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use xps_structure::extractors::MetadataScanner;
use xps_structure::links::LinkResolver;
use xps_structure::outline::{parse_document_structure, OutlineBuilder, OutlineRecord};
use xps_structure::xml::parse_document;

/// Records shaped like a book: chapters, sections, subsections.
fn book_records(count: usize) -> Vec<OutlineRecord> {
    (0..count)
        .map(|i| {
            let level = match i % 7 {
                0 => 1,
                1 | 4 => 2,
                _ => 3,
            };
            OutlineRecord::new(level, format!("Entry {}", i)).with_target(format!("#anchor{}", i))
        })
        .collect()
}

fn structure_part(count: usize) -> String {
    let mut xml = String::from(
        "<DocumentStructure><DocumentStructure.Outline><DocumentOutline>",
    );
    for record in book_records(count) {
        xml.push_str(&format!(
            r#"<OutlineEntry OutlineLevel="{}" Description="{}" OutlineTarget="{}"/>"#,
            record.level,
            record.title.as_deref().unwrap_or_default(),
            record.target.as_deref().unwrap_or_default()
        ));
    }
    xml.push_str("</DocumentOutline></DocumentStructure.Outline></DocumentStructure>");
    xml
}

fn resolver(count: usize) -> LinkResolver {
    let mut resolver = LinkResolver::new();
    for page in 0..count / 10 + 1 {
        resolver.add_page(&format!("/Documents/1/Pages/{}.fpage", page + 1));
    }
    for i in 0..count {
        resolver.add_link_target(&format!("anchor{}", i), i / 10);
    }
    resolver
}

fn bench_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("outline_builder");
    for count in [100usize, 1_000, 10_000] {
        let records = book_records(count);
        let resolver = resolver(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &records, |b, records| {
            b.iter(|| {
                let mut builder = OutlineBuilder::new(&resolver);
                builder.extend(records.iter().cloned());
                black_box(builder.finish())
            })
        });
    }
    group.finish();
}

fn bench_structure_part(c: &mut Criterion) {
    let xml = structure_part(1_000);
    let resolver = resolver(1_000);
    c.bench_function("parse_document_structure_1000", |b| {
        b.iter(|| {
            let root = parse_document("/DocStructure.struct", black_box(xml.as_bytes())).unwrap();
            black_box(parse_document_structure(&root, &resolver))
        })
    });
}

fn bench_metadata(c: &mut Criterion) {
    let core = br#"<cp:coreProperties><dc:title>XML Paper Specification</dc:title><dc:subject>Reference</dc:subject><dc:creator>Someone</dc:creator><dcterms:created>2006-10-19T01:21:08Z</dcterms:created><dcterms:modified>2006-10-19T01:21:08Z</dcterms:modified></cp:coreProperties>"#;
    c.bench_function("metadata_scan", |b| b.iter(|| black_box(MetadataScanner::scan(black_box(core)))));
}

criterion_group!(benches, bench_builder, bench_structure_part, bench_metadata);
criterion_main!(benches);
