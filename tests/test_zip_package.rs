//! Integration tests for zip-packaged documents on disk.

#![cfg(feature = "zip")]

use std::fs::File;
use std::io::Write;
use std::path::Path;

use xps_structure::document::StructureDocument;
use xps_structure::extractors::PropertyKey;
use xps_structure::package::{PartReader, ZipPackage};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn write_package(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    for (name, body) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

const ENTRIES: &[(&str, &str)] = &[
    (
        "_rels/.rels",
        r#"<Relationships><Relationship Type="http://schemas.microsoft.com/xps/2005/06/fixedrepresentation" Target="/FixedDocSeq.fdseq"/></Relationships>"#,
    ),
    (
        "FixedDocSeq.fdseq",
        r#"<FixedDocumentSequence><DocumentReference Source="/Documents/1/FixedDoc.fdoc"/></FixedDocumentSequence>"#,
    ),
    (
        "Documents/1/FixedDoc.fdoc",
        r#"<FixedDocument><PageContent Source="Pages/1.fpage"><PageContent.LinkTargets><LinkTarget Name="start"/></PageContent.LinkTargets></PageContent></FixedDocument>"#,
    ),
    (
        "Documents/1/_rels/FixedDoc.fdoc.rels",
        r#"<Relationships><Relationship Type="http://schemas.microsoft.com/xps/2005/06/documentstructure" Target="Structure/DocStructure.struct"/></Relationships>"#,
    ),
    // The outline part is stored interleaved.
    (
        "Documents/1/Structure/DocStructure.struct/[0].piece",
        r#"<DocumentStructure><DocumentStructure.Outline><DocumentOutline><OutlineEntry OutlineLevel="1" "#,
    ),
    (
        "Documents/1/Structure/DocStructure.struct/[1].last.piece",
        r#"Description="Start" OutlineTarget="../FixedDoc.fdoc#start"/></DocumentOutline></DocumentStructure.Outline></DocumentStructure>"#,
    ),
    ("Documents/1/Pages/1.fpage", r#"<FixedPage Width="10" Height="10" Name="start"/>"#),
    (
        "docProps/core.xml",
        "<cp:coreProperties><dc:subject>Zipped</dc:subject></cp:coreProperties>",
    ),
];

#[test]
fn test_open_zip_package_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.xps");
    write_package(&path, ENTRIES);

    let mut doc = StructureDocument::open_path(&path).unwrap();
    assert_eq!(doc.page_count().unwrap(), 1);

    let items = doc.outline().unwrap().to_items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Start");
    assert_eq!(items[0].link.as_deref(), Some("#1"));

    assert_eq!(doc.properties().unwrap().get(PropertyKey::Subject), Some("Zipped"));
    doc.close();
}

#[test]
fn test_zip_part_lookup_ignores_case() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("case.xps");
    write_package(&path, ENTRIES);

    let mut package = ZipPackage::open(&path).unwrap();
    assert!(package.has_part("/FIXEDDOCSEQ.FDSEQ"));
    assert!(package.has_part("/documents/1/structure/docstructure.struct"));
    assert!(!package.has_part("/missing.xml"));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = StructureDocument::open_path(dir.path().join("absent.xps"));
    assert!(matches!(result, Err(xps_structure::Error::Io(_))));
}

#[test]
fn test_not_a_zip_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"plain text, not an archive").unwrap();
    let result = StructureDocument::open_path(file.path());
    assert!(matches!(result, Err(xps_structure::Error::Zip(_))));
}
