//! Integration tests for core-properties scanning.

use proptest::prelude::*;
use xps_structure::extractors::{MetadataScanner, PropertyDict, PropertyKey};

#[test]
fn test_scan_real_world_part() {
    let raw = "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\r\n\
<coreProperties xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\r\n\
\t<dc:title>\tQuarterly Report\t</dc:title>\r\n\
\t<dc:creator>Finance</dc:creator>\r\n\
\t<dcterms:created xsi:type=\"dcterms:W3CDTF\">2010-01-01T00:00:00Z</dcterms:created>\r\n\
</coreProperties>";
    let dict = MetadataScanner::scan(raw.as_bytes());
    assert_eq!(dict.get(PropertyKey::Title), Some("Quarterly Report"));
    assert_eq!(dict.get(PropertyKey::Author), Some("Finance"));
    assert_eq!(dict.get(PropertyKey::CreationDate), Some("2010-01-01T00:00:00Z"));
    assert_eq!(dict.len(), 3);
}

#[test]
fn test_extract_single_key_with_custom_tag() {
    let mut dict = PropertyDict::new();
    MetadataScanner::extract("<x><cp:keywords>a, b</cp:keywords></x>", &mut dict, PropertyKey::Subject, "cp:keywords");
    assert_eq!(dict.get(PropertyKey::Subject), Some("a, b"));
}

#[test]
fn test_only_first_occurrence_counts() {
    let dict = MetadataScanner::scan(b"<p><dc:title>First</dc:title><dc:title>Second</dc:title></p>");
    assert_eq!(dict.get(PropertyKey::Title), Some("First"));
}

#[test]
fn test_iteration_follows_scan_order() {
    let dict = MetadataScanner::scan(
        b"<p><dcterms:modified>m</dcterms:modified><dc:creator>c</dc:creator><dc:title>t</dc:title></p>",
    );
    let keys: Vec<_> = dict.iter().map(|(key, _)| key).collect();
    assert_eq!(keys, [PropertyKey::Title, PropertyKey::Author, PropertyKey::ModDate]);
}

proptest! {
    #[test]
    fn prop_scan_never_panics(raw in prop::collection::vec(any::<u8>(), 0..256)) {
        let dict = MetadataScanner::scan(&raw);
        prop_assert!(dict.iter().all(|(_, value)| !value.is_empty()));
    }

    #[test]
    fn prop_wrapped_value_is_found(value in "[A-Za-z0-9][A-Za-z0-9 .,-]{0,30}[A-Za-z0-9]") {
        let raw = format!("<p><dc:subject> {} </dc:subject></p>", value);
        let dict = MetadataScanner::scan(raw.as_bytes());
        prop_assert_eq!(dict.get(PropertyKey::Subject), Some(value.as_str()));
    }
}
