//! Core document properties (title, subject, author, dates).
//!
//! The core-properties part is an OPC `cp:coreProperties` document. It is
//! scanned, not parsed: each recognized property is found by its tag name
//! and the text between the opening and closing tags is taken. Anything
//! unexpected leaves that property absent, and scanning never fails.
//!
//! ```text
//! <cp:coreProperties ...>
//!   <dc:title>XML Paper Specification</dc:title>
//!   <dc:creator>Jesse McGatha</dc:creator>
//!   <dcterms:created xsi:type="dcterms:W3CDTF">2006-10-19T01:21:08Z</dcterms:created>
//! </cp:coreProperties>
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::fault::FaultContext;
use crate::package::sequence::read_xml_part;
use crate::package::PartReader;

/// Content-types part listing part names and their types.
pub const CONTENT_TYPES_PART: &str = "/[Content_Types].xml";

/// Content type of the core-properties part.
pub const CONTENT_TYPE_CORE_PROPS: &str =
    "application/vnd.openxmlformats-package.core-properties+xml";

/// The recognized document properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKey {
    /// Document title
    Title,
    /// Document subject
    Subject,
    /// Author
    Author,
    /// Creation date, as written in the part
    CreationDate,
    /// Last modification date, as written in the part
    ModDate,
}

impl PropertyKey {
    /// Every key, in scan order.
    pub const ALL: [PropertyKey; 5] = [
        PropertyKey::Title,
        PropertyKey::Subject,
        PropertyKey::Author,
        PropertyKey::CreationDate,
        PropertyKey::ModDate,
    ];

    /// Name of the property as exposed to the host.
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyKey::Title => "Title",
            PropertyKey::Subject => "Subject",
            PropertyKey::Author => "Author",
            PropertyKey::CreationDate => "CreationDate",
            PropertyKey::ModDate => "ModDate",
        }
    }

    /// Tag the property is stored under in the core-properties part.
    pub fn tag(self) -> &'static str {
        match self {
            PropertyKey::Title => "dc:title",
            PropertyKey::Subject => "dc:subject",
            PropertyKey::Author => "dc:creator",
            PropertyKey::CreationDate => "dcterms:created",
            PropertyKey::ModDate => "dcterms:modified",
        }
    }

    /// Look a key up by its host name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for PropertyKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Document properties. Keys that were not found are absent, never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PropertyDict {
    values: IndexMap<PropertyKey, String>,
}

impl PropertyDict {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `key`, if present.
    pub fn get(&self, key: PropertyKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Value by host name (`"Title"`, `"ModDate"`, ...).
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        PropertyKey::from_name(name).and_then(|key| self.get(key))
    }

    /// Number of properties present.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no metadata is available.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Present properties in scan order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyKey, &str)> {
        self.values.iter().map(|(key, value)| (*key, value.as_str()))
    }

    fn insert(&mut self, key: PropertyKey, value: String) {
        self.values.insert(key, value);
    }
}

/// Tolerant core-properties scanner.
pub struct MetadataScanner;

impl MetadataScanner {
    /// Scan raw part bytes for every recognized property.
    pub fn scan(raw: &[u8]) -> PropertyDict {
        let text = String::from_utf8_lossy(raw);
        let mut dict = PropertyDict::new();
        for key in PropertyKey::ALL {
            Self::extract(&text, &mut dict, key, key.tag());
        }
        dict
    }

    /// Store the text enclosed by `tag` under `key`.
    ///
    /// Only the first occurrence of `tag` is considered. Nothing is stored
    /// when that occurrence opens the buffer or is not preceded by `<`, when
    /// no later `</tag` follows it, when the opening tag is not closed by
    /// `>` before that, or when the trimmed content is empty.
    pub fn extract(raw: &str, dict: &mut PropertyDict, key: PropertyKey, tag: &str) {
        if let Some(value) = Self::enclosed_text(raw, tag) {
            dict.insert(key, value.to_string());
        }
    }

    fn enclosed_text<'a>(raw: &'a str, tag: &str) -> Option<&'a str> {
        if tag.is_empty() {
            return None;
        }
        let bytes = raw.as_bytes();

        let start = raw.find(tag)?;
        if start == 0 || bytes[start - 1] != b'<' {
            return None;
        }
        let skip = tag.chars().next().map_or(1, char::len_utf8);
        let end = start + skip + raw[start + skip..].find(tag)?;
        let open_end = start + raw[start..].find('>')?;
        if open_end >= end || end < 2 || bytes[end - 2] != b'<' || bytes[end - 1] != b'/' {
            return None;
        }

        let content = raw[open_end + 1..end - 2].trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
        if content.is_empty() {
            None
        } else {
            Some(content)
        }
    }
}

/// Find the core-properties part name through `[Content_Types].xml`.
///
/// Returns `Ok(None)` when the content types exist but name no such part.
pub fn find_core_properties_part<R: PartReader>(
    ctx: &mut FaultContext,
    reader: &mut R,
) -> Result<Option<String>> {
    let root = read_xml_part(ctx, reader, CONTENT_TYPES_PART)?;
    if !root.is("Types") {
        return Err(ctx.fail("couldn't parse part '[Content_Types].xml'"));
    }

    Ok(root
        .children_named("Override")
        .filter(|item| item.attr("ContentType") == Some(CONTENT_TYPE_CORE_PROPS))
        .filter_map(|item| item.attr("PartName"))
        .last()
        .map(str::to_string))
}

/// Extract document properties from a package.
///
/// Best effort: a missing content-types part falls back to `fallback_part`,
/// and an unreadable properties part yields an empty dictionary. Only fatal
/// fault errors are returned.
pub fn extract_properties<R: PartReader>(
    ctx: &mut FaultContext,
    reader: &mut R,
    fallback_part: &str,
) -> Result<PropertyDict> {
    let part_name = match ctx.try_scope("content types", |ctx| find_core_properties_part(ctx, reader)) {
        Ok(Some(name)) => name,
        Ok(None) => {
            log::debug!("content types name no core-properties part");
            return Ok(PropertyDict::new());
        },
        Err(e) if e.is_fatal() => return Err(e),
        Err(_) => {
            ctx.warn(format!("couldn't find the exact part name for {}", fallback_part));
            fallback_part.to_string()
        },
    };

    match reader.read_part(&part_name) {
        Ok(part) => {
            let dict = MetadataScanner::scan(&part.data);
            log::debug!("read {} properties from '{}'", dict.len(), part.name);
            Ok(dict)
        },
        Err(e) => {
            ctx.warn(format!("cannot read part '{}': {}", part_name, e));
            Ok(PropertyDict::new())
        },
    }
}
