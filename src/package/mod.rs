//! Package part access.
//!
//! A package is a set of named parts (`/FixedDocumentSequence.fdseq`,
//! `/Documents/1/Pages/1.fpage`, ...). The byte-level container is a
//! collaborator behind [`PartReader`]; this module ships an in-memory reader
//! and, with the `zip` feature, a reader for zip containers.

use indexmap::IndexMap;

use crate::error::{Error, Result};

pub mod sequence;
#[cfg(feature = "zip")]
pub mod zip_package;

pub use sequence::{discover_documents, SubDocument};
#[cfg(feature = "zip")]
pub use zip_package::ZipPackage;

/// The bytes of one named part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Absolute part name
    pub name: String,
    /// Raw part content
    pub data: Vec<u8>,
}

/// Source of named parts.
pub trait PartReader {
    /// Read the part called `name` (absolute, `/`-rooted).
    fn read_part(&mut self, name: &str) -> Result<Part>;

    /// Whether a part called `name` exists.
    fn has_part(&mut self, name: &str) -> bool {
        self.read_part(name).is_ok()
    }
}

impl<R: PartReader + ?Sized> PartReader for &mut R {
    fn read_part(&mut self, name: &str) -> Result<Part> {
        (**self).read_part(name)
    }

    fn has_part(&mut self, name: &str) -> bool {
        (**self).has_part(name)
    }
}

/// Parts held in memory, looked up case-insensitively.
///
/// # Example
///
/// ```
/// use xps_structure::package::{MemoryPackage, PartReader};
///
/// let mut package = MemoryPackage::new().with_part("/a.xml", "<a/>");
/// assert_eq!(package.read_part("/A.XML").unwrap().data, b"<a/>");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryPackage {
    parts: IndexMap<String, (String, Vec<u8>)>,
}

impl MemoryPackage {
    /// Create an empty package.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a part.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        let name = normalize_part_name(&name.into());
        self.parts.insert(name.to_lowercase(), (name, data.into()));
    }

    /// Builder form of [`MemoryPackage::insert`].
    pub fn with_part(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(name, data);
        self
    }
}

impl PartReader for MemoryPackage {
    fn read_part(&mut self, name: &str) -> Result<Part> {
        let key = normalize_part_name(name).to_lowercase();
        match self.parts.get(&key) {
            Some((stored, data)) => Ok(Part {
                name: stored.clone(),
                data: data.clone(),
            }),
            None => Err(Error::PartNotFound(name.to_string())),
        }
    }

    fn has_part(&mut self, name: &str) -> bool {
        self.parts
            .contains_key(&normalize_part_name(name).to_lowercase())
    }
}

/// Directory of a part name, including the trailing `/`.
///
/// ```
/// use xps_structure::package::part_directory;
///
/// assert_eq!(part_directory("/Documents/1/FixedDocument.fdoc"), "/Documents/1/");
/// assert_eq!(part_directory("/root.fdseq"), "/");
/// ```
pub fn part_directory(name: &str) -> &str {
    match name.rfind('/') {
        Some(pos) => &name[..=pos],
        None => "/",
    }
}

/// Resolve `reference` against the directory of `base_part`.
///
/// Absolute references are only normalized. Fragments (`#name`) are kept.
///
/// ```
/// use xps_structure::package::resolve_part_name;
///
/// assert_eq!(
///     resolve_part_name("/Documents/1/FixedDocument.fdoc", "Pages/2.fpage"),
///     "/Documents/1/Pages/2.fpage"
/// );
/// assert_eq!(
///     resolve_part_name("/Documents/1/Structure/DocStructure.struct", "../Pages/1.fpage#top"),
///     "/Documents/1/Pages/1.fpage#top"
/// );
/// ```
pub fn resolve_part_name(base_part: &str, reference: &str) -> String {
    let (path, fragment) = match reference.find('#') {
        Some(pos) => (&reference[..pos], Some(&reference[pos..])),
        None => (reference, None),
    };

    let joined = if path.starts_with('/') {
        path.to_string()
    } else if path.is_empty() {
        base_part.to_string()
    } else {
        format!("{}{}", part_directory(base_part), path)
    };

    let mut resolved = normalize_part_name(&joined);
    if let Some(fragment) = fragment {
        resolved.push_str(fragment);
    }
    resolved
}

/// Collapse `.`/`..` segments and duplicate slashes, and root the name.
pub fn normalize_part_name(name: &str) -> String {
    let name = name.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}
