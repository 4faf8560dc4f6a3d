//! Discovery of the sub-documents that make up a package.
//!
//! The package root relationships point at a fixed-document sequence, which
//! lists the fixed documents (sub-documents). Each fixed document lists its
//! pages and named link targets, and its own relationships may point at a
//! document-structure part holding its outline.

use serde::Serialize;

use super::{part_directory, resolve_part_name, PartReader};
use crate::error::Result;
use crate::fault::FaultContext;
use crate::xml::{parse_document, XmlElement};

/// Sequence part used when the root relationships do not name one.
pub const DEFAULT_SEQUENCE_PART: &str = "/FixedDocumentSequence.fdseq";

/// Root relationships part.
pub const ROOT_RELATIONSHIPS_PART: &str = "/_rels/.rels";

const REL_FIXED_REPRESENTATION: &str = "/fixedrepresentation";
const REL_DOCUMENT_STRUCTURE: &str = "/documentstructure";

/// One independently parsed unit of the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubDocument {
    /// Part name of the fixed document
    pub name: String,
    /// Global index of this sub-document's first page
    pub first_page: usize,
    /// Page part names, in page order
    pub pages: Vec<String>,
    /// Named link targets and the global page index they live on
    pub link_targets: Vec<(String, usize)>,
    /// Document-structure part carrying the outline, if any
    pub outline: Option<String>,
}

/// A relationship from a `.rels` part, with its target resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship type URI
    pub kind: String,
    /// Absolute target part name
    pub target: String,
}

/// Read and parse a part as XML, raising faults through `ctx`.
pub fn read_xml_part<R: PartReader>(
    ctx: &mut FaultContext,
    reader: &mut R,
    name: &str,
) -> Result<XmlElement> {
    let part = reader
        .read_part(name)
        .map_err(|e| ctx.fail(format!("cannot read part '{}': {}", name, e)))?;
    parse_document(&part.name, &part.data)
        .map_err(|e| ctx.fail(format!("cannot parse part '{}': {}", name, e)))
}

/// Name of the relationships part describing `source_part`.
///
/// ```
/// use xps_structure::package::sequence::relationships_part_for;
///
/// assert_eq!(
///     relationships_part_for("/Documents/1/FixedDocument.fdoc"),
///     "/Documents/1/_rels/FixedDocument.fdoc.rels"
/// );
/// ```
pub fn relationships_part_for(source_part: &str) -> String {
    let dir = part_directory(source_part);
    let file = &source_part[dir.len()..];
    format!("{}_rels/{}.rels", dir, file)
}

/// Parse a relationships part. Targets are resolved against `source_part`.
pub fn read_relationships<R: PartReader>(
    ctx: &mut FaultContext,
    reader: &mut R,
    source_part: &str,
) -> Result<Vec<Relationship>> {
    let rels_part = relationships_part_for(source_part);
    let root = read_xml_part(ctx, reader, &rels_part)?;
    if !root.is("Relationships") {
        return Err(ctx.fail(format!("part '{}' is not a relationships part", rels_part)));
    }

    Ok(root
        .children_named("Relationship")
        .filter_map(|rel| {
            let kind = rel.attr("Type")?;
            let target = rel.attr("Target")?;
            Some(Relationship {
                kind: kind.to_string(),
                target: resolve_part_name(source_part, target),
            })
        })
        .collect())
}

/// Locate the fixed-document sequence part.
///
/// Falls back to [`DEFAULT_SEQUENCE_PART`] with a warning when the root
/// relationships are missing or say nothing.
pub fn find_sequence_part<R: PartReader>(ctx: &mut FaultContext, reader: &mut R) -> Result<String> {
    if !reader.has_part(ROOT_RELATIONSHIPS_PART) {
        ctx.warn("package has no root relationships; using default sequence part");
        return Ok(DEFAULT_SEQUENCE_PART.to_string());
    }

    let found = ctx.try_scope("root relationships", |ctx| {
        let rels = read_relationships(ctx, reader, "/")?;
        Ok(rels
            .into_iter()
            .find(|rel| rel.kind.ends_with(REL_FIXED_REPRESENTATION))
            .map(|rel| rel.target))
    });

    match found {
        Ok(Some(name)) => Ok(name),
        Ok(None) => {
            ctx.warn("no fixed representation relationship; using default sequence part");
            Ok(DEFAULT_SEQUENCE_PART.to_string())
        },
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            ctx.warn(format!("cannot read root relationships ({}); using default sequence part", e));
            Ok(DEFAULT_SEQUENCE_PART.to_string())
        },
    }
}

/// Discover every readable sub-document of the package.
///
/// The sequence part itself must be readable; a fixed document that cannot
/// be read is skipped with a warning so its siblings still contribute.
pub fn discover_documents<R: PartReader>(
    ctx: &mut FaultContext,
    reader: &mut R,
) -> Result<(String, Vec<SubDocument>)> {
    let sequence_part = find_sequence_part(ctx, reader)?;
    let root = read_xml_part(ctx, reader, &sequence_part)?;
    if !root.is("FixedDocumentSequence") {
        return Err(ctx.fail(format!(
            "part '{}' is not a fixed document sequence (found <{}>)",
            sequence_part,
            root.tag()
        )));
    }

    let mut documents = Vec::new();
    let mut next_page = 0;
    for reference in root.children_named("DocumentReference") {
        let source = match reference.attr("Source") {
            Some(source) => resolve_part_name(&sequence_part, source),
            None => {
                ctx.warn("document reference without Source");
                continue;
            },
        };

        match ctx.try_scope("fixed document", |ctx| {
            load_fixed_document(ctx, reader, &source, next_page)
        }) {
            Ok(document) => {
                log::debug!(
                    "sub-document '{}': {} pages, {} link targets, outline {:?}",
                    document.name,
                    document.pages.len(),
                    document.link_targets.len(),
                    document.outline
                );
                next_page += document.pages.len();
                documents.push(document);
            },
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => ctx.warn(format!("skipping sub-document '{}': {}", source, e)),
        }
    }

    Ok((sequence_part, documents))
}

fn load_fixed_document<R: PartReader>(
    ctx: &mut FaultContext,
    reader: &mut R,
    name: &str,
    first_page: usize,
) -> Result<SubDocument> {
    let root = read_xml_part(ctx, reader, name)?;
    if !root.is("FixedDocument") {
        return Err(ctx.fail(format!("part '{}' is not a fixed document", name)));
    }

    let mut pages = Vec::new();
    let mut link_targets = Vec::new();
    for content in root.children_named("PageContent") {
        let source = match content.attr("Source") {
            Some(source) => source,
            None => continue,
        };
        let page_index = first_page + pages.len();
        pages.push(resolve_part_name(name, source));

        for targets in content.children_named("PageContent.LinkTargets") {
            for target in targets.children_named("LinkTarget") {
                if let Some(target_name) = target.attr("Name") {
                    link_targets.push((target_name.to_string(), page_index));
                }
            }
        }
    }

    Ok(SubDocument {
        name: name.to_string(),
        first_page,
        pages,
        link_targets,
        outline: find_outline_part(ctx, reader, name)?,
    })
}

/// Outline part named by the fixed document's relationships.
///
/// A missing or broken relationships part only means there is no outline.
fn find_outline_part<R: PartReader>(
    ctx: &mut FaultContext,
    reader: &mut R,
    document: &str,
) -> Result<Option<String>> {
    let rels_part = relationships_part_for(document);
    if !reader.has_part(&rels_part) {
        log::trace!("no relationships for '{}'", document);
        return Ok(None);
    }

    match ctx.try_scope("document relationships", |ctx| read_relationships(ctx, reader, document)) {
        Ok(rels) => Ok(rels
            .into_iter()
            .find(|rel| rel.kind.ends_with(REL_DOCUMENT_STRUCTURE))
            .map(|rel| rel.target)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            ctx.warn(format!("ignoring relationships of '{}': {}", document, e));
            Ok(None)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::package::MemoryPackage;

    const ROOT_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="R1" Type="http://schemas.microsoft.com/xps/2005/06/fixedrepresentation" Target="/FixedDocSeq.fdseq"/>
</Relationships>"#;

    fn package() -> MemoryPackage {
        MemoryPackage::new()
            .with_part("/_rels/.rels", ROOT_RELS)
            .with_part(
                "/FixedDocSeq.fdseq",
                r#"<FixedDocumentSequence>
  <DocumentReference Source="Documents/1/FixedDoc.fdoc"/>
  <DocumentReference Source="Documents/2/FixedDoc.fdoc"/>
</FixedDocumentSequence>"#,
            )
            .with_part(
                "/Documents/1/FixedDoc.fdoc",
                r#"<FixedDocument>
  <PageContent Source="Pages/1.fpage"/>
  <PageContent Source="Pages/2.fpage">
    <PageContent.LinkTargets><LinkTarget Name="chapter2"/></PageContent.LinkTargets>
  </PageContent>
</FixedDocument>"#,
            )
            .with_part(
                "/Documents/1/_rels/FixedDoc.fdoc.rels",
                r#"<Relationships>
  <Relationship Type="http://schemas.microsoft.com/xps/2005/06/documentstructure" Target="Structure/DocStructure.struct"/>
</Relationships>"#,
            )
            .with_part(
                "/Documents/2/FixedDoc.fdoc",
                r#"<FixedDocument><PageContent Source="Pages/1.fpage"/></FixedDocument>"#,
            )
    }

    #[test]
    fn test_discover_documents() {
        let mut ctx = FaultContext::new();
        let mut reader = package();
        let (sequence, docs) = discover_documents(&mut ctx, &mut reader).unwrap();

        assert_eq!(sequence, "/FixedDocSeq.fdseq");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].pages, vec!["/Documents/1/Pages/1.fpage", "/Documents/1/Pages/2.fpage"]);
        assert_eq!(docs[0].link_targets, vec![("chapter2".to_string(), 1)]);
        assert_eq!(
            docs[0].outline.as_deref(),
            Some("/Documents/1/Structure/DocStructure.struct")
        );
        assert_eq!(docs[1].first_page, 2);
        assert_eq!(docs[1].outline, None);
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_broken_sub_document_is_skipped() {
        let mut ctx = FaultContext::new();
        let mut reader = package().with_part("/Documents/1/FixedDoc.fdoc", "<FixedDocument>");
        let (_, docs) = discover_documents(&mut ctx, &mut reader).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "/Documents/2/FixedDoc.fdoc");
        assert_eq!(docs[0].first_page, 0);
    }

    #[test]
    fn test_default_sequence_when_root_rels_missing() {
        let mut ctx = FaultContext::new();
        let mut reader = MemoryPackage::new().with_part(
            DEFAULT_SEQUENCE_PART,
            "<FixedDocumentSequence/>",
        );
        let (sequence, docs) = discover_documents(&mut ctx, &mut reader).unwrap();
        assert_eq!(sequence, DEFAULT_SEQUENCE_PART);
        assert!(docs.is_empty());
    }

    #[test]
    fn test_missing_sequence_without_scope_is_uncaught() {
        let mut ctx = FaultContext::new();
        let mut reader = MemoryPackage::new();
        let err = discover_documents(&mut ctx, &mut reader).unwrap_err();
        assert!(matches!(err, Error::Uncaught(_)));
    }

    #[test]
    fn test_missing_sequence_inside_scope_is_fault() {
        let mut ctx = FaultContext::new();
        let mut reader = MemoryPackage::new();
        let err = ctx
            .try_scope("open", |ctx| discover_documents(ctx, &mut reader))
            .unwrap_err();
        assert!(matches!(err, Error::Fault { .. }));
        assert!(ctx.last_message().contains(DEFAULT_SEQUENCE_PART));
    }
}
