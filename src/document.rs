//! XPS document structure handle.

use crate::config::StructureConfig;
use crate::error::{Error, Result};
use crate::extractors::{extract_properties, PropertyDict};
use crate::fault::FaultContext;
use crate::links::{LinkModel, LinkResolver};
use crate::outline::{parse_document_structure, Outline};
use crate::package::sequence::read_xml_part;
use crate::package::{discover_documents, PartReader, SubDocument};
use crate::page::scan_page;

#[cfg(feature = "zip")]
use crate::package::ZipPackage;
#[cfg(feature = "zip")]
use std::{fs::File, io::BufReader, path::Path};

/// An open XPS package and the structures extracted from it.
///
/// The outline, document properties and link model are built the first
/// time they are asked for and cached until [`close`](Self::close).
///
/// # Example
///
/// ```no_run
/// use xps_structure::document::StructureDocument;
///
/// let mut doc = StructureDocument::open_path("manual.xps")?;
/// for entry in doc.outline()?.iter() {
///     println!("{}{}", "  ".repeat(entry.depth), entry.node.title);
/// }
/// # Ok::<(), xps_structure::error::Error>(())
/// ```
pub struct StructureDocument<R: PartReader> {
    /// Package reader, `None` once closed
    reader: Option<R>,
    config: StructureConfig,
    /// Fault context shared by every load pass of this document
    ctx: FaultContext,
    sequence_part: String,
    documents: Vec<SubDocument>,
    outline: Option<Outline>,
    properties: Option<PropertyDict>,
    links: Option<LinkModel>,
}

#[cfg(feature = "zip")]
impl StructureDocument<ZipPackage<BufReader<File>>> {
    /// Open a zip-packaged XPS file on disk.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_path_with_config(path, StructureConfig::default())
    }

    /// Open a zip-packaged XPS file with custom configuration.
    pub fn open_path_with_config(path: impl AsRef<Path>, config: StructureConfig) -> Result<Self> {
        log::info!("opening '{}'", path.as_ref().display());
        Self::open_with_config(ZipPackage::open(path)?, config)
    }
}

impl<R: PartReader> StructureDocument<R> {
    /// Open a package with the default configuration.
    pub fn open(reader: R) -> Result<Self> {
        Self::open_with_config(reader, StructureConfig::default())
    }

    /// Open a package.
    ///
    /// Fails only when the fixed-document sequence cannot be read; broken
    /// sub-documents are skipped with a warning.
    pub fn open_with_config(mut reader: R, config: StructureConfig) -> Result<Self> {
        config.validate()?;
        let mut ctx =
            FaultContext::with_limits(config.fault_stack_capacity, config.warning_message_limit);

        let discovered = ctx.try_scope("open", |ctx| discover_documents(ctx, &mut reader));
        ctx.flush_warnings();
        let (sequence_part, documents) = discovered.map_err(|e| {
            if e.is_fatal() {
                e
            } else {
                Error::InvalidPackage(e.to_string())
            }
        })?;

        log::info!(
            "opened package: sequence '{}', {} sub-documents",
            sequence_part,
            documents.len()
        );

        Ok(Self {
            reader: Some(reader),
            config,
            ctx,
            sequence_part,
            documents,
            outline: None,
            properties: None,
            links: None,
        })
    }

    /// Configuration the document was opened with.
    pub fn config(&self) -> &StructureConfig {
        &self.config
    }

    /// Name of the fixed-document sequence part.
    pub fn sequence_part(&self) -> Result<&str> {
        self.ensure_open()?;
        Ok(&self.sequence_part)
    }

    /// Readable sub-documents in sequence order.
    pub fn sub_documents(&self) -> Result<&[SubDocument]> {
        self.ensure_open()?;
        Ok(&self.documents)
    }

    /// Total number of pages across all sub-documents.
    pub fn page_count(&self) -> Result<usize> {
        Ok(self.sub_documents()?.iter().map(|doc| doc.pages.len()).sum())
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// The document outline, merged over every sub-document.
    ///
    /// A sub-document whose outline part cannot be read contributes nothing;
    /// the others are still merged. A package without outlines yields an
    /// empty outline.
    pub fn outline(&mut self) -> Result<&Outline> {
        self.ensure_open()?;
        if self.outline.is_none() {
            let outline = self.load_outline()?;
            log::debug!("outline built: {} entries", outline.len());
            self.outline = Some(outline);
        }
        self.outline.as_ref().ok_or(Error::DocumentClosed)
    }

    /// Document properties from the core-properties part.
    ///
    /// Missing or unreadable metadata yields an empty dictionary.
    pub fn properties(&mut self) -> Result<&PropertyDict> {
        let reader = self.reader.as_mut().ok_or(Error::DocumentClosed)?;
        if self.properties.is_none() {
            let fallback = &self.config.core_properties_fallback;
            let result = extract_properties(&mut self.ctx, reader, fallback);
            self.ctx.flush_warnings();
            self.properties = Some(result?);
        }
        self.properties.as_ref().ok_or(Error::DocumentClosed)
    }

    /// A resolver seeded with the pages and link targets of the package,
    /// for callers that report page geometry themselves.
    ///
    /// Hand the finished pass back with [`install_links`](Self::install_links).
    pub fn link_resolver(&self) -> Result<LinkResolver> {
        self.ensure_open()?;
        Ok(LinkResolver::from_documents(&self.documents)
            .with_internal_resolution(self.config.resolve_links))
    }

    /// Replace the cached link model with the result of `resolver`.
    pub fn install_links(&mut self, resolver: LinkResolver) -> Result<&LinkModel> {
        self.ensure_open()?;
        Ok(self.links.insert(resolver.finish()))
    }

    /// Hyperlinks and anchors found by walking every page.
    ///
    /// Pages that cannot be read are skipped with a warning.
    pub fn link_model(&mut self) -> Result<&LinkModel> {
        self.ensure_open()?;
        if self.links.is_none() {
            let resolver = self.scan_links()?;
            let model = resolver.finish();
            log::debug!("link model built: {} links", model.links().len());
            self.links = Some(model);
        }
        self.links.as_ref().ok_or(Error::DocumentClosed)
    }

    /// Release the package and every cached structure.
    ///
    /// Closing twice is harmless; other operations fail with
    /// [`Error::DocumentClosed`] afterwards.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            self.ctx.flush_warnings();
            self.outline = None;
            self.properties = None;
            self.links = None;
            self.documents.clear();
            log::debug!("closed '{}'", self.sequence_part);
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.reader.is_some() {
            Ok(())
        } else {
            Err(Error::DocumentClosed)
        }
    }

    fn load_outline(&mut self) -> Result<Outline> {
        let reader = self.reader.as_mut().ok_or(Error::DocumentClosed)?;
        let mut resolver = LinkResolver::from_documents(&self.documents)
            .with_internal_resolution(self.config.resolve_links);
        let mut merged = Outline::new();

        for document in &self.documents {
            let part = match &document.outline {
                Some(part) => part,
                None => continue,
            };
            if !self.config.merge_outlines && !merged.is_empty() {
                break;
            }

            match self.ctx.try_scope("outline", |ctx| read_xml_part(ctx, reader, part)) {
                Ok(root) => {
                    resolver.set_base(part.as_str());
                    let fragment = parse_document_structure(&root, &resolver);
                    log::debug!("outline fragment '{}': {} entries", part, fragment.len());
                    merged.append(fragment);
                },
                Err(e) if e.is_fatal() => {
                    self.ctx.flush_warnings();
                    return Err(e);
                },
                Err(e) => self.ctx.warn(format!("no outline from '{}': {}", document.name, e)),
            }
        }

        self.ctx.flush_warnings();
        Ok(merged)
    }

    fn scan_links(&mut self) -> Result<LinkResolver> {
        let reader = self.reader.as_mut().ok_or(Error::DocumentClosed)?;
        let mut resolver = LinkResolver::from_documents(&self.documents)
            .with_internal_resolution(self.config.resolve_links);

        for page in self.documents.iter().flat_map(|doc| doc.pages.iter()) {
            match self.ctx.try_scope("page", |ctx| read_xml_part(ctx, reader, page)) {
                Ok(root) => {
                    resolver.set_base(page.as_str());
                    scan_page(&root, &mut resolver);
                },
                Err(e) if e.is_fatal() => {
                    self.ctx.flush_warnings();
                    return Err(e);
                },
                Err(e) => self.ctx.warn(format!("no links from '{}': {}", page, e)),
            }
        }

        self.ctx.flush_warnings();
        Ok(resolver)
    }
}

impl<R: PartReader> Drop for StructureDocument<R> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::PropertyKey;
    use crate::links::LinkDestination;
    use crate::package::MemoryPackage;

    fn package() -> MemoryPackage {
        MemoryPackage::new()
            .with_part(
                "/_rels/.rels",
                r#"<Relationships><Relationship Type="http://schemas.microsoft.com/xps/2005/06/fixedrepresentation" Target="/FixedDocSeq.fdseq"/></Relationships>"#,
            )
            .with_part(
                "/FixedDocSeq.fdseq",
                r#"<FixedDocumentSequence><DocumentReference Source="Documents/1/FixedDoc.fdoc"/></FixedDocumentSequence>"#,
            )
            .with_part(
                "/Documents/1/FixedDoc.fdoc",
                r#"<FixedDocument>
  <PageContent Source="Pages/1.fpage"/>
  <PageContent Source="Pages/2.fpage"><PageContent.LinkTargets><LinkTarget Name="second"/></PageContent.LinkTargets></PageContent>
</FixedDocument>"#,
            )
            .with_part(
                "/Documents/1/_rels/FixedDoc.fdoc.rels",
                r#"<Relationships><Relationship Type="http://schemas.microsoft.com/xps/2005/06/documentstructure" Target="/Documents/1/Structure/DocStructure.struct"/></Relationships>"#,
            )
            .with_part(
                "/Documents/1/Structure/DocStructure.struct",
                r#"<DocumentStructure><DocumentStructure.Outline><DocumentOutline>
  <OutlineEntry OutlineLevel="1" Description="Intro" OutlineTarget="../FixedDoc.fdoc#second"/>
  <OutlineEntry OutlineLevel="2" Description="Web" OutlineTarget="http://example.com"/>
</DocumentOutline></DocumentStructure.Outline></DocumentStructure>"#,
            )
            .with_part(
                "/Documents/1/Pages/1.fpage",
                r##"<FixedPage Width="100" Height="100"><Path Data="M 0,0 L 10,10" FixedPage.NavigateUri="#second"/></FixedPage>"##,
            )
            .with_part("/Documents/1/Pages/2.fpage", r#"<FixedPage Width="100" Height="100" Name="second"/>"#)
            .with_part("/docProps/core.xml", "<cp:coreProperties><dc:title>Doc</dc:title></cp:coreProperties>")
    }

    #[test]
    fn test_open_and_outline() {
        let mut doc = StructureDocument::open(package()).unwrap();
        assert_eq!(doc.page_count().unwrap(), 2);
        assert_eq!(doc.sequence_part().unwrap(), "/FixedDocSeq.fdseq");

        let outline = doc.outline().unwrap();
        assert_eq!(outline.len(), 2);
        let items = outline.to_items();
        assert_eq!(items[0].title, "Intro");
        assert_eq!(items[0].dest, Some(LinkDestination::PageGoto(1)));
        assert_eq!(items[0].children[0].dest, Some(LinkDestination::Uri("http://example.com".into())));
    }

    #[test]
    fn test_properties_with_fallback() {
        let mut doc = StructureDocument::open(package()).unwrap();
        assert_eq!(doc.properties().unwrap().get(PropertyKey::Title), Some("Doc"));
    }

    #[test]
    fn test_link_model_from_pages() {
        let mut doc = StructureDocument::open(package()).unwrap();
        let model = doc.link_model().unwrap();
        assert_eq!(model.links().len(), 1);
        assert_eq!(model.links()[0].flat_target().as_deref(), Some("#2"));
        assert!(model.anchor("second").unwrap().rect.is_some());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut doc = StructureDocument::open(package()).unwrap();
        doc.outline().unwrap();
        doc.close();
        doc.close();
        assert!(doc.is_closed());
        assert!(matches!(doc.outline(), Err(Error::DocumentClosed)));
        assert!(matches!(doc.properties(), Err(Error::DocumentClosed)));
        assert!(matches!(doc.page_count(), Err(Error::DocumentClosed)));
    }

    #[test]
    fn test_open_without_sequence_fails() {
        let result = StructureDocument::open(MemoryPackage::new());
        assert!(matches!(result, Err(Error::InvalidPackage(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = StructureConfig::new().with_fault_stack_capacity(0);
        assert!(matches!(
            StructureDocument::open_with_config(package(), config),
            Err(Error::Config(_))
        ));
    }
}
