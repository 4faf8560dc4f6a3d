//! Navigation targets, anchors and hyperlinked regions.
//!
//! A [`LinkResolver`] lives for one load pass. It knows the page parts and
//! named link targets of the package, collects anchor geometry and
//! navigable regions reported while pages are walked, and classifies target
//! strings into [`LinkDestination`]s. [`LinkResolver::finish`] turns the pass
//! into an immutable [`LinkModel`] and drops the registry.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::geometry::{Point, Rect};
use crate::package::{resolve_part_name, SubDocument};
use crate::xml::XmlElement;

lazy_static! {
    /// External reference: a run of letters/hyphens followed by a colon
    static ref RE_EXTERNAL_URI: Regex = Regex::new(r"^[A-Za-z-]+:").unwrap();
}

/// Attribute carrying a hyperlink on a page element.
pub const NAVIGATE_URI_ATTR: &str = "FixedPage.NavigateUri";

/// Whether `target` is an external reference (`http:`, `mailto:`, `x-foo:`...).
///
/// ```
/// use xps_structure::links::is_external_uri;
///
/// assert!(is_external_uri("http://example.com"));
/// assert!(is_external_uri("x-custom:thing"));
/// assert!(!is_external_uri("../Pages/1.fpage#top"));
/// assert!(!is_external_uri(":nothing"));
/// ```
pub fn is_external_uri(target: &str) -> bool {
    RE_EXTERNAL_URI.is_match(target)
}

/// A resolved navigation target.
///
/// Serializes to its flat form: `"#<n>"` for pages, the URI verbatim, and
/// `null` for every other kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDestination {
    /// Page in this document (0-based)
    PageGoto(usize),
    /// External reference, verbatim
    Uri(String),
    /// Internal name that did not resolve to a page (the unknown-page marker)
    Named(String),
    /// File to launch
    Launch(String),
    /// Page in another document
    RemoteGoto {
        /// Path of the other document
        path: String,
        /// Page in that document (0-based)
        page: usize,
    },
    /// No target
    None,
}

impl LinkDestination {
    /// Flat form handed across the host boundary.
    ///
    /// Page targets become `"#<1-based page>"`, URIs are passed verbatim, and
    /// every other kind is dropped.
    ///
    /// ```
    /// use xps_structure::links::LinkDestination;
    ///
    /// assert_eq!(LinkDestination::PageGoto(0).to_flat().as_deref(), Some("#1"));
    /// assert_eq!(LinkDestination::Named("x".into()).to_flat(), None);
    /// ```
    pub fn to_flat(&self) -> Option<String> {
        match self {
            LinkDestination::PageGoto(page) => Some(format!("#{}", page + 1)),
            LinkDestination::Uri(uri) => Some(uri.clone()),
            _ => None,
        }
    }

    /// Parse the flat form produced by [`LinkDestination::to_flat`].
    ///
    /// `"#<n>"` with `n >= 1` is a page target, any other non-empty text is a
    /// URI, and anything unusable is [`LinkDestination::None`].
    pub fn parse_flat(flat: &str) -> Self {
        if let Some(number) = flat.strip_prefix('#') {
            return match number.parse::<usize>() {
                Ok(page) if page >= 1 => LinkDestination::PageGoto(page - 1),
                _ => LinkDestination::None,
            };
        }
        if flat.is_empty() {
            LinkDestination::None
        } else {
            LinkDestination::Uri(flat.to_string())
        }
    }

    /// Split `file:` references into launch and remote-goto targets.
    ///
    /// `file:other.xps#3` becomes a remote goto to page index 2 of
    /// `other.xps`; a bare `file:` path becomes a launch. Other
    /// destinations are returned unchanged.
    pub fn refine_external(self) -> Self {
        let uri = match self {
            LinkDestination::Uri(uri) => uri,
            other => return other,
        };
        let path = match uri.strip_prefix("file:") {
            Some(path) => path.trim_start_matches("//").to_string(),
            None => return LinkDestination::Uri(uri),
        };
        if path.is_empty() {
            return LinkDestination::Uri(uri);
        }
        if let Some((file, page)) = path.rsplit_once('#') {
            if let Ok(page) = page.parse::<usize>() {
                if page >= 1 && !file.is_empty() {
                    return LinkDestination::RemoteGoto {
                        path: file.to_string(),
                        page: page - 1,
                    };
                }
            }
        }
        LinkDestination::Launch(path)
    }
}

impl Serialize for LinkDestination {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.to_flat() {
            Some(flat) => serializer.serialize_str(&flat),
            None => serializer.serialize_none(),
        }
    }
}

/// A named in-document location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anchor {
    /// Anchor name (without `#`)
    pub name: String,
    /// Page the anchor lives on, when declared as a link target
    pub page: Option<usize>,
    /// Bounds reported by the renderer
    pub rect: Option<Rect>,
}

/// A hyperlinked region as reported while a page is walked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigableRect {
    /// Region bounds
    pub rect: Rect,
    /// Raw target text
    pub uri: String,
}

/// A hyperlinked region with its resolved destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    /// Region bounds
    pub rect: Rect,
    /// Where activating the region goes
    pub destination: LinkDestination,
}

impl Link {
    /// Flat target string, if this link crosses the host boundary.
    pub fn flat_target(&self) -> Option<String> {
        self.destination.to_flat()
    }
}

/// Target classification and anchor registry for one load pass.
#[derive(Debug, Clone, Default)]
pub struct LinkResolver {
    base: String,
    pages: IndexMap<String, usize>,
    anchors: IndexMap<String, Anchor>,
    regions: Vec<NavigableRect>,
    skip_internal: bool,
}

impl LinkResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a resolver with the pages and link targets of `documents`.
    pub fn from_documents(documents: &[SubDocument]) -> Self {
        let mut resolver = Self::new();
        for document in documents {
            for page in &document.pages {
                resolver.add_page(page);
            }
            for (name, page) in &document.link_targets {
                resolver.add_link_target(name, *page);
            }
        }
        resolver
    }

    /// Leave internal targets unresolved (every internal target classifies
    /// as [`LinkDestination::Named`]).
    pub fn with_internal_resolution(mut self, enable: bool) -> Self {
        self.skip_internal = !enable;
        self
    }

    /// Part that relative targets are resolved against.
    pub fn set_base(&mut self, base_part: impl Into<String>) {
        self.base = base_part.into();
    }

    /// Current base part.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Register the next page part; returns its page index.
    pub fn add_page(&mut self, part_name: &str) -> usize {
        let index = self.pages.len();
        let key = resolve_part_name("/", part_name).to_lowercase();
        *self.pages.entry(key).or_insert(index)
    }

    /// Number of registered pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Declare a named link target on `page`.
    ///
    /// A later declaration of the same name keeps the first page.
    pub fn add_link_target(&mut self, name: &str, page: usize) {
        let anchor = self
            .anchors
            .entry(name.to_string())
            .or_insert_with(|| Anchor {
                name: name.to_string(),
                page: None,
                rect: None,
            });
        if anchor.page.is_none() {
            anchor.page = Some(page);
        }
    }

    /// Record an anchor's geometry.
    ///
    /// An existing anchor only has its rectangle replaced; it keeps its
    /// identity and its position in registration order.
    pub fn register_anchor(&mut self, name: &str, rect: Rect) {
        match self.anchors.get_mut(name) {
            Some(anchor) => anchor.rect = Some(rect),
            None => {
                self.anchors.insert(
                    name.to_string(),
                    Anchor {
                        name: name.to_string(),
                        page: None,
                        rect: Some(rect),
                    },
                );
            },
        }
    }

    /// Look up an anchor by name.
    pub fn anchor(&self, name: &str) -> Option<&Anchor> {
        self.anchors.get(name)
    }

    /// Anchors in first-registration order.
    pub fn anchors(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.values()
    }

    /// Record a hyperlinked region.
    pub fn record_navigable_rect(&mut self, rect: Rect, uri: impl Into<String>) {
        self.regions.push(NavigableRect {
            rect,
            uri: uri.into(),
        });
    }

    /// Regions in logical order: the most recently recorded first.
    pub fn regions(&self) -> impl Iterator<Item = &NavigableRect> {
        self.regions.iter().rev()
    }

    /// The region under `point`.
    ///
    /// Scanning the logical order, the last hit wins, so among overlapping
    /// regions the one declared earliest in the source is returned.
    pub fn link_at(&self, point: Point) -> Option<&NavigableRect> {
        self.regions().filter(|region| region.rect.contains_point(&point)).last()
    }

    /// Pick up hyperlink and anchor information from a page element whose
    /// bounds the renderer computed as `rect`.
    ///
    /// `FixedPage.NavigateUri` records a navigable region; a relative part
    /// reference in it is pinned to the current base part. `Name` updates the
    /// geometry of a declared link target; names that were never declared
    /// as targets are not navigable and are ignored.
    pub fn extract_anchor_info(&mut self, element: &XmlElement, rect: Rect) {
        if let Some(uri) = element.attr(NAVIGATE_URI_ATTR) {
            let uri = uri.trim();
            let uri = if uri.is_empty() || uri.starts_with('#') || is_external_uri(uri) {
                uri.to_string()
            } else {
                resolve_part_name(&self.base, uri)
            };
            self.record_navigable_rect(rect, uri);
        }
        if let Some(name) = element.attr("Name") {
            if self.anchors.contains_key(name) {
                self.register_anchor(name, rect);
            }
        }
    }

    /// Classify a target string.
    ///
    /// Absent or blank → [`LinkDestination::None`]; external syntax →
    /// [`LinkDestination::Uri`]; otherwise the fragment (or the part name)
    /// is looked up → [`LinkDestination::PageGoto`]. Internal targets that
    /// do not resolve yield [`LinkDestination::Named`] instead of failing.
    pub fn resolve_target(&self, target: Option<&str>) -> LinkDestination {
        let target = match target.map(str::trim) {
            Some(target) if !target.is_empty() => target,
            _ => return LinkDestination::None,
        };

        if is_external_uri(target) {
            return LinkDestination::Uri(target.to_string());
        }

        if self.skip_internal {
            return LinkDestination::Named(target.to_string());
        }

        match self.lookup_page(target) {
            Some(page) => LinkDestination::PageGoto(page),
            None => {
                log::trace!("unresolved link target '{}'", target);
                LinkDestination::Named(target.to_string())
            },
        }
    }

    fn lookup_page(&self, target: &str) -> Option<usize> {
        let (path, fragment) = match target.rfind('#') {
            Some(pos) => (&target[..pos], Some(&target[pos + 1..])),
            None => (target, None),
        };

        if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
            if let Some(page) = self.anchors.get(fragment).and_then(|anchor| anchor.page) {
                return Some(page);
            }
        }

        if path.is_empty() {
            return None;
        }
        let key = resolve_part_name(&self.base, path).to_lowercase();
        self.pages.get(&key).copied()
    }

    /// Close the pass: resolve every recorded region and promote anchor
    /// locations into an immutable model.
    pub fn finish(self) -> LinkModel {
        let links = self
            .regions
            .iter()
            .map(|region| Link {
                rect: region.rect,
                destination: self.resolve_target(Some(&region.uri)).refine_external(),
            })
            .collect();

        let anchors = self
            .anchors
            .into_iter()
            .filter(|(_, anchor)| anchor.page.is_some() || anchor.rect.is_some())
            .collect();

        LinkModel { links, anchors }
    }
}

/// Resolved links and anchors of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkModel {
    links: Vec<Link>,
    anchors: IndexMap<String, Anchor>,
}

impl LinkModel {
    /// Links in source declaration order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Anchors in first-registration order.
    pub fn anchors(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.values()
    }

    /// Look up an anchor by name.
    pub fn anchor(&self, name: &str) -> Option<&Anchor> {
        self.anchors.get(name)
    }

    /// The link under `point`; the earliest declared wins on overlap.
    pub fn link_at(&self, point: Point) -> Option<&Link> {
        self.links.iter().find(|link| link.rect.contains_point(&point))
    }

    /// Whether the model holds nothing.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.anchors.is_empty()
    }
}
