//! Document outline (table of contents) support.
//!
//! Outline entries arrive as a flat stream of records tagged with a level.
//! [`OutlineBuilder`] assembles them into a forest stored in an arena: nodes
//! live in one vector and refer to their first child and next sibling by
//! [`NodeId`].

use serde::Serialize;

use crate::links::{LinkDestination, LinkResolver};
use crate::xml::XmlElement;

/// Index of a node inside an [`Outline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A single outline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    /// Entry title, never empty
    pub title: String,
    /// Where the entry points, if it has a target
    pub destination: Option<LinkDestination>,
    /// First child entry
    pub first_child: Option<NodeId>,
    /// Next entry at the same level
    pub next_sibling: Option<NodeId>,
}

/// An outline forest.
///
/// Once built, an outline is never mutated again except by
/// [`Outline::append`] while fragments are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    nodes: Vec<OutlineNode>,
    first_root: Option<NodeId>,
}

/// A node visited during depth-first traversal.
#[derive(Debug, Clone, Copy)]
pub struct OutlineEntry<'a> {
    /// Node id
    pub id: NodeId,
    /// Nesting depth, 0 for roots
    pub depth: usize,
    /// The node
    pub node: &'a OutlineNode,
}

/// Nested, serializable view of an outline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineItem {
    /// The title of this entry
    pub title: String,

    /// The destination, None if the entry has no target
    #[serde(skip)]
    pub dest: Option<LinkDestination>,

    /// Flat link string (`#<page>` or URI) when the destination crosses
    /// the host boundary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Child entries
    pub children: Vec<OutlineItem>,
}

impl Outline {
    /// Create an empty outline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the outline has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The first root, if any.
    pub fn first_root(&self) -> Option<NodeId> {
        self.first_root
    }

    /// Access a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this outline.
    pub fn node(&self, id: NodeId) -> &OutlineNode {
        &self.nodes[id.0]
    }

    /// Root nodes in order.
    pub fn roots(&self) -> Siblings<'_> {
        Siblings {
            outline: self,
            next: self.first_root,
        }
    }

    /// Children of `id` in order.
    pub fn children(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            outline: self,
            next: self.node(id).first_child,
        }
    }

    /// Depth-first traversal in document order: each node is followed by
    /// its children and only then by its next sibling.
    pub fn iter(&self) -> OutlineIter<'_> {
        OutlineIter {
            outline: self,
            stack: self.first_root.map(|id| (id, 0)).into_iter().collect(),
        }
    }

    /// Append the roots of `other` after the last root of this outline.
    pub fn append(&mut self, other: Outline) {
        let other_root = match other.first_root {
            Some(root) => root,
            None => return,
        };

        let offset = self.nodes.len();
        let shift = |id: Option<NodeId>| id.map(|NodeId(index)| NodeId(index + offset));
        self.nodes.extend(other.nodes.into_iter().map(|node| OutlineNode {
            first_child: shift(node.first_child),
            next_sibling: shift(node.next_sibling),
            ..node
        }));

        let moved_root = NodeId(other_root.0 + offset);
        let last_root = self.roots().take_while(|id| id.0 < offset).last();
        match last_root {
            Some(last) => self.nodes[last.0].next_sibling = Some(moved_root),
            None => self.first_root = Some(moved_root),
        }
    }

    /// Nested view of the whole forest.
    ///
    /// Built from the depth-first walk with an explicit stack of open
    /// entries, so outline depth never turns into call depth.
    pub fn to_items(&self) -> Vec<OutlineItem> {
        let mut roots = Vec::new();
        let mut open: Vec<(usize, OutlineItem)> = Vec::new();
        for entry in self.iter() {
            while open.last().map_or(false, |(depth, _)| *depth >= entry.depth) {
                close_item(&mut open, &mut roots);
            }
            open.push((entry.depth, OutlineItem::from_node(entry.node)));
        }
        while !open.is_empty() {
            close_item(&mut open, &mut roots);
        }
        roots
    }
}

/// Move the innermost open item into its parent, or into `roots`.
fn close_item(open: &mut Vec<(usize, OutlineItem)>, roots: &mut Vec<OutlineItem>) {
    if let Some((_, item)) = open.pop() {
        match open.last_mut() {
            Some((_, parent)) => parent.children.push(item),
            None => roots.push(item),
        }
    }
}

impl OutlineItem {
    fn from_node(node: &OutlineNode) -> Self {
        OutlineItem {
            title: node.title.clone(),
            dest: node.destination.clone(),
            link: node.destination.as_ref().and_then(LinkDestination::to_flat),
            children: Vec::new(),
        }
    }
}

impl Drop for OutlineItem {
    fn drop(&mut self) {
        // Drain the subtree here so nested drops do not recurse per level.
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut item) = pending.pop() {
            pending.append(&mut item.children);
        }
    }
}

impl<'a> IntoIterator for &'a Outline {
    type Item = OutlineEntry<'a>;
    type IntoIter = OutlineIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a node and its following siblings.
pub struct Siblings<'a> {
    outline: &'a Outline,
    next: Option<NodeId>,
}

impl Iterator for Siblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.outline.node(current).next_sibling;
        Some(current)
    }
}

/// Depth-first iterator over an [`Outline`].
pub struct OutlineIter<'a> {
    outline: &'a Outline,
    stack: Vec<(NodeId, usize)>,
}

impl<'a> Iterator for OutlineIter<'a> {
    type Item = OutlineEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth) = self.stack.pop()?;
        let node = self.outline.node(id);
        if let Some(sibling) = node.next_sibling {
            self.stack.push((sibling, depth));
        }
        if let Some(child) = node.first_child {
            self.stack.push((child, depth + 1));
        }
        Some(OutlineEntry { id, depth, node })
    }
}

/// One flat outline record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineRecord {
    /// Nesting level, 1 for top-level entries
    pub level: i32,
    /// Entry title; records without one produce no node
    pub title: Option<String>,
    /// Raw target string
    pub target: Option<String>,
}

impl OutlineRecord {
    /// Record with a level and title and no target.
    pub fn new(level: i32, title: impl Into<String>) -> Self {
        Self {
            level,
            title: Some(title.into()),
            target: None,
        }
    }

    /// Builder: set the target string.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Read an `OutlineEntry` element.
    pub fn from_element(element: &XmlElement) -> Self {
        Self {
            level: parse_level(element.attr("OutlineLevel")),
            title: element.attr("Description").map(str::to_string),
            target: element.attr("OutlineTarget").map(str::to_string),
        }
    }
}

/// Parse an outline level attribute.
///
/// Absent means 1. Otherwise the leading integer is used, and text without
/// one yields 0, which files the entry at the top level.
///
/// ```
/// use xps_structure::outline::parse_level;
///
/// assert_eq!(parse_level(None), 1);
/// assert_eq!(parse_level(Some(" 3")), 3);
/// assert_eq!(parse_level(Some("2b")), 2);
/// assert_eq!(parse_level(Some("deep")), 0);
/// ```
pub fn parse_level(text: Option<&str>) -> i32 {
    let text = match text {
        Some(text) => text.trim_start(),
        None => return 1,
    };
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return 0;
    }
    let magnitude = digits[..end].parse::<i32>().unwrap_or(i32::MAX);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Builds an [`Outline`] from leveled records.
pub struct OutlineBuilder<'r> {
    outline: Outline,
    last_level: i32,
    resolver: &'r LinkResolver,
}

impl<'r> OutlineBuilder<'r> {
    /// Start an empty forest; targets are classified with `resolver`.
    pub fn new(resolver: &'r LinkResolver) -> Self {
        Self {
            outline: Outline::new(),
            last_level: 1,
            resolver,
        }
    }

    /// Insert one record. Returns the new node, or `None` for a titleless
    /// record.
    pub fn push(&mut self, record: OutlineRecord) -> Option<NodeId> {
        let title = record.title.filter(|title| !title.is_empty())?;
        let destination = record
            .target
            .as_deref()
            .map(|target| self.resolver.resolve_target(Some(target)))
            .filter(|destination| *destination != LinkDestination::None);

        let id = NodeId(self.outline.nodes.len());
        self.outline.nodes.push(OutlineNode {
            title,
            destination,
            first_child: None,
            next_sibling: None,
        });

        match self.attachment_point(record.level) {
            None => self.outline.first_root = Some(id),
            Some(anchor) if record.level > self.last_level => {
                // An anchor that already has children takes the new node as
                // its last child rather than losing the existing ones.
                let last_child = self.outline.children(anchor).last();
                match last_child {
                    Some(last_child) => self.outline.nodes[last_child.0].next_sibling = Some(id),
                    None => self.outline.nodes[anchor.0].first_child = Some(id),
                }
            },
            Some(anchor) => self.outline.nodes[anchor.0].next_sibling = Some(id),
        }

        self.last_level = record.level;
        Some(id)
    }

    /// Insert every record of `records` in order.
    pub fn extend<I: IntoIterator<Item = OutlineRecord>>(&mut self, records: I) {
        for record in records {
            self.push(record);
        }
    }

    /// The finished forest.
    pub fn finish(self) -> Outline {
        self.outline
    }

    /// Node the next record hangs off: the last sibling at `target_level`,
    /// or the deepest last descendant reachable on the way there.
    fn attachment_point(&self, target_level: i32) -> Option<NodeId> {
        let nodes = &self.outline.nodes;
        let mut current = self.outline.first_root?;
        let mut level = 1;
        loop {
            while let Some(next) = nodes[current.0].next_sibling {
                current = next;
            }
            match nodes[current.0].first_child {
                Some(child) if level < target_level => {
                    current = child;
                    level += 1;
                },
                _ => return Some(current),
            }
        }
    }
}

/// Build the outline held by a `DocumentOutline` element.
pub fn parse_document_outline(outline: &XmlElement, resolver: &LinkResolver) -> Outline {
    let mut builder = OutlineBuilder::new(resolver);
    builder.extend(
        outline
            .children_named("OutlineEntry")
            .map(OutlineRecord::from_element),
    );
    builder.finish()
}

/// Build the outline of a document-structure part.
///
/// The part must be shaped
/// `DocumentStructure / DocumentStructure.Outline / DocumentOutline`;
/// anything else yields an empty outline.
pub fn parse_document_structure(root: &XmlElement, resolver: &LinkResolver) -> Outline {
    if !root.is("DocumentStructure") {
        log::debug!("document structure root is <{}>, no outline", root.tag());
        return Outline::new();
    }
    root.children_named("DocumentStructure.Outline")
        .flat_map(|wrapper| wrapper.children_named("DocumentOutline"))
        .next()
        .map(|outline| parse_document_outline(outline, resolver))
        .unwrap_or_default()
}
