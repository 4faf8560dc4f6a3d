//! Minimal XML element tree for package parts.
//!
//! Parts are small (relationships, sequences, document structure), so they
//! are read into an owned tree with `quick-xml` and navigated by tag name,
//! attribute lookup and child/sibling order. Nothing is validated against a
//! schema.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};

/// An element with its attributes and children, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    /// Create an element with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Builder: add an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder: append a child element.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Full tag name, including any namespace prefix.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Tag name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.tag.rfind(':') {
            Some(pos) => &self.tag[pos + 1..],
            None => &self.tag,
        }
    }

    /// Whether the local tag name equals `name`.
    pub fn is(&self, name: &str) -> bool {
        self.local_name() == name
    }

    /// Look up an attribute by its exact name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child element.
    pub fn first_child(&self) -> Option<&XmlElement> {
        self.children.first()
    }

    /// Child elements in document order (first child, then its next siblings).
    pub fn children(&self) -> std::slice::Iter<'_, XmlElement> {
        self.children.iter()
    }

    /// Children whose local name is `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |child| child.is(name))
    }

    /// Concatenated character data directly inside this element.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Parse a part's bytes into its root element.
///
/// UTF-8 (with or without BOM) and BOM-marked UTF-16 input are accepted.
/// `part` is only used to label errors.
pub fn parse_document(part: &str, data: &[u8]) -> Result<XmlElement> {
    let text = decode_text(data);
    let mut reader = Reader::from_str(&text);
    reader.trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event().map_err(|e| Error::Xml {
            part: part.to_string(),
            reason: format!("{} at byte {}", e, reader.buffer_position()),
        })?;

        match event {
            Event::Start(start) => {
                stack.push(element_from_start(part, &start)?);
            },
            Event::Empty(start) => {
                let element = element_from_start(part, &start)?;
                attach(&mut stack, &mut root, element);
            },
            Event::End(_) => {
                // quick-xml has already checked that the end tag matches.
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            },
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let value = text.unescape().map_err(|e| Error::Xml {
                        part: part.to_string(),
                        reason: e.to_string(),
                    })?;
                    current.text.push_str(&value);
                }
            },
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if !stack.is_empty() {
        return Err(Error::Xml {
            part: part.to_string(),
            reason: format!("unclosed element <{}>", stack[stack.len() - 1].tag),
        });
    }

    root.ok_or_else(|| Error::Xml {
        part: part.to_string(),
        reason: "no root element".to_string(),
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        // Trailing top-level elements after the root are ignored.
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        },
    }
}

fn element_from_start(part: &str, start: &BytesStart<'_>) -> Result<XmlElement> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml {
            part: part.to_string(),
            reason: e.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn decode_text(data: &[u8]) -> String {
    match data {
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        _ => String::from_utf8_lossy(data).into_owned(),
    }
}

fn decode_utf16(data: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}
