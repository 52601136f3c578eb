//! Owned XML element tree built on quick-xml
//!
//! The merge engine and report writer both operate on whole configuration
//! documents as trees: parse to a tree, transform with pure functions,
//! serialize. This module provides that tree plus the reader/writer glue.
//!
//! Only the node kinds that appear in configuration documents are modeled:
//! elements, text, and comments. CDATA, processing instructions, and
//! doctypes are rejected as malformed input.

use quick_xml::events::{BytesDecl, BytesRef, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::{ConfigError, Result};

/// A node in the XML tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Comment(String),
}

/// An XML element: name, attributes in document order, child nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        XmlElement {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create an element containing a single text node.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = XmlElement::new(name);
        element.children.push(XmlNode::Text(text.into()));
        element
    }

    /// Look up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.attributes.iter_mut().find(|(key, _)| *key == name) {
            entry.1 = value;
        } else {
            self.attributes.push((name, value));
        }
    }

    /// Iterate over element children, skipping text and comments.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Iterate over element children with the given tag name.
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |element| element.name == name)
    }

    /// First element child with the given tag name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|element| element.name == name)
    }

    /// Mutable reference to the first element child with the given tag name.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find_map(|node| match node {
            XmlNode::Element(element) if element.name == name => Some(element),
            _ => None,
        })
    }

    /// Concatenated text content of this element's direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let XmlNode::Text(text) = node {
                out.push_str(text);
            }
        }
        out
    }

    /// Text content of the first child element with the given tag name.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(XmlElement::text)
    }

    /// Append an element child.
    pub fn push_element(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    /// Append a comment child.
    pub fn push_comment(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Comment(text.into()));
    }

    /// Parse a complete XML document into its root element.
    pub fn parse(xml: &str) -> Result<XmlElement> {
        let mut reader = Reader::from_str(xml);

        // Stack of open elements; the root pops last.
        let mut stack: Vec<XmlElement> = Vec::new();
        // The reader splits a text run around entity references, so the
        // fragments are collected here and flushed as one node. Trimming
        // happens on the joined run, never on the fragments.
        let mut pending = String::new();

        loop {
            let event = reader.read_event()?;
            match &event {
                Event::Text(_) | Event::GeneralRef(_) => {}
                _ => flush_text(&mut stack, &mut pending)?,
            }
            match event {
                Event::Start(start) => {
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_element(element),
                        None => return finish_root(&mut reader, element),
                    }
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        ConfigError::Malformed("unbalanced closing tag".to_string())
                    })?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_element(element),
                        None => return finish_root(&mut reader, element),
                    }
                }
                Event::Text(text) => {
                    let decoded = text
                        .decode()
                        .map_err(|err| ConfigError::Malformed(err.to_string()))?;
                    pending.push_str(&decoded);
                }
                Event::GeneralRef(entity) => {
                    pending.push_str(&resolve_entity(&entity)?);
                }
                Event::Comment(text) => {
                    let decoded = text
                        .decode()
                        .map_err(|err| ConfigError::Malformed(err.to_string()))?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Comment(decoded.into_owned()));
                    }
                }
                Event::Decl(_) => {}
                Event::Eof => {
                    return Err(ConfigError::Malformed(
                        "document has no root element".to_string(),
                    ));
                }
                Event::CData(_) | Event::PI(_) | Event::DocType(_) => {
                    return Err(ConfigError::Malformed(
                        "unsupported XML construct in configuration document".to_string(),
                    ));
                }
            }
        }
    }

    /// Serialize this element as a complete XML document with declaration.
    pub fn to_document(&self) -> Result<String> {
        let mut buf = Vec::with_capacity(1024);
        let mut writer = Writer::new_with_indent(&mut buf, b' ', 4);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, self)?;

        String::from_utf8(buf).map_err(|err| ConfigError::Malformed(err.to_string()))
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = quick_xml::escape::unescape(&raw)
            .map_err(|err| ConfigError::Malformed(err.to_string()))?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

/// Push the collected text run onto the innermost open element.
fn flush_text(stack: &mut [XmlElement], pending: &mut String) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }
    let run = std::mem::take(pending);
    let trimmed = run.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Text(trimmed.to_string())),
        None => {
            return Err(ConfigError::Malformed(
                "text content outside the document root".to_string(),
            ));
        }
    }
    Ok(())
}

/// Resolve a `&name;` or `&#<number>;` reference to its text.
fn resolve_entity(entity: &BytesRef<'_>) -> Result<String> {
    if let Some(ch) = entity.resolve_char_ref()? {
        return Ok(ch.to_string());
    }
    let name = entity
        .decode()
        .map_err(|err| ConfigError::Malformed(err.to_string()))?;
    match quick_xml::escape::resolve_predefined_entity(&name) {
        Some(text) => Ok(text.to_string()),
        None => Err(ConfigError::Malformed(format!(
            "unresolvable entity reference &{name};"
        ))),
    }
}

/// Consume the remainder of the document after the root element closes.
fn finish_root(reader: &mut Reader<&[u8]>, root: XmlElement) -> Result<XmlElement> {
    loop {
        match reader.read_event()? {
            Event::Eof => return Ok(root),
            Event::Comment(_) => {}
            Event::Text(text) => {
                let decoded = text
                    .decode()
                    .map_err(|err| ConfigError::Malformed(err.to_string()))?;
                if !decoded.trim().is_empty() {
                    return Err(ConfigError::Malformed(
                        "content after the document root".to_string(),
                    ));
                }
            }
            _ => {
                return Err(ConfigError::Malformed(
                    "content after the document root".to_string(),
                ));
            }
        }
    }
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for node in &element.children {
        match node {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => {
                writer.write_event(Event::Text(BytesText::new(text)))?;
            }
            XmlNode::Comment(text) => {
                // "--" terminates an XML comment early; soften it.
                let safe = text.replace("--", "- -");
                writer.write_event(Event::Comment(BytesText::from_escaped(safe)))?;
            }
        }
    }
    writer.write_event(Event::End(quick_xml::events::BytesEnd::new(
        element.name.as_str(),
    )))?;
    Ok(())
}
