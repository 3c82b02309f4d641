//! A small owned element tree for editing the XML parts of a document package.
//!
//! Element and attribute names are kept as the qualified names written in the
//! source (`w:p`, `r:id`). WordprocessingML producers bind the conventional
//! prefixes, and every lookup in this crate relies on them.

use crate::error::MergeError;
use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::collections::HashMap;

/// A node inside an element's child list.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
}

impl XmlNode {
    /// Returns the element if this node is an element with the given name.
    pub fn as_element_named(&self, name: &str) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) if element.name == name => Some(element),
            _ => None,
        }
    }

    fn is_element_named(&self, name: &str) -> bool {
        self.as_element_named(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style helper that appends an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder-style helper that appends a child element.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, keeping its original position if it already exists.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(name, _)| *name == key) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn find_child(&self, name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|element| element.name == name)
    }

    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.child_elements_mut().find(|element| element.name == name)
    }

    /// Index (into `children`) of the first child element matching the predicate.
    pub fn position_of(&self, predicate: impl Fn(&XmlElement) -> bool) -> Option<usize> {
        self.children.iter().position(|node| match node {
            XmlNode::Element(element) => predicate(element),
            _ => false,
        })
    }

    /// Returns the first child named `name`, inserting an empty one at `index`
    /// when none exists.
    pub fn find_or_insert_child(&mut self, name: &str, index: usize) -> &mut XmlElement {
        let position = match self.children.iter().position(|node| node.is_element_named(name)) {
            Some(position) => position,
            None => {
                let index = index.min(self.children.len());
                self.children
                    .insert(index, XmlNode::Element(XmlElement::new(name)));
                index
            }
        };

        match &mut self.children[position] {
            XmlNode::Element(element) => element,
            _ => unreachable!(), // The position was matched or inserted as an element.
        }
    }

    /// Removes every direct child element named `name` and returns how many were removed.
    pub fn remove_children(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|node| !node.is_element_named(name));
        before - self.children.len()
    }

    pub fn insert_child(&mut self, index: usize, child: XmlElement) {
        let index = index.min(self.children.len());
        self.children.insert(index, XmlNode::Element(child));
    }

    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Concatenated text of all descendant text and CDATA nodes.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Element(element) => element.collect_text(out),
                XmlNode::Text(text) | XmlNode::CData(text) => out.push_str(text),
                XmlNode::Comment(_) => {}
            }
        }
    }

    /// Every descendant element (excluding `self`) named `name`, in document order.
    pub fn descendants_named(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        for child in self.child_elements() {
            collect_named(child, name, &mut found);
        }
        found
    }

    /// Visits `self` and all descendant elements in pre-order.
    ///
    /// The callback runs on a parent before its children are visited, so
    /// children it inserts are visited as well.
    pub fn visit_mut(&mut self, visitor: &mut dyn FnMut(&mut XmlElement)) {
        visitor(self);
        for child in self.child_elements_mut() {
            child.visit_mut(visitor);
        }
    }

    pub fn visit(&self, visitor: &mut dyn FnMut(&XmlElement)) {
        visitor(self);
        for child in self.child_elements() {
            child.visit(visitor);
        }
    }

    /// Values of `attr` on every element named `element` in this subtree.
    pub fn attr_values(&self, element: &str, attr: &str) -> Vec<String> {
        let mut values = Vec::new();
        self.visit(&mut |node| {
            if node.name == element {
                if let Some(value) = node.attr(attr) {
                    values.push(value.to_string());
                }
            }
        });
        values
    }

    /// Rewrites `attr` on every element named `element` whose value appears in `mapping`.
    pub fn rewrite_attr_values(
        &mut self,
        element: &str,
        attr: &str,
        mapping: &HashMap<String, String>,
    ) -> usize {
        let mut rewritten = 0;
        self.visit_mut(&mut |node| {
            if node.name != element {
                return;
            }
            let replacement = node.attr(attr).and_then(|value| mapping.get(value)).cloned();
            if let Some(replacement) = replacement {
                node.set_attr(attr, replacement);
                rewritten += 1;
            }
        });
        rewritten
    }
}

fn collect_named<'a>(element: &'a XmlElement, name: &str, found: &mut Vec<&'a XmlElement>) {
    if element.name == name {
        found.push(element);
    }
    for child in element.child_elements() {
        collect_named(child, name, found);
    }
}

/// A parsed XML part: the root element and nothing else.
///
/// Comments and whitespace outside the root element are dropped, and the
/// declaration is always written back as UTF-8 standalone.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub root: XmlElement,
}

impl XmlDocument {
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, MergeError> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|err| {
                MergeError::Xml(format!("at byte {}: {err}", reader.buffer_position()))
            })?;

            match event {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| MergeError::Xml("unbalanced closing tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = text
                            .unescape()
                            .map_err(|err| MergeError::Xml(err.to_string()))?;
                        parent.children.push(XmlNode::Text(value.into_owned()));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                        parent.children.push(XmlNode::CData(value));
                    }
                }
                Event::Comment(comment) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = String::from_utf8_lossy(&comment).into_owned();
                        parent.children.push(XmlNode::Comment(value));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(MergeError::Xml(format!(
                "unclosed element <{}>",
                stack.last().map(|element| element.name.as_str()).unwrap_or_default()
            )));
        }

        root.map(Self::new)
            .ok_or_else(|| MergeError::Xml("document has no root element".to_string()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, MergeError> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(|err| MergeError::Xml(err.to_string()))?;
        writer.get_mut().extend_from_slice(b"\r\n");
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, MergeError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| MergeError::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| MergeError::Xml(err.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), MergeError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
        return Ok(());
    }

    if root.is_some() {
        return Err(MergeError::Xml(format!(
            "unexpected second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

/// Escapes markup characters and the whitespace that attribute value
/// normalization would otherwise turn into plain spaces on the next read.
fn escape_attr_value(value: &str) -> String {
    escape(value)
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;")
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), MergeError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: Cow::Owned(escape_attr_value(value).into_bytes()),
        });
    }

    if element.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|err| MergeError::Xml(err.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|err| MergeError::Xml(err.to_string()))?;

    for child in &element.children {
        let result = match child {
            XmlNode::Element(child) => {
                write_element(writer, child)?;
                continue;
            }
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text))),
            XmlNode::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str()))),
            XmlNode::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
            }
        };
        result.map_err(|err| MergeError::Xml(err.to_string()))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|err| MergeError::Xml(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(input: &str) -> String {
        let doc = XmlDocument::parse(input.as_bytes()).unwrap();
        String::from_utf8(doc.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn parse_keeps_attribute_order_and_text() {
        let doc = XmlDocument::parse(
            br#"<?xml version="1.0"?><w:p w:b="1" w:a="2"><w:r><w:t xml:space="preserve"> a &amp; b </w:t></w:r></w:p>"#,
        )
        .unwrap();

        assert_eq!(doc.root.name, "w:p");
        assert_eq!(
            doc.root.attributes,
            vec![
                ("w:b".to_string(), "1".to_string()),
                ("w:a".to_string(), "2".to_string())
            ]
        );
        assert_eq!(doc.root.text(), " a & b ");
    }

    #[test]
    fn serialize_escapes_and_collapses_empty_elements() {
        let output = roundtrip(r#"<a x="1 &lt; 2"><b></b><c>x &gt; y</c></a>"#);
        assert!(output.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
        assert!(output.ends_with(r#"<a x="1 &lt; 2"><b/><c>x &gt; y</c></a>"#));
    }

    #[test]
    fn attribute_whitespace_survives_a_roundtrip() {
        let output = roundtrip("<wp:docPr descr=\"line one&#xA;line two&#9;end&#xD;\"/>");
        assert!(output.contains(r#"descr="line one&#10;line two&#9;end&#13;""#), "{output}");

        let reparsed = XmlDocument::parse(output.as_bytes()).unwrap();
        assert_eq!(reparsed.root.attr("descr"), Some("line one\nline two\tend\r"));
    }

    #[test]
    fn parse_rejects_unbalanced_input() {
        assert!(XmlDocument::parse(b"<a><b></a>").is_err());
        assert!(XmlDocument::parse(b"<a>").is_err());
        assert!(XmlDocument::parse(b"").is_err());
    }

    #[test]
    fn find_or_insert_child_reuses_existing() {
        let mut element = XmlElement::new("w:tbl").with_child(XmlElement::new("w:tr"));

        element.find_or_insert_child("w:tblPr", 0).set_attr("x", "1");
        element.find_or_insert_child("w:tblPr", 0).set_attr("y", "2");

        assert_eq!(element.children.len(), 2);
        let props = element.child_elements().next().unwrap();
        assert_eq!(props.name, "w:tblPr");
        assert_eq!(props.attr("x"), Some("1"));
        assert_eq!(props.attr("y"), Some("2"));
    }

    #[test]
    fn rewrite_attr_values_only_touches_mapped_values() {
        let mut root = XmlElement::new("root")
            .with_child(XmlElement::new("w:numId").with_attr("w:val", "1"))
            .with_child(XmlElement::new("w:numId").with_attr("w:val", "7"));
        let mapping = HashMap::from([("1".to_string(), "10".to_string())]);

        assert_eq!(root.rewrite_attr_values("w:numId", "w:val", &mapping), 1);
        assert_eq!(root.attr_values("w:numId", "w:val"), vec!["10", "7"]);
    }
}
