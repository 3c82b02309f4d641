//! The main document part of a package, exposed as paragraphs, runs and tables.

use crate::error::MergeError;
use crate::package::Package;
use crate::placeholder::RunSequence;
use crate::xml::{XmlDocument, XmlElement, XmlNode};
use std::path::Path;

pub const BODY: &str = "w:body";
pub const PARAGRAPH: &str = "w:p";
pub const RUN: &str = "w:r";
pub const TABLE: &str = "w:tbl";
pub const SECTION_PROPERTIES: &str = "w:sectPr";

/// A WordprocessingML document held in memory for the duration of a merge.
#[derive(Debug, Clone)]
pub struct Document {
    package: Package,
    main_part: String,
    xml: XmlDocument,
}

impl Document {
    /// Opens a `.docx` file. Every failure is reported as [`MergeError::Load`].
    pub fn open(path: &Path) -> Result<Self, MergeError> {
        let package = Package::open(path)?;
        Self::from_package(package).map_err(|err| MergeError::load(path, err))
    }

    pub fn from_package(package: Package) -> Result<Self, MergeError> {
        package.check_xml_parts()?;
        let main_part = package.main_document_part()?;
        let xml = package.xml_part(&main_part)?;

        if xml.root.find_child(BODY).is_none() {
            return Err(MergeError::InvalidPackage(format!(
                "{main_part} has no <{BODY}> element"
            )));
        }

        Ok(Self {
            package,
            main_part,
            xml,
        })
    }

    pub fn main_part(&self) -> &str {
        &self.main_part
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn root(&self) -> &XmlElement {
        &self.xml.root
    }

    pub fn body(&self) -> &XmlElement {
        // Presence is checked in `from_package` and never removed afterwards.
        self.xml
            .root
            .find_child(BODY)
            .unwrap_or(&self.xml.root)
    }

    pub fn body_mut(&mut self) -> &mut XmlElement {
        let end = self.xml.root.children.len();
        self.xml.root.find_or_insert_child(BODY, end)
    }

    /// Splits the document into its parsed main part and the package holding
    /// every other part, so both can be edited together.
    pub(crate) fn parts_mut(&mut self) -> (&mut XmlElement, &mut Package) {
        (&mut self.xml.root, &mut self.package)
    }

    /// The top-level paragraphs of the body, in order.
    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = Paragraph<'_>> {
        self.body_mut()
            .child_elements_mut()
            .filter(|element| element.name == PARAGRAPH)
            .map(Paragraph::new)
    }

    /// Text of every paragraph in the body, including paragraphs inside tables.
    pub fn paragraph_texts(&self) -> Vec<String> {
        self.body()
            .descendants_named(PARAGRAPH)
            .into_iter()
            .map(paragraph_text)
            .collect()
    }

    /// Every table in the body, including nested tables, in document order.
    pub fn tables(&self) -> Vec<&XmlElement> {
        self.body().descendants_named(TABLE)
    }

    /// Calls `visitor` on every table in the body. Outer tables are visited
    /// before the tables nested in their cells.
    pub fn for_each_table_mut(&mut self, visitor: &mut dyn FnMut(&mut XmlElement)) {
        for child in self.body_mut().child_elements_mut() {
            child.visit_mut(&mut |element| {
                if element.name == TABLE {
                    visitor(element);
                }
            });
        }
    }

    /// Writes the main part back into the package.
    pub fn sync(&mut self) -> Result<(), MergeError> {
        let main_part = self.main_part.clone();
        self.package.set_xml_part(&main_part, &self.xml)
    }

    /// Saves the document to `path`. Every failure is reported as [`MergeError::Write`].
    pub fn save(&mut self, path: &Path) -> Result<(), MergeError> {
        self.sync().map_err(|err| MergeError::write(path, err))?;
        self.package.save(path)
    }
}

/// A mutable view of one `w:p` element.
pub struct Paragraph<'a> {
    element: &'a mut XmlElement,
}

impl<'a> Paragraph<'a> {
    pub fn new(element: &'a mut XmlElement) -> Self {
        Self { element }
    }

    fn runs(&self) -> impl Iterator<Item = &XmlElement> {
        self.element
            .child_elements()
            .filter(|element| element.name == RUN)
    }
}

impl RunSequence for Paragraph<'_> {
    fn run_count(&self) -> usize {
        self.runs().count()
    }

    fn run_text(&self, index: usize) -> String {
        self.runs().nth(index).map(run_text).unwrap_or_default()
    }

    fn set_run_text(&mut self, index: usize, text: &str) {
        let run = self
            .element
            .child_elements_mut()
            .filter(|element| element.name == RUN)
            .nth(index);
        if let Some(run) = run {
            set_run_text(run, text);
        }
    }
}

/// Visible text of a paragraph: the concatenated text of its direct runs.
pub fn paragraph_text(paragraph: &XmlElement) -> String {
    paragraph
        .child_elements()
        .filter(|element| element.name == RUN)
        .map(run_text)
        .collect()
}

/// Visible text of a run.
///
/// `w:t` contributes its content, `w:tab` a tab, a text-wrapping `w:br` or a
/// `w:cr` a newline, and `w:noBreakHyphen` a hyphen. Page and column breaks
/// contribute nothing.
pub fn run_text(run: &XmlElement) -> String {
    let mut text = String::new();
    for child in run.child_elements() {
        match child.name.as_str() {
            "w:t" => text.push_str(&child.text()),
            "w:tab" => text.push('\t'),
            "w:cr" => text.push('\n'),
            "w:br" if is_text_break(child) => text.push('\n'),
            "w:noBreakHyphen" => text.push('-'),
            _ => {}
        }
    }
    text
}

fn is_text_break(element: &XmlElement) -> bool {
    matches!(element.attr("w:type"), None | Some("textWrapping"))
}

fn is_text_content(element: &XmlElement) -> bool {
    match element.name.as_str() {
        "w:t" | "w:tab" | "w:cr" | "w:noBreakHyphen" => true,
        "w:br" => is_text_break(element),
        _ => false,
    }
}

/// Replaces the text of a run in place.
///
/// Run properties and non-text children (drawings, field characters, page
/// breaks) stay where they are. The new content takes the position of the
/// first text child that was removed.
pub fn set_run_text(run: &mut XmlElement, text: &str) {
    let insert_at = run
        .position_of(is_text_content)
        .unwrap_or(run.children.len());
    run.children.retain(|node| match node {
        XmlNode::Element(element) => !is_text_content(element),
        _ => true,
    });

    let content = text_to_run_content(text);
    let insert_at = insert_at.min(run.children.len());
    run.children.splice(insert_at..insert_at, content);
}

fn text_to_run_content(text: &str) -> Vec<XmlNode> {
    let mut nodes = Vec::new();
    let mut pending = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\t' => {
                flush_text(&mut pending, &mut nodes);
                nodes.push(XmlNode::Element(XmlElement::new("w:tab")));
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                flush_text(&mut pending, &mut nodes);
                nodes.push(XmlNode::Element(XmlElement::new("w:br")));
            }
            other => pending.push(other),
        }
    }
    flush_text(&mut pending, &mut nodes);

    nodes
}

fn flush_text(pending: &mut String, nodes: &mut Vec<XmlNode>) {
    if pending.is_empty() {
        return;
    }
    let mut element = XmlElement::new("w:t");
    if pending.starts_with(char::is_whitespace) || pending.ends_with(char::is_whitespace) {
        element.set_attr("xml:space", "preserve");
    }
    element.children.push(XmlNode::Text(std::mem::take(pending)));
    nodes.push(XmlNode::Element(element));
}
