//! Appends the body of one document to another.
//!
//! Copying the paragraphs and tables is the easy half. The appended XML also
//! refers to resources of its own package by id: relationships (images,
//! hyperlinks, headers), style ids, numbering instances and footnotes. Each of
//! those is copied into the target under a fresh id, and the references in the
//! appended content are rewritten to match.

use crate::document::{Document, BODY, SECTION_PROPERTIES};
use crate::error::MergeError;
use crate::package::{
    content_types, extension_of, rel_types, relative_target, ContentTypes, Package,
    Relationships,
};
use crate::xml::{XmlDocument, XmlElement, XmlNode};
use log::debug;
use std::collections::{HashMap, HashSet, VecDeque};

const STYLE_REFERENCES: [&str; 5] = [
    "w:pStyle",
    "w:rStyle",
    "w:tblStyle",
    "w:numStyleLink",
    "w:styleLink",
];
const STYLE_CHAIN: [&str; 3] = ["w:basedOn", "w:next", "w:link"];
const DRAWING_PROPERTIES: &str = "wp:docPr";

/// What [`append_document`] copied into the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendReport {
    /// Block-level elements appended to the target body.
    pub blocks: usize,
    /// Package parts (media, headers, ...) copied from the source.
    pub parts_copied: usize,
    pub relationships_added: usize,
    pub styles_copied: usize,
    /// `w:num` instances copied under fresh ids.
    pub numbering_copied: usize,
    /// Footnotes and endnotes copied under fresh ids.
    pub notes_copied: usize,
}

/// Appends every block of `source`'s body to the end of `target`'s body.
///
/// The content goes in before the target's final section properties, so the
/// target's page setup governs the last section. The source's final section
/// properties are dropped.
pub fn append_document(
    target: &mut Document,
    source: &Document,
) -> Result<AppendReport, MergeError> {
    let mut report = AppendReport::default();
    let target_main = target.main_part().to_string();
    let source_package = source.package();

    let mut fragment = XmlElement::new(BODY);
    fragment.children = body_content(source.body());
    report.blocks = fragment.child_elements().count();

    let (target_root, target_package) = target.parts_mut();
    let source_types = ContentTypes::load(source_package)?;
    let mut target_types = ContentTypes::load(target_package)?;
    let source_rels = Relationships::load(source_package, source.main_part())?;
    let mut target_rels = Relationships::load(target_package, &target_main)?;

    let mut notes = Vec::new();
    for kind in [NoteKind::Footnote, NoteKind::Endnote] {
        let copied = copy_notes(
            kind,
            &mut fragment,
            source_package,
            &source_rels,
            target_package,
            &target_rels,
        )?;
        notes.extend(copied);
    }

    let mut style_ids = Vec::new();
    let mut num_ids = Vec::new();
    for subtree in std::iter::once(&fragment).chain(notes.iter().map(|batch| &batch.holder)) {
        for reference in STYLE_REFERENCES {
            style_ids.extend(subtree.attr_values(reference, "w:val"));
        }
        num_ids.extend(subtree.attr_values("w:numId", "w:val"));
    }

    let mut styles = StyleMerge::load(source_package, &source_rels, target_package, &target_rels)?;
    let mut numbering =
        NumberingMerge::load(source_package, &source_rels, target_package, &target_rels)?;
    loop {
        num_ids.extend(styles.copy_missing(style_ids, target_package));
        style_ids = numbering.copy_missing(std::mem::take(&mut num_ids), target_package);
        if style_ids.is_empty() {
            break;
        }
    }

    fragment.rewrite_attr_values("w:numId", "w:val", &numbering.num_map);
    for batch in &mut notes {
        batch
            .holder
            .rewrite_attr_values("w:numId", "w:val", &numbering.num_map);
    }

    let mut copier = PartCopier::new(source_package, &source_types);
    report.relationships_added += copier.remap_relationships(
        &mut fragment,
        &source_rels,
        &mut target_rels,
        target_package,
        &mut target_types,
    )?;

    merge_namespaces(target_root, source.root());
    renumber_drawings(target_root, &mut fragment);

    report.styles_copied = styles.finish(
        &numbering.num_map,
        target_package,
        &mut target_rels,
        &mut target_types,
    )?;
    report.numbering_copied =
        numbering.finish(target_package, &mut target_rels, &mut target_types)?;

    for batch in notes {
        report.notes_copied += batch.holder.child_elements().count();
        report.relationships_added += batch.finish(
            &mut copier,
            source_package,
            target_package,
            &mut target_rels,
            &mut target_types,
        )?;
    }
    report.parts_copied = copier.parts_copied;

    let end = target_root.children.len();
    let body = target_root.find_or_insert_child(BODY, end);
    let insert_at = body
        .children
        .iter()
        .rposition(|node| matches!(node, XmlNode::Element(_)))
        .filter(|&index| body.children[index].as_element_named(SECTION_PROPERTIES).is_some())
        .unwrap_or(body.children.len());
    body.children.splice(insert_at..insert_at, fragment.children);

    target_rels.store(target_package)?;
    target_types.store(target_package)?;

    Ok(report)
}

/// Children of a body without its trailing section properties.
fn body_content(body: &XmlElement) -> Vec<XmlNode> {
    let mut children = body.children.clone();
    let last_element = children
        .iter()
        .rposition(|node| matches!(node, XmlNode::Element(_)));
    if let Some(index) = last_element {
        if children[index].as_element_named(SECTION_PROPERTIES).is_some() {
            children.remove(index);
        }
    }
    children
}

/// Copies `xmlns:*` declarations the target lacks and unions `mc:Ignorable`.
fn merge_namespaces(target: &mut XmlElement, source: &XmlElement) {
    for (key, value) in &source.attributes {
        if key.starts_with("xmlns:") && target.attr(key).is_none() {
            target.set_attr(key.clone(), value.clone());
        }
    }

    let Some(source_ignorable) = source.attr("mc:Ignorable") else {
        return;
    };
    let mut prefixes: Vec<String> = target
        .attr("mc:Ignorable")
        .map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    for prefix in source_ignorable.split_whitespace() {
        let declared = target.attr(&format!("xmlns:{prefix}")).is_some();
        if declared && !prefixes.iter().any(|existing| existing == prefix) {
            prefixes.push(prefix.to_string());
        }
    }
    if !prefixes.is_empty() {
        target.set_attr("mc:Ignorable", prefixes.join(" "));
    }
}

/// Gives appended drawings ids above every id already used in the target.
fn renumber_drawings(target_root: &XmlElement, fragment: &mut XmlElement) {
    let mut next_id = target_root
        .attr_values(DRAWING_PROPERTIES, "id")
        .iter()
        .filter_map(|id| id.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1;

    fragment.visit_mut(&mut |element| {
        if element.name == DRAWING_PROPERTIES {
            element.set_attr("id", next_id.to_string());
            next_id += 1;
        }
    });
}

fn related_part(
    package: &Package,
    rels: &Relationships,
    rel_type: &str,
) -> Result<Option<(String, XmlDocument)>, MergeError> {
    let Some(rel) = rels.find_by_type(rel_type) else {
        return Ok(None);
    };
    let part = rels.resolve_target(rel);
    if !package.contains(&part) {
        return Ok(None);
    }
    let document = package.xml_part(&part)?;
    Ok(Some((part, document)))
}

/// An XML part of the target that is edited during the append.
struct TargetPart {
    name: String,
    document: XmlDocument,
    /// The part did not exist and still needs a relationship and content type.
    created: bool,
}

impl TargetPart {
    fn existing((name, document): (String, XmlDocument)) -> Self {
        Self {
            name,
            document,
            created: false,
        }
    }

    /// A new, empty part whose root carries the same namespace declarations as `template`.
    fn created(package: &Package, default_name: &str, template: &XmlElement) -> Self {
        let root = XmlElement {
            name: template.name.clone(),
            attributes: template.attributes.clone(),
            children: Vec::new(),
        };
        Self {
            name: package.unique_part_name(default_name),
            document: XmlDocument::new(root),
            created: true,
        }
    }

    fn store(
        &self,
        package: &mut Package,
        main_rels: &mut Relationships,
        types: &mut ContentTypes,
        rel_type: &str,
        content_type: &str,
    ) -> Result<(), MergeError> {
        package.set_xml_part(&self.name, &self.document)?;
        if self.created {
            let target = relative_target(main_rels.source_part(), &self.name);
            main_rels.add(rel_type, &target, false);
            types.set_override(&self.name, content_type);
        }
        Ok(())
    }
}

/// Copies parts referenced through relationships, each at most once.
struct PartCopier<'a> {
    source: &'a Package,
    source_types: &'a ContentTypes,
    copied: HashMap<String, String>,
    parts_copied: usize,
}

impl<'a> PartCopier<'a> {
    fn new(source: &'a Package, source_types: &'a ContentTypes) -> Self {
        Self {
            source,
            source_types,
            copied: HashMap::new(),
            parts_copied: 0,
        }
    }

    /// Rewrites every `r:*` attribute in `fragment` to a relationship of the
    /// target, copying internal targets along the way. Returns how many
    /// relationships were added.
    fn remap_relationships(
        &mut self,
        fragment: &mut XmlElement,
        source_rels: &Relationships,
        target_rels: &mut Relationships,
        target: &mut Package,
        target_types: &mut ContentTypes,
    ) -> Result<usize, MergeError> {
        let mut referenced = Vec::new();
        fragment.visit(&mut |element| {
            for (key, value) in &element.attributes {
                if key.starts_with("r:") && !referenced.contains(value) {
                    referenced.push(value.clone());
                }
            }
        });

        let mut mapping: HashMap<String, String> = HashMap::new();
        for id in referenced {
            let Some(rel) = source_rels.get(&id) else {
                continue;
            };

            let new_id = if rel.external {
                target_rels.add(&rel.rel_type, &rel.target, true)
            } else {
                let source_part = source_rels.resolve_target(rel);
                if !self.source.contains(&source_part) {
                    debug!("Relationship {id} points at missing part {source_part}; leaving it");
                    continue;
                }
                let copied = self.copy_part(target, target_types, &source_part)?;
                let target_path = relative_target(target_rels.source_part(), &copied);
                target_rels.add(&rel.rel_type, &target_path, false)
            };
            mapping.insert(id, new_id);
        }

        fragment.visit_mut(&mut |element| {
            for (key, value) in element.attributes.iter_mut() {
                if !key.starts_with("r:") {
                    continue;
                }
                if let Some(new_id) = mapping.get(value.as_str()) {
                    *value = new_id.clone();
                }
            }
        });

        Ok(mapping.len())
    }

    /// Copies one part, its content type and, recursively, the parts its own
    /// relationships point at. Returns the part's name in the target.
    fn copy_part(
        &mut self,
        target: &mut Package,
        target_types: &mut ContentTypes,
        source_part: &str,
    ) -> Result<String, MergeError> {
        if let Some(existing) = self.copied.get(source_part) {
            return Ok(existing.clone());
        }

        let data = self
            .source
            .part(source_part)
            .ok_or_else(|| MergeError::MissingPart(source_part.to_string()))?
            .to_vec();
        let target_part = target.unique_part_name(source_part);
        target.set_part(&target_part, data);
        self.copied
            .insert(source_part.to_string(), target_part.clone());
        self.parts_copied += 1;
        debug!("Copied part {source_part} as {target_part}");

        if let Some(content_type) = self.source_types.override_for(source_part) {
            target_types.set_override(&target_part, content_type);
        } else if let (Some(extension), Some(content_type)) = (
            extension_of(source_part),
            self.source_types.content_type_of(source_part),
        ) {
            let known = target_types.default_for(extension).map(str::to_string);
            match known {
                None => target_types.add_default(extension, content_type),
                Some(existing) if existing != content_type => {
                    target_types.set_override(&target_part, content_type)
                }
                Some(_) => {}
            }
        }

        let source_rels = Relationships::load(self.source, source_part)?;
        if !source_rels.is_empty() {
            let mut copied_rels = Relationships::new(&target_part);
            for rel in source_rels.iter() {
                let mut copied = rel.clone();
                if !rel.external {
                    let nested = source_rels.resolve_target(rel);
                    if self.source.contains(&nested) {
                        let nested_target = self.copy_part(target, target_types, &nested)?;
                        copied.target = relative_target(&target_part, &nested_target);
                    }
                }
                copied_rels.push(copied);
            }
            copied_rels.store(target)?;
        }

        Ok(target_part)
    }
}

/// Copies missing style definitions, following `basedOn`/`next`/`link`.
struct StyleMerge {
    source: Option<XmlDocument>,
    target: Option<TargetPart>,
    target_ids: HashSet<String>,
    copied: Vec<String>,
}

impl StyleMerge {
    fn load(
        source_package: &Package,
        source_rels: &Relationships,
        target_package: &Package,
        target_rels: &Relationships,
    ) -> Result<Self, MergeError> {
        let source = related_part(source_package, source_rels, rel_types::STYLES)?
            .map(|(_, document)| document);
        let target = related_part(target_package, target_rels, rel_types::STYLES)?
            .map(TargetPart::existing);
        let target_ids = target
            .as_ref()
            .map(|part| style_ids(&part.document.root))
            .unwrap_or_default();

        Ok(Self {
            source,
            target,
            target_ids,
            copied: Vec::new(),
        })
    }

    /// Copies every wanted style the target lacks. Returns the numbering ids
    /// referenced by the copied styles.
    fn copy_missing(&mut self, wanted: Vec<String>, target_package: &Package) -> Vec<String> {
        let mut num_ids = Vec::new();
        let Some(source) = &self.source else {
            return num_ids;
        };

        let mut queue: VecDeque<String> = wanted.into();
        while let Some(id) = queue.pop_front() {
            if self.target_ids.contains(&id) {
                continue;
            }
            let Some(style) = find_by_attr(&source.root, "w:style", "w:styleId", &id) else {
                continue;
            };
            let style = style.clone();

            for chain in STYLE_CHAIN {
                if let Some(linked) = style.find_child(chain).and_then(|e| e.attr("w:val")) {
                    queue.push_back(linked.to_string());
                }
            }
            for reference in STYLE_REFERENCES {
                queue.extend(style.attr_values(reference, "w:val"));
            }
            num_ids.extend(style.attr_values("w:numId", "w:val"));

            let target = self.target.get_or_insert_with(|| {
                let mut part = TargetPart::created(target_package, "word/styles.xml", &source.root);
                if let Some(defaults) = source.root.find_child("w:docDefaults") {
                    part.document.root.push_child(defaults.clone());
                }
                part
            });
            debug!("Copying style {id}");
            target.document.root.push_child(style);
            self.target_ids.insert(id.clone());
            self.copied.push(id);
        }

        num_ids
    }

    fn finish(
        mut self,
        num_map: &HashMap<String, String>,
        package: &mut Package,
        main_rels: &mut Relationships,
        types: &mut ContentTypes,
    ) -> Result<usize, MergeError> {
        let Some(target) = self.target.as_mut() else {
            return Ok(0);
        };
        if self.copied.is_empty() {
            return Ok(0);
        }

        let copied: HashSet<&str> = self.copied.iter().map(String::as_str).collect();
        for style in target.document.root.child_elements_mut() {
            let is_copied = style.name == "w:style"
                && style.attr("w:styleId").is_some_and(|id| copied.contains(id));
            if is_copied {
                style.rewrite_attr_values("w:numId", "w:val", num_map);
            }
        }

        target.store(
            package,
            main_rels,
            types,
            rel_types::STYLES,
            content_types::STYLES,
        )?;
        Ok(self.copied.len())
    }
}

fn style_ids(root: &XmlElement) -> HashSet<String> {
    root.child_elements()
        .filter(|element| element.name == "w:style")
        .filter_map(|element| element.attr("w:styleId"))
        .map(str::to_string)
        .collect()
}

fn find_by_attr<'a>(
    root: &'a XmlElement,
    name: &str,
    attr: &str,
    value: &str,
) -> Option<&'a XmlElement> {
    root.child_elements()
        .find(|element| element.name == name && element.attr(attr) == Some(value))
}

fn max_numeric_attr(root: &XmlElement, name: &str, attr: &str) -> Option<i64> {
    root.child_elements()
        .filter(|element| element.name == name)
        .filter_map(|element| element.attr(attr))
        .filter_map(|value| value.parse::<i64>().ok())
        .max()
}

/// Copies numbering instances under fresh `w:numId` and `w:abstractNumId` values.
struct NumberingMerge {
    source: Option<XmlDocument>,
    target: Option<TargetPart>,
    next_num: i64,
    next_abstract: i64,
    num_map: HashMap<String, String>,
    abstract_map: HashMap<String, String>,
}

impl NumberingMerge {
    fn load(
        source_package: &Package,
        source_rels: &Relationships,
        target_package: &Package,
        target_rels: &Relationships,
    ) -> Result<Self, MergeError> {
        let source = related_part(source_package, source_rels, rel_types::NUMBERING)?
            .map(|(_, document)| document);
        let target = related_part(target_package, target_rels, rel_types::NUMBERING)?
            .map(TargetPart::existing);

        let (next_num, next_abstract) = match &target {
            Some(part) => (
                max_numeric_attr(&part.document.root, "w:num", "w:numId").unwrap_or(0) + 1,
                max_numeric_attr(&part.document.root, "w:abstractNum", "w:abstractNumId")
                    .map_or(0, |max| max + 1),
            ),
            None => (1, 0),
        };

        Ok(Self {
            source,
            target,
            next_num,
            next_abstract,
            num_map: HashMap::new(),
            abstract_map: HashMap::new(),
        })
    }

    /// Copies each wanted numbering instance once. Returns the style ids
    /// linked from the copied abstract definitions.
    fn copy_missing(&mut self, wanted: Vec<String>, target_package: &Package) -> Vec<String> {
        let mut linked_styles = Vec::new();
        let Some(source) = &self.source else {
            return linked_styles;
        };

        for id in wanted {
            // numId 0 removes numbering from a paragraph.
            if id == "0" || self.num_map.contains_key(&id) {
                continue;
            }
            let Some(num) = find_by_attr(&source.root, "w:num", "w:numId", &id) else {
                continue;
            };
            let mut num = num.clone();

            let target = self.target.get_or_insert_with(|| {
                TargetPart::created(target_package, "word/numbering.xml", &source.root)
            });

            let source_abstract = num
                .find_child("w:abstractNumId")
                .and_then(|element| element.attr("w:val"))
                .map(str::to_string);
            if let Some(source_abstract) = source_abstract {
                let new_abstract = match self.abstract_map.get(&source_abstract) {
                    Some(mapped) => mapped.clone(),
                    None => {
                        let new_abstract = self.next_abstract.to_string();
                        self.next_abstract += 1;
                        if let Some(definition) = find_by_attr(
                            &source.root,
                            "w:abstractNum",
                            "w:abstractNumId",
                            &source_abstract,
                        ) {
                            let mut definition = definition.clone();
                            definition.set_attr("w:abstractNumId", new_abstract.as_str());
                            // A fresh nsid stops Word from joining the copy
                            // with a list of the same origin in the target.
                            if let Some(nsid) = definition.find_child_mut("w:nsid") {
                                nsid.set_attr("w:val", format!("{:08X}", 0x4D47_0000 + self.next_abstract));
                            }
                            for link in ["w:numStyleLink", "w:styleLink"] {
                                linked_styles.extend(definition.attr_values(link, "w:val"));
                            }
                            insert_abstract_num(&mut target.document.root, definition);
                        }
                        self.abstract_map
                            .insert(source_abstract.clone(), new_abstract.clone());
                        new_abstract
                    }
                };
                if let Some(reference) = num.find_child_mut("w:abstractNumId") {
                    reference.set_attr("w:val", new_abstract);
                }
            }

            let new_id = self.next_num.to_string();
            self.next_num += 1;
            num.set_attr("w:numId", new_id.as_str());
            insert_num(&mut target.document.root, num);
            debug!("Copied numbering {id} as {new_id}");
            self.num_map.insert(id, new_id);
        }

        linked_styles
    }

    fn finish(
        self,
        package: &mut Package,
        main_rels: &mut Relationships,
        types: &mut ContentTypes,
    ) -> Result<usize, MergeError> {
        let (Some(target), false) = (self.target, self.num_map.is_empty()) else {
            return Ok(0);
        };
        target.store(
            package,
            main_rels,
            types,
            rel_types::NUMBERING,
            content_types::NUMBERING,
        )?;
        Ok(self.num_map.len())
    }
}

/// Abstract definitions precede every `w:num`, after any picture bullets.
fn insert_abstract_num(root: &mut XmlElement, definition: XmlElement) {
    let after = root
        .children
        .iter()
        .rposition(|node| {
            node.as_element_named("w:abstractNum").is_some()
                || node.as_element_named("w:numPicBullet").is_some()
        })
        .map_or(0, |index| index + 1);
    root.insert_child(after, definition);
}

fn insert_num(root: &mut XmlElement, num: XmlElement) {
    let before = root
        .position_of(|element| element.name == "w:numIdMacAtCleanup")
        .unwrap_or(root.children.len());
    root.insert_child(before, num);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoteKind {
    Footnote,
    Endnote,
}

impl NoteKind {
    fn element(self) -> &'static str {
        match self {
            NoteKind::Footnote => "w:footnote",
            NoteKind::Endnote => "w:endnote",
        }
    }

    fn reference(self) -> &'static str {
        match self {
            NoteKind::Footnote => "w:footnoteReference",
            NoteKind::Endnote => "w:endnoteReference",
        }
    }

    fn rel_type(self) -> &'static str {
        match self {
            NoteKind::Footnote => rel_types::FOOTNOTES,
            NoteKind::Endnote => rel_types::ENDNOTES,
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            NoteKind::Footnote => content_types::FOOTNOTES,
            NoteKind::Endnote => content_types::ENDNOTES,
        }
    }

    fn default_part(self) -> &'static str {
        match self {
            NoteKind::Footnote => "word/footnotes.xml",
            NoteKind::Endnote => "word/endnotes.xml",
        }
    }
}

/// Notes copied out of the source, waiting to be written into the target.
struct CopiedNotes {
    kind: NoteKind,
    source_part: String,
    source_root: XmlElement,
    target: TargetPart,
    /// The copied notes, as children of a scratch element.
    holder: XmlElement,
}

fn is_separator(note: &XmlElement) -> bool {
    note.attr("w:type").is_some_and(|kind| kind != "normal")
}

/// Copies the notes `fragment` references and rewrites the references to
/// their new ids.
fn copy_notes(
    kind: NoteKind,
    fragment: &mut XmlElement,
    source_package: &Package,
    source_rels: &Relationships,
    target_package: &Package,
    target_rels: &Relationships,
) -> Result<Option<CopiedNotes>, MergeError> {
    let mut referenced = fragment.attr_values(kind.reference(), "w:id");
    referenced.dedup();
    if referenced.is_empty() {
        return Ok(None);
    }

    let Some((source_part, source_document)) =
        related_part(source_package, source_rels, kind.rel_type())?
    else {
        return Ok(None);
    };

    let target = match related_part(target_package, target_rels, kind.rel_type())? {
        Some(existing) => TargetPart::existing(existing),
        None => {
            let mut part =
                TargetPart::created(target_package, kind.default_part(), &source_document.root);
            for separator in source_document
                .root
                .child_elements()
                .filter(|note| note.name == kind.element() && is_separator(note))
            {
                part.document.root.push_child(separator.clone());
            }
            part
        }
    };

    let mut next_id = max_numeric_attr(&target.document.root, kind.element(), "w:id")
        .unwrap_or(0)
        .max(0)
        + 1;
    let mut holder = XmlElement::new("notes");
    let mut mapping = HashMap::new();

    for id in referenced {
        if mapping.contains_key(&id) {
            continue;
        }
        let note = source_document.root.child_elements().find(|note| {
            note.name == kind.element() && note.attr("w:id") == Some(id.as_str()) && !is_separator(note)
        });
        let Some(note) = note else {
            continue;
        };

        let mut note = note.clone();
        let new_id = next_id.to_string();
        next_id += 1;
        note.set_attr("w:id", new_id.as_str());
        holder.push_child(note);
        mapping.insert(id, new_id);
    }

    fragment.rewrite_attr_values(kind.reference(), "w:id", &mapping);

    Ok(Some(CopiedNotes {
        kind,
        source_part,
        source_root: source_document.root,
        target,
        holder,
    }))
}

impl CopiedNotes {
    /// Writes the copied notes into the target notes part. Returns how many
    /// relationships were added for their content.
    fn finish(
        mut self,
        copier: &mut PartCopier<'_>,
        source_package: &Package,
        package: &mut Package,
        main_rels: &mut Relationships,
        types: &mut ContentTypes,
    ) -> Result<usize, MergeError> {
        if self.holder.children.is_empty() {
            return Ok(0);
        }

        let source_rels = Relationships::load(source_package, &self.source_part)?;
        let mut target_rels = Relationships::load(package, &self.target.name)?;
        let added =
            copier.remap_relationships(&mut self.holder, &source_rels, &mut target_rels, package, types)?;
        if !target_rels.is_empty() {
            target_rels.store(package)?;
        }

        merge_namespaces(&mut self.target.document.root, &self.source_root);
        self.target
            .document
            .root
            .children
            .append(&mut self.holder.children);
        self.target.store(
            package,
            main_rels,
            types,
            self.kind.rel_type(),
            self.kind.content_type(),
        )?;

        Ok(added)
    }
}
