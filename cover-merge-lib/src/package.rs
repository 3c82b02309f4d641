//! Reading and writing the zip container of a WordprocessingML document.
//!
//! A package is an ordered list of named parts. Two XML parts describe the
//! rest: `[Content_Types].xml` maps part names to media types, and the
//! `_rels/*.rels` parts link a source part to its targets.

use crate::error::MergeError;
use crate::xml::{XmlDocument, XmlElement};
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder as TempFileBuilder;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

pub const RELATIONSHIPS_NAMESPACE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
pub const CONTENT_TYPES_NAMESPACE: &str =
    "http://schemas.openxmlformats.org/package/2006/content-types";

pub mod rel_types {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    pub const NUMBERING: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
    pub const FOOTNOTES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footnotes";
    pub const ENDNOTES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/endnotes";
}

pub mod content_types {
    pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
    pub const MAIN_DOCUMENT: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
    pub const STYLES: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
    pub const NUMBERING: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";
    pub const FOOTNOTES: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.footnotes+xml";
    pub const ENDNOTES: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.endnotes+xml";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub data: Vec<u8>,
}

/// An in-memory document package.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<Part>,
}

impl Package {
    /// Builds a package from `(name, bytes)` pairs, keeping their order.
    pub fn from_parts<N, D>(parts: impl IntoIterator<Item = (N, D)>) -> Self
    where
        N: Into<String>,
        D: Into<Vec<u8>>,
    {
        let mut package = Package::default();
        for (name, data) in parts {
            let name: String = name.into();
            package.set_part(&name, data.into());
        }
        package
    }

    /// Reads a package from disk. Every failure is reported as [`MergeError::Load`].
    pub fn open(path: &Path) -> Result<Self, MergeError> {
        let bytes = std::fs::read(path).map_err(|err| MergeError::load(path, err))?;
        Self::from_bytes(bytes).map_err(|err| MergeError::load(path, err))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, MergeError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|err| MergeError::InvalidPackage(err.to_string()))?;
        let mut package = Package::default();

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|err| MergeError::InvalidPackage(err.to_string()))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().trim_start_matches('/').to_string();
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|err| MergeError::InvalidPackage(format!("{name}: {err}")))?;
            package.parts.push(Part { name, data });
        }

        if !package.contains(CONTENT_TYPES_PART) {
            return Err(MergeError::MissingPart(CONTENT_TYPES_PART.to_string()));
        }

        Ok(package)
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Part names are case-insensitive, as in the packaging conventions.
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.index_of(name).map(|index| self.parts[index].data.as_slice())
    }

    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        let name = name.trim_start_matches('/');
        match self.index_of(name) {
            Some(index) => self.parts[index].data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    pub fn xml_part(&self, name: &str) -> Result<XmlDocument, MergeError> {
        let data = self
            .part(name)
            .ok_or_else(|| MergeError::MissingPart(name.to_string()))?;
        XmlDocument::parse(data).map_err(|err| match err {
            MergeError::Xml(reason) => MergeError::Xml(format!("{name}: {reason}")),
            other => other,
        })
    }

    pub fn set_xml_part(&mut self, name: &str, document: &XmlDocument) -> Result<(), MergeError> {
        let data = document.to_bytes()?;
        self.set_part(name, data);
        Ok(())
    }

    /// Returns `desired` if it is free, otherwise the first free
    /// `stem_N.ext` variant in the same folder.
    pub fn unique_part_name(&self, desired: &str) -> String {
        let desired = desired.trim_start_matches('/');
        if !self.contains(desired) {
            return desired.to_string();
        }

        let (folder, file) = match desired.rsplit_once('/') {
            Some((folder, file)) => (format!("{folder}/"), file),
            None => (String::new(), desired),
        };
        let (stem, extension) = match file.rsplit_once('.') {
            Some((stem, extension)) if !stem.is_empty() => (stem, format!(".{extension}")),
            _ => (file, String::new()),
        };

        (1..)
            .map(|n| format!("{folder}{stem}_{n}{extension}"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| desired.to_string())
    }

    /// Locates the main document part through the package relationships.
    pub fn main_document_part(&self) -> Result<String, MergeError> {
        let rels = Relationships::load(self, "")?;
        let main = rels
            .iter()
            .find(|rel| has_rel_type(&rel.rel_type, rel_types::OFFICE_DOCUMENT))
            .map(|rel| rels.resolve_target(rel))
            .ok_or_else(|| MergeError::MissingPart("officeDocument relationship".to_string()));
        main
    }

    /// Parses every XML part once, so a malformed part is reported up front
    /// instead of half way through a merge.
    pub fn check_xml_parts(&self) -> Result<(), MergeError> {
        for part in &self.parts {
            let is_xml = matches!(
                extension_of(&part.name).map(str::to_ascii_lowercase).as_deref(),
                Some("xml") | Some("rels")
            );
            if is_xml {
                self.xml_part(&part.name)?;
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, MergeError> {
        let cursor = self
            .write_zip(Cursor::new(Vec::new()))
            .map_err(|err| MergeError::InvalidPackage(err.to_string()))?;
        Ok(cursor.into_inner())
    }

    /// Writes the package to `path` through a temporary file in the same
    /// directory. The destination only appears once the archive is complete.
    pub fn save(&self, path: &Path) -> Result<(), MergeError> {
        let parent_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let temp_file = TempFileBuilder::new()
            .prefix(".cover-merge-")
            .suffix(".tmp")
            .tempfile_in(&parent_dir)
            .map_err(|err| {
                MergeError::write(
                    path,
                    format!(
                        "failed to create temporary file in {}: {err}",
                        parent_dir.display()
                    ),
                )
            })?;

        let temp_file = self
            .write_zip(temp_file)
            .map_err(|err| MergeError::write(path, err))?;

        temp_file
            .as_file()
            .sync_all()
            .map_err(|err| MergeError::write(path, err))?;

        temp_file
            .persist(path)
            .map_err(|err| MergeError::write(path, err.error))?;

        Ok(())
    }

    fn write_zip<W: Write + Seek>(&self, writer: W) -> zip::result::ZipResult<W> {
        let mut zip = ZipWriter::new(writer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // Consumers sniff the content types part first.
        let ordered = self
            .parts
            .iter()
            .filter(|part| part.name == CONTENT_TYPES_PART)
            .chain(self.parts.iter().filter(|part| part.name != CONTENT_TYPES_PART));

        for part in ordered {
            zip.start_file(part.name.as_str(), options)?;
            zip.write_all(&part.data)?;
        }

        zip.finish()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        let name = name.trim_start_matches('/');
        self.parts
            .iter()
            .position(|part| part.name.eq_ignore_ascii_case(name))
    }
}

/// Whether `actual` is the relationship type `expected`, accepting both the
/// transitional and strict namespace spellings.
pub fn has_rel_type(actual: &str, expected: &str) -> bool {
    actual == expected || actual.rsplit('/').next() == expected.rsplit('/').next()
}

/// The folder that relative targets of `part_name` are resolved against.
fn base_folder(part_name: &str) -> &str {
    part_name.rsplit_once('/').map(|(folder, _)| folder).unwrap_or("")
}

/// Resolves a relationship target relative to the source part's folder.
pub fn resolve_part_name(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize_segments(absolute.split('/'));
    }
    normalize_segments(base_folder(source_part).split('/').chain(target.split('/')))
}

fn normalize_segments<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    let mut resolved: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    resolved.join("/")
}

/// The target string a relationship from `source_part` should use to reach `part_name`.
pub fn relative_target(source_part: &str, part_name: &str) -> String {
    let folder = base_folder(source_part);
    if folder.is_empty() {
        return part_name.to_string();
    }
    match part_name.strip_prefix(folder).and_then(|rest| rest.strip_prefix('/')) {
        Some(relative) => relative.to_string(),
        None => format!("/{part_name}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// The relationships of one source part. The package itself is the source `""`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationships {
    source_part: String,
    items: Vec<Relationship>,
}

impl Relationships {
    pub fn new(source_part: &str) -> Self {
        Self {
            source_part: source_part.to_string(),
            items: Vec::new(),
        }
    }

    /// `word/document.xml` -> `word/_rels/document.xml.rels`, `""` -> `_rels/.rels`.
    pub fn part_name_for(source_part: &str) -> String {
        match source_part.rsplit_once('/') {
            Some((folder, file)) => format!("{folder}/_rels/{file}.rels"),
            None => format!("_rels/{source_part}.rels"),
        }
    }

    /// Loads the relationships of `source_part`; a missing rels part is an empty set.
    pub fn load(package: &Package, source_part: &str) -> Result<Self, MergeError> {
        let mut rels = Self::new(source_part);
        let part_name = Self::part_name_for(source_part);
        if !package.contains(&part_name) {
            return Ok(rels);
        }

        let document = package.xml_part(&part_name)?;
        for element in document.root.child_elements() {
            if element.name != "Relationship" {
                continue;
            }
            let (Some(id), Some(target)) = (element.attr("Id"), element.attr("Target")) else {
                continue;
            };
            rels.items.push(Relationship {
                id: id.to_string(),
                rel_type: element.attr("Type").unwrap_or_default().to_string(),
                target: target.to_string(),
                external: element.attr("TargetMode") == Some("External"),
            });
        }

        Ok(rels)
    }

    pub fn source_part(&self) -> &str {
        &self.source_part
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|rel| rel.id == id)
    }

    pub fn find_by_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.items
            .iter()
            .find(|rel| !rel.external && has_rel_type(&rel.rel_type, rel_type))
    }

    /// The part a relationship points at, as a package part name.
    pub fn resolve_target(&self, rel: &Relationship) -> String {
        resolve_part_name(&self.source_part, &rel.target)
    }

    /// Keeps `rel` as-is, including its id.
    pub fn push(&mut self, rel: Relationship) {
        self.items.push(rel);
    }

    /// Adds a relationship under a fresh `rIdN` id and returns the id.
    pub fn add(&mut self, rel_type: &str, target: &str, external: bool) -> String {
        let mut n = self.items.len() + 1;
        while self.get(&format!("rId{n}")).is_some() {
            n += 1;
        }
        let id = format!("rId{n}");
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.to_string(),
            external,
        });
        id
    }

    pub fn store(&self, package: &mut Package) -> Result<(), MergeError> {
        let mut root =
            XmlElement::new("Relationships").with_attr("xmlns", RELATIONSHIPS_NAMESPACE);
        for rel in &self.items {
            let mut element = XmlElement::new("Relationship")
                .with_attr("Id", rel.id.as_str())
                .with_attr("Type", rel.rel_type.as_str())
                .with_attr("Target", rel.target.as_str());
            if rel.external {
                element.set_attr("TargetMode", "External");
            }
            root.push_child(element);
        }
        package.set_xml_part(&Self::part_name_for(&self.source_part), &XmlDocument::new(root))
    }
}

/// The `[Content_Types].xml` part.
#[derive(Debug, Clone)]
pub struct ContentTypes {
    document: XmlDocument,
}

impl ContentTypes {
    pub fn load(package: &Package) -> Result<Self, MergeError> {
        Ok(Self {
            document: package.xml_part(CONTENT_TYPES_PART)?,
        })
    }

    /// The explicit override for `part_name`, if any.
    pub fn override_for(&self, part_name: &str) -> Option<&str> {
        let wanted = format!("/{}", part_name.trim_start_matches('/'));
        self.document
            .root
            .child_elements()
            .filter(|element| element.name == "Override")
            .find(|element| {
                element
                    .attr("PartName")
                    .is_some_and(|name| name.eq_ignore_ascii_case(&wanted))
            })
            .and_then(|element| element.attr("ContentType"))
    }

    pub fn default_for(&self, extension: &str) -> Option<&str> {
        self.document
            .root
            .child_elements()
            .filter(|element| element.name == "Default")
            .find(|element| {
                element
                    .attr("Extension")
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .and_then(|element| element.attr("ContentType"))
    }

    pub fn content_type_of(&self, part_name: &str) -> Option<&str> {
        self.override_for(part_name)
            .or_else(|| extension_of(part_name).and_then(|ext| self.default_for(ext)))
    }

    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        if self.default_for(extension).is_some() {
            return;
        }
        self.document.root.push_child(
            XmlElement::new("Default")
                .with_attr("Extension", extension.to_ascii_lowercase())
                .with_attr("ContentType", content_type),
        );
    }

    pub fn set_override(&mut self, part_name: &str, content_type: &str) {
        let wanted = format!("/{}", part_name.trim_start_matches('/'));
        let existing = self.document.root.child_elements_mut().find(|element| {
            element.name == "Override"
                && element
                    .attr("PartName")
                    .is_some_and(|name| name.eq_ignore_ascii_case(&wanted))
        });
        match existing {
            Some(element) => element.set_attr("ContentType", content_type),
            None => self.document.root.push_child(
                XmlElement::new("Override")
                    .with_attr("PartName", wanted)
                    .with_attr("ContentType", content_type),
            ),
        }
    }

    pub fn store(&self, package: &mut Package) -> Result<(), MergeError> {
        package.set_xml_part(CONTENT_TYPES_PART, &self.document)
    }
}

impl Default for ContentTypes {
    fn default() -> Self {
        let root = XmlElement::new("Types")
            .with_attr("xmlns", CONTENT_TYPES_NAMESPACE)
            .with_child(
                XmlElement::new("Default")
                    .with_attr("Extension", "rels")
                    .with_attr("ContentType", content_types::RELATIONSHIPS),
            )
            .with_child(
                XmlElement::new("Default")
                    .with_attr("Extension", "xml")
                    .with_attr("ContentType", "application/xml"),
            );
        Self {
            document: XmlDocument::new(root),
        }
    }
}

pub(crate) fn extension_of(part_name: &str) -> Option<&str> {
    let file = part_name.rsplit('/').next()?;
    file.rsplit_once('.').map(|(_, extension)| extension)
}
