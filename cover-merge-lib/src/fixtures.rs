//! Minimal in-memory packages for unit tests.

use crate::document::Document;
use crate::package::{content_types, rel_types, Package, CONTENT_TYPES_PART};

pub(crate) const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(crate) const R_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

#[derive(Default)]
pub(crate) struct DocxBuilder {
    body: String,
    namespaces: Vec<(String, String)>,
    styles: Option<String>,
    numbering: Option<String>,
    footnotes: Option<String>,
    relationships: Vec<(String, String, String, bool)>,
    parts: Vec<(String, Vec<u8>)>,
    defaults: Vec<(String, String)>,
}

impl DocxBuilder {
    /// `body` is the XML placed inside `w:body`, before its section properties.
    pub(crate) fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn namespace(mut self, prefix: &str, uri: &str) -> Self {
        self.namespaces.push((prefix.to_string(), uri.to_string()));
        self
    }

    pub(crate) fn styles(mut self, inner: &str) -> Self {
        self.styles = Some(inner.to_string());
        self
    }

    pub(crate) fn numbering(mut self, inner: &str) -> Self {
        self.numbering = Some(inner.to_string());
        self
    }

    pub(crate) fn footnotes(mut self, inner: &str) -> Self {
        self.footnotes = Some(inner.to_string());
        self
    }

    pub(crate) fn relationship(mut self, id: &str, rel_type: &str, target: &str, external: bool) -> Self {
        self.relationships
            .push((id.to_string(), rel_type.to_string(), target.to_string(), external));
        self
    }

    pub(crate) fn part(mut self, name: &str, data: Vec<u8>) -> Self {
        self.parts.push((name.to_string(), data));
        self
    }

    pub(crate) fn default_type(mut self, extension: &str, content_type: &str) -> Self {
        self.defaults
            .push((extension.to_string(), content_type.to_string()));
        self
    }

    pub(crate) fn build(self) -> Package {
        let mut types = String::from(
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>"#,
        );
        for (extension, content_type) in &self.defaults {
            types.push_str(&format!(
                r#"<Default Extension="{extension}" ContentType="{content_type}"/>"#
            ));
        }
        let mut overrides = vec![("word/document.xml".to_string(), content_types::MAIN_DOCUMENT)];

        let mut rels = String::from(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (id, rel_type, target, external) in &self.relationships {
            let mode = if *external { r#" TargetMode="External""# } else { "" };
            rels.push_str(&format!(
                r#"<Relationship Id="{id}" Type="{rel_type}" Target="{target}"{mode}/>"#
            ));
        }

        let mut parts: Vec<(String, Vec<u8>)> = Vec::new();
        let auxiliary = [
            (&self.styles, "styles", rel_types::STYLES, content_types::STYLES, "w:styles"),
            (&self.numbering, "numbering", rel_types::NUMBERING, content_types::NUMBERING, "w:numbering"),
            (&self.footnotes, "footnotes", rel_types::FOOTNOTES, content_types::FOOTNOTES, "w:footnotes"),
        ];
        for (index, (inner, stem, rel_type, content_type, root)) in auxiliary.into_iter().enumerate() {
            let Some(inner) = inner else {
                continue;
            };
            let name = format!("word/{stem}.xml");
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{rel_type}" Target="{stem}.xml"/>"#,
                100 + index
            ));
            parts.push((
                name.clone(),
                format!(r#"<{root} xmlns:w="{W_NS}" xmlns:r="{R_NS}">{inner}</{root}>"#).into_bytes(),
            ));
            overrides.push((name, content_type));
        }
        rels.push_str("</Relationships>");

        for (part, content_type) in overrides {
            types.push_str(&format!(
                r#"<Override PartName="/{part}" ContentType="{content_type}"/>"#
            ));
        }
        types.push_str("</Types>");

        let namespaces: String = self
            .namespaces
            .iter()
            .map(|(prefix, uri)| format!(r#" xmlns:{prefix}="{uri}""#))
            .collect();
        let document = format!(
            r#"<w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}"{namespaces}><w:body>{}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:body></w:document>"#,
            self.body
        );

        let package_rels = format!(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{}" Target="word/document.xml"/></Relationships>"#,
            rel_types::OFFICE_DOCUMENT
        );

        parts.extend([
            (CONTENT_TYPES_PART.to_string(), types.into_bytes()),
            ("_rels/.rels".to_string(), package_rels.into_bytes()),
            ("word/document.xml".to_string(), document.into_bytes()),
            ("word/_rels/document.xml.rels".to_string(), rels.into_bytes()),
        ]);
        parts.extend(self.parts);
        Package::from_parts(parts)
    }

    pub(crate) fn document(self) -> Document {
        Document::from_package(self.build()).unwrap()
    }
}
