use cover_merge_lib::package::{content_types, rel_types, Package, CONTENT_TYPES_PART};
use std::path::Path;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

pub fn paragraph(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
}

/// A paragraph with one run per entry of `runs`.
pub fn split_paragraph(runs: &[&str]) -> String {
    let runs: String = runs
        .iter()
        .map(|text| format!(r#"<w:r><w:t xml:space="preserve">{text}</w:t></w:r>"#))
        .collect();
    format!("<w:p>{runs}</w:p>")
}

pub fn table(cell: &str) -> String {
    format!(
        r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid><w:gridCol w:w="2000"/></w:tblGrid><w:tr><w:tc>{}</w:tc></w:tr></w:tbl>"#,
        paragraph(cell)
    )
}

/// A package whose body is `body`, followed by A4 section properties.
pub fn docx(body: &str) -> Package {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}"><w:body>{body}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:body></w:document>"#
    );
    let types = format!(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="{}"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="{}"/></Types>"#,
        content_types::RELATIONSHIPS,
        content_types::MAIN_DOCUMENT
    );
    let package_rels = format!(
        r#"<Relationships xmlns="{RELS_NS}"><Relationship Id="rId1" Type="{}" Target="word/document.xml"/></Relationships>"#,
        rel_types::OFFICE_DOCUMENT
    );

    Package::from_parts([
        (CONTENT_TYPES_PART, types),
        ("_rels/.rels", package_rels),
        ("word/document.xml", document),
    ])
}

pub fn write_docx(path: &Path, body: &str) {
    docx(body).save(path).unwrap();
}
