use cover_merge_lib::package::{content_types, rel_types, Package, CONTENT_TYPES_PART};
use std::path::Path;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

pub fn paragraph(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
}

pub fn table(cell: &str) -> String {
    format!(
        "<w:tbl><w:tblGrid><w:gridCol/></w:tblGrid><w:tr><w:tc>{}</w:tc></w:tr></w:tbl>",
        paragraph(cell)
    )
}

/// Writes a minimal `.docx` whose body holds `body`.
pub fn write_docx(path: &Path, body: &str) {
    let document = format!(
        r#"<w:document xmlns:w="{W_NS}"><w:body>{body}<w:sectPr/></w:body></w:document>"#
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
    .save(path)
    .unwrap();
}
