//! Uniform table borders for generated body documents.

use crate::document::{Document, TABLE};
use crate::error::MergeError;
use crate::xml::XmlElement;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const TABLE_PROPERTIES: &str = "w:tblPr";
pub const TABLE_BORDERS: &str = "w:tblBorders";

/// The six border positions of a table, outer edges first.
pub const BORDER_POSITIONS: [&str; 6] = ["top", "bottom", "left", "right", "insideH", "insideV"];

/// `w:tblPr` children that must follow `w:tblBorders`.
const AFTER_BORDERS: [&str; 7] = [
    "w:shd",
    "w:tblLayout",
    "w:tblCellMar",
    "w:tblLook",
    "w:tblCaption",
    "w:tblDescription",
    "w:tblPrChange",
];

/// `w:tbl` children that must follow `w:tblPr`.
const AFTER_TABLE_PROPERTIES: [&str; 2] = ["w:tblGrid", "w:tr"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    #[default]
    Single,
    Double,
    Dashed,
    Dotted,
    Thick,
    None,
}

impl BorderStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            BorderStyle::Single => "single",
            BorderStyle::Double => "double",
            BorderStyle::Dashed => "dashed",
            BorderStyle::Dotted => "dotted",
            BorderStyle::Thick => "thick",
            BorderStyle::None => "none",
        }
    }
}

/// The line drawn on every border position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorderSpec {
    pub style: BorderStyle,
    /// Line width in eighths of a point.
    pub size: u8,
    /// Spacing between the border and the content, in points.
    pub space: u8,
    /// `RRGGBB` or `auto`.
    pub color: String,
}

impl Default for BorderSpec {
    /// A single black line of 0.5pt.
    fn default() -> Self {
        Self {
            style: BorderStyle::Single,
            size: 4,
            space: 0,
            color: "000000".to_string(),
        }
    }
}

impl BorderSpec {
    pub fn validate(&self) -> Result<(), MergeError> {
        if !(2..=96).contains(&self.size) {
            return Err(MergeError::InvalidOptions(format!(
                "border size must be between 2 and 96 eighths of a point, got {}",
                self.size
            )));
        }

        if self.space > 31 {
            return Err(MergeError::InvalidOptions(format!(
                "border space must be at most 31 points, got {}",
                self.space
            )));
        }

        let color = Regex::new(r"^(?:[0-9A-Fa-f]{6}|auto)$")
            .map_err(|err| MergeError::InvalidOptions(err.to_string()))?;
        if !color.is_match(&self.color) {
            return Err(MergeError::InvalidOptions(format!(
                "border color must be six hex digits or 'auto', got '{}'",
                self.color
            )));
        }

        Ok(())
    }

    /// Builds a fresh `w:tblBorders` element.
    pub fn to_element(&self) -> XmlElement {
        let mut borders = XmlElement::new(TABLE_BORDERS);
        for position in BORDER_POSITIONS {
            borders.push_child(
                XmlElement::new(format!("w:{position}"))
                    .with_attr("w:val", self.style.as_str())
                    .with_attr("w:sz", self.size.to_string())
                    .with_attr("w:space", self.space.to_string())
                    .with_attr("w:color", self.color.as_str()),
            );
        }
        borders
    }
}

/// Replaces the borders of one `w:tbl` element.
///
/// Any existing `w:tblBorders` is removed first and the new one is placed at
/// its schema position, so applying this twice yields the same tree.
pub fn normalize_table(table: &mut XmlElement, spec: &BorderSpec) {
    let properties_at = table
        .position_of(|child| AFTER_TABLE_PROPERTIES.contains(&child.name.as_str()))
        .unwrap_or(table.children.len());
    let properties = table.find_or_insert_child(TABLE_PROPERTIES, properties_at);

    properties.remove_children(TABLE_BORDERS);
    let borders_at = properties
        .position_of(|child| AFTER_BORDERS.contains(&child.name.as_str()))
        .unwrap_or(properties.children.len());
    properties.insert_child(borders_at, spec.to_element());
}

/// Normalizes every table in the document and returns how many were touched.
pub fn normalize_tables(document: &mut Document, spec: &BorderSpec) -> usize {
    let mut count = 0;
    document.for_each_table_mut(&mut |table| {
        debug_assert_eq!(table.name, TABLE);
        normalize_table(table, spec);
        count += 1;
    });
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    fn parse(xml: &str) -> XmlElement {
        XmlDocument::parse(xml.as_bytes()).unwrap().root
    }

    fn serialize(element: &XmlElement) -> String {
        let bytes = XmlDocument::new(element.clone()).to_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        text.split_once("?>\r\n").unwrap().1.to_string()
    }

    const BARE_TABLE: &str =
        r#"<w:tbl><w:tblGrid><w:gridCol/></w:tblGrid><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#;

    #[test]
    fn bare_table_gets_properties_and_six_borders() {
        let mut table = parse(BARE_TABLE);

        normalize_table(&mut table, &BorderSpec::default());

        let properties = table.child_elements().next().unwrap();
        insta::assert_snapshot!(serialize(properties), @r#"<w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:bottom w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:left w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:right w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:insideH w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="000000"/></w:tblBorders></w:tblPr>"#);
    }

    #[test]
    fn existing_borders_are_replaced_in_schema_order() {
        let mut table = parse(
            r#"<w:tbl><w:tblPr><w:tblStyle w:val="Grid"/><w:tblW w:w="0" w:type="auto"/><w:tblLook w:val="04A0"/><w:tblBorders><w:top w:val="double"/></w:tblBorders></w:tblPr><w:tr/></w:tbl>"#,
        );

        normalize_table(&mut table, &BorderSpec::default());

        let properties = table.find_child(TABLE_PROPERTIES).unwrap();
        let names: Vec<&str> = properties.child_elements().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["w:tblStyle", "w:tblW", "w:tblBorders", "w:tblLook"]
        );
        let borders = properties.find_child(TABLE_BORDERS).unwrap();
        assert_eq!(borders.children.len(), 6);
        assert!(borders
            .child_elements()
            .all(|border| border.attr("w:val") == Some("single")));
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut once = parse(BARE_TABLE);
        normalize_table(&mut once, &BorderSpec::default());
        let mut twice = once.clone();
        normalize_table(&mut twice, &BorderSpec::default());

        assert_eq!(serialize(&once), serialize(&twice));
    }

    #[test]
    fn cell_content_is_untouched() {
        let mut table = parse(BARE_TABLE);
        let before: Vec<XmlElement> = table
            .child_elements()
            .filter(|e| e.name != TABLE_PROPERTIES)
            .cloned()
            .collect();

        normalize_table(&mut table, &BorderSpec::default());

        let after: Vec<XmlElement> = table
            .child_elements()
            .filter(|e| e.name != TABLE_PROPERTIES)
            .cloned()
            .collect();
        assert_eq!(before, after);
        assert_eq!(table.text(), "cell");
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let bad_size = BorderSpec {
            size: 1,
            ..BorderSpec::default()
        };
        let bad_color = BorderSpec {
            color: "black".to_string(),
            ..BorderSpec::default()
        };
        let auto_color = BorderSpec {
            color: "auto".to_string(),
            ..BorderSpec::default()
        };

        assert!(bad_size.validate().is_err());
        assert!(bad_color.validate().is_err());
        assert!(auto_color.validate().is_ok());
        assert!(BorderSpec::default().validate().is_ok());
    }
}
