//! `cover-merge-lib` combines a cover document with a generated body document
//! into one `.docx` file. It powers the `cover-merge` CLI.
//!
//! A merge substitutes a title placeholder in the cover, gives every table of
//! the body uniform borders, and appends the body with the images, styles,
//! numbering and notes it refers to.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use cover_merge_lib::{merge_files, MergeOptions};
//!
//! # fn demo() -> Result<(), cover_merge_lib::error::MergeError> {
//! let options = MergeOptions {
//!     title: Some("Q3 Summary".into()),
//!     ..MergeOptions::default()
//! };
//!
//! let report = merge_files(
//!     Path::new("cover.docx"),
//!     Path::new("body.docx"),
//!     Path::new("report.docx"),
//!     &options,
//! )?;
//! assert!(report.placeholders.total() > 0);
//! # Ok(())
//! # }
//! ```

pub mod borders;
pub mod compose;
pub mod document;
pub mod error;
pub mod options;
pub mod package;
pub mod placeholder;
pub mod xml;

#[cfg(test)]
mod fixtures;

pub use crate::document::Document;
pub use crate::error::MergeError;
pub use crate::options::MergeOptions;

use crate::borders::BorderSpec;
use crate::compose::AppendReport;
use crate::placeholder::{resolve_placeholders, ResolveReport, RunSequence};
use log::{debug, info, warn};
use std::path::Path;

/// The operations a merge needs from a document.
///
/// [`Document`] implements it over a real package. Anything else that can
/// expose its paragraphs as [`RunSequence`]s can be merged by [`merge`] too.
pub trait Mergeable {
    type Paragraph<'a>: RunSequence
    where
        Self: 'a;

    /// The paragraphs that may carry the title placeholder, in order.
    fn paragraphs(&mut self) -> Vec<Self::Paragraph<'_>>;

    /// Gives every table the same borders and returns how many tables there were.
    fn normalize_tables(&mut self, spec: &BorderSpec) -> usize;

    /// Appends `other`'s content after the existing content.
    fn append(&mut self, other: &Self) -> Result<AppendReport, MergeError>;
}

impl Mergeable for Document {
    type Paragraph<'a> = document::Paragraph<'a>;

    fn paragraphs(&mut self) -> Vec<Self::Paragraph<'_>> {
        self.paragraphs_mut().collect()
    }

    fn normalize_tables(&mut self, spec: &BorderSpec) -> usize {
        borders::normalize_tables(self, spec)
    }

    fn append(&mut self, other: &Self) -> Result<AppendReport, MergeError> {
        compose::append_document(self, other)
    }
}

/// What a merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub placeholders: ResolveReport,
    pub tables_normalized: usize,
    pub append: AppendReport,
}

/// Merges `body` into `prefix` in memory.
///
/// The title is resolved in `prefix` only and borders are applied to `body`
/// only, both before the append, so tables already in the prefix keep their
/// borders.
pub fn merge<D: Mergeable>(
    prefix: &mut D,
    body: &mut D,
    options: &MergeOptions,
) -> Result<MergeReport, MergeError> {
    options.validate()?;
    let mut report = MergeReport::default();

    if let Some(title) = options.effective_title() {
        report.placeholders = resolve_placeholders(prefix.paragraphs(), &options.placeholder, title);
        if report.placeholders.total() == 0 {
            warn!(
                "A title was given but no paragraph of the prefix contains {}",
                options.placeholder
            );
        } else {
            debug!(
                "Resolved {} in {} paragraph(s)",
                options.placeholder,
                report.placeholders.total()
            );
        }
    }

    if options.borders.enabled {
        report.tables_normalized = body.normalize_tables(&options.borders.spec());
        debug!("Normalized borders of {} table(s)", report.tables_normalized);
    } else {
        debug!("Table border normalization is disabled");
    }

    report.append = prefix.append(body)?;
    debug!("Appended {} block(s) from the body", report.append.blocks);

    Ok(report)
}

/// Loads both documents, merges them and saves the result to `output`.
///
/// Nothing is written unless the whole merge succeeds, and a failed save
/// leaves no partial file at `output`.
pub fn merge_files(
    prefix: &Path,
    body: &Path,
    output: &Path,
    options: &MergeOptions,
) -> Result<MergeReport, MergeError> {
    options.validate()?;

    debug!("Loading prefix {}", prefix.display());
    let mut prefix_document = Document::open(prefix)?;
    debug!("Loading body {}", body.display());
    let mut body_document = Document::open(body)?;

    let report = merge(&mut prefix_document, &mut body_document, options)?;

    prefix_document.save(output)?;
    info!(
        "Wrote {} ({} block(s) appended, {} table(s) bordered)",
        output.display(),
        report.append.blocks,
        report.tables_normalized
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::DocxBuilder;
    use crate::placeholder::DEFAULT_PLACEHOLDER;

    /// A document reduced to run texts and table borders.
    #[derive(Debug, Default)]
    struct FakeDocument {
        paragraphs: Vec<Vec<String>>,
        tables: Vec<Option<BorderSpec>>,
    }

    impl FakeDocument {
        fn new(paragraphs: &[&[&str]], tables: usize) -> Self {
            Self {
                paragraphs: paragraphs
                    .iter()
                    .map(|runs| runs.iter().map(|run| run.to_string()).collect())
                    .collect(),
                tables: vec![None; tables],
            }
        }

        fn texts(&self) -> Vec<String> {
            self.paragraphs.iter().map(|runs| runs.concat()).collect()
        }
    }

    impl Mergeable for FakeDocument {
        type Paragraph<'a> = &'a mut Vec<String>;

        fn paragraphs(&mut self) -> Vec<Self::Paragraph<'_>> {
            self.paragraphs.iter_mut().collect()
        }

        fn normalize_tables(&mut self, spec: &BorderSpec) -> usize {
            for table in &mut self.tables {
                *table = Some(spec.clone());
            }
            self.tables.len()
        }

        fn append(&mut self, other: &Self) -> Result<AppendReport, MergeError> {
            self.paragraphs.extend(other.paragraphs.iter().cloned());
            self.tables.extend(other.tables.iter().cloned());
            Ok(AppendReport {
                blocks: other.paragraphs.len() + other.tables.len(),
                ..AppendReport::default()
            })
        }
    }

    fn titled(title: &str) -> MergeOptions {
        MergeOptions {
            title: Some(title.to_string()),
            ..MergeOptions::default()
        }
    }

    #[test]
    fn title_goes_into_prefix_and_borders_only_into_body() {
        let mut prefix = FakeDocument::new(&[&["Report: {{TIT", "LE}}"], &["Contents"]], 1);
        let mut body = FakeDocument::new(&[&["Chapter 1"], &["{{TITLE}} stays"]], 2);

        let report = merge(&mut prefix, &mut body, &titled("Q3 Summary")).unwrap();

        assert_eq!(
            prefix.texts(),
            vec!["Report: Q3 Summary", "Contents", "Chapter 1", "{{TITLE}} stays"]
        );
        assert_eq!(
            prefix.tables,
            vec![None, Some(BorderSpec::default()), Some(BorderSpec::default())]
        );
        assert_eq!(report.placeholders.reconstructed, 1);
        assert_eq!(report.tables_normalized, 2);
        assert_eq!(report.append.blocks, 4);
    }

    #[test]
    fn no_title_leaves_prefix_text_alone() {
        let mut prefix = FakeDocument::new(&[&["{{TITLE}}"]], 0);
        let mut body = FakeDocument::new(&[&["body"]], 0);

        let report = merge(&mut prefix, &mut body, &MergeOptions::default()).unwrap();

        assert_eq!(prefix.texts(), vec![DEFAULT_PLACEHOLDER, "body"]);
        assert_eq!(report.placeholders.total(), 0);
    }

    #[test]
    fn disabled_borders_leave_body_tables_alone() {
        let mut prefix = FakeDocument::default();
        let mut body = FakeDocument::new(&[], 1);
        let mut options = MergeOptions::default();
        options.borders.enabled = false;

        merge(&mut prefix, &mut body, &options).unwrap();

        assert_eq!(prefix.tables, vec![None]);
    }

    #[test]
    fn invalid_options_fail_before_any_change() {
        let mut prefix = FakeDocument::new(&[&["{{TITLE}}"]], 0);
        let mut body = FakeDocument::new(&[&["body"]], 0);
        let mut options = titled("X");
        options.borders.size = 200;

        let err = merge(&mut prefix, &mut body, &options).unwrap_err();

        assert!(matches!(err, MergeError::InvalidOptions(_)));
        assert_eq!(prefix.texts(), vec![DEFAULT_PLACEHOLDER]);
    }

    #[test]
    fn docx_merge_borders_body_tables_only() {
        let table = r#"<w:tbl><w:tblGrid><w:gridCol/></w:tblGrid><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#;
        let mut prefix = DocxBuilder::new(&format!(
            r#"<w:p><w:r><w:t>Report: {{{{TIT</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>LE}}}}</w:t></w:r></w:p>{table}"#
        ))
        .document();
        let mut body = DocxBuilder::new(&format!("<w:p><w:r><w:t>Body</w:t></w:r></w:p>{table}")).document();

        merge(&mut prefix, &mut body, &titled("Q3 Summary")).unwrap();

        assert_eq!(
            prefix.paragraph_texts(),
            vec!["Report: Q3 Summary", "cell", "Body", "cell"]
        );
        let tables = prefix.tables();
        assert_eq!(tables.len(), 2);
        assert!(tables[0].find_child(borders::TABLE_PROPERTIES).is_none());
        let properties = tables[1].find_child(borders::TABLE_PROPERTIES).unwrap();
        assert_eq!(properties.descendants_named("w:top")[0].attr("w:sz"), Some("4"));
    }
}
