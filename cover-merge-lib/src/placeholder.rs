//! Title placeholder substitution that tolerates tokens split across runs.
//!
//! Word often stores a token such as `{{TITLE}}` in several runs, for example
//! `["Report: {{TIT", "LE}}"]`, after spell-checking or partial formatting.
//! Each paragraph is handled in two phases:
//!
//! 1. Runs that hold the complete token are rewritten in place, so they keep
//!    their own formatting.
//! 2. If no single run held the token, the paragraph text is rebuilt with the
//!    token replaced. It goes into the first run and the later runs are
//!    emptied, so their formatting is lost for the rebuilt text.

use log::debug;

/// The token replaced by the title unless the options name another one.
pub const DEFAULT_PLACEHOLDER: &str = "{{TITLE}}";

/// An ordered list of text runs whose concatenation is a paragraph's text.
pub trait RunSequence {
    fn run_count(&self) -> usize;

    fn run_text(&self, index: usize) -> String;

    fn set_run_text(&mut self, index: usize, text: &str);

    fn text(&self) -> String {
        (0..self.run_count()).map(|index| self.run_text(index)).collect()
    }
}

impl<T: RunSequence + ?Sized> RunSequence for &mut T {
    fn run_count(&self) -> usize {
        (**self).run_count()
    }

    fn run_text(&self, index: usize) -> String {
        (**self).run_text(index)
    }

    fn set_run_text(&mut self, index: usize, text: &str) {
        (**self).set_run_text(index, text)
    }
}

/// Plain run lists, handy for exercising the algorithm without a package.
impl RunSequence for Vec<String> {
    fn run_count(&self) -> usize {
        self.len()
    }

    fn run_text(&self, index: usize) -> String {
        self.get(index).cloned().unwrap_or_default()
    }

    fn set_run_text(&mut self, index: usize, text: &str) {
        if let Some(run) = self.get_mut(index) {
            *run = text.to_string();
        }
    }
}

/// How a paragraph was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The token was absent, or there was no run to write into.
    Untouched,
    /// At least one run contained the whole token and was rewritten in place.
    RunLocal,
    /// The token spanned runs; the first run received the rebuilt text.
    Reconstructed,
}

/// Counts of paragraphs changed by [`resolve_placeholders`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub run_local: usize,
    pub reconstructed: usize,
}

impl ResolveReport {
    pub fn total(&self) -> usize {
        self.run_local + self.reconstructed
    }
}

/// Replaces every occurrence of `token` in one paragraph.
pub fn resolve_paragraph<P: RunSequence + ?Sized>(
    paragraph: &mut P,
    token: &str,
    replacement: &str,
) -> Resolution {
    if token.is_empty() {
        return Resolution::Untouched;
    }

    let full_text = paragraph.text();
    if !full_text.contains(token) {
        return Resolution::Untouched;
    }

    let mut replaced = false;
    for index in 0..paragraph.run_count() {
        let text = paragraph.run_text(index);
        if text.contains(token) {
            paragraph.set_run_text(index, &text.replace(token, replacement));
            replaced = true;
        }
    }
    if replaced {
        return Resolution::RunLocal;
    }

    let run_count = paragraph.run_count();
    if run_count == 0 {
        return Resolution::Untouched;
    }

    paragraph.set_run_text(0, &full_text.replace(token, replacement));
    for index in 1..run_count {
        paragraph.set_run_text(index, "");
    }
    Resolution::Reconstructed
}

/// Resolves `token` in every paragraph. An empty `replacement` leaves all
/// paragraphs untouched.
pub fn resolve_placeholders<P: RunSequence>(
    paragraphs: impl IntoIterator<Item = P>,
    token: &str,
    replacement: &str,
) -> ResolveReport {
    let mut report = ResolveReport::default();
    if replacement.is_empty() {
        return report;
    }

    for (index, mut paragraph) in paragraphs.into_iter().enumerate() {
        match resolve_paragraph(&mut paragraph, token, replacement) {
            Resolution::Untouched => {}
            Resolution::RunLocal => {
                debug!("Replaced {token} in paragraph {index} within its runs");
                report.run_local += 1;
            }
            Resolution::Reconstructed => {
                debug!("Rebuilt paragraph {index} to replace a split {token}");
                report.reconstructed += 1;
            }
        }
    }

    report
}
