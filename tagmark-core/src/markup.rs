//! Shared data model for heading markup

use std::path::Path;

/// Which heading syntax a document (or a single match) uses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkupKind {
    Markdown,
    Typst,
}

impl MarkupKind {
    /// Classify a file by extension; `None` means the file is not indexable
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => Some(MarkupKind::Markdown),
            Some("typ") => Some(MarkupKind::Typst),
            _ => None,
        }
    }
}

/// A half-open span of document lines `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span covering exactly one line
    pub fn single(line: usize) -> Self {
        Self {
            start: line,
            end: line + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True if `other` lies entirely within this span
    pub fn contains(&self, other: &LineRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

/// One recognized heading line, produced by the parser
///
/// Matches carry no identity beyond `line` and are fully recomputed on
/// every parse; never patch stale matches after an edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadingMatch {
    pub kind: MarkupKind,
    /// Number of `#` or `=` marker characters. Markdown is capped at 6 by
    /// its syntax; Typst levels are unbounded.
    pub level: usize,
    /// Heading title with the tag/remark comment suffix stripped, trimmed
    pub text: String,
    /// `text` with inline markup removed, for presentation only
    pub display_text: String,
    /// Zero-based source line, the primary key within a document
    pub line: usize,
    /// Span covering exactly the heading's own line
    pub range: LineRange,
    /// Tag names (without the `#` sigil), in order, duplicate-free
    pub tags: Vec<String>,
    pub remark: Option<String>,
}
