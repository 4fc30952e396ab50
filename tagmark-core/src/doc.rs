//! Document model with Rope-based text storage

use anyhow::{bail, Context, Result};
use ropey::Rope;
use std::fs;
use std::path::{Path, PathBuf};

use crate::markup::{HeadingMatch, LineRange, MarkupKind};
use crate::parse;

/// A single open document: rope text plus the cached heading matches for
/// its current content. Headings are fully recomputed on every change.
#[derive(Clone)]
pub struct Document {
    pub path: PathBuf,
    pub kind: MarkupKind,
    pub rope: Rope,
    pub headings: Vec<HeadingMatch>,
    pub rev: u64,
}

impl Document {
    /// Load a document from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let abs_path = path
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize path: {}", path.display()))?;

        let kind = MarkupKind::from_path(&abs_path)
            .with_context(|| format!("Unsupported file type: {}", abs_path.display()))?;

        let content = fs::read_to_string(&abs_path)
            .with_context(|| format!("Failed to read file: {}", abs_path.display()))?;

        let headings = parse::parse(&content, kind);
        Ok(Self {
            path: abs_path,
            kind,
            rope: Rope::from_str(&content),
            headings,
            rev: 1,
        })
    }

    /// Create a document from in-memory text, as supplied by an editor
    /// buffer that has not been written to disk
    pub fn from_text(path: &Path, kind: MarkupKind, text: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            rope: Rope::from_str(text),
            headings: parse::parse(text, kind),
            rev: 1,
        }
    }

    /// Reload the document from disk
    pub fn reload(&mut self) -> Result<()> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to reload file: {}", self.path.display()))?;
        self.set_text(&content);
        Ok(())
    }

    /// Replace the full text (editor buffer change) and re-derive headings
    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.headings = parse::parse(text, self.kind);
        self.rev += 1;
    }

    /// Replace one line in place, keeping its trailing newline, and
    /// re-derive headings
    pub fn replace_line(&mut self, line_idx: usize, new_line: &str) -> Result<()> {
        if line_idx >= self.line_count() {
            bail!(
                "line {line_idx} out of bounds in {}",
                self.path.display()
            );
        }
        let start = self.rope.line_to_char(line_idx);
        let old = self.rope.line(line_idx);
        let end = start + old.len_chars();
        let keeps_newline = old.chars().last() == Some('\n');

        self.rope.remove(start..end);
        self.rope.insert(start, new_line);
        if keeps_newline {
            self.rope.insert(start + new_line.chars().count(), "\n");
        }
        self.headings = parse::parse(&self.text(), self.kind);
        self.rev += 1;
        Ok(())
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Get the number of lines in the document
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Extract the text of a half-open line range, e.g. a subtree block for
    /// export. The range is clamped to the document.
    pub fn slice_lines(&self, range: LineRange) -> String {
        let line_count = self.line_count();
        let start = range.start.min(line_count);
        let end = range.end.min(line_count);
        if start >= end {
            return String::new();
        }

        let mut result = String::new();
        for line_idx in start..end {
            for chunk in self.rope.line(line_idx).chunks() {
                result.push_str(chunk);
            }
        }

        if result.ends_with('\n') {
            result.pop();
        }
        result
    }
}
