//! Workspace-wide tag index
//!
//! [`TagIndex`] owns an inverted map from tag name to the headings carrying
//! it, a per-document breadcrumb map, and the stored tag definitions. It is
//! populated by a full workspace scan and then maintained per file: every
//! change purges the file's entries and re-inserts from a fresh parse.
//! There is no diff update.
//!
//! The index is an explicit context object constructed once and passed to
//! consumers; there is no global state. One logical writer mutates it, and
//! readers during an in-progress scan may observe a transiently partial
//! index. Subscribers get a single [`IndexEvent::Updated`] after each scan
//! or per-file mutation completes.

use anyhow::{bail, Context, Result};
use crossbeam_channel::{Receiver, Sender};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::comment;
use crate::config::Config;
use crate::doc::Document;
use crate::markup::{LineRange, MarkupKind};
use crate::parse;

/// User-visible tag metadata, persisted through the config store. Lives
/// independently of index occurrences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDefinition {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub pinned: bool,
}

/// One tagged heading occurrence in the inverted index
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedHeading {
    pub path: PathBuf,
    /// Derived id `path:line`; recomputed on every re-index
    pub id: String,
    pub line: usize,
    pub level: usize,
    pub kind: MarkupKind,
    pub range: LineRange,
    pub text: String,
    pub display_text: String,
    pub tags: Vec<String>,
    pub remark: Option<String>,
    /// Ancestor display texts, inclusive of this heading
    pub breadcrumb: Vec<String>,
}

/// Fired once after a scan or per-file update fully completes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexEvent {
    Updated,
}

pub struct TagIndex {
    config: Config,
    /// tag name -> occurrences, in insertion order (document order per file)
    blocks: BTreeMap<String, Vec<TaggedHeading>>,
    /// document -> line -> breadcrumb
    breadcrumbs: HashMap<PathBuf, BTreeMap<usize, Vec<String>>>,
    definitions: BTreeMap<String, TagDefinition>,
    subscribers: Vec<Sender<IndexEvent>>,
    scanning: bool,
}

impl TagIndex {
    pub fn new(config: Config) -> Self {
        let definitions = config
            .definitions
            .iter()
            .map(|d| (d.name.clone(), d.clone()))
            .collect();
        Self {
            config,
            blocks: BTreeMap::new(),
            breadcrumbs: HashMap::new(),
            definitions,
            subscribers: Vec::new(),
            scanning: false,
        }
    }

    /// Register for update notifications
    pub fn subscribe(&mut self) -> Receiver<IndexEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Clear the index and re-parse every indexable file under `root`,
    /// sequentially. Unreadable files are logged and skipped; they do not
    /// abort the scan. Returns the number of files indexed.
    ///
    /// A scan must not be started while another is in flight.
    pub fn scan_workspace(&mut self, root: &Path) -> Result<usize> {
        if self.scanning {
            bail!("workspace scan already in progress");
        }
        self.scanning = true;
        self.blocks.clear();
        self.breadcrumbs.clear();

        let mut indexed = 0usize;
        let walker = WalkBuilder::new(root)
            .git_ignore(self.config.scan.respect_gitignore)
            .hidden(!self.config.scan.include_hidden)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("scan: skipping unreadable entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            let Some(kind) = MarkupKind::from_path(path) else {
                continue;
            };
            match fs::read_to_string(path) {
                Ok(text) => {
                    self.insert_document(path, &text, kind);
                    indexed += 1;
                }
                Err(err) => log::warn!("scan: skipping {}: {err}", path.display()),
            }
        }

        self.scanning = false;
        self.notify_subscribers();
        Ok(indexed)
    }

    /// Re-index a document from its current text (change or save trigger)
    pub fn update_document(&mut self, doc: &Document) {
        self.update_file(&doc.path, &doc.text(), doc.kind);
    }

    /// Purge all entries for `path` and re-insert from `text`
    pub fn update_file(&mut self, path: &Path, text: &str, kind: MarkupKind) {
        self.purge_file(path);
        self.insert_document(path, text, kind);
        self.notify_subscribers();
    }

    /// Drop all entries for a deleted file
    pub fn remove_file(&mut self, path: &Path) {
        self.purge_file(path);
        self.notify_subscribers();
    }

    /// Save trigger: re-index the document, then auto-register any tags not
    /// yet present among the stored definitions (when enabled). Returns the
    /// names of newly registered tags.
    pub fn save_document(&mut self, doc: &Document) -> Result<Vec<String>> {
        self.update_document(doc);
        if !self.config.tags.auto_register {
            return Ok(Vec::new());
        }
        let tags = self.tags_for_file(&doc.path);
        self.auto_register_new_tags(&tags)
    }

    /// Rewrite the tag/remark annotation of the heading at `line`, then
    /// re-index the document. This is the write path that applies the
    /// remark/tag coupling policy: duplicates are dropped, the configured
    /// remark-marker tag is force-added to remark-only headings, and a
    /// remark with no tags is cleared. The caller persists the document.
    pub fn set_annotation(
        &mut self,
        doc: &mut Document,
        line: usize,
        tags: &[String],
        remark: Option<&str>,
    ) -> Result<()> {
        let heading = doc
            .headings
            .iter()
            .find(|h| h.line == line)
            .with_context(|| format!("no heading at line {line} in {}", doc.path.display()))?
            .clone();

        let marker = self.config.tags.remark_marker.as_deref();
        let (tags, remark) = comment::normalize_tags_and_remark(tags, remark, marker);
        let body = comment::encode(&tags, remark.as_deref());
        let rendered =
            parse::compose_heading_line(heading.kind, heading.level, &heading.text, &body);

        doc.replace_line(line, &rendered)?;
        self.update_document(doc);
        Ok(())
    }

    /// Union of tags in the live index and stored definitions, sorted
    pub fn all_tags(&self) -> Vec<String> {
        let mut tags: BTreeSet<&str> = self.blocks.keys().map(String::as_str).collect();
        tags.extend(self.definitions.keys().map(String::as_str));
        tags.into_iter().map(str::to_string).collect()
    }

    /// All headings carrying `tag`, in index order
    pub fn blocks_by_tag(&self, tag: &str) -> Vec<&TaggedHeading> {
        self.blocks
            .get(tag)
            .map(|blocks| blocks.iter().collect())
            .unwrap_or_default()
    }

    /// Headings in one file, optionally filtered by tag. Without a filter
    /// the union over all tags is deduplicated by heading id and ordered by
    /// line.
    pub fn blocks_for_file(&self, path: &Path, tag: Option<&str>) -> Vec<&TaggedHeading> {
        match tag {
            Some(tag) => self
                .blocks_by_tag(tag)
                .into_iter()
                .filter(|b| b.path == path)
                .collect(),
            None => {
                let mut seen: HashSet<&str> = HashSet::new();
                let mut out: Vec<&TaggedHeading> = self
                    .blocks
                    .values()
                    .flatten()
                    .filter(|b| b.path == path && seen.insert(b.id.as_str()))
                    .collect();
                out.sort_by_key(|b| b.line);
                out
            }
        }
    }

    /// Distinct tags occurring in one file, sorted
    pub fn tags_for_file(&self, path: &Path) -> Vec<String> {
        self.blocks
            .iter()
            .filter(|(_, blocks)| blocks.iter().any(|b| b.path == path))
            .map(|(tag, _)| tag.clone())
            .collect()
    }

    /// Breadcrumb for the heading at `line`, if one is indexed there
    pub fn breadcrumb(&self, path: &Path, line: usize) -> Option<&[String]> {
        self.breadcrumbs
            .get(path)
            .and_then(|by_line| by_line.get(&line))
            .map(Vec::as_slice)
    }

    /// Register definitions for tags not yet known. Names are validated
    /// first; on any invalid name the index is left unmodified. New
    /// definitions get default styling, and are pinned only while the
    /// pinned count stays below the configured maximum.
    pub fn auto_register_new_tags(&mut self, tags: &[String]) -> Result<Vec<String>> {
        let new: Vec<&String> = tags
            .iter()
            .filter(|t| !self.definitions.contains_key(*t))
            .collect();
        for tag in &new {
            validate_tag_name(tag)?;
        }

        let mut pinned_count = self.definitions.values().filter(|d| d.pinned).count();
        let mut registered = Vec::new();
        for tag in new {
            if self.definitions.contains_key(tag) {
                continue;
            }
            let pinned = pinned_count < self.config.tags.max_pinned;
            if pinned {
                pinned_count += 1;
            }
            self.definitions.insert(
                tag.clone(),
                TagDefinition {
                    name: tag.clone(),
                    color: None,
                    icon: None,
                    pinned,
                },
            );
            registered.push(tag.clone());
        }
        Ok(registered)
    }

    pub fn definition(&self, name: &str) -> Option<&TagDefinition> {
        self.definitions.get(name)
    }

    /// Snapshot of all definitions, for writing back to the config store
    pub fn definitions(&self) -> Vec<TagDefinition> {
        self.definitions.values().cloned().collect()
    }

    fn purge_file(&mut self, path: &Path) {
        self.blocks.retain(|_, blocks| {
            blocks.retain(|b| b.path != path);
            !blocks.is_empty()
        });
        self.breadcrumbs.remove(path);
    }

    /// Parse `text` and insert its headings, computing breadcrumbs with the
    /// same stack discipline as tree building but without building a tree
    fn insert_document(&mut self, path: &Path, text: &str, kind: MarkupKind) {
        let matches = parse::parse(text, kind);
        let mut stack: Vec<(usize, String)> = Vec::new();
        let mut crumbs: BTreeMap<usize, Vec<String>> = BTreeMap::new();

        for m in &matches {
            while stack.last().is_some_and(|(level, _)| *level >= m.level) {
                stack.pop();
            }
            let mut breadcrumb: Vec<String> =
                stack.iter().map(|(_, label)| label.clone()).collect();
            breadcrumb.push(m.display_text.clone());
            stack.push((m.level, m.display_text.clone()));
            crumbs.insert(m.line, breadcrumb.clone());

            if m.tags.is_empty() {
                continue;
            }
            let block = TaggedHeading {
                path: path.to_path_buf(),
                id: format!("{}:{}", path.display(), m.line),
                line: m.line,
                level: m.level,
                kind: m.kind,
                range: m.range,
                text: m.text.clone(),
                display_text: m.display_text.clone(),
                tags: m.tags.clone(),
                remark: m.remark.clone(),
                breadcrumb,
            };
            for tag in &m.tags {
                self.blocks.entry(tag.clone()).or_default().push(block.clone());
            }
        }

        self.breadcrumbs.insert(path.to_path_buf(), crumbs);
    }

    fn notify_subscribers(&mut self) {
        self.subscribers
            .retain(|tx| tx.send(IndexEvent::Updated).is_ok());
    }
}

fn validate_tag_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("tag name must not be empty");
    }
    if name.chars().any(char::is_whitespace) {
        bail!("tag name {name:?} must not contain whitespace");
    }
    Ok(())
}
