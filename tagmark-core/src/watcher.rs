//! Workspace watching for external file changes
//!
//! Watches a workspace root recursively and forwards create/modify/remove
//! events for indexable files. Consumers feed these into
//! [`TagIndex::update_file`](crate::index::TagIndex::update_file) and
//! [`TagIndex::remove_file`](crate::index::TagIndex::remove_file).

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::markup::MarkupKind;

/// File change event for one indexable file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

/// Recursive watcher over a workspace root
pub struct WorkspaceWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<WatchEvent>,
    root: PathBuf,
    last_event: Option<Instant>,
}

impl WorkspaceWatcher {
    /// Create a new watcher for the given workspace root
    pub fn new(root: &Path) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                let map = |path: PathBuf| -> Option<WatchEvent> {
                    // Only indexable files are interesting
                    MarkupKind::from_path(&path)?;
                    match event.kind {
                        notify::EventKind::Create(_) => Some(WatchEvent::Created(path)),
                        notify::EventKind::Modify(_) => Some(WatchEvent::Modified(path)),
                        notify::EventKind::Remove(_) => Some(WatchEvent::Removed(path)),
                        _ => None,
                    }
                };
                for path in event.paths.clone() {
                    if let Some(ev) = map(path) {
                        let _ = tx.send(ev);
                    }
                }
            }
        })
        .context("Failed to create workspace watcher")?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch workspace: {}", root.display()))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            root: root.to_path_buf(),
            last_event: None,
        })
    }

    /// Drain all pending events, in arrival order
    pub fn drain(&mut self) -> Vec<WatchEvent> {
        let events: Vec<WatchEvent> = self.receiver.try_iter().collect();
        if !events.is_empty() {
            self.last_event = Some(Instant::now());
        }
        events
    }

    /// True once the debounce period has elapsed since the last drained
    /// event; callers typically re-index then
    pub fn settled(&mut self, debounce_ms: u64) -> bool {
        match self.last_event {
            Some(last) if last.elapsed() >= Duration::from_millis(debounce_ms) => {
                self.last_event = None;
                true
            }
            _ => false,
        }
    }

    /// Get the watched workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }
}
