//! Tagmark - workspace tag index and heading outline for Markdown/Typst

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tagmark_core::range::subtree_range;
use tagmark_core::tree::{build_tree, flatten, HeadingNode};
use tagmark_core::{Config, Document, TagIndex};

/// Heading outline and workspace tag index for Markdown and Typst files
#[derive(Parser, Debug)]
#[command(name = "tagmark")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all tags known to the workspace index
    Tags {
        /// Workspace root to scan
        #[arg(value_name = "ROOT", default_value = ".")]
        root: PathBuf,
    },
    /// Print the heading tree of a single file
    Outline {
        /// Markdown or Typst file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List the headings carrying a tag, with their breadcrumbs
    Blocks {
        /// Workspace root to scan
        #[arg(value_name = "ROOT")]
        root: PathBuf,
        /// Tag name (without the # sigil)
        #[arg(value_name = "TAG")]
        tag: String,
    },
    /// Scan a workspace, then keep the index live as files change
    #[cfg(feature = "watch")]
    Watch {
        /// Workspace root to scan and watch
        #[arg(value_name = "ROOT", default_value = ".")]
        root: PathBuf,
    },
    /// Rewrite the tags (and optional remark) of the heading at a line
    Tag {
        /// Markdown or Typst file
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Zero-based line number of the heading
        #[arg(value_name = "LINE")]
        line: usize,
        /// Tag names (without the # sigil); empty clears the annotation
        #[arg(value_name = "TAGS")]
        tags: Vec<String>,
        /// Remark text to attach
        #[arg(long, value_name = "TEXT")]
        remark: Option<String>,
    },
    /// Print the block (heading plus nested content) starting at a line
    Export {
        /// Markdown or Typst file
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Zero-based line number of the heading
        #[arg(value_name = "LINE")]
        line: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = Config::load().context("Failed to load configuration")?;

    match args.command {
        Command::Tags { root } => {
            let mut index = TagIndex::new(config);
            let files = index
                .scan_workspace(&root)
                .with_context(|| format!("Failed to scan workspace: {}", root.display()))?;
            log::info!("indexed {files} files under {}", root.display());

            for tag in index.all_tags() {
                let count = index.blocks_by_tag(&tag).len();
                println!("#{tag} ({count})");
            }
        }
        Command::Outline { file } => {
            let doc = Document::load(&file)
                .with_context(|| format!("Failed to load document: {}", file.display()))?;
            let roots = build_tree(&doc.headings);
            print_outline(&roots, 0);
        }
        Command::Blocks { root, tag } => {
            let mut index = TagIndex::new(config);
            index
                .scan_workspace(&root)
                .with_context(|| format!("Failed to scan workspace: {}", root.display()))?;

            for block in index.blocks_by_tag(&tag) {
                println!(
                    "{}:{}: {}",
                    block.path.display(),
                    block.line + 1,
                    block.breadcrumb.join(" > ")
                );
            }
        }
        #[cfg(feature = "watch")]
        Command::Watch { root } => {
            use std::time::Duration;
            use tagmark_core::watcher::{WatchEvent, WorkspaceWatcher};
            use tagmark_core::MarkupKind;

            // Scan and watch the same absolute paths, so watch events purge
            // the entries the scan inserted
            let root = root
                .canonicalize()
                .with_context(|| format!("Failed to canonicalize path: {}", root.display()))?;

            let mut index = TagIndex::new(config);
            let files = index
                .scan_workspace(&root)
                .with_context(|| format!("Failed to scan workspace: {}", root.display()))?;
            println!("indexed {files} files, watching {}", root.display());

            let mut watcher = WorkspaceWatcher::new(&root)
                .with_context(|| format!("Failed to watch workspace: {}", root.display()))?;
            loop {
                std::thread::sleep(Duration::from_millis(200));
                let events = watcher.drain();
                for event in events {
                    match event {
                        WatchEvent::Created(path) | WatchEvent::Modified(path) => {
                            // Key the index by the event path, matching the
                            // paths the scan produced
                            let Some(kind) = MarkupKind::from_path(&path) else {
                                continue;
                            };
                            match std::fs::read_to_string(&path) {
                                Ok(text) => index.update_file(&path, &text, kind),
                                Err(err) => log::warn!("skipping {}: {err}", path.display()),
                            }
                        }
                        WatchEvent::Removed(path) => index.remove_file(&path),
                    }
                }
                if watcher.settled(500) {
                    println!("{} tags indexed", index.all_tags().len());
                }
            }
        }
        Command::Tag {
            file,
            line,
            tags,
            remark,
        } => {
            let mut doc = Document::load(&file)
                .with_context(|| format!("Failed to load document: {}", file.display()))?;
            let mut index = TagIndex::new(config);
            index.set_annotation(&mut doc, line, &tags, remark.as_deref())?;
            std::fs::write(&doc.path, doc.text())
                .with_context(|| format!("Failed to write document: {}", doc.path.display()))?;

            let registered = index.save_document(&doc)?;
            for tag in registered {
                log::info!("registered new tag #{tag}");
            }
        }
        Command::Export { file, line } => {
            let doc = Document::load(&file)
                .with_context(|| format!("Failed to load document: {}", file.display()))?;
            let roots = build_tree(&doc.headings);
            let flat = flatten(&roots);

            let Some(idx) = flat.iter().position(|n| n.range.start == line) else {
                bail!("no heading at line {line} in {}", file.display());
            };
            let range = subtree_range(doc.line_count(), &flat, idx);
            println!("{}", doc.slice_lines(range));
        }
    }

    Ok(())
}

fn print_outline(nodes: &[HeadingNode], depth: usize) {
    for node in nodes {
        println!("{}{}", "  ".repeat(depth), node.label);
        print_outline(&node.children, depth + 1);
    }
}
