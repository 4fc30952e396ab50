//! Tagmark Core - Heading structure model and workspace tag index
//!
//! This crate contains the core logic for tagmark, independent of any UI
//! concerns:
//! - Line-oriented heading parser for Markdown and Typst (fence-aware)
//! - Trailing-comment tag/remark codec
//! - Heading tree builder and subtree range resolution
//! - Workspace-wide tag index with breadcrumb lookup
//! - Document model with Rope-based text storage
//! - Configuration management

pub mod comment;
pub mod config;
pub mod doc;
pub mod index;
pub mod markup;
pub mod parse;
pub mod range;
pub mod tree;

#[cfg(feature = "watch")]
pub mod watcher;

// Re-export commonly used types
pub use config::Config;
pub use doc::Document;
pub use index::{TagDefinition, TagIndex, TaggedHeading};
pub use markup::{HeadingMatch, LineRange, MarkupKind};
pub use tree::HeadingNode;
