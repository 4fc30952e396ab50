//! Configuration management for tagmark
//!
//! The config file doubles as the persistence store for tag definitions:
//! the index reads definitions from here at startup and newly registered
//! tags are written back via [`Config::save_to`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::index::TagDefinition;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub tags: TagsConfig,
    /// User-visible tag metadata. A definition can exist with zero
    /// occurrences in the index, and occurrences can reference tags with no
    /// definition (default styling applies).
    pub definitions: Vec<TagDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Honor .gitignore files while walking the workspace
    pub respect_gitignore: bool,
    /// Include hidden files and directories
    pub include_hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TagsConfig {
    /// Auto-registration never pins beyond this many pinned definitions
    pub max_pinned: usize,
    /// Tag force-added to remark-only headings so they stay discoverable;
    /// unset disables the coupling
    pub remark_marker: Option<String>,
    /// Register newly observed tags on document save
    pub auto_register: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            tags: TagsConfig::default(),
            definitions: Vec::new(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            include_hidden: false,
        }
    }
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            max_pinned: 5,
            remark_marker: Some("remark".to_string()),
            auto_register: true,
        }
    }
}

impl Config {
    /// Get the platform-specific config file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tagmark")
            .map(|proj_dirs| proj_dirs.config_dir().join("tagmark.toml"))
    }

    /// Load configuration from the default location, falling back to
    /// defaults if the file is missing
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from a specific path (for testing)
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the config (including tag definitions) to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }
}
