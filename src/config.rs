//! Project configuration (`guidegen.toml`).
//!
//! Every path in the file is relative to the directory holding it.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = "guidegen.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(skip)]
    root: PathBuf,
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Document classes, iterated in key order.
    #[serde(default)]
    pub classes: BTreeMap<String, ClassConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Directory of existing documents to index.
    #[serde(default)]
    pub corpus: Option<PathBuf>,
    /// Explicit key → path entries.
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
}

/// One template, one platform data file, one output location.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassConfig {
    pub template: PathBuf,
    pub platforms: PathBuf,
    pub output_dir: PathBuf,
    pub url_prefix: String,
    /// Registry prefix for generated documents; defaults to the class key.
    #[serde(default)]
    pub key_prefix: Option<String>,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub format: Format,
    #[serde(default = "default_header")]
    pub header: bool,
}

fn default_extension() -> String {
    "md".to_string()
}

fn default_header() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Mdx,
    Json,
}

impl ClassConfig {
    pub fn key_prefix<'a>(&'a self, class_key: &'a str) -> &'a str {
        self.key_prefix.as_deref().unwrap_or(class_key)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::parse(path, root, &content)
    }

    /// Parse `content` as if read from `path`, with relative paths anchored at `root`.
    pub fn parse(path: &Path, root: PathBuf, content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content).map_err(|source| Error::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.root = root;

        for (key, class) in &config.classes {
            if class.extension.is_empty() || class.extension.starts_with('.') {
                return Err(Error::InvalidData {
                    path: path.to_path_buf(),
                    message: format!(
                        "class '{}': extension must be non-empty and without a leading dot",
                        key
                    ),
                });
            }
        }

        tracing::debug!(
            config = %path.display(),
            classes = config.classes.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    /// Anchor a configured path at the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    pub fn class(&self, key: &str) -> Result<&ClassConfig> {
        self.classes.get(key).ok_or_else(|| Error::NotFound {
            kind: "template class",
            key: key.to_string(),
        })
    }
}
