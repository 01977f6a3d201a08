//! Reference resolver: maps symbolic document keys to canonical paths.
//!
//! The index is built once, before any target is rendered, and only read
//! afterwards. Keys may carry an anchor (`docs.strategies#daemon`); the anchor
//! is resolved against the base key and appended to its path.

use crate::error::{Error, Location, Result};
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Document extensions picked up by a corpus scan.
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "mdx"];

/// Stems that stand for their directory.
const INDEX_STEMS: &[&str] = &["index", "_index"];

#[derive(Debug, Default, Clone)]
pub struct Registry {
    entries: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    key: Option<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key`. Re-registering the same path is a no-op; a different
    /// path is a conflict.
    pub fn insert(&mut self, key: impl Into<String>, path: impl Into<String>) -> Result<()> {
        let key = key.into();
        let path = path.into();
        match self.entries.get(&key) {
            Some(existing) if *existing == path => Ok(()),
            Some(existing) => Err(Error::DuplicateReference {
                key,
                first: existing.clone(),
                second: path,
            }),
            None => {
                tracing::trace!(%key, %path, "registered reference");
                self.entries.insert(key, path);
                Ok(())
            }
        }
    }

    /// Register every markdown document under `corpus`. Returns how many
    /// documents were indexed.
    pub fn scan(&mut self, corpus: &Path) -> Result<usize> {
        let mut count = 0;
        let walker = WalkDir::new(corpus)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(corpus).to_path_buf();
                Error::io(path, e.into())
            })?;
            if !entry.file_type().is_file() || !is_document(entry.path()) {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(corpus) else {
                continue;
            };
            let content =
                fs::read_to_string(entry.path()).map_err(|e| Error::io(entry.path(), e))?;

            let key = match declared_key(&content) {
                Ok(Some(key)) => key,
                Ok(None) => derive_key(relative),
                Err(e) => {
                    tracing::warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "unreadable front matter, deriving key from path"
                    );
                    derive_key(relative)
                }
            };
            if key.is_empty() {
                tracing::debug!(path = %entry.path().display(), "document has no key, skipped");
                continue;
            }

            self.insert(key, canonical_path(relative))?;
            count += 1;
        }

        tracing::debug!(corpus = %corpus.display(), documents = count, "scanned corpus");
        Ok(count)
    }

    /// Path for `key`, if registered.
    pub fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        match key.split_once('#') {
            Some((base, anchor)) => self
                .entries
                .get(base)
                .map(|path| Cow::Owned(format!("{}#{}", path, anchor))),
            None => self.entries.get(key).map(|path| Cow::Borrowed(path.as_str())),
        }
    }

    /// Resolve `key` for the directive at `location`.
    pub fn resolve(&self, key: &str, location: &Location) -> Result<Cow<'_, str>> {
        self.get(key).ok_or_else(|| Error::UnresolvedReference {
            key: key.to_string(),
            location: location.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries sorted by key.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_unstable();
        entries
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Key declared in leading `---` front matter, if any.
fn declared_key(content: &str) -> std::result::Result<Option<String>, serde_yaml::Error> {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return Ok(None);
    };
    let Some(end) = rest.find("\n---") else {
        return Ok(None);
    };
    let front: FrontMatter = serde_yaml::from_str(&rest[..end])?;
    Ok(front.key)
}

/// Path components of a document with the extension removed and index
/// stems folded into their directory.
fn components(relative: &Path) -> Vec<String> {
    let mut parts: Vec<String> = relative
        .parent()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    if let Some(stem) = relative.file_stem().and_then(|s| s.to_str()) {
        if !INDEX_STEMS.contains(&stem) {
            parts.push(stem.to_string());
        }
    }
    parts
}

/// `docs/reference/sources/journald.md` → `docs.reference.sources.journald`
fn derive_key(relative: &Path) -> String {
    components(relative).join(".")
}

/// `docs/reference/sources/journald.md` → `/docs/reference/sources/journald/`
fn canonical_path(relative: &Path) -> String {
    let parts = components(relative);
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn location() -> Location {
        Location {
            template: "t".to_string(),
            line: 1,
            column: 1,
        }
    }

    #[test]
    fn key_and_path_from_relative_path() {
        let rel = Path::new("docs/reference/sources/journald.md");
        assert_eq!(derive_key(rel), "docs.reference.sources.journald");
        assert_eq!(canonical_path(rel), "/docs/reference/sources/journald/");
    }

    #[test]
    fn index_files_name_their_directory() {
        let rel = Path::new("docs/setup/_index.md");
        assert_eq!(derive_key(rel), "docs.setup");
        assert_eq!(canonical_path(rel), "/docs/setup/");
        assert_eq!(canonical_path(Path::new("index.mdx")), "/");
    }

    #[test]
    fn front_matter_key_wins() {
        let content = "---\ntitle: Journald\nkey: docs.sources.journald\n---\n\nbody\n";
        assert_eq!(
            declared_key(content).unwrap().as_deref(),
            Some("docs.sources.journald")
        );
        assert_eq!(declared_key("no front matter").unwrap(), None);
    }

    #[test]
    fn front_matter_with_crlf_line_endings() {
        let content = "---\r\ntitle: Strategies\r\nkey: docs.strategies\r\n---\r\n\r\nBody\r\n";
        assert_eq!(
            declared_key(content).unwrap().as_deref(),
            Some("docs.strategies")
        );
    }

    #[test]
    fn anchors_resolve_against_base_key() {
        let mut registry = Registry::new();
        registry
            .insert("docs.strategies", "/docs/setup/deployment/strategies/")
            .unwrap();
        assert_eq!(
            registry.get("docs.strategies#daemon").as_deref(),
            Some("/docs/setup/deployment/strategies/#daemon")
        );
        assert!(registry.get("docs.missing#x").is_none());
    }

    #[test]
    fn unresolved_key_reports_location() {
        let registry = Registry::new();
        let err = registry.resolve("docs.sources.journald", &location()).unwrap_err();
        assert!(matches!(
            err,
            Error::UnresolvedReference { ref key, .. } if key == "docs.sources.journald"
        ));
    }

    #[test]
    fn conflicting_insert_is_rejected() {
        let mut registry = Registry::new();
        registry.insert("docs.a", "/a/").unwrap();
        registry.insert("docs.a", "/a/").unwrap();
        let err = registry.insert("docs.a", "/b/").unwrap_err();
        assert!(matches!(err, Error::DuplicateReference { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn scan_indexes_markdown_documents() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs/sources")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(
            root.join("docs/sources/journald.md"),
            "---\nkey: docs.sources.journald\n---\n",
        )
        .unwrap();
        fs::write(root.join("docs/sources/file.mdx"), "# File\n").unwrap();
        fs::write(root.join("docs/sources/notes.txt"), "ignored").unwrap();
        fs::write(root.join(".git/HEAD.md"), "ignored").unwrap();

        let mut registry = Registry::new();
        assert_eq!(registry.scan(root).unwrap(), 2);
        assert_eq!(
            registry.entries(),
            vec![
                ("docs.sources.file", "/docs/sources/file/"),
                ("docs.sources.journald", "/docs/sources/journald/"),
            ]
        );
    }
}
