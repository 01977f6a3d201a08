//! Error taxonomy for a generation run.
//!
//! Template errors carry the [`Location`] of the directive that raised them so
//! a failed target can be traced back to the line in the shared template.

use std::fmt;
use std::path::PathBuf;

/// Position of a directive inside a template (1-based line and column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub template: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.template, self.line, self.column)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A target or document class is not present in the loaded data.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// A symbolic document key has no registry entry.
    #[error("{location}: unresolved reference '{key}'")]
    UnresolvedReference { key: String, location: Location },

    /// A directive looked up a value that does not exist in scope.
    #[error("{location}: undefined value '{path}'")]
    UndefinedContext { path: String, location: Location },

    /// Directive syntax could not be parsed.
    #[error("{location}: malformed template: {message}")]
    MalformedTemplate { message: String, location: Location },

    /// A value exists but has the wrong shape for the directive using it.
    #[error("{location}: {message}")]
    TypeMismatch { message: String, location: Location },

    /// Platform data or configuration violates an invariant.
    #[error("invalid data in {}: {message}", path.display())]
    InvalidData { path: PathBuf, message: String },

    #[error("reference '{key}' registered twice: {first} and {second}")]
    DuplicateReference {
        key: String,
        first: String,
        second: String,
    },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("failed to serialize document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>, location: &Location) -> Self {
        Error::MalformedTemplate {
            message: message.into(),
            location: location.clone(),
        }
    }

    pub(crate) fn mismatch(message: impl Into<String>, location: &Location) -> Self {
        Error::TypeMismatch {
            message: message.into(),
            location: location.clone(),
        }
    }

    /// Template location the error points at, if it came from a directive.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Error::UnresolvedReference { location, .. }
            | Error::UndefinedContext { location, .. }
            | Error::MalformedTemplate { location, .. }
            | Error::TypeMismatch { location, .. } => Some(location),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location {
            template: "os.mdx.tmpl".to_string(),
            line: 12,
            column: 5,
        }
    }

    #[test]
    fn location_display() {
        assert_eq!(loc().to_string(), "os.mdx.tmpl:12:5");
    }

    #[test]
    fn unresolved_reference_names_key_and_location() {
        let err = Error::UnresolvedReference {
            key: "docs.sources.journald".to_string(),
            location: loc(),
        };
        assert_eq!(
            err.to_string(),
            "os.mdx.tmpl:12:5: unresolved reference 'docs.sources.journald'"
        );
        assert_eq!(err.location(), Some(&loc()));
    }

    #[test]
    fn not_found_has_no_location() {
        let err = Error::NotFound {
            kind: "target",
            key: "plan9".to_string(),
        };
        assert_eq!(err.to_string(), "target not found: plan9");
        assert!(err.location().is_none());
    }
}
