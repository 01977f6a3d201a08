//! Platform data access: load a matrix file, enforce its invariants, look
//! targets up by key.

use crate::error::{Error, Result};
use crate::model::{DiagramParams, InstallMethod, Matrix, Target};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PlatformData {
    path: PathBuf,
    matrix: Matrix,
}

impl PlatformData {
    /// Read and validate a YAML platform data file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(path, &content)
    }

    /// Parse platform data; `path` is only used for diagnostics.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let matrix: Matrix = serde_yaml::from_str(content).map_err(|e| Error::Yaml {
            path: path.to_path_buf(),
            source: e,
        })?;
        let data = Self {
            path: path.to_path_buf(),
            matrix,
        };
        data.validate()?;
        tracing::debug!(
            path = %path.display(),
            targets = data.matrix.targets.len(),
            "loaded platform data"
        );
        Ok(data)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn heading_depth(&self) -> u8 {
        self.matrix.heading_depth
    }

    /// All targets in declaration order.
    pub fn targets(&self) -> &[Target] {
        &self.matrix.targets
    }

    pub fn target(&self, key: &str) -> Result<&Target> {
        self.matrix
            .targets
            .iter()
            .find(|t| t.key == key)
            .ok_or_else(|| Error::NotFound {
                kind: "target",
                key: key.to_string(),
            })
    }

    pub fn methods(&self, key: &str) -> Result<&[InstallMethod]> {
        Ok(&self.target(key)?.methods)
    }

    /// Diagram parameters; a target without any reports all three as unset.
    pub fn diagram(&self, key: &str) -> Result<DiagramParams> {
        Ok(self.target(key)?.diagram.clone().unwrap_or_default())
    }

    fn validate(&self) -> Result<()> {
        if !(1..=6).contains(&self.matrix.heading_depth) {
            return Err(self.invalid(format!(
                "heading_depth must be between 1 and 6, got {}",
                self.matrix.heading_depth
            )));
        }

        let mut seen = HashSet::new();
        for target in &self.matrix.targets {
            if target.key.trim().is_empty() {
                return Err(self.invalid("target with empty key".to_string()));
            }
            if !seen.insert(target.key.as_str()) {
                return Err(self.invalid(format!("duplicate target key '{}'", target.key)));
            }
            if target.methods.is_empty() {
                return Err(self.invalid(format!(
                    "target '{}' declares no installation methods",
                    target.key
                )));
            }

            let mut methods = HashSet::new();
            for method in &target.methods {
                if !methods.insert(method.key.as_str()) {
                    return Err(self.invalid(format!(
                        "target '{}' declares method '{}' twice",
                        target.key, method.key
                    )));
                }
            }
        }
        Ok(())
    }

    fn invalid(&self, message: String) -> Error {
        Error::InvalidData {
            path: self.path.clone(),
            message,
        }
    }
}
