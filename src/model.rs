//! Platform data model: targets, their installation methods and steps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Heading depth used when a platform file does not set one.
pub const DEFAULT_HEADING_DEPTH: u8 = 3;

/// Everything loaded from one platform data file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Matrix {
    /// Markdown heading depth of every step heading in this matrix.
    #[serde(default = "default_heading_depth")]
    pub heading_depth: u8,
    pub targets: Vec<Target>,
}

fn default_heading_depth() -> u8 {
    DEFAULT_HEADING_DEPTH
}

/// One documented operating system or platform.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    pub key: String,
    /// Display name; falls back to the key.
    #[serde(default)]
    pub name: Option<String>,
    /// Free-form substitution data (package manager, default source/sink...).
    #[serde(default)]
    pub vars: BTreeMap<String, Value>,
    #[serde(default)]
    pub diagram: Option<DiagramParams>,
    /// Declaration order is tab order; the first method is the default tab.
    pub methods: Vec<InstallMethod>,
}

impl Target {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.key)
    }

    /// The method rendered as the selected tab.
    pub fn default_method(&self) -> Option<&InstallMethod> {
        self.methods.first()
    }

    pub fn method(&self, key: &str) -> Option<&InstallMethod> {
        self.methods.iter().find(|m| m.key == key)
    }
}

/// Daemon diagram customizations. `None` lets the presentation layer pick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiagramParams {
    #[serde(default)]
    pub platform_name: Option<String>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub sink_name: Option<String>,
}

/// One way to install and run the agent on a target (one tab).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InstallMethod {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Tab group, e.g. "Package managers" or "Platforms".
    pub group: String,
    /// Symbolic reference to the method's own documentation page.
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl InstallMethod {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }
}

/// One ordered instruction within a method.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Step {
    pub heading: String,
    #[serde(flatten)]
    pub body: StepBody,
}

/// Content of a step. Serialized externally tagged: `prose:`, `code:` or `component:`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepBody {
    Prose(String),
    Code(CodeBlock),
    Component(ComponentInvocation),
}

impl StepBody {
    pub fn kind(&self) -> &'static str {
        match self {
            StepBody::Prose(_) => "prose",
            StepBody::Code(_) => "code",
            StepBody::Component(_) => "component",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CodeBlock {
    #[serde(default)]
    pub language: Option<String>,
    pub source: String,
}

impl CodeBlock {
    /// Fenced markdown rendition, without a trailing newline.
    pub fn fenced(&self) -> String {
        format!(
            "```{}\n{}\n```",
            self.language.as_deref().unwrap_or(""),
            self.source.trim_end_matches('\n')
        )
    }
}

/// A named presentational unit plus its opaque parameters.
///
/// Parameter names are never validated here; `null` values are kept so the
/// presentation layer can substitute its own default.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentInvocation {
    pub name: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MACOS: &str = r#"
key: macos
name: macOS
vars:
  package_manager: homebrew
methods:
  - key: homebrew
    label: Homebrew
    group: Package managers
    steps:
      - heading: Install Vector
        component:
          name: InstallationCommand
          params: { manager: homebrew, sudo: false, theme: null }
      - heading: Configure Vector
        code:
          language: toml
          source: |
            [sources.in]
            type = "stdin"
      - heading: Start Vector
        prose: Run `brew services start vector`.
  - key: docker-cli
    label: Docker CLI
    group: Platforms
"#;

    #[test]
    fn target_from_yaml() {
        let target: Target = serde_yaml::from_str(MACOS).unwrap();
        assert_eq!(target.display_name(), "macOS");
        assert_eq!(target.default_method().unwrap().key, "homebrew");
        assert!(target.diagram.is_none());

        let steps = &target.methods[0].steps;
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].body.kind(), "component");
        assert_eq!(steps[1].body.kind(), "code");
        assert_eq!(steps[2].body.kind(), "prose");
    }

    #[test]
    fn component_params_keep_declaration_order_and_nulls() {
        let target: Target = serde_yaml::from_str(MACOS).unwrap();
        let StepBody::Component(ref invocation) = target.methods[0].steps[0].body else {
            panic!("expected component step");
        };
        let names: Vec<&str> = invocation.params.keys().map(String::as_str).collect();
        assert_eq!(names, ["manager", "sudo", "theme"]);
        assert_eq!(invocation.params["theme"], Value::Null);
    }

    #[test]
    fn code_block_fenced_trims_trailing_newline() {
        let code = CodeBlock {
            language: Some("toml".to_string()),
            source: "a = 1\n".to_string(),
        };
        assert_eq!(code.fenced(), "```toml\na = 1\n```");
    }

    #[test]
    fn method_label_falls_back_to_key() {
        let target: Target = serde_yaml::from_str(MACOS).unwrap();
        let method = target.method("docker-cli").unwrap();
        assert_eq!(method.display_label(), "Docker CLI");
        assert!(method.steps.is_empty());
        assert!(target.method("apt").is_none());
    }
}
