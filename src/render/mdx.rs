//! MDX renderer: text passes through, components become JSX elements.
//!
//! String parameters are written as quoted attributes; everything else,
//! `null` included, as a JSON expression (`sink={null}`) so the presentation
//! layer receives the value unchanged.

use crate::document::{Document, Fragment};
use crate::error::Result;
use crate::render::Renderer;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static RE_FRONT_MATTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A---\r?\n.*?\r?\n---[ \t]*(?:\r?\n|\z)").unwrap());

pub struct MdxRenderer {
    /// Template path named in the autogenerated notice.
    header: Option<String>,
}

impl MdxRenderer {
    pub fn new(header: Option<String>) -> Self {
        Self { header }
    }
}

impl Renderer for MdxRenderer {
    fn render(&self, doc: &Document) -> Result<String> {
        let mut body = String::new();
        for fragment in &doc.fragments {
            match fragment {
                Fragment::Text { text } => body.push_str(text),
                Fragment::Open { name, params } => {
                    body.push('<');
                    body.push_str(name);
                    push_attributes(&mut body, params);
                    body.push('>');
                }
                Fragment::Close { name } => {
                    body.push_str("</");
                    body.push_str(name);
                    body.push('>');
                }
                Fragment::Component { name, params } => {
                    body.push('<');
                    body.push_str(name);
                    push_attributes(&mut body, params);
                    body.push_str(" />");
                }
            }
        }

        Ok(match &self.header {
            Some(template) => insert_header(&body, template),
            None => body,
        })
    }
}

fn push_attributes(out: &mut String, params: &Map<String, Value>) {
    for (name, value) in params {
        out.push(' ');
        out.push_str(name);
        out.push('=');
        match value {
            Value::String(s) if !s.contains('"') && !s.contains('\n') => {
                out.push('"');
                out.push_str(s);
                out.push('"');
            }
            other => {
                out.push('{');
                out.push_str(&other.to_string());
                out.push('}');
            }
        }
    }
}

fn notice(template: &str) -> String {
    format!(
        "<!--\n     THIS FILE IS AUTOGENERATED!\n\n     To make changes please edit the template located at:\n\n     {}\n-->\n",
        template
    )
}

/// Place the notice after leading front matter, or at the top.
fn insert_header(body: &str, template: &str) -> String {
    match RE_FRONT_MATTER.find(body) {
        Some(front) => {
            let (head, rest) = body.split_at(front.end());
            let mut out = head.to_string();
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
            out.push_str(&notice(template));
            out.push_str(rest);
            out
        }
        None => format!("{}\n{}", notice(template), body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fragments: Vec<Fragment>) -> Document {
        Document {
            template: "templates/os.mdx.tmpl".to_string(),
            target: "macos".to_string(),
            fragments,
        }
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn components_become_jsx() {
        let d = doc(vec![
            Fragment::Open {
                name: "Tabs".to_string(),
                params: params(json!({"default": "homebrew", "values": [{"label": "Homebrew"}]})),
            },
            Fragment::text("\n"),
            Fragment::Component {
                name: "DaemonDiagram".to_string(),
                params: params(json!({"platformName": null, "enabled": true, "count": 2})),
            },
            Fragment::text("\n"),
            Fragment::Close {
                name: "Tabs".to_string(),
            },
        ]);
        let out = MdxRenderer::new(None).render(&d).unwrap();
        assert_eq!(
            out,
            "<Tabs default=\"homebrew\" values={[{\"label\":\"Homebrew\"}]}>\n\
             <DaemonDiagram platformName={null} enabled={true} count={2} />\n\
             </Tabs>"
        );
    }

    #[test]
    fn quoted_strings_fall_back_to_expressions() {
        let d = doc(vec![Fragment::Component {
            name: "Code".to_string(),
            params: params(json!({"text": "say \"hi\""})),
        }]);
        assert_eq!(
            MdxRenderer::new(None).render(&d).unwrap(),
            "<Code text={\"say \\\"hi\\\"\"} />"
        );
    }

    #[test]
    fn header_goes_at_the_top_without_front_matter() {
        let d = doc(vec![Fragment::text("# macOS\n")]);
        let out = MdxRenderer::new(Some("templates/os.mdx.tmpl".to_string())).render(&d).unwrap();
        assert!(out.starts_with("<!--\n     THIS FILE IS AUTOGENERATED!"));
        assert!(out.contains("     templates/os.mdx.tmpl\n-->\n\n# macOS\n"));
    }

    #[test]
    fn header_follows_front_matter() {
        let d = doc(vec![Fragment::text("---\ntitle: macOS\n---\n\n# macOS\n")]);
        let out = MdxRenderer::new(Some("t.tmpl".to_string())).render(&d).unwrap();
        assert!(out.starts_with("---\ntitle: macOS\n---\n\n<!--\n"));
        assert!(out.ends_with("     t.tmpl\n-->\n\n# macOS\n"));
    }

    #[test]
    fn horizontal_rule_is_not_front_matter() {
        let d = doc(vec![Fragment::text("intro\n---\n")]);
        let out = MdxRenderer::new(Some("t.tmpl".to_string())).render(&d).unwrap();
        assert!(out.starts_with("<!--"));
    }
}
