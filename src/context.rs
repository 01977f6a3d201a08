//! Rendering context for one target.
//!
//! The context is a plain JSON tree so templates address everything with
//! dotted paths:
//!
//! ```text
//! class.key, class.template
//! matrix.heading_depth, matrix.heading        ("###" for depth 3)
//! target.key, target.name, target.slug, target.url, target.output_path
//! target.vars.*                               free-form platform data
//! target.diagram.{platform_name,source_name,sink_name}   nullable
//! target.has_diagram, target.default_method
//! target.methods[].{key,label,group,doc,default,index,steps[]}
//! target.methods[].steps[].{heading,kind,body}
//! target.tabs[].{label,value,group}, target.groups[]
//! ```

use crate::model::{InstallMethod, Step, StepBody, Target};
use serde_json::{json, Value};

/// Where a target's document lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub slug: String,
    pub url: String,
    /// Output path relative to the project root, `/`-separated.
    pub output_path: String,
}

/// Document class metadata visible to the template.
#[derive(Debug, Clone, Copy)]
pub struct ClassInfo<'a> {
    pub key: &'a str,
    pub template: &'a str,
    pub heading_depth: u8,
}

pub fn build(class: ClassInfo<'_>, target: &Target, placement: &Placement) -> Value {
    let diagram = target.diagram.clone().unwrap_or_default();
    let methods: Vec<Value> = target
        .methods
        .iter()
        .enumerate()
        .map(|(index, method)| method_value(method, index))
        .collect();
    let tabs: Vec<Value> = target
        .methods
        .iter()
        .map(|m| json!({"label": m.display_label(), "value": m.key, "group": m.group}))
        .collect();

    let mut groups: Vec<&str> = Vec::new();
    for method in &target.methods {
        if !groups.contains(&method.group.as_str()) {
            groups.push(&method.group);
        }
    }

    json!({
        "class": {
            "key": class.key,
            "template": class.template,
        },
        "matrix": {
            "heading_depth": class.heading_depth,
            "heading": "#".repeat(class.heading_depth as usize),
        },
        "target": {
            "key": target.key,
            "name": target.display_name(),
            "slug": placement.slug,
            "url": placement.url,
            "output_path": placement.output_path,
            "vars": target.vars,
            "diagram": {
                "platform_name": diagram.platform_name,
                "source_name": diagram.source_name,
                "sink_name": diagram.sink_name,
            },
            "has_diagram": target.diagram.is_some(),
            "default_method": target.default_method().map(|m| m.key.as_str()),
            "methods": methods,
            "tabs": tabs,
            "groups": groups,
        },
    })
}

fn method_value(method: &InstallMethod, index: usize) -> Value {
    json!({
        "key": method.key,
        "label": method.display_label(),
        "group": method.group,
        "doc": method.doc,
        "default": index == 0,
        "index": index + 1,
        "steps": method.steps.iter().map(step_value).collect::<Vec<_>>(),
    })
}

fn step_value(step: &Step) -> Value {
    let body = match &step.body {
        StepBody::Prose(text) => json!({ "prose": text }),
        StepBody::Code(code) => json!({
            "code": { "language": code.language, "source": code.source }
        }),
        StepBody::Component(invocation) => json!({
            "component": { "name": invocation.name, "params": invocation.params }
        }),
    };
    json!({
        "heading": step.heading,
        "kind": step.body.kind(),
        "body": body,
    })
}
