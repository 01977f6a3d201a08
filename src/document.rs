//! Expanded document: the fragment stream handed to a renderer.

use crate::model::{ComponentInvocation, StepBody};
use serde::Serialize;
use serde_json::{Map, Value};

/// One unit of evaluator output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fragment {
    Text { text: String },
    /// Opening tag of a component with children.
    Open {
        name: String,
        params: Map<String, Value>,
    },
    Close { name: String },
    /// Component without children.
    Component {
        name: String,
        params: Map<String, Value>,
    },
}

/// A fully expanded document for one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Template the document was expanded from.
    pub template: String,
    pub target: String,
    pub fragments: Vec<Fragment>,
}

impl Document {
    /// Text of all `Text` fragments, component markup left out.
    pub fn plain_text(&self) -> String {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Component invocations in document order, with or without children.
    pub fn invocations(&self) -> impl Iterator<Item = ComponentInvocation> + '_ {
        self.fragments.iter().filter_map(|f| match f {
            Fragment::Open { name, params } | Fragment::Component { name, params } => {
                Some(ComponentInvocation {
                    name: name.clone(),
                    params: params.clone(),
                })
            }
            _ => None,
        })
    }
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Fragment::Text { text: text.into() }
    }
}

impl From<StepBody> for Fragment {
    fn from(body: StepBody) -> Self {
        match body {
            StepBody::Prose(text) => Fragment::text(text.trim_end().to_string()),
            StepBody::Code(code) => Fragment::text(code.fenced()),
            StepBody::Component(invocation) => Fragment::Component {
                name: invocation.name,
                params: invocation.params,
            },
        }
    }
}
