//! Template syntax tree.

use crate::error::Location;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    /// `{{ expr }}`
    Interpolate { expr: Expr, location: Location },
    /// `{% if %}` with any number of `{% elif %}` and an optional `{% else %}`.
    If {
        branches: Vec<Branch>,
        otherwise: Option<Vec<Node>>,
    },
    /// `{% for binding in iterable %}`
    For {
        binding: String,
        iterable: Expr,
        body: Vec<Node>,
        location: Location,
    },
    /// `{% component Name k=v /%}` or `{% component Name k=v %}…{% endcomponent %}`
    Component {
        name: String,
        params: Vec<(String, Expr)>,
        children: Option<Vec<Node>>,
        location: Location,
    },
    /// `{% ref key %}`: the resolved path, inline.
    Ref { key: Expr, location: Location },
    /// `{% reflink label key %}`: `[label][key]`, key recorded for the link block.
    RefLink {
        label: Expr,
        key: Expr,
        location: Location,
    },
    /// `{% linkdefs %}`: definitions for every recorded reference link.
    LinkDefs,
    /// `{% body step.body %}`: the content of a step.
    Body { step: Expr, location: Location },
}

/// One `if`/`elif` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Expr,
    pub body: Vec<Node>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Dotted lookup; numeric segments index into lists.
    Path(Vec<String>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Path rendered back in dotted form, for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Expr::Path(segments) => segments.join("."),
            Expr::Literal(value) => value.to_string(),
            Expr::Not(inner) => format!("not {}", inner.describe()),
            Expr::And(a, b) => format!("{} and {}", a.describe(), b.describe()),
            Expr::Or(a, b) => format!("{} or {}", a.describe(), b.describe()),
            Expr::Eq(a, b) => format!("{} == {}", a.describe(), b.describe()),
            Expr::Ne(a, b) => format!("{} != {}", a.describe(), b.describe()),
        }
    }
}
