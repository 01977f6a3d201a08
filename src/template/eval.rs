//! Single-pass, depth-first evaluator.
//!
//! Scopes are chained lexically: a loop pushes its binding and `loop`
//! metadata on top of the enclosing scope, never mutating it. Errors are
//! collected and evaluation carries on, so one run reports every problem in a
//! target; any error means the target produces no document.

use super::ast::{Expr, Node};
use crate::document::{Document, Fragment};
use crate::error::{Error, Location, Result};
use crate::model::StepBody;
use crate::registry::Registry;
use serde_json::{json, Map, Value};
use std::borrow::Cow;

enum Scope<'a> {
    Root(&'a Value),
    Local {
        name: &'a str,
        value: &'a Value,
        parent: &'a Scope<'a>,
    },
}

impl<'a> Scope<'a> {
    fn get(&self, name: &str) -> Option<&'a Value> {
        match *self {
            Scope::Root(root) => root.get(name),
            Scope::Local {
                name: bound,
                value,
                parent,
            } => {
                if bound == name {
                    Some(value)
                } else {
                    parent.get(name)
                }
            }
        }
    }

    fn lookup(&self, path: &[String]) -> Option<&'a Value> {
        let (head, rest) = path.split_first()?;
        let mut value = self.get(head)?;
        for segment in rest {
            value = match value {
                Value::Object(map) => map.get(segment.as_str())?,
                Value::Array(list) => list.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(value)
    }
}

enum Slot {
    Fragment(Fragment),
    /// Filled in once the whole template has been walked.
    LinkDefs,
}

struct Evaluator<'r> {
    registry: &'r Registry,
    out: Vec<Slot>,
    /// Reference links in first-use order.
    links: Vec<(String, String)>,
    errors: Vec<Error>,
}

pub(crate) fn evaluate(
    nodes: &[Node],
    template: &str,
    target: &str,
    context: &Value,
    registry: &Registry,
) -> std::result::Result<Document, Vec<Error>> {
    let mut evaluator = Evaluator {
        registry,
        out: Vec::new(),
        links: Vec::new(),
        errors: Vec::new(),
    };
    evaluator.walk(nodes, &Scope::Root(context));

    if !evaluator.errors.is_empty() {
        return Err(evaluator.errors);
    }

    let link_block = evaluator
        .links
        .iter()
        .map(|(key, path)| format!("[{}]: {}", key, path))
        .collect::<Vec<_>>()
        .join("\n");

    let mut fragments = Vec::new();
    for slot in evaluator.out {
        let fragment = match slot {
            Slot::Fragment(fragment) => fragment,
            Slot::LinkDefs => Fragment::text(link_block.clone()),
        };
        push_fragment(&mut fragments, fragment);
    }

    Ok(Document {
        template: template.to_string(),
        target: target.to_string(),
        fragments,
    })
}

/// Append, merging adjacent text.
fn push_fragment(fragments: &mut Vec<Fragment>, fragment: Fragment) {
    if let Fragment::Text { text } = &fragment {
        if text.is_empty() {
            return;
        }
        if let Some(Fragment::Text { text: last }) = fragments.last_mut() {
            last.push_str(text);
            return;
        }
    }
    fragments.push(fragment);
}

impl Evaluator<'_> {
    fn emit(&mut self, fragment: Fragment) {
        if let Fragment::Text { text } = &fragment {
            if text.is_empty() {
                return;
            }
            if let Some(Slot::Fragment(Fragment::Text { text: last })) = self.out.last_mut() {
                last.push_str(text);
                return;
            }
        }
        self.out.push(Slot::Fragment(fragment));
    }

    fn walk(&mut self, nodes: &[Node], scope: &Scope<'_>) {
        for node in nodes {
            if let Err(e) = self.node(node, scope) {
                self.errors.push(e);
            }
        }
    }

    fn node(&mut self, node: &Node, scope: &Scope<'_>) -> Result<()> {
        match node {
            Node::Text(text) => self.emit(Fragment::text(text.as_str())),
            Node::Interpolate { expr, location } => {
                let value = eval(expr, scope, location)?;
                let text = scalar(&value, expr, location)?;
                self.emit(Fragment::text(text));
            }
            Node::If {
                branches,
                otherwise,
            } => {
                for branch in branches {
                    let condition = eval(&branch.condition, scope, &branch.location)?;
                    if truthy(&condition) {
                        self.walk(&branch.body, scope);
                        return Ok(());
                    }
                }
                if let Some(otherwise) = otherwise {
                    self.walk(otherwise, scope);
                }
            }
            Node::For {
                binding,
                iterable,
                body,
                location,
            } => {
                let items = eval(iterable, scope, location)?;
                let Value::Array(list) = items.as_ref() else {
                    return Err(Error::mismatch(
                        format!("'{}' is not a list", iterable.describe()),
                        location,
                    ));
                };
                let len = list.len();
                for (index, item) in list.iter().enumerate() {
                    let meta = json!({
                        "index": index + 1,
                        "index0": index,
                        "first": index == 0,
                        "last": index + 1 == len,
                        "length": len,
                    });
                    let item_scope = Scope::Local {
                        name: binding,
                        value: item,
                        parent: scope,
                    };
                    let loop_scope = Scope::Local {
                        name: "loop",
                        value: &meta,
                        parent: &item_scope,
                    };
                    self.walk(body, &loop_scope);
                }
            }
            Node::Component {
                name,
                params,
                children,
                location,
            } => {
                let mut evaluated = Map::new();
                for (param, expr) in params {
                    let value = eval(expr, scope, location)?;
                    evaluated.insert(param.clone(), value.into_owned());
                }
                match children {
                    None => self.emit(Fragment::Component {
                        name: name.clone(),
                        params: evaluated,
                    }),
                    Some(children) => {
                        self.emit(Fragment::Open {
                            name: name.clone(),
                            params: evaluated,
                        });
                        self.walk(children, scope);
                        self.emit(Fragment::Close { name: name.clone() });
                    }
                }
            }
            Node::Ref { key, location } => {
                let (_, path) = self.reference(key, scope, location)?;
                self.emit(Fragment::text(path));
            }
            Node::RefLink {
                label,
                key,
                location,
            } => {
                let label_value = eval(label, scope, location)?;
                let label = scalar(&label_value, label, location)?;
                let (key, path) = self.reference(key, scope, location)?;
                self.emit(Fragment::text(format!("[{}][{}]", label, key)));
                if !self.links.iter().any(|(existing, _)| *existing == key) {
                    self.links.push((key, path));
                }
            }
            Node::LinkDefs => self.out.push(Slot::LinkDefs),
            Node::Body { step, location } => {
                let value = eval(step, scope, location)?;
                let body: StepBody = serde_json::from_value(value.into_owned()).map_err(|e| {
                    Error::mismatch(
                        format!("'{}' is not a step body: {}", step.describe(), e),
                        location,
                    )
                })?;
                self.emit(Fragment::from(body));
            }
        }
        Ok(())
    }

    /// Evaluate a key expression and resolve it against the registry.
    fn reference(
        &self,
        key: &Expr,
        scope: &Scope<'_>,
        location: &Location,
    ) -> Result<(String, String)> {
        let value = eval(key, scope, location)?;
        let Value::String(key) = value.as_ref() else {
            return Err(Error::mismatch(
                format!("reference key '{}' is not a string", key.describe()),
                location,
            ));
        };
        let path = self.registry.resolve(key, location)?;
        Ok((key.clone(), path.into_owned()))
    }
}

fn eval<'s>(expr: &Expr, scope: &Scope<'s>, location: &Location) -> Result<Cow<'s, Value>> {
    match expr {
        Expr::Literal(value) => Ok(Cow::Owned(value.clone())),
        Expr::Path(path) => scope
            .lookup(path)
            .map(Cow::Borrowed)
            .ok_or_else(|| Error::UndefinedContext {
                path: path.join("."),
                location: location.clone(),
            }),
        Expr::Not(inner) => {
            let value = eval(inner, scope, location)?;
            Ok(Cow::Owned(Value::Bool(!truthy(&value))))
        }
        Expr::And(left, right) => {
            let result = truthy(eval(left, scope, location)?.as_ref())
                && truthy(eval(right, scope, location)?.as_ref());
            Ok(Cow::Owned(Value::Bool(result)))
        }
        Expr::Or(left, right) => {
            let result = truthy(eval(left, scope, location)?.as_ref())
                || truthy(eval(right, scope, location)?.as_ref());
            Ok(Cow::Owned(Value::Bool(result)))
        }
        Expr::Eq(left, right) => {
            let equal = eval(left, scope, location)?.as_ref() == eval(right, scope, location)?.as_ref();
            Ok(Cow::Owned(Value::Bool(equal)))
        }
        Expr::Ne(left, right) => {
            let equal = eval(left, scope, location)?.as_ref() == eval(right, scope, location)?.as_ref();
            Ok(Cow::Owned(Value::Bool(!equal)))
        }
    }
}

/// `null`, `false`, `0`, `""`, `[]` and `{}` are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(list) => !list.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text for an interpolated value. Missing data never renders as blank.
fn scalar(value: &Value, expr: &Expr, location: &Location) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(Error::mismatch(
            format!("'{}' is null and cannot be rendered as text", expr.describe()),
            location,
        )),
        Value::Array(_) | Value::Object(_) => Err(Error::mismatch(
            format!("'{}' is not a scalar value", expr.describe()),
            location,
        )),
    }
}
