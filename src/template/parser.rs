//! Build the syntax tree from lexer tokens.

use super::ast::{Branch, Expr, Node};
use super::expr::{self, Tok, TokenStream};
use super::lexer::{self, Token};
use crate::error::{Error, Location, Result};

#[derive(Debug)]
enum Directive {
    If(Expr),
    Elif(Expr),
    Else,
    EndIf,
    For { binding: String, iterable: Expr },
    EndFor,
    Component {
        name: String,
        params: Vec<(String, Expr)>,
        self_closing: bool,
    },
    EndComponent,
    Ref(Expr),
    RefLink(Expr, Expr),
    LinkDefs,
    Body(Expr),
}

impl Directive {
    fn keyword(&self) -> &'static str {
        match self {
            Directive::If(_) => "if",
            Directive::Elif(_) => "elif",
            Directive::Else => "else",
            Directive::EndIf => "endif",
            Directive::For { .. } => "for",
            Directive::EndFor => "endfor",
            Directive::Component { .. } => "component",
            Directive::EndComponent => "endcomponent",
            Directive::Ref(_) => "ref",
            Directive::RefLink(..) => "reflink",
            Directive::LinkDefs => "linkdefs",
            Directive::Body(_) => "body",
        }
    }
}

enum Item {
    Text(String),
    Output(Expr, Location),
    Directive(Directive, Location),
}

/// What stopped a block: end of input or a closing/continuation directive.
enum End {
    Eof,
    Tag(Directive, Location),
}

pub(crate) fn parse(template: &str, src: &str) -> Result<Vec<Node>> {
    let items = lexer::tokenize(template, src)?
        .into_iter()
        .map(to_item)
        .collect::<Result<Vec<_>>>()?;
    let mut iter = items.into_iter();

    match parse_block(&mut iter)? {
        (nodes, End::Eof) => Ok(nodes),
        (_, End::Tag(directive, location)) => Err(Error::malformed(
            format!("unexpected {{% {} %}}", directive.keyword()),
            &location,
        )),
    }
}

fn to_item(token: Token) -> Result<Item> {
    match token {
        Token::Text(text) => Ok(Item::Text(text)),
        Token::Output { source, location } => {
            let expr = parse_output(&source).map_err(|m| Error::malformed(m, &location))?;
            Ok(Item::Output(expr, location))
        }
        Token::Directive { source, location } => {
            let directive =
                parse_directive(&source).map_err(|m| Error::malformed(m, &location))?;
            Ok(Item::Directive(directive, location))
        }
    }
}

fn parse_output(source: &str) -> std::result::Result<Expr, String> {
    let mut stream = TokenStream::new(expr::tokenize(source)?);
    let expr = stream.parse_expr()?;
    stream.expect_end()?;
    Ok(expr)
}

fn parse_directive(source: &str) -> std::result::Result<Directive, String> {
    let mut s = TokenStream::new(expr::tokenize(source)?);
    let keyword = match s.next() {
        Some(Tok::Ident(word)) => word,
        Some(_) => return Err("directive must start with a keyword".to_string()),
        None => return Err("empty directive".to_string()),
    };

    let directive = match keyword.as_str() {
        "if" => Directive::If(s.parse_expr()?),
        "elif" => Directive::Elif(s.parse_expr()?),
        "else" => Directive::Else,
        "endif" => Directive::EndIf,
        "for" => {
            let binding = s.expect_ident("a loop variable")?;
            if binding == "loop" {
                return Err("'loop' is reserved for loop metadata".to_string());
            }
            s.expect_keyword("in")?;
            Directive::For {
                binding,
                iterable: s.parse_expr()?,
            }
        }
        "endfor" => Directive::EndFor,
        "component" => parse_component(&mut s)?,
        "endcomponent" => Directive::EndComponent,
        "ref" => Directive::Ref(s.parse_expr()?),
        "reflink" => {
            let label = s.parse_expr()?;
            let key = s.parse_expr()?;
            Directive::RefLink(label, key)
        }
        "linkdefs" => Directive::LinkDefs,
        "body" => Directive::Body(s.parse_expr()?),
        other => return Err(format!("unknown directive '{}'", other)),
    };
    s.expect_end()?;
    Ok(directive)
}

/// `component Name a=expr b=expr [/]`
fn parse_component(s: &mut TokenStream) -> std::result::Result<Directive, String> {
    let name = s.expect_ident("a component name")?;
    let mut params: Vec<(String, Expr)> = Vec::new();
    let mut self_closing = false;

    while let Some(tok) = s.peek() {
        if *tok == Tok::Slash {
            s.next();
            self_closing = true;
            break;
        }
        let param = s.expect_ident("a parameter name")?;
        match s.next() {
            Some(Tok::Assign) => {}
            _ => return Err(format!("expected '=' after parameter '{}'", param)),
        }
        if params.iter().any(|(existing, _)| *existing == param) {
            return Err(format!("parameter '{}' given twice", param));
        }
        let value = s.parse_expr()?;
        params.push((param, value));
    }

    Ok(Directive::Component {
        name,
        params,
        self_closing,
    })
}

fn parse_block(iter: &mut std::vec::IntoIter<Item>) -> Result<(Vec<Node>, End)> {
    let mut nodes = Vec::new();

    while let Some(item) = iter.next() {
        let (directive, location) = match item {
            Item::Text(text) => {
                nodes.push(Node::Text(text));
                continue;
            }
            Item::Output(expr, location) => {
                nodes.push(Node::Interpolate { expr, location });
                continue;
            }
            Item::Directive(directive, location) => (directive, location),
        };

        match directive {
            Directive::If(condition) => nodes.push(parse_if(iter, condition, location)?),
            Directive::For { binding, iterable } => {
                let (body, end) = parse_block(iter)?;
                match end {
                    End::Tag(Directive::EndFor, _) => nodes.push(Node::For {
                        binding,
                        iterable,
                        body,
                        location,
                    }),
                    other => return Err(unterminated("for", &location, other)),
                }
            }
            Directive::Component {
                name,
                params,
                self_closing: true,
            } => nodes.push(Node::Component {
                name,
                params,
                children: None,
                location,
            }),
            Directive::Component { name, params, .. } => {
                let (children, end) = parse_block(iter)?;
                match end {
                    End::Tag(Directive::EndComponent, _) => nodes.push(Node::Component {
                        name,
                        params,
                        children: Some(children),
                        location,
                    }),
                    other => return Err(unterminated("component", &location, other)),
                }
            }
            Directive::Ref(key) => nodes.push(Node::Ref { key, location }),
            Directive::RefLink(label, key) => nodes.push(Node::RefLink {
                label,
                key,
                location,
            }),
            Directive::LinkDefs => nodes.push(Node::LinkDefs),
            Directive::Body(step) => nodes.push(Node::Body { step, location }),
            terminator @ (Directive::Elif(_)
            | Directive::Else
            | Directive::EndIf
            | Directive::EndFor
            | Directive::EndComponent) => {
                return Ok((nodes, End::Tag(terminator, location)));
            }
        }
    }

    Ok((nodes, End::Eof))
}

fn parse_if(
    iter: &mut std::vec::IntoIter<Item>,
    condition: Expr,
    location: Location,
) -> Result<Node> {
    let opened = location.clone();
    let mut branches = Vec::new();
    let mut condition = condition;
    let mut branch_location = location;

    loop {
        let (body, end) = parse_block(iter)?;
        branches.push(Branch {
            condition,
            body,
            location: branch_location,
        });
        match end {
            End::Tag(Directive::Elif(next), at) => {
                condition = next;
                branch_location = at;
            }
            End::Tag(Directive::Else, _) => {
                let (otherwise, end) = parse_block(iter)?;
                return match end {
                    End::Tag(Directive::EndIf, _) => Ok(Node::If {
                        branches,
                        otherwise: Some(otherwise),
                    }),
                    other => Err(unterminated("if", &opened, other)),
                };
            }
            End::Tag(Directive::EndIf, _) => {
                return Ok(Node::If {
                    branches,
                    otherwise: None,
                })
            }
            other => return Err(unterminated("if", &opened, other)),
        }
    }
}

fn unterminated(what: &str, opened: &Location, end: End) -> Error {
    match end {
        End::Eof => Error::malformed(
            format!("unterminated {{% {} %}} (no matching end tag)", what),
            opened,
        ),
        End::Tag(directive, at) => Error::malformed(
            format!(
                "unexpected {{% {} %}} inside {{% {} %}} opened at line {}",
                directive.keyword(),
                what,
                opened.line
            ),
            &at,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn path(p: &str) -> Expr {
        Expr::Path(p.split('.').map(String::from).collect())
    }

    #[test]
    fn text_only() {
        assert_eq!(parse("t", "plain").unwrap(), vec![Node::Text("plain".into())]);
    }

    #[test]
    fn if_elif_else() {
        let src = "{% if a %}A{% elif b %}B{% else %}C{% endif %}";
        let nodes = parse("t", src).unwrap();
        let [Node::If { branches, otherwise }] = nodes.as_slice() else {
            panic!("expected a single if, got {:?}", nodes);
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].condition, path("a"));
        assert_eq!(branches[1].condition, path("b"));
        assert_eq!(branches[1].body, vec![Node::Text("B".into())]);
        assert_eq!(otherwise.as_deref(), Some(&[Node::Text("C".into())][..]));
    }

    #[test]
    fn nested_for_loops() {
        let src = "{% for m in target.methods %}{% for s in m.steps %}{{ s.heading }}{% endfor %}{% endfor %}";
        let nodes = parse("t", src).unwrap();
        let [Node::For { binding, body, .. }] = nodes.as_slice() else {
            panic!("expected a for loop");
        };
        assert_eq!(binding, "m");
        assert!(matches!(body.as_slice(), [Node::For { binding, .. }] if binding == "s"));
    }

    #[test]
    fn component_forms() {
        let src = "{% component DaemonDiagram platformName=null sourceName=target.vars.source /%}\
                   {% component Tabs block=true %}x{% endcomponent %}";
        let nodes = parse("t", src).unwrap();
        match &nodes[0] {
            Node::Component {
                name,
                params,
                children,
                ..
            } => {
                assert_eq!(name, "DaemonDiagram");
                assert!(children.is_none());
                assert_eq!(params[0], ("platformName".to_string(), Expr::Literal(Value::Null)));
                assert_eq!(params[1].1, path("target.vars.source"));
            }
            other => panic!("unexpected node {:?}", other),
        }
        assert!(matches!(
            &nodes[1],
            Node::Component { children: Some(c), .. } if c == &vec![Node::Text("x".into())]
        ));
    }

    #[test]
    fn reference_directives() {
        let src = "{% ref \"docs.a\" %}{% reflink \"the a\" \"docs.a\" %}{% linkdefs %}";
        let nodes = parse("t", src).unwrap();
        assert!(matches!(nodes[0], Node::Ref { .. }));
        assert!(matches!(nodes[1], Node::RefLink { .. }));
        assert_eq!(nodes[2], Node::LinkDefs);
    }

    #[test]
    fn unterminated_if() {
        let err = parse("t", "{% if a %}\nbody\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "t:1:1: malformed template: unterminated {% if %} (no matching end tag)"
        );
    }

    #[test]
    fn mismatched_end_tag() {
        let err = parse("t", "{% for m in ms %}\n{% endif %}\n").unwrap_err();
        assert!(
            err.to_string()
                .contains("t:2:1: malformed template: unexpected {% endif %} inside {% for %}"),
            "{err}"
        );
    }

    #[test]
    fn stray_end_tag() {
        let err = parse("t", "x {% endfor %}").unwrap_err();
        assert!(err.to_string().ends_with("unexpected {% endfor %}"), "{err}");
    }

    #[test]
    fn bad_directives() {
        let cases = [
            ("{% frobnicate %}", "unknown directive 'frobnicate'"),
            ("{% for in ms %}", "expected a loop variable"),
            ("{% for loop in ms %}", "'loop' is reserved"),
            ("{% component Tabs a %}", "expected '=' after parameter 'a'"),
            ("{% component Tabs a=1 a=2 /%}", "parameter 'a' given twice"),
            ("{% endif extra %}", "unexpected 'extra'"),
            ("{% %}", "empty directive"),
            ("{{ }}", "expected a value"),
        ];
        for (src, expected) in cases {
            let err = parse("t", src).unwrap_err().to_string();
            assert!(err.contains(expected), "{src}: {err}");
        }
    }
}
