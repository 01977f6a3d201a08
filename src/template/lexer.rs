//! Split template source into literal text and directive tokens.
//!
//! `{{ … }}` is an interpolation, `{% … %}` a directive, `{# … #}` a comment.
//! A control directive (`if`/`elif`/`else`/`endif`/`for`/`endfor`) or a
//! comment that sits alone on its line removes that whole line, newline
//! included, so block structure leaves no blank lines behind.

use crate::error::{Error, Location, Result};
use regex::Regex;
use std::sync::LazyLock;

static RE_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[{%#]").unwrap());

const CONTROL_DIRECTIVES: &[&str] = &["if", "elif", "else", "endif", "for", "endfor"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Text(String),
    /// Inside of `{{ … }}`.
    Output { source: String, location: Location },
    /// Inside of `{% … %}`.
    Directive { source: String, location: Location },
}

/// Byte offset → line/column lookup.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(src: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(src.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn location(&self, src: &str, template: &str, offset: usize) -> Location {
        let line = match self.starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let column = src[self.starts[line]..offset].chars().count() + 1;
        Location {
            template: template.to_string(),
            line: line + 1,
            column,
        }
    }
}

pub(crate) fn tokenize(template: &str, src: &str) -> Result<Vec<Token>> {
    let lines = LineIndex::new(src);
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while let Some(open) = RE_OPEN.find_at(src, pos) {
        let start = open.start();
        text.push_str(&src[pos..start]);

        let location = lines.location(src, template, start);
        let kind = &src[start + 1..start + 2];
        let close = match kind {
            "{" => "}}",
            "%" => "%}",
            _ => "#}",
        };
        let inner_start = start + 2;
        let Some(len) = find_close(&src[inner_start..], close, kind != "#") else {
            return Err(Error::malformed(
                format!("unterminated '{}' (missing '{}')", &src[start..inner_start], close),
                &location,
            ));
        };
        let inner = &src[inner_start..inner_start + len];
        let mut end = inner_start + len + close.len();

        let control = match kind {
            "#" => true,
            "%" => is_control(inner),
            _ => false,
        };
        if control {
            if let Some((line_start, line_end)) = standalone_line(src, start, end) {
                // The partial line before the tag is whitespace and still buffered.
                text.truncate(text.len() - (start - line_start));
                end = line_end;
            }
        }
        if kind == "#" {
            pos = end;
            continue;
        }

        if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(&mut text)));
        }
        match kind {
            "{" => tokens.push(Token::Output {
                source: inner.trim().to_string(),
                location,
            }),
            _ => tokens.push(Token::Directive {
                source: inner.trim().to_string(),
                location,
            }),
        }
        pos = end;
    }

    text.push_str(&src[pos..]);
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    Ok(tokens)
}

/// Offset of `close` in `body`. With `quoted`, a delimiter inside a string
/// literal does not count; an unterminated literal falls back to the first
/// delimiter so the expression parser reports it.
fn find_close(body: &str, close: &str, quoted: bool) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'') if quoted => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] != quote {
                    j += if bytes[j] == b'\\' { 2 } else { 1 };
                }
                if j >= bytes.len() {
                    return body.find(close);
                }
                i = j + 1;
            }
            _ if bytes[i..].starts_with(close.as_bytes()) => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn is_control(inner: &str) -> bool {
    inner
        .split_whitespace()
        .next()
        .map(|word| CONTROL_DIRECTIVES.contains(&word))
        .unwrap_or(false)
}

/// If the tag spanning `start..end` is the only content on its line, return
/// the line start and the offset just past the line's newline.
fn standalone_line(src: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let line_start = src[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    if !src[line_start..start].chars().all(|c| c == ' ' || c == '\t') {
        return None;
    }
    let rest = &src[end..];
    let line_len = rest.find('\n').unwrap_or(rest.len());
    if !rest[..line_len].chars().all(|c| c == ' ' || c == '\t' || c == '\r') {
        return None;
    }
    let line_end = if line_len < rest.len() {
        end + line_len + 1
    } else {
        src.len()
    };
    Some((line_start, line_end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<String> {
        tokens
            .iter()
            .map(|t| match t {
                Token::Text(s) => format!("T:{}", s),
                Token::Output { source, .. } => format!("O:{}", source),
                Token::Directive { source, .. } => format!("D:{}", source),
            })
            .collect()
    }

    #[test]
    fn splits_text_and_tags() {
        let tokens = tokenize("t", "Install on {{ target.name }} {% ref \"docs.a\" %}!").unwrap();
        assert_eq!(
            texts(&tokens),
            [
                "T:Install on ",
                "O:target.name",
                "T: ",
                "D:ref \"docs.a\"",
                "T:!"
            ]
        );
    }

    #[test]
    fn standalone_control_lines_vanish() {
        let src = "a\n  {% if x %}\nb\n{% endif %}\nc\n";
        let tokens = tokenize("t", src).unwrap();
        assert_eq!(
            texts(&tokens),
            ["T:a\n", "D:if x", "T:b\n", "D:endif", "T:c\n"]
        );
    }

    #[test]
    fn inline_control_keeps_surroundings() {
        let src = "a {% if x %}b{% endif %}\n";
        let tokens = tokenize("t", src).unwrap();
        assert_eq!(
            texts(&tokens),
            ["T:a ", "D:if x", "T:b", "D:endif", "T:\n"]
        );
    }

    #[test]
    fn component_lines_are_kept() {
        let src = "{% component Steps %}\nbody\n{% endcomponent %}\n";
        let tokens = tokenize("t", src).unwrap();
        assert_eq!(
            texts(&tokens),
            ["D:component Steps", "T:\nbody\n", "D:endcomponent", "T:\n"]
        );
    }

    #[test]
    fn comments_are_dropped() {
        let src = "{# generated header #}\nbody {# inline #}end";
        let tokens = tokenize("t", src).unwrap();
        assert_eq!(texts(&tokens), ["T:body end"]);
    }

    #[test]
    fn last_line_without_newline() {
        let tokens = tokenize("t", "a\n{% endif %}").unwrap();
        assert_eq!(texts(&tokens), ["T:a\n", "D:endif"]);
    }

    #[test]
    fn locations_are_one_based() {
        let tokens = tokenize("os.tmpl", "line one\n  {{ x }}").unwrap();
        let Token::Output { location, .. } = &tokens[1] else {
            panic!("expected output token");
        };
        assert_eq!(location.to_string(), "os.tmpl:2:3");
    }

    #[test]
    fn unterminated_tag_is_malformed() {
        let err = tokenize("os.tmpl", "a\n{% if x\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "os.tmpl:2:1: malformed template: unterminated '{%' (missing '%}')"
        );
    }

    #[test]
    fn delimiters_inside_strings_do_not_close_the_tag() {
        let src = "{% reflink \"50%} off\" k %} {{ \"}}\" }}";
        let tokens = tokenize("t", src).unwrap();
        assert_eq!(
            texts(&tokens),
            ["D:reflink \"50%} off\" k", "T: ", "O:\"}}\""]
        );
    }

    #[test]
    fn unterminated_string_still_closes_the_tag() {
        let tokens = tokenize("t", "{{ \"oops }} after").unwrap();
        assert_eq!(texts(&tokens), ["O:\"oops", "T: after"]);
    }
}
