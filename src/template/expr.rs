//! Tokenizer and recursive-descent parser for directive arguments.
//!
//! Grammar:
//!
//! ```text
//! expr    := and ("or" and)*
//! and     := cmp ("and" cmp)*
//! cmp     := unary (("==" | "!=") unary)?
//! unary   := "not" unary | primary
//! primary := STRING | NUMBER | "true" | "false" | "null" | path | "(" expr ")"
//! path    := IDENT ("." (IDENT | INTEGER))*
//! ```

use super::ast::Expr;
use serde_json::{Number, Value};

const KEYWORDS: &[&str] = &["not", "and", "or", "in", "true", "false", "null"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Ident(String),
    Str(String),
    Num(Number),
    Dot,
    Assign,
    EqEq,
    NotEq,
    Slash,
    LParen,
    RParen,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Ident(s) => format!("'{}'", s),
            Tok::Str(s) => format!("string \"{}\"", s),
            Tok::Num(n) => format!("number {}", n),
            Tok::Dot => "'.'".to_string(),
            Tok::Assign => "'='".to_string(),
            Tok::EqEq => "'=='".to_string(),
            Tok::NotEq => "'!='".to_string(),
            Tok::Slash => "'/'".to_string(),
            Tok::LParen => "'('".to_string(),
            Tok::RParen => "')'".to_string(),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Split directive arguments into tokens.
pub(crate) fn tokenize(src: &str) -> Result<Vec<Tok>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '.' => {
                toks.push(Tok::Dot);
                i += 1;
            }
            '/' => {
                toks.push(Tok::Slash);
                i += 1;
            }
            '(' => {
                toks.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                toks.push(Tok::RParen);
                i += 1;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                toks.push(Tok::EqEq);
                i += 2;
            }
            '=' => {
                toks.push(Tok::Assign);
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                toks.push(Tok::NotEq);
                i += 2;
            }
            '"' | '\'' => {
                let (s, next) = read_string(&chars, i)?;
                toks.push(Tok::Str(s));
                i = next;
            }
            c if c.is_ascii_digit() || (c == '-' && matches!(chars.get(i + 1), Some(d) if d.is_ascii_digit())) => {
                let (n, next) = read_number(&chars, i)?;
                toks.push(Tok::Num(n));
                i = next;
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                toks.push(Tok::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(toks)
}

fn read_string(chars: &[char], start: usize) -> Result<(String, usize), String> {
    let quote = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let escaped = chars.get(i + 1).ok_or("unterminated string")?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => *other,
                });
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err("unterminated string".to_string())
}

fn read_number(chars: &[char], start: usize) -> Result<(Number, usize), String> {
    let mut i = start;
    if chars[i] == '-' {
        i += 1;
    }
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    let mut is_float = false;
    // A dot only continues the number when a digit follows: `methods.0.key`
    if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
        is_float = true;
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    let text: String = chars[start..i].iter().collect();
    let number = if is_float {
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
    } else {
        text.parse::<i64>().ok().map(Number::from)
    };
    number
        .map(|n| (n, i))
        .ok_or_else(|| format!("invalid number '{}'", text))
}

/// Cursor over directive tokens.
pub(crate) struct TokenStream {
    toks: Vec<Tok>,
    pos: usize,
}

impl TokenStream {
    pub(crate) fn new(toks: Vec<Tok>) -> Self {
        Self { toks, pos: 0 }
    }

    pub(crate) fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    pub(crate) fn next(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Tok::Ident(s)) if s == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_keyword(&mut self, keyword: &str) -> Result<(), String> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(format!("expected '{}', found {}", keyword, self.found()))
        }
    }

    /// A plain (non-keyword) identifier.
    pub(crate) fn expect_ident(&mut self, what: &str) -> Result<String, String> {
        match self.peek() {
            Some(Tok::Ident(s)) if !KEYWORDS.contains(&s.as_str()) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            _ => Err(format!("expected {}, found {}", what, self.found())),
        }
    }

    pub(crate) fn expect_end(&self) -> Result<(), String> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(format!("unexpected {}", tok.describe())),
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map(Tok::describe)
            .unwrap_or_else(|| "end of directive".to_string())
    }

    pub(crate) fn parse_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_cmp()?;
        while self.eat_keyword("and") {
            let right = self.parse_cmp()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_cmp(&mut self) -> Result<Expr, String> {
        let left = self.parse_unary()?;
        match self.peek() {
            Some(Tok::EqEq) => {
                self.pos += 1;
                let right = self.parse_unary()?;
                Ok(Expr::Eq(Box::new(left), Box::new(right)))
            }
            Some(Tok::NotEq) => {
                self.pos += 1;
                let right = self.parse_unary()?;
                Ok(Expr::Ne(Box::new(left), Box::new(right)))
            }
            _ => Ok(left),
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if self.eat_keyword("not") {
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Tok::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Tok::Num(n)) => Ok(Expr::Literal(Value::Number(n))),
            Some(Tok::LParen) => {
                let inner = self.parse_expr()?;
                match self.next() {
                    Some(Tok::RParen) => Ok(inner),
                    _ => Err("unclosed '('".to_string()),
                }
            }
            Some(Tok::Ident(word)) => match word.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                w if KEYWORDS.contains(&w) => Err(format!("unexpected keyword '{}'", w)),
                _ => self.parse_path(word),
            },
            Some(tok) => Err(format!("expected a value, found {}", tok.describe())),
            None => Err("expected a value, found end of directive".to_string()),
        }
    }

    fn parse_path(&mut self, head: String) -> Result<Expr, String> {
        let mut segments = vec![head];
        while matches!(self.peek(), Some(Tok::Dot)) {
            self.pos += 1;
            match self.next() {
                Some(Tok::Ident(s)) => segments.push(s),
                Some(Tok::Num(n)) if n.is_u64() => segments.push(n.to_string()),
                _ => return Err(format!("incomplete path '{}.'", segments.join("."))),
            }
        }
        Ok(Expr::Path(segments))
    }
}

/// Parse a complete expression; trailing tokens are an error.
#[cfg(test)]
pub(crate) fn parse(src: &str) -> Result<Expr, String> {
    let mut stream = TokenStream::new(tokenize(src)?);
    let expr = stream.parse_expr()?;
    stream.expect_end()?;
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> Expr {
        Expr::Path(p.split('.').map(String::from).collect())
    }

    #[test]
    fn tokenizes_component_arguments() {
        let toks = tokenize(r#"Tabs centered=true size=null /"#).unwrap();
        assert_eq!(
            toks,
            vec![
                Tok::Ident("Tabs".into()),
                Tok::Ident("centered".into()),
                Tok::Assign,
                Tok::Ident("true".into()),
                Tok::Ident("size".into()),
                Tok::Assign,
                Tok::Ident("null".into()),
                Tok::Slash,
            ]
        );
    }

    #[test]
    fn path_with_index() {
        assert_eq!(parse("target.methods.0.key").unwrap(), path("target.methods.0.key"));
    }

    #[test]
    fn hyphenated_segments() {
        assert_eq!(parse("vars.docker-cli").unwrap(), path("vars.docker-cli"));
    }

    #[test]
    fn literals() {
        assert_eq!(parse("\"a \\\"b\\\"\"").unwrap(), Expr::Literal(Value::String("a \"b\"".into())));
        assert_eq!(parse("'x'").unwrap(), Expr::Literal(Value::String("x".into())));
        assert_eq!(parse("3").unwrap(), Expr::Literal(Value::from(3)));
        assert_eq!(parse("-2").unwrap(), Expr::Literal(Value::from(-2)));
        assert_eq!(parse("null").unwrap(), Expr::Literal(Value::Null));
    }

    #[test]
    fn precedence() {
        let expr = parse("not a or b and c == \"x\"").unwrap();
        assert_eq!(
            expr,
            Expr::Or(
                Box::new(Expr::Not(Box::new(path("a")))),
                Box::new(Expr::And(
                    Box::new(path("b")),
                    Box::new(Expr::Eq(
                        Box::new(path("c")),
                        Box::new(Expr::Literal(Value::String("x".into())))
                    ))
                ))
            )
        );
    }

    #[test]
    fn parentheses_group() {
        let expr = parse("not (a or b)").unwrap();
        assert_eq!(
            expr,
            Expr::Not(Box::new(Expr::Or(Box::new(path("a")), Box::new(path("b")))))
        );
    }

    #[test]
    fn errors() {
        assert!(parse("").unwrap_err().contains("end of directive"));
        assert!(parse("a.").unwrap_err().contains("incomplete path"));
        assert!(parse("\"open").unwrap_err().contains("unterminated string"));
        assert!(parse("a b").unwrap_err().contains("unexpected 'b'"));
        assert!(parse("a ~ b").unwrap_err().contains("unexpected character"));
        assert!(parse("(a").unwrap_err().contains("unclosed"));
    }
}
