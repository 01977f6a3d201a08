//! Template parsing and evaluation.
//!
//! A template is parsed once per document class and then evaluated against
//! each target's context. Parsing errors are fatal for the class; evaluation
//! errors are collected per target.

mod ast;
mod eval;
mod expr;
mod lexer;
mod parser;

pub use ast::{Branch, Expr, Node};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::registry::Registry;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// A parsed template, shared read-only by every target of its class.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse `src`. `name` is used in diagnostics.
    pub fn parse(name: impl Into<String>, src: &str) -> Result<Self> {
        let name = name.into();
        let nodes = parser::parse(&name, src)?;
        Ok(Self { name, nodes })
    }

    pub fn load(path: &Path, name: impl Into<String>) -> Result<Self> {
        let src = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(name, &src)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expand the template for one target. Every error found is returned;
    /// a partial document never is.
    pub fn evaluate(
        &self,
        target: &str,
        context: &Value,
        registry: &Registry,
    ) -> std::result::Result<Document, Vec<Error>> {
        eval::evaluate(&self.nodes, &self.name, target, context, registry)
    }
}
