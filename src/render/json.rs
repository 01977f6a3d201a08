//! JSON renderer: the fragment stream as data, for presentation layers that
//! render components themselves.

use crate::document::Document;
use crate::error::Result;
use crate::render::Renderer;

pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, doc: &Document) -> Result<String> {
        let mut out = serde_json::to_string_pretty(doc)?;
        out.push('\n');
        Ok(out)
    }
}
