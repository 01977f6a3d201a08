//! Renderers: turn an expanded [`Document`] into output text.

pub mod json;
pub mod mdx;

use crate::config::Format;
use crate::document::Document;
use crate::error::Result;

/// Serializes a document into one output format.
pub trait Renderer: Send + Sync {
    fn render(&self, doc: &Document) -> Result<String>;
}

/// Create a renderer for `format`. `header` names the template in the
/// autogenerated notice; `None` leaves the notice out.
pub fn create_renderer(format: Format, header: Option<String>) -> Box<dyn Renderer> {
    match format {
        Format::Mdx => Box::new(mdx::MdxRenderer::new(header)),
        Format::Json => Box::new(json::JsonRenderer),
    }
}
