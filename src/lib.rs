//! guidegen: render one shared template once per platform target.
//!
//! The pipeline, leaves first:
//!
//! - [`platform`] loads the per-target matrix ([`model`]).
//! - [`registry`] maps symbolic document keys to canonical paths.
//! - [`template`] parses the shared template and expands it against a
//!   target's [`context`], producing a [`document`] fragment stream.
//! - [`render`] serializes the fragments; [`emit`] drives all of it per
//!   document class from the project [`config`].

pub mod config;
pub mod context;
pub mod document;
pub mod emit;
pub mod error;
pub mod model;
pub mod platform;
pub mod registry;
pub mod render;
pub mod slug;
pub mod template;

pub use config::{Config, Format};
pub use emit::{ClassReport, Generator, Outcome, RenderedDoc, TargetFailure};
pub use error::{Error, Location, Result};
