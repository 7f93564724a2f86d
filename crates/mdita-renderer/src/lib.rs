//! Extensible markdown to DITA renderer.
//!
//! A [`DitaRenderer`] walks a parsed [`Document`] and streams markup events
//! to a [`MarkupSink`]. What each node type turns into is decided by
//! renderer providers ([`NodeRendererFactory`]):
//!
//! - every provider contributes one [`NodeRenderingHandler`] per node type it claims
//! - a provider that lists another as delegate is registered after it, so
//!   its handler wraps the delegate's and can fall back to it through
//!   [`NodeRendererContext::delegate_render`]
//! - the built-in [`CoreNodeRenderer`] maps every standard node type to the
//!   DITA topic vocabulary and is registered first
//!
//! Output goes through [`DitaWriter`], which tracks open elements so a
//! session always ends with balanced markup, even when a handler fails.
//!
//! # Example
//!
//! ```
//! use mdita_renderer::{DitaRenderer, Document};
//!
//! let doc = Document::parse("# Hello\n\nWorld.\n");
//! let xml = DitaRenderer::default().render_to_string(&doc)?;
//! assert!(xml.contains("<title>Hello</title>"));
//! assert!(xml.contains("<body><p>World.</p></body>"));
//! # Ok::<(), mdita_renderer::RenderError>(())
//! ```

mod ast;
mod context;
mod core;
pub mod dependency;
mod error;
mod handler;
mod id;
mod options;
mod registry;
mod renderer;
mod sink;
mod writer;

pub use ast::{Children, Descendants, Document, NodeId, NodeKind, NodeRef, NodeType};
pub use context::NodeRendererContext;
pub use core::CoreNodeRenderer;
pub use error::{RenderError, SinkError};
pub use handler::{NodeRendererFactory, NodeRenderingHandler, ProviderKind, RenderFn};
pub use id::{
    HeaderIdGenerator, HeaderIdGeneratorFactory, IdGenerator, IdGeneratorFactory, NullIdGenerator,
};
pub use options::DitaRendererOptions;
pub use registry::{HandlerChainEntry, HandlerRegistry};
pub use renderer::{
    ATTRIBUTE_PREFIX_DITAARCHVERSION, DITA_NAMESPACE, DitaRenderer, DitaRendererBuilder,
};
pub use sink::{Attributes, EventRecorder, MarkupEvent, MarkupSink, XmlSink};
pub use writer::DitaWriter;
