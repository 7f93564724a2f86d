//! Renderer providers and their per-node-type handlers.

use std::collections::HashSet;
use std::fmt;

use mdita_config::OptionSource;

use crate::ast::{NodeRef, NodeType};
use crate::context::NodeRendererContext;
use crate::error::RenderError;
use crate::writer::DitaWriter;

/// Signature of a node rendering function.
pub type RenderFn = dyn for<'a> Fn(NodeRef<'a>, &mut NodeRendererContext<'a>, &mut DitaWriter<'_>) -> Result<(), RenderError>;

/// Rendering logic for one node type.
pub struct NodeRenderingHandler {
    node_type: NodeType,
    render: Box<RenderFn>,
}

impl NodeRenderingHandler {
    pub fn new<F>(node_type: NodeType, render: F) -> Self
    where
        F: for<'a> Fn(
                NodeRef<'a>,
                &mut NodeRendererContext<'a>,
                &mut DitaWriter<'_>,
            ) -> Result<(), RenderError>
            + 'static,
    {
        Self {
            node_type,
            render: Box::new(render),
        }
    }

    #[must_use]
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub(crate) fn render<'a>(
        &self,
        node: NodeRef<'a>,
        ctx: &mut NodeRendererContext<'a>,
        out: &mut DitaWriter<'_>,
    ) -> Result<(), RenderError> {
        (self.render)(node, ctx, out)
    }
}

impl fmt::Debug for NodeRenderingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRenderingHandler")
            .field("node_type", &self.node_type)
            .finish_non_exhaustive()
    }
}

/// Identity of a provider, used in delegate declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderKind(&'static str);

impl ProviderKind {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Kind named after a Rust type.
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>())
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Pluggable source of node handlers.
///
/// A provider is shared read-only across render sessions; every session
/// calls [`create`](Self::create) to obtain fresh handlers for its options.
///
/// # Example
///
/// ```
/// use mdita_config::OptionSource;
/// use mdita_renderer::{
///     Attributes, NodeRendererFactory, NodeRenderingHandler, NodeType, ProviderKind,
/// };
///
/// struct NotesProvider;
///
/// impl NodeRendererFactory for NotesProvider {
///     fn kind(&self) -> ProviderKind {
///         ProviderKind::new("notes")
///     }
///
///     fn create(&self, _options: &dyn OptionSource) -> Vec<NodeRenderingHandler> {
///         vec![NodeRenderingHandler::new(NodeType::BlockQuote, |node, ctx, out| {
///             out.start_element("note", &Attributes::new())?;
///             ctx.render_children(node, out)?;
///             out.end_element()
///         })]
///     }
/// }
/// ```
pub trait NodeRendererFactory: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Handlers for the given option view.
    fn create(&self, options: &dyn OptionSource) -> Vec<NodeRenderingHandler>;

    /// Providers this one overrides.
    ///
    /// `None` means no dependency information; an empty set means the
    /// provider depends on nothing.
    fn delegates(&self) -> Option<HashSet<ProviderKind>> {
        None
    }
}
