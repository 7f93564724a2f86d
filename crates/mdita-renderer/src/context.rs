//! Per-session rendering state handed to every handler.

use std::rc::Rc;

use mdita_config::ScopedDataSet;

use crate::ast::{Document, NodeRef, NodeType};
use crate::error::RenderError;
use crate::id::IdGenerator;
use crate::options::DitaRendererOptions;
use crate::registry::{HandlerChainEntry, HandlerRegistry};
use crate::writer::DitaWriter;

/// Rendering state of one session.
///
/// The current node, the current chain entry and the link-suppression
/// depth are saved before a node's handler runs and restored when it
/// returns, whether it succeeded or not. Children are only visited when
/// the handler asks for it through [`render_children`](Self::render_children)
/// or [`render`](Self::render).
pub struct NodeRendererContext<'a> {
    document: &'a Document,
    options: ScopedDataSet<'a>,
    dita_options: DitaRendererOptions,
    registry: &'a HandlerRegistry,
    id_generator: Box<dyn IdGenerator>,
    rendering_node: Option<NodeRef<'a>>,
    rendering_handler: Option<Rc<HandlerChainEntry>>,
    do_not_render_links_nesting: u32,
}

impl<'a> NodeRendererContext<'a> {
    pub(crate) fn new(
        document: &'a Document,
        options: ScopedDataSet<'a>,
        registry: &'a HandlerRegistry,
        id_generator: Box<dyn IdGenerator>,
    ) -> Self {
        let dita_options = DitaRendererOptions::from_options(&options);
        Self {
            document,
            options,
            do_not_render_links_nesting: dita_options.document_links_nesting(),
            dita_options,
            registry,
            id_generator,
            rendering_node: None,
            rendering_handler: None,
        }
    }

    /// Option view: document options over the renderer's options.
    #[must_use]
    pub fn options(&self) -> &ScopedDataSet<'a> {
        &self.options
    }

    #[must_use]
    pub fn dita_options(&self) -> &DitaRendererOptions {
        &self.dita_options
    }

    #[must_use]
    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// Node whose handler is running.
    #[must_use]
    pub fn current_node(&self) -> Option<NodeRef<'a>> {
        self.rendering_node
    }

    /// Chain entry whose handler is running.
    #[must_use]
    pub fn current_handler(&self) -> Option<&Rc<HandlerChainEntry>> {
        self.rendering_handler.as_ref()
    }

    /// Whether link markup is currently suppressed.
    #[must_use]
    pub fn is_do_not_render_links(&self) -> bool {
        self.do_not_render_links_nesting > 0
    }

    #[must_use]
    pub fn links_nesting(&self) -> u32 {
        self.do_not_render_links_nesting
    }

    /// Enter a region without link markup.
    pub fn do_not_render_links(&mut self) {
        self.do_not_render_links_nesting += 1;
    }

    /// Leave a region entered with [`do_not_render_links`](Self::do_not_render_links).
    pub fn do_render_links(&mut self) {
        if self.do_not_render_links_nesting == 0 {
            tracing::warn!("do_render_links called outside a no-links region");
            return;
        }
        self.do_not_render_links_nesting -= 1;
    }

    /// Identifier assigned to `node` by the pre-pass.
    #[must_use]
    pub fn node_id(&self, node: NodeRef<'_>) -> Option<&str> {
        self.id_generator.id(node.id())
    }

    /// Render `node` with the outermost handler for its type.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::NoHandlerForNodeType` when no provider claims
    /// the node type, or any error raised by the handler.
    pub fn render(&mut self, node: NodeRef<'a>, out: &mut DitaWriter<'_>) -> Result<(), RenderError> {
        let entry = self
            .registry
            .handler_for(node.node_type())
            .ok_or(RenderError::NoHandlerForNodeType(node.node_type()))?;
        self.invoke(node, Rc::clone(entry), out)
    }

    /// Render every child of `parent` in document order.
    ///
    /// # Errors
    ///
    /// Stops at the first child that fails.
    pub fn render_children(
        &mut self,
        parent: NodeRef<'a>,
        out: &mut DitaWriter<'_>,
    ) -> Result<(), RenderError> {
        for child in parent.children() {
            self.render(child, out)?;
        }
        Ok(())
    }

    /// Render the current node with the handler the current one wraps.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::NoHandlerForNodeType` when the current handler
    /// wraps nothing.
    pub fn delegate_render(&mut self, out: &mut DitaWriter<'_>) -> Result<(), RenderError> {
        let (Some(node), Some(entry)) = (self.rendering_node, self.rendering_handler.as_ref())
        else {
            tracing::warn!("delegate_render called outside a node handler");
            return Ok(());
        };
        let delegate = entry
            .delegate()
            .cloned()
            .ok_or(RenderError::NoHandlerForNodeType(node.node_type()))?;
        self.invoke(node, delegate, out)
    }

    /// Run the identifier pre-pass over the whole document.
    pub(crate) fn generate_ids(&mut self) {
        let document = self.document;
        self.id_generator.generate_ids(document);
    }

    fn invoke(
        &mut self,
        node: NodeRef<'a>,
        entry: Rc<HandlerChainEntry>,
        out: &mut DitaWriter<'_>,
    ) -> Result<(), RenderError> {
        tracing::trace!(
            node_type = %node.node_type(),
            provider = %entry.provider(),
            "Rendering node"
        );
        let saved_node = self.rendering_node.replace(node);
        let saved_handler = self.rendering_handler.replace(Rc::clone(&entry));
        let saved_nesting = self.do_not_render_links_nesting;
        if node.node_type() == NodeType::Document {
            self.do_not_render_links_nesting = self.dita_options.document_links_nesting();
        }

        let result = entry.handler().render(node, self, out);

        self.rendering_node = saved_node;
        self.rendering_handler = saved_handler;
        self.do_not_render_links_nesting = saved_nesting;
        result
    }
}
