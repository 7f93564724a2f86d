//! Per-session map from node type to its handler chain.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use mdita_config::OptionSource;

use crate::ast::NodeType;
use crate::dependency::resolve_order;
use crate::error::RenderError;
use crate::handler::{NodeRendererFactory, NodeRenderingHandler, ProviderKind};

/// One handler in a node type's override chain.
///
/// `delegate` is the handler this one replaced; it only runs when this
/// handler asks for it through
/// [`NodeRendererContext::delegate_render`](crate::NodeRendererContext::delegate_render).
pub struct HandlerChainEntry {
    provider: ProviderKind,
    handler: NodeRenderingHandler,
    delegate: Option<Rc<HandlerChainEntry>>,
}

impl HandlerChainEntry {
    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    #[must_use]
    pub fn handler(&self) -> &NodeRenderingHandler {
        &self.handler
    }

    #[must_use]
    pub fn delegate(&self) -> Option<&Rc<HandlerChainEntry>> {
        self.delegate.as_ref()
    }

    /// Providers of this entry and every wrapped entry, outermost first.
    #[must_use]
    pub fn chain(&self) -> Vec<ProviderKind> {
        let mut kinds = vec![self.provider];
        let mut current = self.delegate.as_deref();
        while let Some(entry) = current {
            kinds.push(entry.provider);
            current = entry.delegate.as_deref();
        }
        kinds
    }
}

impl fmt::Debug for HandlerChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChainEntry")
            .field("node_type", &self.handler.node_type())
            .field("chain", &self.chain())
            .finish()
    }
}

/// Effective handler per node type for one render session.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    renderers: HashMap<NodeType, Rc<HandlerChainEntry>>,
}

impl HandlerRegistry {
    /// Instantiate every provider's handlers and chain them by node type.
    ///
    /// Providers are registered in dependency order, so a provider that
    /// declares another as delegate wraps that provider's handlers.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::ProviderCycle` when the delegate declarations
    /// cannot be ordered.
    pub fn build(
        factories: &[Arc<dyn NodeRendererFactory>],
        options: &dyn OptionSource,
    ) -> Result<Self, RenderError> {
        let mut registry = Self::default();
        for wrapper in resolve_order(factories)? {
            let provider = wrapper.kind();
            for handler in wrapper.factory().create(options) {
                registry.register(provider, handler);
            }
        }
        tracing::debug!(node_types = registry.renderers.len(), "Built handler registry");
        Ok(registry)
    }

    /// Put `handler` in front of the current chain for its node type.
    pub fn register(&mut self, provider: ProviderKind, handler: NodeRenderingHandler) {
        let node_type = handler.node_type();
        let delegate = self.renderers.remove(&node_type);
        tracing::debug!(
            provider = %provider,
            node_type = %node_type,
            wraps = ?delegate.as_ref().map(|entry| entry.provider.name()),
            "Registered node handler"
        );
        self.renderers.insert(
            node_type,
            Rc::new(HandlerChainEntry {
                provider,
                handler,
                delegate,
            }),
        );
    }

    /// Outermost chain entry for `node_type`.
    #[must_use]
    pub fn handler_for(&self, node_type: NodeType) -> Option<&Rc<HandlerChainEntry>> {
        self.renderers.get(&node_type)
    }

    /// Number of node types with at least one handler.
    #[must_use]
    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}
