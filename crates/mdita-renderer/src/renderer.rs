//! Render engine: session setup, identifier pre-pass and tree walk.

use std::fmt;
use std::sync::Arc;

use mdita_config::{DataSet, OptionSource, ScopedDataSet};

use crate::ast::{Document, NodeRef};
use crate::context::NodeRendererContext;
use crate::core::CoreNodeRenderer;
use crate::error::RenderError;
use crate::handler::NodeRendererFactory;
use crate::id::{HeaderIdGeneratorFactory, IdGenerator, IdGeneratorFactory, NullIdGenerator};
use crate::options::DitaRendererOptions;
use crate::registry::HandlerRegistry;
use crate::sink::{MarkupSink, XmlSink};
use crate::writer::DitaWriter;

/// DITA architecture namespace URI.
pub const DITA_NAMESPACE: &str = "http://dita.oasis-open.org/architecture/2005/";
/// Prefix bound to [`DITA_NAMESPACE`] for the whole output.
pub const ATTRIBUTE_PREFIX_DITAARCHVERSION: &str = "ditaarch";

/// Renders documents to markup events with a fixed set of providers.
///
/// The renderer is immutable and can be shared across threads; every call
/// to [`render`](Self::render) is an independent session with its own
/// handler registry, context and writer.
///
/// # Example
///
/// ```
/// use mdita_renderer::{DitaRenderer, Document, EventRecorder, MarkupEvent};
///
/// let renderer = DitaRenderer::builder().build();
/// let mut recorder = EventRecorder::new();
/// renderer.render(&Document::parse("hi"), &mut recorder)?;
/// assert!(recorder.events().contains(&MarkupEvent::text("hi")));
/// # Ok::<(), mdita_renderer::RenderError>(())
/// ```
pub struct DitaRenderer {
    options: DataSet,
    factories: Vec<Arc<dyn NodeRendererFactory>>,
    id_generator_factory: Option<Arc<dyn IdGeneratorFactory>>,
}

impl DitaRenderer {
    #[must_use]
    pub fn builder() -> DitaRendererBuilder {
        DitaRendererBuilder::default()
    }

    /// Renderer with the core provider and the given options.
    #[must_use]
    pub fn new(options: DataSet) -> Self {
        Self::builder().options(options).build()
    }

    #[must_use]
    pub fn options(&self) -> &DataSet {
        &self.options
    }

    /// Render a whole document.
    ///
    /// # Errors
    ///
    /// See [`render_node`](Self::render_node).
    pub fn render(&self, document: &Document, sink: &mut dyn MarkupSink) -> Result<(), RenderError> {
        self.render_node(document.root(), sink)
    }

    /// Render the subtree rooted at `node`.
    ///
    /// Identifiers are generated for the node's whole document before the
    /// first event reaches the sink. Elements still open when traversal
    /// ends, normally or not, are closed before returning.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::ProviderCycle` before any output when the
    /// providers cannot be ordered, `RenderError::NoHandlerForNodeType` when
    /// traversal reaches an unclaimed node type and
    /// `RenderError::WriteFailure` when the sink rejects an event.
    pub fn render_node(&self, node: NodeRef<'_>, sink: &mut dyn MarkupSink) -> Result<(), RenderError> {
        let document = node.document();
        let options = ScopedDataSet::new(&self.options, document.options());
        let registry = HandlerRegistry::build(&self.factories, &options)?;
        let id_generator = self.id_generator(&options);
        let mut ctx = NodeRendererContext::new(document, options, &registry, id_generator);
        let mut out = DitaWriter::new(sink);

        tracing::debug!(
            nodes = document.len(),
            providers = self.factories.len(),
            "Starting render session"
        );
        let result = Self::run_session(node, &mut ctx, &mut out);
        if let Err(e) = &result {
            tracing::error!(error = %e, "Render session aborted");
            if let Err(close_error) = out.close() {
                tracing::debug!(error = %close_error, "Closing elements after abort failed");
            }
        }
        result
    }

    /// Render a document to an XML string, indented by `INDENT_SIZE`.
    ///
    /// # Errors
    ///
    /// See [`render_node`](Self::render_node).
    pub fn render_to_string(&self, document: &Document) -> Result<String, RenderError> {
        let options = ScopedDataSet::new(&self.options, document.options());
        let indent = DitaRendererOptions::from_options(&options).indent_size;
        let mut sink = XmlSink::with_indent(Vec::new(), indent);
        self.render(document, &mut sink)?;
        Ok(String::from_utf8_lossy(&sink.into_inner()).into_owned())
    }

    fn id_generator(&self, options: &dyn OptionSource) -> Box<dyn IdGenerator> {
        match &self.id_generator_factory {
            Some(factory) => factory.create(options),
            None if DitaRendererOptions::from_options(options).header_ids_enabled() => {
                HeaderIdGeneratorFactory.create(options)
            }
            None => Box::new(NullIdGenerator),
        }
    }

    fn run_session<'a>(
        node: NodeRef<'a>,
        ctx: &mut NodeRendererContext<'a>,
        out: &mut DitaWriter<'_>,
    ) -> Result<(), RenderError> {
        ctx.generate_ids();
        out.start_document()?;
        out.start_prefix_mapping(ATTRIBUTE_PREFIX_DITAARCHVERSION, DITA_NAMESPACE)?;
        ctx.render(node, out)?;
        out.close()?;
        out.end_prefix_mapping(ATTRIBUTE_PREFIX_DITAARCHVERSION)?;
        out.end_document()
    }
}

impl Default for DitaRenderer {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for DitaRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DitaRenderer")
            .field("options", &self.options)
            .field(
                "providers",
                &self.factories.iter().map(|f| f.kind()).collect::<Vec<_>>(),
            )
            .field("custom_id_generator", &self.id_generator_factory.is_some())
            .finish()
    }
}

/// Builder for [`DitaRenderer`].
#[derive(Default)]
pub struct DitaRendererBuilder {
    options: DataSet,
    providers: Vec<Arc<dyn NodeRendererFactory>>,
    id_generator_factory: Option<Arc<dyn IdGeneratorFactory>>,
    without_core: bool,
}

impl DitaRendererBuilder {
    /// Session-level options; documents may narrow them with their own.
    #[must_use]
    pub fn options(mut self, options: DataSet) -> Self {
        self.options = options;
        self
    }

    /// Add a provider after the ones already added.
    #[must_use]
    pub fn provider(mut self, provider: impl NodeRendererFactory + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Add a provider that is shared with other renderers.
    #[must_use]
    pub fn shared_provider(mut self, provider: Arc<dyn NodeRendererFactory>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Replace the built-in identifier generator selection.
    #[must_use]
    pub fn id_generator_factory(mut self, factory: impl IdGeneratorFactory + 'static) -> Self {
        self.id_generator_factory = Some(Arc::new(factory));
        self
    }

    /// Leave out [`CoreNodeRenderer`]; the added providers must then
    /// handle every node type they will meet.
    #[must_use]
    pub fn without_core_renderer(mut self) -> Self {
        self.without_core = true;
        self
    }

    #[must_use]
    pub fn build(self) -> DitaRenderer {
        let mut factories: Vec<Arc<dyn NodeRendererFactory>> = Vec::new();
        if !self.without_core {
            factories.push(Arc::new(CoreNodeRenderer));
        }
        factories.extend(self.providers);
        DitaRenderer {
            options: self.options,
            factories,
            id_generator_factory: self.id_generator_factory,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use mdita_config::keys;

    use super::*;
    use crate::ast::{NodeId, NodeKind, NodeType};
    use crate::error::SinkError;
    use crate::handler::NodeRenderingHandler;
    use crate::handler::tests::FnProvider;
    use crate::sink::{Attributes, EventRecorder, MarkupEvent};
    use crate::writer::tests::{FailingSink, assert_balanced};

    fn minimal_handlers() -> Vec<NodeRenderingHandler> {
        vec![
            NodeRenderingHandler::new(NodeType::Document, |node, ctx, out| {
                out.start_element("topic", &Attributes::new())?;
                ctx.render_children(node, out)?;
                out.end_element()
            }),
            NodeRenderingHandler::new(NodeType::Paragraph, |node, ctx, out| {
                out.start_element("p", &Attributes::new())?;
                ctx.render_children(node, out)?;
                out.end_element()
            }),
            NodeRenderingHandler::new(NodeType::Text, |node, _, out| match node.kind() {
                NodeKind::Text(text) => out.characters(text),
                _ => Ok(()),
            }),
        ]
    }

    fn para_handlers() -> Vec<NodeRenderingHandler> {
        vec![NodeRenderingHandler::new(NodeType::Paragraph, |node, ctx, out| {
            out.start_element("para", &Attributes::new())?;
            ctx.render_children(node, out)?;
            out.end_element()
        })]
    }

    fn record(renderer: &DitaRenderer, document: &Document) -> (Result<(), RenderError>, Vec<MarkupEvent>) {
        let mut recorder = EventRecorder::new();
        let result = renderer.render(document, &mut recorder);
        (result, recorder.into_events())
    }

    fn content(events: &[MarkupEvent]) -> Vec<MarkupEvent> {
        events
            .iter()
            .filter(|event| {
                !matches!(
                    event,
                    MarkupEvent::StartDocument
                        | MarkupEvent::EndDocument
                        | MarkupEvent::StartPrefixMapping { .. }
                        | MarkupEvent::EndPrefixMapping { .. }
                )
            })
            .cloned()
            .collect()
    }

    #[test]
    fn test_paragraph_scenario() {
        let renderer = DitaRenderer::builder()
            .without_core_renderer()
            .provider(FnProvider::new("minimal", minimal_handlers))
            .build();
        let (result, events) = record(&renderer, &Document::parse("hi"));
        result.unwrap();

        assert_eq!(
            events,
            vec![
                MarkupEvent::StartDocument,
                MarkupEvent::StartPrefixMapping {
                    prefix: ATTRIBUTE_PREFIX_DITAARCHVERSION.to_owned(),
                    uri: DITA_NAMESPACE.to_owned(),
                },
                MarkupEvent::start("topic"),
                MarkupEvent::start("p"),
                MarkupEvent::text("hi"),
                MarkupEvent::end("p"),
                MarkupEvent::end("topic"),
                MarkupEvent::EndPrefixMapping {
                    prefix: ATTRIBUTE_PREFIX_DITAARCHVERSION.to_owned(),
                },
                MarkupEvent::EndDocument,
            ]
        );
    }

    #[test]
    fn test_delegating_provider_replaces_paragraph_handler() {
        let renderer = DitaRenderer::builder()
            .without_core_renderer()
            .provider(FnProvider::new("b", para_handlers).overriding(&["a"]))
            .provider(FnProvider::new("a", minimal_handlers))
            .build();
        let (result, events) = record(&renderer, &Document::parse("hi"));
        result.unwrap();

        assert_eq!(
            content(&events),
            vec![
                MarkupEvent::start("topic"),
                MarkupEvent::start("para"),
                MarkupEvent::text("hi"),
                MarkupEvent::end("para"),
                MarkupEvent::end("topic"),
            ]
        );
    }

    #[test]
    fn test_provider_overrides_core() {
        let renderer = DitaRenderer::builder()
            .provider(FnProvider::new("custom", para_handlers).overriding(&["core"]))
            .build();
        let xml = renderer.render_to_string(&Document::parse("hi")).unwrap();
        assert!(xml.contains("<body><para>hi</para></body>"));
        assert!(!xml.contains("<p>"));
    }

    #[test]
    fn test_unknown_node_type_aborts_balanced() {
        let mut doc = Document::parse("# T\n\n## S\n\nhi\n");
        let root = doc.root_id();
        doc.append_child(
            root,
            NodeKind::Custom {
                name: "callout",
                literal: String::new(),
            },
        );
        let (result, events) = record(&DitaRenderer::default(), &doc);

        assert!(matches!(
            result,
            Err(RenderError::NoHandlerForNodeType(NodeType::Custom("callout")))
        ));
        assert_balanced(&events);
        assert_eq!(events.last(), Some(&MarkupEvent::end("topic")));
        assert!(!events.contains(&MarkupEvent::EndDocument));
    }

    #[test]
    fn test_without_any_provider() {
        let renderer = DitaRenderer::builder().without_core_renderer().build();
        let (result, _) = record(&renderer, &Document::parse("hi"));
        assert!(matches!(
            result,
            Err(RenderError::NoHandlerForNodeType(NodeType::Document))
        ));
    }

    struct CountingGenerator {
        visited: Arc<AtomicUsize>,
    }

    impl IdGenerator for CountingGenerator {
        fn generate_ids(&mut self, document: &Document) {
            self.visited
                .store(document.descendants().count(), Ordering::SeqCst);
        }

        fn id(&self, _node: NodeId) -> Option<&str> {
            None
        }
    }

    struct CountingFactory {
        visited: Arc<AtomicUsize>,
    }

    impl IdGeneratorFactory for CountingFactory {
        fn create(&self, _options: &dyn OptionSource) -> Box<dyn IdGenerator> {
            Box::new(CountingGenerator {
                visited: Arc::clone(&self.visited),
            })
        }
    }

    /// Remembers the pre-pass count observed at the first event.
    struct ProbeSink {
        visited: Arc<AtomicUsize>,
        seen_at_first_event: Option<usize>,
        inner: EventRecorder,
    }

    impl ProbeSink {
        fn observe(&mut self) {
            self.seen_at_first_event
                .get_or_insert_with(|| self.visited.load(Ordering::SeqCst));
        }
    }

    impl MarkupSink for ProbeSink {
        fn start_document(&mut self) -> Result<(), SinkError> {
            self.observe();
            self.inner.start_document()
        }

        fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<(), SinkError> {
            self.observe();
            self.inner.start_element(name, attributes)
        }

        fn end_element(&mut self, name: &str) -> Result<(), SinkError> {
            self.inner.end_element(name)
        }

        fn characters(&mut self, text: &str) -> Result<(), SinkError> {
            self.inner.characters(text)
        }

        fn processing_instruction(&mut self, target: &str, data: &str) -> Result<(), SinkError> {
            self.inner.processing_instruction(target, data)
        }
    }

    #[test]
    fn test_pre_pass_completes_before_output() {
        let visited = Arc::new(AtomicUsize::new(0));
        let renderer = DitaRenderer::builder()
            .id_generator_factory(CountingFactory {
                visited: Arc::clone(&visited),
            })
            .build();
        let doc = Document::parse("# T\n\n- a\n- b *c*\n");
        let mut sink = ProbeSink {
            visited: Arc::clone(&visited),
            seen_at_first_event: None,
            inner: EventRecorder::new(),
        };
        renderer.render(&doc, &mut sink).unwrap();
        assert_eq!(sink.seen_at_first_event, Some(doc.len()));
    }

    #[test]
    fn test_disabled_header_ids_use_null_generator() {
        let options = DataSet::builder()
            .set(&keys::GENERATE_HEADER_ID, false)
            .build();
        let xml = DitaRenderer::new(options)
            .render_to_string(&Document::parse("# Title\n\n## Part\n"))
            .unwrap();
        assert!(xml.contains(r#"id="topic""#));
        assert!(xml.contains("<section><title>Part</title></section>"));
    }

    #[test]
    fn test_link_suppression_does_not_leak_to_siblings() {
        let renderer = DitaRenderer::builder()
            .provider(
                FnProvider::new("nolinks", || {
                    vec![NodeRenderingHandler::new(NodeType::Emphasis, |node, ctx, out| {
                        out.start_element("i", &Attributes::new())?;
                        ctx.do_not_render_links();
                        ctx.render_children(node, out)?;
                        out.end_element()
                    })]
                })
                .overriding(&["core"]),
            )
            .build();
        let xml = renderer
            .render_to_string(&Document::parse("*[a](a.md)* [b](b.md)\n"))
            .unwrap();
        assert!(xml.contains(r#"<p><i>a</i> <xref href="b.md">b</xref></p>"#));
    }

    #[test]
    fn test_write_failure_is_returned() {
        let doc = Document::parse("# T\n\nhi\n");
        let mut sink = FailingSink::after(4);
        let result = DitaRenderer::default().render(&doc, &mut sink);
        assert!(matches!(
            result,
            Err(RenderError::WriteFailure(SinkError::Rejected(_)))
        ));
        assert_eq!(sink.inner.events().len(), 4);
    }

    #[test]
    fn test_provider_cycle_emits_nothing() {
        let renderer = DitaRenderer::builder()
            .provider(FnProvider::new("a", para_handlers).overriding(&["b"]))
            .provider(FnProvider::new("b", para_handlers).overriding(&["a"]))
            .build();
        let (result, events) = record(&renderer, &Document::parse("hi"));
        assert!(matches!(result, Err(RenderError::ProviderCycle(_))));
        assert!(events.is_empty());
    }

    #[test]
    fn test_render_node_subtree() {
        let doc = Document::parse("# T\n\nhi\n");
        let paragraph = doc.root().children().nth(1).unwrap();
        let mut recorder = EventRecorder::new();
        DitaRenderer::default()
            .render_node(paragraph, &mut recorder)
            .unwrap();
        assert_eq!(
            recorder.content_events().cloned().collect::<Vec<_>>(),
            vec![
                MarkupEvent::start("p"),
                MarkupEvent::text("hi"),
                MarkupEvent::end("p"),
            ]
        );
    }

    #[test]
    fn test_document_options_narrow_renderer_options() {
        let renderer = DitaRenderer::new(
            DataSet::builder()
                .set(&keys::DO_NOT_RENDER_LINKS, true)
                .build(),
        );
        let doc = Document::parse("[x](a.md)\n").with_options(
            DataSet::builder()
                .set(&keys::DO_NOT_RENDER_LINKS, false)
                .build(),
        );
        let xml = renderer.render_to_string(&doc).unwrap();
        assert!(xml.contains(r#"<xref href="a.md">x</xref>"#));
        assert!(
            keys::DO_NOT_RENDER_LINKS.get(renderer.options()),
            "renderer options stay untouched"
        );
    }

    #[test]
    fn test_indented_output() {
        let renderer = DitaRenderer::new(DataSet::builder().set(&keys::INDENT_SIZE, 2).build());
        let xml = renderer
            .render_to_string(&Document::parse("# T\n\nhi\n"))
            .unwrap();
        assert!(xml.contains("\n  <title>T</title>"));
        assert!(xml.contains("\n  <body>"));
    }

    #[test]
    fn test_parallel_sessions_are_independent() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DitaRenderer>();

        let renderer = DitaRenderer::default();
        let inputs: Vec<String> = (0..8)
            .map(|i| format!("# Doc {i}\n\n## Part\n\n## Part\n\ntext {i}\n"))
            .collect();
        let expected: Vec<String> = inputs
            .iter()
            .map(|md| renderer.render_to_string(&Document::parse(md)).unwrap())
            .collect();

        let actual: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = inputs
                .iter()
                .map(|md| {
                    let renderer = &renderer;
                    scope.spawn(move || renderer.render_to_string(&Document::parse(md)).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(actual, expected);
        assert!(expected[3].contains(r#"<section id="part-1">"#));
    }
}
