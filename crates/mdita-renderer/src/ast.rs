//! Read-only document tree consumed by the renderer.
//!
//! Nodes live in an arena owned by [`Document`] and are linked through
//! parent, first-child and next-sibling indices. The tree is produced by
//! the parser side ([`Document::from_events`] or [`Document::append_child`])
//! and only read while rendering.

use std::fmt;

use mdita_config::DataSet;
use pulldown_cmark::{
    Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Discriminant used to select a node's handler chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Document,
    Paragraph,
    Heading,
    BlockQuote,
    CodeBlock,
    HtmlBlock,
    List,
    Item,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Image,
    Text,
    Code,
    InlineHtml,
    SoftBreak,
    HardBreak,
    ThematicBreak,
    /// Extension node type, claimed only by providers that know its name.
    Custom(&'static str),
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => f.write_str(name),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading {
        /// Level 1-6.
        level: u8,
        /// Explicit `{#id}` attribute.
        id: Option<String>,
    },
    BlockQuote,
    CodeBlock {
        /// Fence info string, `None` for indented code.
        info: Option<String>,
        literal: String,
    },
    HtmlBlock {
        literal: String,
    },
    List {
        /// First number of an ordered list, `None` for bullet lists.
        start: Option<u64>,
    },
    Item,
    Table {
        alignments: Vec<Alignment>,
    },
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Link {
        url: String,
        title: String,
    },
    Image {
        url: String,
        title: String,
    },
    Text(String),
    Code(String),
    InlineHtml(String),
    SoftBreak,
    HardBreak,
    ThematicBreak,
    Custom {
        name: &'static str,
        literal: String,
    },
}

impl NodeKind {
    /// Handler selector for this payload.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Document => NodeType::Document,
            Self::Paragraph => NodeType::Paragraph,
            Self::Heading { .. } => NodeType::Heading,
            Self::BlockQuote => NodeType::BlockQuote,
            Self::CodeBlock { .. } => NodeType::CodeBlock,
            Self::HtmlBlock { .. } => NodeType::HtmlBlock,
            Self::List { .. } => NodeType::List,
            Self::Item => NodeType::Item,
            Self::Table { .. } => NodeType::Table,
            Self::TableHead => NodeType::TableHead,
            Self::TableRow => NodeType::TableRow,
            Self::TableCell => NodeType::TableCell,
            Self::Emphasis => NodeType::Emphasis,
            Self::Strong => NodeType::Strong,
            Self::Strikethrough => NodeType::Strikethrough,
            Self::Link { .. } => NodeType::Link,
            Self::Image { .. } => NodeType::Image,
            Self::Text(_) => NodeType::Text,
            Self::Code(_) => NodeType::Code,
            Self::InlineHtml(_) => NodeType::InlineHtml,
            Self::SoftBreak => NodeType::SoftBreak,
            Self::HardBreak => NodeType::HardBreak,
            Self::ThematicBreak => NodeType::ThematicBreak,
            Self::Custom { name, .. } => NodeType::Custom(name),
        }
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    next: Option<NodeId>,
}

/// Parsed markdown document.
///
/// The root node (always [`NodeKind::Document`]) is created with the
/// document. A document may carry its own options, which take precedence
/// over the renderer's options for this document only.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    options: DataSet,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                first_child: None,
                last_child: None,
                next: None,
            }],
            options: DataSet::new(),
        }
    }

    /// Parse markdown with tables, strikethrough and heading attributes enabled.
    #[must_use]
    pub fn parse(markdown: &str) -> Self {
        Self::from_events(Parser::new_ext(markdown, parser_options()))
    }

    /// Build a tree from a pulldown-cmark event stream.
    ///
    /// Metadata blocks are dropped. Constructs without a dedicated
    /// [`NodeKind`] (footnotes, math, definition lists, task markers,
    /// super/subscript) become [`NodeKind::Custom`] nodes, so a provider set
    /// that does not handle them fails loudly instead of losing content.
    #[must_use]
    pub fn from_events<'e, I>(events: I) -> Self
    where
        I: IntoIterator<Item = Event<'e>>,
    {
        let mut doc = Self::new();
        let root = doc.root_id();
        let mut stack = vec![root];
        let mut in_metadata = false;

        for event in events {
            if in_metadata {
                in_metadata = !matches!(event, Event::End(TagEnd::MetadataBlock(_)));
                continue;
            }
            let parent = stack.last().copied().unwrap_or(root);
            match event {
                Event::Start(Tag::MetadataBlock(_)) => in_metadata = true,
                Event::Start(tag) => {
                    let id = doc.append_child(parent, tag_kind(tag));
                    stack.push(id);
                }
                Event::End(_) => {
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
                Event::Text(text) | Event::Html(text) => doc.push_text(parent, &text),
                Event::Code(code) => {
                    doc.append_child(parent, NodeKind::Code(code.into_string()));
                }
                Event::InlineHtml(html) => {
                    doc.append_child(parent, NodeKind::InlineHtml(html.into_string()));
                }
                Event::SoftBreak => {
                    doc.append_child(parent, NodeKind::SoftBreak);
                }
                Event::HardBreak => {
                    doc.append_child(parent, NodeKind::HardBreak);
                }
                Event::Rule => {
                    doc.append_child(parent, NodeKind::ThematicBreak);
                }
                Event::InlineMath(math) => {
                    doc.append_child(parent, custom("inline-math", math.into_string()));
                }
                Event::DisplayMath(math) => {
                    doc.append_child(parent, custom("display-math", math.into_string()));
                }
                Event::FootnoteReference(label) => {
                    doc.append_child(parent, custom("footnote-reference", label.into_string()));
                }
                Event::TaskListMarker(checked) => {
                    let literal = if checked { "x" } else { " " };
                    doc.append_child(parent, custom("task-list-marker", literal.to_owned()));
                }
            }
        }
        doc
    }

    /// Attach document-scoped options.
    #[must_use]
    pub fn with_options(mut self, options: DataSet) -> Self {
        self.options = options;
        self
    }

    /// Document-scoped options.
    #[must_use]
    pub fn options(&self) -> &DataSet {
        &self.options
    }

    /// Id of the root node.
    #[must_use]
    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> NodeRef<'_> {
        self.get(self.root_id())
    }

    /// Look up a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this document.
    #[must_use]
    pub fn get(&self, id: NodeId) -> NodeRef<'_> {
        assert!(id.0 < self.nodes.len(), "node {id:?} not in document");
        NodeRef { document: self, id }
    }

    /// Number of nodes, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document has no content below the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Append a new last child to `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this document.
    pub fn append_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        assert!(parent.0 < self.nodes.len(), "node {parent:?} not in document");
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            first_child: None,
            last_child: None,
            next: None,
        });
        match self.nodes[parent.0].last_child {
            Some(last) => self.nodes[last.0].next = Some(id),
            None => self.nodes[parent.0].first_child = Some(id),
        }
        self.nodes[parent.0].last_child = Some(id);
        id
    }

    /// Pre-order iterator over every node, starting at the root.
    pub fn descendants(&self) -> impl Iterator<Item = NodeRef<'_>> {
        self.root().descendants()
    }

    /// Text inside code and HTML blocks extends the block literal; other
    /// text merges with a preceding text sibling.
    fn push_text(&mut self, parent: NodeId, text: &str) {
        if let NodeKind::CodeBlock { literal, .. } | NodeKind::HtmlBlock { literal } =
            &mut self.nodes[parent.0].kind
        {
            literal.push_str(text);
            return;
        }
        if let Some(last) = self.nodes[parent.0].last_child
            && let NodeKind::Text(existing) = &mut self.nodes[last.0].kind
        {
            existing.push_str(text);
            return;
        }
        self.append_child(parent, NodeKind::Text(text.to_owned()));
    }
}

/// Borrowed handle to a node and its document.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    document: &'a Document,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    fn data(&self) -> &'a NodeData {
        &self.document.nodes[self.id.0]
    }

    fn link(&self, id: Option<NodeId>) -> Option<NodeRef<'a>> {
        id.map(|id| NodeRef {
            document: self.document,
            id,
        })
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn document(&self) -> &'a Document {
        self.document
    }

    #[must_use]
    pub fn kind(&self) -> &'a NodeKind {
        &self.data().kind
    }

    #[must_use]
    pub fn node_type(&self) -> NodeType {
        self.data().kind.node_type()
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.link(self.data().parent)
    }

    #[must_use]
    pub fn first_child(&self) -> Option<NodeRef<'a>> {
        self.link(self.data().first_child)
    }

    #[must_use]
    pub fn last_child(&self) -> Option<NodeRef<'a>> {
        self.link(self.data().last_child)
    }

    #[must_use]
    pub fn next(&self) -> Option<NodeRef<'a>> {
        self.link(self.data().next)
    }

    /// Direct children in document order.
    pub fn children(&self) -> Children<'a> {
        Children {
            next: self.first_child(),
        }
    }

    /// This node and everything below it, pre-order.
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants { stack: vec![*self] }
    }

    /// Concatenated literal text of the subtree (text, code and code blocks).
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        for node in self.descendants() {
            match node.kind() {
                NodeKind::Text(s) | NodeKind::Code(s) => text.push_str(s),
                NodeKind::CodeBlock { literal, .. } => text.push_str(literal),
                NodeKind::SoftBreak | NodeKind::HardBreak => text.push(' '),
                _ => {}
            }
        }
        text
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.document, other.document) && self.id == other.id
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", self.kind())
            .finish()
    }
}

/// Iterator over a node's children.
pub struct Children<'a> {
    next: Option<NodeRef<'a>>,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.next();
        Some(current)
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    stack: Vec<NodeRef<'a>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(current.children());
        self.stack[start..].reverse();
        Some(current)
    }
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_HEADING_ATTRIBUTES
}

fn custom(name: &'static str, literal: String) -> NodeKind {
    NodeKind::Custom { name, literal }
}

fn tag_kind(tag: Tag<'_>) -> NodeKind {
    match tag {
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::Heading { level, id, .. } => NodeKind::Heading {
            level: heading_level_to_num(level),
            id: id.map(|id| id.into_string()),
        },
        Tag::BlockQuote(_) => NodeKind::BlockQuote,
        Tag::CodeBlock(kind) => NodeKind::CodeBlock {
            info: match kind {
                CodeBlockKind::Fenced(info) => Some(info.into_string()),
                CodeBlockKind::Indented => None,
            },
            literal: String::new(),
        },
        Tag::HtmlBlock => NodeKind::HtmlBlock {
            literal: String::new(),
        },
        Tag::List(start) => NodeKind::List { start },
        Tag::Item => NodeKind::Item,
        Tag::Table(alignments) => NodeKind::Table { alignments },
        Tag::TableHead => NodeKind::TableHead,
        Tag::TableRow => NodeKind::TableRow,
        Tag::TableCell => NodeKind::TableCell,
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Strikethrough => NodeKind::Strikethrough,
        Tag::Link {
            dest_url, title, ..
        } => NodeKind::Link {
            url: dest_url.into_string(),
            title: title.into_string(),
        },
        Tag::Image {
            dest_url, title, ..
        } => NodeKind::Image {
            url: dest_url.into_string(),
            title: title.into_string(),
        },
        Tag::FootnoteDefinition(label) => custom("footnote-definition", label.into_string()),
        Tag::DefinitionList => custom("definition-list", String::new()),
        Tag::DefinitionListTitle => custom("definition-list-title", String::new()),
        Tag::DefinitionListDefinition => custom("definition-list-definition", String::new()),
        Tag::Superscript => custom("superscript", String::new()),
        Tag::Subscript => custom("subscript", String::new()),
        Tag::MetadataBlock(_) => custom("metadata-block", String::new()),
    }
}

/// Convert heading level enum to number (1-6).
fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
