//! Built-in provider mapping markdown nodes to the DITA topic vocabulary.
//!
//! | Node | Output |
//! |------|--------|
//! | document | `topic` with `title`, optional `shortdesc`, `body` |
//! | top-level heading | `section` with `title`, open until the next one |
//! | nested heading | `p outputclass="hN"` |
//! | paragraph, block quote | `p`, `lq` |
//! | lists | `ul` / `ol` with `li` |
//! | code block | `codeblock` with a language `outputclass` |
//! | emphasis, strong, strikethrough, code | `i`, `b`, `ph outputclass="line-through"`, `codeph` |
//! | link | `xref`, or just its text where links are suppressed |
//! | image | `image` with `alt` |
//! | table | `table/tgroup/colspec/thead/tbody/row/entry` |
//! | hard break | `<?linebreak?>` |
//! | raw HTML | dropped, escaped text, or `<?html ...?>` |

use std::rc::Rc;

use mdita_config::{OptionSource, keys};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use pulldown_cmark::Alignment;

use crate::ast::{NodeKind, NodeRef, NodeType};
use crate::context::NodeRendererContext;
use crate::error::RenderError;
use crate::handler::{NodeRendererFactory, NodeRenderingHandler, ProviderKind};
use crate::sink::Attributes;
use crate::writer::DitaWriter;

/// Topic id used when the document has no title heading with an id.
const DEFAULT_TOPIC_ID: &str = "topic";
const DITA_ARCH_VERSION_ATTRIBUTE: &str = "ditaarch:DITAArchVersion";
const DITA_ARCH_VERSION: &str = "1.3";

/// Characters that are not allowed to appear raw in a URL.
const URL_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// Provider of the default DITA mapping; kind `"core"`.
///
/// Registered first by [`DitaRenderer`](crate::DitaRenderer) unless disabled,
/// so providers that declare `"core"` as delegate override it.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreNodeRenderer;

impl CoreNodeRenderer {
    pub const KIND: ProviderKind = ProviderKind::new("core");
}

impl NodeRendererFactory for CoreNodeRenderer {
    fn kind(&self) -> ProviderKind {
        Self::KIND
    }

    fn create(&self, options: &dyn OptionSource) -> Vec<NodeRenderingHandler> {
        let options = Rc::new(CoreOptions::new(options));

        vec![
            with_options(&options, NodeType::Document, render_document),
            with_options(&options, NodeType::Heading, render_heading),
            element(NodeType::Paragraph, "p", Attributes::new()),
            element(NodeType::BlockQuote, "lq", Attributes::new()),
            NodeRenderingHandler::new(NodeType::List, render_list),
            element(NodeType::Item, "li", Attributes::new()),
            with_options(&options, NodeType::CodeBlock, render_code_block),
            with_options(&options, NodeType::HtmlBlock, render_html_block),
            NodeRenderingHandler::new(NodeType::Table, render_table),
            NodeRenderingHandler::new(NodeType::TableHead, render_table_head),
            element(NodeType::TableRow, "row", Attributes::new()),
            element(NodeType::TableCell, "entry", Attributes::new()),
            element(NodeType::Emphasis, "i", Attributes::new()),
            element(NodeType::Strong, "b", Attributes::new()),
            element(
                NodeType::Strikethrough,
                "ph",
                Attributes::new().with("outputclass", "line-through"),
            ),
            with_options(&options, NodeType::Link, render_link),
            with_options(&options, NodeType::Image, render_image),
            NodeRenderingHandler::new(NodeType::Text, |node, _, out| match node.kind() {
                NodeKind::Text(text) => out.characters(text),
                _ => Ok(()),
            }),
            NodeRenderingHandler::new(NodeType::Code, |node, _, out| {
                let NodeKind::Code(code) = node.kind() else {
                    return Ok(());
                };
                out.start_element("codeph", &Attributes::new())?;
                out.characters(code)?;
                out.end_element()
            }),
            with_options(&options, NodeType::InlineHtml, render_inline_html),
            with_options(&options, NodeType::SoftBreak, |_, _, out, options| {
                out.characters(&options.soft_break)
            }),
            NodeRenderingHandler::new(NodeType::HardBreak, |_, _, out| {
                out.processing_instruction("linebreak", None)
            }),
            NodeRenderingHandler::new(NodeType::ThematicBreak, |_, _, _| Ok(())),
        ]
    }
}

/// Whether raw HTML of one kind is dropped or written as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HtmlPolicy {
    suppress: bool,
    escape: bool,
}

#[derive(Debug)]
struct CoreOptions {
    soft_break: String,
    render_header_id: bool,
    shortdesc_paragraph: bool,
    percent_encode_urls: bool,
    max_trailing_blank_lines: usize,
    language_class_prefix: String,
    no_language_class: String,
    html_blocks: HtmlPolicy,
    html_comment_blocks: HtmlPolicy,
    inline_html: HtmlPolicy,
    inline_html_comments: HtmlPolicy,
}

impl CoreOptions {
    fn new(options: &dyn OptionSource) -> Self {
        Self {
            soft_break: keys::SOFT_BREAK.get(options),
            render_header_id: keys::RENDER_HEADER_ID.get(options),
            shortdesc_paragraph: keys::SHORTDESC_PARAGRAPH.get(options),
            percent_encode_urls: keys::PERCENT_ENCODE_URLS.get(options),
            max_trailing_blank_lines: usize::try_from(keys::MAX_TRAILING_BLANK_LINES.get(options))
                .unwrap_or(0),
            language_class_prefix: keys::FENCED_CODE_LANGUAGE_CLASS_PREFIX.get(options),
            no_language_class: keys::FENCED_CODE_NO_LANGUAGE_CLASS.get(options),
            html_blocks: HtmlPolicy {
                suppress: keys::SUPPRESS_HTML_BLOCKS.get(options),
                escape: keys::ESCAPE_HTML_BLOCKS.get(options),
            },
            html_comment_blocks: HtmlPolicy {
                suppress: keys::SUPPRESS_HTML_COMMENT_BLOCKS.get(options),
                escape: keys::ESCAPE_HTML_COMMENT_BLOCKS.get(options),
            },
            inline_html: HtmlPolicy {
                suppress: keys::SUPPRESS_INLINE_HTML.get(options),
                escape: keys::ESCAPE_INLINE_HTML.get(options),
            },
            inline_html_comments: HtmlPolicy {
                suppress: keys::SUPPRESS_INLINE_HTML_COMMENTS.get(options),
                escape: keys::ESCAPE_INLINE_HTML_COMMENTS.get(options),
            },
        }
    }

    fn href(&self, url: &str) -> String {
        if self.percent_encode_urls {
            utf8_percent_encode(url, URL_ENCODE_SET).to_string()
        } else {
            url.to_owned()
        }
    }
}

/// Handler that wraps the node's children in `tag`.
fn element(node_type: NodeType, tag: &'static str, attributes: Attributes) -> NodeRenderingHandler {
    NodeRenderingHandler::new(node_type, move |node, ctx, out| {
        out.start_element(tag, &attributes)?;
        ctx.render_children(node, out)?;
        out.end_element()
    })
}

/// Handler with access to the session's core options.
fn with_options<F>(options: &Rc<CoreOptions>, node_type: NodeType, render: F) -> NodeRenderingHandler
where
    F: for<'a> Fn(
            NodeRef<'a>,
            &mut NodeRendererContext<'a>,
            &mut DitaWriter<'_>,
            &CoreOptions,
        ) -> Result<(), RenderError>
        + 'static,
{
    let options = Rc::clone(options);
    NodeRenderingHandler::new(node_type, move |node, ctx, out| {
        render(node, ctx, out, &options)
    })
}

fn render_document<'a>(
    node: NodeRef<'a>,
    ctx: &mut NodeRendererContext<'a>,
    out: &mut DitaWriter<'_>,
    options: &CoreOptions,
) -> Result<(), RenderError> {
    let mut children = node.children().peekable();
    let title = children.next_if(|child| child.node_type() == NodeType::Heading);

    let id = title
        .and_then(|heading| ctx.node_id(heading))
        .unwrap_or(DEFAULT_TOPIC_ID)
        .to_owned();
    let attributes = Attributes::new()
        .with("id", id)
        .with(DITA_ARCH_VERSION_ATTRIBUTE, DITA_ARCH_VERSION);
    out.start_element("topic", &attributes)?;

    out.start_element("title", &Attributes::new())?;
    if let Some(heading) = title {
        ctx.render_children(heading, out)?;
    }
    out.end_element()?;

    if options.shortdesc_paragraph
        && let Some(paragraph) = children.next_if(|child| child.node_type() == NodeType::Paragraph)
    {
        out.start_element("shortdesc", &Attributes::new())?;
        ctx.render_children(paragraph, out)?;
        out.end_element()?;
    }

    out.start_element("body", &Attributes::new())?;
    let body_depth = out.depth();
    for child in children {
        ctx.render(child, out)?;
    }
    // Sections left open by headings, then body.
    while out.depth() >= body_depth {
        out.end_element()?;
    }
    out.end_element()
}

fn render_heading<'a>(
    node: NodeRef<'a>,
    ctx: &mut NodeRendererContext<'a>,
    out: &mut DitaWriter<'_>,
    options: &CoreOptions,
) -> Result<(), RenderError> {
    let NodeKind::Heading { level, .. } = node.kind() else {
        return Ok(());
    };
    let top_level = node
        .parent()
        .is_some_and(|parent| parent.node_type() == NodeType::Document);
    let body = out.open_elements().position(|tag| tag == "body");

    if top_level && let Some(body) = body {
        while out.depth() > body + 1 {
            out.end_element()?;
        }
        let mut attributes = Attributes::new();
        if let Some(id) = ctx.node_id(node) {
            attributes.push("id", id);
        }
        out.start_element("section", &attributes)?;
        out.start_element("title", &Attributes::new())?;
        ctx.render_children(node, out)?;
        return out.end_element();
    }

    let mut attributes = Attributes::new().with("outputclass", format!("h{level}"));
    if options.render_header_id
        && let Some(id) = ctx.node_id(node)
    {
        attributes.push("id", id);
    }
    out.start_element("p", &attributes)?;
    ctx.render_children(node, out)?;
    out.end_element()
}

fn render_list<'a>(
    node: NodeRef<'a>,
    ctx: &mut NodeRendererContext<'a>,
    out: &mut DitaWriter<'_>,
) -> Result<(), RenderError> {
    let tag = match node.kind() {
        NodeKind::List { start: Some(_) } => "ol",
        _ => "ul",
    };
    out.start_element(tag, &Attributes::new())?;
    ctx.render_children(node, out)?;
    out.end_element()
}

fn render_code_block<'a>(
    node: NodeRef<'a>,
    _ctx: &mut NodeRendererContext<'a>,
    out: &mut DitaWriter<'_>,
    options: &CoreOptions,
) -> Result<(), RenderError> {
    let NodeKind::CodeBlock { info, literal } = node.kind() else {
        return Ok(());
    };
    let language = info
        .as_deref()
        .and_then(|info| info.split_whitespace().next());

    let mut attributes = Attributes::new();
    match language {
        Some(language) => {
            attributes.push(
                "outputclass",
                format!("{}{language}", options.language_class_prefix),
            );
        }
        None if !options.no_language_class.is_empty() => {
            attributes.push("outputclass", options.no_language_class.as_str());
        }
        None => {}
    }
    out.start_element("codeblock", &attributes)?;
    out.characters(&trim_trailing_blank_lines(
        literal,
        options.max_trailing_blank_lines,
    ))?;
    out.end_element()
}

/// Drop the final line break and keep at most `max` trailing blank lines.
fn trim_trailing_blank_lines(literal: &str, max: usize) -> String {
    let body = literal.strip_suffix('\n').unwrap_or(literal);
    let lines: Vec<&str> = body.split('\n').collect();
    let blank = lines
        .iter()
        .rev()
        .take_while(|line| line.trim().is_empty())
        .count();
    let keep = lines.len() - blank.saturating_sub(max);
    lines[..keep].join("\n")
}

fn is_html_comment(html: &str) -> bool {
    html.trim_start().starts_with("<!--")
}

fn render_html_block<'a>(
    node: NodeRef<'a>,
    _ctx: &mut NodeRendererContext<'a>,
    out: &mut DitaWriter<'_>,
    options: &CoreOptions,
) -> Result<(), RenderError> {
    let NodeKind::HtmlBlock { literal } = node.kind() else {
        return Ok(());
    };
    let policy = if is_html_comment(literal) {
        options.html_comment_blocks
    } else {
        options.html_blocks
    };
    let html = literal.trim_end();
    if policy.suppress {
        Ok(())
    } else if policy.escape {
        out.start_element("p", &Attributes::new())?;
        out.characters(html)?;
        out.end_element()
    } else {
        out.processing_instruction("html", Some(html))
    }
}

fn render_inline_html<'a>(
    node: NodeRef<'a>,
    _ctx: &mut NodeRendererContext<'a>,
    out: &mut DitaWriter<'_>,
    options: &CoreOptions,
) -> Result<(), RenderError> {
    let NodeKind::InlineHtml(html) = node.kind() else {
        return Ok(());
    };
    let policy = if is_html_comment(html) {
        options.inline_html_comments
    } else {
        options.inline_html
    };
    if policy.suppress {
        Ok(())
    } else if policy.escape {
        out.characters(html)
    } else {
        out.processing_instruction("html", Some(html))
    }
}

fn is_external(url: &str) -> bool {
    url.contains("://") || url.starts_with("mailto:")
}

fn link_attributes(url: &str, options: &CoreOptions) -> Attributes {
    let mut attributes = Attributes::new().with("href", options.href(url));
    if is_external(url) {
        attributes.push("scope", "external");
        attributes.push("format", "html");
    }
    attributes
}

fn render_link<'a>(
    node: NodeRef<'a>,
    ctx: &mut NodeRendererContext<'a>,
    out: &mut DitaWriter<'_>,
    options: &CoreOptions,
) -> Result<(), RenderError> {
    let NodeKind::Link { url, .. } = node.kind() else {
        return Ok(());
    };
    if ctx.is_do_not_render_links() {
        return ctx.render_children(node, out);
    }
    out.start_element("xref", &link_attributes(url, options))?;
    ctx.render_children(node, out)?;
    out.end_element()
}

fn render_image<'a>(
    node: NodeRef<'a>,
    ctx: &mut NodeRendererContext<'a>,
    out: &mut DitaWriter<'_>,
    options: &CoreOptions,
) -> Result<(), RenderError> {
    let NodeKind::Image { url, .. } = node.kind() else {
        return Ok(());
    };
    let mut attributes = Attributes::new().with("href", options.href(url));
    if is_external(url) {
        attributes.push("scope", "external");
    }
    out.start_element("image", &attributes)?;
    out.start_element("alt", &Attributes::new())?;
    ctx.do_not_render_links();
    ctx.render_children(node, out)?;
    ctx.do_render_links();
    out.end_element()?;
    out.end_element()
}

fn alignment_name(alignment: Alignment) -> Option<&'static str> {
    match alignment {
        Alignment::Left => Some("left"),
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
        Alignment::None => None,
    }
}

fn render_table<'a>(
    node: NodeRef<'a>,
    ctx: &mut NodeRendererContext<'a>,
    out: &mut DitaWriter<'_>,
) -> Result<(), RenderError> {
    let NodeKind::Table { alignments } = node.kind() else {
        return Ok(());
    };
    out.start_element("table", &Attributes::new())?;
    out.start_element(
        "tgroup",
        &Attributes::new().with("cols", alignments.len().to_string()),
    )?;
    for (index, alignment) in alignments.iter().enumerate() {
        let mut attributes = Attributes::new().with("colname", format!("col{}", index + 1));
        if let Some(align) = alignment_name(*alignment) {
            attributes.push("align", align);
        }
        out.start_element("colspec", &attributes)?;
        out.end_element()?;
    }

    let mut in_body = false;
    for child in node.children() {
        if child.node_type() == NodeType::TableRow && !in_body {
            out.start_element("tbody", &Attributes::new())?;
            in_body = true;
        }
        ctx.render(child, out)?;
    }
    if in_body {
        out.end_element()?;
    }
    out.end_element()?;
    out.end_element()
}

fn render_table_head<'a>(
    node: NodeRef<'a>,
    ctx: &mut NodeRendererContext<'a>,
    out: &mut DitaWriter<'_>,
) -> Result<(), RenderError> {
    out.start_element("thead", &Attributes::new())?;
    out.start_element("row", &Attributes::new())?;
    ctx.render_children(node, out)?;
    out.end_element()?;
    out.end_element()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use mdita_config::DataSet;

    use super::*;
    use crate::ast::Document;
    use crate::renderer::DitaRenderer;

    fn render(markdown: &str, options: DataSet) -> String {
        DitaRenderer::builder()
            .options(options)
            .build()
            .render_to_string(&Document::parse(markdown))
            .unwrap()
    }

    fn body(markdown: &str, options: DataSet) -> String {
        let xml = render(markdown, options);
        let start = xml.find("<body>").unwrap() + "<body>".len();
        let end = xml.rfind("</body>").unwrap();
        xml[start..end].to_owned()
    }

    fn with(key: &mdita_config::DataKey<bool>) -> DataSet {
        DataSet::builder().set(key, true).build()
    }

    #[test]
    fn test_topic_with_title() {
        let xml = render("# Intro\n\nHello *world*.\n", DataSet::new());
        assert_eq!(
            xml,
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<topic xmlns:ditaarch="http://dita.oasis-open.org/architecture/2005/" "#,
                r#"id="intro" ditaarch:DITAArchVersion="1.3">"#,
                "<title>Intro</title>",
                "<body><p>Hello <i>world</i>.</p></body>",
                "</topic>",
            )
        );
    }

    #[test]
    fn test_topic_without_heading() {
        let xml = render("hi\n", DataSet::new());
        assert!(xml.contains(r#"id="topic""#));
        assert!(xml.contains("<title></title><body><p>hi</p></body>"));
    }

    #[test]
    fn test_headings_open_sections() {
        let got = body("# T\n\n## A\n\na\n\n## B\n\nb\n", DataSet::new());
        assert_eq!(
            got,
            concat!(
                r#"<section id="a"><title>A</title><p>a</p></section>"#,
                r#"<section id="b"><title>B</title><p>b</p></section>"#,
            )
        );
    }

    #[test]
    fn test_explicit_section_id_stays_unique() {
        let xml = render("# Install\n\n## Setup {#install}\n\nx\n", DataSet::new());
        assert_eq!(xml.matches(r#"id="install""#).count(), 1);
        assert!(xml.contains(r#"id="install-1""#));
        assert!(xml.contains(r#"<section id="install"><title>Setup</title>"#));
    }

    #[test]
    fn test_nested_heading_is_paragraph() {
        let options = with(&keys::RENDER_HEADER_ID);
        let got = body("# T\n\n> ### Q\n", options);
        assert_eq!(got, r#"<lq><p outputclass="h3" id="q">Q</p></lq>"#);
    }

    #[test]
    fn test_shortdesc_paragraph() {
        let xml = render("# T\n\nShort.\n\nLong.\n", with(&keys::SHORTDESC_PARAGRAPH));
        assert!(xml.contains("<title>T</title><shortdesc>Short.</shortdesc><body><p>Long.</p></body>"));
    }

    #[test]
    fn test_inline_markup() {
        let got = body("*i* **b** ~~s~~ `c`\n", DataSet::new());
        assert_eq!(
            got,
            r#"<p><i>i</i> <b>b</b> <ph outputclass="line-through">s</ph> <codeph>c</codeph></p>"#
        );
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            body("- a\n- b\n", DataSet::new()),
            "<ul><li>a</li><li>b</li></ul>"
        );
        assert_eq!(body("1. a\n", DataSet::new()), "<ol><li>a</li></ol>");
    }

    #[test]
    fn test_external_link() {
        let got = body("[x](https://example.com/a)\n", DataSet::new());
        assert_eq!(
            got,
            r#"<p><xref href="https://example.com/a" scope="external" format="html">x</xref></p>"#
        );
    }

    #[test]
    fn test_percent_encoded_link() {
        let got = body("[x](<docs/a b.md>)\n", with(&keys::PERCENT_ENCODE_URLS));
        assert_eq!(got, r#"<p><xref href="docs/a%20b.md">x</xref></p>"#);
    }

    #[test]
    fn test_links_suppressed_in_document() {
        let got = body("[x](a.md)\n", with(&keys::DO_NOT_RENDER_LINKS));
        assert_eq!(got, "<p>x</p>");
    }

    #[test]
    fn test_image_alt_has_no_links() {
        let got = body("![alt [x](a.md)](img.png)\n", DataSet::new());
        assert_eq!(got, r#"<p><image href="img.png"><alt>alt x</alt></image></p>"#);
    }

    #[test]
    fn test_code_block_language_class() {
        let got = body("```rust\nfn main() {}\n```\n", DataSet::new());
        assert_eq!(
            got,
            r#"<codeblock outputclass="language-rust">fn main() {}</codeblock>"#
        );
    }

    #[test]
    fn test_code_block_without_language() {
        let options = DataSet::builder()
            .set(&keys::FENCED_CODE_NO_LANGUAGE_CLASS, "plain".to_owned())
            .build();
        let got = body("```\nx\n```\n", options);
        assert_eq!(got, r#"<codeblock outputclass="plain">x</codeblock>"#);
    }

    #[test]
    fn test_trailing_blank_lines() {
        assert_eq!(trim_trailing_blank_lines("a\n\n\n\n", 1), "a\n");
        assert_eq!(trim_trailing_blank_lines("a\n\n\n\n", 0), "a");
        assert_eq!(trim_trailing_blank_lines("a\nb\n", 1), "a\nb");
        assert_eq!(trim_trailing_blank_lines("", 1), "");
    }

    #[test]
    fn test_html_block_policies() {
        let html = "<div>x</div>\n";
        assert_eq!(body(html, DataSet::new()), "<?html <div>x</div>?>");
        assert_eq!(
            body(html, with(&keys::ESCAPE_HTML)),
            "<p>&lt;div&gt;x&lt;/div&gt;</p>"
        );
        assert_eq!(body(html, with(&keys::SUPPRESS_HTML)), "");
    }

    #[test]
    fn test_inline_html_comment_suppressed() {
        let got = body(
            "a <!-- c --> <b>b</b>\n",
            with(&keys::SUPPRESS_INLINE_HTML_COMMENTS),
        );
        assert_eq!(got, "<p>a  <?html <b>?>b<?html </b>?></p>");
    }

    #[test]
    fn test_inline_processing_instruction_kept_whole() {
        let got = body("a <?php echo 1; ?> b\n", DataSet::new());
        assert_eq!(got, "<p>a <?html <?php echo 1; ? >?> b</p>");
    }

    #[test]
    fn test_breaks() {
        assert_eq!(body("a  \nb\n", DataSet::new()), "<p>a<?linebreak?>b</p>");
        assert_eq!(body("a\nb\n", DataSet::new()), "<p>a\nb</p>");
        assert_eq!(body("a\n\n---\n", DataSet::new()), "<p>a</p>");
    }

    #[test]
    fn test_table() {
        let got = body("| a | b |\n|:--|--:|\n| 1 | 2 |\n", DataSet::new());
        assert!(got.starts_with(r#"<table><tgroup cols="2">"#));
        assert!(got.contains(r#"<colspec colname="col1" align="left"></colspec>"#));
        assert!(got.contains(r#"<colspec colname="col2" align="right"></colspec>"#));
        assert!(got.contains("<thead><row><entry>"));
        assert!(got.contains("</row></thead><tbody><row><entry>"));
        assert!(got.ends_with("</row></tbody></tgroup></table>"));
    }
}
