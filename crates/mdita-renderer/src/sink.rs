//! Receivers of structured markup events.
//!
//! [`MarkupSink`] is the push interface the writer streams into. Two
//! implementations ship with the crate:
//!
//! - [`XmlSink`]: serializes events to XML text with `quick-xml`
//! - [`EventRecorder`]: keeps the events for inspection

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};

use crate::error::SinkError;

/// Ordered attribute list of a start-element event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Append an attribute.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Value of the first attribute called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Push receiver of markup events.
///
/// Every method may reject the event; the renderer aborts the session on
/// the first rejection. Document and namespace events default to no-ops.
pub trait MarkupSink {
    fn start_document(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn end_document(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Declare `prefix` for the elements that follow.
    fn start_prefix_mapping(&mut self, _prefix: &str, _uri: &str) -> Result<(), SinkError> {
        Ok(())
    }

    fn end_prefix_mapping(&mut self, _prefix: &str) -> Result<(), SinkError> {
        Ok(())
    }

    fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<(), SinkError>;

    fn end_element(&mut self, name: &str) -> Result<(), SinkError>;

    /// Character data. Sinks that serialize are responsible for escaping.
    fn characters(&mut self, text: &str) -> Result<(), SinkError>;

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<(), SinkError>;
}

/// One recorded markup event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupEvent {
    StartDocument,
    EndDocument,
    StartPrefixMapping { prefix: String, uri: String },
    EndPrefixMapping { prefix: String },
    StartElement { name: String, attributes: Attributes },
    EndElement { name: String },
    Characters(String),
    ProcessingInstruction { target: String, data: String },
}

impl MarkupEvent {
    /// Start element without attributes.
    #[must_use]
    pub fn start(name: &str) -> Self {
        Self::StartElement {
            name: name.to_owned(),
            attributes: Attributes::new(),
        }
    }

    #[must_use]
    pub fn end(name: &str) -> Self {
        Self::EndElement {
            name: name.to_owned(),
        }
    }

    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::Characters(text.to_owned())
    }
}

/// Sink that records every event.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Vec<MarkupEvent>,
}

impl EventRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[MarkupEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<MarkupEvent> {
        self.events
    }

    /// Element, text and processing-instruction events only.
    pub fn content_events(&self) -> impl Iterator<Item = &MarkupEvent> {
        self.events.iter().filter(|event| {
            matches!(
                event,
                MarkupEvent::StartElement { .. }
                    | MarkupEvent::EndElement { .. }
                    | MarkupEvent::Characters(_)
                    | MarkupEvent::ProcessingInstruction { .. }
            )
        })
    }
}

impl MarkupSink for EventRecorder {
    fn start_document(&mut self) -> Result<(), SinkError> {
        self.events.push(MarkupEvent::StartDocument);
        Ok(())
    }

    fn end_document(&mut self) -> Result<(), SinkError> {
        self.events.push(MarkupEvent::EndDocument);
        Ok(())
    }

    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<(), SinkError> {
        self.events.push(MarkupEvent::StartPrefixMapping {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
        });
        Ok(())
    }

    fn end_prefix_mapping(&mut self, prefix: &str) -> Result<(), SinkError> {
        self.events.push(MarkupEvent::EndPrefixMapping {
            prefix: prefix.to_owned(),
        });
        Ok(())
    }

    fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<(), SinkError> {
        self.events.push(MarkupEvent::StartElement {
            name: name.to_owned(),
            attributes: attributes.clone(),
        });
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> Result<(), SinkError> {
        self.events.push(MarkupEvent::end(name));
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<(), SinkError> {
        self.events.push(MarkupEvent::text(text));
        Ok(())
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<(), SinkError> {
        self.events.push(MarkupEvent::ProcessingInstruction {
            target: target.to_owned(),
            data: data.to_owned(),
        });
        Ok(())
    }
}

/// Sink that serializes events as XML text.
///
/// Prefix mappings are written as `xmlns:` attributes on the next start
/// tag. Text and attribute values are escaped; `?>` inside
/// processing-instruction data is written as `? >`.
pub struct XmlSink<W: Write> {
    writer: Writer<W>,
    pending_namespaces: Vec<(String, String)>,
}

impl<W: Write> XmlSink<W> {
    /// Sink without indentation.
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
            pending_namespaces: Vec::new(),
        }
    }

    /// Sink indenting nested elements by `indent` spaces (0 disables).
    pub fn with_indent(inner: W, indent: usize) -> Self {
        let writer = if indent == 0 {
            Writer::new(inner)
        } else {
            Writer::new_with_indent(inner, b' ', indent)
        };
        Self {
            writer,
            pending_namespaces: Vec::new(),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> MarkupSink for XmlSink<W> {
    fn start_document(&mut self) -> Result<(), SinkError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<(), SinkError> {
        self.pending_namespaces
            .push((format!("xmlns:{prefix}"), uri.to_owned()));
        Ok(())
    }

    fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<(), SinkError> {
        let mut start = BytesStart::new(name);
        for (key, value) in self.pending_namespaces.drain(..) {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        for attribute in attributes.iter() {
            start.push_attribute(attribute);
        }
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> Result<(), SinkError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<(), SinkError> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<(), SinkError> {
        // `?>` would end the instruction early.
        let content = if data.is_empty() {
            target.to_owned()
        } else {
            format!("{target} {}", data.replace("?>", "? >"))
        };
        self.writer.write_event(Event::PI(BytesPI::new(content)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn xml(events: impl FnOnce(&mut XmlSink<Vec<u8>>) -> Result<(), SinkError>) -> String {
        let mut sink = XmlSink::new(Vec::new());
        events(&mut sink).unwrap();
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_attributes_keep_order() {
        let attrs = Attributes::new().with("id", "a").with("class", "b");
        let collected: Vec<_> = attrs.iter().collect();
        assert_eq!(collected, vec![("id", "a"), ("class", "b")]);
        assert_eq!(attrs.get("class"), Some("b"));
        assert_eq!(attrs.get("href"), None);
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_xml_sink_escapes_text_and_attributes() {
        let out = xml(|sink| {
            sink.start_element("p", &Attributes::new().with("title", r#"a "b""#))?;
            sink.characters("x < y & z")?;
            sink.end_element("p")
        });
        assert_eq!(out, r#"<p title="a &quot;b&quot;">x &lt; y &amp; z</p>"#);
    }

    #[test]
    fn test_xml_sink_namespace_on_next_element() {
        let out = xml(|sink| {
            sink.start_prefix_mapping("ditaarch", "urn:x")?;
            sink.start_element("topic", &Attributes::new().with("id", "t"))?;
            sink.start_element("body", &Attributes::new())?;
            sink.end_element("body")?;
            sink.end_element("topic")?;
            sink.end_prefix_mapping("ditaarch")
        });
        assert_eq!(
            out,
            r#"<topic xmlns:ditaarch="urn:x" id="t"><body></body></topic>"#
        );
    }

    #[test]
    fn test_xml_sink_declaration_and_pi() {
        let out = xml(|sink| {
            sink.start_document()?;
            sink.processing_instruction("linebreak", "")?;
            sink.processing_instruction("html", "<br>")?;
            sink.end_document()
        });
        assert_eq!(
            out,
            r#"<?xml version="1.0" encoding="UTF-8"?><?linebreak?><?html <br>?>"#
        );
    }

    #[test]
    fn test_xml_sink_pi_data_cannot_close_instruction() {
        let out = xml(|sink| sink.processing_instruction("html", "<?php echo 1; ?>"));
        assert_eq!(out, "<?html <?php echo 1; ? >?>");

        let mut reader = quick_xml::Reader::from_str(&out);
        match reader.read_event().unwrap() {
            Event::PI(pi) => assert_eq!(&*pi, b"html <?php echo 1; ? >".as_slice()),
            other => panic!("expected processing instruction, got {other:?}"),
        }
        assert!(matches!(reader.read_event().unwrap(), Event::Eof));
    }

    #[test]
    fn test_recorder_content_events() {
        let mut recorder = EventRecorder::new();
        recorder.start_document().unwrap();
        recorder.start_element("p", &Attributes::new()).unwrap();
        recorder.characters("hi").unwrap();
        recorder.end_element("p").unwrap();
        recorder.end_document().unwrap();

        let content: Vec<_> = recorder.content_events().cloned().collect();
        assert_eq!(
            content,
            vec![
                MarkupEvent::start("p"),
                MarkupEvent::text("hi"),
                MarkupEvent::end("p"),
            ]
        );
        assert_eq!(recorder.events().len(), 5);
    }
}
