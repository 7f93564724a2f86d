//! Output writer that keeps the emitted markup balanced.

use crate::error::RenderError;
use crate::sink::{Attributes, MarkupSink};

/// Streams markup events to a sink while tracking open elements.
///
/// [`start_element`](Self::start_element) pushes the tag onto a stack,
/// [`end_element`](Self::end_element) pops it, and [`close`](Self::close)
/// ends whatever is still open. Calling `end_element` with nothing open is
/// a no-op.
pub struct DitaWriter<'s> {
    sink: &'s mut dyn MarkupSink,
    tag_stack: Vec<String>,
}

impl<'s> DitaWriter<'s> {
    pub fn new(sink: &'s mut dyn MarkupSink) -> Self {
        Self {
            sink,
            tag_stack: Vec::new(),
        }
    }

    /// Emit a start tag and push it onto the open-element stack.
    ///
    /// The tag is only pushed once the sink accepted the event.
    pub fn start_element(&mut self, tag: &str, attributes: &Attributes) -> Result<(), RenderError> {
        self.sink.start_element(tag, attributes)?;
        self.tag_stack.push(tag.to_owned());
        Ok(())
    }

    /// End the most recently started element.
    pub fn end_element(&mut self) -> Result<(), RenderError> {
        match self.tag_stack.pop() {
            Some(tag) => self.end_element_named(&tag),
            None => {
                tracing::trace!("end_element with no open element ignored");
                Ok(())
            }
        }
    }

    /// Emit an end tag for `tag` without consulting the stack.
    pub fn end_element_named(&mut self, tag: &str) -> Result<(), RenderError> {
        self.sink.end_element(tag)?;
        Ok(())
    }

    /// Emit character data as is.
    pub fn characters(&mut self, text: &str) -> Result<(), RenderError> {
        self.sink.characters(text)?;
        Ok(())
    }

    /// Emit a processing instruction; missing data is sent as an empty string.
    pub fn processing_instruction(
        &mut self,
        target: &str,
        data: Option<&str>,
    ) -> Result<(), RenderError> {
        self.sink.processing_instruction(target, data.unwrap_or(""))?;
        Ok(())
    }

    /// End every open element, innermost first.
    ///
    /// The stack is empty afterwards even if the sink fails; the first
    /// failure is returned.
    pub fn close(&mut self) -> Result<(), RenderError> {
        if !self.tag_stack.is_empty() {
            tracing::debug!(open = self.tag_stack.len(), "Closing open elements");
        }
        let mut first_error = None;
        while !self.tag_stack.is_empty() {
            if let Err(e) = self.end_element() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Number of open elements.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.tag_stack.len()
    }

    /// Open elements, outermost first.
    pub fn open_elements(&self) -> impl Iterator<Item = &str> {
        self.tag_stack.iter().map(String::as_str)
    }

    pub(crate) fn start_document(&mut self) -> Result<(), RenderError> {
        self.sink.start_document()?;
        Ok(())
    }

    pub(crate) fn end_document(&mut self) -> Result<(), RenderError> {
        self.sink.end_document()?;
        Ok(())
    }

    pub(crate) fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<(), RenderError> {
        self.sink.start_prefix_mapping(prefix, uri)?;
        Ok(())
    }

    pub(crate) fn end_prefix_mapping(&mut self, prefix: &str) -> Result<(), RenderError> {
        self.sink.end_prefix_mapping(prefix)?;
        Ok(())
    }
}
