//! Engine-level options resolved once per session.

use mdita_config::{OptionSource, keys};

/// Options the engine itself consults, read from the session's option view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitaRendererOptions {
    /// Suppress link markup for the whole document.
    pub do_not_render_links_in_document: bool,
    pub generate_header_ids: bool,
    pub render_header_id: bool,
    /// Indentation of serialized output, in spaces.
    pub indent_size: usize,
    pub format_flags: i64,
}

impl DitaRendererOptions {
    #[must_use]
    pub fn from_options(options: &dyn OptionSource) -> Self {
        Self {
            do_not_render_links_in_document: keys::DO_NOT_RENDER_LINKS.get(options),
            generate_header_ids: keys::GENERATE_HEADER_ID.get(options),
            render_header_id: keys::RENDER_HEADER_ID.get(options),
            indent_size: usize::try_from(keys::INDENT_SIZE.get(options)).unwrap_or(0),
            format_flags: keys::FORMAT_FLAGS.get(options),
        }
    }

    /// Whether any header id support is switched on.
    #[must_use]
    pub fn header_ids_enabled(&self) -> bool {
        self.generate_header_ids || self.render_header_id
    }

    /// Initial link-suppression depth for the document node.
    #[must_use]
    pub fn document_links_nesting(&self) -> u32 {
        u32::from(self.do_not_render_links_in_document)
    }
}

impl Default for DitaRendererOptions {
    fn default() -> Self {
        Self::from_options(&mdita_config::DataSet::new())
    }
}
