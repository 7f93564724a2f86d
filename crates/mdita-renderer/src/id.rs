//! Element identifier generation.
//!
//! Identifiers are assigned in a whole-document pass before any output is
//! emitted, so collisions are resolved in document order regardless of the
//! order handlers later ask for them.

use std::collections::{HashMap, HashSet};

use mdita_config::{OptionSource, keys};

use crate::ast::{Document, NodeId, NodeKind};

/// Assigns identifiers to nodes of one document.
pub trait IdGenerator {
    /// Visit the whole document and record identifiers.
    fn generate_ids(&mut self, document: &Document);

    /// Identifier recorded for `node`, if any.
    fn id(&self, node: NodeId) -> Option<&str>;
}

/// Builds an [`IdGenerator`] for a session's option view.
pub trait IdGeneratorFactory: Send + Sync {
    fn create(&self, options: &dyn OptionSource) -> Box<dyn IdGenerator>;
}

/// Generator that assigns nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIdGenerator;

impl IdGenerator for NullIdGenerator {
    fn generate_ids(&mut self, _document: &Document) {}

    fn id(&self, _node: NodeId) -> Option<&str> {
        None
    }
}

/// Heading identifiers derived from the heading text.
///
/// An explicit `{#id}` attribute is used as is. Otherwise letters and
/// digits are kept lower-cased, characters listed in
/// `HEADER_ID_GENERATOR_TO_DASH_CHARS` become `-` and everything else is
/// dropped. With `HEADER_ID_GENERATOR_RESOLVE_DUPES`, generated ids that
/// repeat an earlier one, or any explicit id in the document, get `-1`,
/// `-2`, ... suffixes.
#[derive(Debug, Clone)]
pub struct HeaderIdGenerator {
    resolve_dupes: bool,
    to_dash_chars: String,
    no_duped_dashes: bool,
    ids: HashMap<NodeId, String>,
}

impl HeaderIdGenerator {
    #[must_use]
    pub fn new(options: &dyn OptionSource) -> Self {
        Self {
            resolve_dupes: keys::HEADER_ID_GENERATOR_RESOLVE_DUPES.get(options),
            to_dash_chars: keys::HEADER_ID_GENERATOR_TO_DASH_CHARS.get(options),
            no_duped_dashes: keys::HEADER_ID_GENERATOR_NO_DUPED_DASHES.get(options),
            ids: HashMap::new(),
        }
    }

    /// Slug for a heading text.
    #[must_use]
    pub fn slug(&self, text: &str) -> String {
        let mut slug = String::with_capacity(text.len());
        for c in text.trim().chars() {
            if c.is_alphanumeric() {
                slug.extend(c.to_lowercase());
            } else if self.to_dash_chars.contains(c)
                && !(self.no_duped_dashes && slug.ends_with('-'))
            {
                slug.push('-');
            }
        }
        slug
    }

    /// Number of identifiers assigned by the last pass.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl IdGenerator for HeaderIdGenerator {
    fn generate_ids(&mut self, document: &Document) {
        self.ids.clear();

        // Explicit ids are reserved first so generated slugs step around them.
        let mut used: HashSet<String> = document
            .descendants()
            .filter_map(|node| match node.kind() {
                NodeKind::Heading { id: Some(id), .. } => Some(id.clone()),
                _ => None,
            })
            .collect();
        let mut visited = 0_usize;

        for node in document.descendants() {
            visited += 1;
            let NodeKind::Heading { id: explicit, .. } = node.kind() else {
                continue;
            };
            if let Some(id) = explicit {
                self.ids.insert(node.id(), id.clone());
                continue;
            }
            let base = self.slug(&node.text_content());
            if base.is_empty() {
                continue;
            }

            let mut id = base.clone();
            if self.resolve_dupes {
                let mut suffix = 1_usize;
                while used.contains(&id) {
                    id = format!("{base}-{suffix}");
                    suffix += 1;
                }
            }
            used.insert(id.clone());
            self.ids.insert(node.id(), id);
        }

        tracing::debug!(nodes = visited, ids = self.ids.len(), "Generated header ids");
    }

    fn id(&self, node: NodeId) -> Option<&str> {
        self.ids.get(&node).map(String::as_str)
    }
}

/// Factory for [`HeaderIdGenerator`].
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderIdGeneratorFactory;

impl IdGeneratorFactory for HeaderIdGeneratorFactory {
    fn create(&self, options: &dyn OptionSource) -> Box<dyn IdGenerator> {
        Box::new(HeaderIdGenerator::new(options))
    }
}
