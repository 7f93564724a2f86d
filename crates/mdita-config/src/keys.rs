//! Rendering options recognised by the renderer.
//!
//! Option names are upper snake case. Configuration files use the same
//! names in lower case.

use crate::key::{AnyKey, DataKey, StaticValue};

/// Text emitted for a soft line break.
pub static SOFT_BREAK: DataKey<String> = DataKey::new("SOFT_BREAK", StaticValue::Str("\n"));
/// Markup emitted for a hard line break by HTML-flavoured providers.
pub static HARD_BREAK: DataKey<String> =
    DataKey::new("HARD_BREAK", StaticValue::Str("<br />\n"));

/// Escape raw HTML instead of passing it through.
pub static ESCAPE_HTML: DataKey<bool> = DataKey::new("ESCAPE_HTML", StaticValue::Bool(false));
pub static ESCAPE_HTML_BLOCKS: DataKey<bool> =
    DataKey::inherit("ESCAPE_HTML_BLOCKS", &ESCAPE_HTML);
pub static ESCAPE_HTML_COMMENT_BLOCKS: DataKey<bool> =
    DataKey::inherit("ESCAPE_HTML_COMMENT_BLOCKS", &ESCAPE_HTML_BLOCKS);
pub static ESCAPE_INLINE_HTML: DataKey<bool> =
    DataKey::inherit("ESCAPE_INLINE_HTML", &ESCAPE_HTML);
pub static ESCAPE_INLINE_HTML_COMMENTS: DataKey<bool> =
    DataKey::inherit("ESCAPE_INLINE_HTML_COMMENTS", &ESCAPE_INLINE_HTML);

/// Drop raw HTML from the output.
pub static SUPPRESS_HTML: DataKey<bool> = DataKey::new("SUPPRESS_HTML", StaticValue::Bool(false));
pub static SUPPRESS_HTML_BLOCKS: DataKey<bool> =
    DataKey::inherit("SUPPRESS_HTML_BLOCKS", &SUPPRESS_HTML);
pub static SUPPRESS_HTML_COMMENT_BLOCKS: DataKey<bool> =
    DataKey::inherit("SUPPRESS_HTML_COMMENT_BLOCKS", &SUPPRESS_HTML_BLOCKS);
pub static SUPPRESS_INLINE_HTML: DataKey<bool> =
    DataKey::inherit("SUPPRESS_INLINE_HTML", &SUPPRESS_HTML);
pub static SUPPRESS_INLINE_HTML_COMMENTS: DataKey<bool> =
    DataKey::inherit("SUPPRESS_INLINE_HTML_COMMENTS", &SUPPRESS_INLINE_HTML);

/// Run the heading identifier pre-pass.
pub static GENERATE_HEADER_ID: DataKey<bool> =
    DataKey::new("GENERATE_HEADER_ID", StaticValue::Bool(true));
/// Emit generated identifiers on section elements.
pub static RENDER_HEADER_ID: DataKey<bool> =
    DataKey::new("RENDER_HEADER_ID", StaticValue::Bool(false));
/// Suffix duplicate identifiers with `-1`, `-2`, ...
pub static HEADER_ID_GENERATOR_RESOLVE_DUPES: DataKey<bool> =
    DataKey::new("HEADER_ID_GENERATOR_RESOLVE_DUPES", StaticValue::Bool(true));
/// Characters converted to `-` in generated identifiers.
pub static HEADER_ID_GENERATOR_TO_DASH_CHARS: DataKey<String> =
    DataKey::new("HEADER_ID_GENERATOR_TO_DASH_CHARS", StaticValue::Str(" -_"));
/// Collapse consecutive dashes in generated identifiers.
pub static HEADER_ID_GENERATOR_NO_DUPED_DASHES: DataKey<bool> =
    DataKey::new("HEADER_ID_GENERATOR_NO_DUPED_DASHES", StaticValue::Bool(false));

/// Indentation width of serialised XML, 0 for none.
pub static INDENT_SIZE: DataKey<i64> = DataKey::new("INDENT_SIZE", StaticValue::Int(0));
/// Percent-encode link and image targets.
pub static PERCENT_ENCODE_URLS: DataKey<bool> =
    DataKey::new("PERCENT_ENCODE_URLS", StaticValue::Bool(false));
/// Maximum number of blank lines kept at the end of code blocks.
pub static MAX_TRAILING_BLANK_LINES: DataKey<i64> =
    DataKey::new("MAX_TRAILING_BLANK_LINES", StaticValue::Int(1));
/// Free-form formatting bitmask passed through to providers.
pub static FORMAT_FLAGS: DataKey<i64> = DataKey::new("FORMAT_FLAGS", StaticValue::Int(0));

/// Render link text without link markup for the whole document.
pub static DO_NOT_RENDER_LINKS: DataKey<bool> =
    DataKey::new("DO_NOT_RENDER_LINKS", StaticValue::Bool(false));
/// Use the paragraph after the title as the short description.
pub static SHORTDESC_PARAGRAPH: DataKey<bool> =
    DataKey::new("SHORTDESC_PARAGRAPH", StaticValue::Bool(false));
/// Prefix prepended to the fence language to form the code block class.
pub static FENCED_CODE_LANGUAGE_CLASS_PREFIX: DataKey<String> =
    DataKey::new("FENCED_CODE_LANGUAGE_CLASS_PREFIX", StaticValue::Str("language-"));
/// Class of code blocks without a language, empty for none.
pub static FENCED_CODE_NO_LANGUAGE_CLASS: DataKey<String> =
    DataKey::new("FENCED_CODE_NO_LANGUAGE_CLASS", StaticValue::Str(""));

/// Every recognised option.
pub static SCHEMA: &[&dyn AnyKey] = &[
    &SOFT_BREAK,
    &HARD_BREAK,
    &ESCAPE_HTML,
    &ESCAPE_HTML_BLOCKS,
    &ESCAPE_HTML_COMMENT_BLOCKS,
    &ESCAPE_INLINE_HTML,
    &ESCAPE_INLINE_HTML_COMMENTS,
    &SUPPRESS_HTML,
    &SUPPRESS_HTML_BLOCKS,
    &SUPPRESS_HTML_COMMENT_BLOCKS,
    &SUPPRESS_INLINE_HTML,
    &SUPPRESS_INLINE_HTML_COMMENTS,
    &GENERATE_HEADER_ID,
    &RENDER_HEADER_ID,
    &HEADER_ID_GENERATOR_RESOLVE_DUPES,
    &HEADER_ID_GENERATOR_TO_DASH_CHARS,
    &HEADER_ID_GENERATOR_NO_DUPED_DASHES,
    &INDENT_SIZE,
    &PERCENT_ENCODE_URLS,
    &MAX_TRAILING_BLANK_LINES,
    &FORMAT_FLAGS,
    &DO_NOT_RENDER_LINKS,
    &SHORTDESC_PARAGRAPH,
    &FENCED_CODE_LANGUAGE_CLASS_PREFIX,
    &FENCED_CODE_NO_LANGUAGE_CLASS,
];

/// Find a schema entry by option name.
#[must_use]
pub fn find(name: &str) -> Option<&'static dyn AnyKey> {
    SCHEMA.iter().copied().find(|key| key.name() == name)
}
