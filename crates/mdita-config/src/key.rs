//! Typed option keys.
//!
//! A [`DataKey`] names one rendering option and knows its default. The
//! default is either a constant or inherited from another key, so
//! `ESCAPE_HTML_BLOCKS` follows `ESCAPE_HTML` unless it is set itself.

use std::fmt;
use std::marker::PhantomData;

use crate::OptionSource;

/// A value stored in a configuration set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// String value.
    Str(String),
    /// Explicitly unset string.
    Null,
}

/// Type of the values an option accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Str,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Str => "string",
        })
    }
}

/// Compile-time default of an option.
#[derive(Debug, Clone, Copy)]
pub enum StaticValue {
    Bool(bool),
    Int(i64),
    Str(&'static str),
    Null,
}

impl StaticValue {
    fn to_value(self) -> OptionValue {
        match self {
            Self::Bool(b) => OptionValue::Bool(b),
            Self::Int(i) => OptionValue::Int(i),
            Self::Str(s) => OptionValue::Str(s.to_owned()),
            Self::Null => OptionValue::Null,
        }
    }
}

/// Rust types that can be stored under a [`DataKey`].
pub trait OptionType: Sized + Default {
    /// Kind used to validate untyped input.
    const KIND: ValueKind;

    /// Extract a typed value, `None` if the stored value has another type.
    fn from_value(value: &OptionValue) -> Option<Self>;

    /// Convert into a stored value.
    fn into_value(self) -> OptionValue;
}

impl OptionType for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn into_value(self) -> OptionValue {
        OptionValue::Bool(self)
    }
}

impl OptionType for i64 {
    const KIND: ValueKind = ValueKind::Int;

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn into_value(self) -> OptionValue {
        OptionValue::Int(self)
    }
}

impl OptionType for String {
    const KIND: ValueKind = ValueKind::Str;

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> OptionValue {
        OptionValue::Str(self)
    }
}

impl OptionType for Option<String> {
    const KIND: ValueKind = ValueKind::Str;

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Str(s) => Some(Some(s.clone())),
            OptionValue::Null => Some(None),
            _ => None,
        }
    }

    fn into_value(self) -> OptionValue {
        self.map_or(OptionValue::Null, OptionValue::Str)
    }
}

#[derive(Debug)]
enum KeyDefault<T: 'static> {
    Value(StaticValue),
    Inherit(&'static DataKey<T>),
}

/// Typed identifier of a rendering option.
///
/// Keys are declared as statics (see [`crate::keys`]) and read through any
/// [`OptionSource`]:
///
/// ```
/// use mdita_config::{DataSet, keys};
///
/// let options = DataSet::builder().set(&keys::ESCAPE_HTML, true).build();
/// // Inherited default follows ESCAPE_HTML.
/// assert!(keys::ESCAPE_HTML_BLOCKS.get(&options));
/// assert!(!keys::SUPPRESS_HTML.get(&options));
/// ```
#[derive(Debug)]
pub struct DataKey<T: 'static> {
    name: &'static str,
    default: KeyDefault<T>,
    _type: PhantomData<fn() -> T>,
}

impl<T: 'static> DataKey<T> {
    /// Key with a constant default.
    #[must_use]
    pub const fn new(name: &'static str, default: StaticValue) -> Self {
        Self {
            name,
            default: KeyDefault::Value(default),
            _type: PhantomData,
        }
    }

    /// Key whose default is the resolved value of `parent`.
    #[must_use]
    pub const fn inherit(name: &'static str, parent: &'static DataKey<T>) -> Self {
        Self {
            name,
            default: KeyDefault::Inherit(parent),
            _type: PhantomData,
        }
    }

    /// Option name, as used in configuration sets.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: OptionType + 'static> DataKey<T> {
    /// Resolve the option from `source`, falling back to the default.
    pub fn get<S: OptionSource + ?Sized>(&self, source: &S) -> T {
        if let Some(value) = source.lookup(self.name)
            && let Some(typed) = T::from_value(value)
        {
            return typed;
        }
        match self.default {
            KeyDefault::Value(value) => T::from_value(&value.to_value()).unwrap_or_default(),
            KeyDefault::Inherit(parent) => parent.get(source),
        }
    }
}

/// Untyped view of a key, used by the schema.
pub trait AnyKey: Sync {
    /// Option name.
    fn name(&self) -> &'static str;

    /// Accepted value kind.
    fn kind(&self) -> ValueKind;
}

impl<T: OptionType + 'static> AnyKey for DataKey<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> ValueKind {
        T::KIND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataSet;

    static BASE: DataKey<bool> = DataKey::new("BASE", StaticValue::Bool(true));
    static CHILD: DataKey<bool> = DataKey::inherit("CHILD", &BASE);
    static GRANDCHILD: DataKey<bool> = DataKey::inherit("GRANDCHILD", &CHILD);
    static LABEL: DataKey<Option<String>> = DataKey::new("LABEL", StaticValue::Null);

    #[test]
    fn test_constant_default() {
        let options = DataSet::new();
        assert!(BASE.get(&options));
        assert_eq!(LABEL.get(&options), None);
    }

    #[test]
    fn test_inherited_default_follows_parent() {
        let options = DataSet::builder().set(&BASE, false).build();
        assert!(!CHILD.get(&options));
        assert!(!GRANDCHILD.get(&options));
    }

    #[test]
    fn test_explicit_value_breaks_inheritance() {
        let options = DataSet::builder()
            .set(&BASE, false)
            .set(&CHILD, true)
            .build();
        assert!(CHILD.get(&options));
        assert!(GRANDCHILD.get(&options));
    }

    #[test]
    fn test_optional_string() {
        let options = DataSet::builder()
            .set(&LABEL, Some("bold".to_owned()))
            .build();
        assert_eq!(LABEL.get(&options), Some("bold".to_owned()));
    }

    #[test]
    fn test_value_kind_display() {
        assert_eq!(ValueKind::Int.to_string(), "integer");
        assert_eq!(<Option<String> as OptionType>::KIND, ValueKind::Str);
    }
}
