//! Immutable configuration sets and scoped overlays.

use std::collections::HashMap;

use crate::key::{DataKey, OptionType, OptionValue};
use crate::{ConfigError, keys};

/// Raw option lookup by name.
pub trait OptionSource {
    /// Value stored under `name`, if any.
    fn lookup(&self, name: &str) -> Option<&OptionValue>;
}

/// Immutable mapping from option names to values.
///
/// Unset options resolve to their key's default. A `DataSet` is never
/// mutated after construction; narrow it with [`ScopedDataSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSet {
    values: HashMap<String, OptionValue>,
}

impl DataSet {
    /// Empty set (all options at their defaults).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a set.
    #[must_use]
    pub fn builder() -> DataSetBuilder {
        DataSetBuilder::default()
    }

    /// Number of explicitly set options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no option is explicitly set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl OptionSource for DataSet {
    fn lookup(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }
}

/// Builder for [`DataSet`].
#[derive(Debug, Default)]
pub struct DataSetBuilder {
    values: HashMap<String, OptionValue>,
}

impl DataSetBuilder {
    /// Set a typed option.
    #[must_use]
    pub fn set<T: OptionType + 'static>(mut self, key: &DataKey<T>, value: T) -> Self {
        self.values.insert(key.name().to_owned(), value.into_value());
        self
    }

    /// Set an option by name, validated against [`keys::SCHEMA`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownOption` for names outside the schema and
    /// `ConfigError::Validation` when the value has the wrong type.
    pub fn set_raw(mut self, name: &str, value: OptionValue) -> Result<Self, ConfigError> {
        let key = keys::find(name).ok_or_else(|| ConfigError::UnknownOption(name.to_owned()))?;
        let accepted = matches!(
            (key.kind(), &value),
            (crate::ValueKind::Bool, OptionValue::Bool(_))
                | (crate::ValueKind::Int, OptionValue::Int(_))
                | (crate::ValueKind::Str, OptionValue::Str(_) | OptionValue::Null)
        );
        if !accepted {
            return Err(ConfigError::Validation(format!(
                "{} expects a {} value",
                name.to_ascii_lowercase(),
                key.kind()
            )));
        }
        self.values.insert(name.to_owned(), value);
        Ok(self)
    }

    /// Copy every option of `other` into this builder, overriding existing values.
    #[must_use]
    pub fn extend(mut self, other: &DataSet) -> Self {
        self.values
            .extend(other.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Freeze the set.
    #[must_use]
    pub fn build(self) -> DataSet {
        DataSet {
            values: self.values,
        }
    }
}

/// A narrower scope layered over a parent source.
///
/// Lookups check `scope` first and fall back to `parent`. Neither side is
/// modified.
///
/// ```
/// use mdita_config::{DataSet, ScopedDataSet, keys};
///
/// let session = DataSet::builder().set(&keys::INDENT_SIZE, 2).build();
/// let document = DataSet::builder().set(&keys::INDENT_SIZE, 4).build();
/// let scoped = ScopedDataSet::new(&session, &document);
/// assert_eq!(keys::INDENT_SIZE.get(&scoped), 4);
/// assert_eq!(keys::INDENT_SIZE.get(&session), 2);
/// ```
#[derive(Clone, Copy)]
pub struct ScopedDataSet<'a> {
    parent: &'a dyn OptionSource,
    scope: &'a dyn OptionSource,
}

impl<'a> ScopedDataSet<'a> {
    /// Layer `scope` over `parent`.
    #[must_use]
    pub fn new(parent: &'a dyn OptionSource, scope: &'a dyn OptionSource) -> Self {
        Self { parent, scope }
    }
}

impl OptionSource for ScopedDataSet<'_> {
    fn lookup(&self, name: &str) -> Option<&OptionValue> {
        self.scope
            .lookup(name)
            .or_else(|| self.parent.lookup(name))
    }
}

impl std::fmt::Debug for ScopedDataSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedDataSet").finish_non_exhaustive()
    }
}
