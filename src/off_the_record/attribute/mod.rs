//! # Attribute System
//!
//! An attribute is declared once per model with a name and an option map:
//!
//! ```ignore
//! model.attribute("count", Options::new().with_type("integer").with_default(0))?;
//! ```
//!
//! What an attribute *does* is not hard-coded. It is the sum of an ordered
//! [`FeatureSet`], where every [`Feature`] contributes two things:
//!
//! - **Option consumption**: at declaration the feature removes the option keys
//!   it understands and records them on the [`DescriptorBuilder`]. Keys left
//!   over after every feature has run are rejected.
//! - **Accessor layers**: for each [`EntryPoint`] it names, the feature
//!   contributes one layer of that entry point's chain (see [`crate::accessor`]).
//!
//! ## Shipped Features
//!
//! | Order | Feature | Options | Entry points |
//! |-------|---------|---------|--------------|
//! | 1 | [`DefaultValue`] | `default` | `Get` |
//! | 2 | [`ReadWrite`] | | `Get`, `Set` |
//! | 3 | [`Query`] | | `Query` |
//! | 4 | [`Typecast`] | `type` | `Get`, `GetBeforeTypeCast` |
//!
//! Later features wrap earlier ones: a `Get` runs `Typecast`, then
//! `ReadWrite`, then `DefaultValue`, then the backing store.
//!
//! ## Entry Points and Method Names
//!
//! | Entry point | Method name |
//! |-------------|-------------|
//! | `Get` | `name` |
//! | `Set` | `name=` |
//! | `Query` | `name?` |
//! | `GetBeforeTypeCast` | `name_before_type_cast` |

mod descriptor;
mod features;

pub use descriptor::{Descriptor, DescriptorBuilder};
pub(crate) use descriptor::is_valid_name;
pub use features::{DefaultValue, Query, ReadWrite, Typecast};

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::accessor::{self, Accessors, Layer};
use crate::error::Result;
use crate::typecaster::TypeTag;
use crate::value::Value;

/// A named accessor every attribute may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryPoint {
    Get,
    Set,
    Query,
    GetBeforeTypeCast,
}

const BEFORE_TYPE_CAST_SUFFIX: &str = "_before_type_cast";

impl EntryPoint {
    pub const ALL: [EntryPoint; 4] = [
        EntryPoint::Get,
        EntryPoint::Set,
        EntryPoint::Query,
        EntryPoint::GetBeforeTypeCast,
    ];

    pub fn is_write(self) -> bool {
        matches!(self, EntryPoint::Set)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryPoint::Get => "get",
            EntryPoint::Set => "set",
            EntryPoint::Query => "query",
            EntryPoint::GetBeforeTypeCast => "get_before_type_cast",
        }
    }

    /// The accessor method name for `attribute` at this entry point.
    pub fn method_name(self, attribute: &str) -> String {
        match self {
            EntryPoint::Get => attribute.to_string(),
            EntryPoint::Set => format!("{}=", attribute),
            EntryPoint::Query => format!("{}?", attribute),
            EntryPoint::GetBeforeTypeCast => format!("{}{}", attribute, BEFORE_TYPE_CAST_SUFFIX),
        }
    }

    /// Splits a method name into attribute name and entry point.
    ///
    /// Anything without a recognized suffix is a plain `Get`.
    pub fn parse_method(method: &str) -> (&str, EntryPoint) {
        if let Some(attr) = method.strip_suffix(BEFORE_TYPE_CAST_SUFFIX) {
            (attr, EntryPoint::GetBeforeTypeCast)
        } else if let Some(attr) = method.strip_suffix('=') {
            (attr, EntryPoint::Set)
        } else if let Some(attr) = method.strip_suffix('?') {
            (attr, EntryPoint::Query)
        } else {
            (method, EntryPoint::Get)
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration options, consumed key by key by the active features.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    entries: IndexMap<String, Value>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `default` option.
    pub fn with_default(self, value: impl Into<Value>) -> Self {
        self.with("default", value)
    }

    /// Sets the `type` option.
    pub fn with_type(self, tag: impl Into<TypeTag>) -> Self {
        let tag: TypeTag = tag.into();
        self.with("type", tag.as_str())
    }

    /// Sets an arbitrary option key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Removes and returns `key`, marking it as handled.
    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A composable unit of attribute behaviour.
pub trait Feature: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Takes the option keys this feature understands out of `options`.
    fn consume_options(
        &self,
        _options: &mut Options,
        _descriptor: &mut DescriptorBuilder,
    ) -> Result<()> {
        Ok(())
    }

    /// Entry points this feature takes part in.
    fn entry_points(&self) -> &'static [EntryPoint] {
        &[]
    }

    /// This feature's layer for `entry`. `None` passes the entry point through.
    fn contribute_layer(&self, _entry: EntryPoint) -> Option<Layer> {
        None
    }
}

/// The ordered features a model composes. Later features wrap earlier ones.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    features: Vec<Arc<dyn Feature>>,
}

impl FeatureSet {
    pub fn new(features: Vec<Arc<dyn Feature>>) -> Self {
        Self { features }
    }

    /// Default, read/write, query and typecast, in that order.
    pub fn standard() -> Self {
        Self::new(vec![
            Arc::new(DefaultValue),
            Arc::new(ReadWrite),
            Arc::new(Query),
            Arc::new(Typecast),
        ])
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<dyn Feature>> {
        self.features.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(|f| f.name()).collect()
    }

    /// Every entry point some feature takes part in, in [`EntryPoint::ALL`] order.
    pub fn entry_points(&self) -> Vec<EntryPoint> {
        EntryPoint::ALL
            .into_iter()
            .filter(|entry| {
                self.features
                    .iter()
                    .any(|f| f.entry_points().contains(entry))
            })
            .collect()
    }

    /// Composes one chain per entry point.
    pub(crate) fn materialize(&self) -> Result<Accessors> {
        let mut accessors = Accessors::default();
        for entry in self.entry_points() {
            accessors.insert(entry, accessor::compose(&self.features, entry)?);
        }
        Ok(accessors)
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::standard()
    }
}
