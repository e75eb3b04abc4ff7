//! Mass-assignment allow-list.
//!
//! A [`PermitSet`] accumulates the names a model accepts from untrusted
//! input. Declaring an attribute grants its bare name; `ModelHandle::permit`
//! adds explicit grants on top. The rendered list is handed to the input
//! sanitizer unchanged.

use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One grant: a bare name, or a name whose value is a nested shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermitEntry {
    Name(String),
    Nested(String, Vec<PermitEntry>),
}

impl PermitEntry {
    pub fn name(name: impl Into<String>) -> Self {
        PermitEntry::Name(name.into())
    }

    pub fn nested(name: impl Into<String>, entries: Vec<PermitEntry>) -> Self {
        PermitEntry::Nested(name.into(), entries)
    }

    pub fn key(&self) -> &str {
        match self {
            PermitEntry::Name(name) | PermitEntry::Nested(name, _) => name,
        }
    }
}

impl From<&str> for PermitEntry {
    fn from(name: &str) -> Self {
        PermitEntry::name(name)
    }
}

impl From<String> for PermitEntry {
    fn from(name: String) -> Self {
        PermitEntry::Name(name)
    }
}

/// Accumulated grants, kept in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermitSet {
    grants: IndexMap<String, Option<PermitSet>>,
}

impl PermitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.grants.contains_key(name)
    }

    /// Nested grants recorded under `name`, if it was granted with a shape.
    pub fn nested(&self, name: &str) -> Option<&PermitSet> {
        self.grants.get(name).and_then(Option::as_ref)
    }

    /// Merges `entries` into the set.
    ///
    /// - A bare name is idempotent and never replaces an existing nested grant.
    /// - A nested entry merges into the nested list already recorded under its
    ///   name; inside that list a re-specified key takes the new value.
    pub fn add_filters<I>(&mut self, entries: I)
    where
        I: IntoIterator,
        I::Item: Into<PermitEntry>,
    {
        for entry in entries {
            match entry.into() {
                PermitEntry::Name(name) => {
                    self.grants.entry(name).or_insert(None);
                }
                PermitEntry::Nested(name, nested) => {
                    let slot = self.grants.entry(name).or_insert(None);
                    let set = slot.get_or_insert_with(PermitSet::new);
                    for inner in nested {
                        set.overwrite(inner);
                    }
                }
            }
        }
    }

    fn overwrite(&mut self, entry: PermitEntry) {
        match entry {
            PermitEntry::Name(name) => {
                self.grants.insert(name, None);
            }
            PermitEntry::Nested(name, nested) => {
                let mut set = PermitSet::new();
                for inner in nested {
                    set.overwrite(inner);
                }
                self.grants.insert(name, Some(set));
            }
        }
    }

    /// Renders the grants back into entry form, in first-insertion order.
    pub fn to_permit_filters(&self) -> Vec<PermitEntry> {
        self.grants
            .iter()
            .map(|(name, nested)| match nested {
                None => PermitEntry::Name(name.clone()),
                Some(set) => PermitEntry::Nested(name.clone(), set.to_permit_filters()),
            })
            .collect()
    }
}

impl<T: Into<PermitEntry>> FromIterator<T> for PermitSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = PermitSet::new();
        set.add_filters(iter);
        set
    }
}

// `"name"` or `{"name": [...]}`, the shape strong-parameter filters use.
impl Serialize for PermitEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PermitEntry::Name(name) => serializer.serialize_str(name),
            PermitEntry::Nested(name, nested) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(name, nested)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for PermitEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntryVisitor;

        impl<'de> Visitor<'de> for EntryVisitor {
            type Value = PermitEntry;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a name or a single-key map of name to entries")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<PermitEntry, E> {
                Ok(PermitEntry::name(v))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PermitEntry, A::Error> {
                let (name, nested): (String, Vec<PermitEntry>) = map
                    .next_entry()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                if map.next_key::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::custom("nested permit must have exactly one key"));
                }
                Ok(PermitEntry::Nested(name, nested))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, _seq: A) -> Result<PermitEntry, A::Error> {
                Err(de::Error::invalid_type(de::Unexpected::Seq, &self))
            }
        }

        deserializer.deserialize_any(EntryVisitor)
    }
}
