//! # Model Handles
//!
//! A [`ModelHandle`] is the per-model registry of declared attributes. It is
//! built in two phases:
//!
//! 1. **Setup**: with `&mut ModelHandle`, attributes are declared, explicit
//!    permits granted and typecasters overridden. Each declaration composes
//!    its accessor chains immediately, so errors surface at the declaring
//!    call.
//! 2. **Use**: the handle is frozen behind an `Arc` and shared by every
//!    [`Record`](crate::record::Record) of the model. Nothing mutates it
//!    afterwards.
//!
//! The handle also owns the model's copy of the typecaster table; overriding
//! a tag here never leaks into other models.
//!
//! Host setters are plain writers registered outside the declaration system.
//! Mass assignment reaches them for keys that name no declared attribute.
//! They get no accessor chains and no permit entry.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::accessor::{Accessors, ReadCx, WriteCx};
use crate::attribute::{is_valid_name, Descriptor, EntryPoint, FeatureSet, Options};
use crate::error::{OtrError, Result};
use crate::permits::{PermitEntry, PermitSet};
use crate::record::AttributeStore;
use crate::typecaster::{self, TypeTag, Typecaster, Typecasters};
use crate::value::Value;

/// A setter the host defines itself, writing straight to the store.
pub type HostSetter = Arc<dyn Fn(&mut AttributeStore, Value) -> Result<()> + Send + Sync>;

#[derive(Clone, Default)]
struct HostSetters(IndexMap<String, HostSetter>);

impl fmt::Debug for HostSetters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

#[derive(Debug, Clone)]
pub struct ModelHandle {
    name: String,
    param_key: Option<String>,
    features: FeatureSet,
    attributes: IndexMap<String, Arc<Descriptor>>,
    accessors: HashMap<String, Accessors>,
    permits: PermitSet,
    typecasters: Typecasters,
    host_setters: HostSetters,
}

impl ModelHandle {
    /// A handle using the standard feature set.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_features(name, FeatureSet::standard())
    }

    pub fn with_features(name: impl Into<String>, features: FeatureSet) -> Self {
        Self {
            name: name.into(),
            param_key: None,
            features,
            attributes: IndexMap::new(),
            accessors: HashMap::new(),
            permits: PermitSet::new(),
            typecasters: Typecasters::defaults().clone(),
            host_setters: HostSetters::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key mass-assignment input is scoped under. Defaults to the model name.
    pub fn param_key(&self) -> &str {
        self.param_key.as_deref().unwrap_or(&self.name)
    }

    pub fn set_param_key(&mut self, key: impl Into<String>) -> &mut Self {
        self.param_key = Some(key.into());
        self
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Declares an attribute.
    pub fn attribute(&mut self, name: impl Into<String>, options: Options) -> Result<Arc<Descriptor>> {
        let descriptor = Arc::new(Descriptor::build(name, options, &self.features)?);
        self.add_attribute(Arc::clone(&descriptor))?;
        tracing::debug!(
            model = %self.name,
            attribute = descriptor.name(),
            type_tag = ?descriptor.type_tag(),
            has_default = descriptor.has_default(),
            "declared attribute"
        );
        Ok(descriptor)
    }

    /// Registers a built descriptor and installs its accessors.
    pub fn add_attribute(&mut self, descriptor: Arc<Descriptor>) -> Result<()> {
        if self.is_taken(descriptor.name()) {
            return Err(OtrError::DuplicateAttribute(descriptor.name().to_string()));
        }
        let accessors = self.features.materialize()?;
        self.attributes
            .insert(descriptor.name().to_string(), Arc::clone(&descriptor));
        descriptor.setup(self, accessors);
        Ok(())
    }

    /// Registers a setter for `name` that mass assignment falls back to.
    ///
    /// The name is not permitted for untrusted input unless granted through
    /// [`permit`](Self::permit).
    pub fn host_setter<F>(&mut self, name: impl Into<String>, setter: F) -> Result<&mut Self>
    where
        F: Fn(&mut AttributeStore, Value) -> Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(OtrError::InvalidName(name));
        }
        if self.is_taken(&name) {
            return Err(OtrError::DuplicateAttribute(name));
        }
        tracing::debug!(model = %self.name, setter = %name, "registered host setter");
        self.host_setters.0.insert(name, Arc::new(setter));
        Ok(self)
    }

    pub(crate) fn host_setter_for(&self, name: &str) -> Option<&HostSetter> {
        self.host_setters.0.get(name)
    }

    fn is_taken(&self, name: &str) -> bool {
        self.attributes.contains_key(name) || self.host_setters.0.contains_key(name)
    }

    pub fn descriptor(&self, name: &str) -> Option<&Arc<Descriptor>> {
        self.attributes.get(name)
    }

    /// Declared attributes, in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = &Arc<Descriptor>> {
        self.attributes.values()
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Grants extra mass-assignment entries on top of the declared names.
    pub fn permit<I>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<PermitEntry>,
    {
        let entries: Vec<PermitEntry> = entries.into_iter().map(Into::into).collect();
        tracing::debug!(
            model = %self.name,
            keys = ?entries.iter().map(PermitEntry::key).collect::<Vec<_>>(),
            "granted permits"
        );
        self.permits.add_filters(entries);
        self
    }

    pub fn permits(&self) -> &PermitSet {
        &self.permits
    }

    pub fn permit_filters(&self) -> Vec<PermitEntry> {
        self.permits.to_permit_filters()
    }

    pub fn typecasters(&self) -> &Typecasters {
        &self.typecasters
    }

    /// Overrides or adds a typecaster for this model only.
    pub fn register_typecaster(&mut self, tag: impl Into<TypeTag>, caster: Typecaster) -> &mut Self {
        self.typecasters.insert(tag.into(), caster);
        self
    }

    /// The typecaster for `descriptor`'s tag; identity when it has none.
    pub fn typecaster(&self, descriptor: &Descriptor) -> Result<Typecaster> {
        match descriptor.type_tag() {
            None => Ok(typecaster::identity()),
            Some(tag) => self
                .typecasters
                .get(tag)
                .cloned()
                .ok_or_else(|| OtrError::UnknownTypeTag {
                    attribute: descriptor.name().to_string(),
                    tag: tag.clone(),
                }),
        }
    }

    /// Maps a method name to an attribute and entry point.
    ///
    /// A declared attribute name is always its own getter, so a name that
    /// happens to end in `?` or `=` can't be shadowed by suffix parsing.
    pub fn resolve_method<'m>(&self, method: &'m str) -> Option<(&'m str, EntryPoint)> {
        if self.has_entry(method, EntryPoint::Get) {
            return Some((method, EntryPoint::Get));
        }
        let (attribute, entry) = EntryPoint::parse_method(method);
        self.has_entry(attribute, entry).then_some((attribute, entry))
    }

    pub fn responds_to(&self, method: &str) -> bool {
        self.resolve_method(method).is_some()
    }

    fn has_entry(&self, attribute: &str, entry: EntryPoint) -> bool {
        self.accessors
            .get(attribute)
            .is_some_and(|accessors| accessors.contains(entry))
    }

    pub(crate) fn install_accessors(&mut self, attribute: String, accessors: Accessors) {
        self.accessors.insert(attribute, accessors);
    }

    fn lookup(&self, attribute: &str) -> Result<(&Descriptor, &Accessors)> {
        match (self.attributes.get(attribute), self.accessors.get(attribute)) {
            (Some(descriptor), Some(accessors)) => Ok((descriptor.as_ref(), accessors)),
            _ => Err(OtrError::UnknownAttribute {
                model: self.name.clone(),
                attribute: attribute.to_string(),
            }),
        }
    }

    /// Runs a read entry point for `attribute` against `store`.
    pub(crate) fn read(&self, store: &AttributeStore, attribute: &str, entry: EntryPoint) -> Result<Value> {
        let (descriptor, accessors) = self.lookup(attribute)?;
        let chain = accessors.get(entry).ok_or_else(|| OtrError::NoAccessor {
            attribute: attribute.to_string(),
            entry,
        })?;
        chain.read(&ReadCx {
            model: self,
            descriptor,
            store,
        })
    }

    /// Runs the `Set` entry point for `attribute` against `store`.
    pub(crate) fn write(&self, store: &mut AttributeStore, attribute: &str, value: Value) -> Result<()> {
        let (descriptor, accessors) = self.lookup(attribute)?;
        let chain = accessors
            .get(EntryPoint::Set)
            .ok_or_else(|| OtrError::NoAccessor {
                attribute: attribute.to_string(),
                entry: EntryPoint::Set,
            })?;
        chain.write(
            &mut WriteCx {
                model: self,
                descriptor,
                store,
            },
            value,
        )
    }
}
