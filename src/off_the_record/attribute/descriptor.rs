//! Attribute descriptors.
//!
//! A [`Descriptor`] is the frozen result of one declaration. It is built by
//! handing the declared options to every feature in order; each feature takes
//! the keys it knows and records them on a [`DescriptorBuilder`]. Whatever is
//! left afterwards is an unrecognized option and fails the declaration.

use super::{FeatureSet, Options};
use crate::accessor::Accessors;
use crate::error::{OtrError, Result};
use crate::model::ModelHandle;
use crate::permits::PermitEntry;
use crate::typecaster::TypeTag;
use crate::value::Value;

/// Immutable metadata for one declared attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    name: String,
    default: Option<Value>,
    type_tag: Option<TypeTag>,
}

impl Descriptor {
    /// Builds a descriptor by letting each feature consume its options.
    pub fn build(name: impl Into<String>, mut options: Options, features: &FeatureSet) -> Result<Self> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(OtrError::InvalidName(name));
        }

        let mut builder = DescriptorBuilder::new(name);
        for feature in features.iter() {
            feature.consume_options(&mut options, &mut builder)?;
        }

        if !options.is_empty() {
            return Err(OtrError::UnrecognizedOptions {
                attribute: builder.name,
                keys: options.keys().map(str::to_string).collect(),
            });
        }

        Ok(builder.finish())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared default. `Some(Value::Nil)` is a declared nil default,
    /// distinct from `None` (no default).
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn type_tag(&self) -> Option<&TypeTag> {
        self.type_tag.as_ref()
    }

    /// The grants implied by declaring this attribute.
    pub fn permit_filters(&self) -> Vec<PermitEntry> {
        vec![PermitEntry::name(self.name.as_str())]
    }

    /// Registers the implicit grant and installs the composed accessors.
    pub(crate) fn setup(&self, model: &mut ModelHandle, accessors: Accessors) {
        model.permit(self.permit_filters());
        model.install_accessors(self.name.clone(), accessors);
    }
}

/// Mutable staging area the features fill in while options are consumed.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    name: String,
    default: Option<Value>,
    type_tag: Option<TypeTag>,
}

impl DescriptorBuilder {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            default: None,
            type_tag: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_default(&mut self, value: Value) {
        self.default = Some(value);
    }

    pub fn set_type_tag(&mut self, tag: TypeTag) {
        self.type_tag = Some(tag);
    }

    fn finish(self) -> Descriptor {
        Descriptor {
            name: self.name,
            default: self.default,
            type_tag: self.type_tag,
        }
    }
}

/// ASCII identifier: letter or underscore first, then letters, digits, underscores.
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
