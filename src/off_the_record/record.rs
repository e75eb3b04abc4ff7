//! Model instances.
//!
//! A [`Record`] pairs a shared [`ModelHandle`] with its own
//! [`AttributeStore`]. Every read and write goes through the accessor chains
//! the handle composed at declaration; the store only ever sees what the
//! innermost layers hand it.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::attribute::EntryPoint;
use crate::error::{OtrError, Result};
use crate::input::PermittedInput;
use crate::model::ModelHandle;
use crate::value::{Params, Value};

/// Raw attribute values of one record, keyed by attribute name.
///
/// A missing key and a stored `Nil` are different states: the default layer
/// only applies to the former.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
    values: IndexMap<String, Value>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    model: Arc<ModelHandle>,
    store: AttributeStore,
}

impl Record {
    pub fn new(model: Arc<ModelHandle>) -> Self {
        Self {
            model,
            store: AttributeStore::new(),
        }
    }

    /// A record with `params` mass-assigned. `None` is an empty record.
    pub fn with_params(model: Arc<ModelHandle>, params: Option<&Params>) -> Result<Self> {
        let mut record = Self::new(model);
        record.assign(params)?;
        Ok(record)
    }

    /// A record built from untrusted input, filtered through the permit list.
    pub fn from_input(model: Arc<ModelHandle>, input: &dyn PermittedInput) -> Result<Self> {
        let mut record = Self::new(model);
        record.assign_from_input(input)?;
        Ok(record)
    }

    pub fn model(&self) -> &Arc<ModelHandle> {
        &self.model
    }

    /// The raw backing store, bypassing every accessor layer.
    pub fn attributes(&self) -> &AttributeStore {
        &self.store
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        self.model.read(&self.store, name, EntryPoint::Get)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.model.write(&mut self.store, name, value.into())
    }

    pub fn query(&self, name: &str) -> Result<bool> {
        Ok(self
            .model
            .read(&self.store, name, EntryPoint::Query)?
            .is_present())
    }

    pub fn get_before_type_cast(&self, name: &str) -> Result<Value> {
        self.model
            .read(&self.store, name, EntryPoint::GetBeforeTypeCast)
    }

    pub fn respond_to(&self, method: &str) -> bool {
        self.model.responds_to(method)
    }

    /// Calls an accessor by method name (`first`, `first=`, `first?`,
    /// `first_before_type_cast`).
    ///
    /// Setters return the assigned value; a missing argument assigns nil.
    /// Readers ignore `arg`.
    pub fn invoke(&mut self, method: &str, arg: Option<Value>) -> Result<Value> {
        let (attribute, entry) = match self.model.resolve_method(method) {
            Some(resolved) => resolved,
            None => {
                let (attribute, entry) = EntryPoint::parse_method(method);
                return Err(if self.model.descriptor(attribute).is_some() {
                    OtrError::NoAccessor {
                        attribute: attribute.to_string(),
                        entry,
                    }
                } else {
                    OtrError::UnknownAttribute {
                        model: self.model.name().to_string(),
                        attribute: method.to_string(),
                    }
                });
            }
        };

        if entry.is_write() {
            let value = arg.unwrap_or_default();
            self.model.write(&mut self.store, attribute, value.clone())?;
            Ok(value)
        } else {
            self.model.read(&self.store, attribute, entry)
        }
    }

    /// Applies each pair through the setter, in input order. `None` is a no-op.
    ///
    /// Keys naming no declared attribute go to the model's host setter of
    /// that name, if any.
    pub fn assign(&mut self, params: Option<&Params>) -> Result<()> {
        let Some(params) = params else {
            return Ok(());
        };
        for (name, value) in params {
            if self.model.descriptor(name).is_none() {
                if let Some(setter) = self.model.host_setter_for(name) {
                    setter(&mut self.store, value.clone())?;
                    continue;
                }
            }
            self.set(name, value.clone())?;
        }
        Ok(())
    }

    /// Mass-assigns from untrusted input under the model's permit list.
    pub fn assign_from_input(&mut self, input: &dyn PermittedInput) -> Result<()> {
        let grants = self.model.permit_filters();
        let params = input.require_permitted(self.model.param_key(), &grants)?;
        tracing::debug!(
            model = %self.model.name(),
            param_key = self.model.param_key(),
            keys = ?params.keys().collect::<Vec<_>>(),
            "mass assignment"
        );
        self.assign(Some(&params))
    }

    /// Every declared attribute's coerced value, in declaration order.
    pub fn to_params(&self) -> Result<Params> {
        self.model
            .attributes()
            .map(|d| Ok((d.name().to_string(), self.get(d.name())?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Options;

    fn model() -> Arc<ModelHandle> {
        let mut model = ModelHandle::new("TestModel");
        model.attribute("first", Options::new()).unwrap();
        model
            .attribute("count", Options::new().with_type("integer").with_default("7"))
            .unwrap();
        Arc::new(model)
    }

    #[test]
    fn store_separates_missing_from_nil() {
        let mut record = Record::new(model());
        assert!(!record.attributes().contains("first"));
        record.set("first", Value::Nil).unwrap();
        assert!(record.attributes().contains("first"));
        assert_eq!(record.get("first").unwrap(), Value::Nil);
    }

    #[test]
    fn default_is_cast_but_raw_read_is_not() {
        let record = Record::new(model());
        assert_eq!(record.get("count").unwrap(), Value::Int(7));
        assert_eq!(record.get_before_type_cast("count").unwrap(), Value::from("7"));
        assert!(record.attributes().is_empty());
    }

    #[test]
    fn invoke_dispatches_by_method_name() {
        let mut record = Record::new(model());
        assert_eq!(
            record.invoke("count=", Some(Value::from("12"))).unwrap(),
            Value::from("12")
        );
        assert_eq!(record.invoke("count", None).unwrap(), Value::Int(12));
        assert_eq!(record.invoke("count?", None).unwrap(), Value::Bool(true));
        assert_eq!(
            record.invoke("count_before_type_cast", None).unwrap(),
            Value::from("12")
        );
        assert!(record.respond_to("first?"));
    }

    #[test]
    fn invoke_unknown_method_fails() {
        let mut record = Record::new(model());
        let err = record.invoke("missing", None).unwrap_err();
        assert!(matches!(err, OtrError::UnknownAttribute { ref attribute, .. } if attribute == "missing"));
    }

    #[test]
    fn assign_none_is_a_no_op() {
        let mut record = Record::new(model());
        record.assign(None).unwrap();
        assert!(record.attributes().is_empty());
    }

    #[test]
    fn assign_unknown_key_fails() {
        let mut params = Params::new();
        params.insert("nope".into(), Value::from(1));
        let err = Record::with_params(model(), Some(&params)).unwrap_err();
        assert!(matches!(err, OtrError::UnknownAttribute { .. }));
    }

    fn hooked_model() -> Arc<ModelHandle> {
        let mut model = ModelHandle::new("TestModel");
        model.attribute("first", Options::new()).unwrap();
        model
            .host_setter("bypassing", |store: &mut AttributeStore, value| {
                store.insert("bypassing", value);
                Ok(())
            })
            .unwrap();
        Arc::new(model)
    }

    #[test]
    fn with_params_reaches_host_setter() {
        let mut params = Params::new();
        params.insert("first".into(), Value::from("Ada"));
        params.insert("bypassing".into(), Value::from(5));
        let record = Record::with_params(hooked_model(), Some(&params)).unwrap();
        assert_eq!(record.attributes().get("bypassing"), Some(&Value::Int(5)));
        assert_eq!(record.get("first").unwrap(), Value::from("Ada"));
    }

    #[test]
    fn assign_reaches_host_setter() {
        let mut record = Record::new(hooked_model());
        let mut params = Params::new();
        params.insert("bypassing".into(), Value::from(5));
        record.assign(Some(&params)).unwrap();
        assert_eq!(record.attributes().get("bypassing"), Some(&Value::Int(5)));
        assert!(!record.respond_to("bypassing"));
    }

    #[test]
    fn host_setter_errors_propagate() {
        let mut model = ModelHandle::new("TestModel");
        model
            .host_setter("strict", |_: &mut AttributeStore, _| Err(OtrError::InvalidName("strict".into())))
            .unwrap();
        let mut params = Params::new();
        params.insert("strict".into(), Value::Nil);
        assert!(Record::with_params(Arc::new(model), Some(&params)).is_err());
    }

    #[test]
    fn to_params_lists_every_attribute() {
        let mut record = Record::new(model());
        record.set("first", "Ada").unwrap();
        let params = record.to_params().unwrap();
        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["first", "count"]);
        assert_eq!(params["count"], Value::Int(7));
    }
}
