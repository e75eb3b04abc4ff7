//! The shipped features.

use super::{DescriptorBuilder, EntryPoint, Feature, Options};
use crate::accessor::Layer;
use crate::error::{OtrError, Result};
use crate::typecaster::TypeTag;
use crate::value::Value;

/// Falls back to the declared default while the store has no entry.
///
/// Once anything (including nil) has been written, the stored value wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValue;

impl Feature for DefaultValue {
    fn name(&self) -> &'static str {
        "default"
    }

    fn consume_options(&self, options: &mut Options, descriptor: &mut DescriptorBuilder) -> Result<()> {
        if let Some(value) = options.take("default") {
            descriptor.set_default(value);
        }
        Ok(())
    }

    fn entry_points(&self) -> &'static [EntryPoint] {
        &[EntryPoint::Get]
    }

    fn contribute_layer(&self, entry: EntryPoint) -> Option<Layer> {
        match entry {
            EntryPoint::Get => Some(Layer::read(|cx, next| {
                match cx.descriptor.default_value() {
                    Some(default) if !cx.store.contains(cx.descriptor.name()) => Ok(default.clone()),
                    _ => next.run(cx),
                }
            })),
            _ => None,
        }
    }
}

/// Plain storage access.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadWrite;

impl Feature for ReadWrite {
    fn name(&self) -> &'static str {
        "read_write"
    }

    fn entry_points(&self) -> &'static [EntryPoint] {
        &[EntryPoint::Get, EntryPoint::Set]
    }

    fn contribute_layer(&self, entry: EntryPoint) -> Option<Layer> {
        match entry {
            EntryPoint::Get => Some(Layer::read(|cx, next| {
                match cx.store.get(cx.descriptor.name()) {
                    Some(value) => Ok(value.clone()),
                    None => next.run(cx),
                }
            })),
            EntryPoint::Set => Some(Layer::write(|cx, value, _next| {
                cx.store.insert(cx.descriptor.name(), value);
                Ok(())
            })),
            _ => None,
        }
    }
}

/// `name?`: whether the fully resolved `Get` value is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct Query;

impl Feature for Query {
    fn name(&self) -> &'static str {
        "query"
    }

    fn entry_points(&self) -> &'static [EntryPoint] {
        &[EntryPoint::Query]
    }

    fn contribute_layer(&self, entry: EntryPoint) -> Option<Layer> {
        match entry {
            EntryPoint::Query => Some(Layer::read(|cx, _next| {
                let value = cx.model.read(cx.store, cx.descriptor.name(), EntryPoint::Get)?;
                Ok(Value::Bool(value.is_present()))
            })),
            _ => None,
        }
    }
}

/// Coerces reads through the model's typecaster for the declared `type`.
///
/// `name_before_type_cast` continues with the `Get` layers beneath this one,
/// so it sees defaults but skips coercion.
#[derive(Debug, Clone, Copy, Default)]
pub struct Typecast;

impl Feature for Typecast {
    fn name(&self) -> &'static str {
        "typecast"
    }

    fn consume_options(&self, options: &mut Options, descriptor: &mut DescriptorBuilder) -> Result<()> {
        match options.take("type") {
            None | Some(Value::Nil) => Ok(()),
            Some(Value::Str(tag)) => {
                descriptor.set_type_tag(TypeTag::new(tag));
                Ok(())
            }
            Some(other) => Err(OtrError::InvalidOption {
                attribute: descriptor.name().to_string(),
                key: "type".to_string(),
                reason: format!("expected a type tag string, got {}", other.type_name()),
            }),
        }
    }

    fn entry_points(&self) -> &'static [EntryPoint] {
        &[EntryPoint::Get, EntryPoint::GetBeforeTypeCast]
    }

    fn contribute_layer(&self, entry: EntryPoint) -> Option<Layer> {
        match entry {
            EntryPoint::Get => Some(Layer::read(|cx, next| {
                let caster = cx.model.typecaster(cx.descriptor)?;
                let raw = next.run(cx)?;
                if raw.is_nil() {
                    return Ok(raw);
                }
                let cast = caster(&raw);
                if cast.is_nil() {
                    tracing::trace!(
                        attribute = cx.descriptor.name(),
                        tag = ?cx.descriptor.type_tag(),
                        from = raw.type_name(),
                        "typecast produced nil"
                    );
                }
                Ok(cast)
            })),
            EntryPoint::GetBeforeTypeCast => Some(Layer::Delegate(EntryPoint::Get)),
            _ => None,
        }
    }
}
