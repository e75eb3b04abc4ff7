//! Accessor chains.
//!
//! Every entry point of an attribute is served by a chain of layers, one per
//! participating feature, composed once when the attribute is declared. The
//! last feature in the set is the outermost layer. A layer receives the call
//! context plus a [`Next`] (or [`WriteNext`]) handle and decides whether to
//! continue inward; when the layers run out the chain falls through to the
//! backing store.
//!
//! A feature may also answer with [`Layer::Delegate`]: the entry point then
//! continues with the *target* entry point's layers from the features
//! beneath it. `name_before_type_cast` is built this way, as "`Get` minus
//! the typecast layer".

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::attribute::{Descriptor, EntryPoint, Feature};
use crate::error::{OtrError, Result};
use crate::model::ModelHandle;
use crate::record::AttributeStore;
use crate::value::Value;

pub type ReadLayer = Arc<dyn Fn(&ReadCx<'_>, Next<'_>) -> Result<Value> + Send + Sync>;
pub type WriteLayer = Arc<dyn Fn(&mut WriteCx<'_>, Value, WriteNext<'_>) -> Result<()> + Send + Sync>;

/// What a feature contributes to one entry point.
#[derive(Clone)]
pub enum Layer {
    Read(ReadLayer),
    Write(WriteLayer),
    /// Continue with this entry point's layers from the features beneath.
    Delegate(EntryPoint),
}

impl Layer {
    pub fn read<F>(f: F) -> Self
    where
        F: Fn(&ReadCx<'_>, Next<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        Layer::Read(Arc::new(f))
    }

    pub fn write<F>(f: F) -> Self
    where
        F: Fn(&mut WriteCx<'_>, Value, WriteNext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Layer::Write(Arc::new(f))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Read(_) => "read",
            Layer::Write(_) => "write",
            Layer::Delegate(_) => "delegate",
        }
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Delegate(target) => f.debug_tuple("Delegate").field(target).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// Context handed to read layers.
pub struct ReadCx<'a> {
    pub model: &'a ModelHandle,
    pub descriptor: &'a Descriptor,
    pub store: &'a AttributeStore,
}

/// Context handed to write layers.
pub struct WriteCx<'a> {
    pub model: &'a ModelHandle,
    pub descriptor: &'a Descriptor,
    pub store: &'a mut AttributeStore,
}

/// The rest of a read chain.
#[derive(Clone, Copy)]
pub struct Next<'c> {
    layers: &'c [ReadLayer],
    base: EntryPoint,
}

impl Next<'_> {
    pub fn run(self, cx: &ReadCx<'_>) -> Result<Value> {
        match self.layers.split_first() {
            Some((layer, rest)) => layer(
                cx,
                Next {
                    layers: rest,
                    base: self.base,
                },
            ),
            None => Ok(base_read(cx, self.base)),
        }
    }
}

/// The rest of a write chain.
#[derive(Clone, Copy)]
pub struct WriteNext<'c> {
    layers: &'c [WriteLayer],
}

impl WriteNext<'_> {
    pub fn run(self, cx: &mut WriteCx<'_>, value: Value) -> Result<()> {
        match self.layers.split_first() {
            Some((layer, rest)) => layer(cx, value, WriteNext { layers: rest }),
            None => {
                cx.store.insert(cx.descriptor.name(), value);
                Ok(())
            }
        }
    }
}

fn base_read(cx: &ReadCx<'_>, base: EntryPoint) -> Value {
    let stored = cx.store.get(cx.descriptor.name());
    match base {
        EntryPoint::Query => Value::Bool(stored.is_some_and(Value::is_present)),
        _ => stored.cloned().unwrap_or_default(),
    }
}

/// A composed chain for one entry point, outermost layer first.
#[derive(Clone)]
pub enum Chain {
    Read { layers: Vec<ReadLayer>, base: EntryPoint },
    Write { layers: Vec<WriteLayer> },
}

impl Chain {
    pub fn depth(&self) -> usize {
        match self {
            Chain::Read { layers, .. } => layers.len(),
            Chain::Write { layers } => layers.len(),
        }
    }

    pub fn read(&self, cx: &ReadCx<'_>) -> Result<Value> {
        match self {
            Chain::Read { layers, base } => Next {
                layers,
                base: *base,
            }
            .run(cx),
            Chain::Write { .. } => Err(OtrError::NoAccessor {
                attribute: cx.descriptor.name().to_string(),
                entry: EntryPoint::Get,
            }),
        }
    }

    pub fn write(&self, cx: &mut WriteCx<'_>, value: Value) -> Result<()> {
        match self {
            Chain::Write { layers } => WriteNext { layers }.run(cx, value),
            Chain::Read { .. } => Err(OtrError::NoAccessor {
                attribute: cx.descriptor.name().to_string(),
                entry: EntryPoint::Set,
            }),
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Read { layers, base } => f
                .debug_struct("Read")
                .field("layers", &layers.len())
                .field("base", base)
                .finish(),
            Chain::Write { layers } => f
                .debug_struct("Write")
                .field("layers", &layers.len())
                .finish(),
        }
    }
}

/// The composed chains of one attribute, keyed by entry point.
#[derive(Debug, Clone, Default)]
pub struct Accessors {
    chains: HashMap<EntryPoint, Chain>,
}

impl Accessors {
    pub fn insert(&mut self, entry: EntryPoint, chain: Chain) {
        self.chains.insert(entry, chain);
    }

    pub fn get(&self, entry: EntryPoint) -> Option<&Chain> {
        self.chains.get(&entry)
    }

    pub fn contains(&self, entry: EntryPoint) -> bool {
        self.chains.contains_key(&entry)
    }

    /// Exposed entry points, in [`EntryPoint::ALL`] order.
    pub fn entry_points(&self) -> Vec<EntryPoint> {
        EntryPoint::ALL
            .into_iter()
            .filter(|entry| self.chains.contains_key(entry))
            .collect()
    }
}

/// Composes the chain for `entry`, walking features from last to first.
pub(crate) fn compose(features: &[Arc<dyn Feature>], entry: EntryPoint) -> Result<Chain> {
    let write = entry.is_write();
    let mut reads = Vec::new();
    let mut writes = Vec::new();
    let mut current = entry;
    let mut end = features.len();

    'walk: loop {
        for index in (0..end).rev() {
            let feature = &features[index];
            if !feature.entry_points().contains(&current) {
                continue;
            }
            match feature.contribute_layer(current) {
                None => {}
                Some(Layer::Read(layer)) if !write => reads.push(layer),
                Some(Layer::Write(layer)) if write => writes.push(layer),
                Some(Layer::Delegate(target)) if target.is_write() == write => {
                    current = target;
                    end = index;
                    continue 'walk;
                }
                Some(other) => {
                    return Err(OtrError::LayerMismatch {
                        feature: feature.name(),
                        entry: current,
                        found: other.kind(),
                    })
                }
            }
        }
        break;
    }

    Ok(if write {
        Chain::Write { layers: writes }
    } else {
        Chain::Read {
            layers: reads,
            base: current,
        }
    })
}
