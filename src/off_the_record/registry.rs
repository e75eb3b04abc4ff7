//! Lazily-built model handles.
//!
//! A host type implements [`Model`] to describe its attributes once. The
//! first call to [`Model::handle`] runs [`Model::define`] against a fresh
//! handle and caches the frozen result; later calls share it.

use once_cell::sync::Lazy;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;
use crate::model::ModelHandle;
use crate::record::Record;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

pub trait Model: 'static {
    const NAME: &'static str;

    /// Declares attributes and permits on a fresh handle.
    fn define(model: &mut ModelHandle) -> Result<()>;

    fn handle() -> Result<Arc<ModelHandle>>
    where
        Self: Sized,
    {
        Registry::global().handle::<Self>()
    }

    fn new_record() -> Result<Record>
    where
        Self: Sized,
    {
        Ok(Record::new(Self::handle()?))
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    handles: Mutex<HashMap<TypeId, Arc<ModelHandle>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// The handle for `M`, defining it on first use.
    ///
    /// `define` runs outside the lock. If two threads race, the first insert
    /// wins and both get that handle. A failed `define` caches nothing.
    pub fn handle<M: Model>(&self) -> Result<Arc<ModelHandle>> {
        let id = TypeId::of::<M>();
        if let Some(handle) = self.lock().get(&id) {
            return Ok(Arc::clone(handle));
        }

        let mut model = ModelHandle::new(M::NAME);
        M::define(&mut model)?;
        let built = Arc::new(model);

        let handle = Arc::clone(self.lock().entry(id).or_insert(built));
        tracing::debug!(model = M::NAME, attributes = handle.len(), "model handle ready");
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TypeId, Arc<ModelHandle>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
