//! # Off The Record Architecture
//!
//! Off the record is a **declarative attribute library** for record-like
//! models that are not backed by a database table. A model declares its
//! attributes once; every record of the model then gets typed getters,
//! setters, presence queries, raw reads and permit-checked mass assignment.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs) + schema.rs                         │
//! │  - Declares a model from a JSON schema, prints JSON         │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Records (record.rs) + input boundary (input.rs)            │
//! │  - Own a backing store per instance                         │
//! │  - Dispatch by attribute name or method name                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Model handles (model.rs, registry.rs)                      │
//! │  - Descriptors, permits, typecasters, composed accessors    │
//! │  - Mutable during setup, frozen behind Arc afterwards       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Features (attribute/) + accessor chains (accessor.rs)      │
//! │  - Option consumption and one layer per entry point         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: Composition At Declaration
//!
//! Behaviour is never looked up at call time. Declaring an attribute runs
//! every feature's option consumption and composes one accessor chain per
//! entry point; a read or write only walks an already-built chain.
//!
//! ## Module Overview
//!
//! - [`attribute`]: Entry points, options, the feature trait and shipped features
//! - [`accessor`]: Layers, chains and chain composition
//! - [`model`]: `ModelHandle`, the per-model registry
//! - [`record`]: `Record` and its backing store
//! - [`input`]: The permit-checked input boundary
//! - [`permits`]: The mass-assignment allow-list
//! - [`typecaster`]: Type tags and the default coercions
//! - [`registry`]: Lazily-built handles for host types
//! - [`value`]: The dynamic value type
//! - [`schema`]: JSON model schemas
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod accessor;
pub mod attribute;
pub mod config;
pub mod error;
pub mod input;
pub mod model;
pub mod permits;
pub mod record;
pub mod registry;
pub mod schema;
pub mod typecaster;
pub mod value;

pub use attribute::{Descriptor, EntryPoint, Feature, FeatureSet, Options};
pub use error::{OtrError, Result};
pub use input::{ForbiddenAttributesError, ParamsInput, PermittedInput};
pub use model::{HostSetter, ModelHandle};
pub use permits::{PermitEntry, PermitSet};
pub use record::{AttributeStore, Record};
pub use registry::{Model, Registry};
pub use typecaster::{TypeTag, Typecaster, Typecasters};
pub use value::{Params, Value};
