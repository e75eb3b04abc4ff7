//! # Untrusted Input Boundary
//!
//! Mass assignment never reads raw request data directly. It asks a
//! [`PermittedInput`] for the values under the model's param key, filtered to
//! the model's grants. The input decides whether it has been authorized at
//! all; an unauthorized input fails with [`ForbiddenAttributesError`].
//!
//! [`ParamsInput`] is the in-memory implementation, used by the CLI and tests.
//! It holds the whole request body and looks the param key up itself; a
//! missing key, or one that does not hold a map, yields no values.
//!
//! ## Filtering Rules
//!
//! | Grant | Accepted value |
//! |-------|----------------|
//! | `"name"` | a scalar (anything but a list or map) |
//! | `{"name": []}` | a list of scalars |
//! | `{"name": [...]}` | a map filtered by the inner grants, or a list of such maps |
//!
//! Keys without a matching grant, and values of the wrong shape, are dropped
//! silently.

use thiserror::Error;

use crate::permits::{PermitEntry, PermitSet};
use crate::value::{Params, Value};

/// Raised when input that was never authorized reaches mass assignment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Forbidden attributes for {key:?}: input has not been permitted")]
pub struct ForbiddenAttributesError {
    pub key: String,
}

/// A source of mass-assignment values that enforces its own authorization.
pub trait PermittedInput {
    /// The values under `key`, filtered by `grants`.
    fn require_permitted(&self, key: &str, grants: &[PermitEntry]) -> Result<Params, ForbiddenAttributesError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
enum Authorization {
    #[default]
    Unpermitted,
    Subset(PermitSet),
    All,
}

/// In-memory input holding an unscoped request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamsInput {
    values: Params,
    authorization: Authorization,
}

impl ParamsInput {
    pub fn new(values: Params) -> Self {
        Self {
            values,
            authorization: Authorization::Unpermitted,
        }
    }

    /// A body holding `values` under `key`.
    pub fn scoped(key: impl Into<String>, values: Params) -> Self {
        let mut body = Params::new();
        body.insert(key.into(), Value::Map(values));
        Self::new(body)
    }

    /// Authorizes only `entries`; the model's grants still apply on top.
    pub fn permit<I>(self, entries: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PermitEntry>,
    {
        Self {
            authorization: Authorization::Subset(entries.into_iter().collect()),
            ..self
        }
    }

    /// Authorizes everything; only the model's grants filter.
    pub fn permit_all(self) -> Self {
        Self {
            authorization: Authorization::All,
            ..self
        }
    }

    pub fn is_permitted(&self) -> bool {
        !matches!(self.authorization, Authorization::Unpermitted)
    }

    pub fn values(&self) -> &Params {
        &self.values
    }

    fn scope(&self, key: &str) -> Params {
        self.values
            .get(key)
            .and_then(Value::as_map)
            .cloned()
            .unwrap_or_default()
    }
}

impl PermittedInput for ParamsInput {
    fn require_permitted(&self, key: &str, grants: &[PermitEntry]) -> Result<Params, ForbiddenAttributesError> {
        let authorized = match &self.authorization {
            Authorization::Unpermitted => {
                return Err(ForbiddenAttributesError { key: key.to_string() })
            }
            Authorization::Subset(subset) => sanitize(&self.scope(key), subset),
            Authorization::All => self.scope(key),
        };
        let grants: PermitSet = grants.iter().cloned().collect();
        Ok(sanitize(&authorized, &grants))
    }
}

/// Keeps only the entries of `values` that `grants` allow.
pub fn sanitize(values: &Params, grants: &PermitSet) -> Params {
    values
        .iter()
        .filter(|(name, _)| grants.contains(name))
        .filter_map(|(name, value)| {
            let kept = match grants.nested(name) {
                None => is_scalar(value).then(|| value.clone()),
                Some(inner) => sanitize_nested(value, inner),
            };
            kept.map(|v| (name.clone(), v))
        })
        .collect()
}

fn sanitize_nested(value: &Value, inner: &PermitSet) -> Option<Value> {
    match value {
        Value::List(items) if inner.is_empty() => items
            .iter()
            .all(is_scalar)
            .then(|| value.clone()),
        Value::List(items) => Some(Value::List(
            items
                .iter()
                .filter_map(|item| item.as_map().map(|map| Value::Map(sanitize(map, inner))))
                .collect(),
        )),
        Value::Map(map) if !inner.is_empty() => Some(Value::Map(sanitize(map, inner))),
        _ => None,
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::List(_) | Value::Map(_))
}
