//! JSON model schemas for the `otr` binary.
//!
//! ```json
//! { "name": "TestModel", "param_key": "test_model",
//!   "attributes": [ {"name": "first"}, {"name": "count", "type": "integer", "default": 0} ],
//!   "permit": ["extra", {"address": ["street"]}] }
//! ```
//!
//! Every key of an attribute object besides `name` is a declaration option.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::attribute::Options;
use crate::error::{OtrError, Result};
use crate::model::ModelHandle;
use crate::permits::PermitEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_key: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permit: Vec<PermitEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSchema {
    pub name: String,
    #[serde(flatten)]
    pub options: IndexMap<String, serde_json::Value>,
}

impl Schema {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json).map_err(|e| OtrError::Schema(format!("{}: {}", path.display(), e)))
    }

    /// Declares every attribute, then the explicit permits, on a new handle.
    pub fn build(&self) -> Result<ModelHandle> {
        if self.name.trim().is_empty() {
            return Err(OtrError::Schema("model name must not be empty".to_string()));
        }
        let mut model = ModelHandle::new(self.name.as_str());
        if let Some(key) = &self.param_key {
            model.set_param_key(key.as_str());
        }
        for attribute in &self.attributes {
            let options: Options = attribute
                .options
                .iter()
                .map(|(k, v)| (k.as_str(), v.clone()))
                .collect();
            model.attribute(attribute.name.as_str(), options)?;
        }
        if !self.permit.is_empty() {
            model.permit(self.permit.iter().cloned());
        }
        Ok(model)
    }
}
